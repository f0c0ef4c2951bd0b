mod deploy;
mod doctor;
mod handle;
mod images;
mod topology;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use stevedore_core::{EnvironmentResolver, StevedoreConfig, working_dir};
use stevedore_engine::{ContainerDeployer, DockerEngine, ImageInspector};

pub use deploy::deploy;
pub use doctor::doctor;
pub use handle::handle;
pub use images::images;
pub use topology::discover;

/// Configuration and engine handle shared by every engine-backed command.
pub(crate) struct Runtime {
    pub config: StevedoreConfig,
    pub cwd: PathBuf,
    pub engine: Arc<DockerEngine>,
}

impl Runtime {
    pub fn load() -> anyhow::Result<Self> {
        let config = StevedoreConfig::load_from_env(Path::new("."))?;
        let cwd = working_dir()?;
        let engine = Arc::new(DockerEngine::connect(&config.engine)?);
        Ok(Self {
            config,
            cwd,
            engine,
        })
    }

    pub fn resolver(&self) -> EnvironmentResolver {
        EnvironmentResolver::new(self.config.use_http_endpoints, self.config.external())
    }

    pub fn inspector(&self) -> ImageInspector<DockerEngine> {
        ImageInspector::new(
            Arc::clone(&self.engine),
            self.config.deploy.selection,
            self.config.engine.timeout(),
        )
    }

    pub fn deployer(&self) -> ContainerDeployer<DockerEngine> {
        ContainerDeployer::new(
            Arc::clone(&self.engine),
            self.resolver(),
            self.config.deploy.certificate_bind(&self.cwd),
            &self.config.deploy.marker,
            self.config.deploy.selection,
            self.config.engine.timeout(),
        )
    }
}
