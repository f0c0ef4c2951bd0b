use std::fmt;
use std::path::Path;

use stevedore_core::{Scheme, StevedoreConfig, working_dir};
use stevedore_engine::{ContainerEngine, DockerEngine};

#[derive(Debug, Default, Clone)]
struct CheckResult {
    passed: bool,
    detail: String,
}

impl CheckResult {
    fn ok(detail: &str) -> Self {
        Self {
            passed: true,
            detail: detail.to_owned(),
        }
    }

    fn fail(detail: &str) -> Self {
        Self {
            passed: false,
            detail: detail.to_owned(),
        }
    }

    fn icon(&self) -> &'static str {
        if self.passed { "OK" } else { "NG" }
    }
}

#[derive(Debug, Default)]
struct DoctorReport {
    config_file: CheckResult,
    engine: CheckResult,
    certificate_dir: CheckResult,
    certificate_file: CheckResult,
    profile: String,
    marker: String,
}

impl DoctorReport {
    fn all_passed(&self) -> bool {
        self.config_file.passed
            && self.engine.passed
            && self.certificate_dir.passed
            && self.certificate_file.passed
    }
}

impl fmt::Display for DoctorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = [
            ("Config", &self.config_file),
            ("Engine", &self.engine),
            ("Cert dir", &self.certificate_dir),
            ("Cert file", &self.certificate_file),
        ];
        for (label, check) in rows {
            writeln!(f, "{:<10} [{}] {}", label, check.icon(), check.detail)?;
        }
        writeln!(f, "{:<10} {}", "Profile", self.profile)?;
        write!(f, "{:<10} :{}", "Marker", self.marker)
    }
}

fn path_check(path: &Path, expect_dir: bool) -> CheckResult {
    let found = if expect_dir {
        path.is_dir()
    } else {
        path.is_file()
    };
    if found {
        CheckResult::ok(&path.display().to_string())
    } else {
        CheckResult::fail(&format!("{} not found", path.display()))
    }
}

pub async fn doctor() -> anyhow::Result<()> {
    let mut report = DoctorReport::default();

    let config = match StevedoreConfig::load_from_env(Path::new(".")) {
        Ok(config) => {
            report.config_file = if Path::new("stevedore.toml").exists() {
                CheckResult::ok("stevedore.toml")
            } else {
                CheckResult::ok("defaults (no stevedore.toml)")
            };
            config
        }
        Err(e) => {
            report.config_file = CheckResult::fail(&e.to_string());
            StevedoreConfig::default()
        }
    };

    report.profile = Scheme::from_http_flag(config.use_http_endpoints).to_string();
    report.marker.clone_from(&config.deploy.marker);

    report.engine = match DockerEngine::connect(&config.engine) {
        Ok(engine) => match tokio::time::timeout(config.engine.timeout(), engine.ping()).await {
            Ok(Ok(())) => CheckResult::ok("reachable"),
            Ok(Err(e)) => CheckResult::fail(&e.to_string()),
            Err(elapsed) => CheckResult::fail(&format!("no answer: {elapsed}")),
        },
        Err(e) => CheckResult::fail(&e.to_string()),
    };

    let cwd = working_dir()?;
    report.certificate_dir = path_check(&config.deploy.certificate_bind(&cwd).host_path, true);
    report.certificate_file =
        path_check(&config.discovery.certificate_bind(&cwd).host_path, false);

    println!();
    println!("{report}");

    if !report.all_passed() {
        anyhow::bail!("some checks failed, see above for details");
    }

    Ok(())
}
