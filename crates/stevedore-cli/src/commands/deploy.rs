use stevedore_engine::container_name_for;

use super::Runtime;

/// Deploy one image tag, outside of any event.
pub async fn deploy(tag: &str, name: Option<&str>) -> anyhow::Result<()> {
    let runtime = Runtime::load()?;
    let name = name.map_or_else(|| container_name_for(tag), str::to_owned);

    println!("Deploying {tag} as {name}...");
    let container_id = runtime.deployer().deploy(tag, &name).await?;

    println!();
    println!("Started: {name}");
    println!("  ID: {container_id}");
    Ok(())
}
