use stevedore_topology::{ResolvedNode, core_topology, discover_services, register};

use super::Runtime;

/// Build the core topology, add discovered stores, and print the result.
pub async fn discover(json: bool) -> anyhow::Result<()> {
    let runtime = Runtime::load()?;
    let config = &runtime.config;
    let resolver = runtime.resolver();
    let profile = resolver.scheme();

    let mut topology = core_topology(profile)?;
    let services = discover_services(&runtime.inspector(), &resolver, &config.deploy.marker).await;
    let certificate = config.discovery.certificate_bind(&runtime.cwd);
    let registered = register(&mut topology, &services, profile, &certificate)?;

    let resolved = topology.resolve()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&resolved)?);
        return Ok(());
    }

    println!("Launch profile: {profile}");
    println!("Discovered: {}", registered.len());
    for name in &registered {
        println!("  - {name}");
    }
    println!();
    for node in &resolved {
        print_node(node);
    }
    Ok(())
}

fn print_node(node: &ResolvedNode) {
    println!("{}", node.name);
    for endpoint in &node.endpoints {
        let external = if endpoint.external { " (external)" } else { "" };
        println!("  {}: {}{external}", endpoint.name, endpoint.url());
    }
    if !node.wait_for.is_empty() {
        println!("  waits for: {}", node.wait_for.join(", "));
    }
    for (key, value) in &node.environment {
        println!("  {key}={value}");
    }
    for mount in &node.bind_mounts {
        let mode = if mount.read_only { "ro" } else { "rw" };
        println!("  mount: {} -> {} ({mode})", mount.source, mount.target);
    }
}
