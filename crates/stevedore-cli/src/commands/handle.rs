use std::io::Read;
use std::path::Path;

use stevedore_core::BuildCompletionEvent;
use stevedore_engine::{DeploymentTrigger, IntegrationEventHandler, TriggerOutcome};

use super::Runtime;

/// Dispatch newline-delimited build-completion events, one at a time.
///
/// A bad line or a failed deployment does not stop the remaining events,
/// but makes the command fail once all of them have been handled.
pub async fn handle(file: Option<&Path>) -> anyhow::Result<()> {
    let input = match file {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let lines: Vec<(usize, &str)> = input
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .collect();

    if lines.is_empty() {
        println!("No events to handle.");
        return Ok(());
    }

    let mut failed = 0usize;
    let mut events = Vec::with_capacity(lines.len());
    for (line_no, line) in &lines {
        match BuildCompletionEvent::from_json(line) {
            Ok(event) => events.push(event),
            Err(e) => {
                tracing::error!(line = line_no, error = %e, "unreadable event");
                failed += 1;
            }
        }
    }

    if !events.is_empty() {
        let runtime = Runtime::load()?;
        let trigger = DeploymentTrigger::new(runtime.deployer());

        for event in &events {
            match trigger.handle(event).await {
                Ok(TriggerOutcome::Deployed { name, container_id }) => {
                    println!("Deployed {} -> {name} ({container_id})", event.docker_tag);
                }
                Ok(TriggerOutcome::Skipped { reason }) => {
                    println!("Skipped {}: {reason}", event.docker_tag);
                }
                Err(e) => {
                    tracing::error!(tag = %event.docker_tag, error = %e, "event handling failed");
                    failed += 1;
                }
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} events failed", lines.len());
    }

    println!("Handled {} events.", lines.len());
    Ok(())
}
