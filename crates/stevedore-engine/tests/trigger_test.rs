mod common;

use std::sync::{Arc, Mutex};

use common::{MockEngine, candidate, daemon_error, deployer, details};
use mockall::Sequence;
use stevedore_core::{BuildCompletionEvent, ContainerSpec};
use stevedore_engine::error::DeployError;
use stevedore_engine::{DeploymentTrigger, IntegrationEventHandler, TriggerOutcome};

fn event(tag: &str) -> BuildCompletionEvent {
    BuildCompletionEvent {
        id: Some("evt-1".to_owned()),
        root_store_project: "/src/stores/myapp".to_owned(),
        docker_tag: tag.to_owned(),
        project_name: "MyApp.Store".to_owned(),
        docker_file_working_directory: "/src/stores/myapp".to_owned(),
        platform: "linux/amd64".to_owned(),
        ..BuildCompletionEvent::default()
    }
}

fn expect_myapp_image(mock: &mut MockEngine) {
    mock.expect_find_images()
        .withf(|reference| reference == "myapp:stores")
        .returning(|_| Ok(vec![candidate("sha256:m", 1, &["myapp:stores"])]));
    mock.expect_inspect_image()
        .returning(|_| Ok(details("sha256:m", &["HTTP_PORT=8080", "HTTPS_PORT=8443"])));
}

fn is_generated_name(name: &str, prefix: &str) -> bool {
    name.strip_prefix(prefix)
        .is_some_and(|uuid| uuid.len() == 36 && uuid.chars().filter(|c| *c == '-').count() == 4)
}

#[tokio::test]
async fn event_produces_one_create_and_start() {
    let mut mock = MockEngine::new();
    let mut seq = Sequence::new();
    expect_myapp_image(&mut mock);

    mock.expect_create_container()
        .withf(|spec: &ContainerSpec| is_generated_name(&spec.name, "myapp_stores_"))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok("id-1".to_owned()));
    mock.expect_start_container()
        .withf(|id| id == "id-1")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));

    let trigger = DeploymentTrigger::new(deployer(mock, false));
    let outcome = trigger.handle(&event("myapp:stores")).await.unwrap();

    match outcome {
        TriggerOutcome::Deployed { name, container_id } => {
            assert!(is_generated_name(&name, "myapp_stores_"));
            assert_eq!(container_id, "id-1");
        }
        other => panic!("expected deployment, got {other:?}"),
    }
}

#[tokio::test]
async fn redeploying_a_tag_creates_new_containers() {
    let mut mock = MockEngine::new();
    expect_myapp_image(&mut mock);

    let names = Arc::new(Mutex::new(Vec::<String>::new()));
    let seen = Arc::clone(&names);
    mock.expect_create_container()
        .times(2)
        .returning(move |spec| {
            seen.lock().unwrap().push(spec.name.clone());
            Ok(format!("id-{}", spec.name))
        });
    mock.expect_start_container().times(2).returning(|_| Ok(()));
    mock.expect_remove_container().never();

    let trigger = DeploymentTrigger::new(deployer(mock, false));
    trigger.handle(&event("myapp:stores")).await.unwrap();
    trigger.handle(&event("myapp:stores")).await.unwrap();

    let names = names.lock().unwrap();
    assert_eq!(names.len(), 2);
    assert_ne!(names[0], names[1]);
}

#[tokio::test]
async fn missing_image_skips_event() {
    let mut mock = MockEngine::new();
    mock.expect_find_images().returning(|_| Ok(vec![]));
    mock.expect_create_container().never();

    let trigger = DeploymentTrigger::new(deployer(mock, false));
    let outcome = trigger.handle(&event("late:stores")).await.unwrap();

    assert!(matches!(outcome, TriggerOutcome::Skipped { ref reason } if reason.contains("late:stores")));
}

#[tokio::test]
async fn empty_tag_skips_without_engine_calls() {
    let mock = MockEngine::new();

    let trigger = DeploymentTrigger::new(deployer(mock, false));
    let outcome = trigger.handle(&event("  ")).await.unwrap();

    assert!(matches!(outcome, TriggerOutcome::Skipped { .. }));
}

#[tokio::test]
async fn engine_failure_fails_the_handler() {
    let mut mock = MockEngine::new();
    expect_myapp_image(&mut mock);
    mock.expect_create_container()
        .returning(|_| Err(daemon_error("create container", "no space left on device")));

    let trigger = DeploymentTrigger::new(deployer(mock, false));
    let result = trigger.handle(&event("myapp:stores")).await;

    assert!(matches!(result, Err(DeployError::Create { .. })));
}
