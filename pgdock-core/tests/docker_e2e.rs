//! End-to-end tests against a real Docker daemon.
//!
//! Ignored by default; run with `cargo test -p pgdock-core -- --ignored`
//! on a machine where `docker info` succeeds. They pull images and publish
//! host port 5006.

use pgdock_core::{
    parse_volume_tokens, Config, ContainerEngine, DockerCli, EventLog, PostgresController,
    StartOptions, StopOptions,
};
use tempfile::TempDir;

const NAME: &str = "pgdock-e2e-mypg";

fn controller(dir: &TempDir) -> PostgresController<DockerCli> {
    let config = Config::defaults(dir.path());
    PostgresController::new(
        DockerCli::new(config.docker_bin.as_str()),
        &config,
        EventLog::open(&config.logs_dir()),
    )
}

#[test]
#[ignore = "requires a Docker daemon"]
fn pull_returns_requested_tag() {
    let dir = TempDir::new().unwrap();
    let ctl = controller(&dir);
    let image = ctl.pull("11-alpine", true).unwrap();
    assert!(image.tags.contains(&"postgres:11-alpine".to_string()));

    // Second pull is served from the local store.
    let again = ctl.pull("11-alpine", false).unwrap();
    assert_eq!(image.id, again.id);
}

#[test]
#[ignore = "requires a Docker daemon"]
fn start_then_restart_then_stop() {
    let dir = TempDir::new().unwrap();
    let host = dir.path().join("volumes/mypg");
    let volumes =
        parse_volume_tokens(&[format!("{}:/var/lib/postgresql/data", host.display())]);
    let ctl = controller(&dir);

    let opts = StartOptions {
        name: Some(NAME.to_string()),
        port: 5006,
        volumes: volumes.clone(),
        ..StartOptions::new("10-alpine")
    };
    let started = ctl.start(&opts).unwrap();
    assert_eq!(started.name, NAME);
    assert_eq!(started.image, "postgres:10-alpine");
    assert!(host.is_dir());

    let restarted = ctl
        .start(&StartOptions {
            restart_if_exists: true,
            ..opts
        })
        .unwrap();
    assert_eq!(restarted.id, started.id);
    assert_eq!(ctl.engine().find_containers(NAME).unwrap().len(), 1);

    let stopped = ctl
        .stop(&StopOptions {
            remove: true,
            remove_data: true,
            volumes,
            ..StopOptions::new(NAME)
        })
        .unwrap();
    assert_eq!(stopped.map(|c| c.id), Some(started.id));
    assert!(ctl.engine().find_containers(NAME).unwrap().is_empty());
    assert!(!host.exists());
}
