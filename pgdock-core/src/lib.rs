//! Pull, start and stop PostgreSQL containers on the local Docker engine.
//!
//!   - `ports`     : trait boundary (`ContainerEngine`) and engine value types
//!   - `docker_cli`: `ContainerEngine` adapter over the `docker` CLI
//!   - `postgres`  : the controller: pull, start (with name-guard), stop
//!   - `env`       : typed `postgres` image environment
//!   - `volumes`   : `host:container` parsing and host directory handling
//!   - `config`    : runtime config from env vars and `~/.pgdock/config`
//!   - `events`    : best-effort JSONL event log

pub mod config;
pub mod docker_cli;
pub mod env;
pub mod events;
pub mod ports;
pub mod postgres;
pub mod volumes;

pub use config::Config;
pub use docker_cli::DockerCli;
pub use env::PostgresEnv;
pub use events::EventLog;
pub use ports::{ContainerEngine, ContainerHandle, ImageHandle, ImageRef};
pub use postgres::{PostgresController, StartOptions, StopOptions};
pub use volumes::{parse_volume_tokens, VolumeMap};
