//! Trait boundary between the controller and the container engine.
//!
//! The controller never talks to Docker directly: every query and mutation
//! goes through [`ContainerEngine`]. The production adapter is
//! [`crate::docker_cli::DockerCli`]; tests use an in-memory mock.

use anyhow::Result;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Port PostgreSQL listens on inside the container.
pub const POSTGRES_PORT: u16 = 5432;

/// A pullable image: `repository:tag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub repository: String,
    pub tag: String,
}

impl ImageRef {
    pub fn new(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            tag: tag.into(),
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

/// A local image as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHandle {
    pub id: String,
    pub tags: Vec<String>,
}

/// A container as reported by the engine. The engine owns its lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    pub id: String,
    pub name: String,
    pub image: String,
    /// Engine state string (`running`, `exited`, `created`, ...).
    pub state: String,
}

impl ContainerHandle {
    pub fn is_running(&self) -> bool {
        self.state == "running"
    }
}

/// A read-write bind of a host directory into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeBind {
    pub host: PathBuf,
    pub container: String,
}

/// Everything the engine needs to create and start a new container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
    pub name: Option<String>,
    pub image: ImageRef,
    /// Only variables that are set; absent ones are left to the image.
    pub env: BTreeMap<String, String>,
    pub volumes: Vec<VolumeBind>,
    pub host_port: u16,
    pub container_port: u16,
    pub detach: bool,
    pub interactive: bool,
    pub tty: bool,
}

/// Output of a command executed inside a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub output: String,
}

/// Port for the container engine.
///
/// Every call blocks until the engine answers. Errors carry the engine's
/// own message and are never retried here.
pub trait ContainerEngine {
    /// Local images matching `reference`. Never touches the network.
    fn list_images(&self, reference: &ImageRef) -> Result<Vec<ImageHandle>>;

    /// Fetch `reference` from its registry and return the local handle.
    fn pull_image(&self, reference: &ImageRef) -> Result<ImageHandle>;

    /// All containers (running or not) whose name is exactly `name`.
    fn find_containers(&self, name: &str) -> Result<Vec<ContainerHandle>>;

    /// Create and start a container.
    fn run_container(&self, spec: &RunSpec) -> Result<ContainerHandle>;

    fn restart_container(&self, id: &str, timeout: Duration) -> Result<()>;

    fn stop_container(&self, id: &str, timeout: Duration) -> Result<()>;

    /// Remove a stopped container. With `volumes`, its anonymous volumes go too.
    fn remove_container(&self, id: &str, volumes: bool) -> Result<()>;

    /// Run `cmd` inside a running container and wait for it.
    fn exec(&self, id: &str, cmd: &[&str]) -> Result<ExecOutput>;
}
