//! PostgreSQL container lifecycle: pull, start, stop.
//!
//! Every engine interaction goes through [`ContainerEngine`], so the rules
//! here (image reuse, the name-guard, restart instead of recreate, the
//! destructive stop path) are testable without a Docker daemon.

use anyhow::{bail, Context, Result};
use std::time::Duration;

use crate::config::Config;
use crate::env::{PostgresEnv, DEFAULT_PGDATA};
use crate::events::EventLog;
use crate::ports::{ContainerEngine, ContainerHandle, ImageHandle, ImageRef, RunSpec, POSTGRES_PORT};
use crate::volumes::{self, VolumeMap};

/// Host port published when none is given.
pub const DEFAULT_HOST_PORT: u16 = 5432;

/// Inputs for [`PostgresController::start`].
#[derive(Debug, Clone)]
pub struct StartOptions {
    pub version: String,
    pub name: Option<String>,
    pub env: PostgresEnv,
    pub volumes: VolumeMap,
    pub port: u16,
    pub verbose: bool,
    pub restart_if_exists: bool,
}

impl StartOptions {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            name: None,
            env: PostgresEnv::default(),
            volumes: VolumeMap::new(),
            port: DEFAULT_HOST_PORT,
            verbose: false,
            restart_if_exists: false,
        }
    }
}

/// Inputs for [`PostgresController::stop`].
#[derive(Debug, Clone)]
pub struct StopOptions {
    pub name: String,
    /// Data directory inside the container, wiped when `remove_data` is set.
    pub pgdata: String,
    /// Host directories backing the data, deleted when `remove_data` is set.
    pub volumes: VolumeMap,
    pub remove: bool,
    pub remove_data: bool,
    pub verbose: bool,
}

impl StopOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pgdata: DEFAULT_PGDATA.to_string(),
            volumes: VolumeMap::new(),
            remove: false,
            remove_data: false,
            verbose: false,
        }
    }
}

/// Drives one image family on one engine.
pub struct PostgresController<E> {
    engine: E,
    image_family: String,
    restart_timeout: Duration,
    stop_timeout: Duration,
    events: EventLog,
}

impl<E: ContainerEngine> PostgresController<E> {
    pub fn new(engine: E, config: &Config, events: EventLog) -> Self {
        Self {
            engine,
            image_family: config.image_family.clone(),
            restart_timeout: config.restart_timeout,
            stop_timeout: config.stop_timeout,
            events,
        }
    }

    /// Access the underlying engine (useful for inspection in tests).
    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn image_ref(&self, version: &str) -> ImageRef {
        ImageRef::new(&self.image_family, version)
    }

    /// Make sure `<family>:<version>` is present locally.
    ///
    /// A local match is returned without touching the network; otherwise the
    /// image is pulled. Pull failures are returned as-is.
    pub fn pull(&self, version: &str, verbose: bool) -> Result<ImageHandle> {
        let reference = self.image_ref(version);
        let mut local = self.engine.list_images(&reference)?;
        if local.len() > 1 {
            bail!(
                "{reference} matches {} local images; expected at most one",
                local.len()
            );
        }

        let image = match local.pop() {
            Some(image) => {
                if verbose {
                    println!("{reference} already exists.");
                }
                self.events.image_reused(&reference.to_string(), &image.id);
                image
            }
            None => {
                if verbose {
                    println!("pulling: {reference}");
                }
                let image = self.engine.pull_image(&reference)?;
                self.events.image_pulled(&reference.to_string(), &image.id);
                image
            }
        };

        println!("pulling complete : {reference}");
        if verbose {
            println!("id : {}", image.id);
            println!("tag : {:?}", image.tags);
        }
        Ok(image)
    }

    /// Start a container, or return the one that already has the name.
    ///
    /// Host directories for every volume are created first and are left in
    /// place if a later step fails.
    pub fn start(&self, opts: &StartOptions) -> Result<ContainerHandle> {
        volumes::ensure_host_dirs(&opts.volumes, opts.verbose)?;

        println!(
            "starting postgres version: {} and name: {}",
            opts.version,
            opts.name.as_deref().unwrap_or("(engine-assigned)")
        );

        if let Some(name) = &opts.name {
            if let Some(existing) = self.engine.find_containers(name)?.into_iter().next() {
                return self.handle_existing(name, existing, opts.restart_if_exists);
            }
        }

        let reference = self.image_ref(&opts.version);
        println!("ensuring {reference} exists.");
        self.pull(&opts.version, opts.verbose)?;

        let spec = RunSpec {
            name: opts.name.clone(),
            image: reference,
            env: opts.env.to_vars(),
            volumes: volumes::binds(&opts.volumes),
            host_port: opts.port,
            container_port: POSTGRES_PORT,
            detach: true,
            interactive: true,
            tty: true,
        };
        let container = self.engine.run_container(&spec)?;
        println!("successfully started container: {}", container.name);
        self.events.container_started(
            &container.name,
            &container.id,
            &spec.image.to_string(),
            spec.host_port,
        );
        Ok(container)
    }

    fn handle_existing(
        &self,
        name: &str,
        existing: ContainerHandle,
        restart: bool,
    ) -> Result<ContainerHandle> {
        println!("container with name: {name} exists.");
        if !restart {
            println!("will do nothing. exiting.");
            self.events.container_exists(name, &existing.id);
            return Ok(existing);
        }

        println!("restarting container: {name}");
        self.engine
            .restart_container(&existing.id, self.restart_timeout)
            .with_context(|| format!("Failed to restart container {name}"))?;
        self.events
            .container_restarted(name, &existing.id, self.restart_timeout.as_secs());

        // Re-read the state; identity is unchanged by a restart.
        let refreshed = self
            .engine
            .find_containers(name)?
            .into_iter()
            .find(|c| c.id == existing.id);
        Ok(refreshed.unwrap_or(existing))
    }

    /// Stop the named container, optionally removing it and its data.
    ///
    /// Destructive when `remove` or `remove_data` is set. Returns `None`
    /// when no container has the name.
    pub fn stop(&self, opts: &StopOptions) -> Result<Option<ContainerHandle>> {
        let name = opts.name.as_str();
        let Some(container) = self.engine.find_containers(name)?.into_iter().next() else {
            println!("no container with name: {name}");
            return Ok(None);
        };

        let mut wiped = Vec::new();
        if opts.remove_data {
            if container.is_running() {
                if opts.verbose {
                    println!("removing contents of {} inside container: {name}", opts.pgdata);
                }
                // PGDATA is usually a mount point and cannot itself be removed.
                let out = self
                    .engine
                    .exec(&container.id, &wipe_contents_cmd(&opts.pgdata))?;
                if out.exit_code != 0 {
                    bail!(
                        "Failed to remove {} in {name} (exit {}): {}",
                        opts.pgdata,
                        out.exit_code,
                        out.output.trim()
                    );
                }
                wiped.push(opts.pgdata.clone());
            } else {
                println!("container {name} is not running; skipping in-container cleanup");
            }
        }

        println!("stopping container: {name}");
        self.engine
            .stop_container(&container.id, self.stop_timeout)
            .with_context(|| format!("Failed to stop container {name}"))?;
        self.events.container_stopped(name, &container.id);

        if opts.remove {
            println!("removing container: {name}");
            self.engine
                .remove_container(&container.id, opts.remove_data)
                .with_context(|| format!("Failed to remove container {name}"))?;
            self.events.container_removed(name, &container.id);
            if opts.remove_data {
                wiped.push(format!("{name}:anonymous-volumes"));
            }
        }

        if opts.remove_data {
            let removed = volumes::remove_host_dirs(&opts.volumes, opts.verbose)?;
            wiped.extend(removed.iter().map(|p| p.display().to_string()));
            if wiped.is_empty() {
                println!("no data removed for container: {name}");
            } else {
                self.events.data_removed(name, &wiped);
            }
        }

        println!("successfully stopped container: {name}");
        Ok(Some(container))
    }
}

/// `sh` invocation that deletes everything below `dir`, hidden entries
/// included, and leaves `dir` itself in place.
fn wipe_contents_cmd(dir: &str) -> [&str; 5] {
    [
        "sh",
        "-c",
        r#"rm -rf -- "$1"/* "$1"/.[!.]* "$1"/..?*"#,
        "sh",
        dir,
    ]
}
