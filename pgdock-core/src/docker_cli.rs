use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::process::{Command, Stdio};
use std::time::Duration;

use crate::ports::{ContainerEngine, ContainerHandle, ExecOutput, ImageHandle, ImageRef, RunSpec};

/// Concrete adapter: drives the engine through the `docker` CLI.
///
/// Structured answers are requested with `--format '{{json .}}'` and decoded
/// with serde; everything else is read from the exit status.
pub struct DockerCli {
    bin: String,
}

impl DockerCli {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    /// Run `docker <args>` to completion and return its trimmed stdout.
    fn docker(&self, args: &[String]) -> Result<String> {
        let sub = args.first().map(String::as_str).unwrap_or_default();
        let out = Command::new(&self.bin)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to run `{} {sub}`. Is Docker installed?", self.bin))?;
        if !out.status.success() {
            bail!(
                "docker {sub} failed: {}",
                String::from_utf8_lossy(&out.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
    }

    fn inspect_image(&self, target: &str) -> Result<ImageHandle> {
        let out = self.docker(&strings(&["image", "inspect", "--format", "{{json .}}", target]))?;
        parse_image_inspect(&out)
    }

    fn inspect_container(&self, id: &str) -> Result<ContainerHandle> {
        let out = self.docker(&strings(&["container", "inspect", "--format", "{{json .}}", id]))?;
        parse_container_inspect(&out)
    }
}

impl ContainerEngine for DockerCli {
    fn list_images(&self, reference: &ImageRef) -> Result<Vec<ImageHandle>> {
        let out = self.docker(&strings(&[
            "image",
            "ls",
            "--quiet",
            "--no-trunc",
            &reference.to_string(),
        ]))?;
        // The same image id is listed once per matching tag.
        let ids: BTreeSet<&str> = out.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        ids.into_iter().map(|id| self.inspect_image(id)).collect()
    }

    fn pull_image(&self, reference: &ImageRef) -> Result<ImageHandle> {
        let target = reference.to_string();
        self.docker(&strings(&["pull", "--quiet", &target]))
            .with_context(|| format!("Failed to pull {target}"))?;
        self.inspect_image(&target)
    }

    fn find_containers(&self, name: &str) -> Result<Vec<ContainerHandle>> {
        let out = self.docker(&strings(&[
            "ps",
            "--all",
            "--no-trunc",
            "--filter",
            &format!("name=^/?{name}$"),
            "--format",
            "{{json .}}",
        ]))?;
        parse_ps_lines(&out, name)
    }

    fn run_container(&self, spec: &RunSpec) -> Result<ContainerHandle> {
        let id = self
            .docker(&run_args(spec))
            .with_context(|| format!("Failed to start a container from {}", spec.image))?;
        self.inspect_container(&id)
    }

    fn restart_container(&self, id: &str, timeout: Duration) -> Result<()> {
        self.docker(&strings(&["restart", "-t", &timeout.as_secs().to_string(), id]))?;
        Ok(())
    }

    fn stop_container(&self, id: &str, timeout: Duration) -> Result<()> {
        self.docker(&strings(&["stop", "-t", &timeout.as_secs().to_string(), id]))?;
        Ok(())
    }

    fn remove_container(&self, id: &str, volumes: bool) -> Result<()> {
        self.docker(&rm_args(id, volumes))?;
        Ok(())
    }

    fn exec(&self, id: &str, cmd: &[&str]) -> Result<ExecOutput> {
        let out = Command::new(&self.bin)
            .arg("exec")
            .arg(id)
            .args(cmd)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to run `{} exec`", self.bin))?;
        let mut output = String::from_utf8_lossy(&out.stdout).into_owned();
        output.push_str(&String::from_utf8_lossy(&out.stderr));
        Ok(ExecOutput {
            exit_code: out.status.code().unwrap_or(-1),
            output,
        })
    }
}

fn rm_args(id: &str, volumes: bool) -> Vec<String> {
    let mut args = vec!["rm".to_string()];
    if volumes {
        args.push("--volumes".to_string());
    }
    args.push(id.to_string());
    args
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

/// Build the argument list for `docker run` from a [`RunSpec`].
pub fn run_args(spec: &RunSpec) -> Vec<String> {
    let mut args = vec!["run".to_string()];
    if spec.detach {
        args.push("--detach".to_string());
    }
    if spec.interactive {
        args.push("--interactive".to_string());
    }
    if spec.tty {
        args.push("--tty".to_string());
    }
    if let Some(name) = &spec.name {
        args.push("--name".to_string());
        args.push(name.clone());
    }
    args.push("--publish".to_string());
    args.push(format!("{}:{}/tcp", spec.host_port, spec.container_port));
    for bind in &spec.volumes {
        args.push("--volume".to_string());
        args.push(format!("{}:{}:rw", bind.host.display(), bind.container));
    }
    for (key, value) in &spec.env {
        args.push("--env".to_string());
        args.push(format!("{key}={value}"));
    }
    args.push(spec.image.to_string());
    args
}

#[derive(Debug, Deserialize)]
struct ImageInspect {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "RepoTags", default)]
    repo_tags: Option<Vec<String>>,
}

fn parse_image_inspect(out: &str) -> Result<ImageHandle> {
    let line = out
        .lines()
        .find(|l| !l.trim().is_empty())
        .context("docker image inspect returned no output")?;
    let raw: ImageInspect =
        serde_json::from_str(line).context("Failed to parse docker image inspect output")?;
    Ok(ImageHandle {
        id: raw.id,
        tags: raw.repo_tags.unwrap_or_default(),
    })
}

#[derive(Debug, Deserialize)]
struct ContainerInspect {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Config")]
    config: InspectConfig,
    #[serde(rename = "State")]
    state: InspectState,
}

#[derive(Debug, Deserialize)]
struct InspectConfig {
    #[serde(rename = "Image")]
    image: String,
}

#[derive(Debug, Deserialize)]
struct InspectState {
    #[serde(rename = "Status")]
    status: String,
}

fn parse_container_inspect(out: &str) -> Result<ContainerHandle> {
    let line = out
        .lines()
        .find(|l| !l.trim().is_empty())
        .context("docker container inspect returned no output")?;
    let raw: ContainerInspect =
        serde_json::from_str(line).context("Failed to parse docker container inspect output")?;
    Ok(ContainerHandle {
        id: raw.id,
        name: raw.name.trim_start_matches('/').to_string(),
        image: raw.config.image,
        state: raw.state.status,
    })
}

/// One line of `docker ps --format '{{json .}}'`.
#[derive(Debug, Deserialize)]
struct PsEntry {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Names")]
    names: String,
    #[serde(rename = "Image")]
    image: String,
    #[serde(rename = "State", default)]
    state: String,
}

/// Decode `docker ps` JSON lines, keeping only exact matches on `name`.
///
/// The engine's name filter is a regex, so it is re-checked here.
fn parse_ps_lines(out: &str, name: &str) -> Result<Vec<ContainerHandle>> {
    let mut handles = Vec::new();
    for line in out.lines().filter(|l| !l.trim().is_empty()) {
        let entry: PsEntry =
            serde_json::from_str(line).context("Failed to parse docker ps output")?;
        if entry.names.split(',').any(|n| n.trim_start_matches('/') == name) {
            handles.push(ContainerHandle {
                id: entry.id,
                name: name.to_string(),
                image: entry.image,
                state: entry.state,
            });
        }
    }
    Ok(handles)
}
