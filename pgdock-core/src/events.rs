//! Structured JSONL event log.
//!
//! Writes one JSON object per line to `~/.pgdock/logs/events.log` so a
//! history of what pgdock did to the engine survives the terminal session.
//!
//! | `event`               | When                                          |
//! |-----------------------|-----------------------------------------------|
//! | `image_reused`        | Pull found the image locally                  |
//! | `image_pulled`        | Pull fetched the image from its registry      |
//! | `container_exists`    | Start hit the name-guard and did nothing      |
//! | `container_restarted` | Start hit the name-guard and restarted        |
//! | `container_started`   | Start created a new container                 |
//! | `container_stopped`   | Stop stopped a container                      |
//! | `container_removed`   | Stop removed the container object             |
//! | `data_removed`        | Stop wiped the data directory                 |
//!
//! ```json
//! {"ts":"2026-10-16T10:00:00Z","event":"image_pulled","image":"postgres:11-alpine","id":"sha256:..."}
//! ```

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};

/// Handle to the event log. Writes are best-effort: a broken log path
/// never fails the operation being logged.
pub struct EventLog {
    path: Option<PathBuf>,
}

impl EventLog {
    /// Log to `logs_dir/events.log`, creating `logs_dir` on first write.
    pub fn open(logs_dir: &Path) -> Self {
        Self {
            path: Some(logs_dir.join("events.log")),
        }
    }

    /// A log that drops every event.
    pub fn disabled() -> Self {
        Self { path: None }
    }

    /// Append `event` with an injected UTC `ts` field.
    pub fn emit(&self, mut event: Value) {
        let Some(path) = &self.path else {
            return;
        };
        if let Some(obj) = event.as_object_mut() {
            obj.insert(
                "ts".to_string(),
                Value::String(chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()),
            );
        }
        let mut line = event.to_string();
        line.push('\n');
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = f.write_all(line.as_bytes());
        }
    }

    // ── Typed helpers ────────────────────────────────────────────────────────

    pub fn image_reused(&self, image: &str, id: &str) {
        self.emit(json!({"event": "image_reused", "image": image, "id": id}));
    }

    pub fn image_pulled(&self, image: &str, id: &str) {
        self.emit(json!({"event": "image_pulled", "image": image, "id": id}));
    }

    pub fn container_exists(&self, name: &str, id: &str) {
        self.emit(json!({"event": "container_exists", "name": name, "id": id}));
    }

    pub fn container_restarted(&self, name: &str, id: &str, timeout_s: u64) {
        self.emit(json!({
            "event": "container_restarted",
            "name": name,
            "id": id,
            "timeout_s": timeout_s,
        }));
    }

    pub fn container_started(&self, name: &str, id: &str, image: &str, host_port: u16) {
        self.emit(json!({
            "event": "container_started",
            "name": name,
            "id": id,
            "image": image,
            "host_port": host_port,
        }));
    }

    pub fn container_stopped(&self, name: &str, id: &str) {
        self.emit(json!({"event": "container_stopped", "name": name, "id": id}));
    }

    pub fn container_removed(&self, name: &str, id: &str) {
        self.emit(json!({"event": "container_removed", "name": name, "id": id}));
    }

    /// `paths` names everything wiped, in the container and on the host.
    /// Anonymous volumes dropped with the container appear as `<name>:anonymous-volumes`.
    pub fn data_removed(&self, name: &str, paths: &[String]) {
        self.emit(json!({"event": "data_removed", "name": name, "paths": paths}));
    }
}
