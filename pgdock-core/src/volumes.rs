use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::ports::VolumeBind;

/// Host directory → path inside the container.
pub type VolumeMap = BTreeMap<PathBuf, String>;

/// Parse `host:container` tokens into a [`VolumeMap`].
///
/// Each token is split on its first colon. Tokens without a colon are
/// dropped. A repeated host path keeps its last container path.
pub fn parse_volume_tokens<S: AsRef<str>>(tokens: &[S]) -> VolumeMap {
    tokens
        .iter()
        .filter_map(|t| t.as_ref().split_once(':'))
        .map(|(host, container)| (PathBuf::from(host), container.to_string()))
        .collect()
}

/// Read-write binds for every entry of `volumes`.
pub fn binds(volumes: &VolumeMap) -> Vec<VolumeBind> {
    volumes
        .iter()
        .map(|(host, container)| VolumeBind {
            host: host.clone(),
            container: container.clone(),
        })
        .collect()
}

/// Create every host directory of `volumes` (idempotent).
///
/// A directory that already exists counts as success.
pub fn ensure_host_dirs(volumes: &VolumeMap, verbose: bool) -> Result<()> {
    for host in volumes.keys() {
        if host.is_dir() {
            if verbose {
                println!("directory {} already exists", host.display());
            }
            continue;
        }
        if verbose {
            println!("creating directory: {}", host.display());
        }
        create_dir(host)?;
    }
    Ok(())
}

fn create_dir(path: &Path) -> Result<()> {
    match std::fs::create_dir_all(path) {
        Ok(()) => Ok(()),
        // Lost a race with another creator.
        Err(e) if e.kind() == ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(e) => {
            Err(e).with_context(|| format!("Failed to create directory: {}", path.display()))
        }
    }
}

/// Delete every host directory of `volumes` with its contents.
///
/// A directory that is already gone counts as success. Returns the paths
/// that were actually removed.
pub fn remove_host_dirs(volumes: &VolumeMap, verbose: bool) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for host in volumes.keys() {
        match std::fs::remove_dir_all(host) {
            Ok(()) => {
                if verbose {
                    println!("removed directory: {}", host.display());
                }
                removed.push(host.clone());
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to remove directory: {}", host.display()))
            }
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // ── parse_volume_tokens ──────────────────────────────────────────────────

    #[test]
    fn parses_single_token() {
        let map = parse_volume_tokens(&["/a:/b"]);
        assert_eq!(map.len(), 1);
        assert_eq!(map[Path::new("/a")], "/b");
    }

    #[test]
    fn token_without_colon_is_dropped() {
        let map = parse_volume_tokens(&["/a:/b", "nocolon"]);
        assert_eq!(map.len(), 1);
        assert!(!map.contains_key(Path::new("nocolon")));
    }

    #[test]
    fn splits_on_first_colon_only() {
        let map = parse_volume_tokens(&["/a:/b:ro"]);
        assert_eq!(map[Path::new("/a")], "/b:ro");
    }

    #[test]
    fn empty_input_gives_empty_map() {
        let map = parse_volume_tokens::<&str>(&[]);
        assert!(map.is_empty());
    }

    #[test]
    fn later_token_wins_for_same_host() {
        let map = parse_volume_tokens(&["/a:/b", "/a:/c"]);
        assert_eq!(map[Path::new("/a")], "/c");
    }

    // ── ensure_host_dirs ─────────────────────────────────────────────────────

    #[test]
    fn creates_nested_directories() {
        let dir = TempDir::new().unwrap();
        let host = dir.path().join("docker/volumes/mypg/data");
        let map = parse_volume_tokens(&[format!("{}:/var/lib/postgresql/data", host.display())]);

        ensure_host_dirs(&map, false).unwrap();
        assert!(host.is_dir());
    }

    #[test]
    fn ensure_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let host = dir.path().join("pg");
        let map = parse_volume_tokens(&[format!("{}:/data", host.display())]);

        ensure_host_dirs(&map, true).unwrap();
        // Second call must not fail on pre-existence.
        ensure_host_dirs(&map, true).unwrap();
        assert!(host.is_dir());
    }

    #[test]
    fn ensure_fails_when_path_is_a_file() {
        let dir = TempDir::new().unwrap();
        let host = dir.path().join("file");
        std::fs::write(&host, "x").unwrap();
        let map = parse_volume_tokens(&[format!("{}:/data", host.display())]);

        assert!(ensure_host_dirs(&map, false).is_err());
    }

    // ── remove_host_dirs ─────────────────────────────────────────────────────

    #[test]
    fn removes_directory_with_contents() {
        let dir = TempDir::new().unwrap();
        let host = dir.path().join("pg");
        std::fs::create_dir_all(host.join("base")).unwrap();
        std::fs::write(host.join("base/PG_VERSION"), "10").unwrap();
        let map = parse_volume_tokens(&[format!("{}:/data", host.display())]);

        let removed = remove_host_dirs(&map, false).unwrap();
        assert_eq!(removed, vec![host.clone()]);
        assert!(!host.exists());
    }

    #[test]
    fn removing_missing_directory_is_ok() {
        let dir = TempDir::new().unwrap();
        let map = parse_volume_tokens(&[format!("{}:/data", dir.path().join("gone").display())]);

        assert!(remove_host_dirs(&map, false).unwrap().is_empty());
    }

    #[test]
    fn binds_mirror_the_map() {
        let map = parse_volume_tokens(&["/a:/b"]);
        let binds = binds(&map);
        assert_eq!(
            binds,
            vec![VolumeBind {
                host: PathBuf::from("/a"),
                container: "/b".to_string()
            }]
        );
    }
}
