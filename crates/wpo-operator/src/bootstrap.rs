//! Seeds object manifests from a directory into the store at startup.
//!
//! Each `*.json` or `*.toml` file holds one object document. Objects that
//! already exist are updated in place, so seeding is idempotent. Files are
//! applied in name order.

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use wpo_core::Object;
use wpo_storage::{ObjectStore, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error(transparent)]
    Store(#[from] StorageError),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapStats {
    pub created: usize,
    pub updated: usize,
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> BootstrapError + '_ {
    move |source| BootstrapError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Reads one manifest file. Returns `None` for unsupported extensions.
pub fn read_manifest(path: &Path) -> Result<Option<Object>, BootstrapError> {
    let parse_error = |message: String| BootstrapError::Parse {
        path: path.to_path_buf(),
        message,
    };
    let extension = path.extension().and_then(|e| e.to_str());
    if !matches!(extension, Some("json" | "toml")) {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(path).map_err(io_error(path))?;
    let mut object: Object = match extension {
        Some("json") => serde_json::from_str(&contents).map_err(|e| parse_error(e.to_string()))?,
        _ => toml::from_str(&contents).map_err(|e| parse_error(e.to_string()))?,
    };
    if object.metadata.name.is_empty() {
        return Err(parse_error("metadata.name is required".into()));
    }
    if object.metadata.namespace.is_empty() {
        object.metadata.namespace = "default".into();
    }
    Ok(Some(object))
}

/// Lists the manifests in `dir`, sorted by file name.
pub fn read_manifests(dir: &Path) -> Result<Vec<Object>, BootstrapError> {
    let mut paths = std::fs::read_dir(dir)
        .map_err(io_error(dir))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_error(dir))?;
    paths.sort();

    let mut objects = Vec::new();
    for path in paths.iter().filter(|p| p.is_file()) {
        if let Some(object) = read_manifest(path)? {
            objects.push(object);
        }
    }
    Ok(objects)
}

/// Creates or updates every manifest in `dir`.
pub async fn seed_store(
    store: &dyn ObjectStore,
    dir: &Path,
) -> Result<BootstrapStats, BootstrapError> {
    let mut stats = BootstrapStats::default();
    for object in read_manifests(dir)? {
        let key = object.key();
        if store.get(object.kind, &key).await?.is_some() {
            store.update(&object, None).await?;
            stats.updated += 1;
            debug!(kind = %object.kind, key = %key, "manifest updated");
        } else {
            store.create(&object).await?;
            stats.created += 1;
            debug!(kind = %object.kind, key = %key, "manifest created");
        }
    }
    info!(
        dir = %dir.display(),
        created = stats.created,
        updated = stats.updated,
        "bootstrap manifests applied"
    );
    Ok(stats)
}
