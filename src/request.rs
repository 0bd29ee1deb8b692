//! Report requests.
//!
//! A request is a JSON file naming the metadata, an optional layout and the
//! ordered photo list. Photo paths resolve against the directory of the
//! request file. Everything here runs before generation starts: a request
//! that fails to load never reaches the renderer.
//!
//! ```json
//! {
//!   "metadata": {"institution": "Escola Municipal", "date": "12/03/2024"},
//!   "layout": {"columns": 3, "style": "plain"},
//!   "photos": [
//!     {"id": "a1", "path": "fotos/001.jpg", "description": "Fachada", "rotation": 90}
//!   ]
//! }
//! ```

use crate::types::{LayoutConfig, PhotoRecord, ReportMetadata, Rotation};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RequestError {
    #[error("cannot read request {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid request: {0}")]
    Json(#[from] serde_json::Error),
    #[error("the request has no photos")]
    NoPhotos,
    #[error("photo '{id}' is unreadable ({path}): {source}")]
    PhotoUnreadable {
        id: String,
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("photo id '{0}' is used more than once")]
    DuplicateId(String),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RequestFile {
    #[serde(default)]
    metadata: ReportMetadata,
    #[serde(default)]
    layout: Option<LayoutConfig>,
    #[serde(default)]
    photos: Vec<PhotoEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PhotoEntry {
    /// Defaults to the file name.
    #[serde(default)]
    id: Option<String>,
    path: PathBuf,
    #[serde(default)]
    description: String,
    #[serde(default)]
    rotation: Rotation,
}

/// A validated request with photo bytes loaded, in document order.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub metadata: ReportMetadata,
    /// Overrides the configured layout when present.
    pub layout: Option<LayoutConfig>,
    pub photos: Vec<PhotoRecord>,
}

/// Parse request JSON, reading photos relative to `base_dir`.
pub fn parse_request(json: &str, base_dir: &Path) -> Result<ReportRequest, RequestError> {
    let file: RequestFile = serde_json::from_str(json)?;
    if file.photos.is_empty() {
        return Err(RequestError::NoPhotos);
    }

    let mut seen = HashSet::new();
    let mut photos = Vec::with_capacity(file.photos.len());
    for entry in file.photos {
        let id = entry.id.unwrap_or_else(|| {
            entry
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        if !seen.insert(id.clone()) {
            return Err(RequestError::DuplicateId(id));
        }

        let path = base_dir.join(&entry.path);
        let source = fs::read(&path).map_err(|source| RequestError::PhotoUnreadable {
            id: id.clone(),
            path: path.clone(),
            source,
        })?;

        photos.push(PhotoRecord {
            id,
            source,
            description: entry.description,
            rotation: entry.rotation,
        });
    }

    Ok(ReportRequest {
        metadata: file.metadata,
        layout: file.layout,
        photos,
    })
}

/// Load a request file from disk.
pub fn load_request(path: &Path) -> Result<ReportRequest, RequestError> {
    let json = fs::read_to_string(path).map_err(|source| RequestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    parse_request(&json, base_dir)
}
