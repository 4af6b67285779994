//! Contract between the composer and whatever indexes the workspace.

use std::path::Path;
use std::path::PathBuf;

use async_trait::async_trait;
use ctxref_uri::ContextReference;
use serde::Serialize;

/// One entry returned by a [`ReferenceIndex`]. The composer treats it as an
/// opaque record apart from the fields used to build a reference.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SearchResult {
    /// Stable across calls for the same underlying entry.
    pub id: String,
    pub relative_path: String,
    pub absolute_path: PathBuf,
    pub score: u32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_directory: bool,
    /// Sorted char indices into `relative_path` that matched the query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indices: Option<Vec<u32>>,
}

impl SearchResult {
    pub fn new(relative_path: impl Into<String>, absolute_path: impl Into<PathBuf>) -> Self {
        let absolute_path = absolute_path.into();
        Self {
            id: absolute_path.to_string_lossy().into_owned(),
            relative_path: relative_path.into(),
            absolute_path,
            score: 0,
            is_directory: false,
            indices: None,
        }
    }
}

/// The index the popup searches.
///
/// Implementations are assumed to be side-effect free apart from
/// [`ReferenceIndex::record_use`]: the composer may issue searches whose
/// results it never looks at.
#[async_trait]
pub trait ReferenceIndex: Send + Sync + 'static {
    /// Ranked matches for `query`, best first.
    async fn search(&self, query: &str) -> anyhow::Result<Vec<SearchResult>>;

    /// Entries to offer before anything has been typed after the trigger.
    async fn list_recent(&self) -> anyhow::Result<Vec<SearchResult>>;

    /// `false` while the index is still being built. Searches still run but
    /// may be incomplete.
    fn is_ready(&self) -> bool;

    /// Called after `result` was inserted into a draft.
    fn record_use(&self, _result: &SearchResult) {}
}

/// Build the reference a chosen search result inserts.
pub fn reference_for_result(result: &SearchResult) -> ContextReference {
    let path = if result.relative_path.is_empty() {
        result.absolute_path.to_string_lossy().into_owned()
    } else {
        result.relative_path.clone()
    };

    if result.is_directory {
        return ContextReference::Folder { path };
    }
    match image_mime(Path::new(&path)) {
        Some(mime) => ContextReference::Image {
            path,
            mime: Some(mime),
        },
        None => ContextReference::file(path),
    }
}

fn image_mime(path: &Path) -> Option<String> {
    let mime = mime_guess::from_path(path).first()?;
    (mime.type_() == mime_guess::mime::IMAGE).then(|| mime.essence_str().to_string())
}
