//! Events produced by watch calls
//!
//! A watch response is newline delimited JSON, one [`WatchEvent`] per line.

use crate::{error::ErrorResponse, metadata::TypeMeta};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// One event from a watch stream
#[derive(Deserialize, Serialize, Clone)]
#[serde(tag = "type", content = "object", rename_all = "UPPERCASE")]
pub enum WatchEvent<K> {
    /// Object was created
    Added(K),
    /// Object was changed
    Modified(K),
    /// Object was removed
    Deleted(K),
    /// Progress marker carrying only a resourceVersion
    ///
    /// Sent when `allowWatchBookmarks` is set.
    Bookmark(Bookmark),
    /// The server ended the watch with an error, e.g. `410 Gone` for an expired resourceVersion
    Error(ErrorResponse),
}

impl<K> WatchEvent<K> {
    /// The object carried by added, modified and deleted events
    pub fn object(&self) -> Option<&K> {
        match self {
            WatchEvent::Added(o) | WatchEvent::Modified(o) | WatchEvent::Deleted(o) => Some(o),
            WatchEvent::Bookmark(_) | WatchEvent::Error(_) => None,
        }
    }
}

impl<K> Debug for WatchEvent<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self {
            WatchEvent::Added(_) => write!(f, "Added event"),
            WatchEvent::Modified(_) => write!(f, "Modified event"),
            WatchEvent::Deleted(_) => write!(f, "Deleted event"),
            WatchEvent::Bookmark(b) => write!(f, "Bookmark event at {}", b.metadata.resource_version),
            WatchEvent::Error(e) => write!(f, "Error event: {e:?}"),
        }
    }
}

/// Object body of a [`WatchEvent::Bookmark`]
///
/// Only type information and a resourceVersion can be relied upon.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Bookmark {
    /// apiVersion + kind
    #[serde(flatten)]
    pub types: TypeMeta,

    /// Near empty metadata
    pub metadata: BookmarkMeta,
}

/// Metadata of a [`Bookmark`]
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkMeta {
    /// Version to resume the watch from
    pub resource_version: String,
}
