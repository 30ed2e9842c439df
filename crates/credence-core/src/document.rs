// crates/credence-core/src/document.rs
//
// Keyed document model consumed from the backing store.
//
// Every record lives under a `(Collection, id)` key and carries a version
// that the store replaces on each write. Transactions pin the versions they
// read through `Precondition`s, so a commit either sees exactly the state
// it was computed from or fails with `Conflict`.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::CredenceError;

/// Named key spaces of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Collection {
    DomainCredibility,
    CommunityPosts,
    PostVotes,
    PostComments,
    CommentVotes,
    NewsAnalyses,
}

impl Collection {
    /// Stable tag used in encoded keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::DomainCredibility => "domain_credibility",
            Collection::CommunityPosts => "community_posts",
            Collection::PostVotes => "post_votes",
            Collection::PostComments => "post_comments",
            Collection::CommentVotes => "comment_votes",
            Collection::NewsAnalyses => "news_analyses",
        }
    }

    /// Prefix shared by every encoded key in this collection: `{tag}:`.
    pub fn key_prefix(&self) -> String {
        format!("{}:", self.as_str())
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address of a single document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocKey {
    pub collection: Collection,
    pub id: String,
}

impl DocKey {
    pub fn new(collection: Collection, id: impl Into<String>) -> Self {
        Self {
            collection,
            id: id.into(),
        }
    }

    /// Flat key format: `{collection}:{id}`.
    pub fn encode(&self) -> String {
        format!("{}:{}", self.collection.as_str(), self.id)
    }
}

impl fmt::Display for DocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.collection, self.id)
    }
}

/// A stored document: JSON body plus a monotonically increasing version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Store-assigned write sequence number. Strictly increases on every
    /// write to the key and is never reused, even after a delete.
    pub version: u64,
    pub body: serde_json::Value,
}

impl Document {
    /// Decode the body into a typed record.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, CredenceError> {
        Ok(serde_json::from_value(self.body.clone())?)
    }
}

/// Expected state of a key at commit time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Precondition {
    pub key: DocKey,
    /// `None` requires the key to be absent.
    pub expected_version: Option<u64>,
}

impl Precondition {
    pub fn absent(key: DocKey) -> Self {
        Self {
            key,
            expected_version: None,
        }
    }

    pub fn at_version(key: DocKey, version: u64) -> Self {
        Self {
            key,
            expected_version: Some(version),
        }
    }
}

/// A single mutation inside an atomic commit.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    Put { key: DocKey, body: serde_json::Value },
    Delete { key: DocKey },
}

impl Write {
    /// Serialize a typed record into a `Put`.
    pub fn put<T: Serialize>(key: DocKey, record: &T) -> Result<Self, CredenceError> {
        Ok(Write::Put {
            key,
            body: serde_json::to_value(record)?,
        })
    }

    pub fn delete(key: DocKey) -> Self {
        Write::Delete { key }
    }

    pub fn key(&self) -> &DocKey {
        match self {
            Write::Put { key, .. } | Write::Delete { key } => key,
        }
    }
}
