//! Fatal errors. Recoverable problems are reported as diagnostics instead.

use crate::model::Platform;
use thiserror::Error;

/// Errors reading the external parser's node trees.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("{file}: cannot read document: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{file}: invalid document: {source}")]
    Json {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{file}: unknown element <{tag}>")]
    UnknownElement { file: String, tag: String },

    #[error("{file}: root element is <{found}>, expected <repository>")]
    NotARepository { file: String, found: String },

    #[error("{file}: repository must contain exactly one namespace, found {count}")]
    NamespaceCount { file: String, count: usize },

    #[error("{file}: namespace has no name")]
    UnnamedNamespace { file: String },

    #[error("namespace {namespace} is defined twice on {platform}: {first} and {second}")]
    DuplicateNamespace {
        namespace: String,
        platform: Platform,
        first: String,
        second: String,
    },
}

/// Merge failures that priority order cannot settle.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("more than one input for platform {0}")]
    DuplicatePlatform(Platform),

    #[error("invalid merge priority: {0}")]
    InvalidPolicy(String),

    #[error("repository {repository} has neither a module platform nor platform annotations")]
    MissingPlatform { repository: String },

    #[error("{repository}: conflicting definitions of {key} on {platform}")]
    Conflict {
        repository: String,
        key: String,
        platform: String,
    },
}

/// A programmatic patch failed or panicked.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("patch {patch} failed in {namespace}: {message}")]
    Failed {
        patch: &'static str,
        namespace: String,
        message: String,
    },

    #[error("patch {patch} panicked in {namespace}: {message}")]
    Panicked {
        patch: &'static str,
        namespace: String,
        message: String,
    },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Patch(#[from] PatchError),
}

pub type Result<T> = std::result::Result<T, Error>;
