//! Repository and service modules.
//!
//! Each module exposes free functions over a `rusqlite::Connection` (so several operations can
//! share one transaction, as the bulk importer does) and a service type that wraps them in a
//! transaction per call.

pub mod catalog;
pub mod contact;
pub mod declarations;
pub mod membership;
pub mod patient;

use serde::Serialize;

/// Outcome of an upsert keyed by a business identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Upserted {
    Created,
    Updated,
    Unchanged,
}

/// `LIKE` pattern for a case-insensitive substring search against `fold_case(column)`.
pub(crate) fn like_pattern(query: &str) -> String {
    let escaped = query
        .trim()
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}
