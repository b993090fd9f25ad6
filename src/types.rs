//! Common types used throughout the Billomat client
//!
//! This module contains shared type definitions, type aliases,
//! and small enums used across multiple modules.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// One opaque record returned by the API (a client, an invoice item, ...)
pub type Record = JsonObject;

/// Resource-specific search filters, sent as query parameters.
///
/// Ordered so that generated URLs are stable.
pub type Filters = BTreeMap<String, String>;

// ============================================================================
// Failure Policy
// ============================================================================

/// What an aggregator does when a single page request fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort the whole collection and return the error
    #[default]
    FailFast,
    /// Log the failure, treat the page as empty and keep going
    LogAndSkip,
}

impl FailurePolicy {
    /// Whether a failed request aborts the collection
    pub fn is_fail_fast(self) -> bool {
        matches!(self, Self::FailFast)
    }
}

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}
