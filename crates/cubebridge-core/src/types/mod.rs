//! # Core Type Definitions
//!
//! This module contains the Cube.dev query model shared by the compiler and
//! the bridge:
//! - The structured query (`Query`) and its parts (`TimeDimension`,
//!   `Granularity`, `SortDirection`)
//! - Error types (`CubebridgeError`)
//!
//! ## Wire Format
//!
//! `Query` serializes to the JSON accepted by the Cube REST `load` endpoint:
//! camelCase keys, empty sequences and unset options omitted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// =============================================================================
// TIME GRAINS
// =============================================================================

/// Granularity of a time dimension bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Week,
    Month,
    Year,
}

impl Granularity {
    /// Wire name of the granularity.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A time dimension bucketed at a fixed granularity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeDimension {
    /// The `<entity>.<attribute>` date column.
    pub dimension: String,
    /// Bucket size.
    pub granularity: Granularity,
}

impl TimeDimension {
    /// Create a new time dimension.
    #[must_use]
    pub fn new(dimension: impl Into<String>, granularity: Granularity) -> Self {
        Self {
            dimension: dimension.into(),
            granularity,
        }
    }
}

// =============================================================================
// ORDERING
// =============================================================================

/// Sort direction for the `order` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => f.write_str("asc"),
            Self::Desc => f.write_str("desc"),
        }
    }
}

// =============================================================================
// QUERY
// =============================================================================

/// A structured query against the semantic layer.
///
/// A query is valid only if it names at least one measure or one dimension;
/// the backend rejects anything else. The compiler never produces an
/// invalid query, but queries deserialized from callers may be invalid.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    /// Aggregated metrics, in output column order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub measures: Vec<String>,

    /// Grouping attributes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dimensions: Vec<String>,

    /// Time bucketing.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub time_dimensions: Vec<TimeDimension>,

    /// Opaque filter predicates, passed through untouched.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<serde_json::Value>,

    /// Sort clause. The compiler only ever sets a single entry.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub order: BTreeMap<String, SortDirection>,

    /// Maximum number of rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl Query {
    /// Create an empty (invalid) query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a query from measure and dimension identifiers.
    #[must_use]
    pub fn from_members(measures: &[&str], dimensions: &[&str]) -> Self {
        Self {
            measures: measures.iter().map(|m| (*m).to_string()).collect(),
            dimensions: dimensions.iter().map(|d| (*d).to_string()).collect(),
            ..Self::default()
        }
    }

    /// Replace the sort clause with a single `member: direction` entry.
    #[must_use]
    pub fn with_order(mut self, member: &str, direction: SortDirection) -> Self {
        self.sort_by(member, direction);
        self
    }

    /// Set the row limit.
    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Replace the sort clause with a single `member: direction` entry.
    pub fn sort_by(&mut self, member: &str, direction: SortDirection) {
        self.order.clear();
        self.order.insert(member.to_string(), direction);
    }

    /// Direction the query sorts `member` in, if any.
    #[must_use]
    pub fn order_for(&self, member: &str) -> Option<SortDirection> {
        self.order.get(member).copied()
    }

    /// Whether the query names at least one measure or dimension.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.measures.is_empty() || !self.dimensions.is_empty()
    }

    /// Check the query shape before it is sent to a backend.
    ///
    /// # Errors
    ///
    /// - `CubebridgeError::EmptyQuery` if no measure or dimension is named.
    /// - `CubebridgeError::InvalidMember` if an identifier is not of the
    ///   `<entity>.<member>` form.
    /// - `CubebridgeError::InvalidLimit` if the limit is zero.
    pub fn validate(&self) -> Result<(), CubebridgeError> {
        if !self.is_valid() {
            return Err(CubebridgeError::EmptyQuery);
        }

        let members = self
            .measures
            .iter()
            .chain(&self.dimensions)
            .chain(self.time_dimensions.iter().map(|td| &td.dimension))
            .chain(self.order.keys());
        for member in members {
            if !is_member_identifier(member) {
                return Err(CubebridgeError::InvalidMember(member.clone()));
            }
        }

        if self.limit == Some(0) {
            return Err(CubebridgeError::InvalidLimit);
        }
        Ok(())
    }

    /// Serialize to the JSON accepted by the backend.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Whether `member` has the `<entity>.<member>` shape.
#[must_use]
pub fn is_member_identifier(member: &str) -> bool {
    match member.split_once('.') {
        Some((entity, name)) => !entity.is_empty() && !name.is_empty() && !name.contains('.'),
        None => false,
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur when checking queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CubebridgeError {
    /// The query names neither a measure nor a dimension.
    #[error("Query must contain at least one measure or dimension")]
    EmptyQuery,

    /// A member identifier is not of the `<entity>.<member>` form.
    #[error("Invalid member identifier: {0}")]
    InvalidMember(String),

    /// The row limit is zero.
    #[error("Query limit must be a positive integer")]
    InvalidLimit,
}

// =============================================================================
// TESTS
// =============================================================================
