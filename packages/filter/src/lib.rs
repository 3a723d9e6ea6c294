#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Filter validation and SQL predicate compilation.
//!
//! Every endpoint funnels its raw query parameters through the same two
//! steps: [`FilterSpec::parse`] turns loosely-typed request parameters into
//! a validated, immutable filter, and [`predicate::compile`] turns that
//! filter into a WHERE clause with positionally-bound parameters. User data
//! never reaches the SQL text; only the fixed [`predicate::Column`]
//! allow-list is interpolated.

pub mod predicate;
pub mod spec;

pub use predicate::{Column, CompiledPredicate, compile};
pub use spec::{BucketRange, EffectiveFilters, FilterSpec, Pagination, RawFilter};

use thiserror::Error;

/// Maximum accepted `perPage` value; protects the store from unbounded
/// result sets.
pub const MAX_PER_PAGE: u32 = 5000;

/// `perPage` used when the client does not supply one.
pub const DEFAULT_PER_PAGE: u32 = 1000;

/// Errors produced while validating request parameters into a
/// [`FilterSpec`].
///
/// All variants are client faults: they are raised before any query is
/// issued and map to a 4xx response at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// A parameter the endpoint requires was not supplied.
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// A list token or scalar could not be parsed as an integer.
    #[error("invalid {field} value: '{value}' is not an integer")]
    InvalidInteger {
        /// Parameter the token belonged to.
        field: &'static str,
        /// The offending token.
        value: String,
    },

    /// An integer filter value fell outside its fixed domain.
    #[error("{field} value {value} is outside {min}..={max}")]
    OutOfRange {
        /// Parameter the value belonged to.
        field: &'static str,
        /// The offending value.
        value: i64,
        /// Lowest accepted value.
        min: i64,
        /// Highest accepted value.
        max: i64,
    },

    /// A finer geographic level was supplied without its coarser parent.
    #[error("{finer} filter requires {coarser} to be set")]
    IncompleteGeoHierarchy {
        /// The finer level that was supplied.
        finer: &'static str,
        /// The missing coarser level.
        coarser: &'static str,
    },

    /// The feature filter value is not a road-feature flag or `Day`/`Night`.
    #[error("unknown feature filter: '{0}'")]
    UnknownFeature(String),

    /// The bounding box string is not four comma-separated numbers.
    #[error("invalid bounding box '{0}': expected 'west,south,east,north'")]
    InvalidBoundingBox(String),

    /// An unsupported time dimension was requested.
    #[error("invalid time type: '{0}'")]
    InvalidTimeType(String),

    /// A bucket range has its start after its end.
    #[error("{field} range start {start} exceeds end {end}")]
    InvertedRange {
        /// Dimension the range applied to.
        field: &'static str,
        /// Range start.
        start: i32,
        /// Range end.
        end: i32,
    },

    /// `page` was zero.
    #[error("page must be at least 1")]
    PageOutOfRange,

    /// `perPage` was zero or above the ceiling.
    #[error("perPage must be between 1 and {ceiling}")]
    PerPageOutOfRange {
        /// The configured ceiling.
        ceiling: u32,
    },
}
