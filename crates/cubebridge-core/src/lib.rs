//! # cubebridge-core
//!
//! The deterministic question compiler for cubebridge - THE LOGIC.
//!
//! This crate turns free-text business questions into structured Cube.dev
//! queries against a fixed metric vocabulary. It knows nothing about
//! transports or HTTP; the bridge binary owns all I/O.
//!
//! ## Architectural Constraints
//!
//! The core:
//! - Is a total function over strings: every question yields a valid query
//! - Is deterministic: static rule tables evaluated in a fixed order
//! - Does no NLP: matching is plain substring containment
//! - Has NO async, NO network dependencies (pure Rust)

// =============================================================================
// MODULES
// =============================================================================

pub mod compiler;
pub mod rules;
pub mod suggest;
pub mod types;
pub mod vocabulary;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{CubebridgeError, Granularity, Query, SortDirection, TimeDimension};

// =============================================================================
// RE-EXPORTS: Compiler
// =============================================================================

pub use compiler::{QueryCompiler, compile};
pub use suggest::{Suggestion, available_cubes, common_analyses, contextual_suggestions};
