//! Site layout descriptor
//!
//! This module provides:
//! - [`SiteSchema`]: the serde-loadable layout of one site revision
//! - [`CompiledSchema`]: the same layout with every selector parsed

mod compiled;
mod types;

pub use compiled::{CompiledCell, CompiledLinkRule, CompiledLocator, CompiledSchema};
pub use types::{AttributeRow, CellLocator, FinancialRow, LinkRule, Locator, ScoreRow, SiteSchema};

use thiserror::Error;

/// Errors in the layout descriptor; always fatal
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Invalid selector for {field} ({selector}): {message}")]
    InvalidSelector {
        field: &'static str,
        selector: String,
        message: String,
    },

    #[error("Duplicate entry in {table}: {name}")]
    Duplicate { table: &'static str, name: String },

    #[error("Schema value must not be empty: {0}")]
    Empty(&'static str),
}

pub type SchemaResult<T> = std::result::Result<T, SchemaError>;
