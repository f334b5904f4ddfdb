//! HTML extraction
//!
//! This module turns fetched pages into data:
//! - [`field`]: typed values out of single fragments
//! - [`classify`]: rated or identity-only detail pages
//! - [`detail`]: one [`CharityRecord`](crate::record::CharityRecord) per detail page
//! - [`links`]: next-tier URLs from index and directory pages

pub mod classify;
pub mod detail;
pub mod field;
pub mod links;

pub use classify::{classify, PageClass};
pub use detail::{parse_detail_page, parse_document};
pub use links::{discover_links, DiscoveredLinks};

use thiserror::Error;

/// A field value the extractor refuses to interpret
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Unknown star rating label: {0:?}")]
    UnknownRatingLabel(String),
}

/// Reasons a detail page yields no record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    #[error("Required field not found: {0}")]
    MissingField(&'static str),

    #[error("Category breadcrumb does not split into two parts: {0:?}")]
    MalformedCategory(String),
}
