//! Detail page parsing
//!
//! Builds one [`CharityRecord`] from one detail page:
//! 1. Identity (required; a missing name or breadcrumb voids the page)
//! 2. Location (optional; the configured address line, then the next one)
//! 3. Rating block, only when the page classifies as rated

use super::classify::{classify, PageClass};
use super::field::{
    attr, cell, first_text, is_location_line, parse_financial_cell, parse_location, parse_score,
    rating_rank, strip_currency, td, text_lines,
};
use super::PageError;
use crate::record::{
    AttributeFlag, CharityRecord, Financials, Identity, Location, PackedAttributes, RatingBlock,
};
use crate::schema::{AttributeRow, CompiledSchema};
use scraper::{ElementRef, Html};

/// Parses a detail page into a record
///
/// # Arguments
///
/// * `html` - The page body
/// * `schema` - The compiled layout of the site
///
/// # Returns
///
/// * `Ok(CharityRecord)` - The page yielded a record; optional blocks may be absent
/// * `Err(PageError)` - A required identity field is missing or malformed
pub fn parse_detail_page(html: &str, schema: &CompiledSchema) -> Result<CharityRecord, PageError> {
    let document = Html::parse_document(html);
    parse_document(&document, schema)
}

/// Same as [`parse_detail_page`] for an already parsed document
pub fn parse_document(document: &Html, schema: &CompiledSchema) -> Result<CharityRecord, PageError> {
    let identity = extract_identity(document, schema)?;
    let location = extract_location(document, schema);

    let rating = match classify(document, schema) {
        PageClass::Rated { container } => Some(extract_rating(container, schema, &identity.name)),
        PageClass::IdentityOnly => None,
    };

    Ok(CharityRecord {
        identity,
        location,
        rating,
    })
}

fn extract_identity(document: &Html, schema: &CompiledSchema) -> Result<Identity, PageError> {
    let name = schema
        .name
        .find(document)
        .and_then(first_text)
        .ok_or(PageError::MissingField("name"))?;

    let tagline = schema.tagline.find(document).and_then(first_text);

    let crumbs = schema
        .crumbs
        .find(document)
        .and_then(first_text)
        .ok_or(PageError::MissingField("crumbs"))?;

    let parts: Vec<&str> = crumbs
        .split(schema.crumb_delimiter.as_str())
        .map(str::trim)
        .collect();
    let [category_l1, category_l2] = parts.as_slice() else {
        return Err(PageError::MalformedCategory(crumbs.clone()));
    };
    if category_l1.is_empty() || category_l2.is_empty() {
        return Err(PageError::MalformedCategory(crumbs.clone()));
    }

    Ok(Identity {
        category_l1: category_l1.to_string(),
        category_l2: category_l2.to_string(),
        name,
        tagline,
    })
}

/// Reads the configured address line, or the line after it when the
/// configured one has no "City, ST 12345" shape at all
///
/// A line with the shape but the wrong token layout gives no location.
fn extract_location(document: &Html, schema: &CompiledSchema) -> Option<Location> {
    let lines = text_lines(schema.address.find(document)?);
    let first = schema.address_line;

    match lines.get(first) {
        Some(line) if is_location_line(line) => parse_location(line),
        _ => lines.get(first + 1).and_then(|line| parse_location(line)),
    }
}

fn extract_rating(container: ElementRef<'_>, schema: &CompiledSchema, name: &str) -> RatingBlock {
    let mut block = RatingBlock {
        overall: Default::default(),
        financial: Default::default(),
        acc_trans: Default::default(),
        mission: schema.mission.find_in(container).and_then(first_text),
        attributes_990: PackedAttributes::empty(),
        attributes_website: PackedAttributes::empty(),
        financials: Financials::new(),
        leader_comp: None,
    };

    let score_table = schema.score_table.find_in(container);
    if score_table.is_none() {
        tracing::debug!("{}: score table not found", name);
    }
    for row in &schema.scores {
        let score_cell = score_table.and_then(|t| td(t, row.row, schema.score_column));
        let label = score_table
            .and_then(|t| td(t, row.row, schema.rating_column))
            .and_then(|c| c.select(&schema.rating_label).next())
            .and_then(first_text);

        let slot = block.category_mut(row.category);
        slot.score = score_cell
            .and_then(first_text)
            .and_then(|text| parse_score(&text));
        slot.rating = match rating_rank(label.as_deref()) {
            Ok(rank) => Some(rank),
            Err(e) => {
                tracing::warn!("{}: {} ({})", name, e, row.category.as_str());
                None
            }
        };
    }

    let metrics = schema.metrics_table.find_in(container);
    if metrics.is_none() {
        tracing::debug!("{}: metrics table not found", name);
    }
    block.attributes_990 = packed_flags(metrics, &schema.attributes_990, schema);
    block.attributes_website = packed_flags(metrics, &schema.attributes_website, schema);

    match schema.income_table.find_in(container) {
        Some(table) => {
            for row in &schema.financial_rows {
                let text = td(table, row.row, schema.financial_column).and_then(first_text);
                let value = parse_financial_cell(text.as_deref());
                if value.is_none() {
                    tracing::debug!(
                        "{}: unreadable {} cell {:?}",
                        name,
                        row.field.column(),
                        text
                    );
                }
                block.financials.set(row.field, value);
            }
        }
        None => tracing::warn!("{}: income table not found", name),
    }

    block.leader_comp = schema
        .leader_table
        .find_in(container)
        .and_then(|t| cell(t, &schema.leader_comp))
        .and_then(first_text)
        .map(|text| strip_currency(&text))
        .filter(|text| !text.is_empty());

    block
}

/// Tests each listed row on its own and packs the checked ones
fn packed_flags<F: AttributeFlag>(
    table: Option<ElementRef<'_>>,
    rows: &[AttributeRow<F>],
    schema: &CompiledSchema,
) -> PackedAttributes<F> {
    let Some(table) = table else {
        return PackedAttributes::empty();
    };

    PackedAttributes::from_flags(
        rows.iter()
            .filter(|row| {
                td(table, row.row, schema.attribute_column)
                    .and_then(|c| c.select(&schema.attribute_marker).next())
                    .and_then(|marker| attr(marker, "src"))
                    .is_some_and(|src| src.contains(schema.checked_src.as_str()))
            })
            .map(|row| row.flag),
    )
}
