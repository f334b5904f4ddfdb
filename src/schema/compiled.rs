//! Schema compilation
//!
//! Parses every selector once and checks the field tables, so a broken layout
//! descriptor stops the crawl before the first request instead of failing on
//! every page.

use super::types::{AttributeRow, FinancialRow, Locator, ScoreRow, SiteSchema};
use super::{SchemaError, SchemaResult};
use crate::record::{FinancialField, Form990Attribute, WebsiteAttribute};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

/// A [`Locator`] with its selector parsed
#[derive(Debug, Clone)]
pub struct CompiledLocator {
    pub selector: Selector,
    pub nth: usize,
}

impl CompiledLocator {
    fn compile(field: &'static str, locator: &Locator) -> SchemaResult<Self> {
        Ok(Self {
            selector: parse_selector(field, &locator.selector)?,
            nth: locator.nth,
        })
    }

    /// Finds the match in the whole document
    pub fn find<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        document.select(&self.selector).nth(self.nth)
    }

    /// Finds the match among the descendants of `scope`
    pub fn find_in<'a>(&self, scope: ElementRef<'a>) -> Option<ElementRef<'a>> {
        scope.select(&self.selector).nth(self.nth)
    }
}

/// A cell position with its inner selector parsed
#[derive(Debug, Clone)]
pub struct CompiledCell {
    pub row: usize,
    pub column: usize,
    pub inner: Option<Selector>,
}

/// A link rule with its selectors parsed
#[derive(Debug, Clone)]
pub struct CompiledLinkRule {
    pub container: Selector,
    pub nth: Option<usize>,
    pub anchor: Selector,
}

/// A [`SiteSchema`] ready for extraction
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    pub version: String,

    pub index_links: CompiledLinkRule,
    pub directory_links: CompiledLinkRule,

    pub name: CompiledLocator,
    pub tagline: CompiledLocator,
    pub crumbs: CompiledLocator,
    pub crumb_delimiter: String,

    pub address: CompiledLocator,
    pub address_line: usize,

    pub rating_container: CompiledLocator,

    pub score_table: CompiledLocator,
    pub score_column: usize,
    pub rating_column: usize,
    pub rating_label: Selector,
    pub scores: Vec<ScoreRow>,

    pub mission: CompiledLocator,

    pub metrics_table: CompiledLocator,
    pub attribute_column: usize,
    pub attribute_marker: Selector,
    pub checked_src: String,
    pub attributes_990: Vec<AttributeRow<Form990Attribute>>,
    pub attributes_website: Vec<AttributeRow<WebsiteAttribute>>,

    pub income_table: CompiledLocator,
    pub financial_column: usize,
    pub financial_rows: Vec<FinancialRow>,

    pub leader_table: CompiledLocator,
    pub leader_comp: CompiledCell,
}

impl SiteSchema {
    /// Parses every selector and validates the field tables
    ///
    /// # Returns
    ///
    /// * `Ok(CompiledSchema)` - The schema is usable for extraction
    /// * `Err(SchemaError)` - A selector does not parse, a table names the same
    ///   flag or field twice, or a required string is empty
    pub fn compile(&self) -> SchemaResult<CompiledSchema> {
        if self.version.trim().is_empty() {
            return Err(SchemaError::Empty("version"));
        }
        if self.crumb_delimiter.is_empty() {
            return Err(SchemaError::Empty("crumb-delimiter"));
        }
        if self.checked_src.is_empty() {
            return Err(SchemaError::Empty("checked-src"));
        }

        check_unique("scores", self.scores.iter().map(|s| s.category))?;
        check_unique("attributes-990", self.attributes_990.iter().map(|a| a.flag))?;
        check_unique(
            "attributes-website",
            self.attributes_website.iter().map(|a| a.flag),
        )?;
        check_unique(
            "financial-rows",
            self.financial_rows.iter().map(|f| f.field),
        )?;

        Ok(CompiledSchema {
            version: self.version.clone(),

            index_links: CompiledLinkRule {
                container: parse_selector("index-links.container", &self.index_links.container)?,
                nth: self.index_links.nth,
                anchor: parse_selector("index-links.anchor", &self.index_links.anchor)?,
            },
            directory_links: CompiledLinkRule {
                container: parse_selector(
                    "directory-links.container",
                    &self.directory_links.container,
                )?,
                nth: self.directory_links.nth,
                anchor: parse_selector("directory-links.anchor", &self.directory_links.anchor)?,
            },

            name: CompiledLocator::compile("name", &self.name)?,
            tagline: CompiledLocator::compile("tagline", &self.tagline)?,
            crumbs: CompiledLocator::compile("crumbs", &self.crumbs)?,
            crumb_delimiter: self.crumb_delimiter.clone(),

            address: CompiledLocator::compile("address", &self.address)?,
            address_line: self.address_line,

            rating_container: CompiledLocator::compile("rating-container", &self.rating_container)?,

            score_table: CompiledLocator::compile("score-table", &self.score_table)?,
            score_column: self.score_column,
            rating_column: self.rating_column,
            rating_label: parse_selector("rating-label", &self.rating_label)?,
            scores: self.scores.clone(),

            mission: CompiledLocator::compile("mission", &self.mission)?,

            metrics_table: CompiledLocator::compile("metrics-table", &self.metrics_table)?,
            attribute_column: self.attribute_column,
            attribute_marker: parse_selector("attribute-marker", &self.attribute_marker)?,
            checked_src: self.checked_src.clone(),
            attributes_990: self.attributes_990.clone(),
            attributes_website: self.attributes_website.clone(),

            income_table: CompiledLocator::compile("income-table", &self.income_table)?,
            financial_column: self.financial_column,
            financial_rows: self.financial_rows.clone(),

            leader_table: CompiledLocator::compile("leader-table", &self.leader_table)?,
            leader_comp: CompiledCell {
                row: self.leader_comp.row,
                column: self.leader_comp.column,
                inner: self
                    .leader_comp
                    .inner
                    .as_deref()
                    .map(|s| parse_selector("leader-comp.inner", s))
                    .transpose()?,
            },
        })
    }
}

impl CompiledSchema {
    /// Financial fields the schema never reads; always empty for the default
    pub fn unmapped_financial_fields(&self) -> Vec<FinancialField> {
        let mapped: HashSet<FinancialField> = self.financial_rows.iter().map(|f| f.field).collect();
        FinancialField::ALL
            .into_iter()
            .filter(|f| !mapped.contains(f))
            .collect()
    }
}

fn parse_selector(field: &'static str, selector: &str) -> SchemaResult<Selector> {
    Selector::parse(selector).map_err(|e| SchemaError::InvalidSelector {
        field,
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

fn check_unique<T, I>(table: &'static str, items: I) -> SchemaResult<()>
where
    T: std::hash::Hash + Eq + std::fmt::Debug,
    I: IntoIterator<Item = T>,
{
    let mut seen = HashSet::new();
    for item in items {
        let name = format!("{:?}", item);
        if !seen.insert(item) {
            return Err(SchemaError::Duplicate { table, name });
        }
    }
    Ok(())
}
