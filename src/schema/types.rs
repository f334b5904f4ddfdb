//! Declarative description of the site's HTML layout
//!
//! Every position the extractor reads is data here rather than code, so a site
//! redesign is a `[schema]` override in the config file instead of a rebuild.
//! Rows and columns are zero-based; html5ever's implicit `tbody` is looked
//! through when counting rows.

use crate::record::{
    AttributeFlag, FinancialField, Form990Attribute, RatingCategory, WebsiteAttribute,
};
use serde::Deserialize;

/// A CSS selector plus which of its matches to use
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Locator {
    pub selector: String,

    /// Zero-based index into the matches, in document order
    #[serde(default)]
    pub nth: usize,
}

impl Locator {
    pub fn new(selector: &str) -> Self {
        Self::nth(selector, 0)
    }

    pub fn nth(selector: &str, nth: usize) -> Self {
        Self {
            selector: selector.to_string(),
            nth,
        }
    }
}

/// A `td` inside a table, optionally narrowed to an element within it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CellLocator {
    pub row: usize,
    pub column: usize,
    #[serde(default)]
    pub inner: Option<String>,
}

/// Where a listing page keeps the links to the next tier
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LinkRule {
    /// Selector for the elements holding the links
    pub container: String,

    /// Only the `nth` container; every container when absent
    #[serde(default)]
    pub nth: Option<usize>,

    /// Selector for the anchors inside a container
    #[serde(default = "default_anchor")]
    pub anchor: String,
}

fn default_anchor() -> String {
    "a[href]".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ScoreRow {
    pub category: RatingCategory,
    pub row: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AttributeRow<F> {
    pub row: usize,
    pub flag: F,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct FinancialRow {
    pub row: usize,
    pub field: FinancialField,
}

/// Layout of one revision of the charity-rating site
///
/// Locators under the rating section are resolved inside the rating
/// container; the rest are resolved against the whole document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SiteSchema {
    /// Free-form revision tag, copied into the crawl report
    pub version: String,

    // ===== Link tiers =====
    pub index_links: LinkRule,
    pub directory_links: LinkRule,

    // ===== Identity =====
    pub name: Locator,
    pub tagline: Locator,
    pub crumbs: Locator,
    pub crumb_delimiter: String,

    // ===== Location =====
    pub address: Locator,
    /// Text line expected to hold "City, ST ZIP"; the next line is tried
    /// when this one does not match
    pub address_line: usize,

    // ===== Rating section =====
    pub rating_container: Locator,

    pub score_table: Locator,
    pub score_column: usize,
    pub rating_column: usize,
    /// Element inside the rating cell whose text is the star label
    pub rating_label: String,
    pub scores: Vec<ScoreRow>,

    pub mission: Locator,

    pub metrics_table: Locator,
    pub attribute_column: usize,
    /// Element inside the attribute cell carrying the check mark
    pub attribute_marker: String,
    /// Substring of the marker's `src` meaning the flag is set
    pub checked_src: String,
    pub attributes_990: Vec<AttributeRow<Form990Attribute>>,
    pub attributes_website: Vec<AttributeRow<WebsiteAttribute>>,

    pub income_table: Locator,
    pub financial_column: usize,
    pub financial_rows: Vec<FinancialRow>,

    pub leader_table: Locator,
    pub leader_comp: CellLocator,
}

impl Default for SiteSchema {
    fn default() -> Self {
        use FinancialField::*;

        let attributes_990 = Form990Attribute::all()
            .iter()
            .copied()
            .enumerate()
            .map(|(i, flag)| AttributeRow { row: i + 1, flag })
            .collect();
        let attributes_website = WebsiteAttribute::all()
            .iter()
            .copied()
            .enumerate()
            .map(|(i, flag)| AttributeRow { row: i + 14, flag })
            .collect();

        let financial_rows = [
            (2, ContributionsGiftsGrants),
            (3, ContributionsFederatedCampaigns),
            (4, ContributionsMembershipDues),
            (5, ContributionsFundraisingEvents),
            (6, ContributionsRelatedOrganizations),
            (7, ContributionsGovernmentGrants),
            (8, ContributionsTot),
            (9, RevenueProgramService),
            (10, PrimaryRevenueTotal),
            (11, RevenueOther),
            (15, ExpensesProgram),
            (16, ExpensesAdmin),
            (17, ExpensesFundraising),
            (20, AffiliatePayments),
            (21, Excess),
            (23, NetAssets),
        ]
        .into_iter()
        .map(|(row, field)| FinancialRow { row, field })
        .collect();

        Self {
            version: "2018-rating-wrapper".to_string(),

            // Only the first letters block is read; any later block repeats
            // the same alphabet
            index_links: LinkRule {
                container: r#"[class="letters"]"#.to_string(),
                nth: Some(0),
                anchor: default_anchor(),
            },
            directory_links: LinkRule {
                container: r#"div[class="mobile-padding charities"]"#.to_string(),
                nth: None,
                anchor: default_anchor(),
            },

            name: Locator::new(r#"h1[class="charityname"]"#),
            tagline: Locator::new(r#"h2[class="tagline"]"#),
            crumbs: Locator::new(r#"p[class="crumbs"]"#),
            crumb_delimiter: " : ".to_string(),

            address: Locator::new("div#leftnavcontent > div > p"),
            address_line: 1,

            rating_container: Locator::new(r#"div[class="rating-wrapper"]"#),

            score_table: Locator::new(
                r#"div[class="summaryBox"] div[class="shadedtable"] > table"#,
            ),
            score_column: 1,
            rating_column: 2,
            rating_label: "strong svg title".to_string(),
            scores: vec![
                ScoreRow {
                    category: RatingCategory::Overall,
                    row: 1,
                },
                ScoreRow {
                    category: RatingCategory::Financial,
                    row: 2,
                },
                ScoreRow {
                    category: RatingCategory::AccTrans,
                    row: 3,
                },
            ],

            mission: Locator::new(r#"div[class="summaryBox"] div[class="summaryBox cn-table"] p"#),

            // The second accordion table of the summary box, counted in
            // document order; the first one does not hold the attribute rows
            metrics_table: Locator::nth(
                r#"div[class="summaryBox"] div[class="shadedtable cn-accordion-rating"] table"#,
                1,
            ),
            attribute_column: 2,
            attribute_marker: "img".to_string(),
            checked_src: "/checked.gif".to_string(),
            attributes_990,
            attributes_website,

            income_table: Locator::new(r#"div[class="summaryBox income-table"] table"#),
            financial_column: 1,
            financial_rows,

            // The second leadership accordion table carries the compensation
            leader_table: Locator::nth(r#"div[class="summaryBox cn-accordion-rating"] table"#, 1),
            leader_comp: CellLocator {
                row: 1,
                column: 0,
                inner: Some("span".to_string()),
            },
        }
    }
}
