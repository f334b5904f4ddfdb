//! The charity record produced for every parsed detail page
//!
//! A record is built in one parse and handed to the sink by value; nothing
//! mutates it afterwards. The identity block is always present; location and
//! the rating block are independently optional.

mod attributes;
mod financial;

pub use attributes::{AttributeFlag, Form990Attribute, PackedAttributes, WebsiteAttribute};
pub use financial::{FinancialField, Financials};

use serde::Deserialize;

/// Fields every detail page must provide
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub name: String,
    pub tagline: Option<String>,
    pub category_l1: String,
    pub category_l2: String,
}

/// A "City, ST ZIP" address line split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub city: String,
    pub state: String,
    pub zip: String,
}

/// The three scored categories on a rated page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingCategory {
    Overall,
    Financial,
    AccTrans,
}

impl RatingCategory {
    pub const ALL: [Self; 3] = [Self::Overall, Self::Financial, Self::AccTrans];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Overall => "overall",
            Self::Financial => "financial",
            Self::AccTrans => "acc_trans",
        }
    }
}

/// Score and star rating for one category
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CategoryScore {
    /// 0 to 100 score; absent when the cell is missing or not a number
    pub score: Option<f64>,
    /// Stars, 0 to 4; `Some(0)` when no star label is shown, absent when the
    /// label is not recognized
    pub rating: Option<u8>,
}

/// Everything only a rated charity's page carries
#[derive(Debug, Clone, PartialEq)]
pub struct RatingBlock {
    pub overall: CategoryScore,
    pub financial: CategoryScore,
    pub acc_trans: CategoryScore,
    pub mission: Option<String>,
    pub attributes_990: PackedAttributes<Form990Attribute>,
    pub attributes_website: PackedAttributes<WebsiteAttribute>,
    pub financials: Financials,
    /// Compensation text with `,` and `$` stripped ("Not compensated" kept as-is)
    pub leader_comp: Option<String>,
}

impl RatingBlock {
    pub fn category(&self, category: RatingCategory) -> &CategoryScore {
        match category {
            RatingCategory::Overall => &self.overall,
            RatingCategory::Financial => &self.financial,
            RatingCategory::AccTrans => &self.acc_trans,
        }
    }

    pub fn category_mut(&mut self, category: RatingCategory) -> &mut CategoryScore {
        match category {
            RatingCategory::Overall => &mut self.overall,
            RatingCategory::Financial => &mut self.financial,
            RatingCategory::AccTrans => &mut self.acc_trans,
        }
    }

    pub fn num_990_attributes(&self) -> u32 {
        self.attributes_990.count()
    }

    pub fn num_website_attributes(&self) -> u32 {
        self.attributes_website.count()
    }
}

/// One row of the output dataset
#[derive(Debug, Clone, PartialEq)]
pub struct CharityRecord {
    pub identity: Identity,
    pub location: Option<Location>,
    pub rating: Option<RatingBlock>,
}

impl CharityRecord {
    /// Returns true if the page carried a rating container
    pub fn is_rated(&self) -> bool {
        self.rating.is_some()
    }

    pub fn revenue_total(&self) -> Option<i64> {
        self.rating.as_ref()?.financials.revenue_total()
    }

    pub fn expenses_total(&self) -> Option<i64> {
        self.rating.as_ref()?.financials.expenses_total()
    }

    /// Column names of the dataset, in row order
    pub fn csv_header() -> Vec<&'static str> {
        let mut header = vec![
            "name",
            "tagline",
            "category_l1",
            "category_l2",
            "location_city",
            "location_state",
            "location_zip",
            "score_overall",
            "score_financial",
            "score_acc_trans",
            "rating_overall",
            "rating_financial",
            "rating_acc_trans",
            "mission",
            "attributes_990",
            "attributes_website",
        ];
        header.extend(Form990Attribute::all().iter().map(|f| f.column()));
        header.extend(WebsiteAttribute::all().iter().map(|f| f.column()));
        header.push("num_990_attributes");
        header.push("num_website_attributes");
        header.extend(FinancialField::ALL.iter().map(|f| f.column()));
        header.extend(["revenue_total", "expenses_total", "leader_comp"]);
        header
    }

    /// Renders the record as one dataset row; absent values are empty strings
    pub fn to_csv_row(&self) -> Vec<String> {
        let id = &self.identity;
        let mut row = vec![
            id.name.clone(),
            opt(&id.tagline),
            id.category_l1.clone(),
            id.category_l2.clone(),
        ];

        match &self.location {
            Some(loc) => row.extend([loc.city.clone(), loc.state.clone(), loc.zip.clone()]),
            None => row.extend(std::iter::repeat(String::new()).take(3)),
        }

        let rating = self.rating.as_ref();
        for category in RatingCategory::ALL {
            row.push(opt(&rating.and_then(|r| r.category(category).score)));
        }
        for category in RatingCategory::ALL {
            row.push(opt(&rating.and_then(|r| r.category(category).rating)));
        }
        row.push(opt(&rating.and_then(|r| r.mission.clone())));
        row.push(opt(&rating.map(|r| r.attributes_990.bits())));
        row.push(opt(&rating.map(|r| r.attributes_website.bits())));

        for flag in Form990Attribute::all() {
            row.push(opt(&rating.map(|r| r.attributes_990.contains(*flag))));
        }
        for flag in WebsiteAttribute::all() {
            row.push(opt(&rating.map(|r| r.attributes_website.contains(*flag))));
        }
        row.push(opt(&rating.map(|r| r.num_990_attributes())));
        row.push(opt(&rating.map(|r| r.num_website_attributes())));

        for field in FinancialField::ALL {
            row.push(opt(&rating.and_then(|r| r.financials.get(field))));
        }
        row.push(opt(&self.revenue_total()));
        row.push(opt(&self.expenses_total()));
        row.push(opt(&rating.and_then(|r| r.leader_comp.clone())));

        row
    }
}

fn opt<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}
