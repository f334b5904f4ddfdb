//! Financial line items read from a charity's income statement table

use serde::Deserialize;

/// A named line item of the income statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinancialField {
    ContributionsGiftsGrants,
    ContributionsFederatedCampaigns,
    ContributionsMembershipDues,
    ContributionsFundraisingEvents,
    ContributionsRelatedOrganizations,
    ContributionsGovernmentGrants,
    ContributionsTot,
    RevenueProgramService,
    PrimaryRevenueTotal,
    RevenueOther,
    ExpensesProgram,
    ExpensesAdmin,
    ExpensesFundraising,
    AffiliatePayments,
    Excess,
    NetAssets,
}

impl FinancialField {
    pub const COUNT: usize = 16;

    /// Every line item, in dataset column order
    pub const ALL: [Self; Self::COUNT] = [
        Self::ContributionsGiftsGrants,
        Self::ContributionsFederatedCampaigns,
        Self::ContributionsMembershipDues,
        Self::ContributionsFundraisingEvents,
        Self::ContributionsRelatedOrganizations,
        Self::ContributionsGovernmentGrants,
        Self::ContributionsTot,
        Self::RevenueProgramService,
        Self::PrimaryRevenueTotal,
        Self::RevenueOther,
        Self::ExpensesProgram,
        Self::ExpensesAdmin,
        Self::ExpensesFundraising,
        Self::AffiliatePayments,
        Self::Excess,
        Self::NetAssets,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Self::ContributionsGiftsGrants => "contributions_gifts_grants",
            Self::ContributionsFederatedCampaigns => "contributions_federated_campaigns",
            Self::ContributionsMembershipDues => "contributions_membership_dues",
            Self::ContributionsFundraisingEvents => "contributions_fundraising_events",
            Self::ContributionsRelatedOrganizations => "contributions_related_organizations",
            Self::ContributionsGovernmentGrants => "contributions_government_grants",
            Self::ContributionsTot => "contributions_tot",
            Self::RevenueProgramService => "revenue_program_service",
            Self::PrimaryRevenueTotal => "primary_revenue_total",
            Self::RevenueOther => "revenue_other",
            Self::ExpensesProgram => "expenses_program",
            Self::ExpensesAdmin => "expenses_admin",
            Self::ExpensesFundraising => "expenses_fundraising",
            Self::AffiliatePayments => "affiliate_payments",
            Self::Excess => "excess",
            Self::NetAssets => "net_assets",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Income statement values, one slot per [`FinancialField`]
///
/// A slot is `None` only when the cell held text that is not a number; blank
/// and placeholder cells are stored as zero by the extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Financials {
    values: [Option<i64>; FinancialField::COUNT],
}

impl Financials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: FinancialField) -> Option<i64> {
        self.values[field.index()]
    }

    pub fn set(&mut self, field: FinancialField, value: Option<i64>) {
        self.values[field.index()] = value;
    }

    /// `primary_revenue_total + revenue_other`
    pub fn revenue_total(&self) -> Option<i64> {
        self.sum(&[FinancialField::PrimaryRevenueTotal, FinancialField::RevenueOther])
    }

    /// `expenses_program + expenses_admin + expenses_fundraising`
    pub fn expenses_total(&self) -> Option<i64> {
        self.sum(&[
            FinancialField::ExpensesProgram,
            FinancialField::ExpensesAdmin,
            FinancialField::ExpensesFundraising,
        ])
    }

    fn sum(&self, fields: &[FinancialField]) -> Option<i64> {
        fields
            .iter()
            .try_fold(0i64, |acc, f| acc.checked_add(self.get(*f)?))
    }
}
