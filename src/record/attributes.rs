//! Bit-packed governance attribute sets
//!
//! The site publishes two checklists per rated charity: twelve items taken
//! from the IRS Form 990 and five items checked on the charity's own website.
//! Each checklist is stored as one integer whose bit `i` is the `i`-th item.

use serde::Deserialize;
use std::fmt;
use std::marker::PhantomData;

/// One named flag of a packed attribute set
pub trait AttributeFlag: Copy + Eq + fmt::Debug + 'static {
    /// Number of flags in the set; no bit at or above this is ever set
    const COUNT: u32;

    /// Every flag, in bit order
    fn all() -> &'static [Self];

    /// The flag's bit position
    fn bit(self) -> u32;

    /// Dataset column name for the decoded boolean
    fn column(self) -> &'static str;
}

/// Attributes reported on the charity's Form 990
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Form990Attribute {
    IndependentVotingBoard,
    NoMaterialDiversion,
    AuditedFinancials,
    NoRelatedPartyLoans,
    DocumentsBoardMinutes,
    Form990ToBoard,
    ConflictOfInterestPolicy,
    WhistleblowerPolicy,
    RecordsRetentionPolicy,
    CeoListedWithSalary,
    CeoCompensationProcess,
    BoardNotCompensated,
}

impl AttributeFlag for Form990Attribute {
    const COUNT: u32 = 12;

    fn all() -> &'static [Self] {
        use Form990Attribute::*;
        &[
            IndependentVotingBoard,
            NoMaterialDiversion,
            AuditedFinancials,
            NoRelatedPartyLoans,
            DocumentsBoardMinutes,
            Form990ToBoard,
            ConflictOfInterestPolicy,
            WhistleblowerPolicy,
            RecordsRetentionPolicy,
            CeoListedWithSalary,
            CeoCompensationProcess,
            BoardNotCompensated,
        ]
    }

    fn bit(self) -> u32 {
        self as u32
    }

    fn column(self) -> &'static str {
        match self {
            Self::IndependentVotingBoard => "form990_independent_voting_board",
            Self::NoMaterialDiversion => "form990_no_material_diversion",
            Self::AuditedFinancials => "form990_audited_financials",
            Self::NoRelatedPartyLoans => "form990_no_related_party_loans",
            Self::DocumentsBoardMinutes => "form990_documents_board_minutes",
            Self::Form990ToBoard => "form990_provided_to_board",
            Self::ConflictOfInterestPolicy => "form990_conflict_of_interest_policy",
            Self::WhistleblowerPolicy => "form990_whistleblower_policy",
            Self::RecordsRetentionPolicy => "form990_records_retention_policy",
            Self::CeoListedWithSalary => "form990_ceo_listed_with_salary",
            Self::CeoCompensationProcess => "form990_ceo_compensation_process",
            Self::BoardNotCompensated => "form990_board_not_compensated",
        }
    }
}

/// Disclosures found on the charity's website
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebsiteAttribute {
    DonorPrivacyPolicy,
    BoardMembersListed,
    AuditedFinancialsPublished,
    Form990Published,
    KeyStaffListed,
}

impl AttributeFlag for WebsiteAttribute {
    const COUNT: u32 = 5;

    fn all() -> &'static [Self] {
        use WebsiteAttribute::*;
        &[
            DonorPrivacyPolicy,
            BoardMembersListed,
            AuditedFinancialsPublished,
            Form990Published,
            KeyStaffListed,
        ]
    }

    fn bit(self) -> u32 {
        self as u32
    }

    fn column(self) -> &'static str {
        match self {
            Self::DonorPrivacyPolicy => "website_donor_privacy_policy",
            Self::BoardMembersListed => "website_board_members_listed",
            Self::AuditedFinancialsPublished => "website_audited_financials",
            Self::Form990Published => "website_form_990",
            Self::KeyStaffListed => "website_key_staff_listed",
        }
    }
}

/// A set of flags packed into an integer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedAttributes<F> {
    bits: u16,
    _flag: PhantomData<F>,
}

impl<F: AttributeFlag> PackedAttributes<F> {
    /// Bit mask covering every valid flag
    pub const MASK: u16 = ((1u32 << F::COUNT) - 1) as u16;

    /// The set with no flags
    pub fn empty() -> Self {
        Self {
            bits: 0,
            _flag: PhantomData,
        }
    }

    /// Wraps a raw integer, rejecting bits beyond the flag count
    pub fn from_bits(bits: u16) -> Option<Self> {
        (bits & !Self::MASK == 0).then_some(Self {
            bits,
            _flag: PhantomData,
        })
    }

    /// Encodes flags as the sum of their bit weights
    pub fn from_flags<I: IntoIterator<Item = F>>(flags: I) -> Self {
        let mut set = Self::empty();
        for flag in flags {
            set.insert(flag);
        }
        set
    }

    pub fn insert(&mut self, flag: F) {
        self.bits |= 1 << flag.bit();
    }

    pub fn contains(&self, flag: F) -> bool {
        self.bits & (1 << flag.bit()) != 0
    }

    /// The raw integer
    pub fn bits(&self) -> u16 {
        self.bits
    }

    /// Decodes every flag, in bit order
    pub fn flags(&self) -> impl Iterator<Item = (F, bool)> + '_ {
        F::all().iter().map(move |flag| (*flag, self.contains(*flag)))
    }

    /// Flags that are set, in bit order
    pub fn set_flags(&self) -> impl Iterator<Item = F> + '_ {
        self.flags().filter(|(_, set)| *set).map(|(flag, _)| flag)
    }

    /// Number of flags set
    pub fn count(&self) -> u32 {
        self.bits.count_ones()
    }
}

impl<F: AttributeFlag> Default for PackedAttributes<F> {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip<F: AttributeFlag>() {
        for raw in 0..(1u16 << F::COUNT) {
            let decoded = PackedAttributes::<F>::from_bits(raw).unwrap();
            let reencoded = PackedAttributes::<F>::from_flags(decoded.set_flags());
            assert_eq!(reencoded.bits(), raw);

            let weights: u16 = decoded
                .flags()
                .filter(|(_, set)| *set)
                .map(|(flag, _)| 1u16 << flag.bit())
                .sum();
            assert_eq!(weights, raw);
        }
    }

    #[test]
    fn test_form_990_round_trip() {
        round_trip::<Form990Attribute>();
    }

    #[test]
    fn test_website_round_trip() {
        round_trip::<WebsiteAttribute>();
    }

    #[test]
    fn test_bits_follow_declaration_order() {
        for (i, flag) in Form990Attribute::all().iter().enumerate() {
            assert_eq!(flag.bit(), i as u32);
        }
        for (i, flag) in WebsiteAttribute::all().iter().enumerate() {
            assert_eq!(flag.bit(), i as u32);
        }
        assert_eq!(Form990Attribute::all().len() as u32, Form990Attribute::COUNT);
        assert_eq!(WebsiteAttribute::all().len() as u32, WebsiteAttribute::COUNT);
    }

    #[test]
    fn test_out_of_range_bits_rejected() {
        assert!(PackedAttributes::<Form990Attribute>::from_bits(0x0FFF).is_some());
        assert!(PackedAttributes::<Form990Attribute>::from_bits(0x1000).is_none());
        assert!(PackedAttributes::<WebsiteAttribute>::from_bits(0x1F).is_some());
        assert!(PackedAttributes::<WebsiteAttribute>::from_bits(0x20).is_none());
    }

    #[test]
    fn test_known_weights() {
        let set = PackedAttributes::from_flags([
            Form990Attribute::IndependentVotingBoard,
            Form990Attribute::WhistleblowerPolicy,
            Form990Attribute::BoardNotCompensated,
        ]);
        assert_eq!(set.bits(), 0x1 | 0x80 | 0x800);
        assert_eq!(set.count(), 3);
        assert!(set.contains(Form990Attribute::WhistleblowerPolicy));
        assert!(!set.contains(Form990Attribute::AuditedFinancials));
    }

    #[test]
    fn test_column_names_unique() {
        let mut names: Vec<&str> = Form990Attribute::all().iter().map(|f| f.column()).collect();
        names.extend(WebsiteAttribute::all().iter().map(|f| f.column()));
        let count = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), count);
    }
}
