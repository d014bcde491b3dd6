use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized column meanings that source headers are mapped onto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CanonicalField {
    Permit,
    IssuedDate,
    ExpirationDate,
    Description,
    Scope,
    Apn,
    Address,
    City,
    Zip,
    County,
    Status,
    PermitType,
    Contractor,
    Valuation,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 14] = [
        CanonicalField::Permit,
        CanonicalField::IssuedDate,
        CanonicalField::ExpirationDate,
        CanonicalField::Description,
        CanonicalField::Scope,
        CanonicalField::Apn,
        CanonicalField::Address,
        CanonicalField::City,
        CanonicalField::Zip,
        CanonicalField::County,
        CanonicalField::Status,
        CanonicalField::PermitType,
        CanonicalField::Contractor,
        CanonicalField::Valuation,
    ];

    /// Column name a mapped table uses for this field
    pub fn label(&self) -> &'static str {
        match self {
            CanonicalField::Permit => "Permit",
            CanonicalField::IssuedDate => "Issued Date",
            CanonicalField::ExpirationDate => "Expiration Date",
            CanonicalField::Description => "Description",
            CanonicalField::Scope => "Scope",
            CanonicalField::Apn => "APN",
            CanonicalField::Address => "Address",
            CanonicalField::City => "City",
            CanonicalField::Zip => "ZIP",
            CanonicalField::County => "County",
            CanonicalField::Status => "Status",
            CanonicalField::PermitType => "Permit Type",
            CanonicalField::Contractor => "Contractor",
            CanonicalField::Valuation => "Valuation",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.label().eq_ignore_ascii_case(label.trim()))
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
