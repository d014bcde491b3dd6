//! Keyword tables for column guessing, roofing detection and display order

use permit_types::CanonicalField;

/// Default keywords that mark a permit as roofing work
pub const ROOFING_KEYWORDS: &[&str] = &["roof", "shingle"];

/// Fields whose text is searched for roofing keywords
pub const ROOFING_SOURCE_FIELDS: &[CanonicalField] = &[
    CanonicalField::Description,
    CanonicalField::Scope,
    CanonicalField::PermitType,
];

/// Header keywords per field, in claim order.
///
/// A header is claimed by the first field whose keyword it contains, so
/// `Permit` comes last: "Permit Type" and "Permit Status" go to their more
/// specific fields first.
pub const MAPPING_RULES: &[(CanonicalField, &[&str])] = &[
    (CanonicalField::IssuedDate, &["issue"]),
    (CanonicalField::ExpirationDate, &["exp"]),
    (CanonicalField::Description, &["desc"]),
    (CanonicalField::Scope, &["scope"]),
    (CanonicalField::Apn, &["apn", "parcel"]),
    (CanonicalField::Address, &["address"]),
    (CanonicalField::Valuation, &["valu"]),
    (CanonicalField::Contractor, &["contract", "applicant"]),
    (CanonicalField::County, &["county"]),
    (CanonicalField::Zip, &["zip"]),
    (CanonicalField::City, &["city"]),
    (CanonicalField::Status, &["status"]),
    (CanonicalField::PermitType, &["type"]),
    (
        CanonicalField::Permit,
        &["permit #", "permit no", "permit num", "permit id", "permit"],
    ),
];

/// Columns shown first, in this order, when present
pub const DISPLAY_PRIORITY: &[&str] = &[
    "Permit",
    "Owner Name",
    "County",
    "City",
    "ZIP",
    "Status",
    "Permit Type",
    "Description",
    "Issued Date",
    "Expiration Date",
];

/// Fields kept in the roofing detail table
pub const ROOFING_DETAIL_FIELDS: &[CanonicalField] = &[
    CanonicalField::Permit,
    CanonicalField::IssuedDate,
    CanonicalField::Address,
    CanonicalField::City,
    CanonicalField::Contractor,
    CanonicalField::PermitType,
    CanonicalField::Description,
    CanonicalField::Valuation,
];

/// Helper column prefix; such columns are hidden unless requested
pub const HELPER_PREFIX: char = '_';
pub const MONTHS_REMAINING_COLUMN: &str = "_months_remaining";
pub const ROOFING_RELATED_COLUMN: &str = "_roofing_related";
