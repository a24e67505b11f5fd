//! Regular expressions used by the rulebook
//!
//! All patterns are XSD flavoured: anchored implicitly, no look-around.

pub use ids_core::naming::SPACE_NAME_PATTERN as SPACE_NAME;

/// Classification system names accepted as the DfE area data sheets
pub const ADS_SYSTEM: &str = ".*(DfE ADS|dfe ads|DFE ADS).*";
pub const UNICLASS_SYSTEM: &str = ".*[Uu]niclass.*";

pub const EMAIL: &str = r"([A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,})";
pub const EMAIL_OR_NA: &str = r"n\/a|([A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,})";
pub const NUMERIC: &str = r"\d+(\.\d+)?";
pub const NUMERIC_OR_NA: &str = r"n\/a|\d+(\.\d+)?";
pub const MONETARY_OR_NA: &str = r"n\/a|£?\d+(\.\d{2})?";
pub const TEXT_OR_NA: &str = r"n\/a|(\w.*)+";
/// Serial numbers and bar codes
pub const NUMBER_OR_NA: &str = r"n\/a|(\d|-| |_)+";
/// ISO date-time, or the COBie "unset" sentinel
pub const DATE_OR_DEFAULT: &str = r"1900-12-31T23:59:59|20\d{2}-(?:0[1-9]|1[0-2])-(?:0[1-9]|[12][0-9]|3[01])(?:T(?:[01][0-9]|2[0-3]):(?:[0-5][0-9]):(?:[0-5][0-9])(?:\.\d+)?(?:Z|[+-]\d{2}:\d{2})?)?";

pub const DEFAULT_DATE: &str = "1900-12-31T23:59:59";
