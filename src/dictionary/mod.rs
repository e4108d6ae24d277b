//! Domain vocabulary: canonical terms, unit families, and exact conversion

pub mod terms;
pub mod units;

pub use terms::{CanonicalTerm, Dictionary, TermCategory};
pub use units::{
    bridge_transfer_rate, convert, find_values, parse_bare_number, parse_value, unit_spellings,
    units_in_family, Decimal, UnitFamily, UnitValue,
};
