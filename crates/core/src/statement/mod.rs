//! Local parsing of bank statement exports.
//!
//! Polish banks export CSV in windows-1250; parsing those locally avoids a
//! round trip through the document extractor for the common case.

mod category;
mod csv;

pub use category::{DEFAULT_CATEGORY, guess_category};
pub use csv::parse_statement_csv;
