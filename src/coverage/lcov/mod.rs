//! LCOV coverage data parsing.
//!
//! - [`types`] - pure data (`FileCoverage`, `LcovData`)
//! - [`handlers`] - per-record state transitions
//! - [`parser`] - line splitting and dispatch (I/O boundary)
//!
//! Malformed records are recovered locally: the enclosing `SF:` block is
//! skipped, a [`ParseWarning`] is recorded, and every other block still
//! parses.
//!
//! ```ignore
//! use test_analyzer::coverage::lcov::parse_lcov_str;
//!
//! let data = parse_lcov_str("SF:lib/a.dart\nDA:1,1\nDA:2,0\nend_of_record\n");
//! assert_eq!(data.overall_percent(), 50.0);
//! ```

pub mod handlers;
pub mod parser;
pub mod types;

pub use parser::{parse_lcov_file, parse_lcov_str};
pub use types::{BranchCoverage, FileCoverage, LcovData, ParseWarning};
