//! Crash reports and log output.
//!
//! Install both at the top of `main`:
//!
//! ```ignore
//! use test_analyzer::observability::{init_logging, install_panic_hook};
//!
//! fn main() {
//!     install_panic_hook();
//!     init_logging(verbosity);
//! }
//! ```

pub mod logging;
pub mod panic_hook;

pub use logging::{default_directive, init_logging, LOG_ENV_VAR};
pub use panic_hook::install_panic_hook;
