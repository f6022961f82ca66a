//! Shared library for docgate: the checklist model, its evaluator, the
//! default Sphinx checklist, configuration and logging.

pub mod check;
pub mod config;
pub mod errors;
pub mod html;
pub mod logging;
pub mod process;
pub mod rst;
pub mod search_index;
pub mod session;
pub mod sphinx;
pub mod testing;

pub use check::{
    Check, CheckFailure, CheckOutcome, Checker, Checklist, ChecklistError, EvalContext,
    Expectation, OutputState, Report, Requirement,
};
pub use config::{ConfigError, GateConfig, LoadOptions};
pub use errors::{ErrorCategory, ErrorCode, ErrorEntry};
pub use logging::{LogConfig, LogFormat, LoggingGuards, init_logging};
pub use session::BuildSession;
pub use sphinx::{GATE_SKIP_REASON, sphinx_checklist};
