//! Error catalog and definitions for docgate
//!
//! Stable error codes with remediation steps, grouped by the kind of
//! expectation that produced them.
//!
//! # Error Code Ranges
//!
//! | Range      | Category  | Description                                  |
//! |------------|-----------|----------------------------------------------|
//! | E001-E099  | Config    | Configuration file, environment, patterns    |
//! | E100-E199  | Artifact  | Missing, empty or mistyped files and dirs    |
//! | E200-E299  | Content   | Required text or authoring conventions       |
//! | E300-E399  | Structure | Parsed JSON/HTML/config documents            |
//! | E400-E499  | Process   | External build command invocations           |

pub mod catalog;

pub use catalog::{ErrorCategory, ErrorCode, ErrorEntry};
