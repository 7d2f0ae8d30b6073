//! Error catalog and definitions for VistA Maintenance Helper
//!
//! # Error Code Ranges
//!
//! | Range      | Category | Description                              |
//! |------------|----------|------------------------------------------|
//! | E001-E099  | Config   | Configuration file and environment       |
//! | E100-E199  | Routine  | Routine lookup, patching, object cleanup |
//! | E200-E299  | Import   | Exchange file discovery and installation |

pub mod catalog;

pub use catalog::{ErrorCategory, ErrorCode, ErrorEntry};
