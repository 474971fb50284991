//! Output formatting
//!
//! - `text`: the human-readable walker and controller records
//! - `json`: machine-readable run summary

pub mod json;
pub mod text;
