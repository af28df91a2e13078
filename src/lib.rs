//! rectify-notice: rectification notices from inspection spreadsheets.
//!
//! Splits multi-issue inspection cells into discrete problem statements,
//! writes one text document per case, copies a template workbook per case
//! and fills each copy with the case header and numbered issue list.

pub mod config;
pub mod encoding;
pub mod error;
pub mod excel;
pub mod extractor;
pub mod filler;
pub mod manifest;
pub mod naming;
pub mod text;
pub mod types;
