//! Run configuration.
//!
//! Loaded from a YAML file; every field has a default so an empty file (or
//! no file at all) reproduces the standard notice layout.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RectifyError, Result};
use crate::excel::{column_index, CellRef};

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "RECTIFY_CONFIG";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Values used when an identifier cell is empty.
    pub placeholders: Placeholders,
    /// Index of the first inspection-process column.
    pub first_process_column: usize,
    /// Prefix of every generated file name.
    pub filename_prefix: String,
    /// Maximum characters kept per sanitized file name component.
    pub filename_max_chars: usize,
    /// What to do when two cases map to the same document name.
    pub on_collision: CollisionPolicy,
    /// Cell positions in the per-case workbook.
    pub layout: Layout,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            placeholders: Placeholders::default(),
            first_process_column: 4,
            filename_prefix: "整改单".to_string(),
            filename_max_chars: 50,
            on_collision: CollisionPolicy::Suffix,
            layout: Layout::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Placeholders {
    pub application_id: String,
    pub account_number: String,
    pub account_name: String,
}

impl Default for Placeholders {
    fn default() -> Self {
        Self {
            application_id: "未知编号".to_string(),
            account_number: "未知户号".to_string(),
            account_name: "未知户名".to_string(),
        }
    }
}

/// Document name collision handling within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Append `-2`, `-3`, ... to later documents.
    Suffix,
    /// Last write wins.
    Overwrite,
}

/// Where the filler writes into a per-case workbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Layout {
    pub sheet_index: usize,
    /// Extension of the per-case workbooks, without the dot.
    pub workbook_extension: String,
    pub application_id_cell: String,
    pub account_number_cell: String,
    pub account_name_cell: String,
    pub number_column: String,
    pub issue_column: String,
    /// 1-based row of the first issue.
    pub first_issue_row: u32,
    /// Columns covered by the merged account name cell in a starter template.
    pub account_name_span: u16,
    /// Columns covered by each merged issue cell in a starter template.
    pub issue_span: u16,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            sheet_index: 0,
            workbook_extension: "xlsx".to_string(),
            application_id_cell: "B2".to_string(),
            account_number_cell: "D2".to_string(),
            account_name_cell: "F2".to_string(),
            number_column: "A".to_string(),
            issue_column: "B".to_string(),
            first_issue_row: 5,
            account_name_span: 5,
            issue_span: 3,
        }
    }
}

impl Layout {
    /// The three header cells, in id / number / name order.
    ///
    /// # Errors
    ///
    /// Returns an error if any configured reference is malformed.
    pub fn header_cells(&self) -> Result<[CellRef; 3]> {
        Ok([
            CellRef::parse(&self.application_id_cell)?,
            CellRef::parse(&self.account_number_cell)?,
            CellRef::parse(&self.account_name_cell)?,
        ])
    }

    /// Cell holding the issue at `index` (0-based).
    ///
    /// # Errors
    ///
    /// Returns an error if the issue column is malformed.
    pub fn issue_cell(&self, index: usize) -> Result<CellRef> {
        self.row_cell(&self.issue_column, index)
    }

    /// Cell holding the sequence number of the issue at `index` (0-based).
    ///
    /// # Errors
    ///
    /// Returns an error if the number column is malformed.
    pub fn number_cell(&self, index: usize) -> Result<CellRef> {
        self.row_cell(&self.number_column, index)
    }

    fn row_cell(&self, column: &str, index: usize) -> Result<CellRef> {
        let offset = u32::try_from(index)
            .map_err(|_| RectifyError::Config(format!("issue index out of range: {index}")))?;
        Ok(CellRef {
            row: self.first_issue_row.saturating_sub(1) + offset,
            col: column_index(column)?,
        })
    }

    fn validate(&self) -> Result<()> {
        self.header_cells()?;
        column_index(&self.issue_column)?;
        column_index(&self.number_column)?;
        if self.first_issue_row == 0 {
            return Err(RectifyError::Config("first_issue_row is 1-based".to_string()));
        }
        if self.issue_span == 0 || self.account_name_span == 0 {
            return Err(RectifyError::Config("merge spans must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl Config {
    /// Parses and validates a YAML config.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid YAML, unknown keys, or bad cell references.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml_ng::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Loads the config at `path`, or the defaults when `path` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(RectifyError::FileNotFound(path.to_path_buf()));
                }
                Self::from_yaml(&fs::read_to_string(path)?)
            }
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.first_process_column < 3 {
            return Err(RectifyError::Config(
                "first_process_column must come after the three identifier columns".to_string(),
            ));
        }
        if self.filename_max_chars == 0 {
            return Err(RectifyError::Config("filename_max_chars must be positive".to_string()));
        }
        self.layout.validate()
    }
}
