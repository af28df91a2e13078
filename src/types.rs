//! Common types for rectify-notice.
//!
//! Defines cases, problem statements, rectification documents and the
//! per-item outcomes reported by every batch step.

use std::fmt;

use serde::Serialize;

use crate::config::Placeholders;
use crate::error::{RectifyError, Result};
use crate::excel::CellValue;
use crate::text::{extract_problems, normalize_statement};

/// Identifier triple of one case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseHeader {
    pub application_id: String,
    pub account_number: String,
    pub account_name: String,
}

impl CaseHeader {
    /// Parses a `id-number-name` header line.
    ///
    /// Only the first two hyphens separate fields, so the account name may
    /// itself contain hyphens.
    ///
    /// # Errors
    ///
    /// Returns [`RectifyError::InvalidHeader`] if the line has fewer than two hyphens.
    pub fn parse(line: &str) -> Result<Self> {
        let mut parts = line.trim().splitn(3, '-').map(str::trim);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(id), Some(number), Some(name)) => Ok(Self {
                application_id: id.to_string(),
                account_number: number.to_string(),
                account_name: name.to_string(),
            }),
            _ => Err(RectifyError::InvalidHeader(line.to_string())),
        }
    }
}

impl fmt::Display for CaseHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}",
            self.application_id, self.account_number, self.account_name
        )
    }
}

/// One row of the source table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseRecord {
    pub header: CaseHeader,
    /// `(process_name, raw_text)` for every process column, in column order.
    /// Missing cells hold an empty string.
    pub process_cells: Vec<(String, String)>,
}

impl CaseRecord {
    /// Builds a record from a table row.
    ///
    /// Columns 0–2 are the identifiers (placeholders fill the gaps); columns
    /// from `first_process_column` onward are process cells, keyed by their
    /// header. Columns in between are ignored.
    pub fn from_row(
        headers: &[String],
        row: &[CellValue],
        first_process_column: usize,
        placeholders: &Placeholders,
    ) -> Self {
        let text_at = |col: usize| row.get(col).and_then(CellValue::to_text);

        let header = CaseHeader {
            application_id: text_at(0).unwrap_or_else(|| placeholders.application_id.clone()),
            account_number: text_at(1).unwrap_or_else(|| placeholders.account_number.clone()),
            account_name: text_at(2).unwrap_or_else(|| placeholders.account_name.clone()),
        };

        let process_cells = headers
            .iter()
            .enumerate()
            .skip(first_process_column)
            .map(|(col, name)| (name.clone(), text_at(col).unwrap_or_default()))
            .collect();

        Self {
            header,
            process_cells,
        }
    }

    /// Splits every process cell into problem statements, in column order.
    pub fn problems(&self) -> Vec<ProblemStatement> {
        self.process_cells
            .iter()
            .flat_map(|(process, raw)| {
                extract_problems(raw)
                    .into_iter()
                    .map(move |text| ProblemStatement {
                        process_name: process.clone(),
                        text,
                    })
            })
            .collect()
    }

    /// The case's document, or `None` when no problems were found.
    pub fn document(&self) -> Option<RectificationDocument> {
        let problems = self.problems();
        if problems.is_empty() {
            return None;
        }
        Some(RectificationDocument {
            header: self.header.clone(),
            lines: problems.iter().map(ProblemStatement::to_line).collect(),
        })
    }
}

/// A single issue tagged with its process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemStatement {
    pub process_name: String,
    pub text: String,
}

impl ProblemStatement {
    /// Normalized `"{process}：{text}"` line.
    pub fn to_line(&self) -> String {
        normalize_statement(&format!("{}：{}", self.process_name, self.text))
    }
}

/// Generated text artifact listing the problems of one case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RectificationDocument {
    pub header: CaseHeader,
    pub lines: Vec<String>,
}

impl RectificationDocument {
    /// Header line, blank line, then one line per problem.
    pub fn render(&self) -> String {
        let mut out = format!("{}\n\n", self.header);
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// Parses a rendered document.
    ///
    /// Blank lines are ignored; the first remaining line is the header and
    /// every line after it is a problem.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty document or a malformed header.
    pub fn parse(content: &str) -> Result<Self> {
        let mut lines = content.lines().map(str::trim).filter(|l| !l.is_empty());
        let header = CaseHeader::parse(lines.next().ok_or(RectifyError::EmptyDocument)?)?;
        Ok(Self {
            header,
            lines: lines.map(str::to_string).collect(),
        })
    }
}

/// Result of processing one item in a batch step.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    /// Item processed.
    Done { name: String, detail: String },
    /// Item intentionally not processed.
    Skipped { name: String, reason: String },
    /// Item failed; the batch continued.
    Failed { name: String, error: String },
}

impl Outcome {
    /// Returns `true` if the item was processed.
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }

    /// Returns `true` if the item failed.
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Returns the item name.
    pub fn name(&self) -> &str {
        match self {
            Self::Done { name, .. } | Self::Skipped { name, .. } | Self::Failed { name, .. } => {
                name
            }
        }
    }
}

/// Tally of a batch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub done: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl Summary {
    pub fn from_outcomes(outcomes: &[Outcome]) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Done { .. } => summary.done += 1,
                Outcome::Skipped { .. } => summary.skipped += 1,
                Outcome::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }

    pub const fn total(&self) -> usize {
        self.done + self.skipped + self.failed
    }
}
