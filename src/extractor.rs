//! Issue extractor - turns a source table into rectification documents.
//!
//! Pipeline:
//! 1. Read the source table (first row is the header)
//! 2. Build a case record per data row
//! 3. Split each process cell into problem statements
//! 4. Write one text document per case that has at least one problem

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{CollisionPolicy, Config};
use crate::error::{RectifyError, Result};
use crate::excel::{read_source_table, SourceTable};
use crate::naming::{document_file_name, with_suffix};
use crate::types::{CaseRecord, Outcome, RectificationDocument};

/// Writes rectification documents into an output directory.
pub struct Extractor<'a> {
    config: &'a Config,
    output_dir: PathBuf,
}

impl<'a> Extractor<'a> {
    pub fn new(config: &'a Config, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            output_dir: output_dir.into(),
        }
    }

    /// Returns the output directory.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Reads `source` and generates documents, reporting each row through `on_outcome`.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read, is too narrow, or the
    /// output directory cannot be created. Per-row write failures are
    /// reported as [`Outcome::Failed`] instead.
    pub fn run_file<F>(&self, source: &Path, sheet: Option<&str>, on_outcome: F) -> Result<Vec<Outcome>>
    where
        F: FnMut(&Outcome),
    {
        let table = read_source_table(source, sheet)?;
        self.run_table(&table, on_outcome)
    }

    /// Generates documents for every data row of `table`.
    ///
    /// # Errors
    ///
    /// See [`Extractor::run_file`].
    pub fn run_table<F>(&self, table: &SourceTable, mut on_outcome: F) -> Result<Vec<Outcome>>
    where
        F: FnMut(&Outcome),
    {
        let required = self.config.first_process_column + 1;
        if table.headers.len() < required {
            return Err(RectifyError::TableTooNarrow {
                columns: table.headers.len(),
                required,
            });
        }

        fs::create_dir_all(&self.output_dir)?;

        let mut used_names = HashSet::new();
        let mut outcomes = Vec::with_capacity(table.rows.len());

        for row in &table.rows {
            let record = CaseRecord::from_row(
                &table.headers,
                row,
                self.config.first_process_column,
                &self.config.placeholders,
            );
            let outcome = match record.document() {
                Some(document) => self.write_document(&document, &mut used_names),
                None => Outcome::Skipped {
                    name: format!(
                        "{}-{}",
                        record.header.application_id, record.header.account_name
                    ),
                    reason: "no issues found".to_string(),
                },
            };
            on_outcome(&outcome);
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    /// Picks the file name for `document`, honouring the collision policy.
    fn file_name_for(&self, document: &RectificationDocument, used: &mut HashSet<String>) -> String {
        let base = document_file_name(
            &self.config.filename_prefix,
            &document.header.application_id,
            &document.header.account_name,
            self.config.filename_max_chars,
        );

        let name = match self.config.on_collision {
            CollisionPolicy::Overwrite => base,
            CollisionPolicy::Suffix => {
                let mut name = base.clone();
                let mut n = 2;
                while used.contains(&name) {
                    name = with_suffix(&base, n);
                    n += 1;
                }
                if name != base {
                    eprintln!("Warning: {base} already written in this run, using {name}");
                }
                name
            }
        };
        used.insert(name.clone());
        name
    }

    fn write_document(&self, document: &RectificationDocument, used: &mut HashSet<String>) -> Outcome {
        let name = self.file_name_for(document, used);
        let path = self.output_dir.join(&name);
        match fs::write(&path, document.render()) {
            Ok(()) => Outcome::Done {
                detail: format!("{} issues", document.lines.len()),
                name,
            },
            Err(e) => Outcome::Failed {
                name,
                error: format!("Failed to write document: {e}"),
            },
        }
    }
}
