//! Template filler - writes rectification documents into per-case workbooks.
//!
//! Each `*.txt` document in the input directory is paired with the workbook
//! of the same stem in the output directory. Only the configured cells are
//! written; every other cell, merge, row height and column width is left as
//! the template had it.

use std::fs;
use std::path::{Path, PathBuf};

use umya_spreadsheet::{NumberingFormat, Spreadsheet};

use crate::config::Layout;
use crate::encoding::read_text_file;
use crate::error::{RectifyError, Result};
use crate::types::{Outcome, RectificationDocument};

/// Fills per-case workbooks from generated documents.
pub struct TemplateFiller<'a> {
    layout: &'a Layout,
    input_dir: PathBuf,
    output_dir: PathBuf,
}

impl<'a> TemplateFiller<'a> {
    pub const fn new(layout: &'a Layout, input_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            layout,
            input_dir,
            output_dir,
        }
    }

    /// Finds all documents in the input directory, sorted by name.
    fn find_documents(&self) -> Result<Vec<PathBuf>> {
        if !self.input_dir.is_dir() {
            return Err(RectifyError::FileNotFound(self.input_dir.clone()));
        }
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.input_dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|e| e == "txt") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Fills the workbook of every document, reporting each through `on_outcome`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input directory cannot be listed or the
    /// output directory cannot be created. Per-document problems are
    /// reported as outcomes.
    pub fn run<F>(&self, mut on_outcome: F) -> Result<Vec<Outcome>>
    where
        F: FnMut(&Outcome),
    {
        let documents = self.find_documents()?;
        fs::create_dir_all(&self.output_dir)?;

        let mut outcomes = Vec::with_capacity(documents.len());
        for path in &documents {
            let outcome = self.fill_one(path);
            on_outcome(&outcome);
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    fn fill_one(&self, document_path: &Path) -> Outcome {
        let stem = document_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let workbook_path = self
            .output_dir
            .join(format!("{stem}.{}", self.layout.workbook_extension));

        if !workbook_path.exists() {
            return Outcome::Skipped {
                name: stem,
                reason: format!("workbook not found: {}", workbook_path.display()),
            };
        }

        let document = match read_text_file(document_path).and_then(|c| RectificationDocument::parse(&c)) {
            Ok(document) => document,
            Err(e @ (RectifyError::EmptyDocument | RectifyError::InvalidHeader(_))) => {
                return Outcome::Skipped {
                    name: stem,
                    reason: e.to_string(),
                };
            }
            Err(e) => {
                return Outcome::Failed {
                    name: stem,
                    error: e.to_string(),
                };
            }
        };

        match fill_workbook(&workbook_path, &document, self.layout) {
            Ok(()) => Outcome::Done {
                name: stem,
                detail: format!(
                    "{} | {} issues",
                    document.header.application_id,
                    document.lines.len()
                ),
            },
            Err(e) => Outcome::Failed {
                name: stem,
                error: e.to_string(),
            },
        }
    }
}

/// Writes `document` into the sheet of `book` selected by `layout`.
///
/// Header cells get the text number format so long numeric ids are kept
/// verbatim. Issues are written one per row with 1-based sequence numbers
/// beside them; with no issues the first number cell is cleared.
///
/// # Errors
///
/// Returns an error if the sheet does not exist or the layout is malformed.
pub fn apply_document(
    book: &mut Spreadsheet,
    document: &RectificationDocument,
    layout: &Layout,
) -> Result<()> {
    let header_cells = layout.header_cells()?;
    let sheet = book
        .get_sheet_mut(&layout.sheet_index)
        .ok_or_else(|| RectifyError::SheetNotFound(format!("index {}", layout.sheet_index)))?;

    let header = &document.header;
    let values = [
        &header.application_id,
        &header.account_number,
        &header.account_name,
    ];
    for (cell_ref, value) in header_cells.iter().zip(values) {
        let cell = sheet.get_cell_mut(cell_ref.to_string().as_str());
        cell.get_style_mut()
            .get_number_format_mut()
            .set_format_code(NumberingFormat::FORMAT_TEXT);
        cell.set_value_string(value.as_str());
    }

    for (idx, issue) in document.lines.iter().enumerate() {
        let issue_cell = layout.issue_cell(idx)?.to_string();
        sheet.get_cell_mut(issue_cell.as_str()).set_value_string(issue.as_str());

        let number = u32::try_from(idx + 1)
            .map_err(|_| RectifyError::Config(format!("too many issues: {}", idx + 1)))?;
        let number_cell = layout.number_cell(idx)?.to_string();
        sheet
            .get_cell_mut(number_cell.as_str())
            .set_value_number(f64::from(number));
    }

    if document.lines.is_empty() {
        let first_number = layout.number_cell(0)?.to_string();
        sheet.get_cell_mut(first_number.as_str()).set_blank();
    }

    Ok(())
}

/// Opens the workbook at `path`, writes `document` into it, and saves it in place.
///
/// The save goes to a temporary file in the same directory first, so a
/// failed write leaves the original workbook untouched.
///
/// # Errors
///
/// Returns an error if the workbook cannot be read, written or replaced.
pub fn fill_workbook(path: &Path, document: &RectificationDocument, layout: &Layout) -> Result<()> {
    let mut book = umya_spreadsheet::reader::xlsx::read(path)
        .map_err(|e| RectifyError::Spreadsheet(format!("failed to open {}: {e}", path.display())))?;

    apply_document(&mut book, document, layout)?;

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let temp = tempfile::Builder::new()
        .prefix(".rectify-")
        .suffix(".xlsx")
        .tempfile_in(dir)?
        .into_temp_path();

    umya_spreadsheet::writer::xlsx::write(&book, &temp)
        .map_err(|e| RectifyError::Spreadsheet(format!("failed to save {}: {e}", path.display())))?;
    temp.persist(path).map_err(std::io::Error::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::{read_source_table, write_starter_template, CellValue};
    use crate::types::CaseHeader;
    use pretty_assertions::assert_eq;

    fn document(lines: &[&str]) -> RectificationDocument {
        RectificationDocument {
            header: CaseHeader {
                application_id: "000123456789012345".to_string(),
                account_number: "3300123".to_string(),
                account_name: "张三-商铺".to_string(),
            },
            lines: lines.iter().map(ToString::to_string).collect(),
        }
    }

    fn text(value: &CellValue) -> Option<String> {
        value.to_text()
    }

    #[test]
    fn fills_header_and_numbered_issues() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("整改单-1-张三.xlsx");
        let layout = Layout::default();
        write_starter_template(&path, &layout, 10).unwrap();

        fill_workbook(&path, &document(&["现场勘查：表箱锈蚀", "装表接电：未接地"]), &layout).unwrap();

        // Row 1 is the title, so table row r is sheet row r + 2.
        let table = read_source_table(&path, None).unwrap();
        assert_eq!(text(&table.rows[0][1]).as_deref(), Some("000123456789012345"));
        assert_eq!(text(&table.rows[0][3]).as_deref(), Some("3300123"));
        assert_eq!(text(&table.rows[0][5]).as_deref(), Some("张三-商铺"));
        assert_eq!(text(&table.rows[3][0]).as_deref(), Some("1"));
        assert_eq!(text(&table.rows[3][1]).as_deref(), Some("现场勘查：表箱锈蚀"));
        assert_eq!(text(&table.rows[4][0]).as_deref(), Some("2"));
        assert_eq!(text(&table.rows[4][1]).as_deref(), Some("装表接电：未接地"));
        // Labels from the template are untouched.
        assert_eq!(text(&table.rows[0][0]).as_deref(), Some("工单编号"));
    }

    /// Merged ranges, column B width and the B5 border of the first sheet.
    fn formatting_snapshot(path: &Path) -> (Vec<String>, Option<f64>, String) {
        let mut book = umya_spreadsheet::reader::xlsx::read(path).unwrap();
        let sheet = book.get_sheet_mut(&0).unwrap();
        let mut merges: Vec<String> = sheet
            .get_merge_cells()
            .iter()
            .map(|range| range.get_range())
            .collect();
        merges.sort();
        let width = sheet.get_column_dimension("B").map(|col| *col.get_width());
        let border = format!("{:?}", sheet.get_style("B5").get_borders());
        (merges, width, border)
    }

    #[test]
    fn fill_keeps_template_formatting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("整改单-1-张三.xlsx");
        let layout = Layout::default();
        write_starter_template(&path, &layout, 10).unwrap();

        let before = formatting_snapshot(&path);
        assert!(before.0.contains(&"F2:J2".to_string()));
        assert!(before.0.contains(&"B5:D5".to_string()));
        assert!(before.1.is_some());
        assert!(before.2.starts_with("Some"));

        fill_workbook(&path, &document(&["现场勘查：表箱锈蚀", "装表接电：未接地"]), &layout).unwrap();

        assert_eq!(formatting_snapshot(&path), before);
        let table = read_source_table(&path, None).unwrap();
        assert_eq!(text(&table.rows[0][2]).as_deref(), Some("户号"));
    }

    #[test]
    fn header_cells_use_text_format() {
        let mut book = umya_spreadsheet::new_file();
        let layout = Layout::default();
        apply_document(&mut book, &document(&[]), &layout).unwrap();

        let sheet = book.get_sheet_mut(&0).unwrap();
        let cell = sheet.get_cell_mut("B2");
        assert_eq!(cell.get_value(), "000123456789012345");
        assert_eq!(
            cell.get_style_mut().get_number_format_mut().get_format_code(),
            NumberingFormat::FORMAT_TEXT
        );
    }

    #[test]
    fn missing_sheet_is_an_error() {
        let mut book = umya_spreadsheet::new_file();
        let layout = Layout {
            sheet_index: 3,
            ..Layout::default()
        };
        assert!(apply_document(&mut book, &document(&[]), &layout).is_err());
    }

    #[test]
    fn run_pairs_documents_with_workbooks() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input");
        let output = dir.path().join("output");
        fs::create_dir_all(&input).unwrap();
        fs::create_dir_all(&output).unwrap();

        let layout = Layout::default();
        fs::write(
            input.join("整改单-GD01-张三.txt"),
            "GD01-1001-张三\n\n现场勘查：表箱锈蚀\n",
        )
        .unwrap();
        write_starter_template(&output.join("整改单-GD01-张三.xlsx"), &layout, 5).unwrap();
        fs::write(input.join("整改单-GD02-李四.txt"), "GD02-1002-李四\n\n缺封印\n").unwrap();
        fs::write(input.join("整改单-GD03-王五.txt"), "bad header\n").unwrap();
        write_starter_template(&output.join("整改单-GD03-王五.xlsx"), &layout, 5).unwrap();

        let filler = TemplateFiller::new(&layout, input, output.clone());
        let outcomes = filler.run(|_| {}).unwrap();

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_done());
        assert!(matches!(outcomes[1], Outcome::Skipped { .. }));
        assert!(matches!(outcomes[2], Outcome::Skipped { .. }));

        let table = read_source_table(&output.join("整改单-GD01-张三.xlsx"), None).unwrap();
        assert_eq!(text(&table.rows[3][1]).as_deref(), Some("现场勘查：表箱锈蚀"));
    }

    #[test]
    fn missing_input_dir_is_fatal() {
        let layout = Layout::default();
        let filler = TemplateFiller::new(
            &layout,
            PathBuf::from("/nonexistent/input"),
            PathBuf::from("/nonexistent/output"),
        );
        assert!(filler.run(|_| {}).is_err());
    }
}
