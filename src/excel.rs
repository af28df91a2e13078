//! Spreadsheet helpers.
//!
//! Reads source tables (any calamine format, or CSV) and writes starter
//! rectification templates.

use std::fmt;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook};

use crate::config::Layout;
use crate::encoding::read_text_file;
use crate::error::{RectifyError, Result};

/// Cell value from a source table.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
    Error(String),
}

impl CellValue {
    /// Text form of the cell, or `None` when the cell counts as missing.
    ///
    /// Whole numbers print without a fractional part so numeric ids keep
    /// their spreadsheet look. Booleans print as `TRUE`/`FALSE` and date
    /// cells as their serial number (e.g. `45292`), not as formatted dates.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Empty | Self::Error(_) => None,
            Self::Text(s) if s.trim().is_empty() => None,
            Self::Text(s) => Some(s.clone()),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{n:.0}")),
            Self::Number(n) => Some(n.to_string()),
            Self::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
        }
    }
}

impl From<&Data> for CellValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(dt: &Data) -> Self {
        match dt {
            Data::Empty => Self::Empty,
            Data::Int(i) => Self::Number(*i as f64),
            Data::Float(f) => Self::Number(*f),
            Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Self::Text(s.clone()),
            Data::Bool(b) => Self::Bool(*b),
            Data::Error(e) => Self::Error(format!("{e:?}")),
            Data::DateTime(dt) => Self::Number(dt.as_f64()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(field: &str) -> Self {
        if field.is_empty() {
            Self::Empty
        } else {
            Self::Text(field.to_string())
        }
    }
}

/// A header row plus data rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl SourceTable {
    /// Builds a table from raw rows; the first row is the header.
    ///
    /// Empty header cells are named `Unnamed: {index}`.
    pub fn from_rows(rows: Vec<Vec<CellValue>>) -> Self {
        let mut rows = rows.into_iter();
        let headers = rows
            .next()
            .unwrap_or_default()
            .iter()
            .enumerate()
            .map(|(i, cell)| cell.to_text().unwrap_or_else(|| format!("Unnamed: {i}")))
            .collect();
        Self {
            headers,
            rows: rows.collect(),
        }
    }
}

/// Reads the source table at `path`.
///
/// `.csv` files go through the CSV reader (UTF-8 or GBK); everything else
/// is opened with calamine. `sheet` picks a worksheet by name, defaulting to
/// the first one.
///
/// # Errors
///
/// Returns an error if the file is missing, cannot be parsed, or the sheet
/// does not exist.
pub fn read_source_table(path: &Path, sheet: Option<&str>) -> Result<SourceTable> {
    if !path.exists() {
        return Err(RectifyError::FileNotFound(path.to_path_buf()));
    }
    let is_csv = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if is_csv {
        read_csv_table(path)
    } else {
        read_workbook_table(path, sheet)
    }
}

fn read_workbook_table(path: &Path, sheet: Option<&str>) -> Result<SourceTable> {
    let workbook_error = |message: String| RectifyError::Workbook {
        path: path.to_path_buf(),
        message,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| workbook_error(e.to_string()))?;
    let sheet_names = workbook.sheet_names();
    let sheet_name = match sheet {
        Some(name) if sheet_names.iter().any(|s| s == name) => name.to_string(),
        Some(name) => return Err(RectifyError::SheetNotFound(name.to_string())),
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| RectifyError::NoSheets(path.to_path_buf()))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| workbook_error(format!("sheet {sheet_name}: {e}")))?;

    // calamine ranges start at the first used cell; pad back to column A.
    let offset = range.start().map_or(0, |(_, col)| col as usize);
    let rows = range
        .rows()
        .map(|row| {
            let mut cells = vec![CellValue::Empty; offset];
            cells.extend(row.iter().map(CellValue::from));
            cells
        })
        .collect();

    Ok(SourceTable::from_rows(rows))
}

fn read_csv_table(path: &Path) -> Result<SourceTable> {
    let content = read_text_file(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(CellValue::from).collect());
    }

    Ok(SourceTable::from_rows(rows))
}

/// Zero-based cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub row: u32,
    pub col: u16,
}

impl CellRef {
    /// Parses an A1-style reference such as `F2`.
    ///
    /// # Errors
    ///
    /// Returns [`RectifyError::InvalidCellRef`] for anything else.
    pub fn parse(reference: &str) -> Result<Self> {
        let invalid = || RectifyError::InvalidCellRef(reference.to_string());
        let reference = reference.trim();
        let split = reference
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (letters, digits) = reference.split_at(split);
        let col = column_index(letters).map_err(|_| invalid())?;
        let row: u32 = digits.parse().map_err(|_| invalid())?;
        if row == 0 {
            return Err(invalid());
        }
        Ok(Self { row: row - 1, col })
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_name(self.col), self.row + 1)
    }
}

/// Zero-based index of a column name: `A` -> 0, `AA` -> 26.
///
/// # Errors
///
/// Returns [`RectifyError::InvalidCellRef`] for empty or non-letter names.
pub fn column_index(name: &str) -> Result<u16> {
    let invalid = || RectifyError::InvalidCellRef(name.to_string());
    let name = name.trim();
    if name.is_empty() || name.len() > 3 {
        return Err(invalid());
    }
    let mut index: u32 = 0;
    for c in name.chars() {
        if !c.is_ascii_alphabetic() {
            return Err(invalid());
        }
        index = index * 26 + u32::from(c.to_ascii_uppercase() as u8 - b'A') + 1;
    }
    u16::try_from(index - 1).map_err(|_| invalid())
}

/// Column name of a zero-based index: 0 -> `A`, 26 -> `AA`.
pub fn column_name(index: u16) -> String {
    let mut col = u32::from(index) + 1;
    let mut name = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        name.push(char::from(b'A' + rem as u8));
        col = (col - 1) / 26;
    }
    name.iter().rev().collect()
}

/// Writes an empty rectification template matching `layout`.
///
/// The sheet has a title row, a label left of each header cell, the account
/// name cell merged over `account_name_span` columns, a table header row and
/// `issue_rows` bordered issue rows with the issue cell merged over
/// `issue_span` columns. Header cells use the text number format.
///
/// # Errors
///
/// Returns an error for a malformed layout or if the workbook cannot be saved.
pub fn write_starter_template(path: &Path, layout: &Layout, issue_rows: u32) -> Result<()> {
    let [id_cell, number_cell, name_cell] = layout.header_cells()?;
    let number_col = column_index(&layout.number_column)?;
    let issue_col = column_index(&layout.issue_column)?;
    let first_row = layout.first_issue_row.saturating_sub(1);
    let name_last_col = name_cell.col + layout.account_name_span - 1;
    let issue_last_col = issue_col + layout.issue_span - 1;
    let last_col = name_last_col.max(issue_last_col).max(number_col);

    let title = Format::new()
        .set_bold()
        .set_font_size(16)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter);
    let label = Format::new()
        .set_bold()
        .set_border(FormatBorder::Thin)
        .set_align(FormatAlign::Center);
    let text = Format::new().set_num_format("@").set_border(FormatBorder::Thin);
    let body = Format::new().set_border(FormatBorder::Thin).set_text_wrap();

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("整改单")?;

    let header_top = id_cell.row.min(number_cell.row).min(name_cell.row);
    if header_top > 0 {
        sheet.merge_range(0, 0, 0, last_col, "整改通知单", &title)?;
    }

    for (cell, caption) in [(id_cell, "工单编号"), (number_cell, "户号"), (name_cell, "户名")] {
        if cell.col > 0 {
            sheet.write_string_with_format(cell.row, cell.col - 1, caption, &label)?;
        }
    }
    sheet.write_blank(id_cell.row, id_cell.col, &text)?;
    sheet.write_blank(number_cell.row, number_cell.col, &text)?;
    if name_last_col > name_cell.col {
        sheet.merge_range(name_cell.row, name_cell.col, name_cell.row, name_last_col, "", &text)?;
    } else {
        sheet.write_blank(name_cell.row, name_cell.col, &text)?;
    }

    if first_row > 0 {
        let header_row = first_row - 1;
        sheet.write_string_with_format(header_row, number_col, "序号", &label)?;
        if issue_last_col > issue_col {
            sheet.merge_range(header_row, issue_col, header_row, issue_last_col, "问题描述", &label)?;
        } else {
            sheet.write_string_with_format(header_row, issue_col, "问题描述", &label)?;
        }
    }

    for row in first_row..first_row + issue_rows {
        sheet.write_blank(row, number_col, &body)?;
        if issue_last_col > issue_col {
            sheet.merge_range(row, issue_col, row, issue_last_col, "", &body)?;
        } else {
            sheet.write_blank(row, issue_col, &body)?;
        }
    }

    sheet.set_column_width(number_col, 8)?;
    for col in issue_col..=issue_last_col {
        sheet.set_column_width(col, 24)?;
    }

    workbook.save(path)?;
    Ok(())
}

/// Writes a single-sheet workbook of strings; empty strings leave the cell unset.
#[cfg(test)]
pub(crate) fn write_test_workbook(path: &Path, rows: &[Vec<&str>]) -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (r, row) in (0u32..).zip(rows) {
        for (c, value) in (0u16..).zip(row) {
            if !value.is_empty() {
                sheet.write_string(r, c, *value)?;
            }
        }
    }
    workbook.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn cell_value_to_text() {
        assert_eq!(CellValue::Number(2_024_001.0).to_text().as_deref(), Some("2024001"));
        assert_eq!(CellValue::Number(1.5).to_text().as_deref(), Some("1.5"));
        assert_eq!(CellValue::Text("  ".to_string()).to_text(), None);
        assert_eq!(CellValue::Empty.to_text(), None);
        assert_eq!(CellValue::Error("Div0".to_string()).to_text(), None);
    }

    #[test]
    fn bool_and_date_cells_keep_raw_form() {
        assert_eq!(CellValue::from(&Data::Bool(true)).to_text().as_deref(), Some("TRUE"));
        assert_eq!(CellValue::from(&Data::Bool(false)).to_text().as_deref(), Some("FALSE"));

        let date = calamine::ExcelDateTime::new(
            45292.0,
            calamine::ExcelDateTimeType::DateTime,
            false,
        );
        assert_eq!(CellValue::from(&Data::DateTime(date)).to_text().as_deref(), Some("45292"));
    }

    #[test]
    fn cell_ref_parse_and_display() {
        let cell = CellRef::parse("F2").unwrap();
        assert_eq!(cell, CellRef { row: 1, col: 5 });
        assert_eq!(cell.to_string(), "F2");
        assert_eq!(CellRef::parse("aa10").unwrap().to_string(), "AA10");
        assert!(CellRef::parse("B").is_err());
        assert!(CellRef::parse("2").is_err());
        assert!(CellRef::parse("B0").is_err());
        assert!(CellRef::parse("B2C").is_err());
    }

    #[test]
    fn column_names_round_trip() {
        for (name, index) in [("A", 0), ("Z", 25), ("AA", 26), ("AZ", 51), ("BA", 52)] {
            assert_eq!(column_index(name).unwrap(), index);
            assert_eq!(column_name(index), name);
        }
    }

    #[test]
    fn from_rows_names_blank_headers() {
        let table = SourceTable::from_rows(vec![
            vec![CellValue::from("编号"), CellValue::Empty],
            vec![CellValue::from("1"), CellValue::from("x")],
        ]);
        assert_eq!(table.headers, vec!["编号", "Unnamed: 1"]);
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn reads_xlsx_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.xlsx");
        write_test_workbook(
            &path,
            &[
                vec!["工单编号", "户号", "户名", "备注", "现场勘查"],
                vec!["GD01", "1001", "张三", "", "1.表箱锈蚀 2.未接地"],
            ],
        )
        .unwrap();

        let table = read_source_table(&path, None).unwrap();
        assert_eq!(table.headers.len(), 5);
        assert_eq!(table.headers[4], "现场勘查");
        assert_eq!(table.rows[0][2], CellValue::Text("张三".to_string()));
        assert_eq!(table.rows[0][3], CellValue::Empty);
    }

    #[test]
    fn missing_sheet_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.xlsx");
        write_test_workbook(&path, &[vec!["a"]]).unwrap();
        let err = read_source_table(&path, Some("Nope")).unwrap_err();
        assert!(matches!(err, RectifyError::SheetNotFound(_)));
    }

    #[test]
    fn reads_csv_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.csv");
        std::fs::write(&path, "编号,户号,户名,备注,勘查\nGD01,1001,张三,,\"1.甲问题 2.乙问题\"\n").unwrap();

        let table = read_source_table(&path, None).unwrap();
        assert_eq!(table.headers[4], "勘查");
        assert_eq!(table.rows[0][3], CellValue::Empty);
        assert_eq!(
            table.rows[0][4].to_text().as_deref(),
            Some("1.甲问题 2.乙问题")
        );
    }

    #[test]
    fn starter_template_is_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.xlsx");
        write_starter_template(&path, &Layout::default(), 10).unwrap();

        let table = read_source_table(&path, None).unwrap();
        // Title row becomes the header; labels sit left of the value cells.
        assert_eq!(table.headers[0], "整改通知单");
        assert_eq!(table.rows[0][0].to_text().as_deref(), Some("工单编号"));
        assert_eq!(table.rows[0][2].to_text().as_deref(), Some("户号"));
        assert_eq!(table.rows[2][1].to_text().as_deref(), Some("问题描述"));
    }
}
