//! Manifest-driven template copying.
//!
//! A manifest has one case per line, with the application id and account
//! name as its first two fields. Each line yields one renamed copy of the
//! template workbook.

use std::fs;
use std::path::{Path, PathBuf};

use crate::encoding::read_text_file;
use crate::error::{RectifyError, Result};
use crate::naming::copy_file_name;
use crate::types::Outcome;

/// Splits a manifest line into its non-empty fields.
///
/// Delimiter preference: tab, then whitespace runs (when the line contains
/// two consecutive spaces), then comma, then single space.
pub fn split_fields(line: &str) -> Vec<String> {
    let parts: Vec<&str> = if line.contains('\t') {
        line.split('\t').collect()
    } else if line.contains("  ") {
        line.split_whitespace().collect()
    } else if line.contains(',') {
        line.split(',').collect()
    } else {
        line.split(' ').collect()
    };

    parts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Copies a template once per manifest line.
pub struct TemplateCopier {
    template: PathBuf,
    output_dir: PathBuf,
    prefix: String,
}

impl TemplateCopier {
    /// Creates a copier.
    ///
    /// # Errors
    ///
    /// Returns [`RectifyError::TemplateNotFound`] if `template` does not exist.
    pub fn new(template: PathBuf, output_dir: PathBuf, prefix: impl Into<String>) -> Result<Self> {
        if !template.is_file() {
            return Err(RectifyError::TemplateNotFound(template));
        }
        Ok(Self {
            template,
            output_dir,
            prefix: prefix.into(),
        })
    }

    /// Default output directory for a manifest: its parent, or `.`.
    pub fn default_output_dir(manifest: &Path) -> PathBuf {
        match manifest.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Copies the template for every line of `manifest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be read or decoded, or the
    /// output directory cannot be created. Bad lines and failed copies are
    /// reported as [`Outcome::Failed`].
    pub fn run<F>(&self, manifest: &Path, mut on_outcome: F) -> Result<Vec<Outcome>>
    where
        F: FnMut(&Outcome),
    {
        let content = read_text_file(manifest)?;
        fs::create_dir_all(&self.output_dir)?;

        let extension = self
            .template
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut outcomes = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let outcome = self.copy_line(idx + 1, line, &extension);
            on_outcome(&outcome);
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    fn copy_line(&self, line_no: usize, line: &str, extension: &str) -> Outcome {
        let fields = split_fields(line);
        let [first, second, ..] = fields.as_slice() else {
            return Outcome::Failed {
                name: format!("line {line_no}"),
                error: format!("fewer than 2 fields: {line}"),
            };
        };

        let name = copy_file_name(&self.prefix, first, second, extension);
        match fs::copy(&self.template, self.output_dir.join(&name)) {
            Ok(_) => Outcome::Done {
                name,
                detail: format!("line {line_no}"),
            },
            Err(e) => Outcome::Failed {
                name,
                error: format!("copy failed (line {line_no}): {e}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn split_prefers_tab() {
        assert_eq!(split_fields("GD01\t张 三\t备注"), vec!["GD01", "张 三", "备注"]);
    }

    #[test]
    fn split_on_space_runs() {
        assert_eq!(split_fields("GD01   张三  x,y"), vec!["GD01", "张三", "x,y"]);
    }

    #[test]
    fn split_on_comma_then_single_space() {
        assert_eq!(split_fields("GD01, 张三"), vec!["GD01", "张三"]);
        assert_eq!(split_fields("GD01 张三"), vec!["GD01", "张三"]);
        assert_eq!(split_fields("GD01"), vec!["GD01"]);
    }

    #[test]
    fn missing_template_is_fatal() {
        let err = TemplateCopier::new(
            PathBuf::from("/nonexistent/temp.xlsx"),
            PathBuf::from("out"),
            "整改单",
        )
        .err()
        .unwrap();
        assert!(matches!(err, RectifyError::TemplateNotFound(_)));
    }

    #[test]
    fn default_output_dir_is_manifest_parent() {
        assert_eq!(
            TemplateCopier::default_output_dir(Path::new("data/title.txt")),
            PathBuf::from("data")
        );
        assert_eq!(
            TemplateCopier::default_output_dir(Path::new("title.txt")),
            PathBuf::from(".")
        );
    }

    #[test]
    fn copies_template_per_manifest_line() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("temp.xlsx");
        fs::write(&template, b"template bytes").unwrap();
        let manifest = dir.path().join("title.txt");
        fs::write(&manifest, "GD01\t张三\n\nGD02,李/四\nonlyone\n").unwrap();

        let out = dir.path().join("output");
        let copier = TemplateCopier::new(template, out.clone(), "整改单").unwrap();
        let outcomes = copier.run(&manifest, |_| {}).unwrap();

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_done());
        assert!(outcomes[1].is_done());
        assert!(outcomes[2].is_failed());
        assert_eq!(outcomes[1].name(), "整改单-GD02-李_四.xlsx");
        assert_eq!(
            fs::read(out.join("整改单-GD01-张三.xlsx")).unwrap(),
            b"template bytes"
        );
    }

    #[test]
    fn reads_gbk_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("temp.xls");
        fs::write(&template, b"x").unwrap();
        let manifest = dir.path().join("title.txt");
        let (bytes, _, _) = encoding_rs::GBK.encode("GD09\t钱七\r\n");
        fs::write(&manifest, &bytes).unwrap();

        let copier = TemplateCopier::new(template, dir.path().to_path_buf(), "整改单").unwrap();
        let outcomes = copier.run(&manifest, |_| {}).unwrap();
        assert_eq!(outcomes[0].name(), "整改单-GD09-钱七.xls");
        assert!(dir.path().join("整改单-GD09-钱七.xls").exists());
    }
}
