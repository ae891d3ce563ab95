//! Staged (temp file + rename) writes and typed reads for CSV and YAML.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::StoreError;

/// Files written to temporaries beside their targets. Nothing is visible at
/// the target paths until [`commit`](Self::commit), which renames them in
/// staging order.
#[derive(Default)]
pub struct StagedWrites {
    files: Vec<(NamedTempFile, PathBuf)>,
}

impl StagedWrites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn csv(&mut self, target: PathBuf, batch: &RecordBatch) -> Result<(), StoreError> {
        let mut tmp = temp_beside(&target)?;
        {
            let mut writer = WriterBuilder::new()
                .with_header(true)
                .build(tmp.as_file_mut());
            writer.write(batch)?;
        }
        self.files.push((tmp, target));
        Ok(())
    }

    pub fn yaml<T: Serialize>(&mut self, target: PathBuf, value: &T) -> Result<(), StoreError> {
        let mut tmp = temp_beside(&target)?;
        serde_yaml::to_writer(tmp.as_file_mut(), value)?;
        self.files.push((tmp, target));
        Ok(())
    }

    pub fn text(&mut self, target: PathBuf, text: &str) -> Result<(), StoreError> {
        let mut tmp = temp_beside(&target)?;
        tmp.write_all(text.as_bytes())
            .map_err(|e| StoreError::io(tmp.path(), e))?;
        self.files.push((tmp, target));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Rename every staged file into place, in the order staged.
    pub fn commit(self) -> Result<usize, StoreError> {
        let count = self.files.len();
        for (tmp, target) in self.files {
            tmp.persist(&target)
                .map_err(|e| StoreError::io(&target, e.error))?;
            debug!(path = %target.display(), "committed");
        }
        Ok(count)
    }
}

fn temp_beside(target: &Path) -> Result<NamedTempFile, StoreError> {
    let dir = target
        .parent()
        .ok_or_else(|| StoreError::Other(format!("no parent directory for {}", target.display())))?;
    fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
    NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))
}

pub fn read_csv(path: &Path, schema: Schema) -> Result<Vec<RecordBatch>, StoreError> {
    let file = File::open(path).map_err(|e| StoreError::io(path, e))?;
    let reader = ReaderBuilder::new(Arc::new(schema))
        .with_header(true)
        .build(file)?;
    Ok(reader.collect::<Result<Vec<_>, _>>()?)
}

pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let file = File::open(path).map_err(|e| StoreError::io(path, e))?;
    Ok(serde_yaml::from_reader(file)?)
}

pub fn read_text(path: &Path) -> Result<Option<String>, StoreError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

/// Source names of files in `dir` ending with `suffix`, sorted. A missing
/// directory yields an empty list.
pub fn sources_with_suffix(dir: &Path, suffix: &str) -> Result<Vec<String>, StoreError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::io(dir, e)),
    };
    let mut sources = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::io(dir, e))?;
        if let Some(name) = entry.file_name().to_str()
            && let Some(source) = name.strip_suffix(suffix)
            && !source.is_empty()
        {
            sources.push(source.to_string());
        }
    }
    sources.sort();
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn staged_files_invisible_until_commit() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("nested/readme.md");

        let mut staged = StagedWrites::new();
        staged.text(target.clone(), "hello").unwrap();
        assert!(!target.exists());
        assert_eq!(staged.len(), 1);

        assert_eq!(staged.commit().unwrap(), 1);
        assert_eq!(read_text(&target).unwrap().as_deref(), Some("hello"));
    }

    #[test]
    fn dropped_stage_leaves_no_files() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("a.yaml");
        {
            let mut staged = StagedWrites::new();
            staged.yaml(target.clone(), &vec![1, 2, 3]).unwrap();
        }
        assert!(!target.exists());
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn read_text_missing_is_none() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(read_text(&tmp.path().join("nope")).unwrap(), None);
    }

    #[test]
    fn sources_by_suffix() {
        let tmp = TempDir::new().unwrap();
        for name in ["gcs_provenance.yaml", "doaj_provenance.yaml", "doaj_journals.csv", "_provenance.yaml"] {
            fs::write(tmp.path().join(name), "").unwrap();
        }
        let sources = sources_with_suffix(tmp.path(), "_provenance.yaml").unwrap();
        assert_eq!(sources, vec!["doaj", "gcs"]);
        assert!(sources_with_suffix(&tmp.path().join("missing"), ".csv").unwrap().is_empty());
    }
}
