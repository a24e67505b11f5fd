//! File output for compiled rules
//!
//! Layout under the publication base path:
//!
//! ```text
//! DFE-ER/
//!   Stage4/07/07_05/4_07_05_01 ... .ids   one file per specification
//!   Group/Stage4/4_07 Type - ... .ids      one file per scope
//!   ER-DFE-...-Stage4 Assurance-S2-P01-Core.ids
//!   ER-DFE-...-Stage4 Assurance-S2-P01-Core.json
//! ```

pub mod ids_xml;
pub mod json;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use ids_core::{
    GeneratorError, GroupMetadata, OutputSink, RibaStage, SpecLocation, Specification, SpecificationGroup,
};
use tracing::{debug, trace};

const GROUP_DIR: &str = "Group";

/// Replace characters no file system accepts and trim trailing dots and blanks
pub fn safe_file_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect();
    replaced
        .trim_start()
        .trim_end_matches(|c: char| c == '.' || c.is_whitespace())
        .to_string()
}

/// Where each kind of output file goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportLayout {
    base: PathBuf,
}

impl ExportLayout {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Folder of single-specification files for a stage
    pub fn stage_dir(&self, stage: RibaStage) -> PathBuf {
        self.base.join(stage.to_string())
    }

    pub fn group_dir(&self, stage: RibaStage) -> PathBuf {
        self.base.join(GROUP_DIR).join(stage.to_string())
    }

    pub fn specification_path(&self, location: &SpecLocation, spec: &Specification) -> PathBuf {
        let mut dir = self.stage_dir(location.stage);
        for segment in location.full_prefix.split('/').filter(|s| !s.is_empty()) {
            dir.push(segment);
        }
        dir.join(format!(
            "{}_{}.ids",
            location.stage.number(),
            safe_file_name(&spec.name)
        ))
    }

    pub fn group_path(&self, stage: RibaStage, group: &SpecificationGroup) -> PathBuf {
        self.group_dir(stage)
            .join(format!("{}.ids", safe_file_name(group.name())))
    }

    pub fn bundle_path(&self, file_name: &str) -> PathBuf {
        self.base.join(file_name)
    }

    /// Remove a stage's per-specification and per-scope folders
    pub fn clean(&self, stage: RibaStage) -> Result<()> {
        for dir in [self.stage_dir(stage), self.group_dir(stage)] {
            if dir.exists() {
                fs::remove_dir_all(&dir).with_context(|| format!("Removing {}", dir.display()))?;
                debug!("Cleaned {}", dir.display());
            }
        }
        Ok(())
    }

    /// Drop the per-scope folder when it holds nothing worth keeping
    pub fn discard_groups(&self, stage: RibaStage) -> Result<()> {
        let dir = self.group_dir(stage);
        if dir.exists() {
            fs::remove_dir_all(&dir).with_context(|| format!("Removing {}", dir.display()))?;
        }
        Ok(())
    }
}

/// Files written through a [`FileSink`], shared with the caller
pub type WrittenFiles = Arc<Mutex<Vec<PathBuf>>>;

/// Writes IDS files as the compiler emits specifications and closes scopes
pub struct FileSink {
    layout: ExportLayout,
    written: WrittenFiles,
}

impl FileSink {
    pub fn new(layout: ExportLayout) -> Self {
        Self {
            layout,
            written: Arc::default(),
        }
    }

    /// Handle on the list of written paths; stays valid after the sink is boxed
    pub fn written(&self) -> WrittenFiles {
        Arc::clone(&self.written)
    }

    fn record(&self, path: PathBuf) {
        if let Ok(mut written) = self.written.lock() {
            written.push(path);
        }
    }
}

fn sink_error(err: anyhow::Error) -> GeneratorError {
    GeneratorError::Sink(format!("{err:#}"))
}

impl OutputSink for FileSink {
    fn write_specification(
        &mut self,
        location: &SpecLocation,
        metadata: &GroupMetadata,
        spec: &Specification,
    ) -> ids_core::Result<()> {
        let path = self.layout.specification_path(location, spec);
        let mut group = SpecificationGroup::new(metadata.clone());
        group.push(spec.clone());
        ids_xml::write_file(&path, &group).map_err(sink_error)?;
        trace!("Wrote {}", path.display());
        self.record(path);
        Ok(())
    }

    fn write_group(&mut self, stage: RibaStage, group: &SpecificationGroup) -> ids_core::Result<()> {
        let path = self.layout.group_path(stage, group);
        ids_xml::write_file(&path, group).map_err(sink_error)?;
        debug!("Wrote group {} ({} specs)", path.display(), group.len());
        self.record(path);
        Ok(())
    }
}

/// Every `.ids` file below `dir`, sorted
pub fn ids_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    if !dir.exists() {
        return Ok(found);
    }
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current).with_context(|| format!("Listing {}", current.display()))? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "ids") {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}
