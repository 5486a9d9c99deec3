//! Marker-delimited section replacement.
//!
//! A section is the text strictly between `<!-- TAG START -->` and the first
//! following `<!-- TAG END -->`. Only that text is ever rewritten; the markers
//! and everything outside them are preserved byte for byte.

use anyhow::Context;
use std::path::{Path, PathBuf};

use crate::error::{Result, SyncError};

pub fn start_marker(tag: &str) -> String {
    format!("<!-- {} START -->", tag)
}

pub fn end_marker(tag: &str) -> String {
    format!("<!-- {} END -->", tag)
}

/// Generated content for one tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub tag: String,
    pub fragment: String,
}

impl Section {
    pub fn new(tag: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            fragment: fragment.into(),
        }
    }
}

/// Replace the content between the markers of `tag` with `fragment`
pub fn replace_section(document: &str, tag: &str, fragment: &str) -> Result<String> {
    let start = start_marker(tag);
    let end = end_marker(tag);
    let not_found = || SyncError::MarkerNotFound {
        tag: tag.to_string(),
    };

    let content_start = document.find(&start).ok_or_else(not_found)? + start.len();
    let content_end = document[content_start..]
        .find(&end)
        .map(|offset| content_start + offset)
        .ok_or_else(not_found)?;

    let mut updated = String::with_capacity(document.len() + fragment.len());
    updated.push_str(&document[..content_start]);
    updated.push('\n');
    updated.push_str(fragment);
    updated.push('\n');
    updated.push_str(&document[content_end..]);
    Ok(updated)
}

/// Outcome of applying several sections
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionReport {
    pub updated: Vec<String>,
    pub skipped: Vec<String>,
}

/// Apply every section; missing markers skip that section with a warning
pub fn apply_sections(document: &str, sections: &[Section]) -> (String, SectionReport) {
    let mut current = document.to_string();
    let mut report = SectionReport::default();

    for section in sections {
        match replace_section(&current, &section.tag, &section.fragment) {
            Ok(updated) => {
                current = updated;
                report.updated.push(section.tag.clone());
            }
            Err(e) => {
                tracing::warn!("{}, leaving it untouched", e);
                report.skipped.push(section.tag.clone());
            }
        }
    }

    (current, report)
}

/// Target text file
#[derive(Debug, Clone)]
pub struct Document {
    path: PathBuf,
    original: String,
    content: String,
}

impl Document {
    pub fn load(path: &Path) -> Result<Self> {
        let original = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            content: original.clone(),
            original,
        })
    }

    pub fn apply(&mut self, sections: &[Section]) -> SectionReport {
        let (updated, report) = apply_sections(&self.content, sections);
        self.content = updated;
        report
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_changed(&self) -> bool {
        self.content != self.original
    }

    /// Write back if anything changed; returns whether the file was written
    pub fn save(&self) -> Result<bool> {
        if !self.is_changed() {
            tracing::info!("{} already up to date", self.path.display());
            return Ok(false);
        }

        std::fs::write(&self.path, &self.content)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        tracing::info!("✅ {} updated", self.path.display());
        Ok(true)
    }
}
