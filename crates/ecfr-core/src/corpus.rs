//! Loader for the on-disk corpus written by the eCFR collector.
//!
//! Layout under the corpus root:
//! - `collection_summary_<ts>.json`: `results` maps title number to
//!   `{name, parts: {part number: {sections_file, ...}}}`; the
//!   lexicographically latest summary wins
//! - each `sections_file`: JSON array of `{section, title, content}`
//! - optional `titles/latest.json`: `{"titles": [{"number", "name"}]}`, used
//!   when a summary entry has no title name
//!
//! Missing inputs never fail the load. They are logged and the affected
//! titles, parts or sections are left out.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::config::{expand_path, resolve_with_base, PipelineConfig};
use crate::error::{Error, Result};
use crate::types::SectionRecord;

const SUMMARY_PREFIX: &str = "collection_summary_";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CorpusStats {
    pub titles: usize,
    pub parts: usize,
    pub sections: usize,
    pub skipped_parts: usize,
    pub skipped_sections: usize,
}

#[derive(Debug, Deserialize)]
struct CollectionSummary {
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    results: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct TitleEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    parts: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct PartEntry {
    #[serde(default)]
    sections_file: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TitlesListing {
    #[serde(default)]
    titles: Vec<TitleListingEntry>,
}

#[derive(Debug, Deserialize)]
struct TitleListingEntry {
    number: Value,
    #[serde(default)]
    name: Option<String>,
}

pub struct CorpusLoader {
    root: PathBuf,
}

impl CorpusLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.corpus_root_path())
    }

    pub fn root(&self) -> &Path { &self.root }

    pub fn load(&self) -> Vec<SectionRecord> {
        self.load_with_stats(None).0
    }

    /// Stop after `limit` sections.
    pub fn load_limited(&self, limit: usize) -> Vec<SectionRecord> {
        self.load_with_stats(Some(limit)).0
    }

    pub fn load_with_stats(&self, limit: Option<usize>) -> (Vec<SectionRecord>, CorpusStats) {
        let mut stats = CorpusStats::default();
        let summary_path = match self.latest_summary() {
            Some(p) => p,
            None => {
                tracing::warn!("No collection summary files found under {}", self.root.display());
                return (Vec::new(), stats);
            }
        };
        let summary = match read_summary(&summary_path) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("Cannot read collection summary: {}", e);
                return (Vec::new(), stats);
            }
        };
        tracing::info!(
            "Loaded content data from {} (collected {})",
            summary_path.display(),
            summary.timestamp.as_deref().unwrap_or("unknown")
        );

        let title_names = self.title_names();
        let mut sections = Vec::new();

        'titles: for (title_number, raw_title) in &summary.results {
            let title: TitleEntry = match serde_json::from_value(raw_title.clone()) {
                Ok(t) => t,
                Err(e) => {
                    tracing::warn!("Skipping title {}: {}", title_number, e);
                    continue;
                }
            };
            stats.titles += 1;
            let title_name = title
                .name
                .filter(|n| !n.trim().is_empty())
                .or_else(|| title_names.get(title_number).cloned())
                .unwrap_or_default();

            for (part_number, raw_part) in &title.parts {
                let Some(path) = serde_json::from_value::<PartEntry>(raw_part.clone())
                    .ok()
                    .and_then(|p| p.sections_file)
                    .and_then(|f| self.resolve_sections_path(&f))
                else {
                    tracing::debug!("Title {} part {} has no readable sections file", title_number, part_number);
                    stats.skipped_parts += 1;
                    continue;
                };
                let entries = match read_section_entries(&path) {
                    Ok(entries) => entries,
                    Err(e) => {
                        tracing::warn!("{}", e);
                        stats.skipped_parts += 1;
                        continue;
                    }
                };
                stats.parts += 1;
                for entry in entries {
                    match section_from_entry(&entry, title_number, &title_name, part_number) {
                        Some(section) => {
                            if limit.is_some_and(|n| sections.len() >= n) {
                                tracing::info!("Limited to first {} sections", sections.len());
                                break 'titles;
                            }
                            sections.push(section);
                            stats.sections += 1;
                        }
                        None => stats.skipped_sections += 1,
                    }
                }
            }
        }

        tracing::info!(
            "Loaded {} sections from {} parts across {} titles ({} parts, {} sections skipped)",
            stats.sections, stats.parts, stats.titles, stats.skipped_parts, stats.skipped_sections
        );
        (sections, stats)
    }

    fn latest_summary(&self) -> Option<PathBuf> {
        walkdir::WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                let name = e.file_name().to_string_lossy();
                name.starts_with(SUMMARY_PREFIX) && name.ends_with(".json")
            })
            .map(|e| e.into_path())
            .max_by(|a, b| a.file_name().cmp(&b.file_name()))
    }

    fn title_names(&self) -> HashMap<String, String> {
        let path = self.root.join("titles").join("latest.json");
        let Ok(text) = fs::read_to_string(&path) else {
            tracing::debug!("Titles data file not found: {}", path.display());
            return HashMap::new();
        };
        match serde_json::from_str::<TitlesListing>(&text) {
            Ok(listing) => listing
                .titles
                .into_iter()
                .filter_map(|t| Some((scalar_to_string(Some(&t.number)), t.name?)))
                .collect(),
            Err(e) => {
                tracing::warn!("Ignoring unreadable titles file {}: {}", path.display(), e);
                HashMap::new()
            }
        }
    }

    /// Tries the path as written, then relative to the corpus root, then the
    /// trailing `content/...` portion under the corpus root.
    fn resolve_sections_path(&self, raw: &str) -> Option<PathBuf> {
        let direct = expand_path(raw);
        if direct.is_file() {
            return Some(direct);
        }
        let based = resolve_with_base(&self.root, raw);
        if based.is_file() {
            return Some(based);
        }
        let components: Vec<Component> = direct.components().collect();
        let pos = components.iter().position(|c| c.as_os_str() == "content")?;
        let relocated = components[pos..].iter().fold(self.root.clone(), |acc, c| acc.join(c));
        relocated.is_file().then_some(relocated)
    }
}

fn read_summary(path: &Path) -> Result<CollectionSummary> {
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|e| Error::MalformedRecord {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Parse a sections file at the load boundary: it must be a JSON array.
pub fn read_section_entries(path: &Path) -> Result<Vec<Value>> {
    let text = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&text).map_err(|e| Error::MalformedRecord {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    match value {
        Value::Array(entries) => Ok(entries),
        other => Err(Error::MalformedRecord {
            path: path.to_path_buf(),
            reason: format!("expected an array of sections, found {}", json_kind(&other)),
        }),
    }
}

/// Only entries with a non-empty string `content` become sections.
fn section_from_entry(entry: &Value, title_number: &str, title_name: &str, part_number: &str) -> Option<SectionRecord> {
    let obj = entry.as_object()?;
    let content = obj.get("content")?.as_str()?;
    if content.is_empty() {
        return None;
    }
    Some(SectionRecord {
        title_number: title_number.to_string(),
        title_name: title_name.to_string(),
        part_number: part_number.to_string(),
        section_number: scalar_to_string(obj.get("section")),
        section_title: scalar_to_string(obj.get("title")),
        content: content.to_string(),
    })
}

fn scalar_to_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
