// ABOUTME: Read-only prompt/code dataset backing the render endpoints
// ABOUTME: Loads a two-column CSV and answers substring and random lookups

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Value the header row carries in the prompt column
const HEADER_PROMPT: &str = "prompt";

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Failed to read dataset file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse dataset CSV: {0}")]
    ParseError(#[from] csv::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptEntry {
    pub prompt: String,
    pub code: String,
}

impl PromptEntry {
    pub fn new(prompt: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            code: code.into(),
        }
    }
}

/// Prompt/code pairs in file order.
///
/// Constructed once at startup and shared read-only; lookups never mutate it.
#[derive(Debug, Clone, Default)]
pub struct PromptDataset {
    entries: Vec<PromptEntry>,
}

impl PromptDataset {
    /// Load from a CSV file.
    ///
    /// A missing file gives an empty dataset so the service can still start;
    /// every lookup then misses.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(
                "Dataset file {} not found, serving an empty dataset",
                path.display()
            );
            return Ok(Self::default());
        }

        let dataset = Self::from_reader(File::open(path)?)?;
        info!(
            "Loaded {} prompts from {}",
            dataset.len(),
            path.display()
        );
        Ok(dataset)
    }

    /// Parse CSV rows of `prompt,code`.
    ///
    /// Rows whose prompt is the literal header value are skipped wherever they
    /// appear, as are rows without a code column.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut entries = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record = record?;
            let (Some(prompt), Some(code)) = (record.get(0), record.get(1)) else {
                debug!("Skipping dataset row {}: fewer than two columns", index + 1);
                continue;
            };
            if prompt == HEADER_PROMPT {
                continue;
            }
            if code.trim().is_empty() {
                debug!("Skipping dataset row {}: empty code", index + 1);
                continue;
            }
            entries.push(PromptEntry::new(prompt, code));
        }

        Ok(Self { entries })
    }

    pub fn from_entries(entries: Vec<PromptEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PromptEntry] {
        &self.entries
    }

    /// With a query, the first entry whose prompt contains it case-insensitively.
    /// Without one, an entry chosen uniformly at random.
    pub fn lookup(&self, query: Option<&str>) -> Option<&PromptEntry> {
        self.lookup_with_rng(query, &mut rand::thread_rng())
    }

    pub fn lookup_with_rng<R: Rng + ?Sized>(
        &self,
        query: Option<&str>,
        rng: &mut R,
    ) -> Option<&PromptEntry> {
        match query {
            Some(query) => {
                let needle = query.to_lowercase();
                self.entries
                    .iter()
                    .find(|entry| entry.prompt.to_lowercase().contains(&needle))
            }
            None => self.entries.choose(rng),
        }
    }

    /// Prompts in file order, truncated to `limit` when given
    pub fn list_prompts(&self, limit: Option<usize>) -> Vec<String> {
        let limit = limit.unwrap_or(self.entries.len());
        self.entries
            .iter()
            .take(limit)
            .map(|entry| entry.prompt.clone())
            .collect()
    }
}
