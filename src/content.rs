// Post Content Module
// Supplies random post bodies drawn from a word -> definition dictionary.

use crate::config::ConfigError;
use rand::{Rng, RngCore};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

const EMBEDDED_DICTIONARY: &str = include_str!("../data/dictionary.json");

/// Trait for producing post bodies
pub trait ContentProvider: Send + Sync {
    /// Produce the body of the next post
    fn next_content(&self, rng: &mut dyn RngCore) -> String;

    /// Get a name for this provider (for logging/debugging)
    fn name(&self) -> &str;
}

/// Definitions appear either as a plain string or as a list of senses
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Definition {
    Single(String),
    Senses(Vec<String>),
}

impl Definition {
    fn into_first(self) -> Option<String> {
        match self {
            Definition::Single(text) => Some(text),
            Definition::Senses(senses) => senses.into_iter().next(),
        }
    }
}

/// A loaded dictionary, ordered by word
#[derive(Debug, Clone)]
pub struct Dictionary {
    entries: Vec<(String, String)>,
}

impl Dictionary {
    /// Load a dictionary from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::Io(format!("dictionary {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// Parse a dictionary from a JSON object of word -> definition
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: BTreeMap<String, Definition> =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let entries: Vec<(String, String)> = raw
            .into_iter()
            .filter_map(|(word, definition)| definition.into_first().map(|d| (word, d)))
            .collect();

        if entries.is_empty() {
            return Err(ConfigError::Validation(
                "dictionary has no entries; posts cannot be created".to_string(),
            ));
        }
        Ok(Self { entries })
    }

    /// The dictionary bundled with the binary
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::from_json(EMBEDDED_DICTIONARY)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }
}

/// Posts a random dictionary entry as `Word - definition`
#[derive(Debug, Clone)]
pub struct DictionaryContent {
    dictionary: Dictionary,
}

impl DictionaryContent {
    pub fn new(dictionary: Dictionary) -> Self {
        Self { dictionary }
    }

    fn format_entry(word: &str, definition: &str) -> String {
        let mut chars = word.chars();
        let capitalized = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
            None => String::new(),
        };
        format!("{} - {}", capitalized, definition)
    }
}

impl ContentProvider for DictionaryContent {
    fn next_content(&self, rng: &mut dyn RngCore) -> String {
        let entries = self.dictionary.entries();
        let (word, definition) = &entries[rng.random_range(0..entries.len())];
        Self::format_entry(word, definition)
    }

    fn name(&self) -> &str {
        "dictionary"
    }
}

/// Returns the same body for every post
pub struct FixedContent {
    body: String,
}

impl FixedContent {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }
}

impl ContentProvider for FixedContent {
    fn next_content(&self, _rng: &mut dyn RngCore) -> String {
        self.body.clone()
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Build the content provider from an optional dictionary path
pub fn create_content_provider(
    dictionary: Option<&Path>,
) -> Result<Box<dyn ContentProvider>, ConfigError> {
    let dictionary = match dictionary {
        Some(path) => Dictionary::from_file(path)?,
        None => Dictionary::embedded()?,
    };
    tracing::debug!(entries = dictionary.len(), "Dictionary loaded");
    Ok(Box::new(DictionaryContent::new(dictionary)))
}
