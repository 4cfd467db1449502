//! Vocabulary loading
//!
//! The vocabulary is the word list every payload draws from. It is loaded
//! once before any worker starts, is immutable afterwards, and is shared
//! read-only across workers via `Arc`. An empty or unreachable source is a
//! startup-fatal condition: the engine refuses to run without words.

use std::path::Path;

use crate::error::{Error, Result};
use crate::headers;

/// Immutable, ordered word list shared by all workers
#[derive(Debug, Clone)]
pub struct Vocabulary {
    words: Vec<String>,
}

impl Vocabulary {
    /// Create a vocabulary from an in-memory word list
    ///
    /// Fails if the list is empty or contains empty strings.
    pub fn new(words: Vec<String>) -> Result<Self> {
        if words.is_empty() {
            return Err(Error::Vocabulary("word list is empty".into()));
        }
        if words.iter().any(|w| w.trim().is_empty()) {
            return Err(Error::Vocabulary("word list contains empty entries".into()));
        }
        Ok(Self { words })
    }

    /// Load a vocabulary from a line-delimited text file
    ///
    /// Blank lines are skipped; surrounding whitespace is trimmed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let words: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        if words.is_empty() {
            return Err(Error::Vocabulary(format!(
                "no words found in file: {}",
                path.display()
            )));
        }
        Ok(Self { words })
    }

    /// Fetch a vocabulary from an endpoint returning a JSON array of strings
    ///
    /// Sent with the same browser-like headers the submission traffic uses,
    /// so the fetch blends in with the rest of the run.
    pub async fn fetch(client: &reqwest::Client, url: &str) -> Result<Self> {
        let response = client
            .get(url)
            .headers(headers::plain_browser_headers())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Vocabulary(format!(
                "word list fetch from {} returned status {}",
                url,
                response.status()
            )));
        }

        let words: Vec<String> = response.json().await?;
        tracing::info!(count = words.len(), url, "word list fetched");
        Self::new(words)
    }

    /// The ordered word list
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Number of words
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether the vocabulary is empty (never true for a constructed value)
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_new_rejects_empty_list() {
        let result = Vocabulary::new(vec![]);
        assert!(result.is_err());
    }

    #[test]
    fn test_new_rejects_blank_entries() {
        let result = Vocabulary::new(vec!["abandon".into(), "  ".into()]);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_file_skips_blank_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "abandon").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  ability  ").unwrap();
        writeln!(file, "able").unwrap();

        let vocab = Vocabulary::from_file(file.path()).unwrap();
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.words()[1], "ability");
    }

    #[test]
    fn test_from_file_empty_is_error() {
        let file = NamedTempFile::new().unwrap();
        let result = Vocabulary::from_file(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_from_file_missing_is_error() {
        let result = Vocabulary::from_file(Path::new("/nonexistent/words.txt"));
        assert!(result.is_err());
    }
}
