use color_eyre::Result;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Registry of known cache files
const CACHE_FILES: &[&str] = &["question_history.txt"];

const QUESTION_HISTORY_FILE: &str = "question_history.txt";

/// Most recent entries kept when saving history.
const HISTORY_LIMIT: usize = 500;

/// Manages cache directory and cache file operations
#[derive(Clone)]
pub struct CacheManager {
    pub(crate) cache_dir: PathBuf,
}

impl CacheManager {
    /// Create a new CacheManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| color_eyre::eyre::eyre!("Could not determine cache directory"))?
            .join(app_name);

        Ok(Self { cache_dir })
    }

    /// Create a CacheManager with a custom cache directory (primarily for testing)
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Get the cache directory path
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Get path to a specific cache file
    pub fn cache_file(&self, filename: &str) -> PathBuf {
        self.cache_dir.join(filename)
    }

    /// Ensure the cache directory exists
    pub fn ensure_cache_dir(&self) -> Result<()> {
        if !self.cache_dir.exists() {
            fs::create_dir_all(&self.cache_dir)?;
        }
        Ok(())
    }

    /// Clear all registered cache files
    pub fn clear_all(&self) -> Result<()> {
        for filename in CACHE_FILES {
            let file_path = self.cache_file(filename);
            if file_path.exists() {
                if let Err(e) = fs::remove_file(&file_path) {
                    eprintln!("Warning: Could not remove cache file {}: {}", filename, e);
                }
            }
        }

        Ok(())
    }

    /// Load the question history (oldest first). Missing file = empty history.
    pub fn load_question_history(&self) -> Result<Vec<String>> {
        let history_file = self.cache_file(QUESTION_HISTORY_FILE);

        if !history_file.exists() {
            return Ok(Vec::new());
        }

        let file = fs::File::open(&history_file)?;
        let reader = BufReader::new(file);
        let mut history = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if !line.trim().is_empty() {
                history.push(line);
            }
        }

        Ok(history)
    }

    /// Append a question to the history file, trimming to the most recent
    /// `HISTORY_LIMIT` entries.
    pub fn append_question(&self, question: &str) -> Result<()> {
        let question = question.trim();
        if question.is_empty() {
            return Ok(());
        }
        let mut history = self.load_question_history()?;
        history.push(question.to_string());
        if history.len() > HISTORY_LIMIT {
            let excess = history.len() - HISTORY_LIMIT;
            history.drain(..excess);
        }

        self.ensure_cache_dir()?;
        let history_file = self.cache_file(QUESTION_HISTORY_FILE);
        let mut file = fs::File::create(&history_file)?;
        for entry in &history {
            writeln!(file, "{}", entry)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_append_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheManager::with_dir(dir.path().join("askdata"));

        assert!(cache.load_question_history().unwrap().is_empty());

        cache.append_question("What is the total sales?").unwrap();
        cache.append_question("Plot sales by country").unwrap();

        let history = cache.load_question_history().unwrap();
        assert_eq!(
            history,
            vec!["What is the total sales?", "Plot sales by country"]
        );
    }

    #[test]
    fn test_blank_questions_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheManager::with_dir(dir.path().join("askdata"));
        cache.append_question("   ").unwrap();
        assert!(cache.load_question_history().unwrap().is_empty());
    }

    #[test]
    fn test_clear_all_removes_history() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheManager::with_dir(dir.path().join("askdata"));
        cache.append_question("a question").unwrap();
        cache.clear_all().unwrap();
        assert!(cache.load_question_history().unwrap().is_empty());
    }
}
