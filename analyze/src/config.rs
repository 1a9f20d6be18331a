use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::corpus::{MIN_DOC_LEN, MIN_TOKEN_CHARS, MIN_WORD_FREQ};
use crate::error::ConfigError;
use crate::topic_modeling::LDAConfig;

/// Everything a pipeline run needs, passed explicitly to the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub stopwords: PathBuf,
    pub corpus_prefix: String,
    pub num_topics: usize,
    pub iterations: usize,
    pub alpha: f64,
    pub beta: f64,
    pub top_n: usize,
    pub seed: u64,
    pub threads: Option<usize>,
    pub min_word_freq: usize,
    pub min_doc_len: usize,
    pub min_token_chars: usize,
    pub report_every: usize,
    pub adaptive_iterations: bool,
    /// Rows are already space-separated words; skip jieba segmentation.
    pub presegmented: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            input_dir: PathBuf::from("comments"),
            output_dir: PathBuf::from("results"),
            stopwords: PathBuf::from("stopwords.txt"),
            corpus_prefix: "comments_".to_string(),
            num_topics: 15,
            iterations: 500,
            alpha: 0.1,
            beta: 0.01,
            top_n: 15,
            seed: 42,
            threads: None,
            min_word_freq: MIN_WORD_FREQ,
            min_doc_len: MIN_DOC_LEN,
            min_token_chars: MIN_TOKEN_CHARS,
            report_every: 50,
            adaptive_iterations: true,
            presegmented: false,
        }
    }
}

impl RunConfig {
    /// Reads a JSON config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: RunConfig =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.lda_config(self.iterations)
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.top_n == 0 {
            return Err(ConfigError::Invalid("top_n must be at least 1".into()));
        }
        if self.threads == Some(0) {
            return Err(ConfigError::Invalid("threads must be at least 1".into()));
        }
        Ok(())
    }

    /// Sweep count for a corpus of `docs_count` documents.
    ///
    /// With adaptive iterations the budget is clamped to 100..=1000, and
    /// large corpora (over 10 000 documents) get 300 sweeps.
    pub fn effective_iterations(&self, docs_count: usize) -> usize {
        if !self.adaptive_iterations {
            return self.iterations;
        }
        if docs_count > 10_000 {
            300
        } else {
            self.iterations.clamp(100, 1000)
        }
    }

    pub fn lda_config(&self, iterations: usize) -> LDAConfig {
        LDAConfig {
            num_topics: self.num_topics,
            iterations,
            alpha: self.alpha,
            beta: self.beta,
            seed: self.seed,
            report_every: self.report_every,
        }
    }
}
