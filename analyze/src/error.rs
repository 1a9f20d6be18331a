use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure reported by a tokenizer collaborator.
#[derive(Error, Debug)]
#[error("tokenizer failed: {0}")]
pub struct TokenizerError(pub String);

/// Errors raised while turning raw rows into a document collection.
#[derive(Error, Debug)]
pub enum CorpusError {
    /// Nothing survived filtering. Callers skip the corpus.
    #[error("corpus {corpus}: no usable data")]
    NoUsableData { corpus: String },

    #[error("corpus {corpus}: {source}")]
    Tokenizer {
        corpus: String,
        #[source]
        source: TokenizerError,
    },

    #[error("corpus {corpus}: failed to read rows: {source}")]
    Provider {
        corpus: String,
        #[source]
        source: io::Error,
    },
}

impl CorpusError {
    pub fn is_no_usable_data(&self) -> bool {
        matches!(self, CorpusError::NoUsableData { .. })
    }
}

/// Errors raised by the Gibbs trainer.
#[derive(Error, Debug, PartialEq)]
pub enum LdaError {
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("training cancelled after {completed} sweeps")]
    Cancelled { completed: usize },
}

/// A per-corpus failure, tagged with the corpus it came from.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Corpus(#[from] CorpusError),

    #[error("corpus {corpus}: {source}")]
    Training {
        corpus: String,
        #[source]
        source: LdaError,
    },

    #[error("corpus {corpus}: failed to write results: {source}")]
    Output {
        corpus: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Failures that stop a whole run before any corpus is processed.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("cannot list corpora: {0}")]
    ListCorpora(#[source] io::Error),

    #[error("cannot start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
