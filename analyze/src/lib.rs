//! Topic discovery for social-media comment corpora.
//!
//! Raw comments are turned into an indexed [`DocumentCollection`] by the
//! [`CorpusBuilder`], then a collapsed Gibbs sampler ([`GibbsLDA`]) fits a
//! Latent Dirichlet Allocation model over it. The [`Orchestrator`] runs many
//! corpora side by side and hands results to a [`ResultSink`].

pub mod config;
pub mod corpus;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod output;
pub mod provider;
pub mod random;
pub mod tokenizer;
pub mod topic_modeling;

pub use config::RunConfig;
pub use corpus::CorpusBuilder;
pub use error::{ConfigError, CorpusError, LdaError, OrchestratorError, PipelineError, TokenizerError};
pub use models::{Document, DocumentCollection};
pub use orchestrator::{CorpusOutcome, CorpusReport, Orchestrator};
pub use output::{CorpusResult, DirectorySink, ResultSink, RunSummary};
pub use provider::{CorpusProvider, DirectoryProvider, MemoryProvider};
pub use random::{RandomSource, SeededRandom};
pub use tokenizer::{JiebaTokenizer, RegexTokenizer, StopwordSet, Tokenizer};
pub use topic_modeling::{Diagnostics, GibbsLDA, GibbsState, LDAConfig, ModeledTopic, TopicModel};
