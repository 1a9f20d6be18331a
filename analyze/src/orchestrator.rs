use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use chrono::Utc;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::config::RunConfig;
use crate::corpus::CorpusBuilder;
use crate::error::{CorpusError, LdaError, OrchestratorError, PipelineError};
use crate::output::{CorpusResult, ResultSink, RunSummary};
use crate::provider::CorpusProvider;
use crate::tokenizer::{StopwordSet, Tokenizer};
use crate::topic_modeling::GibbsLDA;

#[derive(Debug, Clone, PartialEq)]
pub enum CorpusOutcome {
    Completed(RunSummary),
    Skipped(String),
    Failed(String),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorpusReport {
    pub corpus: String,
    pub outcome: CorpusOutcome,
}

/// Builds and trains every corpus a provider lists, each on its own worker.
///
/// Corpora share nothing but the read-only collaborators, so one failing
/// corpus never affects another.
pub struct Orchestrator<'a> {
    config: &'a RunConfig,
    provider: &'a dyn CorpusProvider,
    tokenizer: &'a dyn Tokenizer,
    stopwords: &'a StopwordSet,
    sink: &'a dyn ResultSink,
    cancel: &'a AtomicBool,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: &'a RunConfig,
        provider: &'a dyn CorpusProvider,
        tokenizer: &'a dyn Tokenizer,
        stopwords: &'a StopwordSet,
        sink: &'a dyn ResultSink,
        cancel: &'a AtomicBool,
    ) -> Self {
        Orchestrator {
            config,
            provider,
            tokenizer,
            stopwords,
            sink,
            cancel,
        }
    }

    /// Reports come back in the provider's corpus order.
    pub fn run(&self) -> Result<Vec<CorpusReport>, OrchestratorError> {
        let names = self
            .provider
            .corpus_names()
            .map_err(OrchestratorError::ListCorpora)?;
        if names.is_empty() {
            log::warn!("no corpora found");
            return Ok(Vec::new());
        }
        log::info!("found corpora: {:?}", names);

        let threads = self
            .config
            .threads
            .unwrap_or_else(|| thread::available_parallelism().map_or(1, |n| n.get()))
            .min(names.len())
            .max(1);
        let pool = ThreadPoolBuilder::new().num_threads(threads).build()?;

        Ok(pool.install(|| names.par_iter().map(|name| self.report(name)).collect()))
    }

    fn report(&self, corpus: &str) -> CorpusReport {
        let outcome = if self.cancel.load(Ordering::Relaxed) {
            CorpusOutcome::Cancelled
        } else {
            match self.process(corpus) {
                Ok(summary) => CorpusOutcome::Completed(summary),
                Err(PipelineError::Corpus(e)) if e.is_no_usable_data() => {
                    log::info!("corpus {} has no usable data, skipping", corpus);
                    CorpusOutcome::Skipped(e.to_string())
                }
                Err(PipelineError::Training {
                    source: LdaError::Cancelled { .. },
                    ..
                }) => CorpusOutcome::Cancelled,
                Err(e) => {
                    log::error!("{}", e);
                    CorpusOutcome::Failed(e.to_string())
                }
            }
        };

        CorpusReport {
            corpus: corpus.to_string(),
            outcome,
        }
    }

    fn process(&self, corpus: &str) -> Result<RunSummary, PipelineError> {
        log::info!("processing corpus {}", corpus);
        let config = self.config;

        let rows = self
            .provider
            .rows(corpus)
            .map_err(|source| CorpusError::Provider {
                corpus: corpus.to_string(),
                source,
            })?;

        let collection = CorpusBuilder::new(self.tokenizer, self.stopwords)
            .min_word_freq(config.min_word_freq)
            .min_doc_len(config.min_doc_len)
            .min_token_chars(config.min_token_chars)
            .build(corpus, &rows)?;

        let iterations = config.effective_iterations(collection.docs_count());
        let training_error = |source| PipelineError::Training {
            corpus: corpus.to_string(),
            source,
        };
        let lda = GibbsLDA::new(config.lda_config(iterations)).map_err(training_error)?;
        let model = lda
            .fit_with_cancel(&collection, self.cancel)
            .map_err(training_error)?;

        let topics = model.topics(&collection, config.top_n);
        let summary = RunSummary {
            corpus: corpus.to_string(),
            num_topics: config.num_topics,
            iterations,
            alpha: config.alpha,
            beta: config.beta,
            final_entropy: model.diagnostics.final_entropy,
            docs_count: collection.docs_count(),
            words_count: collection.words_count(),
            total_tokens: collection.total_tokens(),
            guarded_resamples: model.diagnostics.guarded_resamples,
            elapsed_secs: model.diagnostics.elapsed.as_secs_f64(),
            completed_at: Utc::now(),
        };

        self.sink
            .write(&CorpusResult {
                collection: &collection,
                model: &model,
                topics: &topics,
                summary: &summary,
            })
            .map_err(|source| PipelineError::Output {
                corpus: corpus.to_string(),
                source,
            })?;

        log::info!("corpus {} done", corpus);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TokenizerError;
    use crate::provider::MemoryProvider;
    use std::io;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        written: Mutex<Vec<String>>,
    }

    impl ResultSink for RecordingSink {
        fn write(&self, result: &CorpusResult<'_>) -> io::Result<()> {
            assert_eq!(result.topics.len(), result.summary.num_topics);
            self.written
                .lock()
                .unwrap()
                .push(result.summary.corpus.clone());
            Ok(())
        }
    }

    struct FailingSink;

    impl ResultSink for FailingSink {
        fn write(&self, _result: &CorpusResult<'_>) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
        }
    }

    /// Fails on any row mentioning "poison".
    fn picky(text: &str) -> Result<Vec<String>, TokenizerError> {
        if text.contains("poison") {
            return Err(TokenizerError("cannot segment".into()));
        }
        Ok(text.split_whitespace().map(String::from).collect())
    }

    fn test_config() -> RunConfig {
        RunConfig {
            num_topics: 2,
            iterations: 5,
            adaptive_iterations: false,
            top_n: 3,
            threads: Some(2),
            ..RunConfig::default()
        }
    }

    fn provider() -> MemoryProvider {
        let mut provider = MemoryProvider::new();
        provider.insert("comments_a", vec!["rust cargo crate rust cargo crate"; 5]);
        provider.insert("comments_b", vec!["poison pill pill pill pill pill"; 5]);
        provider.insert("comments_c", vec!["too short"; 5]);
        provider.insert("comments_d", vec!["tea leaf brew tea leaf brew"; 5]);
        provider
    }

    #[test]
    fn one_failing_corpus_does_not_stop_the_rest() {
        let config = test_config();
        let provider = provider();
        let stopwords = StopwordSet::new();
        let sink = RecordingSink::default();
        let cancel = AtomicBool::new(false);

        let reports = Orchestrator::new(&config, &provider, &picky, &stopwords, &sink, &cancel)
            .run()
            .unwrap();

        let names: Vec<&str> = reports.iter().map(|r| r.corpus.as_str()).collect();
        assert_eq!(names, vec!["comments_a", "comments_b", "comments_c", "comments_d"]);

        match &reports[0].outcome {
            CorpusOutcome::Completed(summary) => {
                assert_eq!(summary.docs_count, 5);
                assert_eq!(summary.words_count, 3);
                assert_eq!(summary.iterations, 5);
                assert_eq!(summary.total_tokens, 30);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(matches!(&reports[1].outcome, CorpusOutcome::Failed(msg) if msg.contains("comments_b")));
        assert!(matches!(reports[2].outcome, CorpusOutcome::Skipped(_)));
        assert!(matches!(reports[3].outcome, CorpusOutcome::Completed(_)));

        let mut written = sink.written.lock().unwrap().clone();
        written.sort();
        assert_eq!(written, vec!["comments_a", "comments_d"]);
    }

    #[test]
    fn cancelled_runs_start_nothing() {
        let config = test_config();
        let provider = provider();
        let stopwords = StopwordSet::new();
        let sink = RecordingSink::default();
        let cancel = AtomicBool::new(true);

        let reports = Orchestrator::new(&config, &provider, &picky, &stopwords, &sink, &cancel)
            .run()
            .unwrap();

        assert!(reports.iter().all(|r| r.outcome == CorpusOutcome::Cancelled));
        assert!(sink.written.lock().unwrap().is_empty());
    }

    /// Raises the cancel flag as soon as the first result is written.
    struct CancellingSink<'a> {
        cancel: &'a AtomicBool,
    }

    impl ResultSink for CancellingSink<'_> {
        fn write(&self, _result: &CorpusResult<'_>) -> io::Result<()> {
            self.cancel.store(true, Ordering::Relaxed);
            Ok(())
        }
    }

    #[test]
    fn cancelling_mid_run_stops_remaining_corpora() {
        let config = RunConfig {
            threads: Some(1),
            ..test_config()
        };
        let provider = provider();
        let stopwords = StopwordSet::new();
        let cancel = AtomicBool::new(false);
        let sink = CancellingSink { cancel: &cancel };

        let reports = Orchestrator::new(&config, &provider, &picky, &stopwords, &sink, &cancel)
            .run()
            .unwrap();

        assert!(matches!(reports[0].outcome, CorpusOutcome::Completed(_)));
        assert_eq!(reports[3].outcome, CorpusOutcome::Cancelled);
    }

    #[test]
    fn sink_failures_are_reported_per_corpus() {
        let config = test_config();
        let mut provider = MemoryProvider::new();
        provider.insert("comments_a", vec!["rust cargo crate rust cargo crate"; 5]);
        let stopwords = StopwordSet::new();
        let cancel = AtomicBool::new(false);

        let reports = Orchestrator::new(&config, &provider, &picky, &stopwords, &FailingSink, &cancel)
            .run()
            .unwrap();

        assert!(matches!(&reports[0].outcome, CorpusOutcome::Failed(msg) if msg.contains("read-only")));
    }

    #[test]
    fn empty_provider_yields_no_reports() {
        let config = test_config();
        let provider = MemoryProvider::new();
        let stopwords = StopwordSet::new();
        let sink = RecordingSink::default();
        let cancel = AtomicBool::new(false);

        let reports = Orchestrator::new(&config, &provider, &picky, &stopwords, &sink, &cancel)
            .run()
            .unwrap();
        assert!(reports.is_empty());
    }

    #[test]
    fn parallel_runs_match_sequential_runs() {
        let provider = provider();
        let stopwords = StopwordSet::new();
        let cancel = AtomicBool::new(false);

        let run = |threads| {
            let config = RunConfig {
                threads: Some(threads),
                ..test_config()
            };
            let sink = RecordingSink::default();
            Orchestrator::new(&config, &provider, &picky, &stopwords, &sink, &cancel)
                .run()
                .unwrap()
                .into_iter()
                .map(|r| match r.outcome {
                    CorpusOutcome::Completed(s) => Some(s.final_entropy),
                    _ => None,
                })
                .collect::<Vec<_>>()
        };

        assert_eq!(run(1), run(4));
    }
}
