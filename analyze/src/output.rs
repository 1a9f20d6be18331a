use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::DocumentCollection;
use crate::topic_modeling::{ModeledTopic, TopicModel};

/// What one corpus run produced, persisted next to the matrices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub corpus: String,
    pub num_topics: usize,
    pub iterations: usize,
    pub alpha: f64,
    pub beta: f64,
    pub final_entropy: f64,
    pub docs_count: usize,
    pub words_count: usize,
    pub total_tokens: usize,
    pub guarded_resamples: usize,
    pub elapsed_secs: f64,
    pub completed_at: DateTime<Utc>,
}

/// Everything a sink receives for one finished corpus.
pub struct CorpusResult<'a> {
    pub collection: &'a DocumentCollection,
    pub model: &'a TopicModel,
    pub topics: &'a [ModeledTopic],
    pub summary: &'a RunSummary,
}

/// Destination for trained results. Called from several corpora at once.
pub trait ResultSink: Sync {
    fn write(&self, result: &CorpusResult<'_>) -> io::Result<()>;
}

/// Writes each corpus into `<root>/<corpus>/`.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectorySink { root: root.into() }
    }

    pub fn corpus_dir(&self, corpus: &str) -> PathBuf {
        self.root.join(corpus)
    }
}

impl ResultSink for DirectorySink {
    fn write(&self, result: &CorpusResult<'_>) -> io::Result<()> {
        let dir = self.corpus_dir(&result.summary.corpus);
        fs::create_dir_all(&dir)?;
        log::info!("saving results to {}", dir.display());

        write_topics(&dir.join("topics_keywords.txt"), result.topics)?;
        write_matrix(&dir.join("doc_topics.csv"), &result.model.theta)?;
        write_matrix(&dir.join("topic_word_matrix.csv"), &result.model.phi)?;
        write_vocabulary(&dir.join("vocabulary.txt"), result.collection)?;

        let mut writer = BufWriter::new(File::create(dir.join("summary.json"))?);
        serde_json::to_writer_pretty(&mut writer, result.summary)?;
        writer.flush()
    }
}

fn write_topics(path: &Path, topics: &[ModeledTopic]) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for topic in topics {
        writeln!(writer, "{}", topic)?;
    }
    writer.flush()
}

fn write_matrix(path: &Path, rows: &[Vec<f64>]) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for row in rows {
        let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        writeln!(writer, "{}", line.join(","))?;
    }
    writer.flush()
}

fn write_vocabulary(path: &Path, collection: &DocumentCollection) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for (id, word) in collection.vocabulary().iter().enumerate() {
        writeln!(writer, "{}\t{}", id, word)?;
    }
    writer.flush()
}
