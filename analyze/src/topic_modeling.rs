use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::LdaError;
use crate::models::DocumentCollection;
use crate::random::{RandomSource, SeededRandom};

const ENTROPY_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct LDAConfig {
    pub num_topics: usize,
    pub iterations: usize,
    pub alpha: f64, // Document-topic concentration
    pub beta: f64,  // Topic-word concentration
    pub seed: u64,
    pub report_every: usize, // Entropy is logged on the first sweep and every N after
}

impl Default for LDAConfig {
    fn default() -> Self {
        LDAConfig {
            num_topics: 10,
            iterations: 1000,
            alpha: 0.1,
            beta: 0.01,
            seed: 42,
            report_every: 50,
        }
    }
}

impl LDAConfig {
    pub fn validate(&self) -> Result<(), LdaError> {
        if self.num_topics < 1 {
            return Err(LdaError::InvalidParameters(
                "number of topics must be at least 1".into(),
            ));
        }
        if self.iterations < 1 {
            return Err(LdaError::InvalidParameters(
                "iterations must be at least 1".into(),
            ));
        }
        if !(self.alpha >= 0.0 && self.alpha.is_finite()) {
            return Err(LdaError::InvalidParameters(format!(
                "alpha must be a non-negative number, got {}",
                self.alpha
            )));
        }
        if !(self.beta >= 0.0 && self.beta.is_finite()) {
            return Err(LdaError::InvalidParameters(format!(
                "beta must be a non-negative number, got {}",
                self.beta
            )));
        }
        Ok(())
    }
}

/// Count tables of a collapsed Gibbs sampler over one collection.
///
/// `nw` is `words_count × K` and `nd` is `docs_count × K`, both flat and
/// row-major. After every single-token resample:
/// - `nwsum[k]` equals the sum of column `k` of `nw`,
/// - row `m` of `nd` sums to `ndsum[m]`, the length of document `m`,
/// - row `w` of `nw` sums to the corpus frequency of word `w`.
#[derive(Debug, Clone)]
pub struct GibbsState {
    num_topics: usize,
    words_count: usize,
    alpha: f64,
    beta: f64,
    assignments: Vec<Vec<usize>>,
    nw: Vec<usize>,
    nd: Vec<usize>,
    nwsum: Vec<usize>,
    ndsum: Vec<usize>,
    probs: Vec<f64>,
}

impl GibbsState {
    /// Assigns every token a uniformly random topic.
    pub fn new<R: RandomSource>(
        collection: &DocumentCollection,
        config: &LDAConfig,
        rng: &mut R,
    ) -> Result<Self, LdaError> {
        config.validate()?;
        if collection.docs_count() == 0 || collection.words_count() == 0 {
            return Err(LdaError::InvalidParameters(format!(
                "corpus {} has {} documents and {} words",
                collection.name(),
                collection.docs_count(),
                collection.words_count()
            )));
        }

        let k = config.num_topics;
        let mut state = GibbsState {
            num_topics: k,
            words_count: collection.words_count(),
            alpha: config.alpha,
            beta: config.beta,
            assignments: Vec::with_capacity(collection.docs_count()),
            nw: vec![0; collection.words_count() * k],
            nd: vec![0; collection.docs_count() * k],
            nwsum: vec![0; k],
            ndsum: vec![0; collection.docs_count()],
            probs: vec![0.0; k],
        };

        for (m, doc) in collection.documents().iter().enumerate() {
            let mut topics = Vec::with_capacity(doc.len());
            for &w in doc.words() {
                let topic = rng.uniform_topic(k);
                topics.push(topic);
                state.nw[w * k + topic] += 1;
                state.nd[m * k + topic] += 1;
                state.nwsum[topic] += 1;
            }
            state.ndsum[m] = doc.len();
            state.assignments.push(topics);
        }

        Ok(state)
    }

    /// Resamples every token once, documents then positions in ascending
    /// order. Returns how many tokens kept their topic because the
    /// conditional was degenerate.
    pub fn sweep<R: RandomSource>(
        &mut self,
        collection: &DocumentCollection,
        rng: &mut R,
    ) -> usize {
        let mut guarded = 0;
        for (m, doc) in collection.documents().iter().enumerate() {
            for (n, &w) in doc.words().iter().enumerate() {
                if !self.resample(m, n, w, rng) {
                    guarded += 1;
                }
            }
        }
        guarded
    }

    /// Removes one token's topic, then draws a new one from the collapsed
    /// conditional. Returns false when the conditional was degenerate and the
    /// token kept its topic.
    fn resample<R: RandomSource>(&mut self, m: usize, n: usize, w: usize, rng: &mut R) -> bool {
        let k = self.num_topics;
        let old_topic = self.assignments[m][n];

        self.nw[w * k + old_topic] -= 1;
        self.nd[m * k + old_topic] -= 1;
        self.nwsum[old_topic] -= 1;

        let doc_norm = self.ndsum[m] as f64 + k as f64 * self.alpha;
        let word_norm = self.words_count as f64 * self.beta;
        let mut total = 0.0;
        for topic in 0..k {
            let p = (self.nw[w * k + topic] as f64 + self.beta)
                * (self.nd[m * k + topic] as f64 + self.alpha)
                / ((self.nwsum[topic] as f64 + word_norm) * doc_norm);
            self.probs[topic] = p;
            total += p;
        }

        let valid = total.is_finite() && total > 0.0 && self.probs.iter().all(|p| p.is_finite());
        let new_topic = if valid {
            for p in self.probs.iter_mut() {
                *p /= total;
            }
            rng.categorical(&self.probs)
        } else {
            log::warn!(
                "degenerate topic conditional for document {} position {} (word {}), keeping topic {}",
                m,
                n,
                w,
                old_topic
            );
            old_topic
        };

        self.assignments[m][n] = new_topic;
        self.nw[w * k + new_topic] += 1;
        self.nd[m * k + new_topic] += 1;
        self.nwsum[new_topic] += 1;

        valid
    }

    /// Entropy of the corpus-wide topic sizes.
    pub fn topic_entropy(&self) -> f64 {
        size_entropy(&self.nwsum)
    }

    /// Smoothed document-topic distribution, `docs_count × K`.
    pub fn theta(&self) -> Vec<Vec<f64>> {
        let k = self.num_topics;
        self.ndsum
            .iter()
            .enumerate()
            .map(|(m, &len)| {
                let norm = len as f64 + k as f64 * self.alpha;
                (0..k)
                    .map(|topic| (self.nd[m * k + topic] as f64 + self.alpha) / norm)
                    .collect()
            })
            .collect()
    }

    /// Smoothed topic-word distribution, `K × words_count`.
    pub fn phi(&self) -> Vec<Vec<f64>> {
        let k = self.num_topics;
        let word_norm = self.words_count as f64 * self.beta;
        (0..k)
            .map(|topic| {
                let norm = self.nwsum[topic] as f64 + word_norm;
                (0..self.words_count)
                    .map(|w| (self.nw[w * k + topic] as f64 + self.beta) / norm)
                    .collect()
            })
            .collect()
    }

    pub fn assignments(&self) -> &[Vec<usize>] {
        &self.assignments
    }

    pub fn word_topic_count(&self, word: usize, topic: usize) -> usize {
        self.nw[word * self.num_topics + topic]
    }

    pub fn doc_topic_count(&self, doc: usize, topic: usize) -> usize {
        self.nd[doc * self.num_topics + topic]
    }

    pub fn topic_counts(&self) -> &[usize] {
        &self.nwsum
    }

    /// Recomputes every count table from the assignments and compares.
    pub fn is_consistent(&self, collection: &DocumentCollection) -> bool {
        let k = self.num_topics;
        let mut nw = vec![0; self.nw.len()];
        let mut nd = vec![0; self.nd.len()];
        let mut nwsum = vec![0; k];

        for (m, doc) in collection.documents().iter().enumerate() {
            if self.ndsum[m] != doc.len() || self.assignments[m].len() != doc.len() {
                return false;
            }
            for (&w, &topic) in doc.words().iter().zip(&self.assignments[m]) {
                if topic >= k {
                    return false;
                }
                nw[w * k + topic] += 1;
                nd[m * k + topic] += 1;
                nwsum[topic] += 1;
            }
        }

        nw == self.nw && nd == self.nd && nwsum == self.nwsum
    }
}

/// `-sum q ln(q + eps)` over the normalized counts.
pub fn size_entropy(counts: &[usize]) -> f64 {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    counts
        .iter()
        .map(|&c| {
            let q = c as f64 / total as f64;
            -q * (q + ENTROPY_EPSILON).ln()
        })
        .sum()
}

#[derive(Debug, Clone)]
pub struct Diagnostics {
    pub sweeps: usize,
    pub entropy_trace: Vec<(usize, f64)>, // (sweep number, entropy)
    pub final_entropy: f64,
    pub guarded_resamples: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeledTopic {
    pub id: usize,
    pub weight: f64,                // Share of all tokens assigned to this topic
    pub words: Vec<(String, f64)>, // Word and its probability in this topic
}

impl fmt::Display for ModeledTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Topic #{} (weight: {:.3}):", self.id, self.weight)?;
        for (word, prob) in &self.words {
            writeln!(f, "  {}: {:.4}", word, prob)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct TopicModel {
    pub theta: Vec<Vec<f64>>, // Documents x Topics
    pub phi: Vec<Vec<f64>>,   // Topics x Words
    pub assignments: Vec<Vec<usize>>,
    pub topic_counts: Vec<usize>,
    pub diagnostics: Diagnostics,
}

impl TopicModel {
    pub fn num_topics(&self) -> usize {
        self.topic_counts.len()
    }

    pub fn topic_weight(&self, topic: usize) -> f64 {
        let total: usize = self.topic_counts.iter().sum();
        if total == 0 {
            return 0.0;
        }
        self.topic_counts[topic] as f64 / total as f64
    }

    /// The `n` most probable word ids of a topic. Equal probabilities
    /// resolve to the lower word id.
    pub fn top_words(&self, topic: usize, n: usize) -> Vec<(usize, f64)> {
        let row = &self.phi[topic];
        let mut ids: Vec<usize> = (0..row.len()).collect();
        ids.sort_by(|&a, &b| row[b].total_cmp(&row[a]).then(a.cmp(&b)));
        ids.truncate(n);
        ids.into_iter().map(|w| (w, row[w])).collect()
    }

    pub fn topics(&self, collection: &DocumentCollection, n: usize) -> Vec<ModeledTopic> {
        (0..self.num_topics())
            .map(|topic| ModeledTopic {
                id: topic,
                weight: self.topic_weight(topic),
                words: self
                    .top_words(topic, n)
                    .into_iter()
                    .filter_map(|(w, prob)| collection.word(w).map(|word| (word.to_string(), prob)))
                    .collect(),
            })
            .collect()
    }

    /// Most probable topic of each document, ties to the lower topic.
    pub fn dominant_topics(&self) -> Vec<usize> {
        self.theta
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .fold((0, f64::NEG_INFINITY), |best, (topic, &p)| {
                        if p > best.1 {
                            (topic, p)
                        } else {
                            best
                        }
                    })
                    .0
            })
            .collect()
    }
}

/// Collapsed Gibbs sampler for Latent Dirichlet Allocation.
pub struct GibbsLDA {
    config: LDAConfig,
}

impl GibbsLDA {
    pub fn new(config: LDAConfig) -> Result<Self, LdaError> {
        config.validate()?;
        Ok(GibbsLDA { config })
    }

    pub fn fit(&self, collection: &DocumentCollection) -> Result<TopicModel, LdaError> {
        self.fit_with_cancel(collection, &AtomicBool::new(false))
    }

    pub fn fit_with_cancel(
        &self,
        collection: &DocumentCollection,
        cancel: &AtomicBool,
    ) -> Result<TopicModel, LdaError> {
        let mut rng = SeededRandom::new(self.config.seed);
        self.fit_with(collection, &mut rng, cancel)
    }

    /// Runs the full sweep budget. `cancel` is only looked at between sweeps.
    pub fn fit_with<R: RandomSource>(
        &self,
        collection: &DocumentCollection,
        rng: &mut R,
        cancel: &AtomicBool,
    ) -> Result<TopicModel, LdaError> {
        let config = &self.config;
        log::info!(
            "corpus {}: initializing topic assignments [topics={}]",
            collection.name(),
            config.num_topics
        );
        let mut state = GibbsState::new(collection, config, rng)?;

        log::info!(
            "corpus {}: training LDA [topics={}, iterations={}]",
            collection.name(),
            config.num_topics,
            config.iterations
        );
        let start = Instant::now();
        let mut entropy_trace = Vec::new();
        let mut guarded_resamples = 0;

        for it in 0..config.iterations {
            if cancel.load(Ordering::Relaxed) {
                log::info!("corpus {}: cancelled after {} sweeps", collection.name(), it);
                return Err(LdaError::Cancelled { completed: it });
            }

            guarded_resamples += state.sweep(collection, rng);

            let report = it == 0 || (config.report_every > 0 && (it + 1) % config.report_every == 0);
            if report {
                let entropy = state.topic_entropy();
                entropy_trace.push((it + 1, entropy));
                log::info!(
                    "corpus {}: sweep {}/{} | elapsed {:.1}s | topic entropy {:.3}",
                    collection.name(),
                    it + 1,
                    config.iterations,
                    start.elapsed().as_secs_f64(),
                    entropy
                );
            }
        }

        let elapsed = start.elapsed();
        log::info!(
            "corpus {}: training finished in {:.1}s",
            collection.name(),
            elapsed.as_secs_f64()
        );

        Ok(TopicModel {
            theta: state.theta(),
            phi: state.phi(),
            topic_counts: state.topic_counts().to_vec(),
            diagnostics: Diagnostics {
                sweeps: config.iterations,
                entropy_trace,
                final_entropy: state.topic_entropy(),
                guarded_resamples,
                elapsed,
            },
            assignments: state.assignments,
        })
    }
}
