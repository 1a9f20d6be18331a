use std::collections::{HashMap, HashSet};

use counter::Counter;

use crate::error::CorpusError;
use crate::models::{Document, DocumentCollection};
use crate::tokenizer::{StopwordSet, Tokenizer};

/// Terms seen fewer times than this across the corpus are dropped.
pub const MIN_WORD_FREQ: usize = 3;
/// Documents need strictly more filtered tokens than this to be kept.
pub const MIN_DOC_LEN: usize = 5;
/// Tokens shorter than this many characters are dropped.
pub const MIN_TOKEN_CHARS: usize = 2;

/// Turns the raw rows of one corpus into an indexed [`DocumentCollection`].
///
/// Building is two-pass: term frequencies are counted over the whole corpus
/// first, so the retained vocabulary never depends on which rows came first.
pub struct CorpusBuilder<'a> {
    tokenizer: &'a dyn Tokenizer,
    stopwords: &'a StopwordSet,
    min_word_freq: usize,
    min_doc_len: usize,
    min_token_chars: usize,
}

impl<'a> CorpusBuilder<'a> {
    pub fn new(tokenizer: &'a dyn Tokenizer, stopwords: &'a StopwordSet) -> Self {
        CorpusBuilder {
            tokenizer,
            stopwords,
            min_word_freq: MIN_WORD_FREQ,
            min_doc_len: MIN_DOC_LEN,
            min_token_chars: MIN_TOKEN_CHARS,
        }
    }

    pub fn min_word_freq(mut self, freq: usize) -> Self {
        self.min_word_freq = freq;
        self
    }

    pub fn min_doc_len(mut self, len: usize) -> Self {
        self.min_doc_len = len;
        self
    }

    pub fn min_token_chars(mut self, chars: usize) -> Self {
        self.min_token_chars = chars;
        self
    }

    pub fn build<S: AsRef<str>>(
        &self,
        corpus: &str,
        rows: &[S],
    ) -> Result<DocumentCollection, CorpusError> {
        let rows: Vec<&str> = rows
            .iter()
            .map(|row| row.as_ref())
            .filter(|row| !row.trim().is_empty())
            .collect();

        // Pass 1: global term frequency.
        let mut word_freq: Counter<String> = Counter::new();
        for row in &rows {
            for token in self.filtered_tokens(corpus, row)? {
                word_freq[&token] += 1;
            }
        }

        let valid_words: HashSet<String> = word_freq
            .into_iter()
            .filter(|(_, freq)| *freq >= self.min_word_freq)
            .map(|(word, _)| word)
            .collect();

        // Pass 2: ids in first-seen order, short documents dropped.
        let mut word_to_id: HashMap<String, usize> = HashMap::new();
        let mut id_to_word: Vec<String> = Vec::new();
        let mut documents = Vec::new();

        for row in &rows {
            let mut words = Vec::new();
            for token in self.filtered_tokens(corpus, row)? {
                if !valid_words.contains(&token) {
                    continue;
                }
                let id = match word_to_id.get(&token) {
                    Some(&id) => id,
                    None => {
                        let id = id_to_word.len();
                        id_to_word.push(token.clone());
                        word_to_id.insert(token, id);
                        id
                    }
                };
                words.push(id);
            }

            if words.len() > self.min_doc_len {
                documents.push(Document::new(words));
            }
        }

        if documents.is_empty() {
            return Err(CorpusError::NoUsableData {
                corpus: corpus.to_string(),
            });
        }

        let collection =
            DocumentCollection::new(corpus.to_string(), documents, word_to_id, id_to_word);
        log::info!(
            "corpus {}: {} words after filtering, {} documents (average length {})",
            corpus,
            collection.words_count(),
            collection.docs_count(),
            collection.total_tokens() / collection.docs_count()
        );
        Ok(collection)
    }

    fn filtered_tokens(&self, corpus: &str, row: &str) -> Result<Vec<String>, CorpusError> {
        let tokens = self
            .tokenizer
            .tokenize(row)
            .map_err(|source| CorpusError::Tokenizer {
                corpus: corpus.to_string(),
                source,
            })?;

        Ok(tokens
            .into_iter()
            .filter(|token| {
                token.chars().count() >= self.min_token_chars && !self.stopwords.contains(token)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TokenizerError;
    use crate::tokenizer::RegexTokenizer;

    fn whitespace(text: &str) -> Result<Vec<String>, TokenizerError> {
        Ok(text.split_whitespace().map(String::from).collect())
    }

    #[test]
    fn keeps_only_frequent_words() {
        let stopwords = StopwordSet::new();
        let rows = [
            "apple banana cherry apple banana cherry rare",
            "apple banana cherry once twice twice",
        ];
        let collection = CorpusBuilder::new(&whitespace, &stopwords)
            .build("fruit", &rows)
            .unwrap();

        // "twice" occurs only twice, "rare" and "once" once.
        assert_eq!(collection.vocabulary(), &["apple", "banana", "cherry"]);
        assert_eq!(collection.id("twice"), None);
        assert_eq!(collection.docs_count(), 1);
        assert_eq!(collection.documents()[0].words(), &[0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn vocabulary_filter_counts_the_whole_corpus() {
        let stopwords = StopwordSet::new();
        let rows = [
            "aa bb cc dd ee ff",
            "aa bb cc dd ee ff",
            "aa bb cc dd ee ff gg",
            "gg gg hh",
        ];
        let collection = CorpusBuilder::new(&whitespace, &stopwords)
            .build("c", &rows)
            .unwrap();

        let freq = collection.word_frequencies();
        for word in collection.vocabulary() {
            let raw: usize = rows
                .iter()
                .map(|r| r.split_whitespace().filter(|t| t == word).count())
                .sum();
            assert!(raw >= MIN_WORD_FREQ);
        }
        // Occurrences in the dropped "gg gg hh" row still count towards "gg".
        assert!(collection.id("gg").is_some());
        assert_eq!(collection.id("hh"), None);
        assert_eq!(freq.len(), collection.words_count());
    }

    #[test]
    fn drops_stopwords_and_single_characters() {
        let stopwords: StopwordSet = ["the"].into_iter().collect();
        let rows = vec!["the aa bb cc x dd ee ff the"; 3];
        let collection = CorpusBuilder::new(&whitespace, &stopwords)
            .build("c", &rows)
            .unwrap();

        assert_eq!(collection.id("the"), None);
        assert_eq!(collection.id("x"), None);
        assert_eq!(collection.words_count(), 6);
        assert!(collection.documents().iter().all(|d| d.len() == 6));
    }

    #[test]
    fn document_length_boundary() {
        let stopwords = StopwordSet::new();
        let six = vec!["aa bb cc dd ee ff"; 4];
        let collection = CorpusBuilder::new(&whitespace, &stopwords)
            .build("six", &six)
            .unwrap();
        assert_eq!(collection.docs_count(), 4);

        let five = vec!["aa bb cc dd ee"; 4];
        let err = CorpusBuilder::new(&whitespace, &stopwords)
            .build("five", &five)
            .unwrap_err();
        assert!(err.is_no_usable_data());
    }

    #[test]
    fn retained_documents_exceed_minimum_length() {
        let stopwords = StopwordSet::new();
        let rows = [
            "aa bb cc dd ee ff gg",
            "aa bb cc",
            "aa bb cc dd ee ff gg",
            "aa bb cc dd ee ff gg",
            "dd ee ff gg aa",
        ];
        let collection = CorpusBuilder::new(&whitespace, &stopwords)
            .build("c", &rows)
            .unwrap();
        assert_eq!(collection.docs_count(), 3);
        assert!(collection.documents().iter().all(|d| d.len() > MIN_DOC_LEN));
    }

    #[test]
    fn blank_rows_are_skipped() {
        let stopwords = StopwordSet::new();
        let rows = ["", "   ", "aa bb cc dd ee ff", "aa bb cc dd ee ff", "aa bb cc dd ee ff"];
        let collection = CorpusBuilder::new(&whitespace, &stopwords)
            .build("c", &rows)
            .unwrap();
        assert_eq!(collection.docs_count(), 3);
    }

    #[test]
    fn empty_input_has_no_usable_data() {
        let stopwords = StopwordSet::new();
        let rows: [&str; 0] = [];
        let err = CorpusBuilder::new(&whitespace, &stopwords)
            .build("empty", &rows)
            .unwrap_err();
        assert!(matches!(err, CorpusError::NoUsableData { ref corpus } if corpus == "empty"));
    }

    #[test]
    fn tokenizer_failure_names_the_corpus() {
        let stopwords = StopwordSet::new();
        let broken = |_: &str| -> Result<Vec<String>, TokenizerError> {
            Err(TokenizerError("dictionary not loaded".into()))
        };
        let err = CorpusBuilder::new(&broken, &stopwords)
            .build("comments_7", &["some text"])
            .unwrap_err();
        assert!(matches!(err, CorpusError::Tokenizer { ref corpus, .. } if corpus == "comments_7"));
        assert!(err.to_string().contains("comments_7"));
    }

    #[test]
    fn thresholds_are_adjustable() {
        let stopwords = StopwordSet::new();
        let rows = ["aa bb", "aa cc"];
        let collection = CorpusBuilder::new(&whitespace, &stopwords)
            .min_word_freq(1)
            .min_doc_len(1)
            .build("c", &rows)
            .unwrap();
        assert_eq!(collection.vocabulary(), &["aa", "bb", "cc"]);
        assert_eq!(collection.docs_count(), 2);
    }

    #[test]
    fn build_is_deterministic() {
        let stopwords = StopwordSet::new();
        let tokenizer = RegexTokenizer::new();
        let rows = vec!["Rust makes topic models fast and safe, topic models rock"; 4];
        let a = CorpusBuilder::new(&tokenizer, &stopwords).build("c", &rows).unwrap();
        let b = CorpusBuilder::new(&tokenizer, &stopwords).build("c", &rows).unwrap();
        assert_eq!(a.vocabulary(), b.vocabulary());
        assert_eq!(a.documents(), b.documents());
    }
}
