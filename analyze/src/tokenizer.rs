use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

use jieba_rs::Jieba;
use regex::Regex;

use crate::error::TokenizerError;

/// Maps raw comment text to a sequence of tokens.
///
/// Implementations must be deterministic: the corpus builder tokenizes every
/// row twice and expects identical output both times.
pub trait Tokenizer: Sync {
    fn tokenize(&self, text: &str) -> Result<Vec<String>, TokenizerError>;
}

impl<F> Tokenizer for F
where
    F: Fn(&str) -> Result<Vec<String>, TokenizerError> + Sync,
{
    fn tokenize(&self, text: &str) -> Result<Vec<String>, TokenizerError> {
        self(text)
    }
}

/// Default tokenizer for social-media comments.
///
/// Strips links, `[emoticon]` codes, `#hashtag#` topics and `@mentions`, then
/// emits every maximal run of letters and digits. Text that was already
/// segmented upstream (words separated by spaces) comes back as its words.
#[derive(Debug, Clone)]
pub struct RegexTokenizer {
    noise: Vec<Regex>,
    word_re: Regex,
    lowercase: bool,
}

impl RegexTokenizer {
    pub fn new() -> Self {
        let noise = [
            r"https?://\S+|www\.\S+",
            r"\[[^\]]*\]",
            r"#[^#]*#",
            r"@\S+",
        ]
        .iter()
        .map(|pattern| Regex::new(pattern).expect("static noise pattern"))
        .collect();

        RegexTokenizer {
            noise,
            word_re: Regex::new(r"[\p{L}\p{N}]+").expect("static word pattern"),
            lowercase: true,
        }
    }

    pub fn lowercase(mut self, enable: bool) -> Self {
        self.lowercase = enable;
        self
    }

    /// Removes the comment noise the tokenizer never emits.
    pub fn clean(&self, text: &str) -> String {
        let mut cleaned = text.to_string();
        for pattern in &self.noise {
            cleaned = pattern.replace_all(&cleaned, " ").into_owned();
        }
        cleaned
    }
}

impl Default for RegexTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer for RegexTokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<String>, TokenizerError> {
        let cleaned = self.clean(text);
        let cleaned = if self.lowercase {
            cleaned.to_lowercase()
        } else {
            cleaned
        };

        Ok(self
            .word_re
            .find_iter(&cleaned)
            .map(|m| m.as_str().to_string())
            .collect())
    }
}

/// Dictionary-based Chinese word segmentation for raw comments.
///
/// Cleans the same noise as [`RegexTokenizer`], then cuts the remaining text
/// with jieba (HMM on for unknown words). Whitespace and punctuation pieces
/// are dropped, so mixed Chinese and Latin text comes back as words.
pub struct JiebaTokenizer {
    jieba: Jieba,
    cleaner: RegexTokenizer,
}

impl JiebaTokenizer {
    /// Loads jieba's bundled dictionary.
    pub fn new() -> Self {
        JiebaTokenizer {
            jieba: Jieba::new(),
            cleaner: RegexTokenizer::new(),
        }
    }

    pub fn lowercase(mut self, enable: bool) -> Self {
        self.cleaner.lowercase = enable;
        self
    }
}

impl Default for JiebaTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer for JiebaTokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<String>, TokenizerError> {
        let cleaned = self.cleaner.clean(text);
        let cleaned = if self.cleaner.lowercase {
            cleaned.to_lowercase()
        } else {
            cleaned
        };

        Ok(self
            .jieba
            .cut(&cleaned, true)
            .into_iter()
            .filter(|word| word.chars().any(char::is_alphanumeric))
            .map(str::to_string)
            .collect())
    }
}

/// Words excluded from every corpus.
#[derive(Debug, Clone, Default)]
pub struct StopwordSet {
    words: HashSet<String>,
}

impl StopwordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads one stopword per line. A missing file yields an empty set.
    pub fn load(path: &Path) -> io::Result<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let set: StopwordSet = contents
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .collect();
                log::info!("loaded {} stopwords from {}", set.len(), path.display());
                Ok(set)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::warn!(
                    "stopword file {} not found, continuing without stopwords",
                    path.display()
                );
                Ok(StopwordSet::new())
            }
            Err(e) => Err(e),
        }
    }

    pub fn contains(&self, token: &str) -> bool {
        self.words.contains(token)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for StopwordSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        StopwordSet {
            words: iter.into_iter().map(Into::into).collect(),
        }
    }
}
