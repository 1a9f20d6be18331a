use std::collections::HashMap;

/// One filtered comment, stored as vocabulary ids in token order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    words: Vec<usize>,
    length: usize,
}

impl Document {
    pub fn new(words: Vec<usize>) -> Self {
        let length = words.len();
        Document { words, length }
    }

    pub fn words(&self) -> &[usize] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

/// The indexed documents of one corpus plus its dense vocabulary.
///
/// Document index `m` and word id `w` are plain array indices used by the
/// trainer, so the order of `documents` and `id_to_word` is fixed once built.
#[derive(Debug, Clone)]
pub struct DocumentCollection {
    name: String,
    documents: Vec<Document>,
    word_to_id: HashMap<String, usize>,
    id_to_word: Vec<String>,
}

impl DocumentCollection {
    pub(crate) fn new(
        name: String,
        documents: Vec<Document>,
        word_to_id: HashMap<String, usize>,
        id_to_word: Vec<String>,
    ) -> Self {
        debug_assert_eq!(word_to_id.len(), id_to_word.len());
        DocumentCollection {
            name,
            documents,
            word_to_id,
            id_to_word,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn docs_count(&self) -> usize {
        self.documents.len()
    }

    pub fn words_count(&self) -> usize {
        self.id_to_word.len()
    }

    /// Total token occurrences over all documents.
    pub fn total_tokens(&self) -> usize {
        self.documents.iter().map(Document::len).sum()
    }

    pub fn word(&self, id: usize) -> Option<&str> {
        self.id_to_word.get(id).map(String::as_str)
    }

    pub fn id(&self, word: &str) -> Option<usize> {
        self.word_to_id.get(word).copied()
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.id_to_word
    }

    /// How often each word id occurs across the collection.
    pub fn word_frequencies(&self) -> Vec<usize> {
        let mut freq = vec![0; self.words_count()];
        for doc in &self.documents {
            for &w in doc.words() {
                freq[w] += 1;
            }
        }
        freq
    }
}
