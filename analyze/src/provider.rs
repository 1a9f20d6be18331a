use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;

/// Source of raw comment rows, one named corpus at a time.
pub trait CorpusProvider: Sync {
    fn corpus_names(&self) -> io::Result<Vec<String>>;

    /// Raw rows in storage order. Rows may be empty.
    fn rows(&self, corpus: &str) -> io::Result<Vec<String>>;
}

/// Reads `<prefix>*.txt` files from a directory, one comment per line.
/// The corpus name is the file stem.
#[derive(Debug, Clone)]
pub struct DirectoryProvider {
    dir: PathBuf,
    prefix: String,
}

impl DirectoryProvider {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        DirectoryProvider {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }
}

impl CorpusProvider for DirectoryProvider {
    fn corpus_names(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().map_or(true, |ext| ext != "txt") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if stem.starts_with(&self.prefix) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn rows(&self, corpus: &str) -> io::Result<Vec<String>> {
        let contents = fs::read_to_string(self.dir.join(format!("{}.txt", corpus)))?;
        Ok(contents.lines().map(String::from).collect())
    }
}

/// Corpora held in memory, listed in name order.
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    corpora: BTreeMap<String, Vec<String>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<S: Into<String>>(&mut self, corpus: &str, rows: impl IntoIterator<Item = S>) {
        self.corpora
            .insert(corpus.to_string(), rows.into_iter().map(Into::into).collect());
    }
}

impl CorpusProvider for MemoryProvider {
    fn corpus_names(&self) -> io::Result<Vec<String>> {
        Ok(self.corpora.keys().cloned().collect())
    }

    fn rows(&self, corpus: &str) -> io::Result<Vec<String>> {
        self.corpora.get(corpus).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("unknown corpus {}", corpus))
        })
    }
}
