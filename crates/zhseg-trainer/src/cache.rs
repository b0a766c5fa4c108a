//! Windowed training cache.
//!
//! Two plain-text files with one line per sentence: the word file holds
//! every window of the sentence flattened row-major, the label file holds
//! the gold tags. Both are space-separated integers.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::info;
use zhseg_core::error::{Result, SegError};
use zhseg_core::tags::tags_from_indices;
use zhseg_core::{Tag, WindowMatrix};

/// Sentences as window matrices paired with their gold tag paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowedCorpus {
    window_len: usize,
    sentences: Vec<WindowMatrix>,
    labels: Vec<Vec<Tag>>,
}

impl WindowedCorpus {
    pub fn new(window_len: usize) -> Self {
        Self {
            window_len,
            sentences: Vec::new(),
            labels: Vec::new(),
        }
    }

    /// Add one sentence; the window width and label count must match.
    pub fn push(&mut self, windows: WindowMatrix, labels: Vec<Tag>) -> Result<()> {
        if windows.window_len() != self.window_len {
            return Err(SegError::Config(format!(
                "window length {} does not match corpus window length {}",
                windows.window_len(),
                self.window_len
            )));
        }
        if windows.len() != labels.len() {
            return Err(SegError::InvalidPath(format!(
                "{} labels for {} windows",
                labels.len(),
                windows.len()
            )));
        }
        self.sentences.push(windows);
        self.labels.push(labels);
        Ok(())
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&WindowMatrix, &[Tag])> {
        self.sentences
            .iter()
            .zip(self.labels.iter().map(Vec::as_slice))
    }

    /// Check that every window ID has an embedding row.
    ///
    /// Sentence `i` is reported as line `i + 1` of `word_name`, matching
    /// the layout produced by [`read_from`](Self::read_from).
    pub fn check_vocab(&self, vocab_size: usize, word_name: &Path) -> Result<()> {
        for (idx, windows) in self.sentences.iter().enumerate() {
            if let Some(&id) = windows.as_flat().iter().find(|&&id| id >= vocab_size) {
                return Err(SegError::CacheFormat {
                    file: word_name.to_path_buf(),
                    line: idx + 1,
                    reason: format!("id {id} is out of range for vocab_size {vocab_size}"),
                });
            }
        }
        Ok(())
    }

    /// Write both files to any pair of writers.
    pub fn write_to<W: Write, L: Write>(&self, mut words: W, mut labels: L) -> Result<()> {
        for (windows, tags) in self.iter() {
            writeln!(words, "{}", join(windows.as_flat().iter()))?;
            writeln!(labels, "{}", join(tags.iter().map(Tag::index)))?;
        }
        words.flush()?;
        labels.flush()?;
        Ok(())
    }

    pub fn write_files<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        word_path: P,
        label_path: Q,
    ) -> Result<()> {
        let words = BufWriter::new(File::create(word_path.as_ref())?);
        let labels = BufWriter::new(File::create(label_path.as_ref())?);
        self.write_to(words, labels)?;
        info!(
            sentences = self.len(),
            words = %word_path.as_ref().display(),
            labels = %label_path.as_ref().display(),
            "wrote windowed cache"
        );
        Ok(())
    }

    /// Parse both files from readers.
    ///
    /// `word_name` and `label_name` only label error messages.
    pub fn read_from<W: BufRead, L: BufRead>(
        words: W,
        labels: L,
        window_len: usize,
        word_name: &Path,
        label_name: &Path,
    ) -> Result<Self> {
        let word_lines = words.lines().collect::<std::io::Result<Vec<_>>>()?;
        let label_lines = labels.lines().collect::<std::io::Result<Vec<_>>>()?;

        if word_lines.len() != label_lines.len() {
            return Err(SegError::CacheFormat {
                file: label_name.to_path_buf(),
                line: 0,
                reason: format!(
                    "{} label lines for {} word lines",
                    label_lines.len(),
                    word_lines.len()
                ),
            });
        }

        let mut corpus = Self::new(window_len);
        for (idx, (word_line, label_line)) in word_lines.iter().zip(&label_lines).enumerate() {
            let line = idx + 1;
            let word_err = |reason: String| SegError::CacheFormat {
                file: word_name.to_path_buf(),
                line,
                reason,
            };
            let label_err = |reason: String| SegError::CacheFormat {
                file: label_name.to_path_buf(),
                line,
                reason,
            };

            let ids = parse_integers(word_line).map_err(&word_err)?;
            if ids.len() % window_len != 0 {
                return Err(word_err(format!(
                    "{} ids is not a multiple of the window length {window_len}",
                    ids.len()
                )));
            }
            let windows = WindowMatrix::from_flat(ids, window_len)
                .map_err(|e| word_err(e.to_string()))?;

            let indices = parse_integers(label_line).map_err(&label_err)?;
            let tags = tags_from_indices(&indices).map_err(|e| label_err(e.to_string()))?;
            if tags.len() != windows.len() {
                return Err(label_err(format!(
                    "{} labels for {} windows",
                    tags.len(),
                    windows.len()
                )));
            }

            corpus.sentences.push(windows);
            corpus.labels.push(tags);
        }

        Ok(corpus)
    }

    pub fn read_files<P: AsRef<Path>, Q: AsRef<Path>>(
        word_path: P,
        label_path: Q,
        window_len: usize,
    ) -> Result<Self> {
        let word_path = word_path.as_ref();
        let label_path = label_path.as_ref();
        let corpus = Self::read_from(
            BufReader::new(File::open(word_path)?),
            BufReader::new(File::open(label_path)?),
            window_len,
            word_path,
            label_path,
        )?;
        info!(sentences = corpus.len(), words = %word_path.display(), "read windowed cache");
        Ok(corpus)
    }
}

fn join<T: ToString>(values: impl Iterator<Item = T>) -> String {
    values.map(|v| v.to_string()).collect::<Vec<_>>().join(" ")
}

fn parse_integers(line: &str) -> std::result::Result<Vec<usize>, String> {
    if line.trim().is_empty() {
        return Err("empty line".into());
    }
    line.split(' ')
        .map(|token| {
            token
                .parse::<usize>()
                .map_err(|_| format!("token {token:?} is not a non-negative integer"))
        })
        .collect()
}
