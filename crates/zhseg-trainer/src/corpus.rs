//! Encoding of a pre-segmented corpus into training sentences.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{info, warn};
use zhseg_core::error::Result;
use zhseg_core::tags::tags_for_word_lengths;
use zhseg_core::window::window_len;
use zhseg_core::{Tag, Vocabulary, WindowMatrix};

use crate::cache::WindowedCorpus;

/// One sentence as vocabulary IDs with its gold tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedSentence {
    pub ids: Vec<usize>,
    pub tags: Vec<Tag>,
}

/// A corpus encoded against its own vocabulary.
#[derive(Debug, Clone)]
pub struct Corpus {
    pub vocab: Vocabulary,
    pub sentences: Vec<EncodedSentence>,
}

/// Characters and gold tags of one whitespace-segmented line.
pub fn parse_segmented_line(line: &str) -> (String, Vec<Tag>) {
    let words: Vec<&str> = line.split_whitespace().collect();
    let text = words.concat();
    let tags = tags_for_word_lengths(words.iter().map(|w| w.chars().count()));
    (text, tags)
}

impl Corpus {
    /// Build the vocabulary from `lines` and encode every non-empty line.
    pub fn from_lines<S: AsRef<str>>(lines: &[S], vocab_size: usize) -> Self {
        let vocab = Vocabulary::build(lines.iter().map(S::as_ref), vocab_size);

        let sentences = lines
            .iter()
            .map(|line| parse_segmented_line(line.as_ref()))
            .filter(|(text, _)| !text.is_empty())
            .map(|(text, tags)| EncodedSentence {
                ids: vocab.encode(&text),
                tags,
            })
            .collect();

        Self { vocab, sentences }
    }

    pub fn from_reader<R: BufRead>(reader: R, vocab_size: usize) -> Result<Self> {
        let lines = reader.lines().collect::<std::io::Result<Vec<_>>>()?;
        Ok(Self::from_lines(&lines, vocab_size))
    }

    pub fn from_path<P: AsRef<Path>>(path: P, vocab_size: usize) -> Result<Self> {
        let corpus = Self::from_reader(BufReader::new(File::open(path.as_ref())?), vocab_size)?;
        info!(
            path = %path.as_ref().display(),
            sentences = corpus.sentences.len(),
            vocab = corpus.vocab.len(),
            "loaded segmented corpus"
        );
        Ok(corpus)
    }

    /// Window every sentence longer than the window.
    ///
    /// Sentences of at most `2 * skip_window + 1` characters are dropped.
    pub fn windowed(&self, skip_window: usize) -> Result<WindowedCorpus> {
        let min_len = window_len(skip_window);
        let mut windowed = WindowedCorpus::new(min_len);
        let mut dropped = 0usize;

        for sentence in &self.sentences {
            if sentence.ids.len() <= min_len {
                dropped += 1;
                continue;
            }
            windowed.push(
                WindowMatrix::build(&sentence.ids, skip_window),
                sentence.tags.clone(),
            )?;
        }

        if dropped > 0 {
            warn!(dropped, min_len, "dropped short sentences");
        }
        Ok(windowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zhseg_core::vocab::UNKNOWN_ID;

    #[test]
    fn test_parse_segmented_line() {
        let (text, tags) = parse_segmented_line("我 喜欢 北京天安门");
        assert_eq!(text, "我喜欢北京天安门");
        assert_eq!(
            tags,
            vec![
                Tag::Single,
                Tag::Begin,
                Tag::End,
                Tag::Begin,
                Tag::Middle,
                Tag::Middle,
                Tag::Middle,
                Tag::End
            ]
        );
    }

    #[test]
    fn test_from_lines_encodes_and_skips_blank() {
        let corpus = Corpus::from_lines(&["我 爱 北京", "", "北京 欢迎 你"], 4);
        assert_eq!(corpus.sentences.len(), 2);
        // Only the two most frequent characters, 北 and 京, fit.
        assert_eq!(corpus.vocab.len(), 2);
        assert_eq!(corpus.vocab.id_count(), 4);
        let second = &corpus.sentences[1];
        assert_eq!(second.ids.len(), 5);
        assert_eq!(second.ids[4], UNKNOWN_ID);
        assert_eq!(second.tags.len(), 5);
    }

    #[test]
    fn test_windowed_drops_short_sentences() {
        let corpus = Corpus::from_lines(&["我 爱", "我 爱 北京", "今天 天气 很 好"], 50);
        let windowed = corpus.windowed(1).unwrap();
        assert_eq!(windowed.len(), 2);
        assert_eq!(windowed.window_len(), 3);
        for (windows, tags) in windowed.iter() {
            assert!(windows.len() > 3);
            assert_eq!(windows.len(), tags.len());
        }
    }
}
