//! Character vocabulary used at the text edge.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SegError};
use crate::window::PADDING_ID;

/// Reserved ID for characters outside the vocabulary.
pub const UNKNOWN_ID: usize = 1;

/// Number of reserved IDs before the first character.
pub const RESERVED_IDS: usize = 2;

/// Mapping between characters and vocabulary IDs.
///
/// ID 0 is padding, ID 1 is unknown, characters start at 2 in order of
/// decreasing frequency.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Vocabulary {
    chars: Vec<char>,
    char_to_id: HashMap<char, usize>,
}

#[derive(Serialize, Deserialize)]
struct VocabularyFile {
    chars: Vec<char>,
}

impl Vocabulary {
    /// Build from characters in ID order.
    pub fn from_chars(chars: Vec<char>) -> Result<Self> {
        let mut char_to_id = HashMap::with_capacity(chars.len());
        for (i, &c) in chars.iter().enumerate() {
            if char_to_id.insert(c, i + RESERVED_IDS).is_some() {
                return Err(SegError::Config(format!(
                    "character {c:?} appears twice in the vocabulary"
                )));
            }
        }
        Ok(Self { chars, char_to_id })
    }

    /// Keep the `vocab_size - 2` most frequent non-whitespace characters.
    ///
    /// Ties are broken by first appearance.
    pub fn build<'a>(lines: impl IntoIterator<Item = &'a str>, vocab_size: usize) -> Self {
        let mut counts: HashMap<char, (usize, usize)> = HashMap::new();
        for c in lines
            .into_iter()
            .flat_map(str::chars)
            .filter(|c| !c.is_whitespace())
        {
            let seen = counts.len();
            counts.entry(c).or_insert((0, seen)).0 += 1;
        }

        let mut ranked: Vec<(char, usize, usize)> = counts
            .into_iter()
            .map(|(c, (count, first))| (c, count, first))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
        ranked.truncate(vocab_size.saturating_sub(RESERVED_IDS));

        let chars: Vec<char> = ranked.into_iter().map(|(c, _, _)| c).collect();
        let char_to_id = chars
            .iter()
            .enumerate()
            .map(|(i, &c)| (c, i + RESERVED_IDS))
            .collect();
        Self { chars, char_to_id }
    }

    /// Number of known characters, excluding the reserved IDs.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Number of IDs in use, reserved ones included. An embedding table
    /// needs at least this many rows.
    pub fn id_count(&self) -> usize {
        self.chars.len() + RESERVED_IDS
    }

    pub fn id(&self, c: char) -> usize {
        self.char_to_id.get(&c).copied().unwrap_or(UNKNOWN_ID)
    }

    pub fn char_of(&self, id: usize) -> Option<char> {
        if id == PADDING_ID || id == UNKNOWN_ID {
            return None;
        }
        self.chars.get(id - RESERVED_IDS).copied()
    }

    pub fn encode(&self, text: &str) -> Vec<usize> {
        text.chars().map(|c| self.id(c)).collect()
    }

    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file: VocabularyFile = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        Self::from_chars(file.chars)
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = VocabularyFile {
            chars: self.chars.clone(),
        };
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, &file)?;
        writer.flush()?;
        Ok(())
    }
}
