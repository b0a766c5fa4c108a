//! # Boundary Tags for Word Segmentation
//!
//! Defines the 4-tag scheme used to label every character of a sentence
//! and the fixed adjacency table that constrains which tag may follow which.

use std::fmt;

use crate::error::{Result, SegError};

/// Word-boundary tag assigned to a single character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    /// The character is a word by itself.
    Single,
    /// First character of a multi-character word.
    Begin,
    /// Interior character of a word with three or more characters.
    Middle,
    /// Last character of a multi-character word.
    End,
}

impl Tag {
    /// Total number of distinct tags.
    pub const NUM_TAGS: usize = 4;

    /// Get all possible tags in index order.
    pub fn all_tags() -> &'static [Tag] {
        &[Tag::Single, Tag::Begin, Tag::Middle, Tag::End]
    }

    /// Get the tag index used in score vectors and matrices.
    pub fn index(&self) -> usize {
        match self {
            Tag::Single => 0,
            Tag::Begin => 1,
            Tag::Middle => 2,
            Tag::End => 3,
        }
    }

    /// Get tag from index.
    pub fn from_index(idx: usize) -> Option<Self> {
        match idx {
            0 => Some(Tag::Single),
            1 => Some(Tag::Begin),
            2 => Some(Tag::Middle),
            3 => Some(Tag::End),
            _ => None,
        }
    }

    /// Whether this tag closes a word (the next character starts a new one).
    pub fn closes_word(&self) -> bool {
        matches!(self, Tag::Single | Tag::End)
    }

    /// The two tags allowed to follow this one.
    ///
    /// After a word boundary only `Single` or `Begin` may follow; inside a
    /// word only `Middle` or `End` may follow.
    pub fn successors(&self) -> [Tag; 2] {
        if self.closes_word() {
            [Tag::Single, Tag::Begin]
        } else {
            [Tag::Middle, Tag::End]
        }
    }

    /// Tags a sentence may start with.
    pub fn initial_tags() -> [Tag; 2] {
        [Tag::Single, Tag::Begin]
    }

    /// Whether a sentence may start with this tag.
    pub fn is_valid_initial(tag: Tag) -> bool {
        Tag::initial_tags().contains(&tag)
    }

    /// Check if transitioning from `from` tag to `to` tag is valid.
    pub fn is_valid_transition(from: Tag, to: Tag) -> bool {
        from.successors().contains(&to)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Single => write!(f, "S"),
            Tag::Begin => write!(f, "B"),
            Tag::Middle => write!(f, "M"),
            Tag::End => write!(f, "E"),
        }
    }
}

/// Convert raw tag indices into tags, rejecting anything outside `0..4`.
pub fn tags_from_indices(indices: &[usize]) -> Result<Vec<Tag>> {
    indices
        .iter()
        .map(|&idx| {
            Tag::from_index(idx)
                .ok_or_else(|| SegError::InvalidPath(format!("tag index {idx} out of range")))
        })
        .collect()
}

/// Check that a path starts with a legal initial tag and only uses legal transitions.
pub fn validate_path(path: &[Tag]) -> Result<()> {
    let Some(first) = path.first() else {
        return Err(SegError::InvalidPath("path is empty".into()));
    };
    if !Tag::is_valid_initial(*first) {
        return Err(SegError::InvalidPath(format!(
            "path cannot start with {first}"
        )));
    }
    for (pos, pair) in path.windows(2).enumerate() {
        if !Tag::is_valid_transition(pair[0], pair[1]) {
            return Err(SegError::InvalidPath(format!(
                "illegal transition {} -> {} at position {}",
                pair[0],
                pair[1],
                pos + 1
            )));
        }
    }
    Ok(())
}

/// Tag path for a sequence of words given their lengths in characters.
///
/// Zero-length words are skipped.
pub fn tags_for_word_lengths(lengths: impl IntoIterator<Item = usize>) -> Vec<Tag> {
    let mut tags = Vec::new();
    for len in lengths {
        match len {
            0 => {}
            1 => tags.push(Tag::Single),
            n => {
                tags.push(Tag::Begin);
                tags.extend(std::iter::repeat_n(Tag::Middle, n - 2));
                tags.push(Tag::End);
            }
        }
    }
    tags
}

/// Character spans `[start, end)` of the words encoded by a tag path.
///
/// A word is closed by `Single` or `End`; an unterminated word at the end of
/// the path is closed at the last character.
pub fn word_spans(path: &[Tag]) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = 0;
    for (i, tag) in path.iter().enumerate() {
        if tag.closes_word() {
            spans.push((start, i + 1));
            start = i + 1;
        }
    }
    if start < path.len() {
        spans.push((start, path.len()));
    }
    spans
}
