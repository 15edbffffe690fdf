use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::fmt::Debug;
use std::{fmt, fs};
use unicode_normalization::UnicodeNormalization;

use crate::types::{GlyphId, WordId};
use crate::MAX_VARIABLE_LENGTH;

/// The score given to entries that don't specify one.
pub const DEFAULT_SCORE: i32 = 50;

/// Stop collecting errors for a source once it has produced this many.
const MAX_ERRORS_PER_SOURCE: usize = 100;

/// A struct representing a word in the word list.
#[derive(Debug, Clone)]
pub struct Word {
    /// The word as it would appear in a grid -- only lowercase letters or other valid glyphs.
    pub normalized_string: String,

    /// The word as it appears in the user's word list, with arbitrary formatting and punctuation.
    pub canonical_string: String,

    /// The glyph ids making up `normalized_string`.
    pub glyphs: SmallVec<[GlyphId; MAX_VARIABLE_LENGTH]>,

    /// The word's score, usually on a roughly 0 - 100 scale where 50 means average quality.
    pub score: i32,
}

impl Word {
    /// The number of glyphs (not bytes) in the word.
    #[must_use]
    pub fn length(&self) -> usize {
        self.glyphs.len()
    }
}

/// Given a canonical word string from a dictionary file, turn it into the normalized form we'll
/// use in the actual fill engine.
#[must_use]
pub fn normalize_word(canonical: &str) -> String {
    canonical
        .to_lowercase()
        .nfc() // Normalize Unicode combining forms
        .filter(|c| !c.is_whitespace())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordListError {
    InvalidPath(String),
    InvalidWord(String),
    InvalidScore(String),
}

impl fmt::Display for WordListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let string = match self {
            WordListError::InvalidPath(path) => format!("Can’t read file: “{path}”"),
            WordListError::InvalidWord(word) => {
                format!("Word list contains invalid word: “{word}”")
            }
            WordListError::InvalidScore(score) => {
                format!("Word list contains invalid score: “{score}”")
            }
        };
        write!(f, "{string}")
    }
}

impl std::error::Error for WordListError {}

/// Configuration describing a source of wordlist entries.
pub enum WordListSourceConfig {
    Memory {
        id: String,
        words: Vec<(String, i32)>,
    },
    File {
        id: String,
        path: OsString,
    },
    FileContents {
        id: String,
        contents: &'static str,
    },
}

impl WordListSourceConfig {
    /// The unique, persistent id of this word list.
    #[must_use]
    pub fn id(&self) -> String {
        match self {
            WordListSourceConfig::Memory { id, .. }
            | WordListSourceConfig::FileContents { id, .. }
            | WordListSourceConfig::File { id, .. } => id.clone(),
        }
    }
}

/// A single word list entry, before it has been interned.
struct RawWordListEntry {
    normalized: String,
    canonical: String,
    score: i32,
}

fn parse_word_list_file_contents(
    file_contents: &str,
    errors: &mut Vec<WordListError>,
) -> Vec<RawWordListEntry> {
    file_contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map_while(|line| {
            if errors.len() > MAX_ERRORS_PER_SOURCE {
                return None;
            }

            let line_parts: Vec<_> = line.split(';').collect();

            let canonical = line_parts[0].trim().to_string();
            let normalized = normalize_word(&canonical);
            if normalized.is_empty() {
                errors.push(WordListError::InvalidWord(line_parts[0].into()));
                return Some(None);
            }

            let Ok(score) = (if line_parts.len() < 2 {
                Ok(DEFAULT_SCORE)
            } else {
                line_parts[1].trim().parse::<i32>()
            }) else {
                errors.push(WordListError::InvalidScore(line_parts[1].into()));
                return Some(None);
            };

            Some(Some(RawWordListEntry {
                normalized,
                canonical,
                score,
            }))
        })
        .flatten()
        .collect()
}

fn load_words_from_source(
    source: &WordListSourceConfig,
) -> (Vec<RawWordListEntry>, Vec<WordListError>) {
    let mut errors = vec![];

    let entries = match source {
        WordListSourceConfig::Memory { words, .. } => words
            .iter()
            .cloned()
            .filter_map(|(canonical, score)| {
                let normalized = normalize_word(&canonical);
                if normalized.is_empty() {
                    errors.push(WordListError::InvalidWord(canonical));
                    return None;
                }

                Some(RawWordListEntry {
                    normalized,
                    canonical,
                    score,
                })
            })
            .collect(),

        WordListSourceConfig::File { path, .. } => {
            if let Ok(contents) = fs::read_to_string(path) {
                parse_word_list_file_contents(&contents, &mut errors)
            } else {
                errors.push(WordListError::InvalidPath(path.to_string_lossy().into()));
                vec![]
            }
        }

        WordListSourceConfig::FileContents { contents, .. } => {
            parse_word_list_file_contents(contents, &mut errors)
        }
    };

    (entries, errors)
}

/// Load the entries from every source in order. If the same normalized word appears more than
/// once, the first occurrence wins.
fn load_words_from_sources(
    sources: &[WordListSourceConfig],
) -> (Vec<RawWordListEntry>, HashMap<String, Vec<WordListError>>) {
    let mut seen_words: HashSet<String> = HashSet::new();
    let mut result = vec![];
    let mut errors_by_source = HashMap::new();

    for source in sources {
        let (words, errors) = load_words_from_source(source);
        for word in words {
            if seen_words.insert(word.normalized.clone()) {
                result.push(word);
            }
        }
        errors_by_source.insert(source.id(), errors);
    }

    (result, errors_by_source)
}

/// A struct representing the dictionary a crossword is filled from. Words and letters are
/// interned: every distinct normalized word has exactly one `WordId`, so two words are equal iff
/// their ids are, and every distinct character has exactly one `GlyphId`.
pub struct WordList {
    /// A list of all characters that occur in any (normalized) word. `GlyphId`s used everywhere
    /// else are indices into this list.
    pub glyphs: Vec<char>,

    /// The inverse of `glyphs`: a map from a character to the `GlyphId` representing it.
    pub glyph_id_by_char: HashMap<char, GlyphId>,

    /// All loaded words, in source order. `WordId`s are indices into this list.
    pub words: Vec<Word>,

    /// A map from a normalized string to the id of the Word representing it.
    pub word_id_by_string: HashMap<String, WordId>,

    /// The maximum word length provided when configuring the WordList, if any.
    pub max_length: Option<usize>,

    /// The minimum word score provided when configuring the WordList, if any.
    pub min_score: Option<i32>,

    /// Errors emitted by each source, keyed by source id.
    source_errors: HashMap<String, Vec<WordListError>>,
}

impl WordList {
    /// Construct a new `WordList` using the given sources, omitting any entries that are longer
    /// than `max_length` or scored lower than `min_score`.
    #[must_use]
    pub fn new(
        source_configs: Vec<WordListSourceConfig>,
        max_length: Option<usize>,
        min_score: Option<i32>,
    ) -> WordList {
        let mut instance = WordList {
            glyphs: vec![],
            glyph_id_by_char: HashMap::new(),
            words: vec![],
            word_id_by_string: HashMap::new(),
            max_length,
            min_score,
            source_errors: HashMap::new(),
        };

        let (raw_entries, source_errors) = load_words_from_sources(&source_configs);
        instance.source_errors = source_errors;

        for raw_entry in raw_entries {
            let length = raw_entry.normalized.chars().count();
            if max_length.is_some_and(|max_length| length > max_length) {
                continue;
            }
            if min_score.is_some_and(|min_score| raw_entry.score < min_score) {
                continue;
            }
            instance.add_word(&raw_entry);
        }

        instance
    }

    /// Build a `WordList` directly from a collection of strings, each with the default score.
    #[must_use]
    pub fn from_words<S: AsRef<str>>(words: impl IntoIterator<Item = S>) -> WordList {
        WordList::new(
            vec![WordListSourceConfig::Memory {
                id: "0".into(),
                words: words
                    .into_iter()
                    .map(|word| (word.as_ref().to_string(), DEFAULT_SCORE))
                    .collect(),
            }],
            None,
            None,
        )
    }

    /// Intern the given entry. The word must not be part of the list yet.
    fn add_word(&mut self, raw_entry: &RawWordListEntry) -> WordId {
        let glyphs: SmallVec<[GlyphId; MAX_VARIABLE_LENGTH]> = raw_entry
            .normalized
            .chars()
            .map(|c| self.glyph_id_for_char(c))
            .collect();

        let word_id = self.words.len();

        self.words.push(Word {
            normalized_string: raw_entry.normalized.clone(),
            canonical_string: raw_entry.canonical.clone(),
            glyphs,
            score: raw_entry.score,
        });

        self.word_id_by_string
            .insert(raw_entry.normalized.clone(), word_id);

        word_id
    }

    /// What's the unique glyph id for the given char? We do this lazily, instead of just mapping
    /// every letter up front, because word list entries may also contain numbers, non-English
    /// letters, or punctuation.
    pub fn glyph_id_for_char(&mut self, ch: char) -> GlyphId {
        self.glyph_id_by_char.get(&ch).copied().unwrap_or_else(|| {
            self.glyphs.push(ch);
            let id = self.glyphs.len() - 1;
            self.glyph_id_by_char.insert(ch, id);
            id
        })
    }

    /// Borrow an existing word using its id.
    #[must_use]
    pub fn word(&self, word_id: WordId) -> &Word {
        &self.words[word_id]
    }

    /// Look up the id of a word, normalizing it first.
    #[must_use]
    pub fn word_id(&self, word: &str) -> Option<WordId> {
        self.word_id_by_string.get(&normalize_word(word)).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// For each source provided when loading, return any errors it emitted.
    #[must_use]
    pub fn get_source_errors(&self) -> &HashMap<String, Vec<WordListError>> {
        &self.source_errors
    }
}

impl Debug for WordList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WordList")
            .field("glyphs", &self.glyphs)
            .field("words", &self.words.len())
            .field("max_length", &self.max_length)
            .field("min_score", &self.min_score)
            .finish_non_exhaustive()
    }
}
