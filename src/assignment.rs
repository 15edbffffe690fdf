//! Partial assignments of words to variables, and the checks that decide whether an assignment
//! is a valid (possibly incomplete) fill.

use std::collections::{BTreeMap, HashMap};

use crate::grid::{Crossword, Variable};
use crate::types::{VariableId, WordId};
use crate::word_list::WordList;

/// A partial mapping from variables to words, built up and unwound one variable at a time during
/// a search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assignment {
    word_ids: BTreeMap<VariableId, WordId>,
}

impl Assignment {
    /// The empty assignment.
    #[must_use]
    pub fn new() -> Assignment {
        Assignment::default()
    }

    /// Assign a word to a variable, returning the word it replaced, if any.
    pub fn assign(&mut self, variable_id: VariableId, word_id: WordId) -> Option<WordId> {
        self.word_ids.insert(variable_id, word_id)
    }

    /// Remove a variable's word, returning it if there was one.
    pub fn unassign(&mut self, variable_id: VariableId) -> Option<WordId> {
        self.word_ids.remove(&variable_id)
    }

    #[must_use]
    pub fn get(&self, variable_id: VariableId) -> Option<WordId> {
        self.word_ids.get(&variable_id).copied()
    }

    #[must_use]
    pub fn contains(&self, variable_id: VariableId) -> bool {
        self.word_ids.contains_key(&variable_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.word_ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.word_ids.is_empty()
    }

    /// Iterate over (variable, word) pairs in variable order.
    pub fn iter(&self) -> impl Iterator<Item = (VariableId, WordId)> + '_ {
        self.word_ids
            .iter()
            .map(|(&variable_id, &word_id)| (variable_id, word_id))
    }

    /// Resolve ids into the variables and words they stand for.
    #[must_use]
    pub fn to_word_map(
        &self,
        crossword: &Crossword,
        word_list: &WordList,
    ) -> HashMap<Variable, String> {
        self.iter()
            .map(|(variable_id, word_id)| {
                (
                    *crossword.variable(variable_id),
                    word_list.word(word_id).normalized_string.clone(),
                )
            })
            .collect()
    }
}

/// Is the given (possibly partial) assignment consistent? Every assigned word must have its
/// variable's length, and every pair of assigned neighbors must agree on their shared cell and
/// hold different words.
#[must_use]
pub fn consistent(crossword: &Crossword, word_list: &WordList, assignment: &Assignment) -> bool {
    assignment.iter().all(|(variable_id, word_id)| {
        let word = word_list.word(word_id);

        if word.length() != crossword.variable(variable_id).length {
            return false;
        }

        crossword.crossings(variable_id).iter().all(|crossing| {
            let Some(other_word_id) = assignment.get(crossing.other_variable_id) else {
                return true;
            };
            let other_word = word_list.word(other_word_id);

            other_word_id != word_id
                && other_word.glyphs.get(crossing.other_cell_idx)
                    == word.glyphs.get(crossing.cell_idx)
        })
    })
}

/// Does the assignment give a word to every variable in the crossword?
#[must_use]
pub fn assignment_complete(crossword: &Crossword, assignment: &Assignment) -> bool {
    (0..crossword.variables.len()).all(|variable_id| assignment.contains(variable_id))
}
