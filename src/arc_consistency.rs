//! This module contains a crossword-specific implementation of the AC-3 algorithm. For our
//! purposes, a pair of crossing variables (x, y) is arc-consistent when every word left in x's
//! domain has some *other* word left in y's domain with the same letter in the shared cell.
//!
//! We keep revising arcs from a FIFO work queue until no more eliminations are possible, or until
//! some domain is wiped out, in which case the grid can't be filled.

use log::{debug, trace};
use std::collections::VecDeque;

use crate::domains::Domains;
use crate::grid::Crossword;
use crate::types::{DirectedArc, VariableId, WordId};
use crate::word_list::WordList;
use crate::CHECK_INVARIANTS;

/// Result from a successful call to `ac3`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArcConsistencySuccess {
    /// How many calls to `revise` removed at least one word.
    pub revisions: usize,

    /// How many words were removed in total.
    pub eliminations: usize,
}

/// Result from a failed call to `ac3`, naming the variable whose domain was wiped out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArcConsistencyFailure {
    pub variable_id: VariableId,
}

/// Result from a call to `ac3`.
pub type ArcConsistencyResult = Result<ArcConsistencySuccess, ArcConsistencyFailure>;

/// Count the words in a domain by the glyph they have in the given cell, indexed by `GlyphId`.
/// Words too short to reach the cell aren't counted.
fn glyph_counts_for_cell(
    word_list: &WordList,
    domain: &[WordId],
    cell_idx: usize,
) -> Vec<usize> {
    let mut counts = vec![0; word_list.glyphs.len()];
    for &word_id in domain {
        if let Some(&glyph) = word_list.word(word_id).glyphs.get(cell_idx) {
            counts[glyph] += 1;
        }
    }
    counts
}

/// Make `x` arc-consistent with `y`: remove every word from x's domain for which y's domain has no
/// different word with a matching letter in the shared cell. Returns whether anything was removed.
/// If the variables don't cross, there's nothing to do.
pub fn revise(
    crossword: &Crossword,
    word_list: &WordList,
    domains: &mut Domains,
    x: VariableId,
    y: VariableId,
) -> bool {
    let Some((x_cell, y_cell)) = crossword.overlap(x, y) else {
        return false;
    };

    let y_counts = glyph_counts_for_cell(word_list, domains.get(y), y_cell);
    let y_domain = domains.get(y).to_vec();

    let removed = domains.retain(x, |&word_id| {
        let glyphs = &word_list.word(word_id).glyphs;
        let Some(&glyph) = glyphs.get(x_cell) else {
            return false;
        };

        // If this same word is in y's domain with a matching letter, it can't support itself.
        let self_support = usize::from(
            glyphs.get(y_cell) == Some(&glyph) && y_domain.binary_search(&word_id).is_ok(),
        );

        y_counts[glyph] > self_support
    });

    if removed > 0 {
        trace!("revise({x}, {y}) removed {removed} word(s)");
    }

    removed > 0
}

/// Every directed (variable, neighbor) pair in the crossword.
#[must_use]
pub fn all_arcs(crossword: &Crossword) -> Vec<DirectedArc> {
    (0..crossword.variables.len())
        .flat_map(|x| crossword.neighbors(x).map(move |y| (x, y)))
        .collect()
}

/// Enforce arc consistency across the crossword, starting from the given arcs (or from every arc
/// in the crossword if `initial_arcs` is `None`). Whenever revising (x, y) removes words from x,
/// every other neighbor z of x gets (z, x) requeued. Bails out as soon as a domain is empty.
///
/// Starting from a subset of arcs only makes the arcs reached from that subset consistent.
pub fn ac3(
    crossword: &Crossword,
    word_list: &WordList,
    domains: &mut Domains,
    initial_arcs: Option<Vec<DirectedArc>>,
) -> ArcConsistencyResult {
    let all_arcs_queued = initial_arcs.is_none();
    let mut queue: VecDeque<DirectedArc> = initial_arcs
        .unwrap_or_else(|| all_arcs(crossword))
        .into();
    let mut result = ArcConsistencySuccess::default();

    while let Some((x, y)) = queue.pop_front() {
        let before = domains.option_count(x);

        if !revise(crossword, word_list, domains, x, y) {
            continue;
        }

        result.revisions += 1;
        result.eliminations += before - domains.option_count(x);

        if domains.is_empty(x) {
            debug!("AC-3 wiped out the domain of {}", crossword.variable(x));
            return Err(ArcConsistencyFailure { variable_id: x });
        }

        queue.extend(crossword.neighbors(x).filter(|&z| z != y).map(|z| (z, x)));
    }

    if CHECK_INVARIANTS && all_arcs_queued {
        for (x, y) in all_arcs(crossword) {
            let mut check = domains.clone();
            assert!(
                !revise(crossword, word_list, &mut check, x, y),
                "AC-3 finished but ({x}, {y}) is not arc-consistent"
            );
        }
    }

    Ok(result)
}
