//! This module implements grid-filling as a classic constraint satisfaction search: we make the
//! domains node-consistent, establish arc consistency once using AC-3, and then run a depth-first
//! backtracking search that picks variables by minimum remaining values (breaking ties by degree)
//! and tries values in least-constraining-first order.

use log::{debug, info, trace};
use rand::prelude::*;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::arc_consistency::{ac3, ArcConsistencyFailure, ArcConsistencyResult};
use crate::assignment::{assignment_complete, consistent, Assignment};
use crate::domains::Domains;
use crate::grid::Crossword;
use crate::types::{DirectedArc, VariableId, WordId};
use crate::word_list::WordList;
use crate::CHECK_INVARIANTS;

/// How many search states should we visit between checks of the deadline and abort flag?
pub const INTERRUPT_FREQUENCY: usize = 10;

/// A struct tracking stats about the filling process.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    pub states: usize,
    pub backtracks: usize,
    pub revisions: usize,
    pub eliminations: usize,
    pub ac3_time: Duration,
    pub search_time: Duration,
    pub total_time: Duration,
}

/// Tunables for a fill operation.
#[derive(Debug, Clone, Default)]
pub struct FillConfig {
    /// Give up once the search has been running this long.
    pub timeout: Option<Duration>,

    /// If present, ties left over after the MRV and degree heuristics are broken by a random
    /// generator seeded with this value; otherwise the lowest variable id wins.
    pub tie_break_seed: Option<u64>,

    /// An optional atomic flag that can be set to signal that the fill operation should be
    /// canceled.
    pub abort: Option<Arc<AtomicBool>>,
}

/// A struct representing the results of a fill operation.
#[derive(Debug)]
pub struct FillSuccess {
    pub statistics: Statistics,
    pub assignment: Assignment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillFailure {
    /// The grid can't be filled from this word list.
    NoSolution,
    Timeout,
    Abort,
}

impl fmt::Display for FillFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillFailure::NoSolution => write!(f, "No solution."),
            FillFailure::Timeout => write!(f, "Gave up after reaching the time limit."),
            FillFailure::Abort => write!(f, "Fill was aborted."),
        }
    }
}

impl std::error::Error for FillFailure {}

/// Glyph tallies for one unassigned neighbor's domain at the cell it shares with a variable.
struct NeighborGlyphCounts {
    cell_idx: usize,
    option_count: usize,
    counts: Vec<usize>,
}

/// The live state of a single fill operation: the domains being pruned, plus everything needed
/// to order and interrupt the search.
pub struct Solver<'a> {
    crossword: &'a Crossword,
    word_list: &'a WordList,
    domains: Domains,
    config: FillConfig,
    rng: Option<SmallRng>,
    deadline: Option<Instant>,
    statistics: Statistics,
}

impl<'a> Solver<'a> {
    /// Set up a solver whose domains each start out as the whole word list.
    #[must_use]
    pub fn new(
        crossword: &'a Crossword,
        word_list: &'a WordList,
        config: FillConfig,
    ) -> Solver<'a> {
        Solver {
            crossword,
            word_list,
            domains: Domains::initialize(crossword, word_list),
            rng: config.tie_break_seed.map(SmallRng::seed_from_u64),
            config,
            deadline: None,
            statistics: Statistics::default(),
        }
    }

    #[must_use]
    pub fn domains(&self) -> &Domains {
        &self.domains
    }

    #[must_use]
    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// Remove every word whose length doesn't fit its variable.
    pub fn enforce_node_consistency(&mut self) {
        self.domains
            .enforce_node_consistency(self.crossword, self.word_list);
    }

    /// Run AC-3 over the solver's domains, starting from the given arcs (or every arc).
    pub fn ac3(&mut self, initial_arcs: Option<Vec<DirectedArc>>) -> ArcConsistencyResult {
        let result = ac3(
            self.crossword,
            self.word_list,
            &mut self.domains,
            initial_arcs,
        );
        if let Ok(success) = &result {
            self.statistics.revisions += success.revisions;
            self.statistics.eliminations += success.eliminations;
        }
        result
    }

    /// Pick the unassigned variable with the fewest remaining options, preferring the one with the
    /// most neighbors among those. Returns `None` if every variable is assigned.
    pub fn select_unassigned_variable(&mut self, assignment: &Assignment) -> Option<VariableId> {
        let unassigned: Vec<VariableId> = (0..self.crossword.variables.len())
            .filter(|&variable_id| !assignment.contains(variable_id))
            .collect();

        let min_remaining = unassigned
            .iter()
            .map(|&variable_id| self.domains.option_count(variable_id))
            .min()?;
        let fewest_remaining: Vec<VariableId> = unassigned
            .into_iter()
            .filter(|&variable_id| self.domains.option_count(variable_id) == min_remaining)
            .collect();

        let max_degree = fewest_remaining
            .iter()
            .map(|&variable_id| self.crossword.degree(variable_id))
            .max()?;
        let tied: Vec<VariableId> = fewest_remaining
            .into_iter()
            .filter(|&variable_id| self.crossword.degree(variable_id) == max_degree)
            .collect();

        match &mut self.rng {
            Some(rng) => tied.choose(rng).copied(),
            None => tied.first().copied(),
        }
    }

    /// For each unassigned neighbor of the given variable: our cell index, the neighbor's domain
    /// size, and how many of its options have each glyph in the shared cell.
    fn neighbor_glyph_counts(
        &self,
        variable_id: VariableId,
        assignment: &Assignment,
    ) -> Vec<NeighborGlyphCounts> {
        self.crossword
            .crossings(variable_id)
            .iter()
            .filter(|crossing| !assignment.contains(crossing.other_variable_id))
            .map(|crossing| {
                let domain = self.domains.get(crossing.other_variable_id);
                let mut counts = vec![0; self.word_list.glyphs.len()];
                for &word_id in domain {
                    if let Some(&glyph) =
                        self.word_list.word(word_id).glyphs.get(crossing.other_cell_idx)
                    {
                        counts[glyph] += 1;
                    }
                }
                NeighborGlyphCounts {
                    cell_idx: crossing.cell_idx,
                    option_count: domain.len(),
                    counts,
                }
            })
            .collect()
    }

    /// How many neighbor options would choosing this word rule out? An option is ruled out when
    /// it has a different letter in the shared cell. The word's own copy in a neighbor's domain
    /// matches itself, so it isn't counted.
    fn ruled_out_count(&self, neighbor_counts: &[NeighborGlyphCounts], word_id: WordId) -> usize {
        let glyphs = &self.word_list.word(word_id).glyphs;
        neighbor_counts
            .iter()
            .map(|neighbor| {
                let matching = glyphs
                    .get(neighbor.cell_idx)
                    .map_or(0, |&glyph| neighbor.counts[glyph]);
                neighbor.option_count - matching
            })
            .sum()
    }

    /// List the words in a variable's domain, ordered by how many options each would rule out
    /// across the variable's unassigned neighbors (fewest first). Ties keep domain order.
    #[must_use]
    pub fn order_domain_values(
        &self,
        variable_id: VariableId,
        assignment: &Assignment,
    ) -> Vec<WordId> {
        let neighbor_counts = self.neighbor_glyph_counts(variable_id, assignment);

        let mut values = self.domains.get(variable_id).to_vec();
        values.sort_by_cached_key(|&word_id| self.ruled_out_count(&neighbor_counts, word_id));
        values
    }

    /// Have we passed the deadline or been asked to stop?
    fn check_interrupts(&self) -> Result<(), FillFailure> {
        if (self.statistics.states - 1) % INTERRUPT_FREQUENCY != 0 {
            return Ok(());
        }
        if self
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
        {
            return Err(FillFailure::Timeout);
        }
        if self
            .config
            .abort
            .as_ref()
            .is_some_and(|abort| abort.load(Ordering::Relaxed))
        {
            return Err(FillFailure::Abort);
        }
        Ok(())
    }

    /// Extend the given assignment into a complete, consistent one. On success the assignment is
    /// left complete; on `NoSolution` it's restored to the state it was passed in with. A timeout
    /// or abort returns immediately, leaving the assignment as it was at that point.
    pub fn backtrack(&mut self, assignment: &mut Assignment) -> Result<(), FillFailure> {
        self.statistics.states += 1;
        self.check_interrupts()?;

        if assignment_complete(self.crossword, assignment) {
            return Ok(());
        }

        let Some(variable_id) = self.select_unassigned_variable(assignment) else {
            return Ok(());
        };

        for word_id in self.order_domain_values(variable_id, assignment) {
            assignment.assign(variable_id, word_id);

            if consistent(self.crossword, self.word_list, assignment) {
                trace!(
                    "{} = {}",
                    self.crossword.variable(variable_id),
                    self.word_list.word(word_id).normalized_string
                );
                match self.backtrack(assignment) {
                    Ok(()) => return Ok(()),
                    Err(FillFailure::NoSolution) => {}
                    Err(failure) => return Err(failure),
                }
            }

            assignment.unassign(variable_id);
            self.statistics.backtracks += 1;
        }

        trace!("No words left for {}", self.crossword.variable(variable_id));
        Err(FillFailure::NoSolution)
    }

    /// Fill the grid: node consistency, then AC-3, then backtracking search from the empty
    /// assignment. If propagation alone proves the grid unfillable, we never start searching.
    pub fn solve(mut self) -> Result<FillSuccess, FillFailure> {
        let start = Instant::now();
        self.deadline = self.config.timeout.map(|timeout| start + timeout);

        info!(
            "Filling {} variables from {} words",
            self.crossword.variables.len(),
            self.word_list.len()
        );

        self.enforce_node_consistency();
        if let Some(variable_id) = self.domains.first_empty() {
            debug!(
                "No words fit {} after node consistency",
                self.crossword.variable(variable_id)
            );
            return Err(FillFailure::NoSolution);
        }

        let ac3_result = self.ac3(None);
        self.statistics.ac3_time = start.elapsed();
        match ac3_result {
            Ok(success) => debug!(
                "AC-3 made {} revisions and removed {} words; {} options remain",
                success.revisions,
                success.eliminations,
                self.domains.total_option_count()
            ),
            Err(ArcConsistencyFailure { variable_id }) => {
                info!(
                    "No solution: AC-3 wiped out {}",
                    self.crossword.variable(variable_id)
                );
                return Err(FillFailure::NoSolution);
            }
        }

        let search_start = Instant::now();
        let mut assignment = Assignment::new();
        let outcome = self.backtrack(&mut assignment);
        self.statistics.search_time = search_start.elapsed();
        self.statistics.total_time = start.elapsed();

        if let Err(failure) = outcome {
            info!("Fill failed after {:?}: {failure}", self.statistics);
            return Err(failure);
        }

        if CHECK_INVARIANTS {
            assert!(
                assignment_complete(self.crossword, &assignment),
                "search finished with an incomplete assignment"
            );
            assert!(
                consistent(self.crossword, self.word_list, &assignment),
                "search finished with an inconsistent assignment"
            );
        }

        info!("Filled grid in {:?}", self.statistics.total_time);
        debug!("{:?}", self.statistics);

        Ok(FillSuccess {
            statistics: self.statistics,
            assignment,
        })
    }
}

/// Search for a valid fill for the given crossword using words from the given list.
pub fn find_fill(
    crossword: &Crossword,
    word_list: &WordList,
    config: &FillConfig,
) -> Result<FillSuccess, FillFailure> {
    Solver::new(crossword, word_list, config.clone()).solve()
}

#[cfg(test)]
mod tests {
    use crate::assignment::{assignment_complete, consistent, Assignment};
    use crate::backtracking_search::{find_fill, FillConfig, FillFailure, Solver};
    use crate::grid::{render_grid, Crossword};
    use crate::word_list::tests::word_list_source_config;
    use crate::word_list::WordList;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::time::Duration;

    const NUMBERS: [&str; 10] = [
        "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    ];

    // 0 = top across (3), 1 = bottom across (4), 2 = left down (5), 3 = right down (4)
    const STRUCTURE: &str = "
        #___#
        #_##_
        #_##_
        #_##_
        #____
    ";

    fn assert_valid_fill(crossword: &Crossword, word_list: &WordList, assignment: &Assignment) {
        assert!(assignment_complete(crossword, assignment));
        assert!(consistent(crossword, word_list, assignment));
    }

    #[test]
    fn test_find_fill_for_two_crossing_slots() {
        let crossword = Crossword::from_template_string(
            "
            ___
            _##
            _##
            ",
        )
        .unwrap();
        let word_list = WordList::from_words(["cat", "dog", "car"]);

        let result = find_fill(&crossword, &word_list, &FillConfig::default())
            .expect("Failed to find a fill");

        assert_valid_fill(&crossword, &word_list, &result.assignment);
        let mut words: Vec<String> = result
            .assignment
            .to_word_map(&crossword, &word_list)
            .into_values()
            .collect();
        words.sort();
        assert_eq!(words, vec!["car", "cat"]);
    }

    #[test]
    fn test_no_compatible_pair() {
        let crossword = Crossword::from_template_string(
            "
            ___
            _##
            _##
            ",
        )
        .unwrap();
        let word_list = WordList::from_words(["cat", "dog"]);

        assert_eq!(
            find_fill(&crossword, &word_list, &FillConfig::default()).unwrap_err(),
            FillFailure::NoSolution
        );
    }

    #[test]
    fn test_find_fill_for_number_structure() {
        let crossword = Crossword::from_template_string(STRUCTURE).unwrap();
        let word_list = WordList::from_words(NUMBERS);

        let result = find_fill(&crossword, &word_list, &FillConfig::default())
            .expect("Failed to find a fill");

        assert_valid_fill(&crossword, &word_list, &result.assignment);
        println!("{:?}", result.statistics);
        println!(
            "{}",
            render_grid(&crossword, &word_list, &result.assignment)
        );
    }

    #[test]
    fn test_find_fill_with_dictionary_file() {
        let crossword = Crossword::from_template_string(STRUCTURE).unwrap();
        let word_list = WordList::new(word_list_source_config(), Some(5), None);

        let result = find_fill(&crossword, &word_list, &FillConfig::default())
            .expect("Failed to find a fill");

        assert_valid_fill(&crossword, &word_list, &result.assignment);
    }

    #[test]
    fn test_seeded_tie_breaks_still_find_fills() {
        let crossword = Crossword::from_template_string(STRUCTURE).unwrap();
        let word_list = WordList::from_words(NUMBERS);

        for seed in 0..5 {
            let config = FillConfig {
                tie_break_seed: Some(seed),
                ..FillConfig::default()
            };
            let result = find_fill(&crossword, &word_list, &config).expect("Failed to find a fill");
            assert_valid_fill(&crossword, &word_list, &result.assignment);
        }
    }

    #[test]
    fn test_missing_length_means_no_solution() {
        let crossword = Crossword::from_template_string(STRUCTURE).unwrap();
        // No five-letter words for the left down slot.
        let word_list = WordList::from_words(["one", "two", "six", "ten", "four", "five", "nine"]);

        assert_eq!(
            find_fill(&crossword, &word_list, &FillConfig::default()).unwrap_err(),
            FillFailure::NoSolution
        );
    }

    #[test]
    fn test_empty_word_list_means_no_solution() {
        let crossword = Crossword::from_template_string(STRUCTURE).unwrap();
        let word_list = WordList::from_words(Vec::<String>::new());

        assert_eq!(
            find_fill(&crossword, &word_list, &FillConfig::default()).unwrap_err(),
            FillFailure::NoSolution
        );
    }

    #[test]
    fn test_isolated_slot_without_words() {
        let crossword = Crossword::from_template_string("___\n###\n").unwrap();
        let word_list = WordList::from_words(["four"]);

        assert_eq!(
            find_fill(&crossword, &word_list, &FillConfig::default()).unwrap_err(),
            FillFailure::NoSolution
        );
    }

    #[test]
    fn test_grid_without_variables_is_trivially_filled() {
        let crossword = Crossword::from_template_string("#_#\n###\n").unwrap();
        let word_list = WordList::from_words(["cat"]);

        let result = find_fill(&crossword, &word_list, &FillConfig::default())
            .expect("Failed to find a fill");

        assert!(result.assignment.is_empty());
        assert!(assignment_complete(&crossword, &result.assignment));
    }

    #[test]
    fn test_select_unassigned_variable_prefers_fewest_options_then_degree() {
        let crossword = Crossword::from_template_string(STRUCTURE).unwrap();
        let word_list = WordList::from_words(NUMBERS);
        let mut solver = Solver::new(&crossword, &word_list, FillConfig::default());
        solver.enforce_node_consistency();

        // Domain sizes: top across 4, bottom across 3, left down 3, right down 3. The bottom
        // across and left down slots both have two neighbors; the right down slot has one.
        let mut assignment = Assignment::new();
        let selected = solver.select_unassigned_variable(&assignment).unwrap();
        assert!([1, 2].contains(&selected));

        assignment.assign(1, word_list.word_id("nine").unwrap());
        assignment.assign(2, word_list.word_id("seven").unwrap());
        assert_eq!(solver.select_unassigned_variable(&assignment), Some(3));

        assignment.assign(3, word_list.word_id("five").unwrap());
        assert_eq!(solver.select_unassigned_variable(&assignment), Some(0));

        assignment.assign(0, word_list.word_id("six").unwrap());
        assert_eq!(solver.select_unassigned_variable(&assignment), None);
    }

    #[test]
    fn test_order_domain_values_least_constraining_first() {
        let crossword = Crossword::from_template_string(
            "
            ___
            _##
            _##
            ",
        )
        .unwrap();
        let word_list = WordList::from_words(["dog", "cat", "car", "cow"]);
        let mut solver = Solver::new(&crossword, &word_list, FillConfig::default());
        solver.enforce_node_consistency();

        // Three of the four down options start with "c", so "c" words rule out one option each
        // and "dog" rules out three.
        let ordered = solver.order_domain_values(0, &Assignment::new());
        assert_eq!(ordered.len(), 4);
        assert_eq!(*ordered.last().unwrap(), word_list.word_id("dog").unwrap());

        // Once the only neighbor is assigned, nothing is ruled out and the domain order stands.
        let mut assignment = Assignment::new();
        assignment.assign(1, word_list.word_id("cat").unwrap());
        assert_eq!(solver.order_domain_values(0, &assignment), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_ruled_out_count_includes_own_copy_as_match() {
        let crossword = Crossword::from_template_string(
            "
            ___
            _##
            _##
            ",
        )
        .unwrap();
        let word_list = WordList::from_words(["dog", "cat", "car", "cow"]);
        let mut solver = Solver::new(&crossword, &word_list, FillConfig::default());
        solver.enforce_node_consistency();
        let id = |word: &str| word_list.word_id(word).unwrap();

        // The down slot holds all four words, "cat" included. Its "c" tally of 3 counts "cat"
        // itself, so only "dog" is ruled out.
        let neighbor_counts = solver.neighbor_glyph_counts(0, &Assignment::new());
        assert_eq!(neighbor_counts.len(), 1);
        assert_eq!(solver.ruled_out_count(&neighbor_counts, id("cat")), 1);
        assert_eq!(solver.ruled_out_count(&neighbor_counts, id("cow")), 1);
        assert_eq!(solver.ruled_out_count(&neighbor_counts, id("dog")), 3);

        // Shrinking the neighbor to {"cat", "dog"} changes the tallies accordingly.
        solver
            .domains
            .retain(1, |&word_id| word_id == id("cat") || word_id == id("dog"));
        let neighbor_counts = solver.neighbor_glyph_counts(0, &Assignment::new());
        assert_eq!(solver.ruled_out_count(&neighbor_counts, id("cat")), 1);
        assert_eq!(solver.ruled_out_count(&neighbor_counts, id("dog")), 1);
        assert_eq!(solver.ruled_out_count(&neighbor_counts, id("car")), 1);
        assert_eq!(
            solver.order_domain_values(0, &Assignment::new()),
            vec![id("dog"), id("cat"), id("car"), id("cow")]
        );
    }

    #[test]
    fn test_backtrack_restores_assignment_on_failure() {
        let crossword = Crossword::from_template_string(
            "
            ___
            _##
            _##
            ",
        )
        .unwrap();
        let word_list = WordList::from_words(["cat", "dog"]);
        let mut solver = Solver::new(&crossword, &word_list, FillConfig::default());
        solver.enforce_node_consistency();

        let mut assignment = Assignment::new();
        assert_eq!(
            solver.backtrack(&mut assignment),
            Err(FillFailure::NoSolution)
        );
        assert!(assignment.is_empty());
        assert!(solver.statistics().backtracks > 0);
    }

    #[test]
    fn test_ac3_rerun_is_idempotent() {
        let crossword = Crossword::from_template_string(STRUCTURE).unwrap();
        let word_list = WordList::from_words(NUMBERS);
        let mut solver = Solver::new(&crossword, &word_list, FillConfig::default());
        solver.enforce_node_consistency();

        solver.ac3(None).unwrap();
        let domains = solver.domains().clone();
        let rerun = solver.ac3(None).unwrap();

        assert_eq!(rerun.eliminations, 0);
        assert_eq!(solver.domains(), &domains);
    }

    #[test]
    fn test_timeout() {
        let crossword = Crossword::from_template_string(STRUCTURE).unwrap();
        let word_list = WordList::from_words(NUMBERS);
        let config = FillConfig {
            timeout: Some(Duration::ZERO),
            ..FillConfig::default()
        };

        assert_eq!(
            find_fill(&crossword, &word_list, &config).unwrap_err(),
            FillFailure::Timeout
        );
    }

    #[test]
    fn test_abort() {
        let crossword = Crossword::from_template_string(STRUCTURE).unwrap();
        let word_list = WordList::from_words(NUMBERS);
        let config = FillConfig {
            abort: Some(Arc::new(AtomicBool::new(true))),
            ..FillConfig::default()
        };

        assert_eq!(
            find_fill(&crossword, &word_list, &config).unwrap_err(),
            FillFailure::Abort
        );
    }
}
