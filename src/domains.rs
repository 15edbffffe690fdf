use crate::grid::Crossword;
use crate::types::{VariableId, WordId};
use crate::word_list::WordList;

/// The candidate words still available for each variable. Each domain is kept sorted by word id,
/// and domains only ever shrink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domains {
    domains: Vec<Vec<WordId>>,
}

impl Domains {
    /// Give every variable its own copy of the whole word list.
    #[must_use]
    pub fn initialize(crossword: &Crossword, word_list: &WordList) -> Domains {
        Domains {
            domains: crossword
                .variables
                .iter()
                .map(|_| (0..word_list.len()).collect())
                .collect(),
        }
    }

    /// Remove every word whose length doesn't match its variable's length.
    pub fn enforce_node_consistency(&mut self, crossword: &Crossword, word_list: &WordList) {
        for (variable, domain) in crossword.variables.iter().zip(&mut self.domains) {
            domain.retain(|&word_id| word_list.word(word_id).length() == variable.length);
        }
    }

    #[must_use]
    pub fn get(&self, variable_id: VariableId) -> &[WordId] {
        &self.domains[variable_id]
    }

    #[must_use]
    pub fn option_count(&self, variable_id: VariableId) -> usize {
        self.domains[variable_id].len()
    }

    #[must_use]
    pub fn is_empty(&self, variable_id: VariableId) -> bool {
        self.domains[variable_id].is_empty()
    }

    #[must_use]
    pub fn contains(&self, variable_id: VariableId, word_id: WordId) -> bool {
        self.domains[variable_id].binary_search(&word_id).is_ok()
    }

    /// The first variable whose domain has been wiped out, if any.
    #[must_use]
    pub fn first_empty(&self) -> Option<VariableId> {
        self.domains.iter().position(Vec::is_empty)
    }

    /// The number of candidates across all variables.
    #[must_use]
    pub fn total_option_count(&self) -> usize {
        self.domains.iter().map(Vec::len).sum()
    }

    /// Keep only the words of a variable's domain that satisfy the predicate, returning how many
    /// were removed.
    pub fn retain(
        &mut self,
        variable_id: VariableId,
        predicate: impl FnMut(&WordId) -> bool,
    ) -> usize {
        let domain = &mut self.domains[variable_id];
        let before = domain.len();
        domain.retain(predicate);
        before - domain.len()
    }
}

#[cfg(test)]
mod tests {
    use crate::domains::Domains;
    use crate::grid::Crossword;
    use crate::word_list::WordList;

    fn generate_crossword() -> Crossword {
        Crossword::from_template_string(
            "
            ____
            _##_
            _##_
            ",
        )
        .unwrap()
    }

    #[test]
    fn test_initialize_copies_whole_word_list() {
        let crossword = generate_crossword();
        let word_list = WordList::from_words(["cat", "dogs", "ox"]);

        let domains = Domains::initialize(&crossword, &word_list);

        for variable_id in 0..crossword.variables.len() {
            assert_eq!(domains.get(variable_id), &[0, 1, 2]);
        }
    }

    #[test]
    fn test_enforce_node_consistency() {
        let crossword = generate_crossword();
        let word_list = WordList::from_words(["cat", "dogs", "ox", "car", "bird"]);

        let mut domains = Domains::initialize(&crossword, &word_list);
        domains.enforce_node_consistency(&crossword, &word_list);

        for (variable_id, variable) in crossword.variables.iter().enumerate() {
            assert!(domains
                .get(variable_id)
                .iter()
                .all(|&word_id| word_list.word(word_id).length() == variable.length));
        }

        // across (0,0) len 4, down (0,0) len 3, down (0,3) len 3
        assert_eq!(domains.option_count(0), 2);
        assert_eq!(domains.option_count(1), 2);
        assert!(domains.contains(1, word_list.word_id("car").unwrap()));
        assert!(!domains.contains(1, word_list.word_id("bird").unwrap()));
        assert_eq!(domains.first_empty(), None);

        // The word list itself is untouched.
        assert_eq!(word_list.len(), 5);
    }

    #[test]
    fn test_empty_word_list_leaves_empty_domains() {
        let crossword = generate_crossword();
        let word_list = WordList::from_words(Vec::<String>::new());

        let mut domains = Domains::initialize(&crossword, &word_list);
        domains.enforce_node_consistency(&crossword, &word_list);

        assert_eq!(domains.first_empty(), Some(0));
        assert_eq!(domains.total_option_count(), 0);
    }

    #[test]
    fn test_retain_reports_removals() {
        let crossword = generate_crossword();
        let word_list = WordList::from_words(["cat", "dogs", "ox"]);

        let mut domains = Domains::initialize(&crossword, &word_list);

        assert_eq!(domains.retain(0, |&word_id| word_id != 1), 1);
        assert_eq!(domains.retain(0, |&word_id| word_id != 1), 0);
        assert_eq!(domains.get(0), &[0, 2]);
        assert_eq!(domains.get(1), &[0, 1, 2]);
    }
}
