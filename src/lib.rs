pub mod arc_consistency;
pub mod assignment;
pub mod backtracking_search;
pub mod domains;
pub mod grid;
pub mod types;
pub mod word_list;

pub const CHECK_INVARIANTS: bool = cfg!(feature = "check_invariants");

/// The expected maximum length for a single word slot. Longer words are still supported, they just
/// spill out of inline storage.
pub const MAX_VARIABLE_LENGTH: usize = 21;

/// The expected maximum number of variables crossing a single variable.
pub const MAX_CROSSING_COUNT: usize = 16;
