/// An identifier for a given letter or symbol, based on its index in the `WordList`'s `glyphs`
/// field.
pub type GlyphId = usize;

/// An identifier for a given word, based on its index in the `WordList`'s `words` field.
pub type WordId = usize;

/// An identifier for a given variable (word slot), based on its index in the `Crossword`'s
/// `variables` field.
pub type VariableId = usize;

/// An ordered pair of variables whose consistency AC-3 needs to (re)check.
pub type DirectedArc = (VariableId, VariableId);
