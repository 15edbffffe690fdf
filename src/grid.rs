//! This module implements the static structure of a crossword: which cells can hold letters, the
//! word slots ("variables") derived from them, and where those slots cross each other. Nothing in
//! here changes during a fill.

use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::assignment::Assignment;
use crate::types::VariableId;
use crate::word_list::WordList;
use crate::MAX_CROSSING_COUNT;

/// Zero-indexed (row, column) coords for a cell in the grid, where row 0 is the top row.
pub type GridCoord = (usize, usize);

/// The positions of a shared cell within two crossing variables: (index into x, index into y).
pub type Overlap = (usize, usize);

/// The direction that a variable is facing.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Direction {
    Across,
    Down,
}

impl Direction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Across => "across",
            Direction::Down => "down",
        }
    }
}

/// A single word slot in the grid. Two variables are the same slot iff they start in the same
/// cell and face the same direction; `length` is carried along but doesn't take part in equality
/// or hashing.
#[derive(Debug, Clone, Copy)]
pub struct Variable {
    pub i: usize,
    pub j: usize,
    pub direction: Direction,
    pub length: usize,
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.i == other.i && self.j == other.j && self.direction == other.direction
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.i.hash(state);
        self.j.hash(state);
        self.direction.hash(state);
    }
}

impl Variable {
    #[must_use]
    pub fn new(i: usize, j: usize, direction: Direction, length: usize) -> Variable {
        Variable {
            i,
            j,
            direction,
            length,
        }
    }

    /// Generate the coords for each cell of this variable.
    #[must_use]
    pub fn cell_coords(&self) -> Vec<GridCoord> {
        (0..self.length)
            .map(|cell_idx| match self.direction {
                Direction::Across => (self.i, self.j + cell_idx),
                Direction::Down => (self.i + cell_idx, self.j),
            })
            .collect()
    }

    /// Parse a string like "1,2,down,5" into a `Variable`.
    pub fn from_key(key: &str) -> Result<Variable, String> {
        let key_parts: Vec<&str> = key.split(',').collect();
        if key_parts.len() != 4 {
            return Err(format!("invalid variable key: {key:?}"));
        }

        let i: Result<usize, _> = key_parts[0].parse();
        let j: Result<usize, _> = key_parts[1].parse();
        let direction: Option<Direction> = match key_parts[2] {
            "across" => Some(Direction::Across),
            "down" => Some(Direction::Down),
            _ => None,
        };
        let length: Result<usize, _> = key_parts[3].parse();

        if let (Ok(i), Ok(j), Some(direction), Ok(length)) = (i, j, direction, length) {
            Ok(Variable::new(i, j, direction, length))
        } else {
            Err(format!("invalid variable key: {key:?}"))
        }
    }

    /// Represent this variable as a string like "1,2,down,5".
    #[must_use]
    pub fn to_key(&self) -> String {
        format!(
            "{},{},{},{}",
            self.i,
            self.j,
            self.direction.as_str(),
            self.length,
        )
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}) {} : {}",
            self.i,
            self.j,
            self.direction.as_str(),
            self.length
        )
    }
}

/// Serialize a `Variable` into a string key.
#[cfg(feature = "serde")]
impl Serialize for Variable {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_key())
    }
}

/// Deserialize a `Variable` from a string key.
#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for Variable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw_string = String::deserialize(deserializer)?;
        Variable::from_key(&raw_string).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    Empty,
    RaggedRows {
        row: usize,
        expected: usize,
        found: usize,
    },
    InvalidCell {
        row: usize,
        column: usize,
        cell: char,
    },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::Empty => write!(f, "Grid must have at least one row"),
            GridError::RaggedRows {
                row,
                expected,
                found,
            } => write!(
                f,
                "Row {row} has {found} cells but the first row has {expected}"
            ),
            GridError::InvalidCell { row, column, cell } => {
                write!(f, "Invalid cell “{cell}” at row {row}, column {column}")
            }
        }
    }
}

impl std::error::Error for GridError {}

/// A rectangular matrix marking which cells can hold letters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    pub height: usize,
    pub width: usize,

    /// A flat array of cells, in order of row and then column.
    cells: Vec<bool>,
}

impl Grid {
    /// Build a grid from rows of cells, where `true` means the cell can be filled.
    pub fn new(structure: &[Vec<bool>]) -> Result<Grid, GridError> {
        let width = structure.first().map_or(0, Vec::len);

        if let Some((row, found)) = structure
            .iter()
            .map(Vec::len)
            .enumerate()
            .find(|&(_, len)| len != width)
        {
            return Err(GridError::RaggedRows {
                row,
                expected: width,
                found,
            });
        }

        Ok(Grid {
            height: structure.len(),
            width,
            cells: structure.iter().flatten().copied().collect(),
        })
    }

    /// Parse a template string with `_` or `.` representing open cells and `#` (or `█`)
    /// representing blocks. Blank lines and surrounding whitespace are ignored.
    pub fn from_template_string(template: &str) -> Result<Grid, GridError> {
        let structure = template
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(row, line)| {
                line.chars()
                    .enumerate()
                    .map(|(column, cell)| match cell {
                        '_' | '.' => Ok(true),
                        '#' | '█' => Ok(false),
                        _ => Err(GridError::InvalidCell { row, column, cell }),
                    })
                    .collect::<Result<Vec<bool>, GridError>>()
            })
            .collect::<Result<Vec<_>, GridError>>()?;

        if structure.is_empty() {
            return Err(GridError::Empty);
        }

        Grid::new(&structure)
    }

    /// Can the cell at the given coords hold a letter? Coords outside the grid can't.
    #[must_use]
    pub fn is_fillable(&self, (i, j): GridCoord) -> bool {
        i < self.height && j < self.width && self.cells[i * self.width + j]
    }
}

/// Derive the variables for a grid: every maximal run of two or more open cells in a row is an
/// across variable and every such run in a column is a down variable. Across variables come
/// first, in row-major order, followed by down variables in column-major order.
#[must_use]
pub fn generate_variables(grid: &Grid) -> Vec<Variable> {
    fn build_runs(
        line_count: usize,
        line_length: usize,
        is_fillable: impl Fn(usize, usize) -> bool,
    ) -> Vec<(usize, usize, usize)> {
        let mut result = vec![];

        for line in 0..line_count {
            let mut run_start: Option<usize> = None;

            for idx in 0..=line_length {
                let open = idx < line_length && is_fillable(line, idx);
                match (open, run_start) {
                    (true, None) => run_start = Some(idx),
                    (false, Some(start)) => {
                        if idx - start > 1 {
                            result.push((line, start, idx - start));
                        }
                        run_start = None;
                    }
                    _ => {}
                }
            }
        }

        result
    }

    let across = build_runs(grid.height, grid.width, |i, j| grid.is_fillable((i, j)))
        .into_iter()
        .map(|(i, j, length)| Variable::new(i, j, Direction::Across, length));

    let down = build_runs(grid.width, grid.height, |j, i| grid.is_fillable((i, j)))
        .into_iter()
        .map(|(j, i, length)| Variable::new(i, j, Direction::Down, length));

    across.chain(down).collect()
}

/// A struct representing a crossing between one variable and another, referencing the other
/// variable's id and the location of the intersection within both of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crossing {
    pub other_variable_id: VariableId,
    pub cell_idx: usize,
    pub other_cell_idx: usize,
}

/// A grid together with its derived variables and crossings.
#[derive(Debug, Clone)]
pub struct Crossword {
    pub grid: Grid,

    /// All of the variables in the grid; `VariableId`s are indices into this list.
    pub variables: Vec<Variable>,

    /// For each variable, its crossings in order of cell index. A variable can't cross the same
    /// neighbor twice, so this doubles as the neighbor list.
    crossings: Vec<SmallVec<[Crossing; MAX_CROSSING_COUNT]>>,

    variable_id_by_variable: HashMap<Variable, VariableId>,
}

impl Crossword {
    /// Derive the variables and crossings for the given grid.
    #[must_use]
    pub fn new(grid: Grid) -> Crossword {
        let variables = generate_variables(&grid);

        // Build a map from cell location to variables involved, which we can then use to
        // calculate crossings.
        let mut variables_by_cell: HashMap<GridCoord, SmallVec<[(VariableId, usize); 2]>> =
            HashMap::new();
        for (variable_id, variable) in variables.iter().enumerate() {
            for (cell_idx, loc) in variable.cell_coords().into_iter().enumerate() {
                variables_by_cell
                    .entry(loc)
                    .or_default()
                    .push((variable_id, cell_idx));
            }
        }

        let crossings: Vec<SmallVec<[Crossing; MAX_CROSSING_COUNT]>> = variables
            .iter()
            .enumerate()
            .map(|(variable_id, variable)| {
                variable
                    .cell_coords()
                    .iter()
                    .enumerate()
                    .flat_map(|(cell_idx, loc)| {
                        variables_by_cell[loc]
                            .iter()
                            .filter(move |&&(other_variable_id, _)| {
                                other_variable_id != variable_id
                            })
                            .map(move |&(other_variable_id, other_cell_idx)| Crossing {
                                other_variable_id,
                                cell_idx,
                                other_cell_idx,
                            })
                    })
                    .collect()
            })
            .collect();

        let variable_id_by_variable = variables
            .iter()
            .enumerate()
            .map(|(variable_id, &variable)| (variable, variable_id))
            .collect();

        Crossword {
            grid,
            variables,
            crossings,
            variable_id_by_variable,
        }
    }

    /// Parse a template string (see `Grid::from_template_string`) and derive a crossword from it.
    pub fn from_template_string(template: &str) -> Result<Crossword, GridError> {
        Grid::from_template_string(template).map(Crossword::new)
    }

    #[must_use]
    pub fn variable(&self, variable_id: VariableId) -> &Variable {
        &self.variables[variable_id]
    }

    /// Find the id of a variable by its structural identity (start cell and direction).
    #[must_use]
    pub fn variable_id(&self, variable: &Variable) -> Option<VariableId> {
        self.variable_id_by_variable.get(variable).copied()
    }

    /// All crossings of the given variable, in order of cell index.
    #[must_use]
    pub fn crossings(&self, variable_id: VariableId) -> &[Crossing] {
        &self.crossings[variable_id]
    }

    /// Where do `x` and `y` cross, as (index into x, index into y)? `None` if they don't.
    #[must_use]
    pub fn overlap(&self, x: VariableId, y: VariableId) -> Option<Overlap> {
        self.crossings[x]
            .iter()
            .find(|crossing| crossing.other_variable_id == y)
            .map(|crossing| (crossing.cell_idx, crossing.other_cell_idx))
    }

    /// The variables crossing the given variable.
    pub fn neighbors(&self, variable_id: VariableId) -> impl Iterator<Item = VariableId> + '_ {
        self.crossings[variable_id]
            .iter()
            .map(|crossing| crossing.other_variable_id)
    }

    /// The number of variables crossing the given variable.
    #[must_use]
    pub fn degree(&self, variable_id: VariableId) -> usize {
        self.crossings[variable_id].len()
    }
}

/// Turn the given crossword and (possibly partial) assignment into a rendered string, with `#` for
/// blocks and `.` for open cells that haven't been filled. The output is itself a valid template
/// for `Grid::from_template_string`, whichever block character the input used, and letters appear
/// in their normalized (lowercase) form.
#[must_use]
pub fn render_grid(crossword: &Crossword, word_list: &WordList, assignment: &Assignment) -> String {
    let grid = &crossword.grid;
    let mut cells: Vec<Option<char>> = (0..grid.height * grid.width).map(|_| None).collect();

    for (variable_id, word_id) in assignment.iter() {
        let variable = crossword.variable(variable_id);
        let word = word_list.word(word_id);

        for ((i, j), &glyph) in variable.cell_coords().into_iter().zip(&word.glyphs) {
            cells[i * grid.width + j] = Some(word_list.glyphs[glyph]);
        }
    }

    (0..grid.height)
        .map(|i| {
            (0..grid.width)
                .map(|j| {
                    if grid.is_fillable((i, j)) {
                        cells[i * grid.width + j].unwrap_or('.')
                    } else {
                        '#'
                    }
                })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}
