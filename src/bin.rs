use clap::Parser;
use crossword_csp::backtracking_search::{find_fill, FillConfig, FillFailure};
use crossword_csp::grid::{render_grid, Crossword};
use crossword_csp::word_list::{WordList, WordListSourceConfig};
use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use std::fmt::{Debug, Formatter};
use std::fs;
use std::time::Duration;
use unicode_normalization::UnicodeNormalization;

/// crossword_csp: Fill a crossword structure from a word list
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the structure file, as text with # representing blocks and _ representing empty
    /// squares
    structure_path: String,

    /// Path to the word list, one word per line with an optional `;score` suffix
    words_path: String,

    /// Give up after this many seconds [default: none]
    #[arg(long)]
    timeout: Option<u64>,

    /// Seed for breaking ties between equally-constrained slots [default: lowest slot first]
    #[arg(long)]
    seed: Option<u64>,

    /// Minimum allowable word score [default: none]
    #[arg(long)]
    min_score: Option<i32>,

    /// Log more detail to stderr (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

struct Error(String);

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0) // Print error unquoted
    }
}

fn main() -> Result<(), Error> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .map_err(|err| Error(format!("Couldn't set up logging: {err}")))?;

    let raw_structure = fs::read_to_string(&args.structure_path)
        .map_err(|_| Error(format!("Couldn't read file '{}'", args.structure_path)))?
        .nfc()
        .collect::<String>();

    let crossword = Crossword::from_template_string(&raw_structure)
        .map_err(|err| Error(format!("Invalid structure: {err}")))?;

    let max_length = crossword
        .variables
        .iter()
        .map(|variable| variable.length)
        .max();

    let word_list = WordList::new(
        vec![WordListSourceConfig::File {
            id: "0".into(),
            path: args.words_path.clone().into(),
        }],
        max_length,
        args.min_score,
    );

    #[allow(clippy::comparison_chain)]
    if let Some(errors) = word_list.get_source_errors().get("0") {
        if errors.len() == 1 {
            return Err(Error(format!("{}", errors[0])));
        } else if errors.len() > 1 {
            let mut full_error: String = "".into();
            for error in errors {
                full_error.push_str(&format!("\n- {error}"));
            }
            return Err(Error(full_error));
        }
    }

    if word_list.is_empty() {
        return Err(Error("Word list is empty".into()));
    }

    let config = FillConfig {
        timeout: args.timeout.map(Duration::from_secs),
        tie_break_seed: args.seed,
        abort: None,
    };

    match find_fill(&crossword, &word_list, &config) {
        Ok(result) => {
            println!("{}", render_grid(&crossword, &word_list, &result.assignment));
            Ok(())
        }
        Err(FillFailure::NoSolution) => {
            println!("{}", FillFailure::NoSolution);
            Ok(())
        }
        Err(failure) => Err(Error(failure.to_string())),
    }
}
