//! Subcommand modules for the `dada` binary.

pub mod align;
pub mod calibrate;
pub mod denoise;

use clap::*;
use dada::libs::matrix::{read_matrix, ScoreMatrix};

/// Alignment options shared by every subcommand.
pub fn align_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("score")
            .long("score")
            .num_args(1)
            .help("4x4 score matrix file, overrides --match/--mismatch"),
    )
    .arg(
        Arg::new("match")
            .long("match")
            .num_args(1)
            .default_value("5")
            .allow_negative_numbers(true)
            .value_parser(value_parser!(f64))
            .help("Score of a matching base"),
    )
    .arg(
        Arg::new("mismatch")
            .long("mismatch")
            .num_args(1)
            .default_value("-4")
            .allow_negative_numbers(true)
            .value_parser(value_parser!(f64))
            .help("Score of a mismatching base"),
    )
    .arg(
        Arg::new("gap")
            .long("gap")
            .num_args(1)
            .default_value("-8")
            .allow_negative_numbers(true)
            .value_parser(value_parser!(f64))
            .help("Penalty added per interior gap position"),
    )
    .arg(
        Arg::new("band")
            .long("band")
            .num_args(1)
            .default_value("16")
            .value_parser(value_parser!(usize))
            .help("Band width around the diagonal"),
    )
    .arg(
        Arg::new("unbanded")
            .long("unbanded")
            .action(ArgAction::SetTrue)
            .help("Fill the whole alignment matrix"),
    )
}

/// Score matrix rows from --score, or from --match/--mismatch.
pub fn score_rows(args: &ArgMatches) -> anyhow::Result<Vec<Vec<f64>>> {
    match args.get_one::<String>("score") {
        Some(file) => read_matrix(dada::reader(file)?),
        None => {
            let opt_match = *args.get_one::<f64>("match").unwrap();
            let opt_mismatch = *args.get_one::<f64>("mismatch").unwrap();
            Ok(ScoreMatrix::new(opt_match, opt_mismatch).rows())
        }
    }
}

pub fn band(args: &ArgMatches) -> Option<usize> {
    if args.get_flag("unbanded") {
        None
    } else {
        Some(*args.get_one::<usize>("band").unwrap())
    }
}
