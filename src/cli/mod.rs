//! Command-line parsing for the curve superposition tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the fitting code. Flags left unset fall back to the settings
//! files (see `config`).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "superimpose",
    version,
    about = "Superimpose curves onto a reference: I_scaled(Q) = K*I(Q) - b"
)]
pub struct Cli {
    /// Verbose logging (debug level) unless RUST_LOG is set.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit every input curve onto the reference and print the K/b table.
    Fit(FitArgs),
    /// Write demonstration curve files (reference + scaled/offset noisy copies).
    Synth(SynthArgs),
}

/// Options for a superposition run.
#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// File used as reference to scale all curves.
    #[arg(short = 'r', long)]
    pub reference: String,

    /// Input files. The reference may be listed too; duplicates are ignored.
    #[arg(required_unless_present = "input", value_name = "FILE")]
    pub inputs: Vec<String>,

    /// Input file patterns; `*` and `?` are expanded in the file name.
    #[arg(short = 'i', long, num_args = 1.., value_name = "PATTERN")]
    pub input: Vec<String>,

    /// Q min. Defaults to the settings file, else unconstrained.
    #[arg(short = 'q', long, allow_negative_numbers = true)]
    pub qmin: Option<f64>,

    /// Q max. Defaults to the settings file, else unconstrained.
    #[arg(short = 'm', long, allow_negative_numbers = true)]
    pub qmax: Option<f64>,

    /// Discard n points from the beginning of every curve.
    #[arg(short = 'g', long)]
    pub discard_begin: Option<usize>,

    /// Discard n points from the end of every curve.
    #[arg(short = 'e', long)]
    pub discard_end: Option<usize>,

    /// Do not save the scaled curves as <name>_scaled.csv.
    #[arg(short = 'n', long)]
    pub no_save: bool,

    /// K for every curve in I_scaled(Q) = K*I(Q) - b (otherwise fitted).
    #[arg(short = 'k', conflicts_with = "k_list", allow_negative_numbers = true)]
    pub k: Option<f64>,

    /// K values used in turn for each non-reference curve, wrapping around.
    #[arg(long = "k-list", num_args = 1.., value_name = "K", allow_negative_numbers = true)]
    pub k_list: Option<Vec<f64>>,

    /// b for every curve in I_scaled(Q) = K*I(Q) - b (otherwise fitted).
    #[arg(short = 'b', conflicts_with = "b_list", allow_negative_numbers = true)]
    pub b: Option<f64>,

    /// b values used in turn for each non-reference curve, wrapping around.
    #[arg(long = "b-list", num_args = 1.., value_name = "B", allow_negative_numbers = true)]
    pub b_list: Option<Vec<f64>>,

    /// Render ASCII plots of the raw and superimposed curves.
    #[arg(long)]
    pub plot: bool,

    /// Also render log-log plots (implies --plot).
    #[arg(long)]
    pub log: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export the summary table to JSON.
    #[arg(long = "export-summary", value_name = "JSON")]
    pub export_summary: Option<PathBuf>,
}

/// Options for generating demonstration curves.
#[derive(Debug, Args, Clone)]
pub struct SynthArgs {
    /// Output directory.
    #[arg(short = 'o', long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Samples per curve.
    #[arg(long, default_value_t = 100)]
    pub points: usize,

    /// Smallest X.
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    pub x_min: f64,

    /// Largest X.
    #[arg(long, default_value_t = 10.0, allow_negative_numbers = true)]
    pub x_max: f64,

    /// Standard deviation of the Gaussian noise added before scaling.
    #[arg(long, default_value_t = 0.1)]
    pub noise: f64,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Scale factor of each copy.
    #[arg(long, num_args = 1.., default_values_t = [2.2, 0.5], allow_negative_numbers = true)]
    pub factors: Vec<f64>,

    /// Additive offset of each copy (missing entries are 0).
    #[arg(long, num_args = 1.., allow_negative_numbers = true)]
    pub offsets: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("superimpose").chain(args.iter().copied()))
    }

    #[test]
    fn fit_flags_parse() {
        let cli = parse(&["fit", "-r", "a.csv", "a.csv", "b.csv", "-q", "0.1", "-b", "-2.5", "--k-list", "1", "2"]).unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.reference, "a.csv");
        assert_eq!(args.inputs, vec!["a.csv", "b.csv"]);
        assert_eq!(args.qmin, Some(0.1));
        assert_eq!(args.b, Some(-2.5));
        assert_eq!(args.k_list, Some(vec![1.0, 2.0]));
        assert!(!args.no_save);
    }

    #[test]
    fn single_value_and_list_are_exclusive() {
        assert!(parse(&["fit", "-r", "a", "a", "-k", "1", "--k-list", "2"]).is_err());
        assert!(parse(&["fit", "-r", "a", "a", "-b", "1", "--b-list", "2"]).is_err());
        assert!(parse(&["fit", "-r", "a", "a", "-k", "1", "--b-list", "2"]).is_ok());
    }

    #[test]
    fn input_patterns_replace_positional_files() {
        let cli = parse(&["fit", "-r", "a.csv", "-i", "runs/*.csv", "b?.csv"]).unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert!(args.inputs.is_empty());
        assert_eq!(args.input, vec!["runs/*.csv", "b?.csv"]);
        assert!(parse(&["fit", "-r", "a.csv"]).is_err());
    }

    #[test]
    fn synth_defaults() {
        let cli = parse(&["synth"]).unwrap();
        let Command::Synth(args) = cli.command else {
            panic!("expected synth");
        };
        assert_eq!(args.factors, vec![2.2, 0.5]);
        assert!(args.offsets.is_empty());
        assert_eq!(args.points, 100);
    }
}
