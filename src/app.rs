//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and installs logging
//! - layers settings files under the CLI flags
//! - runs the superposition pipeline
//! - prints the summary table and plots
//! - writes scaled curves and optional exports

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, FitArgs, SynthArgs};
use crate::config::Settings;
use crate::data::{CopySpec, SynthSpec, write_synthetic};
use crate::domain::{Domain, FitOutcome, ParamSpec, RunConfig};
use crate::error::AppError;
use crate::plot::PlotScale;

pub mod pipeline;

/// Entry point for the `superimpose` binary.
pub fn run() -> Result<(), AppError> {
    // `superimpose -r a.csv a.csv b.csv` behaves like `superimpose fit ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);
    init_logging(cli.verbose);

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Synth(args) => handle_synth(args),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let settings = Settings::load()?;
    let mut config = run_config_from_args(&args, &settings);
    config.inputs.extend(crate::io::expand_patterns(&args.input)?);
    let run = pipeline::run_superimpose(&config).inspect_err(|e| error!("{e}"))?;

    let ids = run.ids();
    println!(
        "{}",
        crate::report::format_run_summary(&run.reference, &run.domain, &ids, &run.outcomes)
    );
    let table = crate::report::format_summary_table(&run.summary);
    info!("summary\n{table}");
    println!("{table}");

    if config.plot {
        let mut scales = vec![PlotScale::Linear];
        if config.plot_log {
            scales.push(PlotScale::LogLog);
        }
        let (w, h) = (config.plot_width, config.plot_height);
        for scale in scales {
            println!("{}", crate::plot::render_raw_plot(&run.curves, scale, w, h));
            println!("{}", crate::plot::render_fitted_plot(&run.curves, scale, w, h));
            println!("{}", crate::plot::render_native_fit_plot(&run.curves, scale, w, h));
        }
    }

    if config.save_scaled {
        for (curve, outcome) in run.curves.iter().zip(&run.outcomes) {
            if matches!(outcome, FitOutcome::Failed(_)) {
                warn!(curve = %curve.id, "not saving scaled curve: fit failed");
                continue;
            }
            let path = crate::io::write_scaled_csv(curve)?;
            info!(file = %path.display(), "saved scaled curve");
        }
    }

    if let Some(path) = &config.export_summary {
        crate::io::write_summary_json(path, &run.summary, &run.reference, run.domain)?;
        info!(file = %path.display(), "saved summary");
    }

    Ok(())
}

fn handle_synth(args: SynthArgs) -> Result<(), AppError> {
    let spec = synth_spec_from_args(&args);
    let paths = write_synthetic(&args.out_dir, &spec)?;
    for path in &paths {
        println!("{}", path.display());
    }
    Ok(())
}

/// Merge CLI flags over settings; a flag given on the command line always wins.
pub fn run_config_from_args(args: &FitArgs, settings: &Settings) -> RunConfig {
    RunConfig {
        reference: args.reference.clone(),
        inputs: args.inputs.clone(),
        qmin: args.qmin.or(settings.qmin),
        qmax: args.qmax.or(settings.qmax),
        discard_begin: args.discard_begin.unwrap_or(settings.discard_begin),
        discard_end: args.discard_end.unwrap_or(settings.discard_end),
        save_scaled: settings.save_scaled && !args.no_save,
        k: ParamSpec::from_options(args.k, args.k_list.clone()),
        b: ParamSpec::from_options(args.b, args.b_list.clone()),
        solver: settings.solver,
        plot: args.plot || args.log,
        plot_log: args.log,
        plot_width: args.width,
        plot_height: args.height,
        export_summary: args.export_summary.clone(),
    }
}

pub fn synth_spec_from_args(args: &SynthArgs) -> SynthSpec {
    let copies = args
        .factors
        .iter()
        .enumerate()
        .map(|(i, &factor)| CopySpec {
            factor,
            offset: args.offsets.get(i).copied().unwrap_or(0.0),
        })
        .collect();
    SynthSpec {
        points: args.points,
        domain: Domain {
            x_min: args.x_min,
            x_max: args.x_max,
        },
        noise: args.noise,
        seed: args.seed,
        copies,
    }
}

/// Rewrite argv so `superimpose` defaults to `superimpose fit`.
///
/// Rules:
/// - `superimpose -r a.csv ...`           -> `superimpose fit -r a.csv ...`
/// - `superimpose --help/--version/-h`    -> unchanged (show top-level help/version)
/// - `superimpose`                        -> unchanged (clap prints usage)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    // If the first token is a flag, treat it as "fit flags".
    if arg1.starts_with('-') {
        argv.insert(1, "fit".to_string());
    }
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn flags_default_to_fit() {
        assert_eq!(
            rewrite_args(argv(&["superimpose", "-r", "a.csv", "b.csv"])),
            argv(&["superimpose", "fit", "-r", "a.csv", "b.csv"])
        );
        assert_eq!(rewrite_args(argv(&["superimpose", "--help"])), argv(&["superimpose", "--help"]));
        assert_eq!(rewrite_args(argv(&["superimpose", "synth"])), argv(&["superimpose", "synth"]));
    }

    #[test]
    fn cli_flags_override_settings() {
        let cli = crate::cli::Cli::parse_from(argv(&["superimpose", "fit", "-r", "a", "a", "b", "-m", "0.2", "-n", "-k", "1.5"]));
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        let settings = Settings {
            qmin: Some(0.01),
            qmax: Some(0.3),
            discard_begin: 3,
            ..Settings::default()
        };
        let cfg = run_config_from_args(&args, &settings);
        assert_eq!(cfg.qmin, Some(0.01));
        assert_eq!(cfg.qmax, Some(0.2));
        assert_eq!(cfg.discard_begin, 3);
        assert!(!cfg.save_scaled);
        assert_eq!(cfg.k, ParamSpec::Fixed(1.5));
        assert_eq!(cfg.b, ParamSpec::Free);
        assert!(!cfg.plot && !cfg.plot_log);
    }

    #[test]
    fn log_flag_turns_plots_on() {
        let cli = crate::cli::Cli::parse_from(argv(&["superimpose", "fit", "-r", "a", "a", "--log"]));
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        let cfg = run_config_from_args(&args, &Settings::default());
        assert!(cfg.plot);
        assert!(cfg.plot_log);
    }

    #[test]
    fn synth_offsets_pad_with_zero() {
        let cli = crate::cli::Cli::parse_from(argv(&["superimpose", "synth", "--factors", "2", "3", "--offsets", "1"]));
        let Command::Synth(args) = cli.command else {
            panic!("expected synth");
        };
        let spec = synth_spec_from_args(&args);
        assert_eq!(
            spec.copies,
            vec![CopySpec { factor: 2.0, offset: 1.0 }, CopySpec { factor: 3.0, offset: 0.0 }]
        );
    }
}
