mod app_runtime;
mod config;
mod enrichment;
mod media_file_discovery;
mod metadata_tags;

use std::path::PathBuf;

use clap::Parser;
use log::{error, info, warn};

use app_runtime::{run_pipeline, RunOptions, RunReport};
use enrichment::gemini::GeminiGenerator;

#[derive(Parser, Debug)]
#[command(name = "ai-music-tagger")]
#[command(about = "Fills in missing MP3 release years by asking Gemini")]
struct Args {
    /// Directory to search for MP3 files
    #[arg(long, default_value = ".")]
    dir: PathBuf,

    /// List files missing a year without querying the model or modifying tags
    #[arg(long)]
    dry_run: bool,

    /// TOML config file (defaults to the per-user config file when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Model name, overriding the config file
    #[arg(long)]
    model: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn log_report(report: &RunReport) {
    info!(
        "Done: {} enriched, {} written, {} inference failure(s), {} write failure(s)",
        report.enriched, report.written, report.inference_failures, report.write_failures
    );
    if report.rate_limited {
        warn!("Stopped early after hitting the model's rate limit; rerun later to finish");
    }
}

fn main() {
    let args = Args::parse();

    let mut clog = colog::default_builder();
    clog.filter(
        None,
        if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        },
    );
    clog.init();

    let mut config = match config::load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            error!("{}", err);
            std::process::exit(1);
        }
    };
    if let Some(model) = args.model {
        config.inference.model = model;
    }

    let options = RunOptions {
        root: args.dir,
        dry_run: args.dry_run,
    };
    let inference = config.inference;
    let result = run_pipeline(&options, move || {
        let api_key = inference.resolve_api_key(|name| std::env::var(name).ok())?;
        Ok(GeminiGenerator::new(inference.gemini_settings(api_key)))
    });

    match result {
        Ok(report) => log_report(&report),
        Err(err) => {
            error!("{}", err);
            std::process::exit(1);
        }
    }
}
