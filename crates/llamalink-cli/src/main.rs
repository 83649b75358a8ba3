//! llamalink - link Ollama models into LM Studio.
//!
//! Exit status is 1 when the model list cannot be obtained or setup fails,
//! 0 otherwise. Per-model failures are reported but do not change it.

mod output;
mod select;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use llamalink_core::link::CleanupWalker;
use llamalink_core::paths;
use llamalink_core::source::parse_size_arg;
use llamalink_core::{
    survey, CancellationToken, CleanupPolicy, LinkConfig, LlamaLinkSettings, OllamaCli,
    PresetSync, ReconciliationRun, RunOptions, SizeFilter,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "llamalink", version)]
#[command(about = "Link Ollama models into LM Studio's model directory")]
struct Args {
    /// Link all available models without prompting
    #[arg(short = 'a', long = "all")]
    all: bool,

    /// Custom Ollama models directory
    #[arg(long)]
    ollama_dir: Option<PathBuf>,

    /// Custom LM Studio models directory
    #[arg(long = "lm-dir")]
    lm_dir: Option<PathBuf>,

    /// Include only models at least this large (GB, or e.g. 500MB)
    #[arg(long, value_parser = parse_size)]
    min_size: Option<u64>,

    /// Include only models at most this large (GB, or e.g. 500MB)
    #[arg(long, value_parser = parse_size)]
    max_size: Option<u64>,

    /// Quiet operation, only the exit code reports the outcome
    #[arg(short, long)]
    quiet: bool,

    /// Don't clean up broken symlinks and empty directories
    #[arg(long)]
    no_cleanup: bool,

    /// Remove all symlinked models and empty directories, then exit
    #[arg(long)]
    cleanup: bool,

    /// Skip syncing LM Studio config presets
    #[arg(long)]
    skip_config_presets: bool,

    /// Overwrite existing config presets
    #[arg(long)]
    overwrite_config_presets: bool,

    /// Report what would change without touching the filesystem
    #[arg(long)]
    report_only: bool,

    /// Show the config preset for a model, then exit
    #[arg(long, value_name = "MODEL")]
    show_config_preset: Option<String>,

    /// LM Studio config preset directory
    #[arg(long, value_name = "DIR")]
    presets_dir: Option<PathBuf>,

    /// Settings file (defaults to the platform config directory)
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Ollama executable to run
    #[arg(long, value_name = "PATH", default_value = "ollama")]
    ollama_bin: PathBuf,

    /// Timeout in seconds for each ollama command
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    timeout: u64,

    /// Log progress
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn parse_size(arg: &str) -> std::result::Result<u64, String> {
    parse_size_arg(arg).map_err(|e| e.to_string())
}

fn init_logging(args: &Args) {
    if args.quiet {
        return;
    }
    let log_level = if args.debug {
        Level::DEBUG
    } else if args.verbose {
        Level::INFO
    } else {
        Level::WARN
    };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args);

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let quiet = args.quiet;

    let settings_path = match &args.settings {
        Some(path) => path.clone(),
        None => paths::default_settings_path()?,
    };
    let mut settings = LlamaLinkSettings::load(&settings_path)
        .with_context(|| format!("Error loading settings from {}", settings_path.display()))?;
    settings.skip_config_presets = args.skip_config_presets;
    settings.overwrite_config_presets = args.overwrite_config_presets;
    settings.report_only = args.report_only;

    let config = LinkConfig::resolve(args.ollama_dir.as_deref(), args.lm_dir.as_deref())?;
    debug!("Using {:?}", config);

    if args.cleanup {
        let report = CleanupWalker::new(&config).remove_all_links();
        if !quiet {
            output::print_cleanup(&report);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let presets_dir = match &args.presets_dir {
        Some(dir) => dir.clone(),
        None => paths::default_config_presets_dir()?,
    };
    let presets = PresetSync::new(presets_dir);
    debug!("Config presets in {}", presets.presets_dir().display());

    if let Some(model) = &args.show_config_preset {
        match presets.show(model)? {
            Some(preset) => println!("{}", serde_json::to_string_pretty(&preset)?),
            None => println!("No config preset found for model: {}", model),
        }
        return Ok(ExitCode::SUCCESS);
    }

    if !quiet {
        output::print_paths(&config);
    }

    let source = OllamaCli::new()
        .with_binary(&args.ollama_bin)
        .with_timeout(Duration::from_secs(args.timeout));
    let options = RunOptions {
        dry_run: settings.report_only,
        cleanup: if args.no_cleanup {
            CleanupPolicy::Disabled
        } else {
            CleanupPolicy::EndOfRun
        },
        size_filter: SizeFilter::new(args.min_size, args.max_size),
    };

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
        warn!("Failed to install Ctrl-C handler: {}", e);
    }

    let run = ReconciliationRun::new(config.clone(), &source, options).with_cancellation(cancel);

    let models = match run.list_models().await {
        Ok(models) => models,
        Err(e) => {
            if !quiet {
                println!("{} {}", "Error getting model list:".red(), e);
            }
            return Ok(ExitCode::FAILURE);
        }
    };

    if models.is_empty() {
        if !quiet {
            println!("{}", "No Ollama models found.".yellow());
        }
        return Ok(ExitCode::SUCCESS);
    }

    let mut selected: Vec<usize> = if args.all || quiet {
        (0..models.len()).collect()
    } else {
        output::print_model_list(&models);
        select::prompt_selection(models.len())?
    };
    // Models are reconciled in listing order.
    selected.sort_unstable();
    selected.dedup();
    let selected: Vec<_> = selected
        .iter()
        .filter_map(|&i| models.get(i).cloned())
        .collect();

    if !settings.skip_config_presets && !settings.report_only {
        let names: Vec<String> = models.iter().map(|m| m.name.clone()).collect();
        if let Err(e) = presets.sync(&names, settings.overwrite_config_presets) {
            warn!("Error syncing config presets: {}", e);
        }
    }

    if settings.report_only && !quiet {
        match survey(&config) {
            Ok(tree) => output::print_survey(&tree),
            Err(e) => warn!("Error surveying {}: {}", config.dest_root.display(), e),
        }
    }

    let report = run.execute(&selected).await?;
    if !quiet {
        output::print_report(&report);
    }

    if !report.dry_run {
        settings.touch();
        if let Err(e) = settings.save(&settings_path) {
            warn!("Failed to save settings to {}: {}", settings_path.display(), e);
        }
    }

    Ok(ExitCode::SUCCESS)
}
