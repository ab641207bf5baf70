use std::fs;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use congruity_core::{Analyzer, AnalyzerConfig, SummaryPolicy};

mod replay;

#[derive(Parser)]
#[command(name = "congruity", version, about = "Cross-modal authenticity analysis tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a JSON Lines observation log and print an authenticity report
    Replay {
        /// Observation log (one JSON observation per line)
        log: PathBuf,
        /// Analyzer config (TOML); built-in defaults if omitted
        #[arg(long)]
        config: Option<PathBuf>,
        /// How the session verdict is derived; defaults to the config's policy
        #[arg(long, value_enum)]
        policy: Option<Policy>,
        /// Write the JSON report here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Validate an analyzer config and list congruence coverage gaps
    CheckConfig {
        /// Analyzer config (TOML)
        config: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Policy {
    MeanThreshold,
    MajorityVote,
}

impl From<Policy> for SummaryPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::MeanThreshold => SummaryPolicy::MeanThreshold,
            Policy::MajorityVote => SummaryPolicy::MajorityVote,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Replay {
            log,
            config,
            policy,
            output,
        } => cmd_replay(&log, config.as_deref(), policy, output.as_deref()),
        Command::CheckConfig { config } => cmd_check_config(&config),
    }
}

fn load_config(path: Option<&Path>) -> Result<AnalyzerConfig> {
    match path {
        Some(path) => AnalyzerConfig::from_toml_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(AnalyzerConfig::default()),
    }
}

fn cmd_replay(
    log: &Path,
    config: Option<&Path>,
    policy: Option<Policy>,
    output: Option<&Path>,
) -> Result<()> {
    let config = load_config(config)?;
    let policy = policy.map(SummaryPolicy::from).unwrap_or(config.summary_policy);
    let analyzer = Analyzer::new(config).context("invalid analyzer config")?;
    let source = log.display().to_string();

    let result = fs::File::open(log)
        .with_context(|| format!("failed to open {source}"))
        .and_then(|file| replay::replay(BufReader::new(file), &analyzer, policy));

    let (report, failure) = match result {
        Ok(outcome) => (replay::Report::new(&source, policy, &outcome), None),
        Err(e) => (replay::Report::failed(&source, policy, &e), Some(e)),
    };
    let json = serde_json::to_string_pretty(&report)?;

    match output {
        Some(path) => {
            fs::write(path, format!("{json}\n"))
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("report written to {}", path.display());
        }
        None => println!("{json}"),
    }

    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn cmd_check_config(path: &Path) -> Result<()> {
    let config = load_config(Some(path))?;
    let gaps = config.congruence.coverage_gaps(&config.taxonomy());

    println!("{}: ok", path.display());
    println!(
        "  history_length={} threshold={} w_congruence={} w_stability={}",
        config.history_length,
        config.authenticity_threshold,
        config.w_congruence,
        config.w_stability
    );
    if gaps.is_empty() {
        println!("  congruence table covers both vocabularies");
    } else {
        for gap in &gaps {
            println!("  warning: {gap}");
        }
    }
    Ok(())
}
