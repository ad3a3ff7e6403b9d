use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bugspots_core::{BugspotsConfig, OutputFormat};
use bugspots_engine::pipeline::HotspotPipeline;
use bugspots_engine::progress::{IntervalReporter, ProgressObserver};
use bugspots_engine::report;
use bugspots_engine::vcs::GitRepository;
use clap::{Args, CommandFactory, Parser, Subcommand};
use log::{info, LevelFilter};
use miette::{IntoDiagnostic, Result};

const CONFIG_FILE: &str = ".bugspots.toml";

#[derive(Parser)]
#[command(
    name = "bugspots",
    version,
    about = "Find the files most associated with recent bug fixes",
    long_about = "Bugspots scans git history for bug-fix commits and ranks files by how\n\
                   often and how recently they were fixed. Recent fixes weigh far more\n\
                   than old ones, and fixes made before a rename count toward the file's\n\
                   present-day name.\n\n\
                   Examples:\n  \
                     bugspots scan                      Rank the repo in the current directory\n  \
                     bugspots scan --dir ../app -d 500  Scan the last 500 commits of ../app\n  \
                     bugspots scan -f - --limit 10      Print the top 10 to stdout\n  \
                     bugspots init                      Write a default .bugspots.toml"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .bugspots.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log output (-v info, -vv debug)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Hide the progress bar and summary
    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Rank files by recent bug-fix activity
    #[command(long_about = "Rank files by recent bug-fix activity.\n\n\
        Walks back from HEAD, diffs every adjacent commit pair, and scores each file\n\
        touched by a fix commit with a logistic decay of the fix's age.\n\n\
        Examples:\n  bugspots scan\n  bugspots scan -r '\\b(bug|hotfix)\\b' --similarity 60\n  \
        bugspots scan --format json -f hotspots.json")]
    Scan(ScanArgs),
    /// Create a default .bugspots.toml configuration file
    #[command(long_about = "Create a default .bugspots.toml configuration file.\n\n\
        Generates a commented template with every available option.\n\
        Fails if .bugspots.toml already exists.")]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Args)]
struct ScanArgs {
    /// Repository directory (default: current directory)
    #[arg(long, default_value = ".")]
    dir: PathBuf,

    /// Maximum number of commits to scan (default: 1000)
    #[arg(long, short)]
    depth: Option<usize>,

    /// Maximum number of diffs computed at once (default: 10)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Regex identifying fix commits, matched case-insensitively
    #[arg(long, short = 'r')]
    pattern: Option<String>,

    /// Minimum rename similarity percentage, 0-100 (default: 80)
    #[arg(long)]
    similarity: Option<u8>,

    /// Minimum milliseconds between progress reports (default: 3000)
    #[arg(long)]
    interval: Option<u64>,

    /// Output file; `-` writes to stdout (default: hotspot.txt)
    #[arg(long, short)]
    file: Option<PathBuf>,

    /// Output format: text, json, or markdown
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    /// Only render the top N files
    #[arg(long)]
    limit: Option<usize>,
}

impl ScanArgs {
    /// Layer flags over the loaded configuration.
    fn apply(&self, config: &mut BugspotsConfig) {
        if let Some(depth) = self.depth {
            config.scan.depth = depth;
        }
        if let Some(concurrency) = self.concurrency {
            config.scan.concurrency = concurrency;
        }
        if let Some(pattern) = &self.pattern {
            config.scan.pattern = pattern.clone();
        }
        if let Some(similarity) = self.similarity {
            config.scan.similarity = similarity;
        }
        if let Some(interval) = self.interval {
            config.scan.interval_ms = interval;
        }
        if let Some(file) = &self.file {
            config.output.file = file.clone();
        }
        if self.limit.is_some() {
            config.output.limit = self.limit;
        }
    }
}

/// Drives an `indicatif` bar from scanner ticks.
struct BarProgress(indicatif::ProgressBar);

impl BarProgress {
    fn new() -> Self {
        let bar = indicatif::ProgressBar::new(0);
        let style = indicatif::ProgressStyle::with_template(
            "{spinner:.cyan} diffing commits [{bar:30.cyan/blue}] {pos}/{len} ({eta})",
        )
        .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar());
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(120));
        Self(bar)
    }
}

impl ProgressObserver for BarProgress {
    fn on_start(&self, total: usize) {
        self.0.set_length(total as u64);
    }

    fn on_tick(&self) {
        self.0.inc(1);
    }
}

const DEFAULT_CONFIG: &str = r#"# Bugspots Configuration
# CLI flags override these values.

[scan]
# Commits to walk back from HEAD
# depth = 1000
# Diffs computed at once
# concurrency = 10
# Fix-commit regex, matched case-insensitively
# pattern = '\b(fix(es|ed)?|close(s|d)?)\b'
# Follow renames at or above this similarity percentage
# similarity = 80
# Minimum milliseconds between progress reports
# interval_ms = 3000

[output]
# Report destination; "-" writes to stdout
# file = "hotspot.txt"
# Only render the top N files
# limit = 20
"#;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<BugspotsConfig> {
    let config = match path {
        Some(path) => BugspotsConfig::from_file(path)?,
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                BugspotsConfig::from_file(default_path)?
            } else {
                BugspotsConfig::default()
            }
        }
    };
    Ok(config)
}

async fn run_scan(args: &ScanArgs, mut config: BugspotsConfig, quiet: bool) -> Result<()> {
    args.apply(&mut config);
    config.validate()?;

    let repo = GitRepository::open(&args.dir).map_err(|e| {
        miette::miette!(
            help = "Run bugspots inside a git repository, or pass --dir <path>",
            "{e}"
        )
    })?;
    // Let git propose every rename the threshold could accept.
    let repo = repo.with_rename_detection(config.scan.similarity.min(50));
    info!("scanning {}", repo.root().display());

    let pipeline = HotspotPipeline::from_config(Arc::new(repo), &config.scan)?;

    let show_bar = !quiet && std::io::stderr().is_terminal();
    let report = if show_bar {
        let bar = BarProgress::new();
        let result = pipeline.run(&bar).await;
        bar.0.finish_and_clear();
        result?
    } else {
        let reporter = IntervalReporter::new(Duration::from_millis(config.scan.interval_ms));
        pipeline.run(&reporter).await?
    };

    let rendered = report::render(&report, args.format, config.output.limit)?;

    if config.output.file == Path::new("-") {
        println!("{rendered}");
    } else {
        std::fs::write(&config.output.file, &rendered).into_diagnostic()?;
        if !quiet {
            eprintln!(
                "{} fix commits across {} commits; {} hotspots written to {}",
                report.fixes.len(),
                report.commits,
                report.hotspots.len(),
                config.output.file.display()
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .expect("miette handler");
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        None => {
            Cli::command().print_help().into_diagnostic()?;
        }
        Some(Command::Scan(args)) => {
            let config = load_config(cli.config.as_deref())?;
            run_scan(&args, config, cli.quiet).await?;
        }
        Some(Command::Init) => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!("{CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "bugspots", &mut std::io::stdout());
        }
    }

    Ok(())
}
