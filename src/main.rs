use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use miette::{Context, IntoDiagnostic, Result};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use truechurn_core::{ChurnConfig, OutputFormat};
use truechurn_difflens::filter::PathFilter;
use truechurn_gitpulse::churn::{analyze, AnalysisRequest, AuthorSelection};
use truechurn_gitpulse::mining::GitSource;
use truechurn_gitpulse::report;
use truechurn_gitpulse::window::DateWindow;

const CONFIG_FILE: &str = ".truechurn.toml";

#[derive(Parser)]
#[command(
    name = "truechurn",
    version,
    about = "Measure true code churn from git history",
    long_about = "Replays the commits of a date window through a line ledger and splits\n\
                   each author's edits into contribution and churn.\n\n\
                   A removed line that was added earlier in the same window counts as churn;\n\
                   every other edit counts toward contribution.\n\n\
                   Examples:\n  \
                     truechurn --after 2024-01 --before 2024-07 --author alice\n  \
                     truechurn --after 2024-01-01 --before 2024-02-01 --dir services/api\n  \
                     truechurn --after 2024 --before 2025 --exdir vendor --format json\n  \
                     truechurn init                Create a .truechurn.toml config file"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Start of the window, inclusive (YYYY[-MM[-DD]])
    #[arg(long)]
    after: Option<String>,

    /// End of the window, exclusive (YYYY[-MM[-DD]])
    #[arg(long)]
    before: Option<String>,

    /// Only replay commits whose author name or email contains this text
    #[arg(long)]
    author: Option<String>,

    /// Directory inside the repository to analyse (default: current directory)
    #[arg(long, default_value = ".")]
    dir: PathBuf,

    /// Subdirectory to exclude, relative to --dir (repeatable, case-insensitive)
    #[arg(long = "exdir", value_name = "PATH")]
    exclude_dirs: Vec<PathBuf>,

    /// Include per-line detail in the report
    #[arg(long)]
    detail: bool,

    /// Path to configuration file (default: .truechurn.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        long_help = "Output format for the report.\n\n\
                       Formats:\n  \
                         text      Human-readable table (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown"
    )]
    format: Option<OutputFormat>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    verbose: bool,

    /// When to use colors
    #[arg(long, global = true, default_value = "auto")]
    color: ColorChoice,
}

#[derive(Subcommand)]
enum Command {
    /// Create a default .truechurn.toml in the current directory
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Clone, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    /// Auto-detect based on terminal
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

const DEFAULT_CONFIG: &str = r#"# truechurn configuration
# Command-line flags take precedence over these values.

[window]
# after = "2024-01-01"
# before = "2024-07-01"
# author = "alice"

[filter]
# Paths here are relative to the repository root, even when --dir points
# at a subdirectory. --exdir values are relative to --dir.
# include_dir = "src"
# exclude_dirs = ["vendor", "third_party"]
# exclude_patterns = ["*.lock", "generated/**"]

[output]
# format = "text"
# detail = false
"#;

fn main() -> Result<()> {
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
    init_tracing(cli.verbose);

    match cli.command {
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
            clap_complete::generate(shell, &mut cmd, "truechurn", &mut std::io::stdout());
        }
        None => run(&cli)?,
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn load_config(explicit: Option<&Path>) -> Result<ChurnConfig> {
    let config = match explicit {
        Some(path) => ChurnConfig::from_file(path)?,
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                ChurnConfig::from_file(default_path)?
            } else {
                ChurnConfig::default()
            }
        }
    };
    Ok(config)
}

/// Accept both `2024-01` and the `after=2024-01` form.
fn strip_key<'a>(value: &'a str, key: &str) -> &'a str {
    value
        .strip_prefix(key)
        .and_then(|rest| rest.strip_prefix('='))
        .unwrap_or(value)
        .trim()
}

/// Config exclusions are repository-relative; `--exdir` values are relative
/// to `--dir`.
fn resolve_exclude_dirs(
    prefix: Option<&str>,
    from_config: &[String],
    from_cli: &[PathBuf],
) -> Vec<String> {
    let mut dirs = from_config.to_vec();
    for dir in from_cli {
        let dir = dir.to_string_lossy().replace('\\', "/");
        dirs.push(match prefix {
            Some(p) => format!("{p}/{dir}"),
            None => dir,
        });
    }
    dirs
}

fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    let after = cli
        .after
        .clone()
        .or_else(|| config.window.after.clone())
        .ok_or_else(|| {
            miette::miette!(
                help = "pass --after or set [window] after in .truechurn.toml",
                "no start date given"
            )
        })?;
    let before = cli
        .before
        .clone()
        .or_else(|| config.window.before.clone())
        .ok_or_else(|| {
            miette::miette!(
                help = "pass --before or set [window] before in .truechurn.toml",
                "no end date given"
            )
        })?;
    let window = DateWindow::parse(strip_key(&after, "after"), strip_key(&before, "before"))?;

    let author = cli.author.clone().or_else(|| config.window.author.clone());
    let selection = AuthorSelection::from_filter(author.as_deref().map(|a| strip_key(a, "author")));

    let source = GitSource::open(&cli.dir)?;
    let prefix = source.workdir_prefix().map(str::to_string);

    let include_dir = prefix.clone().or_else(|| config.filter.include_dir.clone());
    let exclude_dirs =
        resolve_exclude_dirs(prefix.as_deref(), &config.filter.exclude_dirs, &cli.exclude_dirs);
    let filter = PathFilter::new(
        include_dir.as_deref(),
        &exclude_dirs,
        &config.filter.exclude_patterns,
    )?;

    let format = cli.format.unwrap_or(config.output.format);
    let request = AnalysisRequest {
        window,
        selection,
        filter,
        detail: cli.detail || config.output.detail,
    };

    tracing::debug!(
        %window,
        author = ?request.selection.filter(),
        include_dir = ?include_dir,
        exclude_dirs = ?exclude_dirs,
        %format,
        "resolved settings"
    );

    let use_color = match cli.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    };

    let bar = if std::io::stderr().is_terminal() {
        let pb = indicatif::ProgressBar::new(0);
        pb.set_style(
            indicatif::ProgressStyle::with_template(
                "{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} commits ({elapsed})",
            )
            .into_diagnostic()?
            .progress_chars("=> "),
        );
        Some(pb)
    } else {
        None
    };

    let result = analyze(&source, &request, |done, total| {
        if let Some(pb) = &bar {
            pb.set_length(total as u64);
            pb.set_position(done as u64);
        }
    });
    if let Some(pb) = &bar {
        pb.finish_and_clear();
    }
    let report = result.wrap_err("churn analysis failed")?;

    let rendered = report::render(&report, format, use_color)?;
    print!("{rendered}");
    Ok(())
}
