use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::env;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;
use wmelon_prebuild::config::{
    apply_plugin, check_plugin, load_for_project, load_from_path, ApplicationError,
    PlatformFilter, PluginConfig, StepReport, StepResult,
};
use wmelon_prebuild::steps::pipeline;

#[derive(Parser)]
#[command(name = "wmelon-prebuild")]
#[command(
    about = "Link WatermelonDB into the native projects generated by expo prebuild",
    long_about = None
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum PlatformArg {
    Android,
    Ios,
    All,
}

impl From<PlatformArg> for PlatformFilter {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::Android => PlatformFilter::Android,
            PlatformArg::Ios => PlatformFilter::Ios,
            PlatformArg::All => PlatformFilter::All,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the native patches to a project
    Apply {
        /// Project root (defaults to WMELON_PROJECT, then the current directory)
        #[arg(short, long)]
        project: Option<PathBuf>,

        /// Config file (defaults to <project>/wmelon.toml when present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Only patch one platform
        #[arg(long, value_enum)]
        platform: Option<PlatformArg>,

        /// Leave project.pbxproj alone
        #[arg(long)]
        no_exclude_simulator_archs: bool,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Report which patches are already in place, without writing
    Status {
        /// Project root (defaults to WMELON_PROJECT, then the current directory)
        #[arg(short, long)]
        project: Option<PathBuf>,

        /// Config file (defaults to <project>/wmelon.toml when present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Only check one platform
        #[arg(long, value_enum)]
        platform: Option<PlatformArg>,
    },

    /// List the patch steps in application order
    List,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Apply {
            project,
            config,
            platform,
            no_exclude_simulator_archs,
            dry_run,
            diff,
        } => {
            let root = resolve_project(project)?;
            let mut plugin_config = load_config(&root, config.as_deref())?;
            if let Some(platform) = platform {
                plugin_config.options.platform = platform.into();
            }
            if no_exclude_simulator_archs {
                plugin_config.options.exclude_simulator_architectures = false;
            }
            cmd_apply(&root, &plugin_config, dry_run, diff)
        }

        Commands::Status {
            project,
            config,
            platform,
        } => {
            let root = resolve_project(project)?;
            let mut plugin_config = load_config(&root, config.as_deref())?;
            if let Some(platform) = platform {
                plugin_config.options.platform = platform.into();
            }
            cmd_status(&root, &plugin_config)
        }

        Commands::List => cmd_list(),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("WMELON_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Resolve the project root
///
/// Priority order:
/// 1. Explicit --project flag
/// 2. WMELON_PROJECT environment variable
/// 3. Current directory
fn resolve_project(cli_project: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = cli_project {
        return path
            .canonicalize()
            .with_context(|| format!("project directory {} not found", path.display()));
    }

    if let Ok(env_path) = env::var("WMELON_PROJECT") {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            return Ok(path.canonicalize()?);
        }
        eprintln!(
            "{}",
            format!(
                "Warning: WMELON_PROJECT is set but path doesn't exist: {}",
                env_path
            )
            .yellow()
        );
    }

    Ok(env::current_dir()?)
}

fn load_config(root: &Path, config: Option<&Path>) -> Result<PluginConfig> {
    let config = match config {
        Some(path) => load_from_path(path)?,
        None => load_for_project(root)?,
    };
    Ok(config)
}

fn today() -> time::Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}

/// Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
    if !modified.ends_with('\n') {
        println!();
    }
}

fn print_error_hints(err: &ApplicationError) {
    match err {
        ApplicationError::DependencyMissing { package } => {
            eprintln!("  Install it first: npm install {}", package);
        }
        ApplicationError::DependencyVersion { .. } => {
            eprintln!("  Action: upgrade the package or widen options.version_range");
        }
        ApplicationError::AnchorNotFound {
            file, suggestion, ..
        } => {
            eprintln!("  {}", "CONFLICT: anchor line is missing".red());
            eprintln!("  File: {}", file.display());
            if let Some(line) = suggestion {
                eprintln!("  Closest line: {}", line);
            }
        }
        ApplicationError::AmbiguousMatch { file, count, .. } => {
            eprintln!(
                "  {}",
                format!("CONFLICT: marker matched {} locations (expected 1)", count).red()
            );
            eprintln!("  File: {}", file.display());
            eprintln!("  Action: patch the Podfile by hand");
        }
        ApplicationError::Edit(edit_err) => {
            eprintln!("  Edit error: {}", edit_err);
        }
        _ => {}
    }
}

fn cmd_apply(root: &Path, config: &PluginConfig, dry_run: bool, show_diff: bool) -> Result<()> {
    let layout = config.layout(root);

    println!("Project: {}", root.display());
    if dry_run {
        println!("{}", "[DRY RUN - showing what would be applied]".cyan());
    }
    println!();

    let reports = if dry_run {
        check_plugin(&layout, config, today())
    } else {
        apply_plugin(&layout, config, today())
    };

    let mut total_applied = 0;
    let mut total_already_applied = 0;
    let mut total_skipped = 0;
    let mut total_failed = 0;

    for StepReport { id, result, change } in &reports {
        match result {
            Ok(StepResult::Applied { file }) => {
                let verb = if dry_run { "Would apply to" } else { "Applied to" };
                println!("{} {}: {} {}", "✓".green(), id, verb, file.display());
                total_applied += 1;

                if show_diff {
                    if let Some(change) = change {
                        display_diff(
                            &change.file,
                            change.before.as_deref().unwrap_or(""),
                            &change.after,
                        );
                    }
                }
            }
            Ok(StepResult::AlreadyApplied { file }) => {
                println!(
                    "{} {}: Already applied to {}",
                    "⊙".yellow(),
                    id,
                    file.display()
                );
                total_already_applied += 1;
            }
            Ok(StepResult::AnchorMissing {
                file,
                anchor,
                suggestion,
            }) => {
                println!(
                    "{} {}: Anchor '{}' not found in {}, left unchanged",
                    "⊘".yellow(),
                    id,
                    anchor,
                    file.display()
                );
                if let Some(line) = suggestion {
                    println!("  Closest line: {}", line.dimmed());
                }
                total_skipped += 1;
            }
            Ok(StepResult::Skipped { reason }) => {
                println!("{} {}: Skipped ({})", "⊘".cyan(), id, reason);
                total_skipped += 1;
            }
            Err(e) => {
                eprintln!("{} {}: Error - {}", "✗".red(), id, e);
                print_error_hints(e);
                total_failed += 1;
            }
        }
    }

    if total_failed > 0 {
        let not_run: Vec<&str> = pipeline()
            .iter()
            .skip(reports.len())
            .map(|step| step.id().as_str())
            .collect();
        if !not_run.is_empty() {
            eprintln!("  Not run: {}", not_run.join(", "));
        }
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} applied", format!("{}", total_applied).green());
    println!(
        "  {} already applied",
        format!("{}", total_already_applied).yellow()
    );
    println!("  {} skipped", format!("{}", total_skipped).cyan());
    println!("  {} failed", format!("{}", total_failed).red());

    if total_failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_status(root: &Path, config: &PluginConfig) -> Result<()> {
    let layout = config.layout(root);

    println!("{}", "Patch Status Report".bold());
    println!("Project: {}", root.display());
    println!();

    let mut applied = Vec::new();
    let mut not_applied = Vec::new();
    let mut skipped = Vec::new();

    // Read-only; stops at the first error like apply would
    for report in check_plugin(&layout, config, today()) {
        let id = report.id;
        match report.result {
            Ok(StepResult::AlreadyApplied { .. }) => applied.push(id),
            Ok(StepResult::Applied { file }) => {
                not_applied.push((id, format!("would change {}", file.display())));
            }
            Ok(StepResult::AnchorMissing { anchor, .. }) => {
                not_applied.push((id, format!("anchor '{}' not found", anchor)));
            }
            Ok(StepResult::Skipped { reason }) => skipped.push((id, reason)),
            Err(e) => not_applied.push((id, e.to_string())),
        }
    }

    if !applied.is_empty() {
        println!(
            "{} {} ({} steps)",
            "✓".green(),
            "APPLIED".green().bold(),
            applied.len()
        );
        for id in &applied {
            println!("  - {}", id);
        }
        println!();
    }

    if !not_applied.is_empty() {
        println!(
            "{} {} ({} steps)",
            "⊙".yellow(),
            "NOT APPLIED".yellow().bold(),
            not_applied.len()
        );
        for (id, reason) in &not_applied {
            println!("  - {} ({})", id, reason.dimmed());
        }
        println!();
    }

    if !skipped.is_empty() {
        println!(
            "{} {} ({} steps)",
            "⊘".cyan(),
            "SKIPPED".cyan().bold(),
            skipped.len()
        );
        for (id, reason) in &skipped {
            println!("  - {} ({})", id, reason.dimmed());
        }
        println!();
    }

    Ok(())
}

fn cmd_list() -> Result<()> {
    for (idx, step) in pipeline().iter().enumerate() {
        println!(
            "{}. {} [{}] {}",
            idx + 1,
            step.id().as_str().bold(),
            step.platform(),
            step.description()
        );
    }
    Ok(())
}
