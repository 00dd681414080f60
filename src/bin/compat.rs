//! Schema Compatibility CLI
//!
//! Compares two versions of a schema corpus and gates CI on breaking changes.
//!
//! Usage:
//!   schema-compat check --old v1.0.0 --new . --format comment
//!   schema-compat bump --old v1.0.0 --new . --current 1.0.0 --proposed 1.1.0
//!   schema-compat lint ./schemas
//!
//! Exit codes: 0 compatible, 1 breaking change / failed gate, 2 usage or load error.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use schema_compat::config::LoaderConfig;
use schema_compat::report::{render_comment, render_report, render_summary};
use schema_compat::{
    check_bump, classify, BumpLevel, Classification, CompatConfig, CompatError,
    CompatibilityChecker, ContentPolicy, ContractVersion, Corpus, OutputFormat,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-compat")]
#[command(about = "Detect breaking changes between two versions of a JSON Schema contract set")]
#[command(version)]
struct Cli {
    /// Configuration file layered over the default locations
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two versions and report every change
    Check {
        #[command(flatten)]
        sources: Sources,

        /// Output format (defaults to the configured one)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Verify that a proposed version bump matches the detected changes
    Bump {
        #[command(flatten)]
        sources: Sources,

        /// Currently released version
        #[arg(long)]
        current: String,

        /// Version proposed for this release
        #[arg(long)]
        proposed: String,
    },

    /// Check one version of the corpus against the content policy
    Lint {
        /// Directory or git revision
        source: String,

        /// Repository used to resolve git revisions
        #[arg(long, default_value = ".")]
        repo: PathBuf,
    },

    /// Write the effective default configuration to a file
    InitConfig {
        #[arg(default_value = "schema-compat.toml")]
        path: String,
    },
}

/// Old/new corpus sources: directories, or git revisions inside `--repo`
#[derive(clap::Args)]
struct Sources {
    /// Old version (directory or git revision)
    #[arg(long)]
    old: String,

    /// New version (directory or git revision)
    #[arg(long, default_value = ".")]
    new: String,

    /// Repository used to resolve git revisions
    #[arg(long, default_value = ".")]
    repo: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(2);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let config = CompatConfig::load_from(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Check { sources, format } => {
            let classification = compare_sources(&sources, &config)?;

            let output = match format.unwrap_or(config.report.format) {
                OutputFormat::Summary => render_summary(&classification)?,
                OutputFormat::Report => render_report(&classification),
                OutputFormat::Comment => render_comment(&classification, config.report.comment_limit),
            };
            println!("{}", output);

            if classification.has_breaking {
                eprintln!(
                    "\n❌ BREAKING CHANGES DETECTED - {} breaking of {} changes",
                    classification.breaking.len(),
                    classification.total
                );
                Ok(1)
            } else {
                eprintln!(
                    "\n✅ No breaking changes detected ({} changes)",
                    classification.total
                );
                Ok(0)
            }
        }

        Commands::Bump {
            sources,
            current,
            proposed,
        } => {
            let current = ContractVersion::parse(&current)
                .with_context(|| format!("parsing current version '{}'", current))?;
            let proposed = ContractVersion::parse(&proposed)
                .with_context(|| format!("parsing proposed version '{}'", proposed))?;
            let classification = compare_sources(&sources, &config)?;
            let required = BumpLevel::required_for(&classification);

            match check_bump(&current, &proposed, &classification) {
                Ok(level) => {
                    println!(
                        "✅ {} -> {} is a {} bump (changes require {})",
                        current, proposed, level, required
                    );
                    Ok(0)
                }
                Err(CompatError::InsufficientBump { required, proposed: level }) => {
                    println!(
                        "❌ {} -> {} is a {} bump, but the changes require {}",
                        current, proposed, level, required
                    );
                    println!("   Suggested version: {}", current.bump(required));
                    Ok(1)
                }
                Err(e) => Err(e.into()),
            }
        }

        Commands::Lint { source, repo } => {
            let corpus = load_source(&source, &repo, &config.loader)?;
            let policy = ContentPolicy::from_config(&config.policy)?;
            let report = policy.check(&corpus);

            println!("🔍 Checked {} schema documents", report.checked);
            if report.is_clean() {
                println!("✅ All content policy checks passed");
                Ok(0)
            } else {
                println!("\n❌ {} policy violations\n", report.violations.len());
                for violation in &report.violations {
                    println!("  • [{}] {}: {}", violation.code, violation.file, violation.message);
                }
                Ok(1)
            }
        }

        Commands::InitConfig { path } => {
            config.save(&path).with_context(|| format!("writing {}", path))?;
            println!("📝 Wrote configuration to {}", path);
            Ok(0)
        }
    }
}

fn compare_sources(sources: &Sources, config: &CompatConfig) -> anyhow::Result<Classification> {
    eprintln!("🔍 Comparing schemas...");
    eprintln!("   Old: {}", sources.old);
    eprintln!("   New: {}\n", sources.new);

    let old = load_source(&sources.old, &sources.repo, &config.loader)?;
    let new = load_source(&sources.new, &sources.repo, &config.loader)?;

    let checker = CompatibilityChecker::from_config(&config.engine);
    Ok(classify(&checker.compare(&old, &new)))
}

/// A directory is read from disk; anything else is resolved as a git revision
fn load_source(source: &str, repo: &Path, loader: &LoaderConfig) -> anyhow::Result<Corpus> {
    let path = Path::new(source);
    let corpus = if path.is_dir() {
        Corpus::load_dir(&loader.source_dir(path), loader)
    } else {
        Corpus::load_git(repo, source, loader.schemas_subdir.as_deref(), loader).with_context(|| {
            format!(
                "'{}' is neither a directory nor a git revision of {}",
                source,
                repo.display()
            )
        })?
    };

    for warning in corpus.warnings() {
        eprintln!("⚠️  Warning: could not load {}: {}", warning.path, warning.reason);
    }
    Ok(corpus)
}
