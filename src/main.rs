// src/main.rs

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use sitefold::{
    parse_version_list, Options, RelocationReport, Relocator, ScanResult, Scanner, Version,
};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "sitefold")]
#[command(author, version, about = "Normalize and merge staged Python package trees", long_about = None)]
struct Cli {
    /// TOML file with default options
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging and diffs for unresolved conflicts
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a package tree and print what was found as JSON
    Scan(PackageArgs),
    /// Fold version-specific site directories into the shared one
    Relocate(PackageArgs),
    /// Scan, then relocate
    Process(PackageArgs),
}

#[derive(Args)]
struct PackageArgs {
    /// Staged package directory (e.g. debian/python3-foo)
    package_dir: PathBuf,

    /// Binary package name (default: last component of the directory)
    #[arg(short, long)]
    package: Option<String>,

    /// Interpreter versions to relocate, comma separated (e.g. 3.11,3.12)
    #[arg(long)]
    versions: Option<String>,

    /// Leave binary extension names alone
    #[arg(long)]
    no_ext_rename: bool,

    /// Do not rewrite script shebangs
    #[arg(long)]
    no_shebang_rewrite: bool,

    /// Treat the package as a debug build
    #[arg(long)]
    debug: bool,

    /// Host multiarch triplet (default: $DEB_HOST_MULTIARCH)
    #[arg(long)]
    multiarch: Option<String>,

    /// Version for files whose location carries none
    #[arg(long)]
    default_version: Option<String>,
}

impl PackageArgs {
    fn package_name(&self) -> Result<String> {
        if let Some(name) = &self.package {
            return Ok(name.clone());
        }
        self.package_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| {
                format!(
                    "Cannot derive a package name from {}",
                    self.package_dir.display()
                )
            })
    }

    /// Fold command-line flags over the file options
    fn apply(&self, options: &mut Options) -> Result<()> {
        options.no_ext_rename |= self.no_ext_rename;
        options.no_shebang_rewrite |= self.no_shebang_rewrite;
        options.debug |= self.debug;
        if let Some(triplet) = &self.multiarch {
            options.multiarch = Some(triplet.clone());
        }
        if let Some(v) = &self.default_version {
            options.default_version =
                Some(Version::parse(v).with_context(|| format!("Invalid --default-version {}", v))?);
        }
        if let Some(list) = &self.versions {
            let versions = parse_version_list(list).context("Invalid --versions")?;
            options.fill_default_version(&versions);
        }
        Ok(())
    }

    fn versions(&self, options: &Options) -> Result<Vec<Version>> {
        let versions = match &self.versions {
            Some(list) => parse_version_list(list).context("Invalid --versions")?,
            None => options.default_version.into_iter().collect(),
        };
        if versions.is_empty() {
            bail!("No interpreter versions given; use --versions or --default-version");
        }
        Ok(versions)
    }
}

fn load_options(config: Option<&Path>, verbose: bool, args: &PackageArgs) -> Result<Options> {
    let mut options = match config {
        Some(path) => Options::load(path)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?,
        None => Options::default(),
    };
    options.verbose |= verbose;
    args.apply(&mut options)?;
    Ok(options)
}

fn run_scan(args: &PackageArgs, options: &Options) -> Result<ScanResult> {
    let package = args.package_name()?;
    let interpreter = options.interpreter();
    let classifier = options.classifier(&args.package_dir, &package);
    let scanner = Scanner::from_options(&interpreter, &classifier, options)?;
    scanner
        .scan()
        .with_context(|| format!("Failed to scan {}", args.package_dir.display()))
}

fn run_relocate(args: &PackageArgs, options: &Options) -> Result<RelocationReport> {
    let package = args.package_name()?;
    let versions = args.versions(options)?;
    let interpreter = options.interpreter();
    let classifier = options.classifier(&args.package_dir, &package);
    Relocator::from_options(&interpreter, &classifier, options)
        .relocate(&versions)
        .with_context(|| format!("Failed to relocate {}", args.package_dir.display()))
}

fn print_scan(result: &ScanResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result).context("Failed to serialize scan result")?;
    println!("{}", json);
    Ok(())
}

fn print_report(report: &RelocationReport) {
    println!(
        "{} moved, {} identical removed, {} merged, {} collision(s)",
        report.moved.len(),
        report.removed_identical.len(),
        report.merged.len(),
        report.conflicts.len()
    );
    for conflict in &report.conflicts {
        println!("  {}", conflict);
        if let Some(diff) = &conflict.diff {
            for line in diff.lines() {
                println!("    {}", line);
            }
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Scan(args) => {
            let options = load_options(cli.config.as_deref(), cli.verbose, args)?;
            let result = run_scan(args, &options)?;
            print_scan(&result)
        }
        Commands::Relocate(args) => {
            let options = load_options(cli.config.as_deref(), cli.verbose, args)?;
            let report = run_relocate(args, &options)?;
            print_report(&report);
            Ok(())
        }
        Commands::Process(args) => {
            let options = load_options(cli.config.as_deref(), cli.verbose, args)?;
            let result = run_scan(args, &options)?;
            info!(
                "Scan found {} extension version(s), {} private dir(s)",
                result.stats.ext_versions.len(),
                result.private_dirs.len()
            );
            let report = run_relocate(args, &options)?;
            print_scan(&result)?;
            print_report(&report);
            Ok(())
        }
    }
}
