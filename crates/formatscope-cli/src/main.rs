//! formatscope CLI - detect, parse and validate structured text

mod json;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use formatscope_core::{
    analyze_content, analyze_file, analyze_project, file_utils::safe_read_file, BatchOptions,
    DetectOptions, FileReport, FormatDetector, FormatRegistry, ParseConfig, ParseOptions,
    Severity, ValidationError, ValidationProfile,
};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "formatscope")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "Detect, parse and validate structured text",
    long_about = "Work out whether a file is JSON, CSV or XML, parse it into a typed document and report validation findings.\n\nFormats: JSON • CSV • XML"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Validation profile, replacing the one from the config file
    #[arg(short, long, global = true, value_enum)]
    profile: Option<ProfileArg>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the format of a file
    Detect {
        file: PathBuf,

        /// MIME type hint (e.g., application/json)
        #[arg(long)]
        mime: Option<String>,

        /// Skip the detection cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Parse a file and print the document summary and findings
    Parse {
        file: PathBuf,

        /// Parse with this format instead of detecting it
        #[arg(long = "as", value_name = "FORMAT")]
        as_format: Option<String>,
    },

    /// Validate a file or every file under a directory
    Validate {
        /// Path to validate
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Strict mode (treat warnings as errors)
        #[arg(short, long)]
        strict: bool,
    },

    /// Initialize config file
    Init {
        /// Output path for config
        #[arg(default_value = ".formatscope.toml")]
        output: PathBuf,
    },

    /// List validation codes
    Codes {
        /// Only codes for this format (json, csv, xml)
        #[arg(long = "for", value_name = "FORMAT")]
        for_format: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ProfileArg {
    Strict,
    Lenient,
    Custom,
}

impl From<ProfileArg> for ValidationProfile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Strict => ValidationProfile::Strict,
            ProfileArg::Lenient => ValidationProfile::Lenient,
            ProfileArg::Custom => ValidationProfile::Custom,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Commands::Detect {
            file,
            mime,
            no_cache,
        } => detect_command(file, mime.as_deref(), *no_cache, &cli),
        Commands::Parse { file, as_format } => parse_command(file, as_format.as_deref(), &cli),
        Commands::Validate { path, strict } => validate_command(path, *strict, &cli),
        Commands::Init { output } => init_command(output, &cli),
        Commands::Codes { for_format } => codes_command(for_format.as_deref(), &cli),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Resolve the effective config: file first, then the `--profile` override
fn load_config(cli: &Cli) -> anyhow::Result<ParseConfig> {
    let config = match &cli.config {
        Some(path) => ParseConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ParseConfig::default(),
    };

    Ok(match cli.profile {
        Some(profile) => ParseConfig {
            disabled_codes: config.disabled_codes,
            ..ParseConfig::for_profile(profile.into())
        },
        None => config,
    })
}

/// The composition root: one registry and one detector per run
fn build_detector() -> FormatDetector {
    FormatDetector::new(Arc::new(FormatRegistry::with_defaults()))
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn detect_command(
    file: &Path,
    mime: Option<&str>,
    no_cache: bool,
    cli: &Cli,
) -> anyhow::Result<bool> {
    let content = safe_read_file(file)?;
    let detector = build_detector();
    let options = DetectOptions {
        filename: file_name(file),
        mime_type: mime,
        use_cache: !no_cache,
    };
    let detection = detector.detect(&content, &options);

    if cli.format == OutputFormat::Json {
        print_json(&json::detection_to_json(file, &detection))?;
        return Ok(!detection.is_unknown());
    }

    if detection.is_unknown() {
        println!(
            "{} {}: format not recognized",
            "?".yellow().bold(),
            file.display()
        );
    } else {
        println!(
            "{} {}: {} ({}% confidence)",
            "✓".green().bold(),
            file.display(),
            detection.format.cyan().bold(),
            detection.confidence
        );
    }
    for evidence in &detection.evidence {
        println!("  {} {}", "-".dimmed(), evidence);
    }

    Ok(!detection.is_unknown())
}

fn parse_command(file: &Path, as_format: Option<&str>, cli: &Cli) -> anyhow::Result<bool> {
    let config = load_config(cli)?;
    let content = safe_read_file(file)?;
    let detector = build_detector();

    let (format, confidence, result) = match as_format {
        Some(format) => {
            let options = ParseOptions {
                format: Some(format),
                filename: file_name(file),
                mime_type: None,
            };
            let result = detector.registry().parse(&content, &options, &config);
            (format.to_ascii_lowercase(), None, result)
        }
        None => {
            let analysis = analyze_content(&content, file_name(file), &detector, &config);
            (
                analysis.detection.format,
                Some(analysis.detection.confidence),
                analysis.result,
            )
        }
    };

    if cli.format == OutputFormat::Json {
        print_json(&json::parse_to_json(file, &format, confidence, &result))?;
        return Ok(result.is_valid);
    }

    let heading = match confidence {
        Some(confidence) => format!("{} ({}% confidence)", format, confidence),
        None => format,
    };
    println!("{} {} as {}", "Parsing:".cyan().bold(), file.display(), heading);
    println!();

    for error in &result.errors {
        print_finding(&file.display().to_string(), error, cli.verbose);
    }

    match &result.data {
        Some(document) => println!("{} {}", "✓".green().bold(), document.summary()),
        None => println!("{}", "✗ Parse failed".red().bold()),
    }

    Ok(result.is_valid)
}

fn validate_command(path: &Path, strict: bool, cli: &Cli) -> anyhow::Result<bool> {
    let config = load_config(cli)?;
    let detector = build_detector();

    let reports = if path.is_dir() {
        analyze_project(path, &detector, &config, &BatchOptions::default())?
    } else {
        let analysis = analyze_file(path, &detector, &config)?;
        vec![FileReport::from_analysis(path.to_path_buf(), analysis)]
    };

    let count = |severity: Severity| {
        reports
            .iter()
            .flat_map(|r| &r.errors)
            .filter(|e| e.severity == severity)
            .count()
    };
    let errors = count(Severity::Error);
    let warnings = count(Severity::Warning);
    let infos = count(Severity::Info);
    let passed = errors == 0 && !(strict && warnings > 0);

    if cli.format == OutputFormat::Json {
        print_json(&json::reports_to_json(&reports, path))?;
        return Ok(passed);
    }

    println!("{} {}", "Validating:".cyan().bold(), path.display());
    println!();

    if reports.iter().all(|r| r.errors.is_empty()) {
        println!(
            "{} ({} {} checked)",
            "✓ No issues found".green().bold(),
            reports.len(),
            if reports.len() == 1 { "file" } else { "files" }
        );
        return Ok(true);
    }

    for report in &reports {
        let location = json::path_to_string(&report.path, path);
        for error in &report.errors {
            print_finding(&location, error, cli.verbose);
        }
    }

    println!("{}", "─".repeat(60).dimmed());
    println!(
        "Found {} {}, {} {} in {} {}",
        errors,
        if errors == 1 { "error" } else { "errors" },
        warnings,
        if warnings == 1 { "warning" } else { "warnings" },
        reports.len(),
        if reports.len() == 1 { "file" } else { "files" }
    );
    if infos > 0 {
        println!("  {} info messages", infos);
    }

    Ok(passed)
}

fn print_finding(location: &str, error: &ValidationError, verbose: bool) {
    let level = match error.severity {
        Severity::Error => "error".red().bold(),
        Severity::Warning => "warning".yellow().bold(),
        Severity::Info => "info".blue().bold(),
    };
    let position = match (error.line, error.column) {
        (Some(line), Some(column)) => format!(":{}:{}", line, column),
        (Some(line), None) => format!(":{}", line),
        _ => String::new(),
    };

    println!(
        "{} {} [{}]: {}",
        format!("{}{}", location, position).dimmed(),
        level,
        error.code,
        error.message
    );
    if verbose {
        if let Some(summary) = formatscope_rules::get_code_summary(&error.code) {
            println!("  {} {}", "code:".dimmed(), summary.dimmed());
        }
    }
    if let Some(suggestion) = &error.suggestion {
        println!("  {} {}", "help:".cyan(), suggestion);
    }
}

fn init_command(output: &Path, cli: &Cli) -> anyhow::Result<bool> {
    let config = match cli.profile {
        Some(profile) => ParseConfig::for_profile(profile.into()),
        None => ParseConfig::default(),
    };
    let toml_content = toml::to_string_pretty(&config)?;

    std::fs::write(output, toml_content)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!(
        "{} Created config file: {}",
        "✓".green().bold(),
        output.display()
    );

    Ok(true)
}

fn codes_command(for_format: Option<&str>, cli: &Cli) -> anyhow::Result<bool> {
    let ids: Vec<&str> = match for_format {
        Some(format) => formatscope_rules::codes_for_format(format),
        None => formatscope_rules::CODES_DATA.iter().map(|(id, _)| *id).collect(),
    };

    if cli.format == OutputFormat::Json {
        let entries: Vec<serde_json::Value> = ids
            .iter()
            .map(|id| {
                serde_json::json!({
                    "code": id,
                    "format": formatscope_rules::get_code_format(id),
                    "category": formatscope_rules::get_code_category(id),
                    "severity": formatscope_rules::get_code_severity(id),
                    "summary": formatscope_rules::get_code_summary(id),
                })
            })
            .collect();
        print_json(&entries)?;
        return Ok(true);
    }

    for id in &ids {
        let severity = formatscope_rules::get_code_severity(id).unwrap_or("info");
        let padded = format!("{:<8}", severity);
        let severity = match severity {
            "error" => padded.red(),
            "warning" => padded.yellow(),
            _ => padded.blue(),
        };
        println!(
            "{} {:<8} {} {}",
            format!("{:<28}", id).bold(),
            formatscope_rules::get_code_format(id).unwrap_or("-"),
            severity,
            formatscope_rules::get_code_summary(id).unwrap_or_default()
        );
    }
    println!();
    println!("{} codes", ids.len());

    Ok(true)
}
