#![forbid(unsafe_code)]

//! Swimflow CLI - work with swimlane process markdown.
//!
//! # Commands
//!
//! - `parse`: Output the parsed process (summary or full JSON)
//! - `export`: Turn process JSON back into markdown
//! - `fmt`: Rewrite markdown in canonical form
//! - `validate`: Check a process against the structural rules
//! - `sample`: Print the bundled sample document

mod config;

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sf_core::{BusinessProcess, DialectConfig, Diagnostic, Locale, UuidGenerator};
use sf_export::export_with;
use sf_parser::{ParseResult, SAMPLE_MARKDOWN, parse_summary_json, parse_with};
use sf_validate::validate;
use tracing::{info, warn};

use config::resolve_dialect;

/// Swimflow CLI - parse, format, export and validate swimlane process markdown.
#[derive(Debug, Parser)]
#[command(
    name = "sf-cli",
    version,
    about = "Swimflow CLI - parse, format, export and validate swimlane process markdown",
    long_about = "Reads and writes the '# BusinessProcessName' markdown dialect used by the\n\
        swimlane process designer.\n\n\
        Parsing is lenient; use `validate` for strict structural checks."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging (can be repeated for more detail: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// TOML file with locale and placeholder overrides
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Placeholder language (overrides the config file)
    #[arg(long, value_enum, global = true)]
    locale: Option<LocaleArg>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse process markdown and output JSON.
    Parse {
        /// Input file path, "-" for stdin, or inline markdown.
        #[arg(default_value = "-")]
        input: String,

        /// Output the full process (default is a summary)
        #[arg(long)]
        full: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Convert process JSON into markdown.
    Export {
        /// Input file path, "-" for stdin, or inline JSON.
        #[arg(default_value = "-")]
        input: String,

        /// Output file path. If omitted, writes to stdout.
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Parse and re-export markdown in canonical form.
    Fmt {
        /// Input file path, "-" for stdin, or inline markdown.
        #[arg(default_value = "-")]
        input: String,

        /// Output file path. If omitted, writes to stdout.
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Validate process markdown and report diagnostics.
    Validate {
        /// Input file path, "-" for stdin, or inline markdown.
        #[arg(default_value = "-")]
        input: String,

        /// Output as JSON (structured diagnostics)
        #[arg(long)]
        json: bool,

        /// Exit with non-zero status on warnings (not just errors)
        #[arg(long)]
        strict: bool,
    },

    /// Print the bundled sample document.
    Sample {
        /// Output file path. If omitted, writes to stdout.
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LocaleArg {
    En,
    Ja,
}

impl From<LocaleArg> for Locale {
    fn from(arg: LocaleArg) -> Self {
        match arg {
            LocaleArg::En => Self::En,
            LocaleArg::Ja => Self::Ja,
        }
    }
}

/// Result of validating a process.
#[derive(Debug, Serialize)]
struct ValidateResult {
    valid: bool,
    title: String,
    node_count: usize,
    edge_count: usize,
    parse_diagnostics: Vec<Diagnostic>,
    diagnostics: Vec<Diagnostic>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    let dialect = resolve_dialect(cli.config.as_deref(), cli.locale.map(Locale::from))?;

    match cli.command {
        Command::Parse {
            input,
            full,
            pretty,
        } => cmd_parse(&input, &dialect, full, pretty),

        Command::Export { input, output } => cmd_export(&input, &dialect, output.as_deref()),

        Command::Fmt { input, output } => cmd_fmt(&input, &dialect, output.as_deref()),

        Command::Validate {
            input,
            json,
            strict,
        } => cmd_validate(&input, &dialect, json, strict),

        Command::Sample { output } => write_output(output.as_deref(), SAMPLE_MARKDOWN),
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .without_time()
        .try_init();
}

fn load_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        Ok(buffer)
    } else if Path::new(input).exists() {
        std::fs::read_to_string(input).context(format!("Failed to read file: {input}"))
    } else {
        // Treat as inline text
        Ok(input.to_string())
    }
}

fn write_output(output: Option<&str>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content).context(format!("Failed to write to: {path}"))?;
            info!("Wrote output to: {path}");
        }
        None => {
            io::stdout()
                .write_all(content.as_bytes())
                .context("Failed to write to stdout")?;
        }
    }
    Ok(())
}

fn parse_source(input: &str, dialect: &DialectConfig) -> Result<ParseResult> {
    let source = load_input(input)?;
    let parsed = parse_with(&source, dialect, &mut UuidGenerator);
    for diagnostic in &parsed.diagnostics {
        if diagnostic.is_warning() {
            warn!("Parse warning: {}", diagnostic.message);
        }
    }
    Ok(parsed)
}

// =============================================================================
// Command: parse
// =============================================================================

fn cmd_parse(input: &str, dialect: &DialectConfig, full: bool, pretty: bool) -> Result<()> {
    let parsed = parse_source(input, dialect)?;

    let output = if full {
        if pretty {
            serde_json::to_string_pretty(&parsed.process)?
        } else {
            serde_json::to_string(&parsed.process)?
        }
    } else if pretty {
        let value: serde_json::Value = serde_json::from_str(&parse_summary_json(&parsed))?;
        serde_json::to_string_pretty(&value)?
    } else {
        parse_summary_json(&parsed)
    };

    println!("{output}");
    Ok(())
}

// =============================================================================
// Command: export / fmt
// =============================================================================

fn cmd_export(input: &str, dialect: &DialectConfig, output: Option<&str>) -> Result<()> {
    let source = load_input(input)?;
    let process: BusinessProcess =
        serde_json::from_str(&source).context("Input is not a valid process JSON document")?;
    write_output(output, &export_with(&process, dialect))
}

fn cmd_fmt(input: &str, dialect: &DialectConfig, output: Option<&str>) -> Result<()> {
    let parsed = parse_source(input, dialect)?;
    write_output(output, &export_with(&parsed.process, dialect))
}

// =============================================================================
// Command: validate
// =============================================================================

fn cmd_validate(input: &str, dialect: &DialectConfig, json_output: bool, strict: bool) -> Result<()> {
    let parsed = parse_source(input, dialect)?;
    let report = validate(&parsed.process);

    let valid = report.is_valid(strict) && (!strict || !parsed.has_warnings());

    let result = ValidateResult {
        valid,
        title: parsed.process.title.clone(),
        node_count: parsed.process.nodes.len(),
        edge_count: parsed.process.edges.len(),
        parse_diagnostics: parsed.diagnostics,
        diagnostics: report.diagnostics,
    };

    if json_output {
        let output = serde_json::to_string_pretty(&result)?;
        println!("{output}");
    } else {
        print_validation(&result);
    }

    if !result.valid {
        std::process::exit(1);
    }

    Ok(())
}

fn print_validation(result: &ValidateResult) {
    if result.valid {
        println!("✓ Valid process: {}", result.title);
    } else {
        println!("✗ Invalid process: {}", result.title);
    }

    println!("  Steps: {}", result.node_count);
    println!("  Connections: {}", result.edge_count);

    let (errors, warnings): (Vec<&Diagnostic>, Vec<&Diagnostic>) = result
        .diagnostics
        .iter()
        .filter(|d| d.is_error() || d.is_warning())
        .partition(|d| d.is_error());

    if !errors.is_empty() {
        println!("\nErrors:");
        for diagnostic in errors {
            print_diagnostic(diagnostic);
        }
    }

    if !warnings.is_empty() {
        println!("\nWarnings:");
        for diagnostic in warnings {
            print_diagnostic(diagnostic);
        }
    }

    let skipped: Vec<&Diagnostic> = result
        .parse_diagnostics
        .iter()
        .filter(|d| d.is_warning())
        .collect();
    if !skipped.is_empty() {
        println!("\nParse warnings:");
        for diagnostic in skipped {
            print_diagnostic(diagnostic);
        }
    }
}

fn print_diagnostic(diagnostic: &Diagnostic) {
    let code = diagnostic
        .rule_id
        .as_deref()
        .unwrap_or(diagnostic.category.as_str());
    println!("  [{code}] {}", diagnostic.message);
    if let Some(suggestion) = &diagnostic.suggestion {
        println!("       → {suggestion}");
    }
}
