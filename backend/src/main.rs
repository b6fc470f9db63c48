//! Rosterload CLI - roster template and offline validation tooling
//!
//! # Commands
//!
//! ```bash
//! rosterload template --kind delegate     # Print the CSV template
//! rosterload parse roster.csv             # Parse a CSV file to JSON
//! rosterload check --kind staff roster.csv --grouping "Franklin County"
//! ```
//!
//! The CLI never touches storage: preview, import and assignment run behind
//! the library API with a real backend. `check` is the offline half of the
//! pipeline - the same parser and row validators the server runs.

use clap::{Parser, Subcommand};
use rosterload::models::GroupingRef;
use rosterload::{
    parse_file_auto, template_for, validate_delegate_row, validate_staff_row, ParticipantKind,
    ReferenceMaps,
};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "rosterload")]
#[command(about = "Roster templates and offline CSV validation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the CSV template for a roster kind
    Template {
        /// Roster kind: delegate or staff
        #[arg(short, long)]
        kind: String,
    },

    /// Parse a CSV file and output its rows as JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a CSV file offline and report issues
    Check {
        /// Roster kind: delegate or staff
        #[arg(short, long)]
        kind: String,

        /// Input CSV file
        input: PathBuf,

        /// Active grouping names for staff checks (repeatable)
        #[arg(short, long = "grouping")]
        groupings: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Template { kind } => cmd_template(&kind),
        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),
        Commands::Check {
            kind,
            input,
            groupings,
        } => cmd_check(&kind, &input, &groupings),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn parse_kind(kind: &str) -> Result<ParticipantKind, Box<dyn std::error::Error>> {
    ParticipantKind::from_code(kind)
        .ok_or_else(|| format!("unknown roster kind '{}' (expected delegate or staff)", kind).into())
}

fn cmd_template(kind: &str) -> Result<(), Box<dyn std::error::Error>> {
    let kind = parse_kind(kind)?;
    print!("{}", template_for(kind));
    Ok(())
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Parsing CSV: {}", input.display());

    let parsed = parse_file_auto(input)?;
    eprintln!("   Encoding: {}", parsed.encoding);
    eprintln!(
        "   Delimiter: '{}'",
        match parsed.delimiter {
            '\t' => "\\t".to_string(),
            c => c.to_string(),
        }
    );
    eprintln!("   Columns: {}", parsed.table.headers.join(", "));
    eprintln!("   Parsed {} rows", parsed.table.rows.len());

    let json = serde_json::to_string_pretty(&parsed.table.rows)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_check(
    kind: &str,
    input: &Path,
    groupings: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let kind = parse_kind(kind)?;
    eprintln!("Checking {} roster: {}", kind.as_code(), input.display());

    let parsed = parse_file_auto(input)?;
    if parsed.table.is_empty() {
        return Err("no data rows found".into());
    }

    let mut refs = ReferenceMaps::default();
    for name in groupings {
        refs.push_grouping(GroupingRef {
            grouping_id: Uuid::new_v4(),
            name: name.clone(),
            is_assignment_level: true,
        });
    }

    let mut valid = 0;
    let mut errors = 0;
    let mut warnings = 0;

    for row in &parsed.table.rows {
        let result = match kind {
            ParticipantKind::Delegate => validate_delegate_row(row),
            ParticipantKind::Staff => validate_staff_row(row, &refs),
        };
        if result.valid {
            valid += 1;
        }
        for issue in &result.errors {
            errors += 1;
            eprintln!("   row {:>3}  {}: {}", issue.row, issue.field, issue.message);
        }
        for issue in &result.warnings {
            warnings += 1;
            eprintln!("   row {:>3}  {} (warning): {}", issue.row, issue.field, issue.message);
        }
    }

    eprintln!(
        "\nResults: {} rows, {} valid, {} errors, {} warnings",
        parsed.table.rows.len(),
        valid,
        errors,
        warnings
    );

    if errors > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
