//! Binary info decoder for RP2040 firmware files
//! Prints the program metadata table embedded in .uf2 and .bin images

use pico_decl::{decode_file, validate, Report};
use serde::Serialize;
use std::env;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt::format::FmtSpan, prelude::*, EnvFilter};

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();

    let format_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::NONE);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(format_layer)
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut to_json = false;
    let mut verify = false;
    let mut files: Vec<PathBuf> = Vec::new();

    for arg in &args[1..] {
        match arg.as_str() {
            "--to-json" => to_json = true,
            "--verify" => verify = true,
            other if other.starts_with('-') => {
                eprintln!("Unknown option: {}", other);
                usage(&args[0]);
            }
            path => files.push(PathBuf::from(path)),
        }
    }

    if files.is_empty() {
        usage(&args[0]);
    }

    // Reject bad paths up front, before any file is processed.
    for file in &files {
        check_input_file(file);
    }

    let mut validation_errors = false;

    for file in &files {
        println!("Processing: {}", file.display());

        let report = match decode_file(file) {
            Ok(report) => report,
            Err(err) => {
                eprintln!("ERROR: Failed to parse {}: {}", file.display(), err);
                continue;
            }
        };

        if to_json {
            println!("{}", to_pretty_json(&report)?);
        }

        if verify {
            let messages = validate::verify_layout(&report);
            for msg in &messages {
                if msg.is_error() {
                    eprintln!("CRITICAL ERROR: {}", msg.message());
                } else {
                    eprintln!("WARNING: {}", msg.message());
                }
            }
            validation_errors |= validate::has_errors(&messages);
        }
    }

    if validation_errors {
        std::process::exit(1);
    }
    Ok(())
}

fn usage(program: &str) -> ! {
    eprintln!(
        "Usage: {} [--to-json] [--verify] <file.uf2|file.bin>...",
        program
    );
    eprintln!("\nOptions:");
    eprintln!("  --to-json    Output parsed data as JSON");
    eprintln!("  --verify     Check block devices against the binary end address");
    std::process::exit(2);
}

fn check_input_file(path: &Path) {
    if !path.exists() {
        eprintln!("{} does not exist!", path.display());
        std::process::exit(2);
    }

    let supported = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("uf2") || ext.eq_ignore_ascii_case("bin"));
    if !supported {
        eprintln!(
            "{}: unsupported format, expected .uf2 or .bin",
            path.display()
        );
        std::process::exit(2);
    }
}

/// Render a report as JSON with four-space indentation.
fn to_pretty_json(report: &Report) -> serde_json::Result<String> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    report.serialize(&mut ser)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
