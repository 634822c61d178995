//! Lint format strings: report the first grammar violation, or the field count and size.
//!
//! Usage:
//!   structpack_lint [OPTIONS] [FORMAT ...]
//!   structpack_lint < formats.txt
//!
//! Each argument is one format string. With no arguments, every non-empty stdin line is one
//! format string (lines starting with `#` are skipped).
//!
//! Options:
//!   --human, -H   Human-readable output
//!   --layout, -l  Print the buffer layout of each valid format
//!
//! Exits with status 1 if any format string is invalid.

use std::io::{self, BufRead};
use structpack::{describe, Format, FormatViolation, PackError};

fn rule_id(err: &PackError) -> &'static str {
    match err {
        PackError::EmptyFormat => "empty-format",
        PackError::InvalidArray { .. } => "array-syntax",
        PackError::IntOverflow { .. } => "count-overflow",
        PackError::InvalidFormat(v) => match v {
            FormatViolation::InvalidCharacter { .. } => "invalid-character",
            FormatViolation::EndianPlacement { .. } => "endian-placement",
            FormatViolation::GroupStart { .. } => "group-start",
            FormatViolation::Terminator { .. } => "terminator",
            FormatViolation::Grouping { .. } => "grouping",
            FormatViolation::NumeralSpacing { .. } => "numeral-spacing",
            FormatViolation::ZeroCount { .. } => "zero-count",
            FormatViolation::Structure { .. } => "structure",
        },
        _ => "other",
    }
}

/// Byte position an error points at, if it carries one.
fn position(err: &PackError) -> Option<usize> {
    match err {
        PackError::InvalidArray { pos } | PackError::IntOverflow { pos } => Some(*pos),
        PackError::InvalidFormat(v) => Some(match v {
            FormatViolation::InvalidCharacter { pos, .. }
            | FormatViolation::EndianPlacement { pos }
            | FormatViolation::GroupStart { pos }
            | FormatViolation::Terminator { pos, .. }
            | FormatViolation::Grouping { pos }
            | FormatViolation::NumeralSpacing { pos }
            | FormatViolation::ZeroCount { pos }
            | FormatViolation::Structure { pos } => *pos,
        }),
        _ => None,
    }
}

#[derive(Clone, Copy)]
enum OutputStyle {
    Compact,
    Human,
}

/// Lint one format string; returns false if it is invalid.
fn lint_one(source: &str, fmt: &str, style: OutputStyle, layout: bool) -> anyhow::Result<bool> {
    match Format::new(fmt) {
        Ok(format) => {
            match style {
                OutputStyle::Compact => println!(
                    "{}: ok: {} fields, {} bytes",
                    source,
                    format.field_count(),
                    format.packed_size()
                ),
                OutputStyle::Human => {
                    println!("  {} {:?}", source, fmt);
                    println!("    {} fields, {} bytes", format.field_count(), format.packed_size());
                }
            }
            if layout {
                print!("{}", describe(fmt)?);
            }
            Ok(true)
        }
        Err(err) => {
            let col = position(&err).map_or(0, |p| p + 1);
            match style {
                OutputStyle::Compact => println!("{}:{}: error: {} [{}]", source, col, err, rule_id(&err)),
                OutputStyle::Human => {
                    println!("  {}", source);
                    println!("    {}", fmt);
                    if let Some(p) = position(&err) {
                        println!("    {}^", " ".repeat(p));
                    }
                    println!("    {}", err);
                    println!("    rule: {}", rule_id(&err));
                }
            }
            Ok(false)
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let style = if let Some(pos) = args.iter().position(|a| a == "--human" || a == "-H") {
        args.remove(pos);
        OutputStyle::Human
    } else {
        OutputStyle::Compact
    };
    let layout = if let Some(pos) = args.iter().position(|a| a == "--layout" || a == "-l") {
        args.remove(pos);
        true
    } else {
        false
    };

    let mut total_errors = 0usize;
    let mut total = 0usize;

    if args.is_empty() {
        for (n, line) in io::stdin().lock().lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() || line.trim_start().starts_with('#') {
                continue;
            }
            total += 1;
            if !lint_one(&format!("<stdin>:{}", n + 1), &line, style, layout)? {
                total_errors += 1;
            }
        }
    } else {
        for (n, fmt) in args.iter().enumerate() {
            total += 1;
            if !lint_one(&format!("arg{}", n + 1), fmt, style, layout)? {
                total_errors += 1;
            }
        }
    }

    if total_errors > 0 {
        eprintln!("lint: {} of {} format string(s) invalid", total_errors, total);
        std::process::exit(1);
    }
    Ok(())
}
