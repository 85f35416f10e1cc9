//! Lint BFIR documents: bit-width overflow, out-of-range enum values,
//! unreachable fields, missing descriptions.
//!
//! Usage:
//!   bfir_lint [OPTIONS] <input.json> [...]
//!
//! Options:
//!   --human, -H  Human-readable output
//!
//! Exit code 1 if any error-level findings.

use edidforge::lint::{lint, LintMessage, LintRule, Severity};
use edidforge::ResolvedDocument;
use std::path::Path;

fn rule_id(rule: LintRule) -> &'static str {
    match rule {
        LintRule::BitWidthOverflow => "bit-width-overflow",
        LintRule::BitWidthGap => "bit-width-gap",
        LintRule::EnumValueRange => "enum-value-range",
        LintRule::UnreachableField => "unreachable-field",
        LintRule::EmptyStruct => "empty-struct",
        LintRule::MissingDescription => "missing-description",
    }
}

#[derive(Clone, Copy)]
enum OutputStyle {
    Compact,
    Human,
}

fn print_message(path: &str, m: &LintMessage, style: OutputStyle) {
    let severity_str = match m.severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
    };
    match style {
        OutputStyle::Compact => {
            println!(
                "{}:{}: {}: {} [{}]",
                path,
                m.field_id,
                severity_str,
                m.message,
                rule_id(m.rule)
            );
        }
        OutputStyle::Human => {
            println!("  {} field `{}`: {}", path, m.field_id, m.message);
            println!("    rule: {}", rule_id(m.rule));
        }
    }
}

fn main() -> anyhow::Result<()> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let style = if let Some(pos) = args.iter().position(|a| a == "--human" || a == "-H") {
        args.remove(pos);
        OutputStyle::Human
    } else {
        OutputStyle::Compact
    };
    if args.is_empty() {
        eprintln!("usage: bfir_lint [OPTIONS] <input.json> [...]");
        std::process::exit(2);
    }

    let mut has_error = false;
    let mut total_warnings = 0usize;
    let mut total_errors = 0usize;

    for path in &args {
        let path = Path::new(path);
        let display_path = path.display().to_string();
        let json = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("{}: {}", display_path, e);
                has_error = true;
                continue;
            }
        };
        let resolved = match edidforge::parse_str(&json).map_err(anyhow::Error::from).and_then(
            |doc| ResolvedDocument::resolve(doc).map_err(anyhow::Error::from),
        ) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("{}: {}", display_path, e);
                has_error = true;
                continue;
            }
        };
        let messages = lint(&resolved);
        for m in &messages {
            match m.severity {
                Severity::Error => total_errors += 1,
                Severity::Warning => total_warnings += 1,
            }
            print_message(&display_path, m, style);
        }
        if messages.iter().any(|m| m.severity == Severity::Error) {
            has_error = true;
        }
    }

    if total_errors > 0 || total_warnings > 0 {
        eprintln!("lint: {} error(s), {} warning(s)", total_errors, total_warnings);
    }
    if has_error {
        std::process::exit(1);
    }
    Ok(())
}
