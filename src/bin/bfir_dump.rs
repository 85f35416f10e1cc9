//! Dump a binary blob field by field, as described by a BFIR document.
//!
//! Usage:
//!   bfir_dump [--hex] <input.json> <data-file>
//!
//! Options:
//!   --hex, -x   Treat the data file as a hex dump text (pairs of hex
//!               digits anywhere on a line) instead of raw bytes.
//!
//! The document is schema-validated and resolved before the dump; fields
//! whose offsets fall outside the input are reported inline.

use anyhow::Context;
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let hex = if let Some(pos) = args.iter().position(|a| a == "--hex" || a == "-x") {
        args.remove(pos);
        true
    } else {
        false
    };
    if args.len() != 2 {
        eprintln!("usage: bfir_dump [--hex] <input.json> <data-file>");
        std::process::exit(2);
    }
    let input = PathBuf::from(&args[0]);
    let data_path = PathBuf::from(&args[1]);

    let json = std::fs::read_to_string(&input)
        .with_context(|| format!("reading {}", input.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&json).with_context(|| format!("parsing {}", input.display()))?;
    edidforge::validate(&value)?;
    let document = edidforge::parse_value(&value)?;
    let resolved = edidforge::ResolvedDocument::resolve(document)?;

    let data = if hex {
        let text = std::fs::read_to_string(&data_path)
            .with_context(|| format!("reading {}", data_path.display()))?;
        edidforge::dump::parse_hex_text(&text)
    } else {
        std::fs::read(&data_path).with_context(|| format!("reading {}", data_path.display()))?
    };

    print!("{}", edidforge::dump::dump(&resolved, &data));
    Ok(())
}
