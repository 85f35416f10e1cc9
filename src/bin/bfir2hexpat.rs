//! Convert a BFIR JSON document into an ImHex pattern file.
//!
//! Usage:
//!   bfir2hexpat <input.json> <output.hexpat>
//!
//! The document is schema-validated first; any validation or conversion
//! error aborts with a message on stderr and a non-zero exit code, leaving
//! the output file untouched. On success the full pattern text is written
//! atomically.

use anyhow::Context;
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() != 2 {
        eprintln!("usage: bfir2hexpat <input.json> <output.hexpat>");
        std::process::exit(2);
    }
    let input = PathBuf::from(&args[0]);
    let output = PathBuf::from(&args[1]);

    let json = std::fs::read_to_string(&input)
        .with_context(|| format!("reading {}", input.display()))?;
    let pattern = edidforge::convert_str(&json)
        .with_context(|| format!("converting {}", input.display()))?;
    edidforge::write_atomic(&output, &pattern)
        .with_context(|| format!("writing {}", output.display()))?;

    Ok(())
}
