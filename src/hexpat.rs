//! BFIR to ImHex pattern (.hexpat) conversion.
//!
//! A single deterministic pass over a resolved document: collect every
//! struct/bit_fields/enum field into an ordered named-type list, forward
//! declare them all (`using Name;`), emit their definitions in collection
//! order, then place the root struct at offset 0. Offsets and descriptions
//! ride along as trailing comments and never affect parsed semantics.

use crate::ast::*;
use crate::ident::sanitize;
use crate::parser::{self, ParseError};
use crate::schema::{self, SchemaError};
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::io;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Validate, parse, resolve, and convert BFIR JSON text.
pub fn convert_str(json: &str) -> Result<String, ConvertError> {
    let value: serde_json::Value = serde_json::from_str(json).map_err(ParseError::Json)?;
    convert_value(&value)
}

/// Validate, parse, resolve, and convert an already-parsed JSON value.
/// Schema validation runs first; conversion never starts on a document
/// that fails it.
pub fn convert_value(value: &serde_json::Value) -> Result<String, ConvertError> {
    schema::validate(value)?;
    let document = parser::parse_value(value)?;
    let resolved = ResolvedDocument::resolve(document)?;
    Ok(generate(&resolved))
}

/// Emit pattern text for a resolved document. Pure: identical input yields
/// byte-identical output.
pub fn generate(doc: &ResolvedDocument) -> String {
    let named = collect_named_types(doc);
    let names = assign_type_names(&named);
    let mut out = String::new();

    emit_header(&mut out, &doc.document.format);

    for f in &named {
        let _ = writeln!(out, "using {};", names[f.id.as_str()]);
    }
    if !named.is_empty() {
        out.push('\n');
    }

    for f in &named {
        emit_definition(&mut out, doc, f, &names);
        out.push('\n');
    }

    emit_placement(&mut out, doc, &names);
    out
}

/// Write generated text atomically: build the full string first, write it to
/// a temp file in the destination directory, then rename over the target.
/// On error nothing is left at `path`.
pub fn write_atomic(path: &Path, text: &str) -> io::Result<()> {
    use std::io::Write as _;
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(text.as_bytes())?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Depth-first walk over the field tree (explicit stack, no recursion),
/// collecting struct/bit_fields/enum fields in first-encountered order.
/// Roots are visited in document order.
fn collect_named_types<'a>(doc: &'a ResolvedDocument) -> Vec<&'a Field> {
    let mut out = Vec::new();
    let mut stack: Vec<&Field> = doc.roots().collect();
    stack.reverse();
    while let Some(f) = stack.pop() {
        if f.kind.is_named_type() {
            out.push(f);
        }
        let mut kids: Vec<&Field> = doc.children(&f.id).collect();
        kids.reverse();
        stack.append(&mut kids);
    }
    out
}

/// Sanitized, collision-free type names keyed by field id. Collisions after
/// sanitization get a numeric suffix in collection order.
fn assign_type_names<'a>(named: &[&'a Field]) -> HashMap<&'a str, String> {
    let mut names = HashMap::new();
    let mut used = HashSet::new();
    for f in named {
        let base = sanitize(&f.name);
        let mut candidate = base.clone();
        let mut n = 1u32;
        while !used.insert(candidate.clone()) {
            n += 1;
            candidate = format!("{}_{}", base, n);
        }
        names.insert(f.id.as_str(), candidate);
    }
    names
}

fn emit_header(out: &mut String, format: &FormatMetadata) {
    let pragma = match format.endianness {
        Endianness::Big => "big",
        Endianness::Little | Endianness::Mixed => "little",
    };
    let _ = writeln!(out, "#pragma endian {}", pragma);
    out.push('\n');
    let _ = writeln!(out, "// {} {}", format.name, format.version);
    if let Some(desc) = &format.description {
        let _ = writeln!(out, "// {}", desc);
    }
    if format.endianness == Endianness::Mixed {
        let _ = writeln!(
            out,
            "// mixed endianness: per-field byte order is not representable, little-endian assumed"
        );
    }
    out.push('\n');
}

fn emit_definition(
    out: &mut String,
    doc: &ResolvedDocument,
    field: &Field,
    names: &HashMap<&str, String>,
) {
    if let Some(comment) = field_comment(field) {
        let _ = writeln!(out, "// {}", comment);
    }
    let type_name = &names[field.id.as_str()];
    match &field.kind {
        FieldKind::Struct => {
            let _ = writeln!(out, "struct {} {{", type_name);
            for child in doc.children(&field.id) {
                let decl = member_decl(doc, child, names);
                match field_comment(child) {
                    Some(c) => {
                        let _ = writeln!(out, "    {}; // {}", decl, c);
                    }
                    None => {
                        let _ = writeln!(out, "    {};", decl);
                    }
                }
            }
            let _ = writeln!(out, "}};");
        }
        FieldKind::BitFields { entries } => {
            let _ = writeln!(out, "bitfield {} {{", type_name);
            for e in entries {
                match &e.description {
                    Some(d) => {
                        let _ = writeln!(out, "    {} : {}; // {}", sanitize(&e.name), e.bits, d);
                    }
                    None => {
                        let _ = writeln!(out, "    {} : {};", sanitize(&e.name), e.bits);
                    }
                }
            }
            let _ = writeln!(out, "}};");
        }
        FieldKind::Enum { value_type, values } => {
            // value_type is restricted to scalar primitives at parse time.
            let primitive = value_type.hexpat_scalar().unwrap_or("u8");
            let _ = writeln!(out, "enum {} : {} {{", type_name, primitive);
            for (i, e) in values.iter().enumerate() {
                let sep = if i + 1 == values.len() { "" } else { "," };
                match &e.description {
                    Some(d) => {
                        let _ =
                            writeln!(out, "    {} = {}{} // {}", sanitize(&e.name), e.value, sep, d);
                    }
                    None => {
                        let _ = writeln!(out, "    {} = {}{}", sanitize(&e.name), e.value, sep);
                    }
                }
            }
            let _ = writeln!(out, "}};");
        }
        // Arrays, simple values, and fixed patterns are rendered inline at
        // their point of use and never reach this function.
        _ => {}
    }
}

fn emit_placement(out: &mut String, doc: &ResolvedDocument, names: &HashMap<&str, String>) {
    match doc.root_struct() {
        Some(root) => {
            let type_name = &names[root.id.as_str()];
            let instance = type_name.to_ascii_lowercase();
            let _ = writeln!(out, "{} {} @ 0x00;", type_name, instance);
        }
        None => {
            let _ = writeln!(out, "// no root-level struct to place");
        }
    }
}

/// Member declaration without the trailing semicolon, e.g. `u8 checksum` or
/// `char monitor_name[13]` or `StandardTiming timings[8]`.
fn member_decl(doc: &ResolvedDocument, field: &Field, names: &HashMap<&str, String>) -> String {
    let member = sanitize(&field.name);
    match &field.kind {
        FieldKind::SimpleValue { value_type } => simple_value_decl(field, *value_type, &member),
        FieldKind::Struct | FieldKind::BitFields { .. } | FieldKind::Enum { .. } => {
            format!("{} {}", names[field.id.as_str()], member)
        }
        FieldKind::Array { .. } => array_decl(doc, field, &member, names),
        FieldKind::FixedPattern { pattern } => {
            let len = field
                .byte_size()
                .or_else(|| pattern.as_deref().map(count_hex_bytes))
                .unwrap_or(1);
            format!("u8 {}[{}]", member, len)
        }
    }
}

fn simple_value_decl(field: &Field, value_type: ValueType, member: &str) -> String {
    match value_type.hexpat_scalar() {
        Some(primitive) => {
            let intrinsic = value_type.fixed_size().unwrap_or(1);
            match field.byte_size() {
                // Wider than the primitive: a run of scalars.
                Some(total) if total > intrinsic && total % intrinsic == 0 => {
                    format!("{} {}[{}]", primitive, member, total / intrinsic)
                }
                Some(total) if total > intrinsic => format!("u8 {}[{}]", member, total),
                _ => format!("{} {}", primitive, member),
            }
        }
        None => {
            // string -> char[], binary -> u8[]; size checked at parse time.
            let base = match value_type {
                ValueType::String => "char",
                _ => "u8",
            };
            let len = field.byte_size().unwrap_or(0);
            format!("{} {}[{}]", base, member, len)
        }
    }
}

/// Arrays render inline. `size` is the element count; without it the array
/// consumes the rest of the input. Chained references to other array fields
/// accumulate as extra dimensions.
fn array_decl(
    doc: &ResolvedDocument,
    field: &Field,
    member: &str,
    names: &HashMap<&str, String>,
) -> String {
    let mut dims = Vec::new();
    let mut cur = field;
    let elem = loop {
        dims.push(count_expr(cur));
        match &cur.kind {
            FieldKind::Array { element_type } => match element_type {
                ElementType::Primitive(vt) => {
                    break vt.hexpat_scalar().unwrap_or(match vt {
                        ValueType::String => "char",
                        _ => "u8",
                    })
                }
                // Reference cycles are rejected at parse time.
                ElementType::Named(id) => match doc.get(id) {
                    Some(next) if matches!(next.kind, FieldKind::Array { .. }) => cur = next,
                    Some(next) if next.kind.is_named_type() => {
                        // A reference to a field outside the reachable tree
                        // has no declaration to name; fall back to bytes.
                        break names
                            .get(next.id.as_str())
                            .map(|s| s.as_str())
                            .unwrap_or("u8");
                    }
                    Some(next) => match &next.kind {
                        FieldKind::SimpleValue { value_type } => {
                            break value_type.hexpat_scalar().unwrap_or("u8")
                        }
                        _ => break "u8",
                    },
                    None => break "u8",
                },
            },
            _ => break "u8",
        }
    };
    let brackets: String = dims.iter().map(|d| format!("[{}]", d)).collect();
    format!("{} {}{}", elem, member, brackets)
}

fn count_expr(field: &Field) -> String {
    match field.size {
        Some(n) => n.to_string(),
        None => "while(!std::mem::eof())".to_string(),
    }
}

/// Trailing comment for a member or definition: `[offset] description`.
fn field_comment(field: &Field) -> Option<String> {
    match (&field.offset, &field.description) {
        (Some(off), Some(desc)) => Some(format!("[{}] {}", off, desc)),
        (Some(off), None) => Some(format!("[{}]", off)),
        (None, Some(desc)) => Some(desc.clone()),
        (None, None) => None,
    }
}

/// Count whitespace-separated two-digit hex byte tokens in a pattern string
/// like `"00 FF FF FF FF FF FF 00"`.
fn count_hex_bytes(pattern: &str) -> u64 {
    pattern
        .split_whitespace()
        .filter(|t| t.len() == 2 && t.chars().all(|c| c.is_ascii_hexdigit()))
        .count() as u64
}
