//! Apply a BFIR document to a binary blob: slice each field's bytes by its
//! offset and render the values for display. Fields whose offsets fall
//! outside the input are reported inline; the dump never aborts.

use crate::ast::*;
use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Render a field-by-field dump of `data` as described by the document.
/// Fields are walked depth-first in document order; nesting is shown by
/// indentation.
pub fn dump(doc: &ResolvedDocument, data: &[u8]) -> String {
    let endianness = doc.document.format.endianness;
    let mut out = String::new();
    out.push_str(&format!(
        "{} {} ({} bytes)\n",
        doc.document.format.name,
        doc.document.format.version,
        data.len()
    ));

    let mut stack: Vec<(&Field, usize)> = doc.roots().map(|f| (f, 0)).collect();
    stack.reverse();
    while let Some((field, depth)) = stack.pop() {
        out.push_str(&render_line(field, depth, data, endianness));
        out.push('\n');
        let mut kids: Vec<(&Field, usize)> =
            doc.children(&field.id).map(|f| (f, depth + 1)).collect();
        kids.reverse();
        stack.append(&mut kids);
    }
    out
}

fn render_line(field: &Field, depth: usize, data: &[u8], endianness: Endianness) -> String {
    let pad = "  ".repeat(depth);
    let loc = match &field.offset {
        Some(off) => format!(" [{}]", off),
        None => String::new(),
    };
    if matches!(field.kind, FieldKind::Struct) {
        return format!("{}{}{}:", pad, field.name, loc);
    }
    let value = match field_slice(field, data) {
        Some(slice) => render_value(field, slice, endianness),
        None if field.offset.is_none() => "<no offset>".to_string(),
        None => "<out of range>".to_string(),
    };
    format!("{}{}{}: {}", pad, field.name, loc, value)
}

/// Byte slice covered by the field: offset start plus the effective size
/// (explicit size, offset-range length, or primitive width). For arrays
/// `size` is an element count, so a range offset wins when present.
fn field_slice<'a>(field: &Field, data: &'a [u8]) -> Option<&'a [u8]> {
    let off = field.offset?;
    let start = off.start() as usize;
    let len = match (&field.kind, off) {
        (FieldKind::Array { .. }, OffsetSpec::Range(..)) => off.len(),
        _ => field.byte_size().unwrap_or(off.len()),
    } as usize;
    data.get(start..start + len)
}

fn render_value(field: &Field, slice: &[u8], endianness: Endianness) -> String {
    match &field.kind {
        FieldKind::SimpleValue { value_type } => render_simple(*value_type, slice, endianness),
        FieldKind::Enum { value_type, values } => {
            let raw = read_unsigned(slice, *value_type, endianness);
            match values.iter().find(|e| e.value == raw as i64) {
                Some(e) => format!("{} ({})", e.name, raw),
                None => format!("{} (no matching enum value)", raw),
            }
        }
        FieldKind::BitFields { entries } => render_bit_fields(entries, slice),
        FieldKind::Array { .. } | FieldKind::FixedPattern { .. } => hex_string(slice),
        FieldKind::Struct => String::new(),
    }
}

fn render_simple(value_type: ValueType, slice: &[u8], endianness: Endianness) -> String {
    if let Some(width) = value_type.fixed_size() {
        if (slice.len() as u64) < width {
            return "<truncated>".to_string();
        }
    }
    // Mixed-endian formats fall back to little-endian, matching the
    // generated pattern's pragma.
    let big = endianness == Endianness::Big;
    match value_type {
        ValueType::Uint8 => slice.first().map(|b| b.to_string()).unwrap_or_default(),
        ValueType::Int8 => slice
            .first()
            .map(|b| (*b as i8).to_string())
            .unwrap_or_default(),
        ValueType::Uint16 if big => BigEndian::read_u16(slice).to_string(),
        ValueType::Uint16 => LittleEndian::read_u16(slice).to_string(),
        ValueType::Int16 if big => BigEndian::read_i16(slice).to_string(),
        ValueType::Int16 => LittleEndian::read_i16(slice).to_string(),
        ValueType::Uint32 if big => BigEndian::read_u32(slice).to_string(),
        ValueType::Uint32 => LittleEndian::read_u32(slice).to_string(),
        ValueType::Int32 if big => BigEndian::read_i32(slice).to_string(),
        ValueType::Int32 => LittleEndian::read_i32(slice).to_string(),
        ValueType::Uint64 if big => BigEndian::read_u64(slice).to_string(),
        ValueType::Uint64 => LittleEndian::read_u64(slice).to_string(),
        ValueType::Int64 if big => BigEndian::read_i64(slice).to_string(),
        ValueType::Int64 => LittleEndian::read_i64(slice).to_string(),
        ValueType::Float if big => BigEndian::read_f32(slice).to_string(),
        ValueType::Float => LittleEndian::read_f32(slice).to_string(),
        ValueType::Double if big => BigEndian::read_f64(slice).to_string(),
        ValueType::Double => LittleEndian::read_f64(slice).to_string(),
        ValueType::Char => slice
            .first()
            .map(|b| format!("'{}'", printable(*b)))
            .unwrap_or_default(),
        ValueType::String => {
            let text: String = slice
                .iter()
                .take_while(|&&b| b != 0 && b != 0x0a)
                .map(|&b| printable(b))
                .collect();
            format!("\"{}\"", text.trim_end())
        }
        ValueType::Binary => hex_string(slice),
    }
}

/// Split an integer into the declared bit fields, LSB first, matching how
/// the pattern language lays out `bitfield` members.
fn render_bit_fields(entries: &[BitFieldEntry], slice: &[u8]) -> String {
    let mut raw: u64 = 0;
    for (i, b) in slice.iter().take(8).enumerate() {
        raw |= (*b as u64) << (8 * i);
    }
    let mut parts = Vec::with_capacity(entries.len());
    let mut shift = 0u64;
    for e in entries {
        let bits = e.bits.min(64);
        let mask = if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 };
        let v = if shift >= 64 { 0 } else { (raw >> shift) & mask };
        parts.push(format!("{}={}", e.name, v));
        shift += bits;
    }
    parts.join(" ")
}

fn read_unsigned(slice: &[u8], value_type: ValueType, endianness: Endianness) -> u64 {
    let big = endianness == Endianness::Big;
    let width = value_type.fixed_size().unwrap_or(1).min(slice.len() as u64) as usize;
    let bytes = &slice[..width];
    let mut raw: u64 = 0;
    for (i, b) in bytes.iter().enumerate() {
        let shift = if big {
            8 * (width - 1 - i)
        } else {
            8 * i
        };
        raw |= (*b as u64) << shift;
    }
    raw
}

fn printable(b: u8) -> char {
    if (0x20..0x7f).contains(&b) {
        b as char
    } else {
        '.'
    }
}

fn hex_string(bytes: &[u8]) -> String {
    const MAX: usize = 16;
    let shown: Vec<String> = bytes.iter().take(MAX).map(|b| format!("{:02x}", b)).collect();
    if bytes.len() > MAX {
        format!("{} (+{} bytes)", shown.join(" "), bytes.len() - MAX)
    } else {
        shown.join(" ")
    }
}

/// Extract bytes from a hex dump text: every run of hex digits contributes
/// its two-digit pairs, anything else is a separator. A trailing odd digit
/// in a run is ignored.
pub fn parse_hex_text(text: &str) -> Vec<u8> {
    let mut out = Vec::new();
    let mut run: Vec<u8> = Vec::new();
    for c in text.chars().chain(std::iter::once('\n')) {
        if let Some(d) = c.to_digit(16) {
            run.push(d as u8);
        } else {
            for pair in run.chunks_exact(2) {
                out.push(pair[0] << 4 | pair[1]);
            }
            run.clear();
        }
    }
    out
}
