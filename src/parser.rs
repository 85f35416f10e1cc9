//! Load BFIR JSON into the typed model.
//!
//! Raw serde structs mirror the JSON shape; conversion into [`crate::ast`]
//! types happens here so that unsupported discriminators and unknown value
//! types are rejected at the boundary with the offending field id attached.

use crate::ast::*;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("field `{id}`: unsupported field type `{field_type}`")]
    UnsupportedFieldType { id: String, field_type: String },
    #[error("field `{id}`: unknown value type `{value_type}`")]
    UnknownValueType { id: String, value_type: String },
    #[error("field `{id}`: `{value_type}` requires an explicit size")]
    MissingFieldSize { id: String, value_type: String },
    #[error("field `{id}`: `{field_type}` field is missing `{attribute}`")]
    MissingAttribute {
        id: String,
        field_type: &'static str,
        attribute: &'static str,
    },
    #[error("field `{id}`: invalid offset `{offset}`")]
    InvalidOffset { id: String, offset: String },
    #[error("field `{id}`: invalid enum_values entry")]
    InvalidEnumValues { id: String },
    #[error("field `{id}`: array element types form a reference cycle")]
    ElementTypeCycle { id: String },
    #[error("unknown endianness `{0}` (expected big, little, or mixed)")]
    UnknownEndianness(String),
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    format: RawFormat,
    #[serde(default)]
    fields: Vec<RawField>,
}

#[derive(Debug, Deserialize)]
struct RawFormat {
    name: String,
    version: String,
    endianness: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawField {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    offset: Option<Value>,
    #[serde(default)]
    size: Option<u64>,
    #[serde(rename = "type")]
    field_type: String,
    #[serde(default)]
    value_type: Option<String>,
    #[serde(default)]
    bit_fields: Option<Vec<RawBitField>>,
    #[serde(default)]
    enum_values: Option<Value>,
    #[serde(default)]
    element_type: Option<String>,
    #[serde(default)]
    pattern: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawBitField {
    name: String,
    #[serde(default)]
    description: Option<String>,
    bits: u64,
}

/// Parse a BFIR document from JSON text.
pub fn parse_str(json: &str) -> Result<Document, ParseError> {
    let value: Value = serde_json::from_str(json)?;
    parse_value(&value)
}

/// Parse a BFIR document from an already-parsed JSON value.
pub fn parse_value(value: &Value) -> Result<Document, ParseError> {
    let raw: RawDocument = serde_json::from_value(value.clone())?;
    build_document(raw)
}

fn build_document(raw: RawDocument) -> Result<Document, ParseError> {
    let endianness = match raw.format.endianness.as_str() {
        "big" => Endianness::Big,
        "little" => Endianness::Little,
        "mixed" => Endianness::Mixed,
        other => return Err(ParseError::UnknownEndianness(other.to_string())),
    };
    let format = FormatMetadata {
        name: raw.format.name,
        version: raw.format.version,
        endianness,
        description: raw.format.description,
    };

    // All ids up front: array element references may point forward.
    let known_ids: HashSet<&str> = raw.fields.iter().map(|f| f.id.as_str()).collect();

    let mut fields = Vec::with_capacity(raw.fields.len());
    for f in &raw.fields {
        fields.push(build_field(f, &known_ids)?);
    }
    check_element_cycles(&fields)?;

    Ok(Document { format, fields })
}

fn build_field(raw: &RawField, known_ids: &HashSet<&str>) -> Result<Field, ParseError> {
    let id = raw.id.clone();
    let kind = match raw.field_type.as_str() {
        "simple_value" => {
            let vt_name = raw.value_type.as_deref().ok_or(ParseError::MissingAttribute {
                id: id.clone(),
                field_type: "simple_value",
                attribute: "value_type",
            })?;
            let value_type = lookup_value_type(&id, vt_name)?;
            if value_type.fixed_size().is_none() && raw.size.is_none() && !has_range_offset(raw) {
                return Err(ParseError::MissingFieldSize {
                    id,
                    value_type: vt_name.to_string(),
                });
            }
            FieldKind::SimpleValue { value_type }
        }
        "bit_fields" => {
            let entries = raw.bit_fields.as_ref().ok_or(ParseError::MissingAttribute {
                id: id.clone(),
                field_type: "bit_fields",
                attribute: "bit_fields",
            })?;
            FieldKind::BitFields {
                entries: entries
                    .iter()
                    .map(|b| BitFieldEntry {
                        name: b.name.clone(),
                        description: b.description.clone(),
                        bits: b.bits,
                    })
                    .collect(),
            }
        }
        "enum" => {
            let values_raw = raw.enum_values.as_ref().ok_or(ParseError::MissingAttribute {
                id: id.clone(),
                field_type: "enum",
                attribute: "enum_values",
            })?;
            let values = build_enum_values(&id, values_raw)?;
            let value_type = match raw.value_type.as_deref() {
                Some(vt_name) => {
                    let vt = lookup_value_type(&id, vt_name)?;
                    if vt.hexpat_scalar().is_none() {
                        return Err(ParseError::UnknownValueType {
                            id,
                            value_type: vt_name.to_string(),
                        });
                    }
                    vt
                }
                None => enum_width_from_size(raw.size),
            };
            FieldKind::Enum { value_type, values }
        }
        "struct" => FieldKind::Struct,
        "array" => {
            let elem = raw.element_type.as_deref().ok_or(ParseError::MissingAttribute {
                id: id.clone(),
                field_type: "array",
                attribute: "element_type",
            })?;
            let element_type = match ValueType::from_bfir_name(elem) {
                Some(vt) => ElementType::Primitive(vt),
                None if known_ids.contains(elem) => ElementType::Named(elem.to_string()),
                None => {
                    return Err(ParseError::UnknownValueType {
                        id,
                        value_type: elem.to_string(),
                    })
                }
            };
            FieldKind::Array { element_type }
        }
        "fixed_pattern" => FieldKind::FixedPattern {
            pattern: raw.pattern.clone(),
        },
        other => {
            return Err(ParseError::UnsupportedFieldType {
                id,
                field_type: other.to_string(),
            })
        }
    };

    Ok(Field {
        id: raw.id.clone(),
        name: raw.name.clone().unwrap_or_else(|| raw.id.clone()),
        description: raw.description.clone(),
        parent: raw.parent.clone(),
        offset: raw
            .offset
            .as_ref()
            .map(|o| parse_offset(&raw.id, o))
            .transpose()?,
        size: raw.size,
        kind,
    })
}

fn has_range_offset(raw: &RawField) -> bool {
    matches!(raw.offset.as_ref().and_then(|o| o.as_str()), Some(s) if s.contains('-'))
}

fn lookup_value_type(id: &str, name: &str) -> Result<ValueType, ParseError> {
    ValueType::from_bfir_name(name).ok_or_else(|| ParseError::UnknownValueType {
        id: id.to_string(),
        value_type: name.to_string(),
    })
}

fn enum_width_from_size(size: Option<u64>) -> ValueType {
    match size {
        Some(2) => ValueType::Uint16,
        Some(4) => ValueType::Uint32,
        Some(8) => ValueType::Uint64,
        _ => ValueType::Uint8,
    }
}

/// `enum_values` comes in two spellings: a mapping `{"A": 0, "B": 1}` (order
/// preserved) or a list of `{name, value, description}` objects.
fn build_enum_values(id: &str, raw: &Value) -> Result<Vec<EnumEntry>, ParseError> {
    match raw {
        Value::Object(map) => map
            .iter()
            .map(|(name, v)| {
                let value = v.as_i64().ok_or(ParseError::InvalidEnumValues {
                    id: id.to_string(),
                })?;
                Ok(EnumEntry {
                    name: name.clone(),
                    value,
                    description: None,
                })
            })
            .collect(),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                let name = item
                    .get("name")
                    .and_then(|v| v.as_str())
                    .ok_or(ParseError::InvalidEnumValues {
                        id: id.to_string(),
                    })?;
                let value = item
                    .get("value")
                    .and_then(|v| v.as_i64())
                    .ok_or(ParseError::InvalidEnumValues {
                        id: id.to_string(),
                    })?;
                Ok(EnumEntry {
                    name: name.to_string(),
                    value,
                    description: item
                        .get("description")
                        .and_then(|v| v.as_str())
                        .map(|s| s.to_string()),
                })
            })
            .collect(),
        _ => Err(ParseError::InvalidEnumValues { id: id.to_string() }),
    }
}

/// Offsets are a plain integer, a hex/decimal string (`"0x12"`), or an
/// inclusive hex range (`"0x08-0x17"`).
fn parse_offset(id: &str, raw: &Value) -> Result<OffsetSpec, ParseError> {
    let invalid = || ParseError::InvalidOffset {
        id: id.to_string(),
        offset: raw.to_string(),
    };
    match raw {
        Value::Number(n) => n.as_u64().map(OffsetSpec::Byte).ok_or_else(invalid),
        Value::String(s) => {
            let s = s.trim();
            if let Some((start, end)) = s.split_once('-') {
                let start = parse_offset_number(start).ok_or_else(invalid)?;
                let end = parse_offset_number(end).ok_or_else(invalid)?;
                if end < start {
                    return Err(invalid());
                }
                Ok(OffsetSpec::Range(start, end))
            } else {
                parse_offset_number(s).map(OffsetSpec::Byte).ok_or_else(invalid)
            }
        }
        _ => Err(invalid()),
    }
}

fn parse_offset_number(s: &str) -> Option<u64> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else {
        s.parse().ok()
    }
}

/// Reject `array` fields whose `element_type` references chain back to
/// themselves; rendering would never terminate.
fn check_element_cycles(fields: &[Field]) -> Result<(), ParseError> {
    let by_id: std::collections::HashMap<&str, &Field> =
        fields.iter().map(|f| (f.id.as_str(), f)).collect();
    for f in fields {
        let mut seen = HashSet::new();
        let mut cur = f;
        while let FieldKind::Array {
            element_type: ElementType::Named(next),
        } = &cur.kind
        {
            if !seen.insert(cur.id.as_str()) {
                return Err(ParseError::ElementTypeCycle { id: f.id.clone() });
            }
            match by_id.get(next.as_str()) {
                Some(n) => cur = n,
                None => break,
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_document() {
        let json = r#"{
            "format": {"name": "T", "version": "1", "endianness": "little"},
            "fields": [
                {"id": "root", "type": "struct"},
                {"id": "f1", "parent": "root", "type": "simple_value", "value_type": "uint8", "name": "x"}
            ]
        }"#;
        let doc = parse_str(json).expect("parse");
        assert_eq!(doc.fields.len(), 2);
        assert_eq!(doc.fields[0].name, "root", "name falls back to id");
        assert!(matches!(
            doc.fields[1].kind,
            FieldKind::SimpleValue {
                value_type: ValueType::Uint8
            }
        ));
    }

    #[test]
    fn unsupported_field_type_carries_id() {
        let json = r#"{
            "format": {"name": "T", "version": "1", "endianness": "little"},
            "fields": [{"id": "weird", "type": "unsupported_kind"}]
        }"#;
        match parse_str(json) {
            Err(ParseError::UnsupportedFieldType { id, field_type }) => {
                assert_eq!(id, "weird");
                assert_eq!(field_type, "unsupported_kind");
            }
            other => panic!("expected UnsupportedFieldType, got {:?}", other),
        }
    }

    #[test]
    fn unknown_value_type() {
        let json = r#"{
            "format": {"name": "T", "version": "1", "endianness": "little"},
            "fields": [{"id": "f", "type": "simple_value", "value_type": "uint128"}]
        }"#;
        match parse_str(json) {
            Err(ParseError::UnknownValueType { id, value_type }) => {
                assert_eq!(id, "f");
                assert_eq!(value_type, "uint128");
            }
            other => panic!("expected UnknownValueType, got {:?}", other),
        }
    }

    #[test]
    fn string_without_size_rejected() {
        let json = r#"{
            "format": {"name": "T", "version": "1", "endianness": "little"},
            "fields": [{"id": "s", "type": "simple_value", "value_type": "string"}]
        }"#;
        assert!(matches!(
            parse_str(json),
            Err(ParseError::MissingFieldSize { .. })
        ));
    }

    #[test]
    fn string_with_range_offset_accepted() {
        let json = r#"{
            "format": {"name": "T", "version": "1", "endianness": "little"},
            "fields": [{"id": "s", "type": "simple_value", "value_type": "string", "offset": "0x08-0x11"}]
        }"#;
        let doc = parse_str(json).expect("parse");
        assert_eq!(doc.fields[0].byte_size(), Some(10));
    }

    #[test]
    fn enum_values_mapping_order_preserved() {
        let json = r#"{
            "format": {"name": "T", "version": "1", "endianness": "little"},
            "fields": [{"id": "e", "type": "enum", "value_type": "uint8",
                        "enum_values": {"B": 1, "A": 0, "C": 2}}]
        }"#;
        let doc = parse_str(json).expect("parse");
        match &doc.fields[0].kind {
            FieldKind::Enum { values, .. } => {
                let names: Vec<&str> = values.iter().map(|e| e.name.as_str()).collect();
                assert_eq!(names, vec!["B", "A", "C"]);
            }
            other => panic!("expected enum, got {:?}", other),
        }
    }

    #[test]
    fn enum_values_list_form() {
        let json = r#"{
            "format": {"name": "T", "version": "1", "endianness": "little"},
            "fields": [{"id": "e", "type": "enum", "size": 2,
                        "enum_values": [
                            {"name": "A", "value": 0, "description": "first"},
                            {"name": "B", "value": 1}
                        ]}]
        }"#;
        let doc = parse_str(json).expect("parse");
        match &doc.fields[0].kind {
            FieldKind::Enum { value_type, values } => {
                assert_eq!(*value_type, ValueType::Uint16, "width derived from size");
                assert_eq!(values[0].description.as_deref(), Some("first"));
            }
            other => panic!("expected enum, got {:?}", other),
        }
    }

    #[test]
    fn offset_forms() {
        let json = r#"{
            "format": {"name": "T", "version": "1", "endianness": "big"},
            "fields": [
                {"id": "a", "type": "struct", "offset": 18},
                {"id": "b", "type": "struct", "offset": "0x12"},
                {"id": "c", "type": "struct", "offset": "0x08-0x17"}
            ]
        }"#;
        let doc = parse_str(json).expect("parse");
        assert_eq!(doc.fields[0].offset, Some(OffsetSpec::Byte(18)));
        assert_eq!(doc.fields[1].offset, Some(OffsetSpec::Byte(0x12)));
        assert_eq!(doc.fields[2].offset, Some(OffsetSpec::Range(0x08, 0x17)));
    }

    #[test]
    fn invalid_offset_rejected() {
        let json = r#"{
            "format": {"name": "T", "version": "1", "endianness": "little"},
            "fields": [{"id": "a", "type": "struct", "offset": "0x17-0x08"}]
        }"#;
        assert!(matches!(
            parse_str(json),
            Err(ParseError::InvalidOffset { .. })
        ));
    }

    #[test]
    fn array_of_named_element() {
        let json = r#"{
            "format": {"name": "T", "version": "1", "endianness": "little"},
            "fields": [
                {"id": "timing", "type": "struct"},
                {"id": "timings", "type": "array", "element_type": "timing", "size": 8}
            ]
        }"#;
        let doc = parse_str(json).expect("parse");
        assert!(matches!(
            &doc.fields[1].kind,
            FieldKind::Array {
                element_type: ElementType::Named(n)
            } if n == "timing"
        ));
    }

    #[test]
    fn array_element_cycle_rejected() {
        let json = r#"{
            "format": {"name": "T", "version": "1", "endianness": "little"},
            "fields": [
                {"id": "a", "type": "array", "element_type": "b", "size": 2},
                {"id": "b", "type": "array", "element_type": "a", "size": 2}
            ]
        }"#;
        assert!(matches!(
            parse_str(json),
            Err(ParseError::ElementTypeCycle { .. })
        ));
    }

    #[test]
    fn bad_endianness_rejected() {
        let json = r#"{"format": {"name": "T", "version": "1", "endianness": "middle"}, "fields": []}"#;
        assert!(matches!(
            parse_str(json),
            Err(ParseError::UnknownEndianness(e)) if e == "middle"
        ));
    }
}
