//! Converter property tests: determinism, forward-declaration completeness,
//! structural fidelity, and the fixed primitive lookup table.

use edidforge::{convert_str, ConvertError, ParseError, ResolveError};

const EDID_BFIR: &str = include_str!("../demos/edid.bfir.json");

/// Names declared with `using` in the output, in order.
fn forward_declarations(pattern: &str) -> Vec<String> {
    pattern
        .lines()
        .filter_map(|l| {
            l.strip_prefix("using ")
                .and_then(|r| r.strip_suffix(';'))
                .map(|s| s.to_string())
        })
        .collect()
}

/// Names defined as struct/bitfield/enum in the output, in order.
fn definitions(pattern: &str) -> Vec<String> {
    pattern
        .lines()
        .filter_map(|l| {
            let l = l.trim_start();
            for prefix in ["struct ", "bitfield ", "enum "] {
                if let Some(rest) = l.strip_prefix(prefix) {
                    let name: String = rest
                        .chars()
                        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                        .collect();
                    if !name.is_empty() && l.ends_with('{') {
                        return Some(name);
                    }
                }
            }
            None
        })
        .collect()
}

#[test]
fn conversion_is_deterministic() {
    let a = convert_str(EDID_BFIR).expect("convert");
    let b = convert_str(EDID_BFIR).expect("convert");
    assert_eq!(a, b, "identical input must give byte-identical output");
}

#[test]
fn every_definition_is_forward_declared() {
    let pattern = convert_str(EDID_BFIR).expect("convert");
    let fwd = forward_declarations(&pattern);
    let defs = definitions(&pattern);
    assert!(!defs.is_empty());
    for d in &defs {
        assert!(fwd.contains(d), "`{}` defined but not forward declared", d);
    }
    // All forward declarations precede all definitions.
    let last_using = pattern.rfind("using ").expect("using lines");
    let first_def = defs
        .iter()
        .map(|d| pattern.find(&format!("struct {} {{", d))
            .or_else(|| pattern.find(&format!("bitfield {} {{", d)))
            .or_else(|| pattern.find(&format!("enum {} :", d)))
            .expect("definition position"))
        .min()
        .expect("at least one definition");
    assert!(last_using < first_def);
}

#[test]
fn named_types_match_document_exactly() {
    let pattern = convert_str(EDID_BFIR).expect("convert");
    let defs = definitions(&pattern);

    let value: serde_json::Value = serde_json::from_str(EDID_BFIR).expect("json");
    let expected: Vec<&str> = value["fields"]
        .as_array()
        .expect("fields")
        .iter()
        .filter(|f| {
            matches!(
                f["type"].as_str(),
                Some("struct") | Some("bit_fields") | Some("enum")
            )
        })
        .map(|f| f["name"].as_str().expect("name"))
        .collect();

    assert_eq!(
        defs.len(),
        expected.len(),
        "one definition per struct/bit_fields/enum field, no omissions or duplicates"
    );
    for name in expected {
        assert!(defs.iter().any(|d| d == name), "missing definition `{}`", name);
    }
}

#[test]
fn primitive_lookup_table_is_exact() {
    let table = [
        ("uint8", "u8 v;"),
        ("uint16", "u16 v;"),
        ("uint32", "u32 v;"),
        ("uint64", "u64 v;"),
        ("int8", "s8 v;"),
        ("int16", "s16 v;"),
        ("int32", "s32 v;"),
        ("int64", "s64 v;"),
        ("float", "float v;"),
        ("double", "double v;"),
        ("char", "char v;"),
        ("string", "char v[4];"),
        ("binary", "u8 v[4];"),
    ];
    for (value_type, expected) in table {
        let json = format!(
            r#"{{
                "format": {{"name": "T", "version": "1", "endianness": "little"}},
                "fields": [
                    {{"id": "root", "type": "struct"}},
                    {{"id": "v", "parent": "root", "name": "v", "type": "simple_value",
                      "value_type": "{}", "size": 4}}
                ]
            }}"#,
            value_type
        );
        let json = if value_type == "string" || value_type == "binary" {
            json
        } else {
            // Fixed-width primitives carry no explicit size.
            json.replace(", \"size\": 4", "")
        };
        let out = convert_str(&json).expect(value_type);
        assert!(
            out.contains(expected),
            "{} should render `{}`:\n{}",
            value_type,
            expected,
            out
        );
    }
}

#[test]
fn dangling_parent_reference_fails() {
    let r = convert_str(
        r#"{
            "format": {"name": "T", "version": "1", "endianness": "little"},
            "fields": [
                {"id": "a", "type": "struct"},
                {"id": "b", "parent": "missing", "type": "simple_value", "value_type": "uint8"}
            ]
        }"#,
    );
    match r {
        Err(ConvertError::Resolve(ResolveError::DanglingParentReference { field, parent })) => {
            assert_eq!(field, "b");
            assert_eq!(parent, "missing");
        }
        other => panic!("expected DanglingParentReference, got {:?}", other),
    }
}

#[test]
fn duplicate_field_id_fails() {
    let r = convert_str(
        r#"{
            "format": {"name": "T", "version": "1", "endianness": "little"},
            "fields": [
                {"id": "x", "type": "struct"},
                {"id": "x", "type": "simple_value", "value_type": "uint8"}
            ]
        }"#,
    );
    assert!(matches!(
        r,
        Err(ConvertError::Resolve(ResolveError::DuplicateFieldId(id))) if id == "x"
    ));
}

#[test]
fn unsupported_field_type_fails_with_id() {
    let r = convert_str(
        r#"{
            "format": {"name": "T", "version": "1", "endianness": "little"},
            "fields": [{"id": "odd_one", "type": "unsupported_kind"}]
        }"#,
    );
    assert!(matches!(
        r,
        Err(ConvertError::Parse(ParseError::UnsupportedFieldType { id, .. })) if id == "odd_one"
    ));
}

#[test]
fn unknown_value_type_fails_with_id() {
    let r = convert_str(
        r#"{
            "format": {"name": "T", "version": "1", "endianness": "little"},
            "fields": [{"id": "v", "type": "simple_value", "value_type": "decimal128"}]
        }"#,
    );
    assert!(matches!(
        r,
        Err(ConvertError::Parse(ParseError::UnknownValueType { id, value_type }))
            if id == "v" && value_type == "decimal128"
    ));
}

#[test]
fn schema_rejects_malformed_document_before_conversion() {
    // `fields` must be an array of objects; a bare string fails the schema
    // pass, so the converter never sees it.
    let r = convert_str(
        r#"{
            "format": {"name": "T", "version": "1", "endianness": "little"},
            "fields": ["not-a-field"]
        }"#,
    );
    assert!(matches!(r, Err(ConvertError::Schema(_))));
}
