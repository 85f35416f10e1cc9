//! # EDIDForge — BFIR toolkit
//!
//! BFIR (Binary Format Intermediate Representation) is a JSON document model
//! for describing binary layouts: format metadata plus a flat field list
//! whose `parent` references form a tree. This crate validates BFIR
//! documents against a JSON Schema, converts them into ImHex pattern
//! language (`.hexpat`) templates, and applies them to binary blobs for
//! quick field dumps. It grew out of an EDID (Extended Display
//! Identification Data) reverse-engineering pipeline but is format-agnostic.
//!
//! ## Field kinds
//!
//! - `simple_value`: one primitive (`uint8`..`uint64`, `int8`..`int64`,
//!   `float`, `double`, `char`, sized `string`/`binary`)
//! - `bit_fields`: ordered sub-byte members with declared bit widths
//! - `enum`: symbolic names over an integer primitive
//! - `struct`: children are the fields whose `parent` is this field's id
//! - `array`: element type × count (count from `size`)
//! - `fixed_pattern`: fixed bytes such as the EDID header magic
//!
//! ## Example
//!
//! ```
//! let json = r#"{
//!     "format": {"name": "EDID", "version": "1.4", "endianness": "little"},
//!     "fields": [
//!         {"id": "edid", "name": "EDID", "type": "struct"},
//!         {"id": "checksum", "parent": "edid", "name": "checksum",
//!          "type": "simple_value", "value_type": "uint8", "offset": "0x7f"}
//!     ]
//! }"#;
//! let pattern = edidforge::convert_str(json).unwrap();
//! assert!(pattern.contains("EDID edid @ 0x00;"));
//! ```
//!
//! ## Tools
//!
//! - `bfir2hexpat <input.json> <output.hexpat>`: convert (atomic write)
//! - `bfir_dump <input.json> <data>`: dump a binary against the document
//! - `bfir_lint <input.json>`: report document smells (bit overflow etc.)

pub mod ast;
pub mod dump;
pub mod hexpat;
pub mod ident;
pub mod lint;
pub mod parser;
pub mod schema;

pub use ast::{
    Document, Endianness, Field, FieldKind, FormatMetadata, OffsetSpec, ResolveError,
    ResolvedDocument, ValueType,
};
pub use hexpat::{convert_str, convert_value, generate, write_atomic, ConvertError};
pub use parser::{parse_str, parse_value, ParseError};
pub use schema::{validate, SchemaError};
