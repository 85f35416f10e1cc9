//! Typed BFIR document model.
//!
//! A document is a flat list of fields; `parent` references establish the
//! tree. [`ResolvedDocument`] indexes fields by id, checks id uniqueness and
//! parent references, and exposes children in document order.

use std::collections::HashMap;

/// Byte order declared by the format metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Big,
    Little,
    /// Per-field byte order; consumers fall back to little-endian.
    Mixed,
}

/// Primitive value types recognised by the lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float,
    Double,
    Char,
    String,
    Binary,
}

impl ValueType {
    /// Parse the BFIR spelling (`"uint8"`, `"string"`, ...).
    pub fn from_bfir_name(s: &str) -> Option<ValueType> {
        Some(match s {
            "uint8" => ValueType::Uint8,
            "uint16" => ValueType::Uint16,
            "uint32" => ValueType::Uint32,
            "uint64" => ValueType::Uint64,
            "int8" => ValueType::Int8,
            "int16" => ValueType::Int16,
            "int32" => ValueType::Int32,
            "int64" => ValueType::Int64,
            "float" => ValueType::Float,
            "double" => ValueType::Double,
            "char" => ValueType::Char,
            "string" => ValueType::String,
            "binary" => ValueType::Binary,
            _ => return None,
        })
    }

    /// Intrinsic byte size; `None` for string/binary (sized by the field).
    pub fn fixed_size(&self) -> Option<u64> {
        Some(match self {
            ValueType::Uint8 | ValueType::Int8 | ValueType::Char => 1,
            ValueType::Uint16 | ValueType::Int16 => 2,
            ValueType::Uint32 | ValueType::Int32 | ValueType::Float => 4,
            ValueType::Uint64 | ValueType::Int64 | ValueType::Double => 8,
            ValueType::String | ValueType::Binary => return None,
        })
    }

    /// Pattern-language scalar name; `None` for string/binary (rendered as
    /// sized arrays, not scalars).
    pub fn hexpat_scalar(&self) -> Option<&'static str> {
        Some(match self {
            ValueType::Uint8 => "u8",
            ValueType::Uint16 => "u16",
            ValueType::Uint32 => "u32",
            ValueType::Uint64 => "u64",
            ValueType::Int8 => "s8",
            ValueType::Int16 => "s16",
            ValueType::Int32 => "s32",
            ValueType::Int64 => "s64",
            ValueType::Float => "float",
            ValueType::Double => "double",
            ValueType::Char => "char",
            ValueType::String | ValueType::Binary => return None,
        })
    }

    pub fn is_unsigned(&self) -> bool {
        matches!(
            self,
            ValueType::Uint8 | ValueType::Uint16 | ValueType::Uint32 | ValueType::Uint64
        )
    }
}

/// Byte offset of a field: a single byte or an inclusive range
/// (`"0x12"` or `"0x08-0x17"` in the JSON).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetSpec {
    Byte(u64),
    Range(u64, u64),
}

impl OffsetSpec {
    pub fn start(&self) -> u64 {
        match self {
            OffsetSpec::Byte(b) => *b,
            OffsetSpec::Range(s, _) => *s,
        }
    }

    /// Byte length implied by the offset; 1 for a single byte.
    pub fn len(&self) -> u64 {
        match self {
            OffsetSpec::Byte(_) => 1,
            OffsetSpec::Range(s, e) => e.saturating_sub(*s) + 1,
        }
    }
}

impl std::fmt::Display for OffsetSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OffsetSpec::Byte(b) => write!(f, "0x{:02x}", b),
            OffsetSpec::Range(s, e) => write!(f, "0x{:02x}-0x{:02x}", s, e),
        }
    }
}

/// One member of a `bit_fields` aggregate.
#[derive(Debug, Clone)]
pub struct BitFieldEntry {
    pub name: String,
    pub description: Option<String>,
    pub bits: u64,
}

/// One symbolic value of an `enum` field, in document order.
#[derive(Debug, Clone)]
pub struct EnumEntry {
    pub name: String,
    pub value: i64,
    pub description: Option<String>,
}

/// Element type of an `array` field: a primitive, or a reference to another
/// field's id.
#[derive(Debug, Clone)]
pub enum ElementType {
    Primitive(ValueType),
    Named(String),
}

/// Discriminated field kind; each variant carries only what that kind needs.
#[derive(Debug, Clone)]
pub enum FieldKind {
    SimpleValue { value_type: ValueType },
    BitFields { entries: Vec<BitFieldEntry> },
    Enum { value_type: ValueType, values: Vec<EnumEntry> },
    Struct,
    Array { element_type: ElementType },
    FixedPattern { pattern: Option<String> },
}

impl FieldKind {
    /// Kinds that get a standalone named declaration in the output.
    pub fn is_named_type(&self) -> bool {
        matches!(
            self,
            FieldKind::Struct | FieldKind::BitFields { .. } | FieldKind::Enum { .. }
        )
    }
}

/// A single field of the binary layout.
#[derive(Debug, Clone)]
pub struct Field {
    pub id: String,
    /// Human-readable label; falls back to `id` when the document omits it.
    pub name: String,
    pub description: Option<String>,
    pub parent: Option<String>,
    pub offset: Option<OffsetSpec>,
    pub size: Option<u64>,
    pub kind: FieldKind,
}

impl Field {
    /// Effective byte size: explicit `size`, offset-range length, or the
    /// primitive's intrinsic size.
    pub fn byte_size(&self) -> Option<u64> {
        if let Some(s) = self.size {
            return Some(s);
        }
        if let Some(off @ OffsetSpec::Range(..)) = self.offset {
            return Some(off.len());
        }
        match &self.kind {
            FieldKind::SimpleValue { value_type } => value_type.fixed_size(),
            _ => None,
        }
    }
}

/// Format metadata; immutable once loaded.
#[derive(Debug, Clone)]
pub struct FormatMetadata {
    pub name: String,
    pub version: String,
    pub endianness: Endianness,
    pub description: Option<String>,
}

/// A parsed BFIR document: metadata plus the flat field list.
#[derive(Debug, Clone)]
pub struct Document {
    pub format: FormatMetadata,
    pub fields: Vec<Field>,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("duplicate field id `{0}`")]
    DuplicateFieldId(String),
    #[error("field `{field}` references unknown parent `{parent}`")]
    DanglingParentReference { field: String, parent: String },
}

/// Document with id and children indexes for conversion and dumps.
#[derive(Debug, Clone)]
pub struct ResolvedDocument {
    pub document: Document,
    fields_by_id: HashMap<String, usize>,
    children_by_id: HashMap<String, Vec<usize>>,
    roots: Vec<usize>,
}

impl ResolvedDocument {
    /// Index the field list. Fails on duplicate ids and dangling parent
    /// references; child order follows document order.
    pub fn resolve(document: Document) -> Result<Self, ResolveError> {
        let mut fields_by_id = HashMap::new();
        for (i, f) in document.fields.iter().enumerate() {
            if fields_by_id.insert(f.id.clone(), i).is_some() {
                return Err(ResolveError::DuplicateFieldId(f.id.clone()));
            }
        }
        let mut children_by_id: HashMap<String, Vec<usize>> = HashMap::new();
        let mut roots = Vec::new();
        for (i, f) in document.fields.iter().enumerate() {
            match &f.parent {
                Some(parent) => {
                    if !fields_by_id.contains_key(parent) {
                        return Err(ResolveError::DanglingParentReference {
                            field: f.id.clone(),
                            parent: parent.clone(),
                        });
                    }
                    children_by_id.entry(parent.clone()).or_default().push(i);
                }
                None => roots.push(i),
            }
        }
        Ok(ResolvedDocument {
            document,
            fields_by_id,
            children_by_id,
            roots,
        })
    }

    pub fn get(&self, id: &str) -> Option<&Field> {
        self.fields_by_id.get(id).map(|&i| &self.document.fields[i])
    }

    /// Direct children of `id` in document order.
    pub fn children(&self, id: &str) -> impl Iterator<Item = &Field> {
        self.children_by_id
            .get(id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(|&i| &self.document.fields[i])
    }

    /// Root-level fields (no parent) in document order.
    pub fn roots(&self) -> impl Iterator<Item = &Field> {
        self.roots.iter().map(|&i| &self.document.fields[i])
    }

    /// First root-level struct, if any; this is the field placed at offset 0.
    pub fn root_struct(&self) -> Option<&Field> {
        self.roots().find(|f| matches!(f.kind, FieldKind::Struct))
    }
}
