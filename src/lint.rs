//! Linter for BFIR documents: non-fatal checks the converter deliberately
//! does not enforce.
//!
//! ## Rules
//!
//! - **BitWidthOverflow**: sum of `bits` in a `bit_fields` field exceeds the
//!   field's byte size × 8. The converter emits such documents unchanged; a
//!   downstream pattern interpreter may reject them.
//! - **BitWidthGap**: declared bits leave part of the field's byte size
//!   unaccounted for.
//! - **EnumValueRange**: an enum value does not fit the declared primitive.
//! - **UnreachableField**: the parent chain never reaches a root (a parent
//!   cycle); such fields are silently absent from the output.
//! - **EmptyStruct**: a struct field with no children.
//! - **MissingDescription**: a field has no description text.
//!
//! Run via the `bfir_lint` binary: exit code 1 if any error-level findings.

use crate::ast::*;
use std::collections::HashSet;

/// Severity of a lint finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// Identifies which rule produced the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintRule {
    BitWidthOverflow,
    BitWidthGap,
    EnumValueRange,
    UnreachableField,
    EmptyStruct,
    MissingDescription,
}

/// A single lint message tied to a field.
#[derive(Debug, Clone)]
pub struct LintMessage {
    pub field_id: String,
    pub rule: LintRule,
    pub severity: Severity,
    pub message: String,
}

/// Run all lint rules on a resolved document. Messages come out in document
/// order, reachability findings last.
pub fn lint(doc: &ResolvedDocument) -> Vec<LintMessage> {
    let mut out = Vec::new();

    for field in &doc.document.fields {
        match &field.kind {
            FieldKind::BitFields { entries } => {
                let declared: u64 = entries.iter().map(|e| e.bits).sum();
                let capacity = field.byte_size().unwrap_or(1) * 8;
                if declared > capacity {
                    out.push(LintMessage {
                        field_id: field.id.clone(),
                        rule: LintRule::BitWidthOverflow,
                        severity: Severity::Error,
                        message: format!(
                            "bit fields declare {} bits but the field holds {}",
                            declared, capacity
                        ),
                    });
                } else if declared < capacity {
                    out.push(LintMessage {
                        field_id: field.id.clone(),
                        rule: LintRule::BitWidthGap,
                        severity: Severity::Warning,
                        message: format!(
                            "bit fields declare {} of {} available bits",
                            declared, capacity
                        ),
                    });
                }
            }
            FieldKind::Enum { value_type, values } => {
                for e in values {
                    if !value_fits(e.value, *value_type) {
                        out.push(LintMessage {
                            field_id: field.id.clone(),
                            rule: LintRule::EnumValueRange,
                            severity: Severity::Error,
                            message: format!(
                                "enum value {} = {} does not fit {:?}",
                                e.name, e.value, value_type
                            ),
                        });
                    }
                }
            }
            FieldKind::Struct => {
                if doc.children(&field.id).next().is_none() {
                    out.push(LintMessage {
                        field_id: field.id.clone(),
                        rule: LintRule::EmptyStruct,
                        severity: Severity::Warning,
                        message: "struct has no children".to_string(),
                    });
                }
            }
            _ => {}
        }

        if field.description.is_none() {
            out.push(LintMessage {
                field_id: field.id.clone(),
                rule: LintRule::MissingDescription,
                severity: Severity::Warning,
                message: "field has no description".to_string(),
            });
        }
    }

    for id in unreachable_fields(doc) {
        out.push(LintMessage {
            field_id: id.to_string(),
            rule: LintRule::UnreachableField,
            severity: Severity::Error,
            message: "parent chain never reaches a root; field will not appear in output"
                .to_string(),
        });
    }

    out
}

fn value_fits(value: i64, value_type: ValueType) -> bool {
    let Some(width) = value_type.fixed_size() else {
        return true;
    };
    let bits = width * 8;
    if value_type.is_unsigned() {
        if value < 0 {
            return false;
        }
        bits >= 64 || (value as u64) < (1u64 << bits)
    } else {
        bits >= 64 || (-(1i64 << (bits - 1))..(1i64 << (bits - 1))).contains(&value)
    }
}

/// Fields not reachable from any root, in document order. Resolution
/// guarantees every parent id exists, but a parent cycle still detaches a
/// subgraph from the roots.
fn unreachable_fields(doc: &ResolvedDocument) -> Vec<&str> {
    let mut reached: HashSet<&str> = HashSet::new();
    let mut stack: Vec<&Field> = doc.roots().collect();
    while let Some(f) = stack.pop() {
        if reached.insert(f.id.as_str()) {
            stack.extend(doc.children(&f.id));
        }
    }
    doc.document
        .fields
        .iter()
        .filter(|f| !reached.contains(f.id.as_str()))
        .map(|f| f.id.as_str())
        .collect()
}
