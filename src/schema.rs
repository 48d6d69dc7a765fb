//! Fixed-width row schema: field kinds, offsets, and byte-level (de)serialization.

use std::collections::HashSet;
use std::convert::TryInto;

use crate::config::{CHAR_SIZE, DOUBLE_SIZE, INT_SIZE};
use crate::error::{Result, StorageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Int,
    Double,
    Char,
}

impl FieldKind {
    pub fn width(self) -> usize {
        match self {
            FieldKind::Int => INT_SIZE,
            FieldKind::Double => DOUBLE_SIZE,
            FieldKind::Char => CHAR_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
}

/// A fixed-width row layout: an ordered sequence of `(kind, name)` pairs with
/// unique names, plus the derived per-field offsets and total row width.
#[derive(Debug, Clone, PartialEq)]
pub struct TupleDesc {
    fields: Vec<Field>,
    offsets: Vec<usize>,
    row_width: usize,
}

impl TupleDesc {
    pub fn new(kinds: Vec<FieldKind>, names: Vec<String>) -> Result<Self> {
        if kinds.len() != names.len() {
            return Err(StorageError::SchemaMismatch(format!(
                "{} kinds but {} names",
                kinds.len(),
                names.len()
            )));
        }
        let mut seen = HashSet::new();
        for name in &names {
            if !seen.insert(name.clone()) {
                return Err(StorageError::SchemaMismatch(format!(
                    "duplicate field name '{}'",
                    name
                )));
            }
        }

        let mut offsets = Vec::with_capacity(kinds.len());
        let mut running = 0usize;
        for kind in &kinds {
            offsets.push(running);
            running += kind.width();
        }

        let fields = kinds
            .into_iter()
            .zip(names.into_iter())
            .map(|(kind, name)| Field { name, kind })
            .collect();

        Ok(Self {
            fields,
            offsets,
            row_width: running,
        })
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn row_width(&self) -> usize {
        self.row_width
    }

    pub fn offset(&self, i: usize) -> usize {
        self.offsets[i]
    }

    pub fn kind(&self, i: usize) -> FieldKind {
        self.fields[i].kind
    }

    pub fn name(&self, i: usize) -> &str {
        &self.fields[i].name
    }

    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.fields
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| StorageError::SchemaMismatch(format!("no field named '{}'", name)))
    }

    pub fn is_compatible(&self, tuple: &Tuple) -> bool {
        if tuple.0.len() != self.fields.len() {
            return false;
        }
        self.fields
            .iter()
            .zip(tuple.0.iter())
            .all(|(field, value)| field.kind.matches(value))
    }

    /// Serializes `tuple` into `buf`, which must be at least `row_width()` bytes.
    pub fn serialize(&self, tuple: &Tuple, buf: &mut [u8]) -> Result<()> {
        if !self.is_compatible(tuple) {
            return Err(StorageError::SchemaMismatch(
                "tuple does not match schema arity/kinds".into(),
            ));
        }
        for (i, field) in self.fields.iter().enumerate() {
            let start = self.offsets[i];
            let width = field.kind.width();
            let dest = &mut buf[start..start + width];
            match &tuple.0[i] {
                Value::Int(v) => dest.copy_from_slice(&v.to_ne_bytes()),
                Value::Double(v) => dest.copy_from_slice(&v.to_ne_bytes()),
                Value::Char(s) => {
                    dest.iter_mut().for_each(|b| *b = 0);
                    let bytes = s.as_bytes();
                    let n = bytes.len().min(CHAR_SIZE);
                    dest[..n].copy_from_slice(&bytes[..n]);
                }
            }
        }
        Ok(())
    }

    /// Deserializes a tuple from `buf`, which must be at least `row_width()` bytes.
    pub fn deserialize(&self, buf: &[u8]) -> Tuple {
        let mut values = Vec::with_capacity(self.fields.len());
        for (i, field) in self.fields.iter().enumerate() {
            let start = self.offsets[i];
            let width = field.kind.width();
            let src = &buf[start..start + width];
            let value = match field.kind {
                FieldKind::Int => Value::Int(i32::from_ne_bytes(src.try_into().unwrap())),
                FieldKind::Double => Value::Double(f64::from_ne_bytes(src.try_into().unwrap())),
                FieldKind::Char => {
                    let nul = src.iter().position(|&b| b == 0).unwrap_or(src.len());
                    Value::Char(String::from_utf8_lossy(&src[..nul]).into_owned())
                }
            };
            values.push(value);
        }
        Tuple(values)
    }

    /// Concatenates two schemas, failing if any field name collides.
    pub fn merge(&self, other: &TupleDesc) -> Result<TupleDesc> {
        let mut kinds = Vec::with_capacity(self.fields.len() + other.fields.len());
        let mut names = Vec::with_capacity(self.fields.len() + other.fields.len());
        for f in self.fields.iter().chain(other.fields.iter()) {
            kinds.push(f.kind);
            names.push(f.name.clone());
        }
        TupleDesc::new(kinds, names)
    }
}

impl FieldKind {
    fn matches(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (FieldKind::Int, Value::Int(_))
                | (FieldKind::Double, Value::Double(_))
                | (FieldKind::Char, Value::Char(_))
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Double(f64),
    Char(String),
}

/// An ordered sequence of values matching some schema by position and kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple(pub Vec<Value>);

impl Tuple {
    pub fn new(values: Vec<Value>) -> Self {
        Tuple(values)
    }

    pub fn get(&self, i: usize) -> &Value {
        &self.0[i]
    }

    /// Extracts the integer key at `key_field`. Panics if that field is not
    /// an `Int`: the indexed column is always an `Int` by construction, not
    /// something user input can violate.
    pub fn key(&self, key_field: usize) -> i32 {
        match &self.0[key_field] {
            Value::Int(v) => *v,
            other => panic!("key field {} is not an Int: {:?}", key_field, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> TupleDesc {
        TupleDesc::new(
            vec![FieldKind::Int, FieldKind::Char, FieldKind::Double],
            vec!["id".into(), "name".into(), "price".into()],
        )
        .unwrap()
    }

    #[test]
    fn offsets_and_width() {
        let s = schema();
        assert_eq!(s.offset(0), 0);
        assert_eq!(s.offset(1), 4);
        assert_eq!(s.offset(2), 4 + 64);
        assert_eq!(s.row_width(), 4 + 64 + 8);
    }

    #[test]
    fn round_trip() {
        let s = schema();
        let t = Tuple::new(vec![
            Value::Int(42),
            Value::Char("apple".into()),
            Value::Double(1.5),
        ]);
        let mut buf = vec![0u8; s.row_width()];
        s.serialize(&t, &mut buf).unwrap();
        let back = s.deserialize(&buf);
        assert_eq!(back, t);
    }

    #[test]
    fn char_truncates_at_64_bytes() {
        let s = schema();
        let long = "x".repeat(100);
        let t = Tuple::new(vec![Value::Int(1), Value::Char(long), Value::Double(0.0)]);
        let mut buf = vec![0u8; s.row_width()];
        s.serialize(&t, &mut buf).unwrap();
        let back = s.deserialize(&buf);
        match back.get(1) {
            Value::Char(s) => assert_eq!(s.len(), 64),
            _ => panic!("expected Char"),
        }
    }

    #[test]
    fn duplicate_names_rejected() {
        let err = TupleDesc::new(
            vec![FieldKind::Int, FieldKind::Int],
            vec!["a".into(), "a".into()],
        );
        assert!(err.is_err());
    }

    #[test]
    fn mismatched_lengths_rejected() {
        let err = TupleDesc::new(vec![FieldKind::Int], vec!["a".into(), "b".into()]);
        assert!(err.is_err());
    }

    #[test]
    fn serialize_rejects_incompatible_tuple() {
        let s = schema();
        let t = Tuple::new(vec![Value::Int(1)]);
        let mut buf = vec![0u8; s.row_width()];
        assert!(s.serialize(&t, &mut buf).is_err());
    }

    #[test]
    fn merge_concatenates_fields() {
        let a = TupleDesc::new(vec![FieldKind::Int], vec!["a".into()]).unwrap();
        let b = TupleDesc::new(vec![FieldKind::Int], vec!["b".into()]).unwrap();
        let merged = a.merge(&b).unwrap();
        assert_eq!(merged.field_count(), 2);
        assert_eq!(merged.index_of("b").unwrap(), 1);
    }

    #[test]
    fn merge_rejects_name_collision() {
        let a = TupleDesc::new(vec![FieldKind::Int], vec!["a".into()]).unwrap();
        let b = TupleDesc::new(vec![FieldKind::Int], vec!["a".into()]).unwrap();
        assert!(a.merge(&b).is_err());
    }
}
