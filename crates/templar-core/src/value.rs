//! Compile-known constant values for non-type parameters.

use std::fmt::{self, Display, Formatter};

/// A compile-known value supplied for a non-type parameter.
///
/// The engine consumes already-typed descriptors, so each value knows the
/// name of its own type; checking a value against a declared type reduces to
/// comparing that name with the (substituted) declared type expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstValue {
    Bool(bool),
    Int(i64),
    Str(Box<str>),
}

impl ConstValue {
    /// The built-in type atom this value inhabits.
    pub fn type_atom(&self) -> &'static str {
        match self {
            ConstValue::Bool(_) => "bool",
            ConstValue::Int(_) => "int",
            ConstValue::Str(_) => "string",
        }
    }

    /// Append a canonical byte form, used for instance-key hashing.
    pub fn write_canonical(&self, out: &mut Vec<u8>) {
        match self {
            ConstValue::Bool(b) => {
                out.push(0x01);
                out.push(u8::from(*b));
            }
            ConstValue::Int(i) => {
                out.push(0x02);
                out.extend_from_slice(&i.to_le_bytes());
            }
            ConstValue::Str(s) => {
                out.push(0x03);
                out.extend_from_slice(&(s.len() as u64).to_le_bytes());
                out.extend_from_slice(s.as_bytes());
            }
        }
    }
}

impl Display for ConstValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Bool(b) => write!(f, "{b}"),
            ConstValue::Int(i) => write!(f, "{i}"),
            ConstValue::Str(s) => write!(f, "{s:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_atoms() {
        assert_eq!(ConstValue::Bool(true).type_atom(), "bool");
        assert_eq!(ConstValue::Int(3).type_atom(), "int");
        assert_eq!(ConstValue::Str("x".into()).type_atom(), "string");
    }

    #[test]
    fn canonical_bytes_distinguish_values() {
        let mut a = Vec::new();
        let mut b = Vec::new();
        ConstValue::Int(1).write_canonical(&mut a);
        ConstValue::Int(2).write_canonical(&mut b);
        assert_ne!(a, b);
    }

    #[test]
    fn canonical_bytes_distinguish_kinds() {
        let mut a = Vec::new();
        let mut b = Vec::new();
        ConstValue::Bool(true).write_canonical(&mut a);
        ConstValue::Int(1).write_canonical(&mut b);
        assert_ne!(a, b);
    }
}
