use crate::core::{DbError, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Declared return types a batch update accepts, in the order error messages list them.
pub const RETURN_SHAPE_WHITELIST: [&str; 6] = ["void", "int", "int[]", "Void", "Integer", "Integer[]"];

/// The result shape a batch update was declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ReturnShape {
    Void,
    BoxedVoid,
    Int,
    BoxedInt,
    IntArray,
    BoxedIntArray,
}

impl ReturnShape {
    /// Parses a declared type name, failing with [`DbError::InvalidReturnShape`]
    /// for anything outside [`RETURN_SHAPE_WHITELIST`].
    pub fn parse(declared: &str) -> Result<Self> {
        match declared.trim() {
            "void" => Ok(Self::Void),
            "Void" => Ok(Self::BoxedVoid),
            "int" => Ok(Self::Int),
            "Integer" => Ok(Self::BoxedInt),
            "int[]" => Ok(Self::IntArray),
            "Integer[]" => Ok(Self::BoxedIntArray),
            other => Err(DbError::InvalidReturnShape(other.to_string())),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::BoxedVoid => "Void",
            Self::Int => "int",
            Self::BoxedInt => "Integer",
            Self::IntArray => "int[]",
            Self::BoxedIntArray => "Integer[]",
        }
    }

    /// Converts the per-record codes into the declared shape.
    pub fn coerce(&self, results: Vec<i64>) -> BatchOutput {
        match self {
            Self::Void | Self::BoxedVoid => BatchOutput::Unit,
            Self::Int | Self::BoxedInt => {
                BatchOutput::Sum(results.iter().fold(0i64, |acc, code| acc.saturating_add(*code)))
            }
            Self::IntArray => BatchOutput::Array(results),
            Self::BoxedIntArray => BatchOutput::Boxed(results.into_boxed_slice()),
        }
    }
}

impl FromStr for ReturnShape {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ReturnShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Result of one batch update invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutput {
    Unit,
    /// Total of every per-record code.
    Sum(i64),
    /// Per-record codes in request order.
    Array(Vec<i64>),
    Boxed(Box<[i64]>),
}

impl BatchOutput {
    pub fn is_unit(&self) -> bool {
        matches!(self, Self::Unit)
    }

    pub fn as_sum(&self) -> Option<i64> {
        match self {
            Self::Sum(total) => Some(*total),
            _ => None,
        }
    }

    /// Per-record codes for either array shape.
    pub fn as_slice(&self) -> Option<&[i64]> {
        match self {
            Self::Array(codes) => Some(codes),
            Self::Boxed(codes) => Some(codes),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitelist_parses() {
        for name in RETURN_SHAPE_WHITELIST {
            let shape = ReturnShape::parse(name).unwrap();
            assert_eq!(shape.type_name(), name);
        }
        assert_eq!("int[]".parse::<ReturnShape>().unwrap(), ReturnShape::IntArray);
    }

    #[test]
    fn test_rejects_other_types() {
        let err = ReturnShape::parse("String").unwrap_err();
        assert_eq!(
            err.to_string(),
            "the return type of batch update expected one of [void, int, int[], Void, Integer, Integer[]] but String"
        );
        assert!(ReturnShape::parse("long").is_err());
        assert!(ReturnShape::parse("List<Integer>").is_err());
    }

    #[test]
    fn test_coerce() {
        assert!(ReturnShape::Void.coerce(vec![1, 2]).is_unit());
        assert!(ReturnShape::BoxedVoid.coerce(vec![1, 2]).is_unit());
        assert_eq!(ReturnShape::Int.coerce(vec![1, 2]), BatchOutput::Sum(3));
        assert_eq!(ReturnShape::BoxedInt.coerce(Vec::new()).as_sum(), Some(0));
        assert_eq!(ReturnShape::IntArray.coerce(vec![5, 8, 6]), BatchOutput::Array(vec![5, 8, 6]));
        assert_eq!(
            ReturnShape::BoxedIntArray.coerce(vec![1, 2]).as_slice(),
            Some(&[1i64, 2][..])
        );
    }

    #[test]
    fn test_sum_saturates() {
        assert_eq!(ReturnShape::Int.coerce(vec![i64::MAX, 1]).as_sum(), Some(i64::MAX));
    }
}
