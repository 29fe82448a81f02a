//! Loosely-typed values carried in environment state and info maps.

use indexmap::IndexMap;

/// Auxiliary metadata returned next to an observation fragment.
///
/// Insertion-ordered so merged info reads back in handler registration
/// order. Merging is last-write-wins on key collision.
pub type Info = IndexMap<String, Value>;

/// A single environment-state or info entry.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Boolean flag.
    Flag(bool),
    /// Signed integer (counts, frame numbers, actor ids).
    Int(i64),
    /// Double-precision scalar.
    Scalar(f64),
    /// Flat numeric vector.
    Vector(Vec<f32>),
    /// Free-form text.
    Text(String),
}

impl Value {
    /// Interpret the value as a scalar, if it has one.
    ///
    /// Flags map to `0.0` / `1.0`. Vectors and text have no scalar form.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Flag(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Int(i) => Some(*i as f64),
            Self::Scalar(s) => Some(*s),
            Self::Vector(_) | Self::Text(_) => None,
        }
    }

    /// Borrow the vector payload, if this is a [`Value::Vector`].
    pub fn as_vector(&self) -> Option<&[f32]> {
        match self {
            Self::Vector(v) => Some(v),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Flag(_) => "flag",
            Self::Int(_) => "int",
            Self::Scalar(_) => "scalar",
            Self::Vector(_) => "vector",
            Self::Text(_) => "text",
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Flag(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Scalar(v)
    }
}

impl From<Vec<f32>> for Value {
    fn from(v: Vec<f32>) -> Self {
        Self::Vector(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_views() {
        assert_eq!(Value::Flag(true).as_scalar(), Some(1.0));
        assert_eq!(Value::Flag(false).as_scalar(), Some(0.0));
        assert_eq!(Value::Int(-3).as_scalar(), Some(-3.0));
        assert_eq!(Value::Scalar(2.5).as_scalar(), Some(2.5));
        assert_eq!(Value::Vector(vec![1.0]).as_scalar(), None);
        assert_eq!(Value::from("x").as_scalar(), None);
    }

    #[test]
    fn vector_view() {
        let v = Value::from(vec![1.0, 2.0]);
        assert_eq!(v.as_vector(), Some(&[1.0, 2.0][..]));
        assert_eq!(Value::Int(1).as_vector(), None);
    }

    #[test]
    fn info_merge_is_last_write_wins() {
        let mut info = Info::new();
        info.insert("speed".into(), Value::Scalar(1.0));
        info.insert("lane".into(), Value::Int(2));
        info.insert("speed".into(), Value::Scalar(3.0));
        assert_eq!(info.len(), 2);
        assert_eq!(info["speed"], Value::Scalar(3.0));
        // Overwriting keeps the original insertion slot.
        assert_eq!(info.get_index(0).map(|(k, _)| k.as_str()), Some("speed"));
    }
}
