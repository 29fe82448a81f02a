//! Observation fragments and the output specs handlers declare for them.
//!
//! A [`Fragment`] is one handler's array for a single step. It owns its
//! buffer, so a fragment handed out on step `t` can never be mutated by
//! the producing handler on step `t + 1`.

use crate::error::HandlerError;
use smallvec::SmallVec;
use std::fmt;

/// Array dimensions, outermost first (`[height, width, channels]` for images).
pub type Shape = SmallVec<[usize; 4]>;

/// Element type of a fragment buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dtype {
    /// 32-bit float (masks, scalar messages).
    F32,
    /// Unsigned byte (camera, lidar and birdeye images).
    U8,
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::F32 => write!(f, "f32"),
            Self::U8 => write!(f, "u8"),
        }
    }
}

/// Declared shape and dtype of a handler's fragment.
///
/// Fixed for the lifetime of the handler; downstream observation-space
/// declarations are built from it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OutputSpec {
    /// Array dimensions.
    pub shape: Shape,
    /// Element type.
    pub dtype: Dtype,
}

impl OutputSpec {
    /// Create a spec from explicit dimensions.
    pub fn new(shape: Shape, dtype: Dtype) -> Self {
        Self { shape, dtype }
    }

    /// `(height, width, channels)` image spec.
    pub fn image(height: usize, width: usize, channels: usize, dtype: Dtype) -> Self {
        Self::new(SmallVec::from_slice(&[height, width, channels]), dtype)
    }

    /// One-dimensional vector spec.
    pub fn vector(len: usize, dtype: Dtype) -> Self {
        Self::new(SmallVec::from_slice(&[len]), dtype)
    }

    /// Total number of elements (product of dimensions).
    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }

    /// Reject empty shapes and zero-sized dimensions.
    pub fn validate(&self) -> Result<(), String> {
        if self.shape.is_empty() {
            return Err("shape must have at least one dimension".to_string());
        }
        if let Some(axis) = self.shape.iter().position(|&d| d == 0) {
            return Err(format!(
                "shape {:?} has zero-sized dimension at axis {axis}",
                self.shape.as_slice()
            ));
        }
        Ok(())
    }
}

/// Typed fragment buffer.
#[derive(Clone, Debug, PartialEq)]
pub enum FragmentData {
    /// 32-bit float elements.
    F32(Vec<f32>),
    /// Byte elements.
    U8(Vec<u8>),
}

impl FragmentData {
    /// Element type of the buffer.
    pub fn dtype(&self) -> Dtype {
        match self {
            Self::F32(_) => Dtype::F32,
            Self::U8(_) => Dtype::U8,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Self::F32(v) => v.len(),
            Self::U8(v) => v.len(),
        }
    }

    /// Whether the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One handler's observation array for a single step.
///
/// Row-major (C order): the last dimension varies fastest.
#[derive(Clone, Debug, PartialEq)]
pub struct Fragment {
    shape: Shape,
    data: FragmentData,
}

impl Fragment {
    /// Wrap a buffer, checking that its length matches `shape`.
    pub fn new(shape: Shape, data: FragmentData) -> Result<Self, HandlerError> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(HandlerError::BufferLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// Float fragment.
    pub fn from_f32(shape: Shape, data: Vec<f32>) -> Result<Self, HandlerError> {
        Self::new(shape, FragmentData::F32(data))
    }

    /// Byte fragment.
    pub fn from_u8(shape: Shape, data: Vec<u8>) -> Result<Self, HandlerError> {
        Self::new(shape, FragmentData::U8(data))
    }

    /// Array dimensions.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Element type.
    pub fn dtype(&self) -> Dtype {
        self.data.dtype()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the fragment holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Underlying buffer.
    pub fn data(&self) -> &FragmentData {
        &self.data
    }

    /// Consume the fragment, returning its buffer.
    pub fn into_data(self) -> FragmentData {
        self.data
    }

    /// Float elements, if this is an `F32` fragment.
    pub fn as_f32(&self) -> Option<&[f32]> {
        match &self.data {
            FragmentData::F32(v) => Some(v),
            FragmentData::U8(_) => None,
        }
    }

    /// Byte elements, if this is a `U8` fragment.
    pub fn as_u8(&self) -> Option<&[u8]> {
        match &self.data {
            FragmentData::U8(v) => Some(v),
            FragmentData::F32(_) => None,
        }
    }

    /// Row-major flat offset of a multi-index, or `None` if out of bounds.
    pub fn offset(&self, index: &[usize]) -> Option<usize> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut offset = 0usize;
        for (&i, &dim) in index.iter().zip(&self.shape) {
            if i >= dim {
                return None;
            }
            offset = offset * dim + i;
        }
        Some(offset)
    }

    /// Element at a multi-index, widened to `f64`.
    pub fn get(&self, index: &[usize]) -> Option<f64> {
        let offset = self.offset(index)?;
        match &self.data {
            FragmentData::F32(v) => v.get(offset).map(|&x| f64::from(x)),
            FragmentData::U8(v) => v.get(offset).map(|&x| f64::from(x)),
        }
    }

    /// Whether shape and dtype both match `spec`.
    pub fn conforms_to(&self, spec: &OutputSpec) -> bool {
        self.shape == spec.shape && self.dtype() == spec.dtype
    }

    /// The spec this fragment would satisfy.
    pub fn spec(&self) -> OutputSpec {
        OutputSpec {
            shape: self.shape.clone(),
            dtype: self.dtype(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn element_count_is_product() {
        assert_eq!(OutputSpec::image(4, 5, 3, Dtype::U8).element_count(), 60);
        assert_eq!(OutputSpec::vector(7, Dtype::F32).element_count(), 7);
    }

    #[test]
    fn validate_rejects_zero_dims() {
        assert!(OutputSpec::image(4, 0, 3, Dtype::U8).validate().is_err());
        assert!(OutputSpec::new(Shape::new(), Dtype::F32).validate().is_err());
        assert!(OutputSpec::image(1, 1, 1, Dtype::F32).validate().is_ok());
    }

    #[test]
    fn new_rejects_length_mismatch() {
        let err = Fragment::from_f32(smallvec![2, 2], vec![0.0; 3]).unwrap_err();
        assert_eq!(
            err,
            HandlerError::BufferLength {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn get_reads_row_major() {
        // shape (2, 3, 1): element (1, 2, 0) sits at offset 5.
        let frag = Fragment::from_f32(smallvec![2, 3, 1], (0..6).map(|i| i as f32).collect())
            .unwrap();
        assert_eq!(frag.get(&[1, 2, 0]), Some(5.0));
        assert_eq!(frag.get(&[0, 1, 0]), Some(1.0));
        assert_eq!(frag.get(&[2, 0, 0]), None);
        assert_eq!(frag.get(&[0, 0]), None);
    }

    #[test]
    fn conforms_checks_shape_and_dtype() {
        let frag = Fragment::from_u8(smallvec![1, 2, 3], vec![0; 6]).unwrap();
        assert!(frag.conforms_to(&OutputSpec::image(1, 2, 3, Dtype::U8)));
        assert!(!frag.conforms_to(&OutputSpec::image(1, 2, 3, Dtype::F32)));
        assert!(!frag.conforms_to(&OutputSpec::image(2, 1, 3, Dtype::U8)));
        assert_eq!(frag.spec(), OutputSpec::image(1, 2, 3, Dtype::U8));
    }

    #[test]
    fn typed_views() {
        let f = Fragment::from_f32(smallvec![1], vec![0.5]).unwrap();
        assert_eq!(f.as_f32(), Some(&[0.5][..]));
        assert!(f.as_u8().is_none());
        assert_eq!(f.dtype(), Dtype::F32);
        assert_eq!(f.len(), 1);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn shape_and_index() -> impl Strategy<Value = (Vec<usize>, Vec<usize>)> {
            prop::collection::vec(1usize..6, 1..4).prop_flat_map(|dims| {
                let index: Vec<_> = dims.iter().map(|&d| 0..d).collect();
                (Just(dims), index)
            })
        }

        proptest! {
            #[test]
            fn offsets_are_row_major((dims, index) in shape_and_index()) {
                let shape = Shape::from_slice(&dims);
                let n: usize = dims.iter().product();
                let frag = Fragment::from_f32(shape, (0..n).map(|i| i as f32).collect()).unwrap();
                let offset = frag.offset(&index).unwrap();
                prop_assert!(offset < n);
                prop_assert_eq!(frag.get(&index), Some(offset as f64));
                // Stepping the last axis moves by one element.
                let last = index.len() - 1;
                if index[last] + 1 < dims[last] {
                    let mut next = index.clone();
                    next[last] += 1;
                    prop_assert_eq!(frag.offset(&next), Some(offset + 1));
                }
            }
        }
    }
}
