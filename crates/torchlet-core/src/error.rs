use crate::DType;

/// Errors raised by tensor construction, views and ops.
///
/// Every variant is raised before any write happens, so a failed call leaves
/// all storage untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TorchletError {
    #[error("invalid shape {shape:?}: {reason}")]
    InvalidShape { shape: Vec<usize>, reason: String },

    #[error("index {index:?} out of range for shape {shape:?}")]
    IndexOutOfRange { index: Vec<usize>, shape: Vec<usize> },

    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },

    #[error("dtype mismatch: expected {expected}, got {got}")]
    DtypeMismatch { expected: DType, got: DType },

    #[error("{0} must be contiguous")]
    NotContiguous(String),

    #[error("unsupported dtype {0} for this operation")]
    UnsupportedDtype(DType),

    #[error("invalid slice [{start}, {end}): end must be greater than start")]
    InvalidSlice { start: usize, end: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let e = TorchletError::DtypeMismatch {
            expected: DType::Float32,
            got: DType::Int64,
        };
        assert_eq!(e.to_string(), "dtype mismatch: expected f32, got i64");

        let e = TorchletError::NotContiguous("x".into());
        assert_eq!(e.to_string(), "x must be contiguous");

        let e = TorchletError::IndexOutOfRange {
            index: vec![3, 0],
            shape: vec![3, 2],
        };
        assert!(e.to_string().contains("[3, 0]"));
    }
}
