use std::fmt;

use bytemuck::Pod;
use num_traits::{Float, One, Zero};

/// Scalar kinds a tensor can hold.
///
/// The set is closed: every dispatch site matches on it exhaustively, so adding
/// a variant is a compile error until each site handles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// 32-bit IEEE 754 single-precision float
    Float32,
    /// 64-bit IEEE 754 double-precision float
    Float64,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 8-bit unsigned integer
    UInt8,
    /// 32-bit unsigned integer
    UInt32,
    /// 64-bit unsigned integer
    UInt64,
}

impl DType {
    /// All supported dtypes, in declaration order.
    pub const ALL: [DType; 7] = [
        DType::Float32,
        DType::Float64,
        DType::Int32,
        DType::Int64,
        DType::UInt8,
        DType::UInt32,
        DType::UInt64,
    ];

    /// Size in bytes of a single element.
    pub fn element_size(&self) -> usize {
        match self {
            DType::UInt8 => 1,
            DType::Float32 | DType::Int32 | DType::UInt32 => 4,
            DType::Float64 | DType::Int64 | DType::UInt64 => 8,
        }
    }

    /// Number of bytes needed to store `n` elements, or `None` on overflow.
    pub fn storage_bytes(&self, n: usize) -> Option<usize> {
        n.checked_mul(self.element_size())
    }

    /// Whether the numeric ops accept this dtype.
    pub fn is_float(&self) -> bool {
        matches!(self, DType::Float32 | DType::Float64)
    }

    /// Whether this dtype is an integer type.
    pub fn is_integer(&self) -> bool {
        !self.is_float()
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::Float32 => write!(f, "f32"),
            DType::Float64 => write!(f, "f64"),
            DType::Int32 => write!(f, "i32"),
            DType::Int64 => write!(f, "i64"),
            DType::UInt8 => write!(f, "u8"),
            DType::UInt32 => write!(f, "u32"),
            DType::UInt64 => write!(f, "u64"),
        }
    }
}

mod private {
    pub trait Sealed {}
}

/// A Rust scalar type that can live in tensor storage.
///
/// Implemented for exactly the seven types [`DType`] names; the trait is sealed.
pub trait Element:
    private::Sealed + Pod + Zero + One + PartialEq + fmt::Debug + Send + Sync + 'static
{
    /// The dtype tag for this type.
    const DTYPE: DType;
}

/// Floating-point elements accepted by the numeric kernels.
pub trait FloatElement: Element + Float {
    /// sqrt(2/π), used by the tanh form of GELU.
    const SQRT_2_OVER_PI: Self;
    /// Cubic coefficient of the tanh form of GELU.
    const GELU_COEFF: Self;

    /// Lossy conversion from f64, for constants and initializer bounds.
    fn cast_f64(v: f64) -> Self;
}

macro_rules! impl_element {
    ($($rust:ty => $variant:ident),* $(,)?) => {
        $(
            impl private::Sealed for $rust {}
            impl Element for $rust {
                const DTYPE: DType = DType::$variant;
            }
        )*
    };
}

impl_element!(
    f32 => Float32,
    f64 => Float64,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u32 => UInt32,
    u64 => UInt64,
);

impl FloatElement for f32 {
    const SQRT_2_OVER_PI: Self = 0.797_884_6;
    const GELU_COEFF: Self = 0.044715;

    fn cast_f64(v: f64) -> Self {
        v as f32
    }
}

impl FloatElement for f64 {
    const SQRT_2_OVER_PI: Self = 0.797_884_560_802_865_4;
    const GELU_COEFF: Self = 0.044715;

    fn cast_f64(v: f64) -> Self {
        v
    }
}

/// Bind `$T` to the Rust type behind a float dtype and evaluate `$body`.
///
/// Integer dtypes return `Err(TorchletError::UnsupportedDtype)` from the
/// enclosing function.
#[macro_export]
macro_rules! dispatch_float {
    ($dtype:expr, $T:ident => $body:expr) => {
        match $dtype {
            $crate::DType::Float32 => {
                type $T = f32;
                $body
            }
            $crate::DType::Float64 => {
                type $T = f64;
                $body
            }
            other @ ($crate::DType::Int32
            | $crate::DType::Int64
            | $crate::DType::UInt8
            | $crate::DType::UInt32
            | $crate::DType::UInt64) => {
                return Err($crate::TorchletError::UnsupportedDtype(other).into());
            }
        }
    };
}

/// Bind `$T` to the Rust type behind any dtype and evaluate `$body`.
#[macro_export]
macro_rules! dispatch_all {
    ($dtype:expr, $T:ident => $body:expr) => {
        match $dtype {
            $crate::DType::Float32 => {
                type $T = f32;
                $body
            }
            $crate::DType::Float64 => {
                type $T = f64;
                $body
            }
            $crate::DType::Int32 => {
                type $T = i32;
                $body
            }
            $crate::DType::Int64 => {
                type $T = i64;
                $body
            }
            $crate::DType::UInt8 => {
                type $T = u8;
                $body
            }
            $crate::DType::UInt32 => {
                type $T = u32;
                $body
            }
            $crate::DType::UInt64 => {
                type $T = u64;
                $body
            }
        }
    };
}
