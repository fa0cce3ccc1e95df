//! Element types, built-in scalars and type casting
//!
//! Matrices store their values as raw bytes described by an [`ElementType`].
//! The eleven built-in types map to native Rust scalars through the
//! [`Scalar`] trait; user-defined types are opaque byte blobs of a fixed size
//! that can only be "cast" to themselves.
//!
//! Casting between built-in types follows Rust `as` semantics (wrapping
//! integer narrowing, saturating float-to-int with NaN mapped to zero).
//! Casting to Bool tests `value != 0`.

use std::borrow::Cow;
use std::fmt;

use bytemuck::{Pod, Zeroable};
use num_traits::AsPrimitive;

use crate::error::{EwiseError, EwiseResult};

/// Runs `$body` with `$t` bound to the native scalar of a built-in type code
///
/// The `_ =>` arm runs for user-defined types.
macro_rules! with_scalar {
    ($code:expr, $t:ident => $body:expr, _ => $other:expr) => {
        match $code {
            $crate::matrix::types::TypeCode::Bool => {
                #[allow(dead_code)]
                type $t = $crate::matrix::types::Bool8;
                $body
            }
            $crate::matrix::types::TypeCode::Int8 => {
                #[allow(dead_code)]
                type $t = i8;
                $body
            }
            $crate::matrix::types::TypeCode::Int16 => {
                #[allow(dead_code)]
                type $t = i16;
                $body
            }
            $crate::matrix::types::TypeCode::Int32 => {
                #[allow(dead_code)]
                type $t = i32;
                $body
            }
            $crate::matrix::types::TypeCode::Int64 => {
                #[allow(dead_code)]
                type $t = i64;
                $body
            }
            $crate::matrix::types::TypeCode::UInt8 => {
                #[allow(dead_code)]
                type $t = u8;
                $body
            }
            $crate::matrix::types::TypeCode::UInt16 => {
                #[allow(dead_code)]
                type $t = u16;
                $body
            }
            $crate::matrix::types::TypeCode::UInt32 => {
                #[allow(dead_code)]
                type $t = u32;
                $body
            }
            $crate::matrix::types::TypeCode::UInt64 => {
                #[allow(dead_code)]
                type $t = u64;
                $body
            }
            $crate::matrix::types::TypeCode::Fp32 => {
                #[allow(dead_code)]
                type $t = f32;
                $body
            }
            $crate::matrix::types::TypeCode::Fp64 => {
                #[allow(dead_code)]
                type $t = f64;
                $body
            }
            $crate::matrix::types::TypeCode::UserDefined => $other,
        }
    };
}
pub(crate) use with_scalar;

/// Identifies the kind of an element type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCode {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Fp32,
    Fp64,
    /// Opaque fixed-size values
    UserDefined,
}

impl TypeCode {
    /// Every built-in type code
    pub const BUILTIN: [TypeCode; 11] = [
        TypeCode::Bool,
        TypeCode::Int8,
        TypeCode::Int16,
        TypeCode::Int32,
        TypeCode::Int64,
        TypeCode::UInt8,
        TypeCode::UInt16,
        TypeCode::UInt32,
        TypeCode::UInt64,
        TypeCode::Fp32,
        TypeCode::Fp64,
    ];

    pub fn is_builtin(self) -> bool {
        !matches!(self, TypeCode::UserDefined)
    }
}

/// Descriptor of a matrix element type: its code, byte size and name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementType {
    code: TypeCode,
    size: usize,
    name: Cow<'static, str>,
}

impl ElementType {
    pub const BOOL: ElementType = ElementType::builtin(TypeCode::Bool, 1, "bool");
    pub const INT8: ElementType = ElementType::builtin(TypeCode::Int8, 1, "int8");
    pub const INT16: ElementType = ElementType::builtin(TypeCode::Int16, 2, "int16");
    pub const INT32: ElementType = ElementType::builtin(TypeCode::Int32, 4, "int32");
    pub const INT64: ElementType = ElementType::builtin(TypeCode::Int64, 8, "int64");
    pub const UINT8: ElementType = ElementType::builtin(TypeCode::UInt8, 1, "uint8");
    pub const UINT16: ElementType = ElementType::builtin(TypeCode::UInt16, 2, "uint16");
    pub const UINT32: ElementType = ElementType::builtin(TypeCode::UInt32, 4, "uint32");
    pub const UINT64: ElementType = ElementType::builtin(TypeCode::UInt64, 8, "uint64");
    pub const FP32: ElementType = ElementType::builtin(TypeCode::Fp32, 4, "fp32");
    pub const FP64: ElementType = ElementType::builtin(TypeCode::Fp64, 8, "fp64");

    const fn builtin(code: TypeCode, size: usize, name: &'static str) -> Self {
        Self {
            code,
            size,
            name: Cow::Borrowed(name),
        }
    }

    /// Creates a user-defined type of `size` bytes
    ///
    /// Two user-defined types are the same type when both name and size
    /// match.
    pub fn user_defined(name: impl Into<String>, size: usize) -> EwiseResult<Self> {
        if size == 0 {
            return Err(EwiseError::invalid_value(
                "user-defined types must have a non-zero size",
            ));
        }
        Ok(Self {
            code: TypeCode::UserDefined,
            size,
            name: Cow::Owned(name.into()),
        })
    }

    /// Returns the descriptor of a built-in type code
    ///
    /// Returns `None` for [`TypeCode::UserDefined`].
    pub fn from_code(code: TypeCode) -> Option<Self> {
        with_scalar!(code, T => Some(T::TYPE), _ => None)
    }

    /// Returns the descriptor of a built-in scalar
    pub fn of<T: Scalar>() -> Self {
        T::TYPE
    }

    pub fn code(&self) -> TypeCode {
        self.code
    }

    /// Size of one value in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_builtin(&self) -> bool {
        self.code.is_builtin()
    }

    /// Built-in types cast to each other; user types only to themselves
    pub fn can_cast_to(&self, to: &ElementType) -> bool {
        (self.is_builtin() && to.is_builtin()) || self == to
    }

    /// Truthiness of one stored value
    ///
    /// Built-in values are true when non-zero. User-defined values are true
    /// when any byte is non-zero.
    pub fn is_nonzero(&self, bytes: &[u8]) -> bool {
        with_scalar!(self.code, T => read_scalar::<T>(bytes, 0).is_nonzero(),
            _ => bytes[..self.size].iter().any(|&b| b != 0))
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// One-byte boolean with a plain-old-data layout
///
/// `bool` cannot be viewed from arbitrary bytes, so Bool matrices store
/// `Bool8` values holding 0 or 1.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct Bool8(pub u8);

impl Bool8 {
    pub const FALSE: Bool8 = Bool8(0);
    pub const TRUE: Bool8 = Bool8(1);

    pub fn get(self) -> bool {
        self.0 != 0
    }
}

impl From<bool> for Bool8 {
    fn from(b: bool) -> Self {
        Bool8(b as u8)
    }
}

impl fmt::Debug for Bool8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// A single built-in value tagged with its type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Fp32(f32),
    Fp64(f64),
}

impl Value {
    pub fn is_nonzero(self) -> bool {
        match self {
            Value::Bool(b) => b,
            Value::Int8(x) => x != 0,
            Value::Int16(x) => x != 0,
            Value::Int32(x) => x != 0,
            Value::Int64(x) => x != 0,
            Value::UInt8(x) => x != 0,
            Value::UInt16(x) => x != 0,
            Value::UInt32(x) => x != 0,
            Value::UInt64(x) => x != 0,
            Value::Fp32(x) => x != 0.0,
            Value::Fp64(x) => x != 0.0,
        }
    }
}

/// A built-in element type backed by a native Rust scalar
///
/// Besides identifying the type, the trait carries the arithmetic used by
/// the built-in operators so the specialized and generic dispatch paths
/// share one definition of every operator.
pub trait Scalar:
    Pod + PartialEq + PartialOrd + fmt::Debug + Send + Sync + 'static
{
    const TYPE: ElementType;

    fn zero() -> Self;
    fn one() -> Self;
    fn from_bool(b: bool) -> Self;
    fn is_nonzero(self) -> bool;

    fn to_value(self) -> Value;
    fn from_value(v: Value) -> Self;

    fn plus(self, y: Self) -> Self;
    fn minus(self, y: Self) -> Self;
    fn times(self, y: Self) -> Self;
    fn div(self, y: Self) -> Self;
    fn min_of(self, y: Self) -> Self;
    fn max_of(self, y: Self) -> Self;

    /// Casts to another built-in scalar
    #[inline]
    fn cast<D: Scalar>(self) -> D {
        D::from_value(self.to_value())
    }
}

macro_rules! cast_value {
    ($v:expr => $t:ty) => {
        match $v {
            Value::Bool(b) => AsPrimitive::<$t>::as_(b as u8),
            Value::Int8(x) => AsPrimitive::<$t>::as_(x),
            Value::Int16(x) => AsPrimitive::<$t>::as_(x),
            Value::Int32(x) => AsPrimitive::<$t>::as_(x),
            Value::Int64(x) => AsPrimitive::<$t>::as_(x),
            Value::UInt8(x) => AsPrimitive::<$t>::as_(x),
            Value::UInt16(x) => AsPrimitive::<$t>::as_(x),
            Value::UInt32(x) => AsPrimitive::<$t>::as_(x),
            Value::UInt64(x) => AsPrimitive::<$t>::as_(x),
            Value::Fp32(x) => AsPrimitive::<$t>::as_(x),
            Value::Fp64(x) => AsPrimitive::<$t>::as_(x),
        }
    };
}

macro_rules! impl_int_scalar {
    ($t:ty, $variant:ident, $konst:ident, signed) => {
        impl_int_scalar!(@impl $t, $variant, $konst, |x: $t| {
            if x == 0 {
                0
            } else if x < 0 {
                <$t>::MIN
            } else {
                <$t>::MAX
            }
        });
    };
    ($t:ty, $variant:ident, $konst:ident, unsigned) => {
        impl_int_scalar!(@impl $t, $variant, $konst, |x: $t| {
            if x == 0 {
                0
            } else {
                <$t>::MAX
            }
        });
    };
    (@impl $t:ty, $variant:ident, $konst:ident, $div_zero:expr) => {
        impl Scalar for $t {
            const TYPE: ElementType = ElementType::$konst;

            #[inline]
            fn zero() -> Self {
                0
            }
            #[inline]
            fn one() -> Self {
                1
            }
            #[inline]
            fn from_bool(b: bool) -> Self {
                b as $t
            }
            #[inline]
            fn is_nonzero(self) -> bool {
                self != 0
            }
            #[inline]
            fn to_value(self) -> Value {
                Value::$variant(self)
            }
            #[inline]
            fn from_value(v: Value) -> Self {
                cast_value!(v => $t)
            }
            #[inline]
            fn plus(self, y: Self) -> Self {
                self.wrapping_add(y)
            }
            #[inline]
            fn minus(self, y: Self) -> Self {
                self.wrapping_sub(y)
            }
            #[inline]
            fn times(self, y: Self) -> Self {
                self.wrapping_mul(y)
            }
            #[inline]
            fn div(self, y: Self) -> Self {
                if y == 0 {
                    ($div_zero)(self)
                } else {
                    self.wrapping_div(y)
                }
            }
            #[inline]
            fn min_of(self, y: Self) -> Self {
                Ord::min(self, y)
            }
            #[inline]
            fn max_of(self, y: Self) -> Self {
                Ord::max(self, y)
            }
        }
    };
}

macro_rules! impl_float_scalar {
    ($t:ty, $variant:ident, $konst:ident) => {
        impl Scalar for $t {
            const TYPE: ElementType = ElementType::$konst;

            #[inline]
            fn zero() -> Self {
                0.0
            }
            #[inline]
            fn one() -> Self {
                1.0
            }
            #[inline]
            fn from_bool(b: bool) -> Self {
                if b {
                    1.0
                } else {
                    0.0
                }
            }
            #[inline]
            fn is_nonzero(self) -> bool {
                self != 0.0
            }
            #[inline]
            fn to_value(self) -> Value {
                Value::$variant(self)
            }
            #[inline]
            fn from_value(v: Value) -> Self {
                cast_value!(v => $t)
            }
            #[inline]
            fn plus(self, y: Self) -> Self {
                self + y
            }
            #[inline]
            fn minus(self, y: Self) -> Self {
                self - y
            }
            #[inline]
            fn times(self, y: Self) -> Self {
                self * y
            }
            #[inline]
            fn div(self, y: Self) -> Self {
                self / y
            }
            #[inline]
            fn min_of(self, y: Self) -> Self {
                self.min(y)
            }
            #[inline]
            fn max_of(self, y: Self) -> Self {
                self.max(y)
            }
        }
    };
}

impl_int_scalar!(i8, Int8, INT8, signed);
impl_int_scalar!(i16, Int16, INT16, signed);
impl_int_scalar!(i32, Int32, INT32, signed);
impl_int_scalar!(i64, Int64, INT64, signed);
impl_int_scalar!(u8, UInt8, UINT8, unsigned);
impl_int_scalar!(u16, UInt16, UINT16, unsigned);
impl_int_scalar!(u32, UInt32, UINT32, unsigned);
impl_int_scalar!(u64, UInt64, UINT64, unsigned);
impl_float_scalar!(f32, Fp32, FP32);
impl_float_scalar!(f64, Fp64, FP64);

// Boolean arithmetic: PLUS is LOR, MINUS is LXOR, TIMES is LAND, DIV is FIRST.
impl Scalar for Bool8 {
    const TYPE: ElementType = ElementType::BOOL;

    #[inline]
    fn zero() -> Self {
        Bool8::FALSE
    }
    #[inline]
    fn one() -> Self {
        Bool8::TRUE
    }
    #[inline]
    fn from_bool(b: bool) -> Self {
        Bool8::from(b)
    }
    #[inline]
    fn is_nonzero(self) -> bool {
        self.get()
    }
    #[inline]
    fn to_value(self) -> Value {
        Value::Bool(self.get())
    }
    #[inline]
    fn from_value(v: Value) -> Self {
        Bool8::from(v.is_nonzero())
    }
    #[inline]
    fn plus(self, y: Self) -> Self {
        Bool8::from(self.get() || y.get())
    }
    #[inline]
    fn minus(self, y: Self) -> Self {
        Bool8::from(self.get() != y.get())
    }
    #[inline]
    fn times(self, y: Self) -> Self {
        Bool8::from(self.get() && y.get())
    }
    #[inline]
    fn div(self, _y: Self) -> Self {
        self
    }
    #[inline]
    fn min_of(self, y: Self) -> Self {
        Bool8::from(self.get() && y.get())
    }
    #[inline]
    fn max_of(self, y: Self) -> Self {
        Bool8::from(self.get() || y.get())
    }
}


/// Reads the `idx`-th scalar out of a byte slice (no alignment required)
#[inline]
pub fn read_scalar<T: Scalar>(bytes: &[u8], idx: usize) -> T {
    let size = std::mem::size_of::<T>();
    bytemuck::pod_read_unaligned(&bytes[idx * size..(idx + 1) * size])
}

/// Writes a scalar into the `idx`-th slot of a byte slice
#[inline]
pub fn write_scalar<T: Scalar>(bytes: &mut [u8], idx: usize, value: T) {
    let size = std::mem::size_of::<T>();
    bytes[idx * size..(idx + 1) * size].copy_from_slice(bytemuck::bytes_of(&value));
}

/// Casts one value from a source slot to a destination slot
///
/// Both slices are exactly one value long.
pub type CastFn = fn(&[u8], &mut [u8]);

fn copy_bytes(src: &[u8], dst: &mut [u8]) {
    dst.copy_from_slice(src);
}

fn cast_bytes<S: Scalar, D: Scalar>(src: &[u8], dst: &mut [u8]) {
    let s: S = bytemuck::pod_read_unaligned(src);
    let d: D = s.cast();
    dst.copy_from_slice(bytemuck::bytes_of(&d));
}

/// Selects the cast function between two element types
///
/// Returns `None` when the types are not castable.
pub fn cast_fn(from: &ElementType, to: &ElementType) -> Option<CastFn> {
    if !from.can_cast_to(to) {
        return None;
    }
    if from == to && !from.is_builtin() {
        return Some(copy_bytes);
    }
    with_scalar!(from.code(), S => {
        with_scalar!(to.code(), D => Some(cast_bytes::<S, D> as CastFn), _ => None)
    }, _ => None)
}

/// Encodes a slice of scalars as bytes
pub fn scalars_to_bytes<T: Scalar>(values: &[T]) -> &[u8] {
    bytemuck::cast_slice(values)
}
