//! Native bodies of the built-in operators
//!
//! Each built-in opcode is a zero-sized functor implementing
//! [`BinaryFunctor`] for every [`Scalar`]. The specialized kernels call the
//! functor directly on typed slices; the generic path calls the same functor
//! through [`functor_bytes`], so both paths share one definition.

use crate::matrix::types::{Bool8, Scalar};
use crate::ops::Opcode;

/// A built-in operator body over the scalar `T`
pub trait BinaryFunctor<T: Scalar>: Copy + Send + Sync + 'static {
    /// Result type
    type Z: Scalar;

    const OPCODE: Opcode;

    fn apply(x: T, y: T) -> Self::Z;
}

macro_rules! functor {
    ($(#[$doc:meta])* $name:ident, $code:ident, |$x:ident, $y:ident| -> T $body:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl<T: Scalar> BinaryFunctor<T> for $name {
            type Z = T;
            const OPCODE: Opcode = Opcode::$code;

            #[inline(always)]
            #[allow(unused_variables)]
            fn apply($x: T, $y: T) -> T {
                $body
            }
        }
    };
    ($(#[$doc:meta])* $name:ident, $code:ident, |$x:ident, $y:ident| -> bool $body:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl<T: Scalar> BinaryFunctor<T> for $name {
            type Z = Bool8;
            const OPCODE: Opcode = Opcode::$code;

            #[inline(always)]
            fn apply($x: T, $y: T) -> Bool8 {
                Bool8::from($body)
            }
        }
    };
}

functor!(First, First, |x, y| -> T x);
functor!(Second, Second, |x, y| -> T y);
functor!(Pair, Pair, |x, y| -> T T::one());
functor!(Plus, Plus, |x, y| -> T x.plus(y));
functor!(Minus, Minus, |x, y| -> T x.minus(y));
functor!(Rminus, Rminus, |x, y| -> T y.minus(x));
functor!(Times, Times, |x, y| -> T x.times(y));
functor!(Div, Div, |x, y| -> T x.div(y));
functor!(Rdiv, Rdiv, |x, y| -> T y.div(x));
functor!(Min, Min, |x, y| -> T x.min_of(y));
functor!(Max, Max, |x, y| -> T x.max_of(y));
functor!(IsEq, Eq, |x, y| -> bool x == y);
functor!(IsNe, Ne, |x, y| -> bool x != y);
functor!(IsGt, Gt, |x, y| -> bool x > y);
functor!(IsLt, Lt, |x, y| -> bool x < y);
functor!(IsGe, Ge, |x, y| -> bool x >= y);
functor!(IsLe, Le, |x, y| -> bool x <= y);
functor!(
    /// Logical or, returned in the operand type
    Lor, Lor, |x, y| -> T T::from_bool(x.is_nonzero() || y.is_nonzero())
);
functor!(Land, Land, |x, y| -> T T::from_bool(x.is_nonzero() && y.is_nonzero()));
functor!(Lxor, Lxor, |x, y| -> T T::from_bool(x.is_nonzero() != y.is_nonzero()));

/// Runs `$body` with `$f` bound to the functor of a built-in opcode
///
/// The `_ =>` arm runs for [`Opcode::User`].
macro_rules! with_functor {
    ($op:expr, $f:ident => $body:expr, _ => $other:expr) => {
        match $op {
            $crate::ops::Opcode::First => {
                type $f = $crate::ops::native::First;
                $body
            }
            $crate::ops::Opcode::Second => {
                type $f = $crate::ops::native::Second;
                $body
            }
            $crate::ops::Opcode::Pair => {
                type $f = $crate::ops::native::Pair;
                $body
            }
            $crate::ops::Opcode::Plus => {
                type $f = $crate::ops::native::Plus;
                $body
            }
            $crate::ops::Opcode::Minus => {
                type $f = $crate::ops::native::Minus;
                $body
            }
            $crate::ops::Opcode::Rminus => {
                type $f = $crate::ops::native::Rminus;
                $body
            }
            $crate::ops::Opcode::Times => {
                type $f = $crate::ops::native::Times;
                $body
            }
            $crate::ops::Opcode::Div => {
                type $f = $crate::ops::native::Div;
                $body
            }
            $crate::ops::Opcode::Rdiv => {
                type $f = $crate::ops::native::Rdiv;
                $body
            }
            $crate::ops::Opcode::Min => {
                type $f = $crate::ops::native::Min;
                $body
            }
            $crate::ops::Opcode::Max => {
                type $f = $crate::ops::native::Max;
                $body
            }
            $crate::ops::Opcode::Eq => {
                type $f = $crate::ops::native::IsEq;
                $body
            }
            $crate::ops::Opcode::Ne => {
                type $f = $crate::ops::native::IsNe;
                $body
            }
            $crate::ops::Opcode::Gt => {
                type $f = $crate::ops::native::IsGt;
                $body
            }
            $crate::ops::Opcode::Lt => {
                type $f = $crate::ops::native::IsLt;
                $body
            }
            $crate::ops::Opcode::Ge => {
                type $f = $crate::ops::native::IsGe;
                $body
            }
            $crate::ops::Opcode::Le => {
                type $f = $crate::ops::native::IsLe;
                $body
            }
            $crate::ops::Opcode::Lor => {
                type $f = $crate::ops::native::Lor;
                $body
            }
            $crate::ops::Opcode::Land => {
                type $f = $crate::ops::native::Land;
                $body
            }
            $crate::ops::Opcode::Lxor => {
                type $f = $crate::ops::native::Lxor;
                $body
            }
            $crate::ops::Opcode::User => $other,
        }
    };
}
pub(crate) use with_functor;

/// Byte-level body of the functor `F` over `T`
pub(crate) fn functor_bytes<T: Scalar, F: BinaryFunctor<T>>(x: &[u8], y: &[u8], z: &mut [u8]) {
    let x: T = bytemuck::pod_read_unaligned(x);
    let y: T = bytemuck::pod_read_unaligned(y);
    z.copy_from_slice(bytemuck::bytes_of(&F::apply(x, y)));
}
