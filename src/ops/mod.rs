//! Binary operators
//!
//! A [`BinaryOp`] computes `z = f(x, y)` where `x`, `y` and `z` each have an
//! [`ElementType`]. Built-in operators pair an [`Opcode`] with a built-in
//! type and have a native implementation in [`native`]. User operators are
//! closures over raw bytes.
//!
//! Every operator, built-in or not, carries a byte-level function so that the
//! generic kernel can evaluate it; built-ins additionally get specialized
//! kernels selected in [`dispatch`].

pub mod dispatch;
pub mod kernel;
pub mod native;

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::error::{EwiseError, EwiseResult};
use crate::matrix::types::{with_scalar, ElementType, Scalar};
use native::{functor_bytes, with_functor};

/// Identifies a built-in operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// `z = x`
    First,
    /// `z = y`
    Second,
    /// `z = 1`
    Pair,
    Plus,
    Minus,
    /// `z = y - x`
    Rminus,
    Times,
    Div,
    /// `z = y / x`
    Rdiv,
    Min,
    Max,
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    Lor,
    Land,
    Lxor,
    /// A user-defined operator
    User,
}

impl Opcode {
    /// Every built-in opcode
    pub const BUILTIN: [Opcode; 20] = [
        Opcode::First,
        Opcode::Second,
        Opcode::Pair,
        Opcode::Plus,
        Opcode::Minus,
        Opcode::Rminus,
        Opcode::Times,
        Opcode::Div,
        Opcode::Rdiv,
        Opcode::Min,
        Opcode::Max,
        Opcode::Eq,
        Opcode::Ne,
        Opcode::Gt,
        Opcode::Lt,
        Opcode::Ge,
        Opcode::Le,
        Opcode::Lor,
        Opcode::Land,
        Opcode::Lxor,
    ];

    /// Whether the operator reads its first operand
    pub fn reads_x(self) -> bool {
        !matches!(self, Opcode::Second | Opcode::Pair)
    }

    /// Whether the operator reads its second operand
    pub fn reads_y(self) -> bool {
        !matches!(self, Opcode::First | Opcode::Pair)
    }

    /// Comparisons produce Bool whatever their input type
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Opcode::Eq | Opcode::Ne | Opcode::Gt | Opcode::Lt | Opcode::Ge | Opcode::Le
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Opcode::First => "first",
            Opcode::Second => "second",
            Opcode::Pair => "pair",
            Opcode::Plus => "plus",
            Opcode::Minus => "minus",
            Opcode::Rminus => "rminus",
            Opcode::Times => "times",
            Opcode::Div => "div",
            Opcode::Rdiv => "rdiv",
            Opcode::Min => "min",
            Opcode::Max => "max",
            Opcode::Eq => "eq",
            Opcode::Ne => "ne",
            Opcode::Gt => "gt",
            Opcode::Lt => "lt",
            Opcode::Ge => "ge",
            Opcode::Le => "le",
            Opcode::Lor => "lor",
            Opcode::Land => "land",
            Opcode::Lxor => "lxor",
            Opcode::User => "user",
        }
    }
}

/// Byte-level operator body: `f(x, y, z)` writes `z` from `x` and `y`
pub type ByteFn = Arc<dyn Fn(&[u8], &[u8], &mut [u8]) + Send + Sync>;

/// A binary operator `z = f(x, y)`
#[derive(Clone)]
pub struct BinaryOp {
    opcode: Opcode,
    xtype: ElementType,
    ytype: ElementType,
    ztype: ElementType,
    name: Cow<'static, str>,
    func: ByteFn,
}

impl BinaryOp {
    /// Creates the built-in operator `opcode` over type `ty`
    ///
    /// Comparisons return Bool; every other built-in returns `ty`.
    ///
    /// # Errors
    ///
    /// Fails for [`Opcode::User`] and for user-defined types.
    pub fn builtin(opcode: Opcode, ty: &ElementType) -> EwiseResult<Self> {
        let func: ByteFn = with_scalar!(ty.code(), T => {
            with_functor!(opcode, F => Arc::new(functor_bytes::<T, F>) as ByteFn, _ => {
                return Err(EwiseError::invalid_value("user opcode has no built-in body"));
            })
        }, _ => {
            return Err(EwiseError::invalid_value(format!(
                "no built-in {} operator for type {ty}",
                opcode.name()
            )));
        });
        let ztype = if opcode.is_comparison() {
            ElementType::BOOL
        } else {
            ty.clone()
        };
        Ok(Self {
            opcode,
            xtype: ty.clone(),
            ytype: ty.clone(),
            ztype,
            name: Cow::Owned(format!("{}_{}", opcode.name(), ty.name())),
            func,
        })
    }

    /// Creates the built-in operator `opcode` over the scalar `T`
    pub fn of<T: Scalar>(opcode: Opcode) -> EwiseResult<Self> {
        Self::builtin(opcode, &T::TYPE)
    }

    /// Creates a user operator from a byte-level closure
    ///
    /// The closure receives `x` and `y` as exactly `xtype.size()` and
    /// `ytype.size()` bytes and must fill all `ztype.size()` bytes of `z`.
    pub fn user<F>(
        name: impl Into<String>,
        xtype: ElementType,
        ytype: ElementType,
        ztype: ElementType,
        f: F,
    ) -> Self
    where
        F: Fn(&[u8], &[u8], &mut [u8]) + Send + Sync + 'static,
    {
        Self {
            opcode: Opcode::User,
            xtype,
            ytype,
            ztype,
            name: Cow::Owned(name.into()),
            func: Arc::new(f),
        }
    }

    /// Creates a user operator from a typed closure over built-in scalars
    pub fn from_fn<X, Y, Z, F>(name: impl Into<String>, f: F) -> Self
    where
        X: Scalar,
        Y: Scalar,
        Z: Scalar,
        F: Fn(X, Y) -> Z + Send + Sync + 'static,
    {
        Self::user(name, X::TYPE, Y::TYPE, Z::TYPE, move |x, y, z| {
            let x: X = bytemuck::pod_read_unaligned(x);
            let y: Y = bytemuck::pod_read_unaligned(y);
            z.copy_from_slice(bytemuck::bytes_of(&f(x, y)));
        })
    }

    /// SECOND over any type, user-defined ones included
    ///
    /// Used as the implicit operator of a merge without an operator, where
    /// the two patterns are known to be disjoint.
    pub fn second_for(ty: &ElementType) -> Self {
        if let Ok(op) = Self::builtin(Opcode::Second, ty) {
            return op;
        }
        Self {
            opcode: Opcode::Second,
            xtype: ty.clone(),
            ytype: ty.clone(),
            ztype: ty.clone(),
            name: Cow::Owned(format!("second_{}", ty.name())),
            func: Arc::new(|_x: &[u8], y: &[u8], z: &mut [u8]| z.copy_from_slice(y)),
        }
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn xtype(&self) -> &ElementType {
        &self.xtype
    }

    pub fn ytype(&self) -> &ElementType {
        &self.ytype
    }

    pub fn ztype(&self) -> &ElementType {
        &self.ztype
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reads_x(&self) -> bool {
        self.opcode.reads_x()
    }

    pub fn reads_y(&self) -> bool {
        self.opcode.reads_y()
    }

    /// Evaluates the operator on raw bytes
    #[inline]
    pub fn apply_bytes(&self, x: &[u8], y: &[u8], z: &mut [u8]) {
        (self.func)(x, y, z)
    }
}

impl fmt::Debug for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryOp")
            .field("name", &self.name)
            .field("opcode", &self.opcode)
            .field("xtype", &self.xtype.name())
            .field("ytype", &self.ytype.name())
            .field("ztype", &self.ztype.name())
            .finish()
    }
}
