use std::fmt;

use ndarray::{Array1, Array2, ArrayD};

use crate::{OptimErr, Result};

/// A differentiable value.
///
/// A `Dual` pairs a primal with its tangent, that is, its derivative with respect to an implicit
/// differentiation variable. Nesting duals inside duals carries higher-order derivatives, the
/// nesting depth being the differentiation order. Any non-dual value behaves as a dual whose
/// tangent is zero.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(f64),
    Tensor(ArrayD<f64>),
    Dual(Box<Value>, Box<Value>),
}

impl Value {
    /// Creates a new `Dual` out of a primal and its tangent.
    ///
    /// # Arguments
    /// * `primal` - The value being differentiated.
    /// * `tangent` - Its derivative.
    pub fn make_dual(primal: Value, tangent: Value) -> Self {
        Self::Dual(Box::new(primal), Box::new(tangent))
    }

    /// Returns the name of this value's variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Scalar(_) => "scalar",
            Value::Tensor(_) => "tensor",
            Value::Dual(..) => "dual",
        }
    }

    /// Returns the amount of dual layers wrapping the innermost primal.
    pub fn depth(&self) -> usize {
        match self {
            Value::Dual(p, _) => 1 + p.depth(),
            _ => 0,
        }
    }

    /// Returns the primal of this value, stripping a single dual layer.
    pub fn primal(&self) -> &Value {
        match self {
            Value::Dual(p, _) => p,
            _ => self,
        }
    }

    /// Returns the tangent of this value, or a zero shaped like it if it's not a dual.
    pub fn tangent(&self) -> Value {
        match self {
            Value::Dual(_, t) => (**t).clone(),
            _ => zero(self),
        }
    }

    /// Strips every dual layer, leaving a plain `Scalar` or `Tensor`.
    pub fn primal_deep(&self) -> Value {
        match self {
            Value::Dual(p, _) => p.primal_deep(),
            other => other.clone(),
        }
    }

    /// Returns the shape of the innermost primal, empty for scalars.
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Value::Scalar(_) => Vec::new(),
            Value::Tensor(a) => a.shape().to_vec(),
            Value::Dual(p, _) => p.shape(),
        }
    }

    /// Unpacks a single-element value into an `f64`.
    ///
    /// # Returns
    /// The innermost primal number or an error if the value holds more than one element.
    pub fn to_scalar(&self) -> Result<f64> {
        match self {
            Value::Scalar(v) => Ok(*v),
            Value::Tensor(a) if a.len() == 1 => a.iter().next().copied().ok_or(OptimErr::TypeMismatch {
                op: "to_scalar",
                got: "tensor",
            }),
            Value::Tensor(_) => Err(OptimErr::TypeMismatch {
                op: "to_scalar",
                got: "tensor",
            }),
            Value::Dual(p, _) => p.to_scalar(),
        }
    }
}

/// Returns the primal of `x`, one level deep.
pub fn value(x: &Value) -> &Value {
    x.primal()
}

/// Returns the tangent of `x`, zero if `x` is not a dual.
pub fn dual(x: &Value) -> Value {
    x.tangent()
}

/// Returns a value shaped like `x` whose every component is zero.
pub fn zero(x: &Value) -> Value {
    match x {
        Value::Scalar(_) => Value::Scalar(0.0),
        Value::Tensor(a) => Value::Tensor(ArrayD::zeros(a.raw_dim())),
        Value::Dual(p, t) => Value::make_dual(zero(p), zero(t)),
    }
}

/// Returns a value shaped like `x` whose primal is one and whose tangents are zero.
pub fn one(x: &Value) -> Value {
    match x {
        Value::Scalar(_) => Value::Scalar(1.0),
        Value::Tensor(a) => Value::Tensor(ArrayD::ones(a.raw_dim())),
        Value::Dual(p, t) => Value::make_dual(one(p), zero(t)),
    }
}

/// Whether every scalar component of `x`, primal and tangent at all depths, is exactly zero.
pub fn is_zero(x: &Value) -> bool {
    match x {
        Value::Scalar(v) => *v == 0.0,
        Value::Tensor(a) => a.iter().all(|v| *v == 0.0),
        Value::Dual(p, t) => is_zero(p) && is_zero(t),
    }
}

/// Whether `x` is constant with respect to differentiation, that is, every tangent component at
/// every depth is zero.
pub fn is_const(x: &Value) -> bool {
    match x {
        Value::Dual(p, t) => is_zero(t) && is_const(p),
        _ => true,
    }
}

/// Elementwise sign of the primal. Its derivative is ignored.
pub fn sign(x: &Value) -> Value {
    match x {
        Value::Scalar(v) => Value::Scalar(sgn(*v)),
        Value::Tensor(a) => Value::Tensor(a.mapv(sgn)),
        Value::Dual(p, _) => sign(p),
    }
}

fn sgn(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        v
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Scalar(value)
    }
}

impl From<ArrayD<f64>> for Value {
    fn from(value: ArrayD<f64>) -> Self {
        Self::Tensor(value)
    }
}

impl From<Array2<f64>> for Value {
    fn from(value: Array2<f64>) -> Self {
        Self::Tensor(value.into_dyn())
    }
}

impl From<Array1<f64>> for Value {
    fn from(value: Array1<f64>) -> Self {
        Self::Tensor(value.into_dyn())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(v) => write!(f, "{v}"),
            Value::Tensor(a) => write!(f, "{a}"),
            Value::Dual(p, t) => write!(f, "dual({p}, {t})"),
        }
    }
}
