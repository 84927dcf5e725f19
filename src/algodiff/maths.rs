//! Differentiable operators.
//!
//! Every operator accepts any `Value` variant. Leaves are handed to the backend, duals are
//! unpacked and their tangent is computed with the exact derivative rule of the operator, which
//! is itself expressed with the operators in this module so that nested duals propagate to any
//! depth.

use super::{
    Value, backend,
    value::{sign, zero},
};
use crate::Result;

fn lift(x: &Value, like: &Value) -> Value {
    Value::make_dual(x.clone(), zero(like))
}

/// Adds two values.
pub fn add(a: &Value, b: &Value) -> Result<Value> {
    match (a, b) {
        (Value::Dual(ap, at), Value::Dual(bp, bt)) => {
            Ok(Value::make_dual(add(ap, bp)?, add(at, bt)?))
        }
        (Value::Dual(_, at), _) => add(a, &lift(b, at)),
        (_, Value::Dual(_, bt)) => add(&lift(a, bt), b),
        _ => backend::zip_with("add", a, b, |x, y| x + y),
    }
}

/// Subtracts `b` from `a`.
pub fn sub(a: &Value, b: &Value) -> Result<Value> {
    match (a, b) {
        (Value::Dual(ap, at), Value::Dual(bp, bt)) => {
            Ok(Value::make_dual(sub(ap, bp)?, sub(at, bt)?))
        }
        (Value::Dual(_, at), _) => sub(a, &lift(b, at)),
        (_, Value::Dual(_, bt)) => sub(&lift(a, bt), b),
        _ => backend::zip_with("sub", a, b, |x, y| x - y),
    }
}

/// Multiplies two values elementwise, applying the product rule to duals.
pub fn mul(a: &Value, b: &Value) -> Result<Value> {
    match (a, b) {
        (Value::Dual(ap, at), Value::Dual(bp, bt)) => {
            let p = mul(ap, bp)?;
            let t = add(&mul(ap, bt)?, &mul(at, bp)?)?;
            Ok(Value::make_dual(p, t))
        }
        (Value::Dual(ap, at), _) => Ok(Value::make_dual(mul(ap, b)?, mul(at, b)?)),
        (_, Value::Dual(bp, bt)) => Ok(Value::make_dual(mul(a, bp)?, mul(a, bt)?)),
        _ => backend::zip_with("mul", a, b, |x, y| x * y),
    }
}

/// Divides `a` by `b` elementwise, applying the quotient rule to duals.
///
/// Dividing by an exact zero yields non-finite values, not an error.
pub fn div(a: &Value, b: &Value) -> Result<Value> {
    match (a, b) {
        (Value::Dual(ap, at), Value::Dual(bp, bt)) => {
            let p = div(ap, bp)?;
            let t = sub(&div(at, bp)?, &div(&mul(ap, bt)?, &mul(bp, bp)?)?)?;
            Ok(Value::make_dual(p, t))
        }
        (Value::Dual(ap, at), _) => Ok(Value::make_dual(div(ap, b)?, div(at, b)?)),
        (_, Value::Dual(_, bt)) => div(&lift(a, bt), b),
        _ => backend::zip_with("div", a, b, |x, y| x / y),
    }
}

/// Negates a value.
pub fn neg(x: &Value) -> Result<Value> {
    match x {
        Value::Dual(p, t) => Ok(Value::make_dual(neg(p)?, neg(t)?)),
        _ => backend::map("neg", x, |v| -v),
    }
}

pub fn abs(x: &Value) -> Result<Value> {
    match x {
        Value::Dual(p, t) => Ok(Value::make_dual(abs(p)?, mul(t, &sign(p))?)),
        _ => backend::map("abs", x, f64::abs),
    }
}

pub fn sqr(x: &Value) -> Result<Value> {
    mul(x, x)
}

pub fn sqrt(x: &Value) -> Result<Value> {
    match x {
        Value::Dual(p, t) => {
            let s = sqrt(p)?;
            let dt = div(t, &mul(&Value::Scalar(2.0), &s)?)?;
            Ok(Value::make_dual(s, dt))
        }
        _ => backend::map("sqrt", x, f64::sqrt),
    }
}

pub fn exp(x: &Value) -> Result<Value> {
    match x {
        Value::Dual(p, t) => {
            let e = exp(p)?;
            let dt = mul(t, &e)?;
            Ok(Value::make_dual(e, dt))
        }
        _ => backend::map("exp", x, f64::exp),
    }
}

/// Natural logarithm.
pub fn log(x: &Value) -> Result<Value> {
    match x {
        Value::Dual(p, t) => Ok(Value::make_dual(log(p)?, div(t, p)?)),
        _ => backend::map("log", x, f64::ln),
    }
}

pub fn sin(x: &Value) -> Result<Value> {
    match x {
        Value::Dual(p, t) => Ok(Value::make_dual(sin(p)?, mul(t, &cos(p)?)?)),
        _ => backend::map("sin", x, f64::sin),
    }
}

pub fn cos(x: &Value) -> Result<Value> {
    match x {
        Value::Dual(p, t) => Ok(Value::make_dual(cos(p)?, neg(&mul(t, &sin(p)?)?)?)),
        _ => backend::map("cos", x, f64::cos),
    }
}

pub fn tanh(x: &Value) -> Result<Value> {
    match x {
        Value::Dual(p, t) => {
            let th = tanh(p)?;
            let dt = mul(t, &sub(&Value::Scalar(1.0), &sqr(&th)?)?)?;
            Ok(Value::make_dual(th, dt))
        }
        _ => backend::map("tanh", x, f64::tanh),
    }
}

/// The logistic function `1 / (1 + e^-x)`.
pub fn sigmoid(x: &Value) -> Result<Value> {
    match x {
        Value::Dual(p, t) => {
            let s = sigmoid(p)?;
            let dt = mul(t, &mul(&s, &sub(&Value::Scalar(1.0), &s)?)?)?;
            Ok(Value::make_dual(s, dt))
        }
        _ => backend::map("sigmoid", x, |v| 1.0 / (1.0 + (-v).exp())),
    }
}

/// Rectified linear unit, `max(x, 0)` elementwise.
pub fn relu(x: &Value) -> Result<Value> {
    match x {
        Value::Dual(p, t) => Ok(Value::make_dual(relu(p)?, mul(t, &step(p)?)?)),
        _ => backend::map("relu", x, |v| v.max(0.0)),
    }
}

// Heaviside step of the primal, its derivative is ignored.
fn step(x: &Value) -> Result<Value> {
    match x {
        Value::Dual(p, _) => step(p),
        _ => backend::map("step", x, |v| if v > 0.0 { 1.0 } else { 0.0 }),
    }
}

/// Adds up every element, returning a scalar.
pub fn sum(x: &Value) -> Result<Value> {
    match x {
        Value::Dual(p, t) => Ok(Value::make_dual(sum(p)?, sum(t)?)),
        _ => backend::sum(x).map(Value::Scalar),
    }
}

/// Average of every element.
pub fn mean(x: &Value) -> Result<Value> {
    let n = x.shape().iter().product::<usize>();
    div(&sum(x)?, &Value::Scalar(n as f64))
}

pub fn l1norm(x: &Value) -> Result<Value> {
    sum(&abs(x)?)
}

pub fn l2norm_sqr(x: &Value) -> Result<Value> {
    sum(&sqr(x)?)
}

pub fn l2norm(x: &Value) -> Result<Value> {
    sqrt(&l2norm_sqr(x)?)
}

/// Greatest element of `x`. The tangent is the one found at the primal's argmax.
pub fn max(x: &Value) -> Result<Value> {
    let k = backend::argmax(&x.primal_deep())?;
    index_flat(x, k)
}

fn index_flat(x: &Value, k: usize) -> Result<Value> {
    match x {
        Value::Dual(p, t) => Ok(Value::make_dual(index_flat(p, k)?, index_flat(t, k)?)),
        _ => backend::index_flat(x, k).map(Value::Scalar),
    }
}

/// Matrix product of two 2-D values. A scalar operand scales the other one.
pub fn dot(a: &Value, b: &Value) -> Result<Value> {
    match (a, b) {
        (Value::Dual(ap, at), Value::Dual(bp, bt)) => {
            let p = dot(ap, bp)?;
            let t = add(&dot(ap, bt)?, &dot(at, bp)?)?;
            Ok(Value::make_dual(p, t))
        }
        (Value::Dual(ap, at), _) => Ok(Value::make_dual(dot(ap, b)?, dot(at, b)?)),
        (_, Value::Dual(bp, bt)) => Ok(Value::make_dual(dot(a, bp)?, dot(a, bt)?)),
        (Value::Scalar(_), _) | (_, Value::Scalar(_)) => mul(a, b),
        _ => backend::matmul(a, b),
    }
}
