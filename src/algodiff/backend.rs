//! Primitive numeric operations over the leaves of a `Value`, that is, `Scalar` and `Tensor`.
//!
//! Nothing in here knows about duals: every function rejects them with a `TypeMismatch`. The
//! derivative rules in `maths` peel the dual layers off before reaching this module.

use std::ops::Range;

use ndarray::{ArrayD, Axis, Ix2, IxDyn, Slice, Zip};

use super::Value;
use crate::{OptimErr, Result};

/// Combines two leaves elementwise, broadcasting their shapes the way NumPy does.
///
/// # Arguments
/// * `op` - The name of the calling operation, used for diagnostics.
/// * `a` - The left-hand side.
/// * `b` - The right-hand side.
/// * `f` - The elementwise operation.
///
/// # Returns
/// The combined leaf or an error if the shapes are incompatible.
pub fn zip_with<F>(op: &'static str, a: &Value, b: &Value, f: F) -> Result<Value>
where
    F: Fn(f64, f64) -> f64,
{
    match (a, b) {
        (Value::Scalar(x), Value::Scalar(y)) => Ok(Value::Scalar(f(*x, *y))),
        (Value::Scalar(x), Value::Tensor(b)) => Ok(Value::Tensor(b.mapv(|y| f(*x, y)))),
        (Value::Tensor(a), Value::Scalar(y)) => Ok(Value::Tensor(a.mapv(|x| f(x, *y)))),
        (Value::Tensor(a), Value::Tensor(b)) => {
            let shape = broadcast_shape(op, a.shape(), b.shape())?;
            let dim = IxDyn(&shape);
            let mismatch = || OptimErr::ShapeMismatch {
                op,
                lhs: a.shape().to_vec(),
                rhs: b.shape().to_vec(),
            };

            let lhs = a.broadcast(dim.clone()).ok_or_else(mismatch)?;
            let rhs = b.broadcast(dim).ok_or_else(mismatch)?;
            let out = Zip::from(&lhs).and(&rhs).map_collect(|x, y| f(*x, *y));
            Ok(Value::Tensor(out))
        }
        (Value::Dual(..), _) | (_, Value::Dual(..)) => {
            Err(OptimErr::TypeMismatch { op, got: "dual" })
        }
    }
}

fn broadcast_shape(op: &'static str, a: &[usize], b: &[usize]) -> Result<Vec<usize>> {
    let n = a.len().max(b.len());
    let (pad_a, pad_b) = (n - a.len(), n - b.len());

    (0..n)
        .map(|i| {
            let da = if i < pad_a { 1 } else { a[i - pad_a] };
            let db = if i < pad_b { 1 } else { b[i - pad_b] };

            match (da, db) {
                (x, y) if x == y => Ok(x),
                (1, y) => Ok(y),
                (x, 1) => Ok(x),
                _ => Err(OptimErr::ShapeMismatch {
                    op,
                    lhs: a.to_vec(),
                    rhs: b.to_vec(),
                }),
            }
        })
        .collect()
}

/// Applies `f` to every element of a leaf.
pub fn map<F>(op: &'static str, x: &Value, f: F) -> Result<Value>
where
    F: Fn(f64) -> f64,
{
    match x {
        Value::Scalar(v) => Ok(Value::Scalar(f(*v))),
        Value::Tensor(a) => Ok(Value::Tensor(a.mapv(f))),
        Value::Dual(..) => Err(OptimErr::TypeMismatch { op, got: "dual" }),
    }
}

/// Adds up every element of a leaf.
pub fn sum(x: &Value) -> Result<f64> {
    match x {
        Value::Scalar(v) => Ok(*v),
        Value::Tensor(a) => Ok(a.sum()),
        Value::Dual(..) => Err(OptimErr::TypeMismatch {
            op: "sum",
            got: "dual",
        }),
    }
}

/// Returns the flat, row-major index of the greatest element of a leaf.
pub fn argmax(x: &Value) -> Result<usize> {
    match x {
        Value::Scalar(_) => Ok(0),
        Value::Tensor(a) => a
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (i, v)| match best {
                Some((_, m)) if m >= *v => best,
                _ => Some((i, *v)),
            })
            .map(|(i, _)| i)
            .ok_or(OptimErr::InvalidInput("argmax of an empty tensor")),
        Value::Dual(..) => Err(OptimErr::TypeMismatch {
            op: "argmax",
            got: "dual",
        }),
    }
}

/// Returns the element at flat, row-major index `k`. A scalar stands for every index.
pub fn index_flat(x: &Value, k: usize) -> Result<f64> {
    match x {
        Value::Scalar(v) => Ok(*v),
        Value::Tensor(a) => a
            .iter()
            .nth(k)
            .copied()
            .ok_or(OptimErr::InvalidInput("flat index out of bounds")),
        Value::Dual(..) => Err(OptimErr::TypeMismatch {
            op: "index_flat",
            got: "dual",
        }),
    }
}

/// Matrix product of two 2-D tensors.
pub fn matmul(a: &Value, b: &Value) -> Result<Value> {
    let (Value::Tensor(a), Value::Tensor(b)) = (a, b) else {
        let got = if a.kind() == "tensor" { b.kind() } else { a.kind() };
        return Err(OptimErr::TypeMismatch { op: "dot", got });
    };

    let mismatch = || OptimErr::ShapeMismatch {
        op: "dot",
        lhs: a.shape().to_vec(),
        rhs: b.shape().to_vec(),
    };

    let lhs = a.view().into_dimensionality::<Ix2>().map_err(|_| mismatch())?;
    let rhs = b.view().into_dimensionality::<Ix2>().map_err(|_| mismatch())?;

    if lhs.ncols() != rhs.nrows() {
        return Err(mismatch());
    }

    Ok(Value::Tensor(lhs.dot(&rhs).into_dyn()))
}

/// Returns the amount of rows, the length of the first axis, of a tensor.
pub fn rows(x: &Value) -> Result<usize> {
    match x {
        Value::Tensor(a) if a.ndim() > 0 => Ok(a.len_of(Axis(0))),
        _ => Err(OptimErr::TypeMismatch {
            op: "rows",
            got: x.kind(),
        }),
    }
}

/// Returns the contiguous rows in `range`.
pub fn slice_rows(x: &Value, range: Range<usize>) -> Result<Value> {
    match x {
        Value::Tensor(a) if a.ndim() > 0 && range.end <= a.len_of(Axis(0)) => Ok(Value::Tensor(
            a.slice_axis(Axis(0), Slice::from(range)).to_owned(),
        )),
        Value::Tensor(a) if a.ndim() > 0 => Err(OptimErr::InvalidInput("row range out of bounds")),
        _ => Err(OptimErr::TypeMismatch {
            op: "slice_rows",
            got: x.kind(),
        }),
    }
}

/// Returns the rows at `indices`, in that order.
pub fn select_rows(x: &Value, indices: &[usize]) -> Result<Value> {
    match x {
        Value::Tensor(a) if a.ndim() > 0 => {
            let n = a.len_of(Axis(0));
            if indices.iter().any(|i| *i >= n) {
                return Err(OptimErr::InvalidInput("row index out of bounds"));
            }

            Ok(Value::Tensor(a.select(Axis(0), indices)))
        }
        _ => Err(OptimErr::TypeMismatch {
            op: "select_rows",
            got: x.kind(),
        }),
    }
}

/// Returns a tensor of the given shape that is one at flat index `k` and zero elsewhere.
pub fn basis(shape: &[usize], k: usize) -> ArrayD<f64> {
    let mut out = ArrayD::zeros(IxDyn(shape));
    if let Some(v) = out.iter_mut().nth(k) {
        *v = 1.0;
    }
    out
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn broadcasts_rows_against_columns() {
        let a = Value::from(array![[1.0], [2.0]]);
        let b = Value::from(array![10.0, 20.0, 30.0]);
        let c = zip_with("add", &a, &b, |x, y| x + y).unwrap();

        assert_eq!(
            c,
            Value::from(array![[11.0, 21.0, 31.0], [12.0, 22.0, 32.0]])
        );
    }

    #[test]
    fn incompatible_shapes_are_an_error() {
        let a = Value::from(array![1.0, 2.0]);
        let b = Value::from(array![1.0, 2.0, 3.0]);

        let err = zip_with("mul", &a, &b, |x, y| x * y).unwrap_err();
        assert!(matches!(err, OptimErr::ShapeMismatch { op: "mul", .. }));
    }

    #[test]
    fn matmul_checks_inner_dimensions() {
        let a = Value::from(array![[1.0, 2.0], [3.0, 4.0]]);
        let b = Value::from(array![[1.0], [1.0]]);
        assert_eq!(matmul(&a, &b).unwrap(), Value::from(array![[3.0], [7.0]]));
        assert!(matmul(&b, &a).is_err());
    }

    #[test]
    fn argmax_is_row_major() {
        let a = Value::from(array![[1.0, 9.0], [9.0, 2.0]]);
        assert_eq!(argmax(&a).unwrap(), 1);
        assert_eq!(index_flat(&a, 2).unwrap(), 9.0);
    }

    #[test]
    fn rows_helpers_reject_duals() {
        let x = Value::make_dual(Value::from(array![[1.0]]), Value::Scalar(0.0));
        assert!(matches!(
            rows(&x),
            Err(OptimErr::TypeMismatch { got: "dual", .. })
        ));
        assert!(slice_rows(&Value::Scalar(1.0), 0..1).is_err());
    }

    #[test]
    fn slices_and_selects_rows() {
        let x = Value::from(array![[0.0], [1.0], [2.0], [3.0]]);
        assert_eq!(
            slice_rows(&x, 1..3).unwrap(),
            Value::from(array![[1.0], [2.0]])
        );
        assert_eq!(
            select_rows(&x, &[3, 0]).unwrap(),
            Value::from(array![[3.0], [0.0]])
        );
    }

    #[test]
    fn basis_is_one_hot() {
        let e = basis(&[2, 2], 3);
        assert_eq!(e, array![[0.0, 0.0], [0.0, 1.0]].into_dyn());
    }
}
