use ndarray::ArrayD;

use super::{Value, backend, value::one};
use crate::{OptimErr, Result};

/// Jacobian-vector product of `f` at `x` along direction `v`.
///
/// # Arguments
/// * `f` - The function being differentiated.
/// * `x` - The point at which to differentiate.
/// * `v` - The direction, it must have the same shape as `x`.
///
/// # Returns
/// The pair `(f(x), J_f(x) · v)`.
pub fn jvp<F>(f: F, x: &Value, v: &Value) -> Result<(Value, Value)>
where
    F: Fn(&Value) -> Result<Value>,
{
    let y = f(&Value::make_dual(x.clone(), v.clone()))?;
    Ok((y.primal().clone(), y.tangent()))
}

/// Evaluates `f` at `x` together with its derivative.
pub fn diff_<F>(f: F, x: &Value) -> Result<(Value, Value)>
where
    F: Fn(&Value) -> Result<Value>,
{
    jvp(f, x, &one(x))
}

/// Derivative of `f` at `x`.
///
/// Differentiating a function that itself calls `diff` gives higher order derivatives, the inner
/// call runs on duals nested inside the outer ones.
pub fn diff<F>(f: F, x: &Value) -> Result<Value>
where
    F: Fn(&Value) -> Result<Value>,
{
    diff_(f, x).map(|(_, d)| d)
}

/// Evaluates a scalar valued `f` at `w` together with its gradient.
///
/// A scalar weight takes a single forward pass, a tensor weight takes one pass per element with
/// the tangent seeded by the matching one-hot direction.
///
/// # Arguments
/// * `f` - The scalar valued function, usually a loss.
/// * `w` - The weights.
///
/// # Returns
/// The value of `f` at `w` and a plain gradient shaped like `w`.
pub fn grad_<F>(f: F, w: &Value) -> Result<(Value, Value)>
where
    F: Fn(&Value) -> Result<Value>,
{
    match w {
        Value::Scalar(_) => {
            let (y, dy) = diff_(&f, w)?;
            Ok((y, Value::Scalar(dy.to_scalar()?)))
        }
        Value::Tensor(a) => {
            let mut loss = None;
            let mut g = ArrayD::zeros(a.raw_dim());

            for (k, gk) in g.iter_mut().enumerate() {
                let e = Value::Tensor(backend::basis(a.shape(), k));
                let (y, dy) = jvp(&f, w, &e)?;
                *gk = scalar_output(&dy)?;
                loss.get_or_insert(y);
            }

            let loss = match loss {
                Some(loss) => loss,
                None => f(w)?,
            };

            Ok((loss, Value::Tensor(g)))
        }
        Value::Dual(..) => Err(OptimErr::TypeMismatch {
            op: "grad",
            got: "dual",
        }),
    }
}

/// Gradient of a scalar valued `f` at `w`.
pub fn grad<F>(f: F, w: &Value) -> Result<Value>
where
    F: Fn(&Value) -> Result<Value>,
{
    grad_(f, w).map(|(_, g)| g)
}

fn scalar_output(dy: &Value) -> Result<f64> {
    match dy {
        Value::Dual(..) => Err(OptimErr::TypeMismatch {
            op: "grad",
            got: "dual",
        }),
        _ => dy.to_scalar(),
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::algodiff::maths::{add, dot, l2norm_sqr, mul, sin, sub};

    fn cube(x: &Value) -> Result<Value> {
        mul(&mul(x, x)?, x)
    }

    #[test]
    fn first_derivative() {
        let (y, dy) = diff_(cube, &Value::Scalar(2.0)).unwrap();
        assert_eq!(y, Value::Scalar(8.0));
        assert_eq!(dy, Value::Scalar(12.0));
    }

    #[test]
    fn second_derivative_through_nested_diff() {
        let d2 = diff(|x| diff(cube, x), &Value::Scalar(2.0)).unwrap();
        assert_eq!(d2, Value::Scalar(12.0));

        let d2 = diff(|x| diff(sin, x), &Value::Scalar(0.3)).unwrap();
        assert!((d2.to_scalar().unwrap() + 0.3f64.sin()).abs() < 1e-12);
    }

    #[test]
    fn jvp_follows_the_direction() {
        let f = |x: &Value| l2norm_sqr(x);
        let x = Value::from(array![1.0, 2.0]);
        let v = Value::from(array![0.0, 1.0]);

        let (y, d) = jvp(f, &x, &v).unwrap();
        assert_eq!(y, Value::Scalar(5.0));
        assert_eq!(d, Value::Scalar(4.0));
    }

    #[test]
    fn gradient_of_a_scalar_weight() {
        let f = |w: &Value| {
            let r = sub(w, &Value::Scalar(5.0))?;
            mul(&r, &r)
        };

        let (loss, g) = grad_(f, &Value::Scalar(0.0)).unwrap();
        assert_eq!(loss, Value::Scalar(25.0));
        assert_eq!(g, Value::Scalar(-10.0));
    }

    #[test]
    fn gradient_of_a_tensor_weight_matches_the_analytic_one() {
        // f(w) = ||x w - y||^2, grad = 2 x^T (x w - y)
        let x = Value::from(array![[1.0, 0.0], [1.0, 1.0], [1.0, 2.0]]);
        let y = Value::from(array![[1.0], [3.0], [5.0]]);
        let f = |w: &Value| l2norm_sqr(&sub(&dot(&x, w)?, &y)?);

        let w = Value::from(array![[0.0], [1.0]]);
        let (loss, g) = grad_(f, &w).unwrap();

        // residuals are [-1, -2, -3]
        assert_eq!(loss, Value::Scalar(14.0));
        assert_eq!(g, Value::from(array![[-12.0], [-16.0]]));
    }

    #[test]
    fn gradient_is_plain() {
        let f = |w: &Value| add(&l2norm_sqr(w)?, &Value::Scalar(1.0));
        let g = grad(f, &Value::from(array![1.0, -1.0, 0.5])).unwrap();

        assert_eq!(g.depth(), 0);
        assert_eq!(g, Value::from(array![2.0, -2.0, 1.0]));
    }

    #[test]
    fn gradient_of_dual_weights_is_rejected() {
        let w = Value::make_dual(Value::Scalar(1.0), Value::Scalar(1.0));
        assert!(matches!(
            grad(|w: &Value| Ok(w.clone()), &w),
            Err(OptimErr::TypeMismatch { op: "grad", .. })
        ));
    }
}
