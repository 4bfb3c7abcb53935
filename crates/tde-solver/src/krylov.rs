//! Krylov solvers on the assembled operator.
//!
//! GMRES and CGNS act on the boundary-condition typed operator A·b = target
//! without any per-triangle projection, so they only apply to models free
//! of inequality constraints. Both work equally with the dense and the
//! matrix-free operator.

use nalgebra::{DMatrix, DVector, Vector3};

use crate::operator::BcOperator;

pub struct KrylovResult {
    pub x: Vec<Vector3<f64>>,
    pub iterations: usize,
    /// Relative residual ‖target − A·x‖ / ‖target‖.
    pub residual: f64,
    pub history: Vec<f64>,
    pub converged: bool,
}

fn flatten(v: &[Vector3<f64>]) -> DVector<f64> {
    let mut out = DVector::zeros(3 * v.len());
    for (i, x) in v.iter().enumerate() {
        out[3 * i] = x.x;
        out[3 * i + 1] = x.y;
        out[3 * i + 2] = x.z;
    }
    out
}

fn unflatten(v: &DVector<f64>) -> Vec<Vector3<f64>> {
    (0..v.len() / 3)
        .map(|i| Vector3::new(v[3 * i], v[3 * i + 1], v[3 * i + 2]))
        .collect()
}

fn apply(op: &BcOperator<'_>, v: &DVector<f64>) -> DVector<f64> {
    let x = unflatten(v);
    let mut out = vec![Vector3::zeros(); x.len()];
    op.apply(&x, &mut out);
    flatten(&out)
}

fn apply_transpose(op: &BcOperator<'_>, v: &DVector<f64>) -> DVector<f64> {
    let x = unflatten(v);
    let mut out = vec![Vector3::zeros(); x.len()];
    op.apply_transpose(&x, &mut out);
    flatten(&out)
}

/// Restarted GMRES with Givens rotations on the Hessenberg system.
pub fn gmres(
    op: &BcOperator<'_>,
    rhs: &[Vector3<f64>],
    x0: &[Vector3<f64>],
    tol: f64,
    max_iterations: usize,
    restart: usize,
) -> KrylovResult {
    let b = flatten(rhs);
    let bnorm = b.norm().max(f64::MIN_POSITIVE);
    let mut x = flatten(x0);
    let mut history = Vec::new();
    let mut iterations = 0;

    loop {
        let r = &b - apply(op, &x);
        let beta = r.norm();
        if beta / bnorm <= tol || iterations >= max_iterations {
            return KrylovResult {
                x: unflatten(&x),
                iterations,
                residual: beta / bnorm,
                history,
                converged: beta / bnorm <= tol,
            };
        }

        let m = restart.min(max_iterations - iterations).max(1);
        let n3 = b.len();
        let mut v = Vec::with_capacity(m + 1);
        v.push(&r / beta);
        let mut h = DMatrix::<f64>::zeros(m + 1, m);
        let mut cs = vec![0.0_f64; m];
        let mut sn = vec![0.0_f64; m];
        let mut g = DVector::<f64>::zeros(m + 1);
        g[0] = beta;

        let mut cols = 0;
        for j in 0..m {
            let mut w = apply(op, &v[j]);
            for i in 0..=j {
                h[(i, j)] = w.dot(&v[i]);
                w -= &v[i] * h[(i, j)];
            }
            h[(j + 1, j)] = w.norm();
            let breakdown = h[(j + 1, j)] < 1e-14 * bnorm;
            if !breakdown {
                v.push(&w / h[(j + 1, j)]);
            } else {
                v.push(DVector::zeros(n3));
            }

            // Apply the accumulated rotations, then a new one to kill the
            // subdiagonal entry.
            for i in 0..j {
                let tmp = cs[i] * h[(i, j)] + sn[i] * h[(i + 1, j)];
                h[(i + 1, j)] = -sn[i] * h[(i, j)] + cs[i] * h[(i + 1, j)];
                h[(i, j)] = tmp;
            }
            let denom = (h[(j, j)] * h[(j, j)] + h[(j + 1, j)] * h[(j + 1, j)]).sqrt();
            if denom > 0.0 {
                cs[j] = h[(j, j)] / denom;
                sn[j] = h[(j + 1, j)] / denom;
            } else {
                cs[j] = 1.0;
                sn[j] = 0.0;
            }
            h[(j, j)] = cs[j] * h[(j, j)] + sn[j] * h[(j + 1, j)];
            h[(j + 1, j)] = 0.0;
            g[j + 1] = -sn[j] * g[j];
            g[j] *= cs[j];

            iterations += 1;
            cols = j + 1;
            let rel = g[j + 1].abs() / bnorm;
            history.push(rel);
            if rel <= tol || breakdown || iterations >= max_iterations {
                break;
            }
        }

        // Back-substitute y and update x with the Krylov basis.
        let mut y = DVector::<f64>::zeros(cols);
        for i in (0..cols).rev() {
            let mut s = g[i];
            for k in (i + 1)..cols {
                s -= h[(i, k)] * y[k];
            }
            y[i] = s / h[(i, i)];
        }
        for (k, yk) in y.iter().enumerate() {
            x += &v[k] * *yk;
        }
    }
}

/// Conjugate gradients on the normal equations AᵀA·x = Aᵀ·target.
pub fn cgns(
    op: &BcOperator<'_>,
    rhs: &[Vector3<f64>],
    x0: &[Vector3<f64>],
    tol: f64,
    max_iterations: usize,
) -> KrylovResult {
    let b = flatten(rhs);
    let bnorm = b.norm().max(f64::MIN_POSITIVE);
    let mut x = flatten(x0);
    let mut history = Vec::new();

    let mut r = apply_transpose(op, &(&b - apply(op, &x)));
    let mut p = r.clone();
    let mut rho = r.norm_squared();

    for iterations in 1..=max_iterations {
        let ap = apply(op, &p);
        let denom = ap.norm_squared();
        if denom <= 0.0 {
            break;
        }
        let alpha = rho / denom;
        x += &p * alpha;

        let true_res = (&b - apply(op, &x)).norm() / bnorm;
        history.push(true_res);
        if true_res <= tol {
            return KrylovResult {
                x: unflatten(&x),
                iterations,
                residual: true_res,
                history,
                converged: true,
            };
        }

        r = apply_transpose(op, &(&b - apply(op, &x)));
        let rho_new = r.norm_squared();
        let beta = rho_new / rho;
        rho = rho_new;
        p = &r + &p * beta;
    }

    let residual = (&b - apply(op, &x)).norm() / bnorm;
    KrylovResult {
        x: unflatten(&x),
        iterations: history.len(),
        residual,
        history,
        converged: residual <= tol,
    }
}
