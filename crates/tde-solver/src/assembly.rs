//! Right-hand-side assembly and geometric diagnostics.
//!
//! The boundary conditions and remotes only enter the right-hand side, so
//! repeated solves with new values reuse the assembled influence operator
//! and rebuild this part alone.

use std::collections::HashMap;

use nalgebra::Vector3;
use tde_model::{BcKind, Model};

use crate::operator::ElementTable;

/// Per-triangle targets of the boundary-value problem, local frames.
pub struct RightHandSide {
    /// Prescribed scalar per axis (traction or displacement value).
    pub prescribed: Vec<Vector3<f64>>,
    /// Remote traction at each element center.
    pub remote: Vec<Vector3<f64>>,
    /// Row targets: traction rows carry prescribed − remote, displacement
    /// rows carry the prescribed value.
    pub target: Vec<Vector3<f64>>,
}

/// Evaluate boundary-condition values and remote tractions at all element
/// centers.
pub fn build_rhs(model: &Model, table: &ElementTable) -> RightHandSide {
    let n = table.len();
    let mut prescribed = Vec::with_capacity(n);
    let mut remote = Vec::with_capacity(n);
    let mut target = Vec::with_capacity(n);
    for (i, tri) in model.iter_triangles().enumerate() {
        let center = table.centers[i];
        let values = tri.bc.values_at(&center);
        let sigma = model.remote_stress_at(center.x, center.y, center.z);
        let t_remote = table.rotations[i].transpose() * sigma.traction(&table.normals[i]);
        let mut t = Vector3::zeros();
        for k in 0..3 {
            t[k] = match table.bc_kinds[i][k] {
                BcKind::Traction => values[k] - t_remote[k],
                BcKind::Displacement => values[k],
            };
        }
        prescribed.push(values);
        remote.push(t_remote);
        target.push(t);
    }
    RightHandSide {
        prescribed,
        remote,
        target,
    }
}

/// Euclidean norm over a block vector.
pub fn block_norm(v: &[Vector3<f64>]) -> f64 {
    v.iter().map(|x| x.norm_squared()).sum::<f64>().sqrt()
}

/// Find the adjacent (edge-sharing) triangle pair with the smallest
/// dihedral angle, in degrees. 180° is a flat continuation; values near
/// zero indicate a folded-back sliver, the usual cause of divergence.
pub fn smallest_dihedral(table: &ElementTable) -> Option<(usize, usize, f64)> {
    let key = |v: &Vector3<f64>| (v.x.to_bits(), v.y.to_bits(), v.z.to_bits());
    let mut edges: HashMap<_, Vec<usize>> = HashMap::new();
    for (t, verts) in table.verts.iter().enumerate() {
        for (a, b) in [(0, 1), (1, 2), (2, 0)] {
            let (ka, kb) = (key(&verts[a]), key(&verts[b]));
            let e = if ka <= kb { (ka, kb) } else { (kb, ka) };
            edges.entry(e).or_default().push(t);
        }
    }
    let mut worst: Option<(usize, usize, f64)> = None;
    for tris in edges.values() {
        for a in 0..tris.len() {
            for b in (a + 1)..tris.len() {
                let (i, j) = (tris[a], tris[b]);
                let cosang = table.normals[i].dot(&table.normals[j]).clamp(-1.0, 1.0);
                let dihedral = 180.0 - cosang.acos().to_degrees();
                if worst.map_or(true, |(_, _, w)| dihedral < w) {
                    worst = Some((i, j, dihedral));
                }
            }
        }
    }
    worst
}
