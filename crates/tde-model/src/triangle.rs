//! Triangular dislocation element geometry.
//!
//! Each element is a flat triangle carrying a piecewise-constant Burgers
//! vector. Geometry is derived once from the vertices: centroid, unit
//! normal, area, and the orthonormal local frame (ê_n, ê_s, ê_d) in the
//! Okada convention (normal, strike, dip with ê_d·ẑ ≥ 0 for non-horizontal
//! elements and ê_s = ê_d × ê_n).

use nalgebra::{Matrix3, Vector3};

use crate::bc::{Axis, AxisBc, TriangleBc};

/// Compute the (strike, dip) directions for a unit normal.
///
/// Strike is horizontal: ê_s ∝ ẑ × n̂. For horizontal elements the strike
/// degenerates and is pinned to ±ŷ by the sign of n_z.
pub fn local_frame(normal: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let e_z = Vector3::z();
    let cross = e_z.cross(normal);
    let strike = if cross.norm() < 1e-12 {
        Vector3::y() * normal.z.signum()
    } else {
        cross.normalize()
    };
    let dip = normal.cross(&strike);
    (strike, dip)
}

/// A flat triangular element with derived geometry, per-axis boundary
/// conditions and its current local Burgers vector.
#[derive(Debug, Clone)]
pub struct Triangle {
    vertices: [Vector3<f64>; 3],
    center: Vector3<f64>,
    normal: Vector3<f64>,
    strike: Vector3<f64>,
    dip: Vector3<f64>,
    area: f64,
    /// Boundary condition per local axis (normal, strike, dip).
    pub bc: TriangleBc,
    /// Current Burgers vector in the local frame (normal, strike, dip).
    pub burgers: Vector3<f64>,
}

impl Triangle {
    /// Build an element from three vertices.
    ///
    /// Returns `None` when the triangle is degenerate (zero area relative
    /// to its edge lengths).
    pub fn try_new(vertices: [Vector3<f64>; 3]) -> Option<Self> {
        let e1 = vertices[1] - vertices[0];
        let e2 = vertices[2] - vertices[0];
        let cross = e1.cross(&e2);
        let cross_norm = cross.norm();
        let scale = e1.norm().max(e2.norm()).max((vertices[2] - vertices[1]).norm());
        if !(cross_norm > 1e-12 * scale * scale) {
            return None;
        }
        let normal = cross / cross_norm;
        let (strike, dip) = local_frame(&normal);
        Some(Self {
            vertices,
            center: (vertices[0] + vertices[1] + vertices[2]) / 3.0,
            normal,
            strike,
            dip,
            area: 0.5 * cross_norm,
            bc: TriangleBc::default(),
            burgers: Vector3::zeros(),
        })
    }

    pub fn vertices(&self) -> &[Vector3<f64>; 3] {
        &self.vertices
    }

    pub fn center(&self) -> Vector3<f64> {
        self.center
    }

    pub fn normal(&self) -> Vector3<f64> {
        self.normal
    }

    pub fn strike(&self) -> Vector3<f64> {
        self.strike
    }

    pub fn dip(&self) -> Vector3<f64> {
        self.dip
    }

    pub fn area(&self) -> f64 {
        self.area
    }

    /// Rotation whose columns are (ê_n, ê_s, ê_d): maps local components to
    /// global, v_global = R · v_local. Burgers and traction vectors are both
    /// contravariant and transform identically.
    pub fn rotation(&self) -> Matrix3<f64> {
        Matrix3::from_columns(&[self.normal, self.strike, self.dip])
    }

    pub fn to_global(&self, local: &Vector3<f64>) -> Vector3<f64> {
        self.rotation() * local
    }

    pub fn to_local(&self, global: &Vector3<f64>) -> Vector3<f64> {
        self.rotation().transpose() * global
    }

    /// Longest edge length, used as the element's length scale.
    pub fn longest_edge(&self) -> f64 {
        let [a, b, c] = self.vertices;
        (b - a).norm().max((c - b).norm()).max((a - c).norm())
    }

    pub fn set_axis_bc(&mut self, axis: Axis, bc: AxisBc) {
        self.bc.set(axis, bc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_dipping_triangle(theta: f64) -> Triangle {
        // Plane through the origin whose normal is (sinθ, 0, cosθ)
        let s = Vector3::new(0.0, 1.0, 0.0);
        let d = Vector3::new(-theta.cos(), 0.0, theta.sin());
        Triangle::try_new([Vector3::zeros(), s, d]).unwrap()
    }

    #[test]
    fn rejects_degenerate_triangle() {
        let t = Triangle::try_new([
            Vector3::zeros(),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(2.0, 0.0, 0.0),
        ]);
        assert!(t.is_none());
    }

    #[test]
    fn frame_is_orthonormal_and_right_handed() {
        for theta in [0.2, 0.7, 1.2, 1.5] {
            let t = make_dipping_triangle(theta);
            let n = t.normal();
            let s = t.strike();
            let d = t.dip();
            assert!((n.norm() - 1.0).abs() < 1e-12);
            assert!((s.norm() - 1.0).abs() < 1e-12);
            assert!((d.norm() - 1.0).abs() < 1e-12);
            assert!(n.dot(&s).abs() < 1e-12);
            assert!(n.dot(&d).abs() < 1e-12);
            assert!(s.dot(&d).abs() < 1e-12);
            // ê_s = ê_d × ê_n
            assert!((d.cross(&n) - s).norm() < 1e-12);
        }
    }

    #[test]
    fn dip_points_upward_for_inclined_elements() {
        for theta in [0.1, 0.5, 1.0, 1.4] {
            let t = make_dipping_triangle(theta);
            assert!(t.dip().z >= 0.0, "dip must have non-negative z");
        }
    }

    #[test]
    fn strike_is_horizontal() {
        let t = make_dipping_triangle(0.8);
        assert!(t.strike().z.abs() < 1e-12);
    }

    #[test]
    fn horizontal_element_uses_y_strike() {
        let t = Triangle::try_new([
            Vector3::zeros(),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        ])
        .unwrap();
        assert!((t.normal() - Vector3::z()).norm() < 1e-12);
        assert!((t.strike() - Vector3::y()).norm() < 1e-12);
    }

    #[test]
    fn area_and_center() {
        let t = Triangle::try_new([
            Vector3::zeros(),
            Vector3::new(2.0, 0.0, 0.0),
            Vector3::new(0.0, 2.0, 0.0),
        ])
        .unwrap();
        assert!((t.area() - 2.0).abs() < 1e-12);
        assert!((t.center() - Vector3::new(2.0 / 3.0, 2.0 / 3.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn local_global_round_trip() {
        let t = make_dipping_triangle(0.9);
        let v = Vector3::new(0.3, -1.2, 2.5);
        let back = t.to_local(&t.to_global(&v));
        assert!((back - v).norm() < 1e-12);
    }
}
