//! Elastic influence of a triangular dislocation.
//!
//! The kernel is the atomic primitive of the engine: given a source
//! triangle, a Burgers vector in the triangle's local frame and a field
//! point, it returns the induced displacement or strain in a homogeneous
//! isotropic whole space or half-space (free surface at z = 0). Stress,
//! traction and the influence operator are all built on top of it.
//!
//! Field points that land on an element edge within the element plane are
//! evaluated as the two-sided principal value; every such hit is counted
//! so callers can surface a warning.

mod angular;
mod fullspace;
mod halfspace;

use std::sync::atomic::{AtomicUsize, Ordering};

use nalgebra::{Matrix3, Vector3};
use tde_model::SymTensor;

pub(crate) use fullspace::TriFrame;

pub struct DislocationKernel {
    nu: f64,
    half_space: bool,
    edge_hits: AtomicUsize,
}

impl DislocationKernel {
    pub fn new(nu: f64, half_space: bool) -> Self {
        Self {
            nu,
            half_space,
            edge_hits: AtomicUsize::new(0),
        }
    }

    pub fn nu(&self) -> f64 {
        self.nu
    }

    pub fn half_space(&self) -> bool {
        self.half_space
    }

    fn note_edge(&self, frame: &TriFrame, p: &Vector3<f64>) {
        if fullspace::on_plane_edge(frame, &frame.to_local(p)) {
            self.edge_hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Number of principal-value edge evaluations since the last call.
    pub fn take_edge_hits(&self) -> usize {
        self.edge_hits.swap(0, Ordering::Relaxed)
    }

    /// Displacement at `p` due to `b_local` on the triangle `verts`.
    pub fn displacement(
        &self,
        verts: &[Vector3<f64>; 3],
        p: &Vector3<f64>,
        b_local: &Vector3<f64>,
    ) -> Vector3<f64> {
        let frame = TriFrame::new(verts);
        self.displacement_with_frame(&frame, verts, p, b_local)
    }

    pub(crate) fn displacement_with_frame(
        &self,
        frame: &TriFrame,
        verts: &[Vector3<f64>; 3],
        p: &Vector3<f64>,
        b_local: &Vector3<f64>,
    ) -> Vector3<f64> {
        self.note_edge(frame, p);
        if self.half_space {
            halfspace::displacement(frame, verts, p, b_local, self.nu)
        } else {
            fullspace::displacement(frame, p, b_local, self.nu)
        }
    }

    /// Strain at `p` due to `b_local` on the triangle `verts`.
    pub fn strain(
        &self,
        verts: &[Vector3<f64>; 3],
        p: &Vector3<f64>,
        b_local: &Vector3<f64>,
    ) -> SymTensor {
        let frame = TriFrame::new(verts);
        self.strain_with_frame(&frame, verts, p, b_local)
    }

    pub(crate) fn strain_with_frame(
        &self,
        frame: &TriFrame,
        verts: &[Vector3<f64>; 3],
        p: &Vector3<f64>,
        b_local: &Vector3<f64>,
    ) -> SymTensor {
        self.note_edge(frame, p);
        if self.half_space {
            halfspace::strain(frame, verts, p, b_local, self.nu)
        } else {
            fullspace::strain(frame, p, b_local, self.nu)
        }
    }

    /// Full (non-symmetric) displacement gradient by central differencing,
    /// for the nine-component tensor reports.
    pub fn displacement_gradient(
        &self,
        verts: &[Vector3<f64>; 3],
        p: &Vector3<f64>,
        b_local: &Vector3<f64>,
    ) -> Matrix3<f64> {
        let frame = TriFrame::new(verts);
        let h = 1e-6 * frame.scale;
        let mut grad = Matrix3::zeros();
        for d in 0..3 {
            let mut dp = Vector3::zeros();
            dp[d] = h;
            let up = self.displacement_with_frame(&frame, verts, &(p + dp), b_local);
            let um = self.displacement_with_frame(&frame, verts, &(p - dp), b_local);
            for r in 0..3 {
                grad[(r, d)] = (up[r] - um[r]) / (2.0 * h);
            }
        }
        grad
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verts() -> [Vector3<f64>; 3] {
        [
            Vector3::new(0.0, 0.0, -2.0),
            Vector3::new(1.0, 0.0, -2.0),
            Vector3::new(0.0, 1.0, -2.0),
        ]
    }

    #[test]
    fn whole_and_half_space_modes_differ_near_surface() {
        let ws = DislocationKernel::new(0.25, false);
        let hs = DislocationKernel::new(0.25, true);
        let b = Vector3::new(1.0, 0.0, 0.0);
        let p = Vector3::new(0.3, 0.3, -0.2);
        let uw = ws.displacement(&verts(), &p, &b);
        let uh = hs.displacement(&verts(), &p, &b);
        assert!((uw - uh).norm() > 1e-6 * uw.norm());
    }

    #[test]
    fn gradient_symmetric_part_matches_strain() {
        let k = DislocationKernel::new(0.25, false);
        let b = Vector3::new(0.5, -0.2, 1.0);
        let p = Vector3::new(0.8, -0.4, -1.0);
        let g = k.displacement_gradient(&verts(), &p, &b);
        let e = k.strain(&verts(), &p, &b);
        let sym = SymTensor::from_matrix(&g);
        for (a, c) in sym.to_flat().iter().zip(e.to_flat()) {
            assert!((a - c).abs() < 1e-5 * (1.0 + c.abs()));
        }
    }

    #[test]
    fn edge_hits_counted_for_in_plane_edge_points() {
        let k = DislocationKernel::new(0.25, false);
        let b = Vector3::new(1.0, 0.0, 0.0);
        // Midpoint of the edge from (0,0,-2) to (1,0,-2)
        let p = Vector3::new(0.5, 0.0, -2.0);
        let u = k.displacement(&verts(), &p, &b);
        assert!(u.norm().is_finite());
        assert_eq!(k.take_edge_hits(), 1);
        assert_eq!(k.take_edge_hits(), 0);

        // A generic off-plane point does not count
        let _ = k.displacement(&verts(), &Vector3::new(0.5, 0.5, 0.5), &b);
        assert_eq!(k.take_edge_hits(), 0);
    }
}
