//! Post-processing of a converged Burgers field.
//!
//! A solution holds a read-only reference to the model plus a Burgers
//! snapshot (the solver's result or a user-supplied one) and evaluates
//! displacement, strain and stress at arbitrary points by superposing
//! kernel contributions over all triangles. Remotes contribute to stress
//! only; displacement and strain are purely the induced fields.
//!
//! Query points are independent, so evaluation parallelizes over points.

use nalgebra::Vector3;
use rayon::prelude::*;
use tde_model::{Model, ModelError, SymTensor};

use crate::error::SolveError;
use crate::kernel::DislocationKernel;
use crate::operator::ElementTable;
use crate::solver::Solver;

pub struct Solution<'a> {
    model: &'a Model,
    kernel: DislocationKernel,
    table: ElementTable,
    burgers: Vec<Vector3<f64>>,
    /// D± evaluation offset along element normals.
    delta: f64,
}

impl<'a> Solution<'a> {
    /// Build a solution from an explicit Burgers snapshot (local frames,
    /// canonical order).
    pub fn new(model: &'a Model, burgers: Vec<Vector3<f64>>) -> Result<Self, SolveError> {
        if burgers.len() != model.triangle_count() {
            return Err(SolveError(format!(
                "burgers snapshot has {} entries for {} triangles",
                burgers.len(),
                model.triangle_count()
            )));
        }
        let material = model.material();
        Ok(Self {
            model,
            kernel: DislocationKernel::new(material.nu, model.half_space()),
            table: ElementTable::from_model(model, 1e-8),
            burgers,
            delta: 1e-8 * model.size(),
        })
    }

    /// Build a solution from a finished solver run.
    pub fn from_solver(model: &'a Model, solver: &Solver) -> Result<Self, SolveError> {
        Self::new(model, solver.burgers().to_vec())
    }

    /// Override the D± offset (a fraction of the model size by default).
    pub fn set_offset(&mut self, delta: f64) {
        self.delta = delta;
    }

    pub fn burgers_snapshot(&self) -> &[Vector3<f64>] {
        &self.burgers
    }

    /// Induced displacement at a point.
    pub fn displacement_at(&self, p: &Vector3<f64>) -> Vector3<f64> {
        let mut u = Vector3::zeros();
        for j in 0..self.table.len() {
            let b = self.burgers[j];
            if b != Vector3::zeros() {
                u += self
                    .kernel
                    .displacement_with_frame(&self.table.frames[j], &self.table.verts[j], p, &b);
            }
        }
        u
    }

    /// Induced strain at a point.
    pub fn strain_at(&self, p: &Vector3<f64>) -> SymTensor {
        let mut e = SymTensor::zero();
        for j in 0..self.table.len() {
            let b = self.burgers[j];
            if b != Vector3::zeros() {
                e += self
                    .kernel
                    .strain_with_frame(&self.table.frames[j], &self.table.verts[j], p, &b);
            }
        }
        e
    }

    /// Total stress at a point: remote plus induced.
    pub fn stress_at(&self, p: &Vector3<f64>) -> SymTensor {
        let material = self.model.material();
        let induced = material.stress_from_strain(&self.strain_at(p));
        induced + self.model.remote_stress_at(p.x, p.y, p.z)
    }

    fn parse_points(points: &[f64]) -> Result<Vec<Vector3<f64>>, ModelError> {
        if points.len() % 3 != 0 {
            return Err(ModelError::BadPointArray(points.len()));
        }
        Ok(points
            .chunks_exact(3)
            .map(|p| Vector3::new(p[0], p[1], p[2]))
            .collect())
    }

    /// Displacements at a flat point array, returned as [ux, uy, uz, …].
    pub fn displacement(&self, points: &[f64]) -> Result<Vec<f64>, SolveError> {
        let pts = Self::parse_points(points)?;
        let out: Vec<[f64; 3]> = pts
            .par_iter()
            .map(|p| {
                let u = self.displacement_at(p);
                [u.x, u.y, u.z]
            })
            .collect();
        Ok(out.into_iter().flatten().collect())
    }

    /// Strains at a flat point array, symmetric order [xx, xy, xz, yy, yz, zz].
    pub fn strain(&self, points: &[f64]) -> Result<Vec<f64>, SolveError> {
        let pts = Self::parse_points(points)?;
        let out: Vec<[f64; 6]> = pts.par_iter().map(|p| self.strain_at(p).to_flat()).collect();
        Ok(out.into_iter().flatten().collect())
    }

    /// Stresses at a flat point array, symmetric order [xx, xy, xz, yy, yz, zz].
    pub fn stress(&self, points: &[f64]) -> Result<Vec<f64>, SolveError> {
        let pts = Self::parse_points(points)?;
        let out: Vec<[f64; 6]> = pts.par_iter().map(|p| self.stress_at(p).to_flat()).collect();
        Ok(out.into_iter().flatten().collect())
    }

    /// Displacement gradients at a flat point array, full tensor order
    /// [xx, xy, xz, yx, yy, yz, zx, zy, zz].
    pub fn displacement_gradient(&self, points: &[f64]) -> Result<Vec<f64>, SolveError> {
        let pts = Self::parse_points(points)?;
        let out: Vec<[f64; 9]> = pts
            .par_iter()
            .map(|p| {
                let mut g = nalgebra::Matrix3::zeros();
                for j in 0..self.table.len() {
                    let b = self.burgers[j];
                    if b != Vector3::zeros() {
                        g += self.kernel.displacement_gradient(&self.table.verts[j], p, &b);
                    }
                }
                [
                    g[(0, 0)],
                    g[(0, 1)],
                    g[(0, 2)],
                    g[(1, 0)],
                    g[(1, 1)],
                    g[(1, 2)],
                    g[(2, 0)],
                    g[(2, 1)],
                    g[(2, 2)],
                ]
            })
            .collect();
        Ok(out.into_iter().flatten().collect())
    }

    /// Per-surface Burgers reports as flat arrays [x, y, z, …].
    ///
    /// `local` keeps triangle-frame components, otherwise vectors are
    /// rotated to global; `at_triangles` reports element centers, otherwise
    /// values are area-weighted onto the surface vertices.
    pub fn burgers(&self, local: bool, at_triangles: bool) -> Vec<Vec<f64>> {
        let mut reports = Vec::with_capacity(self.model.surfaces().len());
        let mut k = 0;
        for surface in self.model.surfaces() {
            let per_triangle: Vec<Vector3<f64>> = surface
                .triangles()
                .iter()
                .enumerate()
                .map(|(t, tri)| {
                    let b = self.burgers[k + t];
                    if local { b } else { tri.to_global(&b) }
                })
                .collect();
            let vectors = if at_triangles {
                per_triangle
            } else {
                surface.interpolate_to_vertices(&per_triangle)
            };
            reports.push(vectors.iter().flat_map(|v| [v.x, v.y, v.z]).collect());
            k += surface.triangle_count();
        }
        reports
    }

    /// Displacement on the positive side of each element, u(c + δ·n̂),
    /// per surface.
    pub fn burgers_plus(&self, local: bool) -> Vec<Vec<f64>> {
        self.side_displacement(1.0, local)
    }

    /// Displacement on the negative side of each element, u(c − δ·n̂),
    /// per surface.
    pub fn burgers_minus(&self, local: bool) -> Vec<Vec<f64>> {
        self.side_displacement(-1.0, local)
    }

    fn side_displacement(&self, sign: f64, local: bool) -> Vec<Vec<f64>> {
        let mut reports = Vec::with_capacity(self.model.surfaces().len());
        for surface in self.model.surfaces() {
            let values: Vec<[f64; 3]> = surface
                .triangles()
                .par_iter()
                .map(|tri| {
                    let p = tri.center() + tri.normal() * (sign * self.delta);
                    let u = self.displacement_at(&p);
                    let u = if local { tri.to_local(&u) } else { u };
                    [u.x, u.y, u.z]
                })
                .collect();
            reports.push(values.into_iter().flatten().collect());
        }
        reports
    }

    /// Scalar seismic moment M₀ = μ·Σ A_j·|b_j|.
    pub fn seismic_moment(&self) -> f64 {
        let mu = self.model.material().shear_modulus();
        self.table
            .areas
            .iter()
            .zip(&self.burgers)
            .map(|(a, b)| a * b.norm())
            .sum::<f64>()
            * mu
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{Solver, SolverConfig};
    use tde_model::{Material, Surface, UniformRemote};

    fn quad_model() -> Model {
        let mut model = Model::new(Material::new(0.25, 1.0, 0.0), false);
        let mut s = Surface::from_arrays(
            &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
            &[0, 1, 2, 0, 2, 3],
        )
        .unwrap();
        s.set_bc("normal", "free", 0.0).unwrap();
        model.add_surface(s);
        model
    }

    fn solved_model() -> (Model, Vec<Vector3<f64>>) {
        let mut model = quad_model();
        model.add_remote(Box::new(UniformRemote::from_flat([
            0.0, 0.0, 0.0, 0.0, 0.0, -1.0,
        ])));
        let mut solver = Solver::new(SolverConfig::default());
        solver.run(&model).unwrap();
        let b = solver.burgers().to_vec();
        (model, b)
    }

    #[test]
    fn rejects_mismatched_snapshot() {
        let model = quad_model();
        assert!(Solution::new(&model, vec![Vector3::zeros()]).is_err());
        assert!(Solution::new(&model, vec![Vector3::zeros(); 2]).is_ok());
    }

    #[test]
    fn rejects_bad_point_arrays() {
        let (model, b) = solved_model();
        let sol = Solution::new(&model, b).unwrap();
        let err = sol.displacement(&[0.0, 1.0]).unwrap_err();
        assert_eq!(err, SolveError::from(ModelError::BadPointArray(2)));
        assert!(sol.strain(&[0.0; 4]).is_err());
        assert!(sol.stress(&[0.0; 5]).is_err());
        assert!(sol.displacement(&[]).unwrap().is_empty());
    }

    #[test]
    fn zero_burgers_give_zero_induced_fields() {
        let mut model = quad_model();
        model.add_remote(Box::new(UniformRemote::from_flat([
            0.0, 0.0, 0.0, 0.0, 0.0, -1.0,
        ])));
        let sol = Solution::new(&model, vec![Vector3::zeros(); 2]).unwrap();
        let u = sol.displacement_at(&Vector3::new(0.3, 0.3, 1.0));
        assert_eq!(u, Vector3::zeros());
        // Stress still carries the remote
        let s = sol.stress_at(&Vector3::new(0.3, 0.3, 1.0));
        assert!((s.zz + 1.0).abs() < 1e-12);
        // Strain does not
        let e = sol.strain_at(&Vector3::new(0.3, 0.3, 1.0));
        assert_eq!(e, SymTensor::zero());
    }

    #[test]
    fn burgers_decomposes_into_side_displacements() {
        let (model, b) = solved_model();
        let sol = Solution::new(&model, b.clone()).unwrap();
        let plus = sol.burgers_plus(true);
        let minus = sol.burgers_minus(true);
        for (t, bt) in b.iter().enumerate() {
            let jump = Vector3::new(
                plus[0][3 * t] - minus[0][3 * t],
                plus[0][3 * t + 1] - minus[0][3 * t + 1],
                plus[0][3 * t + 2] - minus[0][3 * t + 2],
            );
            assert!(
                (jump - bt).norm() < 1e-5 * bt.norm().max(1e-12),
                "triangle {t}: jump {jump:?} vs burgers {bt:?}"
            );
        }
    }

    #[test]
    fn burgers_report_rotates_to_global() {
        let (model, b) = solved_model();
        let sol = Solution::new(&model, b.clone()).unwrap();
        let local = sol.burgers(true, true);
        let global = sol.burgers(false, true);
        // Horizontal elements: local (normal, strike, dip) maps to global
        // (z, y, -x).
        for t in 0..2 {
            assert!((global[0][3 * t + 2] - local[0][3 * t]).abs() < 1e-14);
            assert!((global[0][3 * t + 1] - local[0][3 * t + 1]).abs() < 1e-14);
            assert!((global[0][3 * t] + local[0][3 * t + 2]).abs() < 1e-14);
        }
    }

    #[test]
    fn vertex_report_has_vertex_count_entries() {
        let (model, b) = solved_model();
        let sol = Solution::new(&model, b).unwrap();
        let at_vertices = sol.burgers(true, false);
        assert_eq!(at_vertices[0].len(), 3 * 4);
    }

    #[test]
    fn seismic_moment_of_imposed_slip() {
        let mut model = quad_model();
        let s = &mut model.surfaces_mut()[0];
        s.set_bc("normal", "locked", 0.0).unwrap();
        s.set_bc("strike", "imposed", 0.5).unwrap();
        s.set_bc("dip", "locked", 0.0).unwrap();
        let mut solver = Solver::new(SolverConfig::default());
        solver.run(&model).unwrap();
        let sol = Solution::from_solver(&model, &solver).unwrap();
        let mu = model.material().shear_modulus();
        // Total area 1, uniform slip 0.5
        assert!((sol.seismic_moment() - mu * 0.5).abs() < 1e-12);
    }

    #[test]
    fn displacement_gradient_symmetrizes_to_strain() {
        let (model, b) = solved_model();
        let sol = Solution::new(&model, b).unwrap();
        let p = [0.4, 0.3, 0.8];
        let g = sol.displacement_gradient(&p).unwrap();
        let e = sol.strain(&p).unwrap();
        assert!((0.5 * (g[1] + g[3]) - e[1]).abs() < 1e-5 * (1.0 + e[1].abs()));
        assert!((g[0] - e[0]).abs() < 1e-5 * (1.0 + e[0].abs()));
    }
}
