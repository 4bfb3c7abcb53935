//! Model container: material, half-space flag, surfaces and remotes.
//!
//! The model owns its surfaces exclusively and defines the canonical
//! degree-of-freedom numbering: triangles are numbered by surface insertion
//! order, then by intra-surface order, with 3 DOFs per triangle (one per
//! local axis). Solvers hold non-owning references and are invalidated by
//! the dirty flag or by a fingerprint change.

use std::sync::atomic::{AtomicBool, Ordering};

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::material::Material;
use crate::remote::RemoteStress;
use crate::surface::Surface;
use crate::tensor::SymTensor;
use crate::triangle::Triangle;

/// Cheap metadata snapshot used to decide whether an assembled influence
/// operator is still valid. Geometry changes that keep all of these equal
/// (vertex moves) must be followed by an explicit [`Model::mark_dirty`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFingerprint {
    pub triangle_counts: Vec<usize>,
    /// One entry per triangle, 3 bits packed low-to-high: 1 = displacement.
    pub bc_kinds: Vec<u8>,
    pub nu: f64,
    pub half_space: bool,
}

pub struct Model {
    material: Material,
    half_space: bool,
    surfaces: Vec<Surface>,
    remotes: Vec<Box<dyn RemoteStress>>,
    dirty: AtomicBool,
}

impl Model {
    pub fn new(material: Material, half_space: bool) -> Self {
        Self {
            material,
            half_space,
            surfaces: Vec::new(),
            remotes: Vec::new(),
            dirty: AtomicBool::new(false),
        }
    }

    pub fn material(&self) -> Material {
        self.material
    }

    pub fn set_material(&mut self, material: Material) {
        self.material = material;
    }

    pub fn half_space(&self) -> bool {
        self.half_space
    }

    /// Add a surface; returns its index in insertion order.
    pub fn add_surface(&mut self, surface: Surface) -> usize {
        self.surfaces.push(surface);
        self.surfaces.len() - 1
    }

    pub fn add_remote(&mut self, remote: Box<dyn RemoteStress>) {
        self.remotes.push(remote);
    }

    pub fn clear_remotes(&mut self) {
        self.remotes.clear();
    }

    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    pub fn surfaces_mut(&mut self) -> &mut [Surface] {
        &mut self.surfaces
    }

    pub fn remotes(&self) -> &[Box<dyn RemoteStress>] {
        &self.remotes
    }

    pub fn triangle_count(&self) -> usize {
        self.surfaces.iter().map(|s| s.triangle_count()).sum()
    }

    pub fn dof_count(&self) -> usize {
        3 * self.triangle_count()
    }

    /// Iterate triangles in the canonical global order.
    pub fn iter_triangles(&self) -> impl Iterator<Item = &Triangle> {
        self.surfaces.iter().flat_map(|s| s.triangles().iter())
    }

    /// Surface index owning the triangle at a global index.
    pub fn surface_of(&self, mut triangle: usize) -> Option<usize> {
        for (s, surface) in self.surfaces.iter().enumerate() {
            if triangle < surface.triangle_count() {
                return Some(s);
            }
            triangle -= surface.triangle_count();
        }
        None
    }

    /// Sum of all remote stresses at a point.
    pub fn remote_stress_at(&self, x: f64, y: f64, z: f64) -> SymTensor {
        let mut s = SymTensor::zero();
        for r in &self.remotes {
            s += r.stress_at(x, y, z);
        }
        s
    }

    /// Bounding-box diagonal, the model's length scale (1 for an empty or
    /// point-like model). Used to size the D± evaluation offset.
    pub fn size(&self) -> f64 {
        let mut lo = Vector3::repeat(f64::INFINITY);
        let mut hi = Vector3::repeat(f64::NEG_INFINITY);
        let mut seen = false;
        for tri in self.iter_triangles() {
            for v in tri.vertices() {
                lo = lo.inf(v);
                hi = hi.sup(v);
                seen = true;
            }
        }
        if !seen {
            return 1.0;
        }
        let d = (hi - lo).norm();
        if d > 0.0 { d } else { 1.0 }
    }

    /// Mark the model as needing reassembly. Required after mutating
    /// geometry in ways the fingerprint cannot detect (e.g. moving
    /// vertices while keeping the triangle count).
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Relaxed);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Relaxed)
    }

    /// Clear the dirty flag; called by solvers after reassembly.
    pub fn clear_dirty(&self) {
        self.dirty.store(false, Ordering::Relaxed);
    }

    pub fn fingerprint(&self) -> ModelFingerprint {
        let mut bc_kinds = Vec::with_capacity(self.triangle_count());
        for tri in self.iter_triangles() {
            let kinds = tri.bc.kinds();
            let mut packed = 0u8;
            for (b, k) in kinds.iter().enumerate() {
                if *k == crate::bc::BcKind::Displacement {
                    packed |= 1 << b;
                }
            }
            bc_kinds.push(packed);
        }
        ModelFingerprint {
            triangle_counts: self.surfaces.iter().map(|s| s.triangle_count()).collect(),
            bc_kinds,
            nu: self.material.nu,
            half_space: self.half_space,
        }
    }

    /// Configuration validation, run before any iteration.
    pub fn validate(&self) -> Result<(), ModelError> {
        self.material.validate()?;
        if self.triangle_count() == 0 {
            return Err(ModelError::EmptyModel);
        }
        for (s, surface) in self.surfaces.iter().enumerate() {
            for (t, tri) in surface.triangles().iter().enumerate() {
                if !(tri.area() > 0.0) {
                    return Err(ModelError::ZeroAreaTriangle {
                        surface: s,
                        triangle: t,
                    });
                }
                if self.half_space {
                    let eps = 1e-9 * self.size();
                    if tri.vertices().iter().any(|v| v.z > eps) {
                        return Err(ModelError::AboveFreeSurface {
                            surface: s,
                            triangle: t,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Snapshot the per-triangle Burgers vectors (local frames, canonical
    /// order).
    pub fn collect_burgers(&self) -> Vec<Vector3<f64>> {
        self.iter_triangles().map(|t| t.burgers).collect()
    }

    /// Write Burgers vectors back onto the triangles (canonical order).
    pub fn store_burgers(&mut self, burgers: &[Vector3<f64>]) -> Result<(), ModelError> {
        if burgers.len() != self.triangle_count() {
            return Err(ModelError::BadPointArray(burgers.len() * 3));
        }
        let mut k = 0;
        for surface in &mut self.surfaces {
            for tri in surface.triangles_mut() {
                tri.burgers = burgers[k];
                k += 1;
            }
        }
        Ok(())
    }
}
