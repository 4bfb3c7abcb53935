//! Influence operators mapping Burgers vectors to tractions.
//!
//! The assembled operator stores, for every (destination, source) pair of
//! triangles, the 3×3 block of traction components at the destination
//! center (in its local frame) per unit Burgers component of the source
//! (in its local frame). Blocks are stored contiguously, row-major over
//! triangle indices.
//!
//! Boundary-condition types never enter the stored blocks: rows of
//! displacement type are substituted when the operator is applied, so the
//! full traction vector stays available to constraint projections.
//!
//! For large models the dense storage is the bottleneck (9·N²·8 bytes); the
//! matrix-free operator recomputes blocks from the kernel on the fly and
//! plugs into the same trait.

use nalgebra::{Matrix3, Vector3};
use rayon::prelude::*;
use tde_model::{BcKind, Material, Model};

use crate::kernel::{DislocationKernel, TriFrame};

/// Per-triangle geometry snapshot in the canonical order, decoupling the
/// solver from the model during iteration.
pub struct ElementTable {
    pub verts: Vec<[Vector3<f64>; 3]>,
    pub centers: Vec<Vector3<f64>>,
    pub normals: Vec<Vector3<f64>>,
    /// Columns (n̂, ê_s, ê_d), local → global.
    pub rotations: Vec<Matrix3<f64>>,
    pub areas: Vec<f64>,
    pub surface_of: Vec<usize>,
    pub bc_kinds: Vec<[BcKind; 3]>,
    pub(crate) frames: Vec<TriFrame>,
    /// Normal offset for self-influence and D± evaluations.
    pub offset: f64,
}

impl ElementTable {
    pub fn from_model(model: &Model, offset_scale: f64) -> Self {
        let n = model.triangle_count();
        let mut verts = Vec::with_capacity(n);
        let mut centers = Vec::with_capacity(n);
        let mut normals = Vec::with_capacity(n);
        let mut rotations = Vec::with_capacity(n);
        let mut areas = Vec::with_capacity(n);
        let mut surface_of = Vec::with_capacity(n);
        let mut bc_kinds = Vec::with_capacity(n);
        let mut frames = Vec::with_capacity(n);
        for (s, surface) in model.surfaces().iter().enumerate() {
            for tri in surface.triangles() {
                let v = *tri.vertices();
                frames.push(TriFrame::new(&v));
                verts.push(v);
                centers.push(tri.center());
                normals.push(tri.normal());
                rotations.push(tri.rotation());
                areas.push(tri.area());
                surface_of.push(s);
                bc_kinds.push(tri.bc.kinds());
            }
        }
        Self {
            verts,
            centers,
            normals,
            rotations,
            areas,
            surface_of,
            bc_kinds,
            frames,
            offset: offset_scale * model.size(),
        }
    }

    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    /// Traction at triangle `i`'s center (local frame of `i`) per unit
    /// Burgers component of triangle `j`. The self block is evaluated at a
    /// small normal offset; the traction limit is continuous across the
    /// element.
    pub fn traction_block(
        &self,
        kernel: &DislocationKernel,
        material: &Material,
        i: usize,
        j: usize,
    ) -> Matrix3<f64> {
        let p = if i == j {
            self.centers[i] + self.normals[i] * self.offset
        } else {
            self.centers[i]
        };
        let mut m = Matrix3::zeros();
        for c in 0..3 {
            let mut b = Vector3::zeros();
            b[c] = 1.0;
            let strain = kernel.strain_with_frame(&self.frames[j], &self.verts[j], &p, &b);
            let stress = material.stress_from_strain(&strain);
            let t_local = self.rotations[i].transpose() * stress.traction(&self.normals[i]);
            m.set_column(c, &t_local);
        }
        m
    }
}

/// The traction influence operator T: b ↦ t over all triangles.
pub trait InfluenceOperator: Sync {
    fn len(&self) -> usize;

    /// 3×3 traction block for a (destination, source) pair.
    fn block(&self, i: usize, j: usize) -> Matrix3<f64>;

    /// Traction at triangle `i` from the whole Burgers field.
    fn traction_row(&self, i: usize, b: &[Vector3<f64>]) -> Vector3<f64> {
        let mut t = Vector3::zeros();
        for (j, bj) in b.iter().enumerate() {
            t += self.block(i, j) * bj;
        }
        t
    }

    /// t = T·b over all triangles, parallel by destination.
    fn apply_traction(&self, b: &[Vector3<f64>], out: &mut [Vector3<f64>]) {
        out.par_iter_mut()
            .enumerate()
            .for_each(|(i, o)| *o = self.traction_row(i, b));
    }
}

/// Dense block storage, O(N²) memory.
pub struct DenseOperator {
    n: usize,
    blocks: Vec<Matrix3<f64>>,
}

impl DenseOperator {
    /// Assemble all blocks, parallel over destination rows. `progress` is
    /// called once per finished row.
    pub fn assemble<F>(
        table: &ElementTable,
        kernel: &DislocationKernel,
        material: &Material,
        progress: F,
    ) -> Self
    where
        F: Fn(usize) + Sync,
    {
        let n = table.len();
        let rows: Vec<Vec<Matrix3<f64>>> = (0..n)
            .into_par_iter()
            .map(|i| {
                let row: Vec<Matrix3<f64>> = (0..n)
                    .map(|j| table.traction_block(kernel, material, i, j))
                    .collect();
                progress(i);
                row
            })
            .collect();
        let blocks = rows.into_iter().flatten().collect();
        Self { n, blocks }
    }

    pub fn memory_bytes(&self) -> usize {
        self.blocks.len() * std::mem::size_of::<Matrix3<f64>>()
    }
}

impl InfluenceOperator for DenseOperator {
    fn len(&self) -> usize {
        self.n
    }

    fn block(&self, i: usize, j: usize) -> Matrix3<f64> {
        self.blocks[i * self.n + j]
    }
}

/// Matrix-free operator: recomputes kernel entries on the fly. Preferred
/// with GMRES/CGNS when the dense storage would not fit.
pub struct MatrixFreeOperator<'a> {
    pub table: &'a ElementTable,
    pub kernel: &'a DislocationKernel,
    pub material: Material,
}

impl InfluenceOperator for MatrixFreeOperator<'_> {
    fn len(&self) -> usize {
        self.table.len()
    }

    fn block(&self, i: usize, j: usize) -> Matrix3<f64> {
        self.table.traction_block(self.kernel, &self.material, i, j)
    }
}

/// The operator with boundary-condition typed rows: traction rows read the
/// traction influence, displacement rows are identity rows on the diagonal
/// block.
pub struct BcOperator<'a> {
    pub inner: &'a dyn InfluenceOperator,
    pub kinds: &'a [[BcKind; 3]],
}

impl BcOperator<'_> {
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// r = A·b with BC-typed rows.
    pub fn apply(&self, b: &[Vector3<f64>], out: &mut [Vector3<f64>]) {
        out.par_iter_mut().enumerate().for_each(|(i, o)| {
            let t = self.inner.traction_row(i, b);
            let mut r = Vector3::zeros();
            for k in 0..3 {
                r[k] = match self.kinds[i][k] {
                    BcKind::Traction => t[k],
                    BcKind::Displacement => b[i][k],
                };
            }
            *o = r;
        });
    }

    /// r = Aᵀ·x, needed by the normal-equation solver.
    pub fn apply_transpose(&self, x: &[Vector3<f64>], out: &mut [Vector3<f64>]) {
        let n = self.len();
        // Zero out displacement-typed rows of x before the block transpose;
        // their identity contribution is added back per destination.
        let masked: Vec<Vector3<f64>> = x
            .iter()
            .enumerate()
            .map(|(i, xi)| {
                let mut m = *xi;
                for k in 0..3 {
                    if self.kinds[i][k] == BcKind::Displacement {
                        m[k] = 0.0;
                    }
                }
                m
            })
            .collect();
        out.par_iter_mut().enumerate().for_each(|(j, o)| {
            let mut y = Vector3::zeros();
            for (i, mi) in masked.iter().enumerate().take(n) {
                y += self.inner.block(i, j).transpose() * mi;
            }
            for k in 0..3 {
                if self.kinds[j][k] == BcKind::Displacement {
                    y[k] += x[j][k];
                }
            }
            *o = y;
        });
    }
}
