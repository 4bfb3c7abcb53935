//! Triangulated discontinuity surfaces.
//!
//! A surface is built from flat vertex/index arrays and owns its triangles
//! and its ordered constraint list. The vertex/index arrays are kept so
//! triangle-center values can be interpolated back to vertices.

use nalgebra::Vector3;

use crate::bc::{Axis, AxisBc, BcKind, BcValue, TriangleBc};
use crate::constraint::Constraint;
use crate::error::ModelError;
use crate::triangle::Triangle;

pub struct Surface {
    vertices: Vec<Vector3<f64>>,
    indices: Vec<[usize; 3]>,
    triangles: Vec<Triangle>,
    /// Template applied to every triangle; re-applied on geometry
    /// replacement.
    bc_template: TriangleBc,
    constraints: Vec<Box<dyn Constraint>>,
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("vertices", &self.vertices)
            .field("indices", &self.indices)
            .field("triangles", &self.triangles)
            .field("bc_template", &self.bc_template)
            .field("constraints", &self.constraints.len())
            .finish()
    }
}

impl Surface {
    /// Build a surface from a flat vertex array [x,y,z,…] and a flat index
    /// array [i0,j0,k0, i1,j1,k1, …].
    pub fn from_arrays(vertices: &[f64], indices: &[usize]) -> Result<Self, ModelError> {
        if vertices.len() % 3 != 0 {
            return Err(ModelError::BadVertexArray(vertices.len()));
        }
        if indices.len() % 3 != 0 {
            return Err(ModelError::BadIndexArray(indices.len()));
        }
        let verts: Vec<Vector3<f64>> = vertices
            .chunks_exact(3)
            .map(|v| Vector3::new(v[0], v[1], v[2]))
            .collect();
        let mut tri_indices = Vec::with_capacity(indices.len() / 3);
        let mut triangles = Vec::with_capacity(indices.len() / 3);
        for (t, idx) in indices.chunks_exact(3).enumerate() {
            for &i in idx {
                if i >= verts.len() {
                    return Err(ModelError::IndexOutOfRange {
                        triangle: t,
                        index: i,
                        vertex_count: verts.len(),
                    });
                }
            }
            let tri = Triangle::try_new([verts[idx[0]], verts[idx[1]], verts[idx[2]]])
                .ok_or(ModelError::DegenerateTriangle { triangle: t })?;
            tri_indices.push([idx[0], idx[1], idx[2]]);
            triangles.push(tri);
        }
        Ok(Self {
            vertices: verts,
            indices: tri_indices,
            triangles,
            bc_template: TriangleBc::default(),
            constraints: Vec::new(),
        })
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn triangles_mut(&mut self) -> &mut [Triangle] {
        &mut self.triangles
    }

    pub fn vertices(&self) -> &[Vector3<f64>] {
        &self.vertices
    }

    pub fn indices(&self) -> &[[usize; 3]] {
        &self.indices
    }

    /// Apply one boundary condition to every triangle of the surface.
    ///
    /// Axis and type accept the documented string synonyms, e.g.
    /// `set_bc("normal", "free", 1.0)` or `set_bc("dip", "locked", 0.0)`.
    pub fn set_bc(
        &mut self,
        axis: &str,
        kind: &str,
        value: impl Into<BcValue>,
    ) -> Result<(), ModelError> {
        let axis = Axis::parse(axis)?;
        let kind = BcKind::parse(kind)?;
        self.set_axis_bc(axis, kind, value.into());
        Ok(())
    }

    /// Typed variant of [`Surface::set_bc`].
    pub fn set_axis_bc(&mut self, axis: Axis, kind: BcKind, value: BcValue) {
        let bc = AxisBc {
            kind,
            value: value.clone(),
        };
        self.bc_template.set(axis, bc.clone());
        for tri in &mut self.triangles {
            tri.set_axis_bc(axis, bc.clone());
        }
    }

    /// Override the boundary condition of a single triangle.
    pub fn set_triangle_bc(
        &mut self,
        triangle: usize,
        axis: Axis,
        kind: BcKind,
        value: BcValue,
    ) -> Result<(), ModelError> {
        let count = self.triangles.len();
        let tri = self
            .triangles
            .get_mut(triangle)
            .ok_or(ModelError::TriangleOutOfRange { triangle, count })?;
        tri.set_axis_bc(axis, AxisBc { kind, value });
        Ok(())
    }

    pub fn add_constraint(&mut self, constraint: Box<dyn Constraint>) {
        self.constraints.push(constraint);
    }

    pub fn constraints(&self) -> &[Box<dyn Constraint>] {
        &self.constraints
    }

    pub fn has_constraints(&self) -> bool {
        !self.constraints.is_empty()
    }

    /// Replace the geometry, keeping the surface-level boundary conditions
    /// and constraints. This invalidates any assembled influence operator;
    /// when the triangle count is unchanged the caller must also mark the
    /// model dirty.
    pub fn replace_geometry(
        &mut self,
        vertices: &[f64],
        indices: &[usize],
    ) -> Result<(), ModelError> {
        let mut fresh = Surface::from_arrays(vertices, indices)?;
        for axis in Axis::ALL {
            let bc = self.bc_template.axis(axis).clone();
            fresh.set_axis_bc(axis, bc.kind, bc.value);
        }
        self.vertices = fresh.vertices;
        self.indices = fresh.indices;
        self.triangles = fresh.triangles;
        Ok(())
    }

    /// Area-weighted interpolation of per-triangle vectors to the surface
    /// vertices.
    pub fn interpolate_to_vertices(&self, per_triangle: &[Vector3<f64>]) -> Vec<Vector3<f64>> {
        let mut acc = vec![Vector3::zeros(); self.vertices.len()];
        let mut weight = vec![0.0_f64; self.vertices.len()];
        for (t, (tri, idx)) in self.triangles.iter().zip(&self.indices).enumerate() {
            let a = tri.area();
            for &v in idx {
                acc[v] += per_triangle[t] * a;
                weight[v] += a;
            }
        }
        for (v, w) in acc.iter_mut().zip(&weight) {
            if *w > 0.0 {
                *v /= *w;
            }
        }
        acc
    }

    /// Total surface area.
    pub fn area(&self) -> f64 {
        self.triangles.iter().map(|t| t.area()).sum()
    }
}
