//! Triangular dislocation in a whole space.
//!
//! A triangular dislocation is the superposition of three angular
//! dislocations, one per vertex, plus the multivalued Burgers-function
//! (solid angle) term. Two artefact-free superposition configurations
//! exist; which one is valid at a field point is decided from the point's
//! barycentric coordinates in the element plane.
//!
//! All math runs in the triangle coordinate system (x along the normal,
//! y along strike, z along dip); inputs and outputs are global.

use nalgebra::{Matrix3, Vector3};
use tde_model::SymTensor;
use tde_model::triangle::local_frame;

use super::angular::{ang_dis_disp, ang_dis_strain};

/// Precomputed element-local geometry.
pub(crate) struct TriFrame {
    /// Columns (n̂, ê_s, ê_d): local → global rotation.
    pub rot: Matrix3<f64>,
    /// Second vertex, the local origin.
    pub origin: Vector3<f64>,
    /// Local coordinates of vertex 1 and 3 (vertex 2 is the origin).
    pub p1: Vector3<f64>,
    pub p3: Vector3<f64>,
    pub e12: Vector3<f64>,
    pub e13: Vector3<f64>,
    pub e23: Vector3<f64>,
    /// Interior angles at the three vertices.
    pub angle_a: f64,
    pub angle_b: f64,
    pub angle_c: f64,
    /// Longest edge, the element length scale.
    pub scale: f64,
}

impl TriFrame {
    pub fn new(verts: &[Vector3<f64>; 3]) -> Self {
        let e1 = verts[1] - verts[0];
        let e2 = verts[2] - verts[0];
        let normal = e1.cross(&e2).normalize();
        let (strike, dip) = local_frame(&normal);
        let rot = Matrix3::from_columns(&[normal, strike, dip]);
        let rt = rot.transpose();
        let origin = verts[1];
        let p1 = rt * (verts[0] - origin);
        let p3 = rt * (verts[2] - origin);
        let p2 = Vector3::zeros();
        let e12 = (p2 - p1).normalize();
        let e13 = (p3 - p1).normalize();
        let e23 = (p3 - p2).normalize();
        let angle_a = e12.dot(&e13).clamp(-1.0, 1.0).acos();
        let angle_b = (-e12).dot(&e23).clamp(-1.0, 1.0).acos();
        let angle_c = e23.dot(&e13).clamp(-1.0, 1.0).acos();
        let scale = e1.norm().max(e2.norm()).max((verts[2] - verts[1]).norm());
        Self {
            rot,
            origin,
            p1,
            p3,
            e12,
            e13,
            e23,
            angle_a,
            angle_b,
            angle_c,
            scale,
        }
    }

    pub fn to_local(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.rot.transpose() * (p - self.origin)
    }
}

/// Artefact-free configuration for a field point: +1 and -1 select the two
/// angular-dislocation superpositions, 0 flags an in-plane point on an
/// edge line (principal-value case).
fn trimode(y: f64, z: f64, x: f64, p1: &Vector3<f64>, p3: &Vector3<f64>) -> i32 {
    // Barycentric coordinates in the element plane; vertex 2 is the origin.
    let (p1y, p1z) = (p1.y, p1.z);
    let (p2y, p2z) = (0.0, 0.0);
    let (p3y, p3z) = (p3.y, p3.z);
    let den = (p2z - p3z) * (p1y - p3y) + (p3y - p2y) * (p1z - p3z);
    let a = ((p2z - p3z) * (y - p3y) + (p3y - p2y) * (z - p3z)) / den;
    let b = ((p3z - p1z) * (y - p3y) + (p1y - p3y) * (z - p3z)) / den;
    let c = 1.0 - a - b;

    let mut tm = 1;
    if (a < 0.0 && b >= 0.0 && c >= 0.0)
        || (a >= 0.0 && b < 0.0 && c >= 0.0)
        || (a >= 0.0 && b >= 0.0 && c < 0.0)
    {
        tm = -1;
    }
    if (a == 0.0 && b >= 0.0 && c >= 0.0)
        || (a >= 0.0 && b == 0.0 && c >= 0.0)
        || (a >= 0.0 && b >= 0.0 && c == 0.0)
    {
        tm = 0;
    }
    if tm == 0 && x != 0.0 {
        tm = 1;
    }
    tm
}

/// Angular dislocation contribution in the triangle frame: rotate into the
/// dislocation's own system (the side vector becomes its z axis), evaluate,
/// rotate back.
fn setup_disp(
    x: f64,
    y: f64,
    z: f64,
    alpha: f64,
    b: &Vector3<f64>,
    nu: f64,
    vertex: &Vector3<f64>,
    side: &Vector3<f64>,
) -> (f64, f64, f64) {
    let (sy, sz) = (side.y, side.z);
    // Rotation taking the side direction onto the dislocation's z axis
    let y1 = sz * (y - vertex.y) - sy * (z - vertex.z);
    let z1 = sy * (y - vertex.y) + sz * (z - vertex.z);
    let by1 = sz * b.y - sy * b.z;
    let bz1 = sy * b.y + sz * b.z;
    let (u, v0, w0) = ang_dis_disp(x, y1, z1, -std::f64::consts::PI + alpha, b.x, by1, bz1, nu);
    let v = sz * v0 + sy * w0;
    let w = -sy * v0 + sz * w0;
    (u, v, w)
}

fn setup_strain(
    x: f64,
    y: f64,
    z: f64,
    alpha: f64,
    b: &Vector3<f64>,
    nu: f64,
    vertex: &Vector3<f64>,
    side: &Vector3<f64>,
) -> SymTensor {
    let (sy, sz) = (side.y, side.z);
    let y1 = sz * (y - vertex.y) - sy * (z - vertex.z);
    let z1 = sy * (y - vertex.y) + sz * (z - vertex.z);
    let by1 = sz * b.y - sy * b.z;
    let bz1 = sy * b.y + sz * b.z;
    let e = ang_dis_strain(x, y1, z1, -std::f64::consts::PI + alpha, b.x, by1, bz1, nu);
    // Rotate the tensor back about the x axis
    let m = Matrix3::new(1.0, 0.0, 0.0, 0.0, sz, sy, 0.0, -sy, sz);
    SymTensor::from_flat([e[0], e[3], e[4], e[1], e[5], e[2]])
        .rotate(&m)
}

/// Burgers-function (solid angle) value at a local point.
fn solid_angle_term(f: &TriFrame, x: f64, y: f64, z: f64) -> f64 {
    let a = Vector3::new(-x, f.p1.y - y, f.p1.z - z);
    let b = Vector3::new(-x, -y, -z);
    let c = Vector3::new(-x, f.p3.y - y, f.p3.z - z);
    let (na, nb, nc) = (a.norm(), b.norm(), c.norm());
    let num = a.dot(&b.cross(&c));
    let den = na * nb * nc + a.dot(&b) * nc + a.dot(&c) * nb + b.dot(&c) * na;
    -2.0 * num.atan2(den) / (4.0 * std::f64::consts::PI)
}

fn disp_local(f: &TriFrame, x: f64, y: f64, z: f64, b: &Vector3<f64>, nu: f64) -> Vector3<f64> {
    let tm = trimode(y, z, x, &f.p1, &f.p3);
    if tm == 0 {
        // Principal value on an in-plane edge line: average the two sides.
        let eps = 1e-8 * f.scale;
        let up = disp_local(f, eps, y, z, b, nu);
        let um = disp_local(f, -eps, y, z, b, nu);
        return (up + um) * 0.5;
    }

    let mut u;
    let p2 = Vector3::zeros();
    if tm > 0 {
        let a = setup_disp(x, y, z, f.angle_a, b, nu, &f.p1, &(-f.e13));
        let bb = setup_disp(x, y, z, f.angle_b, b, nu, &p2, &f.e12);
        let c = setup_disp(x, y, z, f.angle_c, b, nu, &f.p3, &f.e23);
        u = Vector3::new(a.0 + bb.0 + c.0, a.1 + bb.1 + c.1, a.2 + bb.2 + c.2);
    } else {
        let a = setup_disp(x, y, z, f.angle_a, b, nu, &f.p1, &f.e13);
        let bb = setup_disp(x, y, z, f.angle_b, b, nu, &p2, &(-f.e12));
        let c = setup_disp(x, y, z, f.angle_c, b, nu, &f.p3, &(-f.e23));
        u = Vector3::new(a.0 + bb.0 + c.0, a.1 + bb.1 + c.1, a.2 + bb.2 + c.2);
    }

    let fi = solid_angle_term(f, x, y, z);
    u += b * fi;
    u
}

fn strain_local(f: &TriFrame, x: f64, y: f64, z: f64, b: &Vector3<f64>, nu: f64) -> SymTensor {
    let tm = trimode(y, z, x, &f.p1, &f.p3);
    if tm == 0 {
        let eps = 1e-8 * f.scale;
        let ep = strain_local(f, eps, y, z, b, nu);
        let em = strain_local(f, -eps, y, z, b, nu);
        return (ep + em) * 0.5;
    }

    let p2 = Vector3::zeros();
    if tm > 0 {
        setup_strain(x, y, z, f.angle_a, b, nu, &f.p1, &(-f.e13))
            + setup_strain(x, y, z, f.angle_b, b, nu, &p2, &f.e12)
            + setup_strain(x, y, z, f.angle_c, b, nu, &f.p3, &f.e23)
    } else {
        setup_strain(x, y, z, f.angle_a, b, nu, &f.p1, &f.e13)
            + setup_strain(x, y, z, f.angle_b, b, nu, &p2, &(-f.e12))
            + setup_strain(x, y, z, f.angle_c, b, nu, &f.p3, &(-f.e23))
    }
}

/// Whether a local point sits on an edge line of the element plane (the
/// principal-value case reported through the kernel warning channel).
pub(crate) fn on_plane_edge(f: &TriFrame, p_local: &Vector3<f64>) -> bool {
    trimode(p_local.y, p_local.z, p_local.x, &f.p1, &f.p3) == 0
}

/// Displacement at a global point due to a unit-Burgers triangular
/// dislocation in a whole space. `b_local` is in the element frame
/// (normal, strike, dip).
pub(crate) fn displacement(
    frame: &TriFrame,
    p: &Vector3<f64>,
    b_local: &Vector3<f64>,
    nu: f64,
) -> Vector3<f64> {
    let q = frame.to_local(p);
    let u = disp_local(frame, q.x, q.y, q.z, b_local, nu);
    frame.rot * u
}

/// Strain at a global point, global components.
pub(crate) fn strain(
    frame: &TriFrame,
    p: &Vector3<f64>,
    b_local: &Vector3<f64>,
    nu: f64,
) -> SymTensor {
    let q = frame.to_local(p);
    let e = strain_local(frame, q.x, q.y, q.z, b_local, nu);
    e.rotate(&frame.rot)
}
