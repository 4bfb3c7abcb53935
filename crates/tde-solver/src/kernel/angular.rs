//! Angular dislocation primitives in their own coordinate system.
//!
//! An angular dislocation is bounded by two half-infinite legs meeting at a
//! vertex; three of them superpose into a triangular dislocation. The
//! functions below give the displacement and strain of one angular
//! dislocation with Burgers vector (bx, by, bz) in the dislocation
//! coordinate system, for a whole space with Poisson ratio nu.
//!
//! `ang_dis_disp` returns the single-valued part of the displacement; the
//! multivalued Burgers-function part is accumulated once per triangle by
//! the caller. `ang_dis_strain` is the strain of the complete field, i.e.
//! it already contains the Burgers-function gradient terms.
//!
//! The logarithmic arguments r−z and r−ζ vanish on the dislocation legs;
//! the caller selects a configuration that keeps field points away from
//! them, and the clamps below only guard against round-off driving the
//! arguments slightly negative.

use std::f64::consts::PI;

/// Displacement (u, v, w) of an angular dislocation (single-valued part).
#[allow(clippy::too_many_arguments)]
pub(crate) fn ang_dis_disp(
    x: f64,
    y: f64,
    z: f64,
    alpha: f64,
    bx: f64,
    by: f64,
    bz: f64,
    nu: f64,
) -> (f64, f64, f64) {
    let cos_a = alpha.cos();
    let sin_a = alpha.sin();
    let eta = y * cos_a - z * sin_a;
    let zeta = y * sin_a + z * cos_a;
    let r = (x * x + y * y + z * z).sqrt();

    // Round-off guard for the logarithmic terms
    let zeta = zeta.min(r);
    let z = z.min(r);

    let k = 1.0 / (8.0 * PI * (1.0 - nu));

    let ux = bx * k * (x * y / r / (r - z) - x * eta / r / (r - zeta));
    let vx = bx
        * k
        * (eta * sin_a / (r - zeta) - y * eta / r / (r - zeta)
            + y * y / r / (r - z)
            + (1.0 - 2.0 * nu) * (cos_a * (r - zeta).ln() - (r - z).ln()));
    let wx = bx
        * k
        * (eta * cos_a / (r - zeta) - y / r - eta * z / r / (r - zeta)
            - (1.0 - 2.0 * nu) * sin_a * (r - zeta).ln());

    let uy = by
        * k
        * (x * x * cos_a / r / (r - zeta) - x * x / r / (r - z)
            - (1.0 - 2.0 * nu) * (cos_a * (r - zeta).ln() - (r - z).ln()));
    let vy = by * x * k * (y * cos_a / r / (r - zeta) - sin_a * cos_a / (r - zeta) - y / r / (r - z));
    let wy = by * x * k * (z * cos_a / r / (r - zeta) - cos_a * cos_a / (r - zeta) + 1.0 / r);

    let uz = bz * sin_a * k * ((1.0 - 2.0 * nu) * (r - zeta).ln() - x * x / r / (r - zeta));
    let vz = bz * x * sin_a * k * (sin_a / (r - zeta) - y / r / (r - zeta));
    let wz = bz * x * sin_a * k * (cos_a / (r - zeta) - z / r / (r - zeta));

    (ux + uy + uz, vx + vy + vz, wx + wy + wz)
}

/// Gradient of the angular dislocation's Burgers function (the multivalued
/// part of the displacement divided by the Burgers vector).
pub(crate) fn burgers_fn_gradient(x: f64, y: f64, z: f64, alpha: f64) -> (f64, f64, f64) {
    let cos_a = alpha.cos();
    let sin_a = alpha.sin();
    let eta = y * cos_a - z * sin_a;
    let zeta = y * sin_a + z * cos_a;
    let r = (x * x + y * y + z * z).sqrt();
    let gx = (eta / r / (r - zeta) - y / r / (r - z)) / (4.0 * PI);
    let gy = (x / r / (r - z) - cos_a * x / r / (r - zeta)) / (4.0 * PI);
    let gz = (sin_a * x / r / (r - zeta)) / (4.0 * PI);
    (gx, gy, gz)
}

/// Strain tensor (exx, eyy, ezz, exy, exz, eyz) of an angular dislocation
/// (complete field).
#[allow(clippy::too_many_arguments)]
pub(crate) fn ang_dis_strain(
    x: f64,
    y: f64,
    z: f64,
    alpha: f64,
    bx: f64,
    by: f64,
    bz: f64,
    nu: f64,
) -> [f64; 6] {
    let sin_a = alpha.sin();
    let cos_a = alpha.cos();
    let eta = y * cos_a - z * sin_a;
    let zeta = y * sin_a + z * cos_a;

    let x2 = x * x;
    let y2 = y * y;
    let z2 = z * z;
    let r2 = x2 + y2 + z2;
    let r = r2.sqrt();
    let r3 = r * r2;
    let rz = r * (r - z);
    let r2z2 = r2 * (r - z) * (r - z);
    let r3z = r3 * (r - z);

    let w = zeta - r;
    let w2 = w * w;
    let wr = w * r;
    let w2r = w2 * r;
    let wr3 = w * r3;
    let w2r2 = w2 * r2;

    let c = (r * cos_a - z) / wr;
    let s = (r * sin_a - y) / wr;

    let (fi_x, fi_y, fi_z) = burgers_fn_gradient(x, y, z, alpha);

    let k = 1.0 / (8.0 * PI * (1.0 - nu));
    let nu2p1 = 2.0 * nu + 1.0;

    let exx = bx * fi_x
        + bx * k * (eta / wr + eta * x2 / w2r2 - eta * x2 / wr3 + y / rz - x2 * y / r2z2 - x2 * y / r3z)
        - by * x * k * ((nu2p1 / wr + x2 / w2r2 - x2 / wr3) * cos_a + nu2p1 / rz - x2 / r2z2 - x2 / r3z)
        + bz * x * sin_a * k * (nu2p1 / wr + x2 / w2r2 - x2 / wr3);

    let eyy = by * fi_y
        + bx
            * k
            * ((1.0 / wr + s * s - y2 / wr3) * eta + nu2p1 * y / rz
                - y * y2 / r2z2
                - y * y2 / r3z
                - 2.0 * nu * cos_a * s)
        - by * x * k * (1.0 / rz - y2 / r2z2 - y2 / r3z + (1.0 / wr + s * s - y2 / wr3) * cos_a)
        + bz * x * sin_a * k * (1.0 / wr + s * s - y2 / wr3);

    let ezz = bz * fi_z
        + bx * k * (eta / w / r + eta * c * c - eta * z2 / wr3 + y * z / r3 + 2.0 * nu * sin_a * c)
        - by * x * k * ((1.0 / wr + c * c - z2 / wr3) * cos_a + z / r3)
        + bz * x * sin_a * k * (1.0 / wr + c * c - z2 / wr3);

    let exy = bx * fi_y / 2.0 + by * fi_x / 2.0
        - bx
            * k
            * (x * y2 / r2z2 - nu * x / rz + x * y2 / r3z - nu * x * cos_a / wr
                + eta * x * s / wr
                + eta * x * y / wr3)
        + by
            * k
            * (x2 * y / r2z2 - nu * y / rz + x2 * y / r3z + nu * cos_a * s
                + x2 * y * cos_a / wr3
                + x2 * cos_a * s / wr)
        - bz * sin_a * k * (nu * s + x2 * s / wr + x2 * y / wr3);

    let exz = bx * fi_z / 2.0 + bz * fi_x / 2.0
        - bx * k * (-x * y / r3 + nu * x * sin_a / wr + eta * x * c / wr + eta * x * z / wr3)
        + by
            * k
            * (-x2 / r3 + nu / r + nu * cos_a * c + x2 * z * cos_a / wr3 + x2 * cos_a * c / wr)
        - bz * sin_a * k * (nu * c + x2 * c / wr + x2 * z / wr3);

    let eyz = by * fi_z / 2.0 + bz * fi_y / 2.0
        + bx
            * k
            * (y2 / r3 - nu / r - nu * cos_a * c + nu * sin_a * s + eta * sin_a * cos_a / w2
                - eta * (y * cos_a + z * sin_a) / w2r
                + eta * y * z / w2r2
                - eta * y * z / wr3)
        - by
            * x
            * k
            * (y / r3 + sin_a * cos_a * cos_a / w2 - cos_a * (y * cos_a + z * sin_a) / w2r
                + y * z * cos_a / w2r2
                - y * z * cos_a / wr3)
        - bz
            * x
            * sin_a
            * k
            * (y * z / wr3 - sin_a * cos_a / w2 + (y * cos_a + z * sin_a) / w2r - y * z / w2r2);

    [exx, eyy, ezz, exy, exz, eyz]
}
