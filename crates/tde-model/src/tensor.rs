//! Symmetric rank-2 tensors in the engine's flat serialization order.
//!
//! Symmetric tensors are serialized as [xx, xy, xz, yy, yz, zz]; full
//! (non-symmetric) tensors as [xx, xy, xz, yx, yy, yz, zx, zy, zz].

use std::ops::{Add, AddAssign, Mul, Sub};

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// Symmetric 3×3 tensor (stress or strain).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SymTensor {
    pub xx: f64,
    pub xy: f64,
    pub xz: f64,
    pub yy: f64,
    pub yz: f64,
    pub zz: f64,
}

impl SymTensor {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn from_flat(t: [f64; 6]) -> Self {
        Self {
            xx: t[0],
            xy: t[1],
            xz: t[2],
            yy: t[3],
            yz: t[4],
            zz: t[5],
        }
    }

    pub fn to_flat(&self) -> [f64; 6] {
        [self.xx, self.xy, self.xz, self.yy, self.yz, self.zz]
    }

    /// Symmetrize an arbitrary 3×3 matrix.
    pub fn from_matrix(m: &Matrix3<f64>) -> Self {
        Self {
            xx: m[(0, 0)],
            xy: 0.5 * (m[(0, 1)] + m[(1, 0)]),
            xz: 0.5 * (m[(0, 2)] + m[(2, 0)]),
            yy: m[(1, 1)],
            yz: 0.5 * (m[(1, 2)] + m[(2, 1)]),
            zz: m[(2, 2)],
        }
    }

    pub fn to_matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.xx, self.xy, self.xz, //
            self.xy, self.yy, self.yz, //
            self.xz, self.yz, self.zz,
        )
    }

    /// Traction vector t = σ·m̂ on a plane with unit normal m̂.
    pub fn traction(&self, normal: &Vector3<f64>) -> Vector3<f64> {
        self.to_matrix() * normal
    }

    pub fn trace(&self) -> f64 {
        self.xx + self.yy + self.zz
    }

    /// Mean (hydrostatic) part, tension positive.
    pub fn mean(&self) -> f64 {
        self.trace() / 3.0
    }

    /// Von Mises equivalent value
    ///
    /// σ_v = sqrt(0.5·((σxx−σyy)² + (σyy−σzz)² + (σzz−σxx)²) + 3·(σxy² + σxz² + σyz²))
    pub fn von_mises(&self) -> f64 {
        let term1 = 0.5
            * ((self.xx - self.yy).powi(2)
                + (self.yy - self.zz).powi(2)
                + (self.zz - self.xx).powi(2));
        let term2 = 3.0 * (self.xy.powi(2) + self.xz.powi(2) + self.yz.powi(2));
        (term1 + term2).sqrt()
    }

    /// Rotate the tensor into a new basis: σ' = R σ Rᵀ.
    pub fn rotate(&self, r: &Matrix3<f64>) -> Self {
        Self::from_matrix(&(r * self.to_matrix() * r.transpose()))
    }

    pub fn norm(&self) -> f64 {
        let m = self.to_matrix();
        m.norm()
    }
}

impl Add for SymTensor {
    type Output = SymTensor;
    fn add(self, o: SymTensor) -> SymTensor {
        SymTensor {
            xx: self.xx + o.xx,
            xy: self.xy + o.xy,
            xz: self.xz + o.xz,
            yy: self.yy + o.yy,
            yz: self.yz + o.yz,
            zz: self.zz + o.zz,
        }
    }
}

impl Sub for SymTensor {
    type Output = SymTensor;
    fn sub(self, o: SymTensor) -> SymTensor {
        self + o * -1.0
    }
}

impl AddAssign for SymTensor {
    fn add_assign(&mut self, o: SymTensor) {
        *self = *self + o;
    }
}

impl Mul<f64> for SymTensor {
    type Output = SymTensor;
    fn mul(self, k: f64) -> SymTensor {
        SymTensor {
            xx: self.xx * k,
            xy: self.xy * k,
            xz: self.xz * k,
            yy: self.yy * k,
            yz: self.yz * k,
            zz: self.zz * k,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_order_round_trip() {
        let t = SymTensor::from_flat([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(t.to_flat(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(t.xy, 2.0);
        assert_eq!(t.yz, 5.0);
    }

    #[test]
    fn traction_of_uniaxial_stress() {
        let t = SymTensor {
            zz: -1.0,
            ..SymTensor::zero()
        };
        let tr = t.traction(&Vector3::z());
        assert_eq!(tr, Vector3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn von_mises_pure_shear() {
        let t = SymTensor {
            xy: 1.0,
            ..SymTensor::zero()
        };
        assert!((t.von_mises() - 3.0_f64.sqrt()).abs() < 1e-15);
    }

    #[test]
    fn rotation_preserves_invariants() {
        let t = SymTensor::from_flat([1.0, 0.2, -0.3, 2.0, 0.4, -1.0]);
        let angle = 0.7_f64;
        let r = Matrix3::new(
            angle.cos(),
            -angle.sin(),
            0.0,
            angle.sin(),
            angle.cos(),
            0.0,
            0.0,
            0.0,
            1.0,
        );
        let rt = t.rotate(&r);
        assert!((rt.trace() - t.trace()).abs() < 1e-12);
        assert!((rt.von_mises() - t.von_mises()).abs() < 1e-12);
    }
}
