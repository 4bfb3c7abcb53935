//! Isotropic elastic material properties.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::tensor::SymTensor;

/// Homogeneous isotropic linear-elastic material.
///
/// The engine works with the engineer sign convention: tension positive,
/// compression negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Poisson ratio (ν), admissible range (-1, 0.5)
    pub nu: f64,
    /// Young modulus (E) [Pa]
    pub e: f64,
    /// Density (ρ) [kg/m³], only used by gravity-driven remotes
    pub rho: f64,
}

impl Material {
    pub fn new(nu: f64, e: f64, rho: f64) -> Self {
        Self { nu, e, rho }
    }

    /// Check the admissible parameter ranges.
    pub fn validate(&self) -> Result<(), ModelError> {
        if !(self.nu > -1.0 && self.nu < 0.5) {
            return Err(ModelError::PoissonRatio(self.nu));
        }
        if !(self.e > 0.0) {
            return Err(ModelError::YoungModulus(self.e));
        }
        if self.rho < 0.0 {
            return Err(ModelError::Density(self.rho));
        }
        Ok(())
    }

    /// Shear modulus μ = E / 2(1+ν)
    pub fn shear_modulus(&self) -> f64 {
        self.e / (2.0 * (1.0 + self.nu))
    }

    /// First Lamé parameter λ = Eν / ((1+ν)(1−2ν))
    pub fn lame_lambda(&self) -> f64 {
        self.e * self.nu / ((1.0 + self.nu) * (1.0 - 2.0 * self.nu))
    }

    /// Bulk modulus K = E / 3(1−2ν)
    pub fn bulk_modulus(&self) -> f64 {
        self.e / (3.0 * (1.0 - 2.0 * self.nu))
    }

    /// Hooke's law: σ = λ tr(ε) I + 2μ ε
    pub fn stress_from_strain(&self, strain: &SymTensor) -> SymTensor {
        let lambda = self.lame_lambda();
        let mu = self.shear_modulus();
        let tr = strain.trace();
        SymTensor {
            xx: lambda * tr + 2.0 * mu * strain.xx,
            xy: 2.0 * mu * strain.xy,
            xz: 2.0 * mu * strain.xz,
            yy: lambda * tr + 2.0 * mu * strain.yy,
            yz: 2.0 * mu * strain.yz,
            zz: lambda * tr + 2.0 * mu * strain.zz,
        }
    }
}
