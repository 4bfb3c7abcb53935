//! Remote (far-field) stress evaluators.
//!
//! A remote is a callable returning a symmetric stress tensor at any point;
//! a model may hold several and their effects sum linearly. Remote strain is
//! deliberately unsupported.

use nalgebra::Vector3;

use crate::tensor::SymTensor;

/// Far-field stress source.
pub trait RemoteStress: Send + Sync {
    /// Symmetric stress tensor at (x, y, z), engineer convention.
    fn stress_at(&self, x: f64, y: f64, z: f64) -> SymTensor;

    fn traction_at(&self, p: &Vector3<f64>, normal: &Vector3<f64>) -> Vector3<f64> {
        self.stress_at(p.x, p.y, p.z).traction(normal)
    }
}

/// Spatially uniform remote stress.
#[derive(Debug, Clone, Copy)]
pub struct UniformRemote {
    tensor: SymTensor,
}

impl UniformRemote {
    pub fn new(tensor: SymTensor) -> Self {
        Self { tensor }
    }

    /// Build from the flat [xx, xy, xz, yy, yz, zz] order.
    pub fn from_flat(t: [f64; 6]) -> Self {
        Self {
            tensor: SymTensor::from_flat(t),
        }
    }
}

impl RemoteStress for UniformRemote {
    fn stress_at(&self, _x: f64, _y: f64, _z: f64) -> SymTensor {
        self.tensor
    }
}

/// User-supplied remote stress callback.
pub struct FunctionRemote {
    f: Box<dyn Fn(f64, f64, f64) -> [f64; 6] + Send + Sync>,
}

impl FunctionRemote {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(f64, f64, f64) -> [f64; 6] + Send + Sync + 'static,
    {
        Self { f: Box::new(f) }
    }
}

impl RemoteStress for FunctionRemote {
    fn stress_at(&self, x: f64, y: f64, z: f64) -> SymTensor {
        SymTensor::from_flat((self.f)(x, y, z))
    }
}

/// Andersonian tectonic stress state.
///
/// The vertical principal stress is lithostatic, Sv = ρ·g·z with z negative
/// downward, so Sv ≤ 0 underground (compression negative). The horizontal
/// principal stresses are ratios of Sv: SH = k_max·Sv along the azimuth θ
/// (measured from the +x axis), Sh = k_min·Sv perpendicular to it.
#[derive(Debug, Clone, Copy)]
pub struct AndersonianRemote {
    pub density: f64,
    pub gravity: f64,
    /// SH / Sv
    pub ratio_max: f64,
    /// Sh / Sv
    pub ratio_min: f64,
    /// Azimuth of SH from the +x axis [rad]
    pub theta: f64,
}

impl AndersonianRemote {
    pub fn new(density: f64, gravity: f64, ratio_max: f64, ratio_min: f64, theta: f64) -> Self {
        Self {
            density,
            gravity,
            ratio_max,
            ratio_min,
            theta,
        }
    }
}

impl RemoteStress for AndersonianRemote {
    fn stress_at(&self, _x: f64, _y: f64, z: f64) -> SymTensor {
        let sv = self.density * self.gravity * z;
        let sh_max = self.ratio_max * sv;
        let sh_min = self.ratio_min * sv;
        let (s, c) = self.theta.sin_cos();
        SymTensor {
            xx: sh_max * c * c + sh_min * s * s,
            xy: (sh_max - sh_min) * s * c,
            xz: 0.0,
            yy: sh_max * s * s + sh_min * c * c,
            yz: 0.0,
            zz: sv,
        }
    }
}
