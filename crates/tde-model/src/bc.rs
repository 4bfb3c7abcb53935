//! Per-axis boundary conditions on triangular elements.
//!
//! Each triangle carries exactly one condition per local axis
//! (normal, strike, dip): either a traction component or a displacement
//! discontinuity component. Values are scalars or callables evaluated at
//! the element center when the right-hand side is built.

use std::fmt;
use std::sync::Arc;

use nalgebra::Vector3;

use crate::error::ModelError;

/// Local element axis in the Okada convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Outward normal (local x)
    Normal,
    /// Strike direction (local y)
    Strike,
    /// Dip direction, positive up (local z)
    Dip,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::Normal, Axis::Strike, Axis::Dip];

    pub fn index(&self) -> usize {
        match self {
            Axis::Normal => 0,
            Axis::Strike => 1,
            Axis::Dip => 2,
        }
    }

    pub fn from_index(i: usize) -> Result<Self, ModelError> {
        match i {
            0 => Ok(Axis::Normal),
            1 => Ok(Axis::Strike),
            2 => Ok(Axis::Dip),
            _ => Err(ModelError::UnknownAxis(i.to_string())),
        }
    }

    /// Parse an axis name. Accepted synonyms: 0|x|normal, 1|y|strike,
    /// 2|z|dip (case-insensitive).
    pub fn parse(name: &str) -> Result<Self, ModelError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "0" | "x" | "normal" => Ok(Axis::Normal),
            "1" | "y" | "strike" => Ok(Axis::Strike),
            "2" | "z" | "dip" => Ok(Axis::Dip),
            _ => Err(ModelError::UnknownAxis(name.to_string())),
        }
    }
}

/// Boundary-condition type for one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BcKind {
    /// The traction component is prescribed, the Burgers component is free.
    Traction,
    /// The Burgers (displacement-discontinuity) component is prescribed.
    Displacement,
}

impl BcKind {
    /// Parse a boundary-condition type name (case-insensitive).
    pub fn parse(name: &str) -> Result<Self, ModelError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "t" | "0" | "free" | "traction" | "neumann" | "unknown" => Ok(BcKind::Traction),
            "b" | "1" | "displ" | "displacement" | "fixed" | "dirichlet" | "locked" | "imposed" => {
                Ok(BcKind::Displacement)
            }
            _ => Err(ModelError::UnknownBcKind(name.to_string())),
        }
    }
}

/// Scalar boundary-condition value: a constant or a field evaluated at the
/// element center.
#[derive(Clone)]
pub enum BcValue {
    Constant(f64),
    Field(Arc<dyn Fn(f64, f64, f64) -> f64 + Send + Sync>),
}

impl BcValue {
    pub fn field<F>(f: F) -> Self
    where
        F: Fn(f64, f64, f64) -> f64 + Send + Sync + 'static,
    {
        BcValue::Field(Arc::new(f))
    }

    pub fn evaluate(&self, center: &Vector3<f64>) -> f64 {
        match self {
            BcValue::Constant(v) => *v,
            BcValue::Field(f) => f(center.x, center.y, center.z),
        }
    }
}

impl fmt::Debug for BcValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BcValue::Constant(v) => write!(f, "Constant({v})"),
            BcValue::Field(_) => write!(f, "Field(..)"),
        }
    }
}

impl From<f64> for BcValue {
    fn from(v: f64) -> Self {
        BcValue::Constant(v)
    }
}

/// Condition on one local axis.
#[derive(Debug, Clone)]
pub struct AxisBc {
    pub kind: BcKind,
    pub value: BcValue,
}

impl AxisBc {
    pub fn traction(value: impl Into<BcValue>) -> Self {
        Self {
            kind: BcKind::Traction,
            value: value.into(),
        }
    }

    pub fn displacement(value: impl Into<BcValue>) -> Self {
        Self {
            kind: BcKind::Displacement,
            value: value.into(),
        }
    }
}

/// The three per-axis conditions of a triangle, indexed (normal, strike, dip).
///
/// Default: normal locked at 0, strike and dip traction-free.
#[derive(Debug, Clone)]
pub struct TriangleBc(pub [AxisBc; 3]);

impl Default for TriangleBc {
    fn default() -> Self {
        TriangleBc([
            AxisBc::displacement(0.0),
            AxisBc::traction(0.0),
            AxisBc::traction(0.0),
        ])
    }
}

impl TriangleBc {
    pub fn axis(&self, axis: Axis) -> &AxisBc {
        &self.0[axis.index()]
    }

    pub fn set(&mut self, axis: Axis, bc: AxisBc) {
        self.0[axis.index()] = bc;
    }

    pub fn kinds(&self) -> [BcKind; 3] {
        [self.0[0].kind, self.0[1].kind, self.0[2].kind]
    }

    /// Evaluate the three prescribed values at an element center.
    pub fn values_at(&self, center: &Vector3<f64>) -> Vector3<f64> {
        Vector3::new(
            self.0[0].value.evaluate(center),
            self.0[1].value.evaluate(center),
            self.0[2].value.evaluate(center),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_synonyms() {
        for name in ["0", "x", "normal", "NORMAL", " X "] {
            assert_eq!(Axis::parse(name).unwrap(), Axis::Normal);
        }
        for name in ["1", "y", "strike"] {
            assert_eq!(Axis::parse(name).unwrap(), Axis::Strike);
        }
        for name in ["2", "z", "Dip"] {
            assert_eq!(Axis::parse(name).unwrap(), Axis::Dip);
        }
        assert!(Axis::parse("w").is_err());
    }

    #[test]
    fn bc_kind_synonyms() {
        for name in ["t", "0", "free", "traction", "neumann", "unknown"] {
            assert_eq!(BcKind::parse(name).unwrap(), BcKind::Traction);
        }
        for name in [
            "b",
            "1",
            "displ",
            "displacement",
            "fixed",
            "dirichlet",
            "locked",
            "imposed",
        ] {
            assert_eq!(BcKind::parse(name).unwrap(), BcKind::Displacement);
        }
        assert!(BcKind::parse("robin").is_err());
    }

    #[test]
    fn default_bc_is_normal_locked_shear_free() {
        let bc = TriangleBc::default();
        assert_eq!(bc.kinds()[0], BcKind::Displacement);
        assert_eq!(bc.kinds()[1], BcKind::Traction);
        assert_eq!(bc.kinds()[2], BcKind::Traction);
        let v = bc.values_at(&Vector3::zeros());
        assert_eq!(v, Vector3::zeros());
    }

    #[test]
    fn field_value_evaluates_at_center() {
        let bc = AxisBc::traction(BcValue::field(|x, _, z| x + 10.0 * z));
        let v = bc.value.evaluate(&Vector3::new(2.0, 5.0, -1.0));
        assert_eq!(v, -8.0);
    }
}
