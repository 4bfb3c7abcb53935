//! Inequality constraints as per-triangle projection hooks.
//!
//! Every constraint exposes one operation: project the tentative Burgers
//! vector and the tentative traction of a triangle onto an admissible set.
//! The solver never switches on the concrete constraint kind; it applies
//! the projections in registration order after each block solve and
//! reconciles the Burgers vector through the diagonal block inverse when a
//! projection changed the traction.
//!
//! All vectors are in the triangle's local frame (normal, strike, dip).

use nalgebra::Vector3;

use crate::bc::Axis;

/// Per-triangle data handed to a projection.
#[derive(Debug, Clone, Copy)]
pub struct ProjectionContext {
    /// Global triangle index in the model's canonical numbering.
    pub triangle: usize,
    /// Element center in global coordinates.
    pub center: Vector3<f64>,
    /// Burgers vector before the current block update (local frame).
    pub prior_burgers: Vector3<f64>,
}

/// Projection of a tentative (Burgers, traction) pair onto an admissible set.
pub trait Constraint: Send + Sync {
    /// Returns the projected pair. Returning the inputs unchanged means the
    /// candidate is admissible. When the returned traction differs from the
    /// input, the solver recomputes the Burgers vector from it; otherwise
    /// the returned Burgers vector is taken as-is.
    fn project(
        &self,
        ctx: &ProjectionContext,
        burgers: Vector3<f64>,
        traction: Vector3<f64>,
    ) -> (Vector3<f64>, Vector3<f64>);
}

/// Coulomb friction on the element plane.
///
/// With σ_n = t·ê_n (tension positive) the admissible shear is
/// τ_max = max(0, −σ_n·μ_f + C). Inside the cone the element sticks
/// (tangential Burgers kept at its pre-update value); outside it slides and
/// the tangential traction is scaled back onto the cone surface.
#[derive(Debug, Clone, Copy)]
pub struct Coulomb {
    pub friction: f64,
    pub cohesion: f64,
    /// Replace the cone by the 4-facet pyramid |t_s| ≤ τ_max, |t_d| ≤ τ_max
    /// (faster, anisotropic).
    pub linearized: bool,
}

impl Coulomb {
    pub fn new(friction: f64, cohesion: f64) -> Self {
        Self {
            friction,
            cohesion,
            linearized: false,
        }
    }

    pub fn linearized(friction: f64, cohesion: f64) -> Self {
        Self {
            friction,
            cohesion,
            linearized: true,
        }
    }

    /// Maximum admissible shear magnitude for a normal traction.
    pub fn tau_max(&self, sigma_n: f64) -> f64 {
        (-sigma_n * self.friction + self.cohesion).max(0.0)
    }
}

impl Constraint for Coulomb {
    fn project(
        &self,
        ctx: &ProjectionContext,
        burgers: Vector3<f64>,
        traction: Vector3<f64>,
    ) -> (Vector3<f64>, Vector3<f64>) {
        let tau_max = self.tau_max(traction.x);
        if self.linearized {
            let ts = traction.y.clamp(-tau_max, tau_max);
            let td = traction.z.clamp(-tau_max, tau_max);
            if ts == traction.y && td == traction.z {
                // Stick: keep the pre-update tangential Burgers.
                let b = Vector3::new(burgers.x, ctx.prior_burgers.y, ctx.prior_burgers.z);
                return (b, traction);
            }
            return (burgers, Vector3::new(traction.x, ts, td));
        }
        let tau = (traction.y * traction.y + traction.z * traction.z).sqrt();
        if tau <= tau_max {
            let b = Vector3::new(burgers.x, ctx.prior_burgers.y, ctx.prior_burgers.z);
            (b, traction)
        } else {
            let scale = tau_max / tau;
            (
                burgers,
                Vector3::new(traction.x, traction.y * scale, traction.z * scale),
            )
        }
    }
}

/// Lower bound on one Burgers component: b·ê_axis ≥ value.
#[derive(Debug, Clone, Copy)]
pub struct MinDispl {
    pub axis: Axis,
    pub value: f64,
}

impl MinDispl {
    pub fn new(axis: Axis, value: f64) -> Self {
        Self { axis, value }
    }
}

impl Constraint for MinDispl {
    fn project(
        &self,
        _ctx: &ProjectionContext,
        mut burgers: Vector3<f64>,
        traction: Vector3<f64>,
    ) -> (Vector3<f64>, Vector3<f64>) {
        let i = self.axis.index();
        if burgers[i] < self.value {
            burgers[i] = self.value;
        }
        (burgers, traction)
    }
}

/// User-supplied traction projection.
pub struct UserTic {
    f: Box<dyn Fn(&ProjectionContext, Vector3<f64>) -> Vector3<f64> + Send + Sync>,
}

impl UserTic {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&ProjectionContext, Vector3<f64>) -> Vector3<f64> + Send + Sync + 'static,
    {
        Self { f: Box::new(f) }
    }
}

impl Constraint for UserTic {
    fn project(
        &self,
        ctx: &ProjectionContext,
        burgers: Vector3<f64>,
        traction: Vector3<f64>,
    ) -> (Vector3<f64>, Vector3<f64>) {
        (burgers, (self.f)(ctx, traction))
    }
}

/// User-supplied displacement (Burgers) projection.
pub struct UserDic {
    f: Box<dyn Fn(&ProjectionContext, Vector3<f64>) -> Vector3<f64> + Send + Sync>,
}

impl UserDic {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&ProjectionContext, Vector3<f64>) -> Vector3<f64> + Send + Sync + 'static,
    {
        Self { f: Box::new(f) }
    }
}

impl Constraint for UserDic {
    fn project(
        &self,
        ctx: &ProjectionContext,
        burgers: Vector3<f64>,
        traction: Vector3<f64>,
    ) -> (Vector3<f64>, Vector3<f64>) {
        ((self.f)(ctx, burgers), traction)
    }
}
