//! Block iterative solver for the mixed boundary-value problem.
//!
//! The unknowns are the per-triangle Burgers vectors; the equations are the
//! per-axis boundary conditions. Gauss–Seidel relaxes one 3×3 diagonal
//! block at a time using the most recent neighbors; Jacobi uses the
//! previous sweep and parallelizes trivially. Inequality constraints are
//! projections applied right after each block solve and are therefore only
//! supported by the relaxation methods; GMRES and CGNS run on the
//! assembled operator for unconstrained models.
//!
//! A solve moves through idle → assembling → iterating and ends converged,
//! stopped or diverged. The assembled operator is reused across runs while
//! the model fingerprint matches and the dirty flag stays clear; boundary
//! values and remotes only enter the right-hand side.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use nalgebra::{Matrix3, Vector3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tde_model::{BcKind, Constraint, Model, ModelError, ModelFingerprint, ProjectionContext};

use crate::assembly::{RightHandSide, block_norm, build_rhs, smallest_dihedral};
use crate::error::SolveError;
use crate::kernel::DislocationKernel;
use crate::krylov;
use crate::observer::{NullObserver, Phase, Progress, SolveStatus, SolverObserver};
use crate::operator::{BcOperator, DenseOperator, ElementTable, InfluenceOperator, MatrixFreeOperator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverMethod {
    Seidel,
    Jacobi,
    Gmres,
    Cgns,
    /// Jacobi with a thread per triangle block.
    Parallel,
}

impl SolverMethod {
    pub fn parse(name: &str) -> Result<Self, ModelError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "seidel" => Ok(SolverMethod::Seidel),
            "jacobi" => Ok(SolverMethod::Jacobi),
            "gmres" => Ok(SolverMethod::Gmres),
            "cgns" => Ok(SolverMethod::Cgns),
            "parallel" => Ok(SolverMethod::Parallel),
            other => Err(ModelError::UnknownSolverMethod(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    pub method: SolverMethod,
    /// Relative residual target ‖r‖/‖r⁰‖.
    pub tolerance: f64,
    pub max_iterations: usize,
    /// Worker threads for assembly, Jacobi sweeps and field evaluation.
    pub cores: usize,
    /// Drop the dense operator after each run.
    pub auto_release_memory: bool,
    /// Consecutive residual increases before declaring divergence.
    pub divergence_window: usize,
    /// Recompute kernel entries on the fly instead of storing the dense
    /// operator.
    pub matrix_free: bool,
    /// Start from the previous run's Burgers vectors when the sizes match.
    pub warm_start: bool,
    /// Normal offset for self-influence, as a fraction of the model size.
    pub offset_scale: f64,
    /// GMRES restart length.
    pub restart: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            method: SolverMethod::Seidel,
            tolerance: 1e-9,
            max_iterations: 200,
            cores: 1,
            auto_release_memory: true,
            divergence_window: 10,
            matrix_free: false,
            warm_start: false,
            offset_scale: 1e-8,
            restart: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveReport {
    pub status: SolveStatus,
    pub iterations: usize,
    pub initial_residual: f64,
    /// Best relative residual reached.
    pub residual: f64,
    /// Relative residual after each sweep.
    pub residual_history: Vec<f64>,
    /// Whether the previously assembled operator was reused.
    pub assembly_reused: bool,
}

pub struct Solver {
    config: SolverConfig,
    observer: Box<dyn SolverObserver>,
    kernel: Option<DislocationKernel>,
    table: Option<ElementTable>,
    dense: Option<DenseOperator>,
    fingerprint: Option<ModelFingerprint>,
    burgers: Vec<Vector3<f64>>,
    assemblies: usize,
    status: SolveStatus,
}

impl Solver {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            observer: Box::new(NullObserver),
            kernel: None,
            table: None,
            dense: None,
            fingerprint: None,
            burgers: Vec::new(),
            assemblies: 0,
            status: SolveStatus::Idle,
        }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn set_observer(&mut self, observer: Box<dyn SolverObserver>) {
        self.observer = observer;
    }

    pub fn status(&self) -> SolveStatus {
        self.status
    }

    /// Converged (or best-so-far) Burgers vectors, local frames, canonical
    /// order.
    pub fn burgers(&self) -> &[Vector3<f64>] {
        &self.burgers
    }

    /// Number of operator assemblies performed so far.
    pub fn assembly_count(&self) -> usize {
        self.assemblies
    }

    /// Solve the model's boundary-value problem. Blocks until terminal.
    pub fn run(&mut self, model: &Model) -> Result<SolveReport, SolveError> {
        model.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.cores.max(1))
            .build()
            .map_err(|e| SolveError(e.to_string()))?;
        pool.install(|| self.run_inner(model))
    }

    fn run_inner(&mut self, model: &Model) -> Result<SolveReport, SolveError> {
        let constrained = model.surfaces().iter().any(|s| s.has_constraints());
        if constrained && matches!(self.config.method, SolverMethod::Gmres | SolverMethod::Cgns) {
            let msg = "inequality constraints require the seidel or jacobi method";
            self.observer.on_error(msg);
            return Err(SolveError::from(msg));
        }

        let assembled = self.ensure_assembled(model)?;
        self.status = SolveStatus::Iterating;
        let table = self.table.as_ref().expect("assembled");
        let kernel = self.kernel.as_ref().expect("assembled");
        let observer = &*self.observer;
        let rhs = build_rhs(model, table);
        let n = table.len();

        let material = model.material();
        let free_op;
        let op: &dyn InfluenceOperator = match &self.dense {
            Some(d) => d,
            None => {
                free_op = MatrixFreeOperator {
                    table,
                    kernel,
                    material,
                };
                &free_op
            }
        };

        let initial = if self.config.warm_start && self.burgers.len() == n {
            self.burgers.clone()
        } else {
            model.collect_burgers()
        };

        let outcome = match self.config.method {
            SolverMethod::Gmres | SolverMethod::Cgns => {
                let bc = BcOperator {
                    inner: op,
                    kinds: &table.bc_kinds,
                };
                let res = match self.config.method {
                    SolverMethod::Gmres => krylov::gmres(
                        &bc,
                        &rhs.target,
                        &initial,
                        self.config.tolerance,
                        self.config.max_iterations,
                        self.config.restart,
                    ),
                    _ => krylov::cgns(
                        &bc,
                        &rhs.target,
                        &initial,
                        self.config.tolerance,
                        self.config.max_iterations,
                    ),
                };
                for (k, rel) in res.history.iter().enumerate() {
                    observer.on_progress(Progress {
                        iteration: k + 1,
                        residual: *rel,
                        phase: Phase::Solve,
                    });
                }
                let status = if res.converged {
                    SolveStatus::Converged
                } else {
                    SolveStatus::Stopped
                };
                Outcome {
                    status,
                    burgers: res.x,
                    iterations: res.iterations,
                    initial_residual: block_norm(&rhs.target),
                    residual: res.residual,
                    history: res.history,
                }
            }
            SolverMethod::Seidel | SolverMethod::Jacobi | SolverMethod::Parallel => self
                .relax(model, op, table, &rhs, initial, observer)?,
        };

        self.burgers = outcome.burgers;
        self.status = outcome.status;
        observer.on_end(outcome.status);
        if self.config.auto_release_memory {
            self.dense = None;
        }
        Ok(SolveReport {
            status: outcome.status,
            iterations: outcome.iterations,
            initial_residual: outcome.initial_residual,
            residual: outcome.residual,
            residual_history: outcome.history,
            assembly_reused: !assembled,
        })
    }

    /// Returns true when a fresh assembly was performed.
    fn ensure_assembled(&mut self, model: &Model) -> Result<bool, SolveError> {
        let fp = model.fingerprint();
        let valid = !model.is_dirty()
            && self.fingerprint.as_ref() == Some(&fp)
            && self.table.is_some()
            && self.kernel.is_some()
            && (self.config.matrix_free || self.dense.is_some());
        if valid {
            return Ok(false);
        }

        self.status = SolveStatus::Assembling;
        let table = ElementTable::from_model(model, self.config.offset_scale);
        let kernel = DislocationKernel::new(model.material().nu, model.half_space());
        if self.config.matrix_free {
            self.dense = None;
        } else {
            let material = model.material();
            let n = table.len();
            let step = (n / 10).max(1);
            let counter = AtomicUsize::new(0);
            let reporter = Mutex::new(());
            let observer = &*self.observer;
            let dense = DenseOperator::assemble(&table, &kernel, &material, |_row| {
                let done = counter.fetch_add(1, Ordering::Relaxed) + 1;
                if done % step == 0 || done == n {
                    let _serialized = reporter.lock().unwrap();
                    observer.on_progress(Progress {
                        iteration: done,
                        residual: 0.0,
                        phase: Phase::Build,
                    });
                }
            });
            self.dense = Some(dense);
        }
        let edge_hits = kernel.take_edge_hits();
        if edge_hits > 0 {
            self.observer.on_warning(&format!(
                "{edge_hits} influence entries evaluated on element edges; principal values used"
            ));
        }
        self.table = Some(table);
        self.kernel = Some(kernel);
        self.fingerprint = Some(fp);
        self.assemblies += 1;
        model.clear_dirty();
        Ok(true)
    }

    fn relax(
        &self,
        model: &Model,
        op: &dyn InfluenceOperator,
        table: &ElementTable,
        rhs: &RightHandSide,
        mut b: Vec<Vector3<f64>>,
        observer: &dyn SolverObserver,
    ) -> Result<Outcome, SolveError> {
        let n = table.len();
        let constraints: Vec<&[Box<dyn Constraint>]> = model
            .surfaces()
            .iter()
            .map(|s| s.constraints())
            .collect();
        let constrained = constraints.iter().any(|c| !c.is_empty());

        // Diagonal blocks: full traction and BC-typed variants.
        let mut diag = Vec::with_capacity(n);
        let mut diag_inv = Vec::with_capacity(n);
        let mut diag_bc_inv = Vec::with_capacity(n);
        for i in 0..n {
            let d = op.block(i, i);
            let mut m = d;
            for k in 0..3 {
                if table.bc_kinds[i][k] == BcKind::Displacement {
                    let mut row = Vector3::zeros();
                    row[k] = 1.0;
                    m.set_row(k, &row.transpose());
                }
            }
            diag_inv.push(
                d.try_inverse()
                    .ok_or_else(|| SolveError(format!("singular influence block at triangle {i}")))?,
            );
            diag_bc_inv.push(
                m.try_inverse()
                    .ok_or_else(|| SolveError(format!("singular diagonal system at triangle {i}")))?,
            );
            diag.push(d);
        }

        let residual_norm = |b: &[Vector3<f64>]| -> f64 {
            let mut t = vec![Vector3::zeros(); n];
            op.apply_traction(b, &mut t);
            let mut sum = 0.0;
            for i in 0..n {
                for k in 0..3 {
                    let r = match table.bc_kinds[i][k] {
                        BcKind::Traction => t[i][k] - rhs.target[i][k],
                        BcKind::Displacement => b[i][k] - rhs.target[i][k],
                    };
                    sum += r * r;
                }
            }
            sum.sqrt()
        };

        let r0 = residual_norm(&b);
        if r0 <= 1e-300 {
            return Ok(Outcome {
                status: SolveStatus::Converged,
                burgers: b,
                iterations: 0,
                initial_residual: r0,
                residual: 0.0,
                history: Vec::new(),
            });
        }

        let mut history = Vec::new();
        let mut best_rel = f64::INFINITY;
        let mut best_b = b.clone();
        let mut prev_rel = f64::INFINITY;
        let mut growth = 0_usize;
        let mut status = SolveStatus::Iterating;
        let mut iterations = 0;
        let mut cancelled = false;
        // With active inequality constraints the boundary-condition residual
        // does not vanish at the fixed point (a sliding fault keeps its
        // frictional shear); convergence is then measured on the change of
        // the Burgers field between sweeps.
        let mut prev_b = b.clone();
        let mut change_scale: Option<f64> = None;

        for iter in 1..=self.config.max_iterations {
            if observer.stop_requested() {
                status = SolveStatus::Stopped;
                cancelled = true;
                break;
            }

            match self.config.method {
                SolverMethod::Seidel => {
                    self.seidel_sweep(op, table, rhs, &constraints, &diag, &diag_inv, &diag_bc_inv, &mut b)
                }
                _ => self.jacobi_sweep(op, table, rhs, &constraints, &diag, &diag_inv, &diag_bc_inv, &mut b),
            }

            iterations = iter;
            let rel = if constrained {
                let change = b
                    .iter()
                    .zip(&prev_b)
                    .map(|(x, y)| (x - y).norm_squared())
                    .sum::<f64>()
                    .sqrt();
                prev_b.copy_from_slice(&b);
                let scale = *change_scale.get_or_insert(if change > 0.0 { change } else { 1.0 });
                change / scale
            } else {
                residual_norm(&b) / r0
            };
            history.push(rel);
            observer.on_progress(Progress {
                iteration: iter,
                residual: rel,
                phase: Phase::Solve,
            });

            if rel < best_rel {
                best_rel = rel;
                best_b.copy_from_slice(&b);
            }
            if rel <= self.config.tolerance {
                status = SolveStatus::Converged;
                break;
            }
            if rel > prev_rel {
                growth += 1;
                if growth >= self.config.divergence_window {
                    status = SolveStatus::Diverged;
                    let mut msg = format!(
                        "residual grew for {growth} consecutive iterations (now {rel:.3e})"
                    );
                    if let Some((i, j, ang)) = smallest_dihedral(table) {
                        msg.push_str(&format!(
                            "; smallest dihedral angle {ang:.1}° between triangles {i} and {j} \
                             (overlapping or folded elements are the usual cause)"
                        ));
                    }
                    observer.on_warning(&msg);
                    break;
                }
            } else {
                growth = 0;
            }
            prev_rel = rel;
        }

        if status == SolveStatus::Iterating {
            // Iteration budget exhausted; keep the best sweep.
            status = SolveStatus::Stopped;
            if constrained {
                observer.on_warning(
                    "constraint set did not converge within the iteration budget; returning best effort",
                );
            }
        }
        let burgers = match status {
            // A cooperative stop preserves the current sweep untouched.
            SolveStatus::Stopped if cancelled => b,
            SolveStatus::Converged => b,
            _ => best_b,
        };
        Ok(Outcome {
            status,
            burgers,
            iterations,
            initial_residual: r0,
            residual: if history.is_empty() { 1.0 } else { best_rel },
            history,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn seidel_sweep(
        &self,
        op: &dyn InfluenceOperator,
        table: &ElementTable,
        rhs: &RightHandSide,
        constraints: &[&[Box<dyn Constraint>]],
        diag: &[Matrix3<f64>],
        diag_inv: &[Matrix3<f64>],
        diag_bc_inv: &[Matrix3<f64>],
        b: &mut [Vector3<f64>],
    ) {
        let n = table.len();
        for i in 0..n {
            let mut coupling = rhs.remote[i];
            for (j, bj) in b.iter().enumerate() {
                if j != i {
                    coupling += op.block(i, j) * bj;
                }
            }
            b[i] = self.update_block(i, coupling, table, rhs, constraints, diag, diag_inv, diag_bc_inv, b[i]);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn jacobi_sweep(
        &self,
        op: &dyn InfluenceOperator,
        table: &ElementTable,
        rhs: &RightHandSide,
        constraints: &[&[Box<dyn Constraint>]],
        diag: &[Matrix3<f64>],
        diag_inv: &[Matrix3<f64>],
        diag_bc_inv: &[Matrix3<f64>],
        b: &mut [Vector3<f64>],
    ) {
        let n = table.len();
        let mut t_all = vec![Vector3::zeros(); n];
        op.apply_traction(b, &mut t_all);
        let old: Vec<Vector3<f64>> = b.to_vec();
        b.par_iter_mut().enumerate().for_each(|(i, bi)| {
            let coupling = t_all[i] - diag[i] * old[i] + rhs.remote[i];
            *bi = self.update_block(i, coupling, table, rhs, constraints, diag, diag_inv, diag_bc_inv, old[i]);
        });
    }

    /// Solve one 3×3 block given the coupling (remote + other triangles),
    /// then run the constraint projections in registration order.
    #[allow(clippy::too_many_arguments)]
    fn update_block(
        &self,
        i: usize,
        coupling: Vector3<f64>,
        table: &ElementTable,
        rhs: &RightHandSide,
        constraints: &[&[Box<dyn Constraint>]],
        diag: &[Matrix3<f64>],
        diag_inv: &[Matrix3<f64>],
        diag_bc_inv: &[Matrix3<f64>],
        prior: Vector3<f64>,
    ) -> Vector3<f64> {
        let mut q = Vector3::zeros();
        for k in 0..3 {
            q[k] = match table.bc_kinds[i][k] {
                BcKind::Traction => rhs.prescribed[i][k] - coupling[k],
                BcKind::Displacement => rhs.prescribed[i][k],
            };
        }
        let mut bi = diag_bc_inv[i] * q;

        let list = constraints[table.surface_of[i]];
        if !list.is_empty() {
            let ctx = ProjectionContext {
                triangle: i,
                center: table.centers[i],
                prior_burgers: prior,
            };
            let mut t = diag[i] * bi + coupling;
            for constraint in list {
                let (bp, tp) = constraint.project(&ctx, bi, t);
                if (tp - t).norm() > 0.0 {
                    // The projection moved the traction: enforce it exactly
                    // through the diagonal block inverse.
                    bi = diag_inv[i] * (tp - coupling);
                    t = tp;
                } else {
                    bi = bp;
                    t = diag[i] * bi + coupling;
                }
            }
        }
        bi
    }
}

struct Outcome {
    status: SolveStatus,
    burgers: Vec<Vector3<f64>>,
    iterations: usize,
    initial_residual: f64,
    residual: f64,
    history: Vec<f64>,
}
