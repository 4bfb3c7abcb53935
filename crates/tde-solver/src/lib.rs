//! Numerical engine for the triangular displacement-discontinuity method.
//!
//! The engine solves quasi-static linear-elastic boundary-value problems on
//! fractured media: triangulated discontinuity surfaces carry
//! piecewise-constant Burgers vectors, boundary conditions mix traction and
//! displacement per local axis, and far-field stress enters through remote
//! evaluators. The pipeline is kernel → influence operator → block
//! iterative solver → post-processor.

pub mod assembly;
pub mod error;
pub mod kernel;
pub mod krylov;
pub mod observer;
pub mod operator;
pub mod solution;
pub mod solver;

pub use assembly::{RightHandSide, build_rhs, smallest_dihedral};
pub use error::SolveError;
pub use kernel::DislocationKernel;
pub use krylov::KrylovResult;
pub use observer::{NullObserver, Phase, Progress, SolveStatus, SolverObserver};
pub use operator::{
    BcOperator, DenseOperator, ElementTable, InfluenceOperator, MatrixFreeOperator,
};
pub use solution::Solution;
pub use solver::{SolveReport, Solver, SolverConfig, SolverMethod};
