//! Data model for the triangular displacement-discontinuity engine.
//!
//! This crate holds everything a solver consumes: the isotropic material,
//! symmetric tensors in the engine's flat serialization order, triangular
//! elements with Okada-convention local frames, per-axis boundary
//! conditions, remote-stress evaluators, inequality-constraint projections,
//! triangulated surfaces, the model container with its canonical DOF
//! numbering and dirty tracking, and the Burgers-convention filter.

pub mod bc;
pub mod constraint;
pub mod error;
pub mod filter;
pub mod material;
pub mod model;
pub mod remote;
pub mod surface;
pub mod tensor;
pub mod triangle;

pub use bc::{Axis, AxisBc, BcKind, BcValue, TriangleBc};
pub use constraint::{Constraint, Coulomb, MinDispl, ProjectionContext, UserDic, UserTic};
pub use error::ModelError;
pub use filter::BurgerFilter;
pub use material::Material;
pub use model::{Model, ModelFingerprint};
pub use remote::{AndersonianRemote, FunctionRemote, RemoteStress, UniformRemote};
pub use surface::Surface;
pub use tensor::SymTensor;
pub use triangle::{Triangle, local_frame};
