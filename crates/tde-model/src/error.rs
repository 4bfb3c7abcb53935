//! Error types for model construction and validation.

use thiserror::Error;

/// Errors raised while building or validating a model.
///
/// All of these surface synchronously from the API call that triggered
/// them, before any solver iteration starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("unknown axis name: {0:?} (expected 0|x|normal, 1|y|strike or 2|z|dip)")]
    UnknownAxis(String),

    #[error("unknown boundary-condition type: {0:?}")]
    UnknownBcKind(String),

    #[error("unknown solver method: {0:?} (expected seidel, jacobi, gmres, cgns or parallel)")]
    UnknownSolverMethod(String),

    #[error("Poisson ratio {0} outside the admissible range (-1, 0.5)")]
    PoissonRatio(f64),

    #[error("Young modulus {0} must be positive")]
    YoungModulus(f64),

    #[error("density {0} must be non-negative")]
    Density(f64),

    #[error("vertex array length {0} is not divisible by 3")]
    BadVertexArray(usize),

    #[error("index array length {0} is not divisible by 3")]
    BadIndexArray(usize),

    #[error("triangle {triangle}: vertex index {index} out of range (surface has {vertex_count} vertices)")]
    IndexOutOfRange {
        triangle: usize,
        index: usize,
        vertex_count: usize,
    },

    #[error("triangle {triangle}: zero or negative area")]
    DegenerateTriangle { triangle: usize },

    #[error("surface {surface}, triangle {triangle}: zero-area triangle")]
    ZeroAreaTriangle { surface: usize, triangle: usize },

    #[error("surface {surface}, triangle {triangle}: vertex above the free surface z=0")]
    AboveFreeSurface { surface: usize, triangle: usize },

    #[error("triangle index {triangle} out of range (surface has {count} triangles)")]
    TriangleOutOfRange { triangle: usize, count: usize },

    #[error("model has no triangles")]
    EmptyModel,

    #[error("point array length {0} is not divisible by 3")]
    BadPointArray(usize),

    #[error("axis order {0:?} is not a permutation of (normal, strike, dip)")]
    BadAxisOrder([usize; 3]),
}
