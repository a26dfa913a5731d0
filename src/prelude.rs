pub use serde::{Deserialize, Serialize};

pub use ndarray::*;
pub use ndarray_rand::rand_distr::Normal;
pub use ndarray_rand::RandomExt;

pub use crate::error::*;
pub use crate::models::Sequential;

// Internal re-exports
pub use crate::core::{
    accuracy,
    Activation,
    Dense,
    GradientClipConfig,
    LayerTrait,
    Loss,
    OptimizerConfig,
    OptimizerType,
    Regularizer,
    WidthPolicy,
};
