// src/core.rs
pub mod activations;
pub mod layers;
pub mod losses;
pub mod optimizers;
pub mod schedule;

// Re-export commonly used items
pub use activations::Activation;
pub use layers::{Dense, LayerTrait};
pub use losses::{accuracy, criteria, Loss};
pub use optimizers::{
    apply_optimization, ClipValue, GradientClipConfig, Optimization, OptimizerConfig,
    OptimizerType, Regularizer, Velocity,
};
pub use schedule::{WidthPolicy, NARROW_PIVOT_WIDTH};
