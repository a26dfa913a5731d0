use crate::prelude::*;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum Regularizer {
    None,
    L1(f64),
    L2(f64),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum ClipValue {
    None,
    Value(f64),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GradientClipConfig {
    pub dw: ClipValue, // for weight gradients
    pub db: ClipValue, // for bias gradients
}

impl Default for GradientClipConfig {
    fn default() -> Self {
        Self {
            dw: ClipValue::None,
            db: ClipValue::None,
        }
    }
}

impl GradientClipConfig {
    pub fn new(dw: Option<f64>, db: Option<f64>) -> Self {
        Self {
            dw: match dw {
                Some(value) => ClipValue::Value(value),
                None => ClipValue::None,
            },
            db: match db {
                Some(value) => ClipValue::Value(value),
                None => ClipValue::None,
            },
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum OptimizerType {
    Sgd {
        lr: f64,
    },
    Momentum {
        lr: f64,
        momentum: f64,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct OptimizerConfig {
    pub optimizer_type: OptimizerType,
    pub regularizer: Regularizer,
    pub gradientclip: GradientClipConfig,
}

impl OptimizerConfig {
    pub fn momentum(lr: f64, momentum: f64) -> Self {
        Self {
            optimizer_type: OptimizerType::Momentum { lr, momentum },
            regularizer: Regularizer::None,
            gradientclip: GradientClipConfig::default(),
        }
    }
}

/// Per-layer momentum state, same shapes as the layer it belongs to.
#[derive(Debug, Clone)]
pub struct Velocity {
    pub vw: Array2<f64>,
    pub vb: Array2<f64>,
}

impl Velocity {
    pub fn zeros(weight_dim: (usize, usize), bias_dim: (usize, usize)) -> Self {
        Self {
            vw: Array2::zeros(weight_dim),
            vb: Array2::zeros(bias_dim),
        }
    }
}

pub trait Optimization {
    fn optimize(
        &mut self,
        dw: Array2<f64>,
        db: Array2<f64>,
        velocity: &mut Velocity,
        config: &OptimizerConfig,
    );
}

pub fn apply_optimization(
    weights: &mut Array2<f64>,
    bias: &mut Array2<f64>,
    mut dw: Array2<f64>,
    mut db: Array2<f64>,
    velocity: &mut Velocity,
    config: &OptimizerConfig,
) {
    // Apply regularization to gradients
    match &config.regularizer {
        Regularizer::L1(lambda) => {
            let l1_grad = weights.mapv(|w| {
                if w > 0.0 {
                    1.0
                } else if w < 0.0 {
                    -1.0
                } else {
                    0.0
                }
            });
            dw = dw + (*lambda * l1_grad);
        }
        Regularizer::L2(lambda) => {
            dw = dw + (*lambda * weights.clone());
        }
        Regularizer::None => (),
    }

    // Clip gradients based on config
    match config.gradientclip.dw {
        ClipValue::Value(clip_value) => clip_gradients(&mut dw, clip_value),
        ClipValue::None => (),
    }
    match config.gradientclip.db {
        ClipValue::Value(clip_value) => clip_gradients(&mut db, clip_value),
        ClipValue::None => (),
    }

    // Apply optimizer
    match &config.optimizer_type {
        OptimizerType::Sgd { lr } => {
            *weights = weights.clone() - *lr * dw;
            *bias = bias.clone() - *lr * db;
        }
        OptimizerType::Momentum { lr, momentum } => {
            velocity.vw = *momentum * velocity.vw.clone() - *lr * dw;
            velocity.vb = *momentum * velocity.vb.clone() - *lr * db;
            *weights = weights.clone() + velocity.vw.clone();
            *bias = bias.clone() + velocity.vb.clone();
        }
    }
}

fn clip_gradients(grad: &mut Array2<f64>, clip_value: f64) {
    grad.mapv_inplace(|x| x.clamp(-clip_value, clip_value));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;

    #[test]
    fn sgd_steps_against_the_gradient() {
        let mut w = array![[1.0]];
        let mut b = array![[0.0]];
        let mut velocity = Velocity::zeros((1, 1), (1, 1));
        let config = OptimizerConfig {
            optimizer_type: OptimizerType::Sgd { lr: 0.5 },
            regularizer: Regularizer::None,
            gradientclip: GradientClipConfig::default(),
        };
        apply_optimization(&mut w, &mut b, array![[2.0]], array![[2.0]], &mut velocity, &config);
        assert_eq!(w, array![[0.0]]);
        assert_eq!(b, array![[-1.0]]);
    }

    #[test]
    fn momentum_accumulates_velocity() {
        let mut w = array![[0.0]];
        let mut b = array![[0.0]];
        let mut velocity = Velocity::zeros((1, 1), (1, 1));
        let config = OptimizerConfig::momentum(1.0, 0.5);
        // two identical steps: v1 = -g, v2 = 0.5 v1 - g
        apply_optimization(&mut w, &mut b, array![[1.0]], array![[0.0]], &mut velocity, &config);
        apply_optimization(&mut w, &mut b, array![[1.0]], array![[0.0]], &mut velocity, &config);
        assert_eq!(velocity.vw, array![[-1.5]]);
        assert_eq!(w, array![[-2.5]]);
    }

    #[test]
    fn clipping_bounds_the_update() {
        let mut w = array![[0.0]];
        let mut b = array![[0.0]];
        let mut velocity = Velocity::zeros((1, 1), (1, 1));
        let config = OptimizerConfig {
            optimizer_type: OptimizerType::Sgd { lr: 1.0 },
            regularizer: Regularizer::None,
            gradientclip: GradientClipConfig::new(Some(0.1), None),
        };
        apply_optimization(&mut w, &mut b, array![[5.0]], array![[0.0]], &mut velocity, &config);
        assert_eq!(w, array![[-0.1]]);
    }
}
