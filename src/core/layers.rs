use crate::core::activations::Activation;
use crate::core::optimizers::{apply_optimization, Optimization, OptimizerConfig, Velocity};
use crate::gauss_array;
use crate::prelude::*;

pub trait LayerTrait {
    fn typ(&self) -> String;
    fn input_width(&self) -> usize;
    fn output_width(&self) -> usize;
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Dense {
    pub w: Array2<f64>,
    pub b: Array2<f64>,
    pub activation: Activation,
}

impl LayerTrait for Dense {
    fn typ(&self) -> String {
        "Dense".into()
    }

    fn input_width(&self) -> usize {
        self.w.nrows()
    }

    fn output_width(&self) -> usize {
        self.w.ncols()
    }
}

impl Dense {
    /// Affine layer with weights from Normal(0, weight_variance / prev) and
    /// biases from Normal(0, bias_variance). The weight variance shrinks with
    /// the input width so pre-activation variance stays width-independent.
    pub fn gaussian(
        prev: usize,
        perceptron: usize,
        weight_variance: f64,
        bias_variance: f64,
        activation: Activation,
    ) -> Result<Self> {
        if prev == 0 || perceptron == 0 {
            return Err(NNError::InvalidLayerConfiguration(
                "Layer dimensions must be greater than 0".to_string(),
            ));
        }
        if weight_variance < 0.0 || bias_variance < 0.0 || !weight_variance.is_finite() || !bias_variance.is_finite() {
            return Err(NNError::InvalidVariance(format!(
                "variances must be finite and non-negative, got weight={} bias={}",
                weight_variance, bias_variance
            )));
        }
        let w_dist = Normal::new(0.0, (weight_variance / prev as f64).sqrt())
            .map_err(|e| NNError::InvalidVariance(e.to_string()))?;
        let b_dist = Normal::new(0.0, bias_variance.sqrt())
            .map_err(|e| NNError::InvalidVariance(e.to_string()))?;
        Ok(Self {
            w: gauss_array!(prev, perceptron, w_dist),
            b: gauss_array!(1, perceptron, b_dist),
            activation,
        })
    }

    pub fn forward(&self, a: Array2<f64>) -> Result<(Array2<f64>, Array2<f64>)> {
        if a.ncols() != self.input_width() {
            return Err(NNError::LayerShapeMismatch(format!(
                "input has {} features, layer expects {}",
                a.ncols(),
                self.input_width()
            )));
        }
        let z = a.dot(&self.w) + self.b.clone();
        let a = self.activation.forward(z.clone())?;
        Ok((z, a))
    }

    pub fn backward(
        &self,
        z: Array2<f64>,
        a: Array2<f64>,
        da: Array2<f64>,
    ) -> Result<(Array2<f64>, Array2<f64>, Array2<f64>)> {
        let rows = z.nrows() as f64;
        let dz = self.activation.backward(z, da)?;
        let dw = a.reversed_axes().dot(&dz) / rows;
        let db = dz.clone().sum_axis(Axis(0)).insert_axis(Axis(0)) / rows;
        let da = dz.dot(&self.w.t());
        Ok((dw, db, da))
    }
}

impl Optimization for Dense {
    fn optimize(
        &mut self,
        dw: Array2<f64>,
        db: Array2<f64>,
        velocity: &mut Velocity,
        config: &OptimizerConfig,
    ) {
        apply_optimization(&mut self.w, &mut self.b, dw, db, velocity, config);
    }
}
