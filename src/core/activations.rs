#[allow(unused)]
use crate::prelude::*;
use fastapprox::fast::tanh as faster_tanh;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Linear,
    Relu,
    Sigmoid,
    Tanh,
}

impl Activation {
    pub fn forward(&self, z: Array2<f64>) -> Result<Array2<f64>> {
        Ok(match self {
            Self::Linear => z,
            Self::Relu => relu_forward(z),
            Self::Sigmoid => sigmoid_forward(z),
            Self::Tanh => tanh_forward(z),
        })
    }

    pub fn backward(&self, z: Array2<f64>, da: Array2<f64>) -> Result<Array2<f64>> {
        Ok(match self {
            Self::Linear => da,
            Self::Relu => da * relu_backward(z),
            Self::Sigmoid => da * sigmoid_backward(z),
            Self::Tanh => da * tanh_backward(z),
        })
    }
}

fn sigmoid_forward(z: Array2<f64>) -> Array2<f64> {
    z.mapv(|z| 1.0 / (1.0 + (-z).exp()))
}

fn sigmoid_backward(z: Array2<f64>) -> Array2<f64> {
    z.mapv(|z| {
        let s = 1.0 / (1.0 + (-z).exp());
        s * (1.0 - s)
    })
}

fn relu_forward(z: Array2<f64>) -> Array2<f64> {
    z.mapv(|z| if z >= 0.0 { z } else { 0.0 })
}

fn relu_backward(z: Array2<f64>) -> Array2<f64> {
    z.mapv(|z| if z >= 0.0 { 1.0 } else { 0.0 })
}

fn tanh_forward(z: Array2<f64>) -> Array2<f64> {
    z.mapv(|z| z.tanh())
}

fn tanh_backward(z: Array2<f64>) -> Array2<f64> {
    z.mapv(|z| {
        let t = faster_tanh(z as f32) as f64;
        1.0 - t * t
    })
}

/// Row-wise softmax, one distribution per sample.
pub(crate) fn softmax_rows(z: &Array2<f64>) -> Array2<f64> {
    let mut out = z.clone();
    for mut row in out.rows_mut() {
        let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        if sum > 0.0 {
            row.mapv_inplace(|v| v / sum);
        }
    }
    out
}
