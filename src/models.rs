use crate::core::schedule::WidthPolicy;
use crate::prelude::*;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Sequential {
    pub layers: Vec<Dense>,
}

impl Sequential {
    pub fn new(layers: Vec<Dense>) -> Result<Self> {
        if layers.is_empty() {
            return Err(NNError::EmptyModel);
        }
        Ok(Self { layers })
    }

    /// Gaussian-initialized tanh network whose widths follow `policy`.
    ///
    /// Every affine layer is followed by a tanh nonlinearity, including the
    /// last one; the classification loss applies its own row softmax.
    pub fn gaussian(
        policy: WidthPolicy,
        num_layers: usize,
        input_dim: usize,
        output_dim: usize,
        weight_variance: f64,
        bias_variance: f64,
    ) -> Result<Self> {
        let widths = policy.widths(num_layers, input_dim, output_dim)?;
        let mut layers = Vec::with_capacity(num_layers);
        for pair in widths.windows(2) {
            layers.push(Dense::gaussian(
                pair[0],
                pair[1],
                weight_variance,
                bias_variance,
                Activation::Tanh,
            )?);
        }
        Sequential::new(layers)
    }

    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    pub fn count_parameters(&self) -> usize {
        self.layers
            .iter()
            .map(|layer| layer.w.len() + layer.b.len())
            .sum()
    }

    pub fn summary(&self) {
        let mut total_param = 0;
        let mut res = "\nModel Sequential\n".to_string();
        res.push_str("-------------------------------------------------------------\n");
        res.push_str("Layer (Type)\t\t Output shape\t\t No.of params\n");
        for layer in self.layers.iter() {
            let a = layer.w.len();
            let b = layer.b.len();
            total_param += a + b;
            res.push_str(&format!(
                "{}\t\t\t  (None, {})\t\t  {}\n",
                layer.typ(),
                layer.output_width(),
                a + b
            ));
        }
        res.push_str("-------------------------------------------------------------\n");
        res.push_str(&format!("Total params: {}\n", total_param));
        println!("{}", res);
    }

    pub fn predict(&self, mut x: Array2<f64>) -> Result<Array2<f64>> {
        for layer in self.layers.iter() {
            (_, x) = layer.forward(x)?;
        }
        Ok(x)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let encoded: Vec<u8> = bincode::serialize(&self.layers).map_err(NNError::SerializationError)?;
        File::create(path)
            .map_err(NNError::IoError)?
            .write_all(&encoded)
            .map_err(NNError::IoError)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Sequential> {
        let mut buffer = Vec::new();
        File::open(path)
            .map_err(NNError::IoError)?
            .read_to_end(&mut buffer)
            .map_err(NNError::IoError)?;
        let layers: Vec<Dense> = bincode::deserialize(&buffer).map_err(NNError::SerializationError)?;
        Sequential::new(layers)
    }
}
