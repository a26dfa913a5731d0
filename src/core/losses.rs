use crate::core::activations::softmax_rows;
use crate::prelude::*;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loss {
    Mse,
    CrossEntropy,
}

/// Loss value and its gradient with respect to the network output.
pub fn criteria(y_hat: Array2<f64>, y: Array2<f64>, loss_ty: &Loss) -> Result<(f64, Array2<f64>)> {
    if y_hat.shape() != y.shape() {
        return Err(NNError::LayerShapeMismatch(format!(
            "Prediction shape {:?} doesn't match target shape {:?}",
            y_hat.shape(),
            y.shape()
        )));
    }
    if y_hat.nrows() == 0 {
        return Err(NNError::BatchContract("empty batch".to_string()));
    }

    let (loss, da) = match loss_ty {
        Loss::Mse => {
            let da = y_hat.clone() - y.clone();
            let loss = (0.5 * (&y_hat - &y).mapv(|a| a.powi(2))).mean().unwrap_or(0.0);
            (loss, da)
        }
        Loss::CrossEntropy => {
            // Softmax folded into the loss; the gradient below is with
            // respect to the pre-softmax network output.
            let epsilon = 1e-15;
            let p = softmax_rows(&y_hat);
            let rows = y_hat.nrows() as f64;
            let loss = -(y.clone() * p.mapv(|x| x.max(epsilon).ln())).sum() / rows;
            let da = p - y.clone();
            (loss, da)
        }
    };
    Ok((loss, da))
}

/// Fraction of rows whose arg-max prediction matches the label.
pub fn accuracy(y_hat: &Array2<f64>, labels: &Array1<usize>) -> Result<f64> {
    if y_hat.nrows() != labels.len() {
        return Err(NNError::BatchContract(format!(
            "{} prediction rows for {} labels",
            y_hat.nrows(),
            labels.len()
        )));
    }
    if labels.is_empty() {
        return Err(NNError::BatchContract("empty batch".to_string()));
    }
    let mut hits = 0usize;
    for (row, &label) in y_hat.outer_iter().zip(labels.iter()) {
        if argmax(&row) == label {
            hits += 1;
        }
    }
    Ok(hits as f64 / labels.len() as f64)
}

fn argmax(row: &ArrayView1<f64>) -> usize {
    let mut best = 0;
    let mut best_val = f64::NEG_INFINITY;
    for (i, &v) in row.iter().enumerate() {
        if v > best_val {
            best = i;
            best_val = v;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;

    #[test]
    fn accuracy_counts_argmax_matches() {
        let predictions = array![[0.1, 0.9], [0.8, 0.2]];
        let labels = Array1::from(vec![1usize, 0]);
        assert_eq!(accuracy(&predictions, &labels).unwrap(), 1.0);

        let labels = Array1::from(vec![0usize, 0]);
        assert_eq!(accuracy(&predictions, &labels).unwrap(), 0.5);
    }

    #[test]
    fn accuracy_rejects_row_mismatch() {
        let predictions = array![[0.1, 0.9]];
        let labels = Array1::from(vec![1usize, 0]);
        assert!(matches!(
            accuracy(&predictions, &labels),
            Err(NNError::BatchContract(_))
        ));
    }

    #[test]
    fn criteria_rejects_shape_mismatch() {
        let y_hat = array![[0.1, 0.9]];
        let y = array![[1.0]];
        assert!(matches!(
            criteria(y_hat, y, &Loss::Mse),
            Err(NNError::LayerShapeMismatch(_))
        ));
    }

    #[test]
    fn cross_entropy_gradient_points_from_target() {
        let y_hat = array![[2.0, 0.0], [0.0, 2.0]];
        let y = array![[1.0, 0.0], [0.0, 1.0]];
        let (loss, da) = criteria(y_hat, y, &Loss::CrossEntropy).unwrap();
        assert!(loss > 0.0);
        // confident-correct rows still get a small corrective gradient
        assert!(da[[0, 0]] < 0.0 && da[[0, 1]] > 0.0);
        assert!(da[[1, 1]] < 0.0 && da[[1, 0]] > 0.0);
    }

    #[test]
    fn mse_of_exact_prediction_is_zero() {
        let y_hat = array![[1.0, 2.0]];
        let y = array![[1.0, 2.0]];
        let (loss, da) = criteria(y_hat, y, &Loss::Mse).unwrap();
        assert_eq!(loss, 0.0);
        assert_eq!(da, array![[0.0, 0.0]]);
    }
}
