use rand::seq::SliceRandom;

use crate::prelude::*;

/// One mini-batch: dense features, one-hot targets, and the raw labels.
#[derive(Debug, Clone)]
pub struct Batch {
    pub features: Array2<f64>,
    pub targets: Array2<f64>,
    pub labels: Array1<usize>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.features.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.features.nrows() == 0
    }
}

/// A labeled classification dataset held as dense arrays.
///
/// The loader that produces the arrays is external; this wrapper only
/// enforces the feature/label contract and cuts fixed-size batches. The
/// final batch of a pass may be smaller than `batch_size`.
#[derive(Debug, Clone)]
pub struct Dataset {
    features: Array2<f64>,
    labels: Array1<usize>,
    classes: usize,
}

impl Dataset {
    pub fn new(features: Array2<f64>, labels: Array1<usize>, classes: usize) -> Result<Self> {
        if features.nrows() != labels.len() {
            return Err(NNError::BatchContract(format!(
                "{} feature rows for {} labels",
                features.nrows(),
                labels.len()
            )));
        }
        if classes == 0 {
            return Err(NNError::InvalidTrainingConfiguration(
                "need at least one class".to_string(),
            ));
        }
        if let Some(&label) = labels.iter().find(|&&label| label >= classes) {
            return Err(NNError::BatchContract(format!(
                "label {} out of range for {} classes",
                label, classes
            )));
        }
        Ok(Self {
            features,
            labels,
            classes,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn feature_width(&self) -> usize {
        self.features.ncols()
    }

    pub fn classes(&self) -> usize {
        self.classes
    }

    /// Batches in dataset order, for evaluation.
    pub fn batches(&self, batch_size: usize) -> Result<Batches<'_>> {
        let order: Vec<usize> = (0..self.len()).collect();
        Batches::new(self, order, batch_size)
    }

    /// Batches in a freshly shuffled order, for training.
    pub fn shuffled_batches(&self, batch_size: usize) -> Result<Batches<'_>> {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.shuffle(&mut rand::thread_rng());
        Batches::new(self, order, batch_size)
    }

    fn cut(&self, rows: &[usize]) -> Batch {
        let features = self.features.select(Axis(0), rows);
        let labels = Array1::from(rows.iter().map(|&r| self.labels[r]).collect::<Vec<_>>());
        let mut targets = Array2::zeros((rows.len(), self.classes));
        for (i, &label) in labels.iter().enumerate() {
            targets[[i, label]] = 1.0;
        }
        Batch {
            features,
            targets,
            labels,
        }
    }
}

pub struct Batches<'a> {
    data: &'a Dataset,
    order: Vec<usize>,
    batch_size: usize,
    cursor: usize,
}

impl<'a> Batches<'a> {
    fn new(data: &'a Dataset, order: Vec<usize>, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(NNError::InvalidTrainingConfiguration(
                "batch size must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            data,
            order,
            batch_size,
            cursor: 0,
        })
    }
}

impl Iterator for Batches<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if self.cursor >= self.order.len() {
            return None;
        }
        let end = (self.cursor + self.batch_size).min(self.order.len());
        let batch = self.data.cut(&self.order[self.cursor..end]);
        self.cursor = end;
        Some(batch)
    }
}
