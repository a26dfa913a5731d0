use log::{debug, info};

use crate::core::losses::{accuracy, criteria};
use crate::core::optimizers::{Optimization, OptimizerConfig, Velocity};
use crate::data::Dataset;
use crate::prelude::*;
use crate::probes::{CapturedSignal, EpochMarker, SignalRecorder};

/// Run-level training constants. Passed down explicitly; nothing here is
/// ambient state.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub validation_batch_size: usize,
    pub optimizer: OptimizerConfig,
    pub loss: Loss,
}

impl TrainConfig {
    pub fn new(epochs: usize, batch_size: usize, validation_batch_size: usize, lr: f64, momentum: f64) -> Self {
        Self {
            epochs,
            batch_size,
            validation_batch_size,
            optimizer: OptimizerConfig::momentum(lr, momentum),
            loss: Loss::CrossEntropy,
        }
    }
}

/// The (depth, weight variance, bias variance) tuple naming one run of a
/// sweep. Stamped into every persisted artifact.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct RunIdentity {
    pub depth: usize,
    pub weight_variance: f64,
    pub bias_variance: f64,
}

/// Per-epoch validation metrics for one run.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RunRecord {
    pub depth: usize,
    pub weight_variance: f64,
    pub bias_variance: f64,
    pub validation_loss: Vec<f64>,
    pub validation_accuracy: Vec<f64>,
}

impl RunRecord {
    fn new(identity: RunIdentity) -> Self {
        Self {
            depth: identity.depth,
            weight_variance: identity.weight_variance,
            bias_variance: identity.bias_variance,
            validation_loss: Vec::new(),
            validation_accuracy: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainPhase {
    Idle,
    EpochRunning,
    EpochEvaluating,
    Done,
}

/// Everything a finished run hands to persistence.
#[derive(Debug)]
pub struct TrainOutcome {
    pub record: RunRecord,
    pub signals: Vec<CapturedSignal>,
    /// Parameters as they were when the first-epoch probes were armed,
    /// before any update.
    pub initial_parameters: Option<Vec<Dense>>,
}

pub struct Trainer {
    network: Sequential,
    velocities: Vec<Velocity>,
    identity: RunIdentity,
    config: TrainConfig,
    phase: TrainPhase,
}

impl Trainer {
    pub fn new(network: Sequential, identity: RunIdentity, config: TrainConfig) -> Result<Self> {
        if config.epochs == 0 {
            return Err(NNError::InvalidTrainingConfiguration(
                "need at least one epoch".to_string(),
            ));
        }
        let velocities = network
            .layers
            .iter()
            .map(|layer| Velocity::zeros(layer.w.dim(), layer.b.dim()))
            .collect();
        Ok(Self {
            network,
            velocities,
            identity,
            config,
            phase: TrainPhase::Idle,
        })
    }

    pub fn network(&self) -> &Sequential {
        &self.network
    }

    pub fn phase(&self) -> TrainPhase {
        self.phase
    }

    /// Epoch `epoch` is a capture boundary iff it is the first or the last
    /// epoch of the run. With a single epoch the two coincide and the one
    /// arming is tagged "first"; persistence writes that capture under both
    /// tags.
    fn boundary_marker(epoch: usize, epochs: usize) -> Option<EpochMarker> {
        if epoch == 0 {
            Some(EpochMarker::First)
        } else if epoch == epochs - 1 {
            Some(EpochMarker::Last)
        } else {
            None
        }
    }

    /// Trains for the configured number of epochs, evaluating after each.
    ///
    /// With `capture_signals`, probes are armed before the training batches
    /// of the first and last epoch, so each boundary epoch yields one
    /// pre-activation capture per layer. With `snapshot_params`, the
    /// parameters are copied at the epoch-0 boundary for the pre-training
    /// parameter artifact.
    pub fn fit(
        &mut self,
        train: &Dataset,
        validation: &Dataset,
        capture_signals: bool,
        snapshot_params: bool,
    ) -> Result<TrainOutcome> {
        if train.is_empty() || validation.is_empty() {
            return Err(NNError::InvalidTrainingConfiguration(
                "training and validation sets must be non-empty".to_string(),
            ));
        }
        if train.feature_width() != self.network.layers[0].input_width() {
            return Err(NNError::LayerShapeMismatch(format!(
                "dataset has {} features, network expects {}",
                train.feature_width(),
                self.network.layers[0].input_width()
            )));
        }

        let epochs = self.config.epochs;
        let mut recorder = capture_signals.then(|| SignalRecorder::attach(&self.network));
        let mut initial_parameters = None;
        let mut record = RunRecord::new(self.identity);

        for epoch in 0..epochs {
            self.phase = TrainPhase::EpochRunning;
            let marker = Self::boundary_marker(epoch, epochs);
            if let (Some(recorder), Some(marker)) = (recorder.as_mut(), marker) {
                recorder.arm(marker);
                debug!("epoch {}: probes armed for '{}' capture", epoch, marker.tag());
            }
            if epoch == 0 && snapshot_params {
                initial_parameters = Some(self.network.layers.clone());
            }

            for batch in train.shuffled_batches(self.config.batch_size)? {
                self.train_batch(batch.features, batch.targets, recorder.as_mut())?;
            }

            self.phase = TrainPhase::EpochEvaluating;
            let (loss, acc) = self.evaluate(validation)?;
            record.validation_loss.push(loss);
            record.validation_accuracy.push(acc);
            info!(
                "depth {} epoch {}/{}: val_loss={:.6} val_acc={:.4}",
                self.identity.depth,
                epoch + 1,
                epochs,
                loss,
                acc
            );
        }

        self.phase = TrainPhase::Done;
        let signals = recorder.map(SignalRecorder::detach).unwrap_or_default();
        Ok(TrainOutcome {
            record,
            signals,
            initial_parameters,
        })
    }

    /// One forward/backward/update pass. Probes see every pre-activation of
    /// the forward pass; backprop never sees the probes.
    fn train_batch(
        &mut self,
        x: Array2<f64>,
        y: Array2<f64>,
        mut recorder: Option<&mut SignalRecorder>,
    ) -> Result<()> {
        if x.nrows() != y.nrows() {
            return Err(NNError::BatchContract(format!(
                "{} feature rows for {} target rows",
                x.nrows(),
                y.nrows()
            )));
        }

        // cache (required for back propagation)
        let mut z_cache = vec![];
        let mut a_cache = vec![];
        let mut z: Array2<f64>;
        let mut a = x;
        a_cache.push(a.clone());

        for (layer_index, layer) in self.network.layers.iter().enumerate() {
            (z, a) = layer.forward(a)?;
            if let Some(recorder) = recorder.as_deref_mut() {
                recorder.observe(layer_index, &z);
            }
            z_cache.push(z);
            a_cache.push(a.clone());
        }

        let y_hat = a_cache.pop().ok_or(NNError::EmptyModel)?;
        let (_, mut da) = criteria(y_hat, y, &self.config.loss)?;

        // back propagation
        let mut dw_cache = vec![];
        let mut db_cache = vec![];
        let mut dw: Array2<f64>;
        let mut db: Array2<f64>;

        for ((layer, z), a) in self
            .network
            .layers
            .iter()
            .rev()
            .zip(z_cache.into_iter().rev())
            .zip(a_cache.into_iter().rev())
        {
            (dw, db, da) = layer.backward(z, a, da)?;
            dw_cache.insert(0, dw);
            db_cache.insert(0, db);
        }

        for (((layer, velocity), dw), db) in self
            .network
            .layers
            .iter_mut()
            .zip(self.velocities.iter_mut())
            .zip(dw_cache.into_iter())
            .zip(db_cache.into_iter())
        {
            layer.optimize(dw, db, velocity, &self.config.optimizer);
        }
        Ok(())
    }

    /// Validation pass: no updates, no shuffling. Loss is weighted by batch
    /// size, accuracy is the mean of per-batch accuracies.
    fn evaluate(&self, validation: &Dataset) -> Result<(f64, f64)> {
        let mut loss_sum = 0.0;
        let mut rows = 0usize;
        let mut acc_sum = 0.0;
        let mut batches = 0usize;
        for batch in validation.batches(self.config.validation_batch_size)? {
            let y_hat = self.network.predict(batch.features)?;
            let (loss, _) = criteria(y_hat.clone(), batch.targets, &self.config.loss)?;
            loss_sum += loss * batch.labels.len() as f64;
            rows += batch.labels.len();
            acc_sum += accuracy(&y_hat, &batch.labels)?;
            batches += 1;
        }
        Ok((loss_sum / rows as f64, acc_sum / batches as f64))
    }
}
