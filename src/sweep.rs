use std::path::PathBuf;

use log::{error, info};

use crate::data::Dataset;
use crate::persist;
use crate::prelude::*;
use crate::probes::{group_by_marker, EpochMarker};
use crate::train::{RunIdentity, RunRecord, TrainConfig, Trainer};

/// One grid search: depths × weight variances, one trained network each.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SweepConfig {
    /// Base names per artifact kind, e.g. `accuracies.bin`; the run's depth
    /// is spliced in before the extension.
    pub accuracies_name: String,
    pub signals_name: String,
    pub params_name: String,
    pub model_name: String,
    pub out_dir: PathBuf,
    pub policy: WidthPolicy,
    pub input_dim: usize,
    pub output_dim: usize,
    /// Depths are the arithmetic sequence over `[depth_min, depth_max)`.
    pub depth_min: usize,
    pub depth_max: usize,
    pub depth_step: usize,
    pub weight_variances: Vec<f64>,
    pub bias_variance: f64,
    pub capture_signals: bool,
    pub write_params: bool,
    pub save_model: bool,
    /// Keep sweeping past a failed run instead of aborting the sweep.
    pub continue_on_error: bool,
}

/// The depths visited by a sweep: `depth_min`, `depth_min + depth_step`, ...
/// strictly below `depth_max`. Empty when `depth_min >= depth_max`.
pub fn depth_sequence(depth_min: usize, depth_max: usize, depth_step: usize) -> Vec<usize> {
    (depth_min..depth_max).step_by(depth_step.max(1)).collect()
}

/// Runs the whole grid strictly sequentially. Each run's network, optimizer
/// state and captured signals are owned by the run and dropped before the
/// next run starts, so peak memory stays at one run's worth.
pub fn run_sweep(
    config: &SweepConfig,
    train: &Dataset,
    validation: &Dataset,
    train_config: &TrainConfig,
) -> Result<Vec<RunRecord>> {
    if config.depth_step == 0 {
        return Err(NNError::InvalidTrainingConfiguration(
            "depth step must be greater than 0".to_string(),
        ));
    }
    let depths = depth_sequence(config.depth_min, config.depth_max, config.depth_step);
    info!(
        "sweep over {} depths x {} weight variances",
        depths.len(),
        config.weight_variances.len()
    );

    let mut records = Vec::new();
    for &weight_variance in &config.weight_variances {
        for &depth in &depths {
            match run_one(config, depth, weight_variance, train, validation, train_config) {
                Ok(record) => records.push(record),
                Err(err) if config.continue_on_error => {
                    error!(
                        "run depth={} weight_variance={} failed, continuing: {}",
                        depth, weight_variance, err
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }
    Ok(records)
}

fn run_one(
    config: &SweepConfig,
    depth: usize,
    weight_variance: f64,
    train: &Dataset,
    validation: &Dataset,
    train_config: &TrainConfig,
) -> Result<RunRecord> {
    let identity = RunIdentity {
        depth,
        weight_variance,
        bias_variance: config.bias_variance,
    };
    info!(
        "run start: depth={} weight_variance={} bias_variance={}",
        depth, weight_variance, config.bias_variance
    );

    let network = Sequential::gaussian(
        config.policy,
        depth,
        config.input_dim,
        config.output_dim,
        weight_variance,
        config.bias_variance,
    )?;
    let mut trainer = Trainer::new(network, identity, train_config.clone())?;
    let outcome = trainer.fit(train, validation, config.capture_signals, config.write_params)?;

    persist::write_accuracies(
        &config.out_dir,
        &config.accuracies_name,
        identity,
        &outcome.record.validation_accuracy,
    )?;

    if config.capture_signals {
        let grouped = group_by_marker(&outcome.signals);
        for (marker, captured) in &grouped {
            persist::write_signals(&config.out_dir, &config.signals_name, identity, *marker, captured)?;
        }
        // a one-epoch run fires its probes once; the capture stands for
        // both ends of training and is written under both tags
        if train_config.epochs == 1 {
            if let Some(captured) = grouped.get(&EpochMarker::First) {
                persist::write_signals(
                    &config.out_dir,
                    &config.signals_name,
                    identity,
                    EpochMarker::Last,
                    captured,
                )?;
            }
        }
    }

    if config.write_params {
        if let Some(initial) = &outcome.initial_parameters {
            persist::write_parameters(
                &config.out_dir,
                &config.params_name,
                identity,
                Some(EpochMarker::First),
                initial,
            )?;
        }
        persist::write_parameters(
            &config.out_dir,
            &config.params_name,
            identity,
            Some(EpochMarker::Last),
            &trainer.network().layers,
        )?;
    }

    if config.save_model {
        persist::save_model(&config.out_dir, &config.model_name, depth, trainer.network())?;
    }

    info!("run done: depth={} weight_variance={}", depth, weight_variance);
    Ok(outcome.record)
}
