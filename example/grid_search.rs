use std::path::PathBuf;

use log::info;

use critnet::data::Dataset;
use critnet::persist;
use critnet::prelude::*;
use critnet::sweep::{run_sweep, SweepConfig};
use critnet::train::TrainConfig;

const INPUT_DIM: usize = 36;
const CLASSES: usize = 4;

/// Synthetic stand-in for the image classification task: Gaussian noise with
/// a class-dependent mean shift on every fourth feature.
fn blobs(samples: usize) -> Result<Dataset> {
    let noise = Normal::new(0.0, 1.0).map_err(|e| NNError::InvalidVariance(e.to_string()))?;
    let mut features = Array2::random((samples, INPUT_DIM), noise);
    let labels = Array1::from((0..samples).map(|i| i % CLASSES).collect::<Vec<_>>());
    for (mut row, &label) in features.rows_mut().into_iter().zip(labels.iter()) {
        for j in 0..INPUT_DIM {
            if j % CLASSES == label {
                row[j] += 1.5;
            }
        }
    }
    Dataset::new(features, labels, CLASSES)
}

fn main() -> Result<()> {
    env_logger::init();

    let train = blobs(512)?;
    let validation = blobs(128)?;

    let out_dir = PathBuf::from("runs");
    std::fs::create_dir_all(&out_dir)?;

    let sweep = SweepConfig {
        accuracies_name: "accuracies.bin".to_string(),
        signals_name: "signals.bin".to_string(),
        params_name: "params.bin".to_string(),
        model_name: "model.bin".to_string(),
        out_dir: out_dir.clone(),
        policy: WidthPolicy::LinearShrink,
        input_dim: INPUT_DIM,
        output_dim: CLASSES,
        depth_min: 4,
        depth_max: 13,
        depth_step: 4,
        weight_variances: vec![0.5, 1.0, 2.0],
        bias_variance: 0.05,
        capture_signals: true,
        write_params: true,
        save_model: false,
        continue_on_error: false,
    };
    let config = TrainConfig::new(10, 32, 64, 0.05, 0.9);

    let records = run_sweep(&sweep, &train, &validation, &config)?;
    info!("sweep finished: {} runs", records.len());

    for record in &records {
        let path = out_dir.join(format!(
            "history-d{}-wv{}.csv",
            record.depth, record.weight_variance
        ));
        persist::write_history_csv(&path, record)?;
        println!(
            "depth={:2} wv={:.2}: final val_acc={:.4}",
            record.depth,
            record.weight_variance,
            record
                .validation_accuracy
                .last()
                .copied()
                .unwrap_or(f64::NAN)
        );
    }
    Ok(())
}
