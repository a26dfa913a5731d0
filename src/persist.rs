use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::models::Sequential;
use crate::prelude::*;
use crate::probes::EpochMarker;
use crate::train::{RunIdentity, RunRecord};

const DEPTH_KEY: &str = "depth";
const WEIGHT_VARIANCE_KEY: &str = "weight_variance";
const BIAS_VARIANCE_KEY: &str = "bias_variance";
const ACCURACIES_KEY: &str = "accuracies";
const SIGNAL_KEY_PREFIX: &str = "in-";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ArtifactValue {
    Index(u64),
    Scalar(f64),
    Series(Vec<f64>),
    Matrix(Array2<f64>),
}

/// A self-describing keyed-array container, the unit of persistence.
/// Encoded with bincode; re-writing the same path overwrites.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Artifact(pub BTreeMap<String, ArtifactValue>);

impl Artifact {
    fn with_identity(identity: RunIdentity) -> Self {
        let mut artifact = Artifact::default();
        artifact.insert(DEPTH_KEY, ArtifactValue::Index(identity.depth as u64));
        artifact.insert(
            WEIGHT_VARIANCE_KEY,
            ArtifactValue::Scalar(identity.weight_variance),
        );
        artifact.insert(
            BIAS_VARIANCE_KEY,
            ArtifactValue::Scalar(identity.bias_variance),
        );
        artifact
    }

    pub fn insert(&mut self, key: &str, value: ArtifactValue) {
        self.0.insert(key.to_string(), value);
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn index(&self, key: &str) -> Result<usize> {
        match self.0.get(key) {
            Some(ArtifactValue::Index(v)) => Ok(*v as usize),
            Some(_) => Err(NNError::ArtifactError(format!("key '{}' is not an index", key))),
            None => Err(NNError::ArtifactError(format!("missing key '{}'", key))),
        }
    }

    pub fn scalar(&self, key: &str) -> Result<f64> {
        match self.0.get(key) {
            Some(ArtifactValue::Scalar(v)) => Ok(*v),
            Some(_) => Err(NNError::ArtifactError(format!("key '{}' is not a scalar", key))),
            None => Err(NNError::ArtifactError(format!("missing key '{}'", key))),
        }
    }

    pub fn series(&self, key: &str) -> Result<&[f64]> {
        match self.0.get(key) {
            Some(ArtifactValue::Series(v)) => Ok(v),
            Some(_) => Err(NNError::ArtifactError(format!("key '{}' is not a series", key))),
            None => Err(NNError::ArtifactError(format!("missing key '{}'", key))),
        }
    }

    pub fn matrix(&self, key: &str) -> Result<&Array2<f64>> {
        match self.0.get(key) {
            Some(ArtifactValue::Matrix(v)) => Ok(v),
            Some(_) => Err(NNError::ArtifactError(format!("key '{}' is not a matrix", key))),
            None => Err(NNError::ArtifactError(format!("missing key '{}'", key))),
        }
    }

    fn identity(&self) -> Result<RunIdentity> {
        Ok(RunIdentity {
            depth: self.index(DEPTH_KEY)?,
            weight_variance: self.scalar(WEIGHT_VARIANCE_KEY)?,
            bias_variance: self.scalar(BIAS_VARIANCE_KEY)?,
        })
    }
}

/// `{stem}-{depth}.{ext}`, with an `e{marker}-` prefix for artifacts that
/// exist in a pre- and a post-training variant. Distinct runs must vary
/// `base_name` or depth; identical names overwrite.
pub fn artifact_path(
    dir: &Path,
    base_name: &str,
    depth: usize,
    marker: Option<EpochMarker>,
) -> PathBuf {
    let base = Path::new(base_name);
    let stem = base
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(base_name);
    let name = match (marker, base.extension().and_then(|e| e.to_str())) {
        (Some(marker), Some(ext)) => format!("e{}-{}-{}.{}", marker.tag(), stem, depth, ext),
        (Some(marker), None) => format!("e{}-{}-{}", marker.tag(), stem, depth),
        (None, Some(ext)) => format!("{}-{}.{}", stem, depth, ext),
        (None, None) => format!("{}-{}", stem, depth),
    };
    dir.join(name)
}

fn write_artifact(path: &Path, artifact: &Artifact) -> Result<()> {
    let encoded: Vec<u8> = bincode::serialize(artifact).map_err(NNError::SerializationError)?;
    File::create(path)
        .map_err(NNError::IoError)?
        .write_all(&encoded)
        .map_err(NNError::IoError)?;
    Ok(())
}

pub fn read_artifact(path: &Path) -> Result<Artifact> {
    let mut buffer = Vec::new();
    File::open(path)
        .map_err(NNError::IoError)?
        .read_to_end(&mut buffer)
        .map_err(NNError::IoError)?;
    bincode::deserialize(&buffer).map_err(NNError::SerializationError)
}

#[derive(Debug, Clone)]
pub struct AccuraciesArtifact {
    pub identity: RunIdentity,
    pub accuracies: Vec<f64>,
}

pub fn write_accuracies(
    dir: &Path,
    base_name: &str,
    identity: RunIdentity,
    accuracies: &[f64],
) -> Result<PathBuf> {
    let mut artifact = Artifact::with_identity(identity);
    artifact.insert(ACCURACIES_KEY, ArtifactValue::Series(accuracies.to_vec()));
    let path = artifact_path(dir, base_name, identity.depth, None);
    write_artifact(&path, &artifact)?;
    Ok(path)
}

pub fn read_accuracies(path: &Path) -> Result<AccuraciesArtifact> {
    let artifact = read_artifact(path)?;
    Ok(AccuraciesArtifact {
        identity: artifact.identity()?,
        accuracies: artifact.series(ACCURACIES_KEY)?.to_vec(),
    })
}

#[derive(Debug, Clone)]
pub struct SignalsArtifact {
    pub identity: RunIdentity,
    /// Pre-activation tensor per captured layer index.
    pub signals: BTreeMap<usize, Array2<f64>>,
}

pub fn write_signals(
    dir: &Path,
    base_name: &str,
    identity: RunIdentity,
    marker: EpochMarker,
    captured: &BTreeMap<usize, Array2<f64>>,
) -> Result<PathBuf> {
    let mut artifact = Artifact::with_identity(identity);
    for (layer_index, tensor) in captured {
        artifact.insert(
            &format!("{}{}", SIGNAL_KEY_PREFIX, layer_index),
            ArtifactValue::Matrix(tensor.clone()),
        );
    }
    let path = artifact_path(dir, base_name, identity.depth, Some(marker));
    write_artifact(&path, &artifact)?;
    Ok(path)
}

pub fn read_signals(path: &Path) -> Result<SignalsArtifact> {
    let artifact = read_artifact(path)?;
    let mut signals = BTreeMap::new();
    for key in artifact.0.keys() {
        if let Some(index) = key.strip_prefix(SIGNAL_KEY_PREFIX) {
            let layer_index: usize = index.parse().map_err(|_| {
                NNError::ArtifactError(format!("malformed signal key '{}'", key))
            })?;
            signals.insert(layer_index, artifact.matrix(key)?.clone());
        }
    }
    Ok(SignalsArtifact {
        identity: artifact.identity()?,
        signals,
    })
}

#[derive(Debug, Clone)]
pub struct ParametersArtifact {
    pub identity: RunIdentity,
    pub weights: BTreeMap<usize, Array2<f64>>,
    pub biases: BTreeMap<usize, Vec<f64>>,
}

/// Writes `W{n}`/`B{n}` per layer. Layer numbers come straight from the
/// structured layer sequence, so no positional decoding is ever needed.
pub fn write_parameters(
    dir: &Path,
    base_name: &str,
    identity: RunIdentity,
    marker: Option<EpochMarker>,
    layers: &[Dense],
) -> Result<PathBuf> {
    let mut artifact = Artifact::with_identity(identity);
    for (layer_number, layer) in layers.iter().enumerate() {
        artifact.insert(
            &format!("W{}", layer_number),
            ArtifactValue::Matrix(layer.w.clone()),
        );
        artifact.insert(
            &format!("B{}", layer_number),
            ArtifactValue::Series(layer.b.iter().copied().collect()),
        );
    }
    let path = artifact_path(dir, base_name, identity.depth, marker);
    write_artifact(&path, &artifact)?;
    Ok(path)
}

pub fn read_parameters(path: &Path) -> Result<ParametersArtifact> {
    let artifact = read_artifact(path)?;
    let mut weights = BTreeMap::new();
    let mut biases = BTreeMap::new();
    for key in artifact.0.keys() {
        if let Some(number) = key.strip_prefix('W') {
            if let Ok(layer_number) = number.parse::<usize>() {
                weights.insert(layer_number, artifact.matrix(key)?.clone());
            }
        } else if let Some(number) = key.strip_prefix('B') {
            if let Ok(layer_number) = number.parse::<usize>() {
                biases.insert(layer_number, artifact.series(key)?.to_vec());
            }
        }
    }
    Ok(ParametersArtifact {
        identity: artifact.identity()?,
        weights,
        biases,
    })
}

/// Full checkpoint of the trained network, reusable outside the pipeline.
pub fn save_model(dir: &Path, base_name: &str, depth: usize, network: &Sequential) -> Result<PathBuf> {
    let path = artifact_path(dir, base_name, depth, None);
    network.save(&path)?;
    Ok(path)
}

pub fn load_model(path: &Path) -> Result<Sequential> {
    Sequential::load(path)
}

/// Plain-text view of a run's metrics, one row per epoch.
pub fn write_history_csv(path: &Path, record: &RunRecord) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["epoch", "val_loss", "val_accuracy"])?;
    for (epoch, (loss, acc)) in record
        .validation_loss
        .iter()
        .zip(record.validation_accuracy.iter())
        .enumerate()
    {
        writer.write_record([
            epoch.to_string(),
            loss.to_string(),
            acc.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schedule::WidthPolicy;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("critnet-{}-{}", tag, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn identity() -> RunIdentity {
        RunIdentity {
            depth: 20,
            weight_variance: 2.0,
            bias_variance: 0.05,
        }
    }

    #[test]
    fn artifact_paths_follow_the_naming_scheme() {
        let dir = Path::new("/tmp/out");
        assert_eq!(
            artifact_path(dir, "accuracies.bin", 20, None),
            dir.join("accuracies-20.bin")
        );
        assert_eq!(
            artifact_path(dir, "signals.bin", 7, Some(EpochMarker::First)),
            dir.join("efirst-signals-7.bin")
        );
        assert_eq!(
            artifact_path(dir, "params.bin", 7, Some(EpochMarker::Last)),
            dir.join("elast-params-7.bin")
        );
        assert_eq!(artifact_path(dir, "plain", 3, None), dir.join("plain-3"));
    }

    #[test]
    fn accuracies_round_trip() {
        let dir = scratch_dir("accs");
        let path = write_accuracies(&dir, "accuracies.bin", identity(), &[0.9, 0.91]).unwrap();
        assert_eq!(path, dir.join("accuracies-20.bin"));
        let artifact = read_accuracies(&path).unwrap();
        assert_eq!(artifact.identity.depth, 20);
        assert_eq!(artifact.identity.weight_variance, 2.0);
        assert_eq!(artifact.identity.bias_variance, 0.05);
        assert_eq!(artifact.accuracies, vec![0.9, 0.91]);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn signals_round_trip_keyed_by_layer() {
        let dir = scratch_dir("signals");
        let mut captured = BTreeMap::new();
        captured.insert(0usize, Array2::from_elem((4, 6), 0.5));
        captured.insert(3usize, Array2::from_elem((4, 2), -1.0));
        let path =
            write_signals(&dir, "signals.bin", identity(), EpochMarker::Last, &captured).unwrap();
        assert_eq!(path, dir.join("elast-signals-20.bin"));
        let artifact = read_signals(&path).unwrap();
        assert_eq!(artifact.identity.depth, 20);
        assert_eq!(artifact.signals.len(), 2);
        assert_eq!(artifact.signals[&0], captured[&0]);
        assert_eq!(artifact.signals[&3], captured[&3]);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn parameter_artifact_exposes_one_key_pair_per_layer() {
        let dir = scratch_dir("params");
        let net = Sequential::gaussian(WidthPolicy::LinearShrink, 2, 8, 2, 1.0, 0.05).unwrap();
        let ident = RunIdentity {
            depth: 2,
            weight_variance: 1.0,
            bias_variance: 0.05,
        };
        let path = write_parameters(&dir, "params.bin", ident, None, &net.layers).unwrap();
        let artifact = read_artifact(&path).unwrap();
        let mut keys: Vec<&str> = artifact.keys().collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec!["B0", "B1", "W0", "W1", "bias_variance", "depth", "weight_variance"]
        );

        let params = read_parameters(&path).unwrap();
        assert_eq!(params.weights[&0], net.layers[0].w);
        assert_eq!(params.biases[&1].len(), net.layers[1].b.len());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn rewriting_overwrites_instead_of_appending() {
        let dir = scratch_dir("overwrite");
        write_accuracies(&dir, "accuracies.bin", identity(), &[0.1]).unwrap();
        let path = write_accuracies(&dir, "accuracies.bin", identity(), &[0.9, 0.91]).unwrap();
        let artifact = read_accuracies(&path).unwrap();
        assert_eq!(artifact.accuracies, vec![0.9, 0.91]);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_key_reads_fail_loudly() {
        let dir = scratch_dir("missing");
        let path = write_accuracies(&dir, "accuracies.bin", identity(), &[0.5]).unwrap();
        let artifact = read_artifact(&path).unwrap();
        assert!(matches!(
            artifact.matrix("in-0"),
            Err(NNError::ArtifactError(_))
        ));
        assert!(matches!(
            artifact.scalar(ACCURACIES_KEY),
            Err(NNError::ArtifactError(_))
        ));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn history_csv_has_one_row_per_epoch() {
        let dir = scratch_dir("csv");
        let record = RunRecord {
            depth: 4,
            weight_variance: 1.0,
            bias_variance: 0.05,
            validation_loss: vec![0.7, 0.5, 0.4],
            validation_accuracy: vec![0.5, 0.7, 0.8],
        };
        let path = dir.join("history.csv");
        write_history_csv(&path, &record).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.trim().lines().collect();
        assert_eq!(lines.len(), 4); // header + 3 epochs
        assert_eq!(lines[0], "epoch,val_loss,val_accuracy");
        assert_eq!(lines[1], "0,0.7,0.5");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn reading_a_missing_artifact_is_an_io_error() {
        let path = Path::new("/nonexistent/critnet/artifact.bin");
        assert!(matches!(read_artifact(path), Err(NNError::IoError(_))));
    }
}
