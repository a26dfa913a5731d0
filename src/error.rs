use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum NNError {
    // Construction errors
    InvalidLayerConfiguration(String),
    InvalidVariance(String),
    DepthConstraint(String),
    LayerShapeMismatch(String),
    EmptyModel,

    // Training errors
    InvalidTrainingConfiguration(String),
    BatchContract(String),

    // Artifact errors
    ArtifactError(String),

    IoError(std::io::Error),
    SerializationError(Box<bincode::ErrorKind>),
    CsvError(csv::Error),
}

impl fmt::Display for NNError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NNError::InvalidLayerConfiguration(msg) => write!(f, "Invalid layer configuration: {}", msg),
            NNError::InvalidVariance(msg) => write!(f, "Invalid variance: {}", msg),
            NNError::DepthConstraint(msg) => write!(f, "Depth constraint violated: {}", msg),
            NNError::LayerShapeMismatch(msg) => write!(f, "Layer shape mismatch: {}", msg),
            NNError::EmptyModel => write!(f, "Model has no layers"),
            NNError::InvalidTrainingConfiguration(msg) => write!(f, "Invalid training configuration: {}", msg),
            NNError::BatchContract(msg) => write!(f, "Batch contract violated: {}", msg),
            NNError::ArtifactError(msg) => write!(f, "Artifact error: {}", msg),
            NNError::IoError(err) => write!(f, "I/O error: {}", err),
            NNError::SerializationError(err) => write!(f, "Serialization error: {}", err),
            NNError::CsvError(err) => write!(f, "CSV error: {}", err),
        }
    }
}

impl From<std::io::Error> for NNError {
    fn from(err: std::io::Error) -> NNError {
        NNError::IoError(err)
    }
}

impl From<Box<bincode::ErrorKind>> for NNError {
    fn from(err: Box<bincode::ErrorKind>) -> NNError {
        NNError::SerializationError(err)
    }
}

impl From<csv::Error> for NNError {
    fn from(err: csv::Error) -> NNError {
        NNError::CsvError(err)
    }
}

impl Error for NNError {}

pub type Result<T> = std::result::Result<T, NNError>;
