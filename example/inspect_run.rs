use std::path::PathBuf;

use critnet::persist::{read_artifact, ArtifactValue};
use critnet::prelude::*;

fn main() -> Result<()> {
    let path = std::env::args().nth(1).map(PathBuf::from).ok_or_else(|| {
        NNError::ArtifactError("usage: inspect_run <artifact-file>".to_string())
    })?;

    let artifact = read_artifact(&path)?;
    println!("{}", path.display());
    for (key, value) in &artifact.0 {
        match value {
            ArtifactValue::Index(v) => println!("  {:<18} index   {}", key, v),
            ArtifactValue::Scalar(v) => println!("  {:<18} scalar  {}", key, v),
            ArtifactValue::Series(v) => println!("  {:<18} series  len {}", key, v.len()),
            ArtifactValue::Matrix(m) => {
                println!("  {:<18} matrix  {} x {}", key, m.nrows(), m.ncols())
            }
        }
    }
    Ok(())
}
