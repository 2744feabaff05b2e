//! Model directory lookup and session loading shared by both backends.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use ort::session::{Session, builder::GraphOptimizationLevel};
use tokenizers::Tokenizer;

use crate::OrtError;

/// Returns the first of `names` that exists in `dir` or its `onnx/` subdirectory.
pub(crate) fn locate(dir: &Path, names: &[&str]) -> Option<PathBuf> {
    [dir.to_path_buf(), dir.join("onnx")]
        .iter()
        .flat_map(|base| names.iter().map(move |name| base.join(name)))
        .find(|candidate| candidate.is_file())
}

/// Finds `tokenizer.json` next to the model files.
pub(crate) fn locate_tokenizer(dir: &Path) -> Result<PathBuf, OrtError> {
    locate(dir, &["tokenizer.json"]).ok_or_else(|| OrtError::TokenizerNotFound(dir.to_path_buf()))
}

pub(crate) fn load_tokenizer(path: &Path) -> Result<Tokenizer, OrtError> {
    Tokenizer::from_file(path).map_err(|e| OrtError::tokenizer(path, e))
}

pub(crate) fn load_session(path: &Path) -> Result<Session, OrtError> {
    if !path.is_file() {
        return Err(OrtError::ModelNotFound(path.to_path_buf()));
    }
    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(num_cpus())?
        .commit_from_file(path)?;
    tracing::debug!(path = %path.display(), "loaded onnx session");
    Ok(session)
}

pub(crate) fn lock(session: &Mutex<Session>) -> Result<MutexGuard<'_, Session>, OrtError> {
    session.lock().map_err(|_| OrtError::Poisoned)
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZero::get)
        .unwrap_or(4)
}
