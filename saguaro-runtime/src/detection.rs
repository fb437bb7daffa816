//! Local model file detection

use crate::error::RuntimeError;
use std::path::{Path, PathBuf};
use tracing::info;

/// Auto-detects the best model file in a local folder.
///
/// An explicit `filename` always wins. Otherwise the folder is scanned for
/// `.gguf` files, preferring BF16 variants, with sorted filenames for
/// consistent ordering.
pub fn detect_model_file(
    folder: &Path,
    filename: Option<&str>,
) -> Result<PathBuf, RuntimeError> {
    if let Some(name) = filename {
        let path = folder.join(name);
        if !path.exists() {
            return Err(RuntimeError::NotFound(format!(
                "Model file does not exist: {}",
                path.display()
            )));
        }
        return Ok(path);
    }

    let entries = std::fs::read_dir(folder).map_err(|e| {
        RuntimeError::LoadingFailed(format!(
            "Failed to read model folder {}: {}",
            folder.display(),
            e
        ))
    })?;

    let mut gguf_files = Vec::new();
    let mut bf16_files = Vec::new();

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        if name.ends_with(".gguf") {
            if name.to_lowercase().contains("bf16") {
                bf16_files.push(path);
            } else {
                gguf_files.push(path);
            }
        }
    }

    // Prioritize BF16 files
    if !bf16_files.is_empty() {
        bf16_files.sort();
        info!("Found BF16 model file: {}", bf16_files[0].display());
        return Ok(bf16_files.remove(0));
    }

    if !gguf_files.is_empty() {
        gguf_files.sort();
        info!("Found GGUF model file: {}", gguf_files[0].display());
        return Ok(gguf_files.remove(0));
    }

    Err(RuntimeError::NotFound(format!(
        "No .gguf model files found in {}",
        folder.display()
    )))
}
