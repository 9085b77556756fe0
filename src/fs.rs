// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

use crate::error::{Error, Result};
use crate::pki::GeneratedArtifact;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Resolve an artifact's relative path under `dir`.
///
/// Absolute paths and any `..` component are rejected.
pub fn artifact_path(dir: &Path, relative: &str) -> Result<PathBuf> {
    let rel = Path::new(relative);
    let escapes = relative.is_empty()
        || rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(Error::InvalidArtifactPath(relative.to_string()));
    }
    Ok(dir.join(rel))
}

/// Write every artifact under `dir`, creating subdirectories as needed.
///
/// All paths are checked before anything is written, so a rejected path or an
/// existing file (without `force`) leaves the directory untouched. Secret
/// material is written owner-only.
pub fn write_bundle(dir: &Path, artifacts: &[GeneratedArtifact], force: bool) -> Result<Vec<PathBuf>> {
    let targets = artifacts
        .iter()
        .map(|a| artifact_path(dir, &a.path))
        .collect::<Result<Vec<_>>>()?;

    if !force {
        if let Some(existing) = targets.iter().find(|p| p.exists()) {
            return Err(Error::OutputExists(existing.clone()));
        }
    }

    for (artifact, target) in artifacts.iter().zip(&targets) {
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::CreateDir {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        if artifact.kind.is_secret() {
            atomic_write_secret(target, artifact.content.as_bytes())?;
        } else {
            atomic_write(target, artifact.content.as_bytes())?;
        }
        debug!(path = %target.display(), secret = artifact.kind.is_secret(), "wrote artifact");
    }

    Ok(targets)
}

fn temp_path_for(path: &Path) -> Result<PathBuf> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::InvalidArtifactPath(path.display().to_string()))?;
    let random_suffix: u64 = rand::Rng::random(&mut rand::rng());
    Ok(parent.join(format!(".tmp-{:x}", random_suffix)))
}

fn rename_into_place(temp_path: &Path, path: &Path) -> Result<()> {
    std::fs::rename(temp_path, path).map_err(|e| {
        if temp_path.exists() {
            let _ = std::fs::remove_file(temp_path);
        }
        Error::WriteFile {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

/// Write via a temporary file in the same directory and rename over `path`.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    use std::io::Write;

    let temp_path = temp_path_for(path)?;

    let mut file = std::fs::File::create(&temp_path).map_err(|e| Error::WriteFile {
        path: temp_path.clone(),
        source: e,
    })?;

    file.write_all(contents)
        .and_then(|_| file.sync_all())
        .map_err(|e| Error::WriteFile {
            path: temp_path.clone(),
            source: e,
        })?;

    drop(file);

    rename_into_place(&temp_path, path)
}

/// Like [`atomic_write`], with the temporary file created owner-only.
pub fn atomic_write_secret(path: &Path, contents: &[u8]) -> Result<()> {
    let temp_path = temp_path_for(path)?;
    write_secret_file(&temp_path, contents)?;
    rename_into_place(&temp_path, path)
}

#[cfg(unix)]
pub fn write_secret_file(path: &Path, contents: &[u8]) -> Result<()> {
    use std::fs::OpenOptions;
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .map_err(|e| Error::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })?;

    file.write_all(contents)
        .and_then(|_| file.sync_all())
        .map_err(|e| Error::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(())
}

#[cfg(not(unix))]
pub fn write_secret_file(path: &Path, contents: &[u8]) -> Result<()> {
    std::fs::write(path, contents).map_err(|e| Error::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })
}
