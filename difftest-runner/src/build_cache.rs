// Copyright (c) The difftest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Content-addressed cache of compiled artifacts.
//!
//! Each source file is compiled at most once per content: artifacts are named
//! by the source's file stem plus a hash of its bytes, so editing a source
//! produces a fresh artifact while re-running against an unchanged source
//! reuses the old one, even across difftest invocations.

use crate::errors::BuildCacheError;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tracing::debug;
use xxhash_rust::xxh3::xxh3_64;

/// A directory of compiled artifacts, keyed by source content.
#[derive(Clone, Debug)]
pub struct BuildCache {
    build_dir: Utf8PathBuf,
}

impl BuildCache {
    /// Creates a cache rooted at `build_dir`, creating the directory if
    /// needed.
    pub fn new(build_dir: &Utf8Path) -> Result<Self, BuildCacheError> {
        fs::create_dir_all(build_dir).map_err(|error| BuildCacheError::CreateDir {
            dir: build_dir.to_owned(),
            error,
        })?;
        Ok(Self {
            build_dir: build_dir.to_owned(),
        })
    }

    /// Returns the directory artifacts are stored in.
    pub fn build_dir(&self) -> &Utf8Path {
        &self.build_dir
    }

    /// Returns the compiled artifact for `source`, compiling it with
    /// `command` if it isn't cached yet.
    ///
    /// `command` is invoked as `<command..> <source> -o <artifact>`. The
    /// compiler writes to a temporary path which is renamed into place on
    /// success, so a cached artifact is never partially written.
    pub async fn artifact_for(
        &self,
        source: &Utf8Path,
        command: &[String],
    ) -> Result<Utf8PathBuf, BuildCacheError> {
        let bytes = fs::read(source).map_err(|error| BuildCacheError::ReadSource {
            path: source.to_owned(),
            error,
        })?;

        let stem = source.file_stem().unwrap_or("program");
        let artifact = self
            .build_dir
            .join(format!("{stem}_{}", content_key(&bytes)));

        if artifact.exists() {
            debug!("cache hit for `{source}`, reusing `{artifact}`");
            return Ok(artifact);
        }

        // The scratch name includes the pid so concurrent difftest processes
        // sharing a build dir don't clobber each other's output.
        let scratch = Utf8PathBuf::from(format!("{artifact}.{}.tmp", std::process::id()));

        debug!("compiling `{source}` to `{artifact}`");
        let output = tokio::process::Command::new(&command[0])
            .args(&command[1..])
            .arg(source)
            .arg("-o")
            .arg(&scratch)
            .output()
            .await
            .map_err(|error| BuildCacheError::CompilerExec {
                program: command[0].clone(),
                error,
            })?;

        if !output.status.success() {
            // The compiler may have left a partial file behind.
            let _ = fs::remove_file(&scratch);
            return Err(BuildCacheError::CompileFailed {
                path: source.to_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        fs::rename(&scratch, &artifact).map_err(|error| BuildCacheError::StoreArtifact {
            path: artifact.clone(),
            error,
        })?;

        Ok(artifact)
    }
}

/// Hashes source bytes into the 16-hex-digit key artifacts are named by.
fn content_key(bytes: &[u8]) -> String {
    format!("{:016x}", xxh3_64(bytes))
}
