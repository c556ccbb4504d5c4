//! Startup diagnostics logged before the model is opened.
//!
//! Every probe is best-effort: a failed lookup becomes `None` in the report
//! and is rendered as "unknown" or "missing". Collecting and logging a report
//! never fails.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::model::ModelBackend;

const MIB: f64 = 1024.0 * 1024.0;

/// Environment and artifact facts useful when a deployment cannot find or load its model.
#[derive(Debug, Clone)]
pub struct StartupReport {
    pub executable: Option<PathBuf>,
    pub version: &'static str,
    pub os: &'static str,
    pub arch: &'static str,
    pub backend: &'static str,
    /// Inference runtime and version, when the backend reports one.
    pub runtime: Option<String>,
    /// Absolute form of the artifact path (or the path as given when it cannot be resolved).
    pub artifact: PathBuf,
    /// Artifact size in bytes; `None` when the artifact is missing or not a file.
    pub artifact_bytes: Option<u64>,
}

impl StartupReport {
    /// Report for backend `B`, including its runtime version.
    pub fn for_backend<B: ModelBackend>(artifact: &Path) -> Self {
        Self::collect(artifact, B::NAME, B::runtime())
    }

    pub fn collect(artifact: &Path, backend: &'static str, runtime: Option<String>) -> Self {
        let artifact_bytes = std::fs::metadata(artifact)
            .ok()
            .filter(|m| m.is_file())
            .map(|m| m.len());

        Self {
            executable: std::env::current_exe().ok(),
            version: env!("CARGO_PKG_VERSION"),
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            backend,
            runtime,
            artifact: resolve(artifact),
            artifact_bytes,
        }
    }

    /// Artifact size in MiB.
    pub fn artifact_mib(&self) -> Option<f64> {
        self.artifact_bytes.map(|b| b as f64 / MIB)
    }

    pub fn log(&self) {
        let executable = self
            .executable
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        info!("=== startup diagnostics ===");
        info!(executable = %executable, "executable");
        info!(version = self.version, os = self.os, arch = self.arch, "renewa");
        info!(
            backend = self.backend,
            runtime = self.runtime.as_deref().unwrap_or("unknown"),
            "inference backend"
        );
        info!(path = %self.artifact.display(), "expecting model artifact");
        match self.artifact_mib() {
            Some(mib) => info!(size_mib = %format!("{mib:.2}"), "model artifact found"),
            None => warn!("model artifact is missing"),
        }
        info!("===========================");
    }
}

/// Absolute path without requiring the file to exist.
fn resolve(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
