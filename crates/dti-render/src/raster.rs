use crate::config::RasterizerConfig;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::debug;

/// Why a table graph could not be turned into an image.
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("rasterizer '{command}' not found; install graphviz or set rasterizer.command")]
    NotFound { command: String },

    #[error("failed to run rasterizer '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("rasterizer exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
}

/// Runs a Graphviz-compatible layout tool as `<command> -T <fmt> -o <out> <in>`.
pub struct Rasterizer {
    config: RasterizerConfig,
}

impl Rasterizer {
    pub fn new(config: RasterizerConfig) -> Self {
        Self { config }
    }

    /// Image path for a graph file: same stem, format extension.
    pub fn output_path(&self, dot_path: &Path) -> PathBuf {
        dot_path.with_extension(self.config.format.extension())
    }

    pub fn rasterize(&self, dot_path: &Path) -> Result<PathBuf, RasterError> {
        let out_path = self.output_path(dot_path);
        let command = &self.config.command;
        debug!(command = %command, input = ?dot_path, output = ?out_path, "rasterizing graph");

        let output = Command::new(command)
            .arg("-T")
            .arg(self.config.format.extension())
            .arg("-o")
            .arg(&out_path)
            .arg(dot_path)
            .output()
            .map_err(|source| match source.kind() {
                ErrorKind::NotFound => RasterError::NotFound {
                    command: command.clone(),
                },
                _ => RasterError::Spawn {
                    command: command.clone(),
                    source,
                },
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RasterError::Failed {
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(out_path)
    }
}
