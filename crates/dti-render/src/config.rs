use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read render config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse render config YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Everything the renderer needs, passed in at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub output_dir: PathBuf,
    /// Run the rasterizer over each table graph
    pub render: bool,
    /// Also write `ruleset.json`
    pub json: bool,
    pub rasterizer: RasterizerConfig,
    /// Graphviz `rankdir` for table graphs
    pub rankdir: String,
    /// Target modules not shipped with iptables that should still be
    /// shown as terminal actions
    pub extra_targets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterizerConfig {
    pub command: String,
    pub format: ImageFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Svg,
    Png,
    Pdf,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
            Self::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./out"),
            render: false,
            json: false,
            rasterizer: RasterizerConfig::default(),
            rankdir: "LR".to_string(),
            extra_targets: vec![],
        }
    }
}

impl Default for RasterizerConfig {
    fn default() -> Self {
        Self {
            command: "dot".to_string(),
            format: ImageFormat::Svg,
        }
    }
}

impl RenderConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_do_not_rasterize() {
        let config = RenderConfig::default();
        assert!(!config.render);
        assert_eq!(config.output_dir, PathBuf::from("./out"));
        assert_eq!(config.rasterizer.command, "dot");
        assert_eq!(config.rasterizer.format, ImageFormat::Svg);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = RenderConfig::from_yaml(
            "render: true\nrasterizer:\n  format: png\nextra_targets: [GEOIP_DROP]\n",
        )
        .unwrap();
        assert!(config.render);
        assert_eq!(config.rasterizer.format, ImageFormat::Png);
        assert_eq!(config.rasterizer.command, "dot");
        assert_eq!(config.rankdir, "LR");
        assert_eq!(config.extra_targets, ["GEOIP_DROP"]);
    }

    #[test]
    fn example_config_matches_defaults() {
        let example = include_str!("../../../dotiptables.example.yaml");
        assert_eq!(RenderConfig::from_yaml(example).unwrap(), RenderConfig::default());
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert!(RenderConfig::from_yaml("rasterizer:\n  format: gif\n").is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = RenderConfig::from_file(Path::new("/nonexistent/dotiptables.yaml")).unwrap_err();
        assert!(err.to_string().contains("dotiptables.yaml"));
    }
}
