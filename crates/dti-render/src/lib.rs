pub mod config;
pub mod dot;
pub mod html;
pub mod raster;

pub use config::*;
pub use raster::*;

use dti_core::{Ruleset, TargetCatalog};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize ruleset: {0}")]
    Json(#[from] serde_json::Error),
}

/// What a render pass produced.
#[derive(Debug, Default)]
pub struct RenderReport {
    pub listings: Vec<PathBuf>,
    pub graphs: Vec<PathBuf>,
    pub index: PathBuf,
    pub json: Option<PathBuf>,
    pub images: Vec<PathBuf>,
    /// Per-table rasterizer failures; the rest of the output is still valid
    pub raster_failures: Vec<(String, RasterError)>,
}

/// Writes browsable artifacts for a parsed ruleset under `output_dir`.
pub struct Renderer {
    config: RenderConfig,
    catalog: TargetCatalog,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        let catalog = TargetCatalog::with_extra(config.extra_targets.iter().cloned());
        Self { config, catalog }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn catalog(&self) -> &TargetCatalog {
        &self.catalog
    }

    /// Produce every artifact. The output directory must already exist.
    pub fn render(&self, ruleset: &Ruleset) -> Result<RenderReport, RenderError> {
        let mut report = RenderReport {
            listings: self.write_listings(ruleset)?,
            graphs: self.write_graphs(ruleset)?,
            ..RenderReport::default()
        };

        if self.config.json {
            report.json = Some(self.write_json(ruleset)?);
        }

        let mut rendered = vec![];
        if self.config.render {
            for (table, result) in self.rasterize(ruleset) {
                match result {
                    Ok(image) => rendered.push((table, image)),
                    Err(e) => {
                        warn!(table = %table, "failed to render graph: {}", e);
                        report.raster_failures.push((table, e));
                    }
                }
            }
        }

        // Failed tables get no image link.
        let images: BTreeMap<&str, &Path> = rendered
            .iter()
            .map(|(table, image)| (table.as_str(), image.as_path()))
            .collect();
        report.index = self.write_index(ruleset, &images)?;
        report.images = rendered.into_iter().map(|(_, image)| image).collect();

        Ok(report)
    }

    /// One HTML page per chain, under a directory per table.
    pub fn write_listings(&self, ruleset: &Ruleset) -> Result<Vec<PathBuf>, RenderError> {
        let mut written = vec![];
        for (table_name, table) in ruleset.tables() {
            let dir = self.config.output_dir.join(file_stem(table_name));
            std::fs::create_dir_all(&dir).map_err(|source| RenderError::Io {
                path: dir.clone(),
                source,
            })?;

            for (chain_name, chain) in table.chains() {
                let path = dir.join(format!("{}.html", file_stem(chain_name)));
                let page = html::chain_page(table_name, chain_name, table, chain, &self.catalog);
                write_file(&path, &page)?;
                written.push(path);
            }
        }
        info!(pages = written.len(), "wrote rule listings");
        Ok(written)
    }

    /// One DOT file per table, directly under the output directory.
    pub fn write_graphs(&self, ruleset: &Ruleset) -> Result<Vec<PathBuf>, RenderError> {
        let mut written = vec![];
        for (table_name, table) in ruleset.tables() {
            let path = self.graph_path(table_name);
            let graph = dot::table_graph(table_name, table, &self.catalog, &self.config.rankdir);
            write_file(&path, &graph)?;
            written.push(path);
        }
        info!(graphs = written.len(), "wrote table graphs");
        Ok(written)
    }

    pub fn write_index(
        &self,
        ruleset: &Ruleset,
        images: &BTreeMap<&str, &Path>,
    ) -> Result<PathBuf, RenderError> {
        let path = self.config.output_dir.join("index.html");
        write_file(&path, &html::index_page(ruleset, &self.catalog, images))?;
        Ok(path)
    }

    pub fn write_json(&self, ruleset: &Ruleset) -> Result<PathBuf, RenderError> {
        let path = self.config.output_dir.join("ruleset.json");
        let json = serde_json::to_string_pretty(ruleset)?;
        write_file(&path, &json)?;
        Ok(path)
    }

    /// Run the rasterizer on each table's graph file, one result per table.
    /// Expects [`Renderer::write_graphs`] to have run first.
    pub fn rasterize(&self, ruleset: &Ruleset) -> Vec<(String, Result<PathBuf, RasterError>)> {
        let rasterizer = Rasterizer::new(self.config.rasterizer.clone());
        ruleset
            .table_names()
            .map(|table| {
                let result = rasterizer.rasterize(&self.graph_path(table));
                (table.to_string(), result)
            })
            .collect()
    }

    pub fn graph_path(&self, table_name: &str) -> PathBuf {
        self.config
            .output_dir
            .join(format!("{}.dot", file_stem(table_name)))
    }
}

/// File-system safe name for a table or chain.
pub fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();
    if stem.starts_with('.') {
        format!("_{}", stem)
    } else {
        stem
    }
}

fn write_file(path: &Path, content: &str) -> Result<(), RenderError> {
    debug!(path = ?path, bytes = content.len(), "writing");
    std::fs::write(path, content).map_err(|source| RenderError::Io {
        path: path.to_path_buf(),
        source,
    })
}
