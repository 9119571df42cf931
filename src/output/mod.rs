//! Output documents: the RSS 2.0 feed and its JSON projection.
//!
//! Writing these files is the one step whose failure is fatal to a run;
//! everything upstream degrades, but a run that cannot publish its
//! result has accomplished nothing.

pub mod json;
pub mod rss;

use std::path::PathBuf;

use crate::app::{ConfluenceError, Result};
use crate::config::OutputConfig;
use crate::domain::Article;

/// Render and write both documents. Returns the written paths.
pub fn write_documents(articles: &[Article], config: &OutputConfig) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(&config.dir).map_err(|e| ConfluenceError::OutputWrite {
        path: config.dir.clone(),
        source: e,
    })?;

    let rss_path = config.dir.join(&config.rss_filename);
    let rss_bytes = rss::render(articles, config)?;
    std::fs::write(&rss_path, rss_bytes).map_err(|e| ConfluenceError::OutputWrite {
        path: rss_path.clone(),
        source: e,
    })?;

    let json_path = config.dir.join(&config.json_filename);
    let json_bytes = json::render(articles)?;
    std::fs::write(&json_path, json_bytes).map_err(|e| ConfluenceError::OutputWrite {
        path: json_path.clone(),
        source: e,
    })?;

    Ok((rss_path, json_path))
}
