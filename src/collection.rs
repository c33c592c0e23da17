use crate::archive::DownloadBundle;
use crate::catalog::Catalog;
use crate::config::CollectionConfig;
use crate::fetch::Fetcher;
use crate::geometry;
use anyhow::Result;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const REPORT_FILE: &str = "collection_report.json";

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SceneOutcome {
    Extracted { directory: PathBuf, files: usize },
    Skipped { reason: String },
    DownloadFailed { status: u16 },
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct SceneReport {
    pub scene_id: String,
    pub cloud_cover: Option<f64>,
    #[serde(flatten)]
    pub outcome: SceneOutcome,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Default)]
pub struct CollectionReport {
    /// Closed ring of the buffered search region
    pub region: Vec<[f64; 2]>,
    pub scenes: Vec<SceneReport>,
}

impl CollectionReport {
    /// True when every scene the catalog returned was extracted.
    pub fn is_complete(self: &Self) -> bool {
        self.scenes
            .iter()
            .all(|s| matches!(s.outcome, SceneOutcome::Extracted { .. }))
    }

    pub fn extracted(self: &Self) -> usize {
        self.scenes
            .iter()
            .filter(|s| matches!(s.outcome, SceneOutcome::Extracted { .. }))
            .count()
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let report: Self = serde_json::from_str(&content)?;
        Ok(report)
    }

    pub fn write<P: AsRef<Path>>(self: &Self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// Runs one collection: query the catalog for the least cloudy scenes over
/// the configured region, then download and extract them one at a time.
///
/// A non-200 download is recorded and the loop moves on. Catalog errors and
/// unreadable archives abort the run; scenes extracted before that stay on
/// disk.
pub async fn collect(
    config: &CollectionConfig,
    catalog: &impl Catalog,
    fetcher: &impl Fetcher,
) -> Result<CollectionReport> {
    config.validate()?;
    let region = config.region()?;
    let query = config.scene_query(&region);

    info!(
        "Searching {} from {} to {} for {} scene(s)",
        query.collection, query.start_date, query.end_date, query.limit
    );
    let scenes = catalog.search(&query).await?;
    info!("Catalog returned {} scene(s)", scenes.len());

    fs::create_dir_all(&config.output_folder)?;

    let mut report = CollectionReport {
        region: geometry::closed_ring(&region.polygon),
        scenes: vec![],
    };
    let total = scenes.len();
    for (i, found) in scenes.iter().enumerate() {
        info!("Downloading image {}/{}: {}", i + 1, total, found.id);
        let outcome =
            collect_scene(config, catalog, fetcher, &found.id, &query.sort_property).await?;
        report.scenes.push(SceneReport {
            scene_id: found.id.clone(),
            cloud_cover: found.cloud_cover,
            outcome,
        });
    }

    let report_path = config.output_folder.join(REPORT_FILE);
    report.write(&report_path)?;
    info!(
        "Extracted {}/{} scene(s), report written to {}",
        report.extracted(),
        total,
        report_path.display()
    );

    Ok(report)
}

async fn collect_scene(
    config: &CollectionConfig,
    catalog: &impl Catalog,
    fetcher: &impl Fetcher,
    id: &str,
    cloud_property: &str,
) -> Result<SceneOutcome> {
    // Footprint comes from a fresh lookup rather than the search result
    let scene = catalog.scene(id, cloud_property).await?;
    if scene.footprint.len() < 3 {
        warn!("Scene {} has no usable footprint, skipping", id);
        return Ok(SceneOutcome::Skipped {
            reason: "missing footprint".to_string(),
        });
    }

    let params = config.download_params(&scene.footprint);
    let url = catalog.download_url(id, &params).await?;
    debug!("Download url: {}", url);

    let response = fetcher.get(&url).await?;
    if !response.is_ok() {
        warn!("Failed to download file. Status code: {}", response.status);
        return Ok(SceneOutcome::DownloadFailed {
            status: response.status,
        });
    }

    let bundle = DownloadBundle::new(response.body, id, &Local::now());
    let extraction = bundle.extract(&config.output_folder)?;
    info!(
        "File downloaded successfully, extracted {} file(s) to {}",
        extraction.files.len(),
        extraction.directory.display()
    );

    Ok(SceneOutcome::Extracted {
        directory: extraction.directory,
        files: extraction.files.len(),
    })
}
