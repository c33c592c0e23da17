//! Imagery catalog seam: the query the collection loop needs and the scene
//! records it gets back.
mod credentials;
mod earth_engine;

pub use credentials::{CredentialProvider, EnvToken, StaticToken, DEFAULT_TOKEN_VAR};
pub use earth_engine::EarthEngine;

use crate::geometry::Coord;
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use geo::Polygon;
use std::cmp::Ordering;
use url::Url;

pub trait Catalog {
    /// Scenes intersecting the query region inside the date window, least
    /// cloudy first, at most `query.limit` of them.
    async fn search(self: &Self, query: &SceneQuery) -> Result<Vec<SceneDescriptor>>;

    /// Full metadata for a single scene, with cloud cover read from
    /// `cloud_property`.
    async fn scene(self: &Self, id: &str, cloud_property: &str) -> Result<SceneDescriptor>;

    /// A time-limited URL serving the scene as a zip archive.
    async fn download_url(self: &Self, id: &str, params: &DownloadParams) -> Result<Url>;
}

#[derive(Clone, Debug)]
pub struct SceneQuery {
    pub collection: String,
    pub region: Polygon<f64>,
    /// First acquisition day, inclusive
    pub start_date: NaiveDate,
    /// Last acquisition day, inclusive
    pub end_date: NaiveDate,
    pub sort_property: String,
    pub limit: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneDescriptor {
    pub id: String,
    pub footprint: Vec<Coord>,
    pub cloud_cover: Option<f64>,
    pub acquired: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DownloadParams {
    /// Output pixel size in units of `crs`
    pub scale: f64,
    pub crs: String,
    pub region: Vec<Coord>,
}

/// Stable ascending sort on cloud cover. Scenes without a score go last and
/// keep the order the catalog returned them in.
pub fn least_cloudy(mut scenes: Vec<SceneDescriptor>, limit: usize) -> Vec<SceneDescriptor> {
    scenes.sort_by(|a, b| match (a.cloud_cover, b.cloud_cover) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    scenes.truncate(limit);
    scenes
}
