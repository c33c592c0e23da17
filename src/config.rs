use crate::catalog::{DownloadParams, SceneQuery};
use crate::error::ConfigError;
use crate::geometry::{lon_lat, Coord};
use crate::region::{self, Region};
use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Parameters of one collection run. Missing keys in a TOML file fall back
/// to the defaults below.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct CollectionConfig {
    pub width_meters: f64,
    pub height_meters: f64,
    pub buffer_meters: f64,
    pub output_folder: PathBuf,
    pub num_images: usize,
    pub collection: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub cloud_property: String,
    /// Output pixel size in units of `crs`
    pub scale: f64,
    pub crs: String,
    /// Written as `center = [lon, lat]`
    #[serde(with = "lon_lat_pair")]
    pub center: Coord,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            width_meters: 1000.,
            height_meters: 1000.,
            buffer_meters: 100.,
            output_folder: PathBuf::from("./"),
            num_images: 1,
            collection: "LANDSAT/LC08/C01/T1_SR".to_string(),
            start_date: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2020, 12, 31).unwrap_or_default(),
            cloud_property: "CLOUD_COVER".to_string(),
            scale: 250.,
            crs: "EPSG:4326".to_string(),
            center: lon_lat(-122.084, 37.422),
        }
    }
}

impl CollectionConfig {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn write<P: AsRef<Path>>(self: &Self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(self: &Self) -> Result<(), ConfigError> {
        region::validate(
            self.center,
            self.width_meters,
            self.height_meters,
            self.buffer_meters,
        )?;
        if self.num_images == 0 {
            return Err(ConfigError::NoImages);
        }
        if !(self.scale.is_finite() && self.scale > 0.) {
            return Err(ConfigError::Scale(self.scale));
        }
        if self.start_date > self.end_date {
            return Err(ConfigError::DateWindow {
                start: self.start_date,
                end: self.end_date,
            });
        }
        for (name, value) in [
            ("collection", &self.collection),
            ("cloud_property", &self.cloud_property),
            ("crs", &self.crs),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Empty(name));
            }
        }
        Ok(())
    }

    pub fn region(self: &Self) -> Result<Region> {
        let region = region::build_region(
            self.center,
            self.width_meters,
            self.height_meters,
            self.buffer_meters,
        )?;
        Ok(region)
    }

    pub fn scene_query(self: &Self, region: &Region) -> SceneQuery {
        SceneQuery {
            collection: self.collection.clone(),
            region: region.polygon.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
            sort_property: self.cloud_property.clone(),
            limit: self.num_images,
        }
    }

    pub fn download_params(self: &Self, footprint: &[Coord]) -> DownloadParams {
        DownloadParams {
            scale: self.scale,
            crs: self.crs.clone(),
            region: footprint.to_vec(),
        }
    }
}

mod lon_lat_pair {
    use crate::geometry::{lon_lat, Coord};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(center: &Coord, serializer: S) -> Result<S::Ok, S::Error> {
        [center.x, center.y].serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Coord, D::Error> {
        let [lon, lat] = <[f64; 2]>::deserialize(deserializer)?;
        Ok(lon_lat(lon, lat))
    }
}
