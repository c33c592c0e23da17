use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum RegionError {
    #[error("Center point must be a finite lon/lat inside [-180, 180] x [-90, 90], got ({lon}, {lat})")]
    Center { lon: f64, lat: f64 },
    #[error("{name} must be a finite value greater than zero, got {value}")]
    Extent { name: &'static str, value: f64 },
    #[error("Buffer must be a finite value of at least zero, got {0}")]
    Buffer(f64),
    #[error("Buffered region spans lon {min_lon}..{max_lon}, lat {min_lat}..{max_lat}, which leaves the globe")]
    OutOfBounds {
        min_lon: f64,
        min_lat: f64,
        max_lon: f64,
        max_lat: f64,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid region: {0}")]
    Region(#[from] RegionError),
    #[error("num_images must be at least 1")]
    NoImages,
    #[error("scale must be greater than zero, got {0}")]
    Scale(f64),
    #[error("start_date {start} is after end_date {end}")]
    DateWindow {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Request to {url} failed with status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("Catalog response is missing '{0}'")]
    Missing(&'static str),
    #[error("Unable to read access token: {0}")]
    Credentials(String),
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Downloaded payload is not a readable zip archive: {0}")]
    Corrupt(#[from] zip::result::ZipError),
    #[error("Archive entry '{0}' would be written outside the destination")]
    UnsafeEntry(String),
}
