use super::{
    least_cloudy, Catalog, CredentialProvider, DownloadParams, SceneDescriptor, SceneQuery,
};
use crate::error::CatalogError;
use crate::geometry::{self, lon_lat, Coord};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;
use url::Url;

const API_BASE: &str = "https://earthengine.googleapis.com";
const PUBLIC_ASSETS: &str = "projects/earthengine-public/assets";
const PAGE_SIZE: usize = 1000;

/// Earth Engine REST v1 client. Public catalog assets are read from the
/// `earthengine-public` project; quota and download ids are charged to
/// `project`.
pub struct EarthEngine<C: CredentialProvider> {
    client: reqwest::Client,
    base_url: String,
    project: String,
    credentials: C,
}

impl<C: CredentialProvider> EarthEngine<C> {
    pub fn new(project: &str, credentials: C) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: API_BASE.to_string(),
            project: project.to_string(),
            credentials,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn authorized(
        self: &Self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder> {
        let token = self.credentials.access_token().await?;
        Ok(request
            .bearer_auth(token)
            .header("x-goog-user-project", &self.project))
    }

    async fn send_json<T: DeserializeOwned>(
        self: &Self,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let response = self.authorized(request).await?.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                url: response.url().to_string(),
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }
            .into());
        }
        Ok(response.json::<T>().await?)
    }

    async fn list_images(self: &Self, query: &SceneQuery) -> Result<Vec<Asset>> {
        let url = format!(
            "{}/v1/{}:listImages",
            self.base_url,
            asset_name(&query.collection)
        );
        let region = geometry::to_geojson(&query.region).to_string();
        let (start_time, end_time) = time_window(query.start_date, query.end_date)?;

        let mut images = vec![];
        let mut page_token: Option<String> = None;
        loop {
            let mut params = vec![
                ("region", region.clone()),
                ("startTime", start_time.clone()),
                ("endTime", end_time.clone()),
                ("view", "FULL".to_string()),
                ("pageSize", PAGE_SIZE.to_string()),
            ];
            if let Some(token) = &page_token {
                params.push(("pageToken", token.clone()));
            }

            let page: ListImagesResponse = self
                .send_json(self.client.get(&url).query(&params))
                .await?;
            debug!("listImages page returned {} images", page.images.len());
            images.extend(page.images);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(images)
    }
}

impl<C: CredentialProvider> Catalog for EarthEngine<C> {
    async fn search(self: &Self, query: &SceneQuery) -> Result<Vec<SceneDescriptor>> {
        let scenes = self
            .list_images(query)
            .await?
            .into_iter()
            .map(|asset| asset.into_descriptor(&query.sort_property))
            .collect::<Result<Vec<_>>>()?;
        Ok(least_cloudy(scenes, query.limit))
    }

    async fn scene(self: &Self, id: &str, cloud_property: &str) -> Result<SceneDescriptor> {
        let url = format!("{}/v1/{}", self.base_url, asset_name(id));
        let asset: Asset = self.send_json(self.client.get(&url)).await?;
        asset.into_descriptor(cloud_property)
    }

    async fn download_url(self: &Self, id: &str, params: &DownloadParams) -> Result<Url> {
        let url = format!("{}/v1/projects/{}/thumbnails", self.base_url, self.project);
        let body = download_request(id, params);
        let thumbnail: Thumbnail = self.send_json(self.client.post(&url).json(&body)).await?;
        let pixels = format!("{}/v1/{}:getPixels", self.base_url, thumbnail.name);
        Ok(Url::parse(&pixels)?)
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ListImagesResponse {
    #[serde(default)]
    images: Vec<Asset>,
    next_page_token: Option<String>,
}

#[derive(Deserialize, Debug)]
struct Thumbnail {
    name: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Asset {
    id: Option<String>,
    name: Option<String>,
    start_time: Option<DateTime<Utc>>,
    geometry: Option<Value>,
    #[serde(default)]
    properties: Map<String, Value>,
}

impl Asset {
    fn into_descriptor(self: Self, cloud_property: &str) -> Result<SceneDescriptor> {
        let id = match (self.id, self.name) {
            (Some(id), _) => id,
            (None, Some(name)) => name
                .strip_prefix(PUBLIC_ASSETS)
                .map(|s| s.trim_start_matches('/').to_string())
                .unwrap_or(name),
            (None, None) => return Err(CatalogError::Missing("id").into()),
        };
        let cloud_cover = self.properties.get(cloud_property).and_then(Value::as_f64);
        let footprint = self
            .properties
            .get("system:footprint")
            .and_then(footprint_from_geojson)
            .or_else(|| self.geometry.as_ref().and_then(footprint_from_geojson))
            .unwrap_or_default();

        Ok(SceneDescriptor {
            id,
            footprint,
            cloud_cover,
            acquired: self.start_time,
        })
    }
}

/// Resource name for a catalog id. Ids that are already resource names pass
/// through unchanged.
fn asset_name(id: &str) -> String {
    if id.starts_with("projects/") {
        id.to_string()
    } else {
        format!("{}/{}", PUBLIC_ASSETS, id)
    }
}

/// RFC 3339 bounds for listImages. `endTime` is exclusive, so the day after
/// `end` is used to keep the whole last day.
fn time_window(start: NaiveDate, end: NaiveDate) -> Result<(String, String)> {
    let end_exclusive = end
        .checked_add_days(Days::new(1))
        .ok_or_else(|| anyhow!("End date {} is out of range", end))?;
    let fmt = |d: NaiveDate| format!("{}T00:00:00Z", d.format("%Y-%m-%d"));
    Ok((fmt(start), fmt(end_exclusive)))
}

/// Outer ring vertices of a GeoJSON footprint, first vertex not repeated.
fn footprint_from_geojson(geojson: &Value) -> Option<Vec<Coord>> {
    let coordinates = geojson.get("coordinates")?;
    let ring = match geojson.get("type")?.as_str()? {
        "LinearRing" | "LineString" => coordinates,
        "Polygon" => coordinates.get(0)?,
        "MultiPolygon" => coordinates.get(0)?.get(0)?,
        _ => return None,
    };
    let vertices = ring
        .as_array()?
        .iter()
        .map(|v| Some(lon_lat(v.get(0)?.as_f64()?, v.get(1)?.as_f64()?)))
        .collect::<Option<Vec<_>>>()?;
    Some(geometry::vertices(&geometry::polygon(vertices)))
}

fn function(name: &str, arguments: Value) -> Value {
    json!({ "functionInvocationValue": { "functionName": name, "arguments": arguments } })
}

fn constant(value: Value) -> Value {
    json!({ "constantValue": value })
}

/// Body for `thumbnails.create`: load the scene, reproject to the requested
/// grid and clip to the crop region, packaged as a zipped GeoTIFF.
fn download_request(id: &str, params: &DownloadParams) -> Value {
    let ring = geometry::closed_ring(&geometry::polygon(params.region.clone()));
    let image = function("Image.load", json!({ "id": constant(json!(id)) }));
    let projection = function("Projection", json!({ "crs": constant(json!(params.crs)) }));
    let reprojected = function(
        "Image.reproject",
        json!({
            "image": image,
            "crs": projection,
            "scale": constant(json!(params.scale)),
        }),
    );
    let region = function(
        "GeometryConstructors.Polygon",
        json!({ "coordinates": constant(json!([ring])) }),
    );
    let clipped = function(
        "Image.clip",
        json!({ "input": reprojected, "geometry": region }),
    );

    json!({
        "expression": { "result": "0", "values": { "0": clipped } },
        "fileFormat": "ZIPPED_GEO_TIFF",
    })
}
