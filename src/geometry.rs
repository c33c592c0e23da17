//! Polygon helpers for search regions in lon/lat degrees, on top of `geo`.
//! Coordinates use `x` for longitude and `y` for latitude.
use geo::{Area, LineString, Polygon};
use std::f64::consts::{FRAC_PI_2, TAU};

pub type Coord = geo::Coord<f64>;

pub fn lon_lat(lon: f64, lat: f64) -> Coord {
    Coord { x: lon, y: lat }
}

/// Single ring polygon from its vertices. A closing vertex is optional.
pub fn polygon(vertices: Vec<Coord>) -> Polygon<f64> {
    Polygon::new(LineString::from(vertices), vec![])
}

/// Exterior ring vertices without the closing repeat.
pub fn vertices(polygon: &Polygon<f64>) -> Vec<Coord> {
    let mut coords = polygon.exterior().0.clone();
    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }
    coords
}

/// Exterior ring as `[[lon, lat], ...]`, first vertex repeated last.
pub fn closed_ring(polygon: &Polygon<f64>) -> Vec<[f64; 2]> {
    polygon.exterior().coords().map(|c| [c.x, c.y]).collect()
}

pub fn to_geojson(polygon: &Polygon<f64>) -> serde_json::Value {
    serde_json::json!({
        "type": "Polygon",
        "coordinates": [closed_ring(polygon)],
    })
}

/// Parameters for rounding the corners of a buffered polygon
#[derive(Debug, Clone)]
pub struct BufferParams {
    /// Outward offset in polygon units
    pub distance: f64,
    /// Arc vertices per quarter turn
    pub segments: usize,
}

impl Default for BufferParams {
    fn default() -> Self {
        Self {
            distance: 0.,
            segments: 8,
        }
    }
}

/// Expands a convex polygon outward by `params.distance`, rounding each
/// corner with an arc. The winding order of the input is kept. A distance
/// of zero returns the polygon unchanged.
pub fn buffer_convex(input: &Polygon<f64>, params: &BufferParams) -> Polygon<f64> {
    let ring = vertices(input);
    let n = ring.len();
    if params.distance <= 0. || n < 3 {
        return input.clone();
    }

    let clockwise = input.signed_area() < 0.;
    let segments = params.segments.max(1) as f64;
    let normals: Vec<(f64, f64)> = (0..n)
        .map(|i| outward_normal(ring[i], ring[(i + 1) % n], clockwise))
        .collect();

    let mut coords = vec![];
    for i in 0..n {
        let vertex = ring[i];
        let incoming = normals[(i + n - 1) % n];
        let outgoing = normals[i];

        let a0 = incoming.1.atan2(incoming.0);
        let a1 = outgoing.1.atan2(outgoing.0);
        // Sweep in the direction the ring travels
        let sweep = if clockwise {
            (a0 - a1).rem_euclid(TAU)
        } else {
            (a1 - a0).rem_euclid(TAU)
        };
        let steps = ((sweep / FRAC_PI_2) * segments).ceil().max(1.) as usize;

        for k in 0..=steps {
            let t = sweep * k as f64 / steps as f64;
            let angle = if clockwise { a0 - t } else { a0 + t };
            coords.push(lon_lat(
                vertex.x + params.distance * angle.cos(),
                vertex.y + params.distance * angle.sin(),
            ));
        }
    }
    polygon(coords)
}

fn outward_normal(a: Coord, b: Coord, clockwise: bool) -> (f64, f64) {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len = dx.hypot(dy);
    if len == 0. {
        return (0., 0.);
    }
    if clockwise {
        (-dy / len, dx / len)
    } else {
        (dy / len, -dx / len)
    }
}
