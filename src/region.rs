use crate::error::RegionError;
use crate::geometry::{self, lon_lat, BufferParams, Coord};
use geo::{BoundingRect, Polygon};

/// Flat conversion used for both axes. Longitude degrees shrink with
/// latitude, so rectangles away from the equator come out stretched east-west.
pub const METERS_PER_DEGREE: f64 = 111_000.;

pub fn meters_to_degrees(meters: f64) -> f64 {
    meters / METERS_PER_DEGREE
}

#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    pub center: Coord,
    /// Corners in order top-left, top-right, bottom-right, bottom-left
    pub rectangle: Polygon<f64>,
    /// The rectangle expanded by the buffer distance
    pub polygon: Polygon<f64>,
}

pub fn build_region(
    center: Coord,
    width_meters: f64,
    height_meters: f64,
    buffer_meters: f64,
) -> Result<Region, RegionError> {
    validate(center, width_meters, height_meters, buffer_meters)?;

    let half_width = meters_to_degrees(width_meters / 2.);
    let half_height = meters_to_degrees(height_meters / 2.);

    let top_left = lon_lat(center.x - half_width, center.y + half_height);
    let top_right = lon_lat(center.x + half_width, center.y + half_height);
    let bottom_right = lon_lat(center.x + half_width, center.y - half_height);
    let bottom_left = lon_lat(center.x - half_width, center.y - half_height);

    let rectangle = geometry::polygon(vec![top_left, top_right, bottom_right, bottom_left]);
    let polygon = geometry::buffer_convex(
        &rectangle,
        &BufferParams {
            distance: meters_to_degrees(buffer_meters),
            ..Default::default()
        },
    );

    // Planar degrees do not wrap at the poles or the antimeridian
    if let Some(rect) = polygon.bounding_rect() {
        let (min, max) = (rect.min(), rect.max());
        if min.x < -180. || max.x > 180. || min.y < -90. || max.y > 90. {
            return Err(RegionError::OutOfBounds {
                min_lon: min.x,
                min_lat: min.y,
                max_lon: max.x,
                max_lat: max.y,
            });
        }
    }

    Ok(Region {
        center,
        rectangle,
        polygon,
    })
}

pub fn validate(
    center: Coord,
    width_meters: f64,
    height_meters: f64,
    buffer_meters: f64,
) -> Result<(), RegionError> {
    if !((-180.0..=180.0).contains(&center.x) && (-90.0..=90.0).contains(&center.y)) {
        return Err(RegionError::Center {
            lon: center.x,
            lat: center.y,
        });
    }
    for (name, value) in [("width_meters", width_meters), ("height_meters", height_meters)] {
        if !(value.is_finite() && value > 0.) {
            return Err(RegionError::Extent { name, value });
        }
    }
    if !(buffer_meters.is_finite() && buffer_meters >= 0.) {
        return Err(RegionError::Buffer(buffer_meters));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;

    const EPS: f64 = 1e-9;

    fn mountain_view() -> Coord {
        lon_lat(-122.084, 37.422)
    }

    #[test]
    fn test_rectangle_spans_and_center() {
        let region = build_region(mountain_view(), 2000., 500., 0.).unwrap();
        let rect = region.rectangle.bounding_rect().unwrap();
        assert!((rect.width() - 2000. / 111_000.).abs() < EPS);
        assert!((rect.height() - 500. / 111_000.).abs() < EPS);
        assert!((rect.center().x - -122.084).abs() < EPS);
        assert!((rect.center().y - 37.422).abs() < EPS);
    }

    #[test]
    fn test_corner_order() {
        let region = build_region(lon_lat(0., 0.), 222_000., 222_000., 0.).unwrap();
        let corners = geometry::vertices(&region.rectangle);
        let expected = [(-1., 1.), (1., 1.), (1., -1.), (-1., -1.)];
        assert_eq!(corners.len(), 4);
        for (corner, (lon, lat)) in corners.iter().zip(expected) {
            assert!((corner.x - lon).abs() < EPS);
            assert!((corner.y - lat).abs() < EPS);
        }
    }

    #[test]
    fn test_zero_buffer_matches_rectangle() {
        let region = build_region(mountain_view(), 1000., 1000., 0.).unwrap();
        assert_eq!(region.polygon, region.rectangle);
    }

    #[test]
    fn test_area_grows_with_buffer() {
        let areas: Vec<f64> = [0., 10., 100., 1000., 5000.]
            .iter()
            .map(|b| {
                build_region(mountain_view(), 1000., 1000., *b)
                    .unwrap()
                    .polygon
                    .unsigned_area()
            })
            .collect();
        assert!(areas.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_buffered_region_encloses_rectangle() {
        let region = build_region(mountain_view(), 1000., 1000., 100.).unwrap();
        let inner = region.rectangle.bounding_rect().unwrap();
        let outer = region.polygon.bounding_rect().unwrap();
        assert!(outer.min().x < inner.min().x && outer.max().x > inner.max().x);
        assert!(outer.min().y < inner.min().y && outer.max().y > inner.max().y);

        let expected_span = (1000. + 2. * 100.) / 111_000.;
        assert!((outer.width() - expected_span).abs() < EPS);
        assert!((outer.height() - expected_span).abs() < EPS);
    }

    #[test]
    fn test_rejects_degenerate_extents() {
        assert_eq!(
            build_region(mountain_view(), 0., 10., 0.),
            Err(RegionError::Extent {
                name: "width_meters",
                value: 0.
            })
        );
        assert!(matches!(
            build_region(mountain_view(), 10., -5., 0.),
            Err(RegionError::Extent {
                name: "height_meters",
                ..
            })
        ));
        assert_eq!(
            build_region(mountain_view(), 10., 10., -1.),
            Err(RegionError::Buffer(-1.))
        );
        assert!(build_region(lon_lat(f64::NAN, 0.), 10., 10., 0.).is_err());
    }

    #[test]
    fn test_rejects_center_off_the_globe() {
        let outside = [
            lon_lat(181., 0.),
            lon_lat(-180.5, 0.),
            lon_lat(0., 91.),
            lon_lat(0., -90.01),
        ];
        for center in outside {
            assert!(matches!(
                build_region(center, 1000., 1000., 0.),
                Err(RegionError::Center { .. })
            ));
        }
        assert!(build_region(lon_lat(180., 0.), 1., 1., 0.).is_err());
        assert!(validate(lon_lat(180., -90.), 1., 1., 0.).is_ok());
    }

    #[test]
    fn test_rejects_region_crossing_the_pole() {
        let err = build_region(lon_lat(0., 89.99), 1000., 1000., 1_000_000.).unwrap_err();
        match err {
            RegionError::OutOfBounds { max_lat, .. } => assert!(max_lat > 90.),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_rejects_region_crossing_the_antimeridian() {
        assert!(matches!(
            build_region(lon_lat(179.999, 0.), 1000., 1000., 0.),
            Err(RegionError::OutOfBounds { .. })
        ));
    }
}
