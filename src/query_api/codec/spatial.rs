//! Point values in well-known-text form.
//!
//! `SRID=4326;POINT (12.5 56.3)` or `SRID=9157;POINT Z (1 2 3)`.

use crate::driver::error::{DriverError, DriverResult};
use crate::driver::types::Point;

/// Format a point as `SRID=<srid>;POINT [Z ](<x> <y>[ <z>])`.
pub fn format_point(point: &Point) -> String {
    match point.z {
        Some(z) => format!("SRID={};POINT Z ({} {} {})", point.srid, point.x, point.y, z),
        None => format!("SRID={};POINT ({} {})", point.srid, point.x, point.y),
    }
}

/// Parse a point.
///
/// The shape must be exactly `POINT (` or `POINT Z (`, and the coordinate
/// count has to match the `Z` marker.
pub fn parse_point(text: &str) -> DriverResult<Point> {
    let error = || DriverError::protocol(format!("Invalid point: {}", text));

    let (srid, shape) = text
        .trim()
        .strip_prefix("SRID=")
        .and_then(|rest| rest.split_once(';'))
        .ok_or_else(error)?;
    let srid: i32 = srid.trim().parse().map_err(|_| error())?;

    let shape = shape.trim();
    let (is_3d, coordinates) = if let Some(rest) = shape.strip_prefix("POINT Z (") {
        (true, rest)
    } else if let Some(rest) = shape.strip_prefix("POINT (") {
        (false, rest)
    } else {
        return Err(error());
    };

    let coordinates = coordinates.strip_suffix(')').ok_or_else(error)?;
    let values = coordinates
        .split_whitespace()
        .map(|c| c.parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| error())?;

    match (is_3d, values.as_slice()) {
        (false, [x, y]) => Ok(Point::new_2d(srid, *x, *y)),
        (true, [x, y, z]) => Ok(Point::new_3d(srid, *x, *y, *z)),
        _ => Err(error()),
    }
}
