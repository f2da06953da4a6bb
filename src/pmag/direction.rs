//! Directions, pole positions and great-circle geometry.
//!
//! All angles are in degrees. Directions use the paleomagnetic convention:
//! declination clockwise from north, inclination positive downwards. The
//! Cartesian form is `(north, east, down)`, which makes a pole position
//! `(lon, lat)` and a direction `(dec, inc)` share the same vector math.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// A unit direction given by declination and inclination (degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Direction {
    pub dec: f64,
    pub inc: f64,
}

impl Direction {
    pub fn new(dec: f64, inc: f64) -> Self {
        Self { dec, inc }
    }

    /// Unit vector `(cos I cos D, cos I sin D, sin I)`.
    pub fn to_unit_vector(&self) -> Vector3<f64> {
        let (dsin, dcos) = self.dec.to_radians().sin_cos();
        let (isin, icos) = self.inc.to_radians().sin_cos();
        Vector3::new(icos * dcos, icos * dsin, isin)
    }

    /// Direction of a (not necessarily unit) vector. Declination is
    /// wrapped to `[0, 360)`.
    pub fn from_vector(v: &Vector3<f64>) -> Self {
        let norm = v.norm();
        let dec = wrap_degrees(v.y.atan2(v.x).to_degrees());
        let inc = (v.z / norm).clamp(-1.0, 1.0).asin().to_degrees();
        Self { dec, inc }
    }

    /// Angle between two directions, degrees.
    pub fn angle_to(&self, other: &Direction) -> f64 {
        let cos = self.to_unit_vector().dot(&other.to_unit_vector());
        cos.clamp(-1.0, 1.0).acos().to_degrees()
    }
}

/// A pole position (VGP) given by longitude and latitude (degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pole {
    pub lon: f64,
    pub lat: f64,
}

impl Pole {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    pub const NORTH: Pole = Pole { lon: 0.0, lat: 90.0 };

    /// Pole positions average like directions with `dec = lon`, `inc = lat`.
    pub fn as_direction(&self) -> Direction {
        Direction::new(self.lon, self.lat)
    }

    pub fn from_direction(d: &Direction) -> Self {
        Self::new(d.dec, d.inc)
    }

    /// Great-circle distance to `other`, degrees.
    pub fn distance_to(&self, other: &Pole) -> f64 {
        great_circle_distance(self, other)
    }
}

/// Haversine great-circle distance between two poles, degrees.
///
/// # Examples
/// ```
/// use smpsite::pmag::{great_circle_distance, Pole};
/// let d = great_circle_distance(&Pole::new(0.0, 0.0), &Pole::new(90.0, 0.0));
/// assert!((d - 90.0).abs() < 1e-12);
/// ```
pub fn great_circle_distance(a: &Pole, b: &Pole) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    (2.0 * h.sqrt().clamp(0.0, 1.0).asin()).to_degrees()
}

/// Wraps an angle to `[0, 360)`.
pub fn wrap_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}
