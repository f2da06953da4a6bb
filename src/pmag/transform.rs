//! Direction ↔ virtual geomagnetic pole transforms.
//!
//! Both directions assume a geocentric axial dipole: a site at magnetic
//! colatitude `p` sees `tan I = 2 cot p`, and the pole lies at great-circle
//! distance `p` from the site along the declination bearing.

use super::direction::{wrap_degrees, Direction, Pole};

/// Converts a site direction into its virtual geomagnetic pole.
///
/// # Formula
/// ```text
/// p     = atan2(2, tan I)
/// plat  = asin(sin λs cos p + cos λs sin p cos D)
/// plon  = φs + atan2(sin D sin p cos λs, cos p − sin λs sin plat)
/// ```
/// Longitude is wrapped to `[0, 360)`.
///
/// # Examples
/// ```
/// use smpsite::pmag::{direction_to_vgp, Direction};
/// // A GAD direction at 30°N maps back onto the spin axis.
/// let inc = (2.0 * 30.0_f64.to_radians().tan()).atan().to_degrees();
/// let vgp = direction_to_vgp(&Direction::new(0.0, inc), 30.0, 10.0);
/// assert!((vgp.lat - 90.0).abs() < 1e-9);
/// ```
pub fn direction_to_vgp(direction: &Direction, site_lat: f64, site_lon: f64) -> Pole {
    let dec = direction.dec.to_radians();
    let inc = direction.inc.to_radians();
    let slat = site_lat.to_radians();

    let p = 2.0_f64.atan2(inc.tan());
    let (psin, pcos) = p.sin_cos();
    let plat = (slat.sin() * pcos + slat.cos() * psin * dec.cos())
        .clamp(-1.0, 1.0)
        .asin();
    let dlon = (dec.sin() * psin * slat.cos()).atan2(pcos - slat.sin() * plat.sin());

    Pole::new(wrap_degrees(site_lon + dlon.to_degrees()), plat.to_degrees())
}

/// Converts a virtual geomagnetic pole into the direction it implies at a
/// site. Inverse of [`direction_to_vgp`].
///
/// The site's magnetic colatitude is its great-circle distance to the pole;
/// declination is the initial bearing from site to pole.
pub fn vgp_to_direction(pole: &Pole, site_lat: f64, site_lon: f64) -> Direction {
    let site = Pole::new(site_lon, site_lat);
    let p = site.distance_to(pole).to_radians();
    let inc = (2.0 * p.cos()).atan2(p.sin());

    let slat = site_lat.to_radians();
    let plat = pole.lat.to_radians();
    let dlon = (pole.lon - site_lon).to_radians();
    let dec = (dlon.sin() * plat.cos())
        .atan2(slat.cos() * plat.sin() - slat.sin() * plat.cos() * dlon.cos());

    Direction::new(wrap_degrees(dec.to_degrees()), inc.to_degrees())
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn vgp_transform_inverts(
            dec in 0.0_f64..360.0,
            inc in -85.0_f64..85.0,
            site_lat in -80.0_f64..80.0,
            site_lon in 0.0_f64..360.0,
        ) {
            let d = Direction::new(dec, inc);
            let vgp = direction_to_vgp(&d, site_lat, site_lon);
            prop_assert!((-90.0..=90.0).contains(&vgp.lat));
            prop_assert!((0.0..360.0).contains(&vgp.lon));
            let back = vgp_to_direction(&vgp, site_lat, site_lon);
            prop_assert!(d.angle_to(&back) < 1e-5, "{:?} -> {:?} -> {:?}", d, vgp, back);
        }
    }
}
