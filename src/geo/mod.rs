//! Location-derived defaults and the concrete prayer-time provider.
//!
//! - [`solar`]: [`SolarTimeProvider`], the astronomical calculation behind every schedule
//! - [`determine_timezone_from_coordinates`]: zone lookup when `timezone` is unset
//! - [`recommended_method`]: regional calculation convention when `method` is unset

pub mod solar;

pub use solar::SolarTimeProvider;

use chrono_tz::Tz;
use once_cell::sync::Lazy;
use tzf_rs::DefaultFinder;

use crate::prayer::CalculationMethod;

/// The finder loads its polygon data once, on first lookup.
static FINDER: Lazy<DefaultFinder> = Lazy::new(DefaultFinder::new);

/// IANA zone containing the coordinates, if the lookup yields a known zone.
pub fn determine_timezone_from_coordinates(latitude: f64, longitude: f64) -> Option<Tz> {
    let name = FINDER.get_tz_name(longitude, latitude);
    if name.is_empty() {
        return None;
    }
    name.parse::<Tz>().ok()
}

/// Calculation method customarily used in the region of `time_zone`.
pub fn recommended_method(time_zone: Tz) -> CalculationMethod {
    use CalculationMethod::*;

    let name = time_zone.name();
    match name {
        "Europe/Istanbul" | "Asia/Istanbul" => Turkey,
        "Asia/Riyadh" | "Asia/Aden" => UmmAlQura,
        "Asia/Dubai" | "Asia/Muscat" => Dubai,
        "Asia/Kuwait" => Kuwait,
        "Asia/Qatar" | "Asia/Bahrain" => Qatar,
        "Asia/Tehran" => Tehran,
        "Asia/Karachi" | "Asia/Kolkata" | "Asia/Dhaka" => Karachi,
        "Asia/Singapore" | "Asia/Kuala_Lumpur" | "Asia/Jakarta" => Singapore,
        "Africa/Cairo" => Egyptian,
        _ if name.starts_with("America/") => NorthAmerica,
        _ => MuslimWorldLeague,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::{Africa, America, Asia, Europe};

    #[test]
    fn test_timezone_detection() {
        assert_eq!(
            determine_timezone_from_coordinates(40.7128, -74.0060),
            Some(America::New_York)
        );
        assert_eq!(
            determine_timezone_from_coordinates(51.5074, -0.1278),
            Some(Europe::London)
        );
        assert_eq!(
            determine_timezone_from_coordinates(21.4225, 39.8262),
            Some(Asia::Riyadh)
        );
        assert_eq!(
            determine_timezone_from_coordinates(30.0444, 31.2357),
            Some(Africa::Cairo)
        );
    }

    #[test]
    fn test_recommended_method_by_region() {
        assert_eq!(recommended_method(America::Chicago), CalculationMethod::NorthAmerica);
        assert_eq!(recommended_method(Europe::Istanbul), CalculationMethod::Turkey);
        assert_eq!(recommended_method(Europe::Paris), CalculationMethod::MuslimWorldLeague);
        assert_eq!(recommended_method(Asia::Riyadh), CalculationMethod::UmmAlQura);
        assert_eq!(recommended_method(Asia::Muscat), CalculationMethod::Dubai);
        assert_eq!(recommended_method(Asia::Bahrain), CalculationMethod::Qatar);
        assert_eq!(recommended_method(Asia::Kolkata), CalculationMethod::Karachi);
        assert_eq!(recommended_method(Asia::Kuala_Lumpur), CalculationMethod::Singapore);
        assert_eq!(recommended_method(Africa::Cairo), CalculationMethod::Egyptian);
        assert_eq!(recommended_method(Africa::Lagos), CalculationMethod::MuslimWorldLeague);
        assert_eq!(recommended_method(Tz::UTC), CalculationMethod::MuslimWorldLeague);
    }
}
