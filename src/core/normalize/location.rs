//! `/locations` records → regions and monitoring sites

use super::{first_str, id_value, NormalizeOutcome, SkipReason};
use crate::domain::{MonitoringSite, Region, RegionCode, SiteCode};
use serde_json::Value;

const UNKNOWN_COUNTRY: &str = "XX";
const UNKNOWN_REGION: &str = "Unknown";

/// A site together with the region it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct LocationRecord {
    pub region: Region,
    pub site: MonitoringSite,
}

/// Normalizes one location record
///
/// The site code comes from `id` or `locationId`. The region is keyed by
/// `"{country}|{city}"`, falling back to the locality, then the country,
/// then `"Unknown"` for the name.
pub fn normalize_location(raw: &Value) -> NormalizeOutcome<LocationRecord> {
    let Some(obj) = raw.as_object() else {
        return NormalizeOutcome::Skip(SkipReason::NotAnObject);
    };

    let site_code = match id_value(obj.get("id"))
        .or_else(|| id_value(obj.get("locationId")))
        .and_then(|id| SiteCode::new(id).ok())
    {
        Some(code) => code,
        None => return NormalizeOutcome::Skip(SkipReason::MissingSiteId),
    };

    // `country` is a plain code in v2 and an object in v3
    let (country, country_name) = match obj.get("country") {
        Some(Value::String(code)) if !code.trim().is_empty() => (code.trim().to_string(), None),
        Some(Value::Object(country)) => (
            first_str(country, &["code"])
                .unwrap_or(UNKNOWN_COUNTRY)
                .to_string(),
            first_str(country, &["name"]),
        ),
        _ => (UNKNOWN_COUNTRY.to_string(), None),
    };

    let region_name = first_str(obj, &["city", "locality"])
        .or(country_name)
        .map(str::to_string)
        .unwrap_or_else(|| {
            if country == UNKNOWN_COUNTRY {
                UNKNOWN_REGION.to_string()
            } else {
                country.clone()
            }
        });

    let region_code = match RegionCode::from_parts(&country, &region_name) {
        Ok(code) => code,
        Err(_) => return NormalizeOutcome::Skip(SkipReason::MissingSiteId),
    };

    let site_name = first_str(obj, &["name", "location"])
        .map(str::to_string)
        .unwrap_or_else(|| region_name.clone());

    let description = first_str(obj, &["description", "address"])
        .unwrap_or_default()
        .to_string();

    let coordinates = obj.get("coordinates").and_then(Value::as_object);
    let coordinate = |key: &str| {
        coordinates
            .and_then(|c| c.get(key))
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
    };

    NormalizeOutcome::Record(LocationRecord {
        region: Region {
            code: region_code.clone(),
            name: region_name,
            country,
        },
        site: MonitoringSite {
            code: site_code,
            region_code,
            name: site_name,
            description,
            latitude: coordinate("latitude"),
            longitude: coordinate("longitude"),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn record(raw: Value) -> LocationRecord {
        normalize_location(&raw).record().expect("expected a record")
    }

    #[test]
    fn test_full_v2_location() {
        let loc = record(json!({
            "id": 2178,
            "name": "Del Norte",
            "city": "Albuquerque",
            "country": "US",
            "coordinates": {"latitude": 35.1353, "longitude": -106.5847}
        }));

        assert_eq!(loc.site.code.as_str(), "2178");
        assert_eq!(loc.site.name, "Del Norte");
        assert_eq!(loc.region.code.as_str(), "US|Albuquerque");
        assert_eq!(loc.region.name, "Albuquerque");
        assert_eq!(loc.region.country, "US");
        assert_eq!(loc.site.region_code, loc.region.code);
        assert_eq!(loc.site.latitude, Some(35.1353));
        assert_eq!(loc.site.longitude, Some(-106.5847));
        assert_eq!(loc.site.description, "");
    }

    #[test]
    fn test_v3_country_object_and_locality() {
        let loc = record(json!({
            "id": "8118",
            "locality": "Neukölln",
            "country": {"id": 50, "code": "DE", "name": "Germany"},
            "address": "Karl-Marx-Str."
        }));

        assert_eq!(loc.region.code.as_str(), "DE|Neukölln");
        assert_eq!(loc.site.name, "Neukölln");
        assert_eq!(loc.site.description, "Karl-Marx-Str.");
    }

    #[test]
    fn test_country_name_used_without_city() {
        let loc = record(json!({
            "id": 1,
            "country": {"code": "FR", "name": "France"}
        }));
        assert_eq!(loc.region.code.as_str(), "FR|France");
    }

    #[test]
    fn test_defaults_for_sparse_location() {
        let loc = record(json!({"locationId": 99}));

        assert_eq!(loc.region.code.as_str(), "XX|Unknown");
        assert_eq!(loc.region.country, "XX");
        assert_eq!(loc.site.name, "Unknown");
        assert_eq!(loc.site.latitude, None);
    }

    #[test_case(json!({"id": null, "locationId": 5}) ; "null id")]
    #[test_case(json!({"id": "", "locationId": "5"}) ; "empty id")]
    #[test_case(json!({"locationId": 5}) ; "location id only")]
    fn test_site_code_falls_back_to_location_id(raw: Value) {
        assert_eq!(record(raw).site.code.as_str(), "5");
    }

    #[test]
    fn test_missing_id_skips() {
        let outcome = normalize_location(&json!({"name": "No id", "city": "Paris"}));
        assert_eq!(outcome.skip_reason(), Some(SkipReason::MissingSiteId));
    }

    #[test]
    fn test_non_object_skips() {
        let outcome = normalize_location(&json!("2178"));
        assert_eq!(outcome.skip_reason(), Some(SkipReason::NotAnObject));
    }
}
