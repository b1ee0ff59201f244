//! `/measurements` records → pollutants and measurements

use super::{first_str, id_value, parse_timestamp, NormalizeOutcome, SiteIndex, SkipReason};
use crate::domain::{Measurement, Pollutant, PollutantCode, SiteCode, StreamKey};
use chrono::Utc;
use serde_json::Value;

/// A measurement and the catalog entry for its pollutant
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRecord {
    pub pollutant: Pollutant,
    pub measurement: Measurement,
}

/// Normalizes one measurement record
///
/// The site must already be in `sites`; measurements for sites the
/// reference phase did not produce are skipped as [`SkipReason::UnknownSite`].
pub fn normalize_measurement(
    raw: &Value,
    sites: &SiteIndex,
    stream: &StreamKey,
) -> NormalizeOutcome<MeasurementRecord> {
    use NormalizeOutcome::Skip;

    let Some(obj) = raw.as_object() else {
        return Skip(SkipReason::NotAnObject);
    };

    let site_code = match id_value(obj.get("locationId"))
        .or_else(|| id_value(obj.get("location_id")))
        .and_then(|id| SiteCode::new(id).ok())
    {
        Some(code) => code,
        None => return Skip(SkipReason::MissingSiteId),
    };
    if !sites.contains(&site_code) {
        return Skip(SkipReason::UnknownSite);
    }

    let parameter = obj.get("parameter");
    let pollutant_code = match parameter {
        Some(Value::String(name)) => PollutantCode::new(name.as_str()).ok(),
        Some(Value::Object(param)) => {
            first_str(param, &["name"]).and_then(|name| PollutantCode::new(name).ok())
        }
        _ => None,
    };
    let Some(pollutant_code) = pollutant_code else {
        return Skip(SkipReason::MissingPollutant);
    };

    let value = match obj.get("value") {
        None | Some(Value::Null) => return Skip(SkipReason::MissingValue),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    let value = match value {
        Some(v) if v.is_finite() && v >= 0.0 => v,
        _ => return Skip(SkipReason::InvalidValue),
    };

    let unit = first_str(obj, &["unit"])
        .or_else(|| {
            parameter
                .and_then(Value::as_object)
                .and_then(|param| first_str(param, &["units"]))
        })
        .unwrap_or_default()
        .to_string();

    let raw_timestamp = ["date", "datetime"]
        .iter()
        .filter_map(|key| obj.get(*key).and_then(Value::as_object))
        .find_map(|date| first_str(date, &["utc", "local"]));
    let Some(raw_timestamp) = raw_timestamp else {
        return Skip(SkipReason::MissingTimestamp);
    };
    let Some(observed_at) = parse_timestamp(raw_timestamp) else {
        return Skip(SkipReason::InvalidTimestamp);
    };

    NormalizeOutcome::Record(MeasurementRecord {
        pollutant: Pollutant::from_code(pollutant_code.clone(), unit.clone()),
        measurement: Measurement {
            stream: stream.clone(),
            site_code,
            pollutant_code,
            observed_at,
            value,
            unit,
            external_id: id_value(obj.get("id")),
            ingested_at: Utc::now(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use test_case::test_case;

    fn sites() -> SiteIndex {
        ["2178", "8118"]
            .into_iter()
            .map(|c| SiteCode::new(c).unwrap())
            .collect()
    }

    fn normalize(raw: Value) -> NormalizeOutcome<MeasurementRecord> {
        normalize_measurement(&raw, &sites(), &StreamKey::default())
    }

    #[test]
    fn test_v2_measurement() {
        let record = normalize(json!({
            "id": 555,
            "locationId": 2178,
            "parameter": "PM25",
            "value": 12.5,
            "unit": "µg/m³",
            "date": {"utc": "2024-01-01T10:00:00Z", "local": "2024-01-01T03:00:00-07:00"}
        }))
        .record()
        .unwrap();

        let m = &record.measurement;
        assert_eq!(m.site_code.as_str(), "2178");
        assert_eq!(m.pollutant_code.as_str(), "pm25");
        assert_eq!(m.value, 12.5);
        assert_eq!(m.unit, "µg/m³");
        assert_eq!(m.external_id.as_deref(), Some("555"));
        assert_eq!(
            m.observed_at,
            Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
        );
        assert_eq!(record.pollutant.name, "Pm25");
        assert_eq!(record.pollutant.unit, "µg/m³");
    }

    #[test]
    fn test_v3_parameter_object_and_datetime() {
        let record = normalize(json!({
            "location_id": "8118",
            "parameter": {"id": 2, "name": "no2", "units": "ppm"},
            "value": "0.031",
            "datetime": {"utc": "2024-02-03T04:05:06Z"}
        }))
        .record()
        .unwrap();

        assert_eq!(record.measurement.pollutant_code.as_str(), "no2");
        assert_eq!(record.measurement.unit, "ppm");
        assert_eq!(record.measurement.value, 0.031);
        assert_eq!(record.measurement.external_id, None);
    }

    #[test]
    fn test_local_timestamp_fallback() {
        let record = normalize(json!({
            "locationId": 2178,
            "parameter": "o3",
            "value": 0,
            "date": {"local": "2024-01-01T12:00:00+02:00"}
        }))
        .record()
        .unwrap();

        assert_eq!(
            record.measurement.observed_at,
            Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
        );
        assert_eq!(record.measurement.value, 0.0);
        assert_eq!(record.measurement.unit, "");
    }

    #[test_case(json!([1, 2]), SkipReason::NotAnObject ; "not an object")]
    #[test_case(json!({"parameter": "pm25", "value": 1, "date": {"utc": "2024-01-01T00:00:00Z"}}), SkipReason::MissingSiteId ; "missing site")]
    #[test_case(json!({"locationId": 1, "parameter": "pm25", "value": 1, "date": {"utc": "2024-01-01T00:00:00Z"}}), SkipReason::UnknownSite ; "unknown site")]
    #[test_case(json!({"locationId": 2178, "value": 1, "date": {"utc": "2024-01-01T00:00:00Z"}}), SkipReason::MissingPollutant ; "missing pollutant")]
    #[test_case(json!({"locationId": 2178, "parameter": "  ", "value": 1, "date": {"utc": "2024-01-01T00:00:00Z"}}), SkipReason::MissingPollutant ; "blank pollutant")]
    #[test_case(json!({"locationId": 2178, "parameter": "pm25", "date": {"utc": "2024-01-01T00:00:00Z"}}), SkipReason::MissingValue ; "missing value")]
    #[test_case(json!({"locationId": 2178, "parameter": "pm25", "value": null, "date": {"utc": "2024-01-01T00:00:00Z"}}), SkipReason::MissingValue ; "null value")]
    #[test_case(json!({"locationId": 2178, "parameter": "pm25", "value": -3.2, "date": {"utc": "2024-01-01T00:00:00Z"}}), SkipReason::InvalidValue ; "negative value")]
    #[test_case(json!({"locationId": 2178, "parameter": "pm25", "value": "n/a", "date": {"utc": "2024-01-01T00:00:00Z"}}), SkipReason::InvalidValue ; "non numeric value")]
    #[test_case(json!({"locationId": 2178, "parameter": "pm25", "value": true, "date": {"utc": "2024-01-01T00:00:00Z"}}), SkipReason::InvalidValue ; "boolean value")]
    #[test_case(json!({"locationId": 2178, "parameter": "pm25", "value": 1}), SkipReason::MissingTimestamp ; "missing timestamp")]
    #[test_case(json!({"locationId": 2178, "parameter": "pm25", "value": 1, "date": {"utc": "soon"}}), SkipReason::InvalidTimestamp ; "invalid timestamp")]
    fn test_skips(raw: Value, expected: SkipReason) {
        assert_eq!(normalize(raw).skip_reason(), Some(expected));
    }

    #[test_case(json!({"locationId": null, "location_id": 2178}) ; "null location id")]
    #[test_case(json!({"locationId": "", "location_id": "2178"}) ; "empty location id")]
    fn test_site_falls_back_to_snake_case_key(mut raw: Value) {
        raw["parameter"] = json!("pm25");
        raw["value"] = json!(4.0);
        raw["date"] = json!({"utc": "2024-01-01T00:00:00Z"});

        let record = normalize(raw).record().unwrap();
        assert_eq!(record.measurement.site_code.as_str(), "2178");
    }

    #[test]
    fn test_nan_string_is_invalid() {
        let outcome = normalize(json!({
            "locationId": 2178,
            "parameter": "pm25",
            "value": "NaN",
            "date": {"utc": "2024-01-01T00:00:00Z"}
        }));
        assert_eq!(outcome.skip_reason(), Some(SkipReason::InvalidValue));
    }
}
