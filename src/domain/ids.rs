//! Natural-key identifier types with validation
//!
//! Each record in the store is identified by the key the source system gives
//! it. These newtypes keep the different keys from being mixed up and reject
//! blank values at construction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! natural_key {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Returns the key as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes self and returns the inner String
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::new(s)
            }
        }

        impl From<$name> for String {
            fn from(key: $name) -> Self {
                key.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl $name {
            fn reject_blank(value: &str) -> Result<(), String> {
                if value.trim().is_empty() {
                    return Err(format!("{} cannot be empty", $label));
                }
                Ok(())
            }
        }
    };
}

natural_key!(
    /// Region key, `"{country}|{region name}"`
    ///
    /// # Examples
    ///
    /// ```
    /// use airsync::domain::ids::RegionCode;
    ///
    /// let code = RegionCode::from_parts("DE", "Berlin").unwrap();
    /// assert_eq!(code.as_str(), "DE|Berlin");
    /// ```
    RegionCode,
    "Region code"
);

natural_key!(
    /// Monitoring site key: the location id assigned by the source
    SiteCode,
    "Site code"
);

natural_key!(
    /// Pollutant key: the lower-cased parameter code (e.g. `pm25`, `no2`)
    PollutantCode,
    "Pollutant code"
);

natural_key!(
    /// Logical measurement stream, e.g. `openaq:measurements`
    StreamKey,
    "Stream key"
);

natural_key!(
    /// Alert rule key
    AlertRuleCode,
    "Alert rule code"
);

impl RegionCode {
    /// Creates a new RegionCode
    pub fn new(code: impl Into<String>) -> Result<Self, String> {
        let code = code.into();
        Self::reject_blank(&code)?;
        Ok(Self(code))
    }

    /// Builds the composite region key from a country and a region name
    pub fn from_parts(country: &str, name: &str) -> Result<Self, String> {
        Self::reject_blank(country)?;
        Self::reject_blank(name)?;
        Ok(Self(format!("{country}|{name}")))
    }

    /// Country part of the key
    pub fn country(&self) -> &str {
        self.0.split('|').next().unwrap_or(&self.0)
    }
}

impl SiteCode {
    /// Creates a new SiteCode, trimming surrounding whitespace
    pub fn new(code: impl Into<String>) -> Result<Self, String> {
        let code = code.into();
        Self::reject_blank(&code)?;
        Ok(Self(code.trim().to_string()))
    }
}

impl PollutantCode {
    /// Creates a new PollutantCode
    ///
    /// Codes are case-insensitive at the source, so they are stored lower-cased.
    ///
    /// ```
    /// use airsync::domain::ids::PollutantCode;
    ///
    /// let code = PollutantCode::new(" PM25 ").unwrap();
    /// assert_eq!(code.as_str(), "pm25");
    /// ```
    pub fn new(code: impl Into<String>) -> Result<Self, String> {
        let code = code.into();
        Self::reject_blank(&code)?;
        Ok(Self(code.trim().to_lowercase()))
    }

    /// Human-readable name derived from the code (`pm25` → `Pm25`, `so2_mass` → `So2 Mass`)
    pub fn display_name(&self) -> String {
        self.0
            .split('_')
            .filter(|word| !word.is_empty())
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl StreamKey {
    /// Creates a new StreamKey
    pub fn new(key: impl Into<String>) -> Result<Self, String> {
        let key = key.into();
        Self::reject_blank(&key)?;
        Ok(Self(key))
    }
}

impl Default for StreamKey {
    fn default() -> Self {
        Self("openaq:measurements".to_string())
    }
}

impl AlertRuleCode {
    /// Creates a new AlertRuleCode
    pub fn new(code: impl Into<String>) -> Result<Self, String> {
        let code = code.into();
        Self::reject_blank(&code)?;
        Ok(Self(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_code_from_parts() {
        let code = RegionCode::from_parts("GB", "London").unwrap();
        assert_eq!(code.as_str(), "GB|London");
        assert_eq!(code.country(), "GB");
    }

    #[test]
    fn test_region_code_rejects_blank_parts() {
        assert!(RegionCode::from_parts("", "London").is_err());
        assert!(RegionCode::from_parts("GB", "  ").is_err());
    }

    #[test]
    fn test_site_code_trims() {
        let code = SiteCode::new(" 2178 ").unwrap();
        assert_eq!(code.as_str(), "2178");
    }

    #[test]
    fn test_empty_keys_rejected() {
        assert!(SiteCode::new("").is_err());
        assert!(PollutantCode::new("   ").is_err());
        assert!(StreamKey::new("").is_err());
        assert!(AlertRuleCode::new("").is_err());
    }

    #[test]
    fn test_pollutant_code_normalized() {
        let code = PollutantCode::from_str("NO2").unwrap();
        assert_eq!(code.as_str(), "no2");
        assert_eq!(code, PollutantCode::new("no2").unwrap());
    }

    #[test]
    fn test_pollutant_display_name() {
        assert_eq!(PollutantCode::new("pm25").unwrap().display_name(), "Pm25");
        assert_eq!(
            PollutantCode::new("so2_mass").unwrap().display_name(),
            "So2 Mass"
        );
    }

    #[test]
    fn test_stream_key_default() {
        assert_eq!(StreamKey::default().as_str(), "openaq:measurements");
    }

    #[test]
    fn test_serde_roundtrip_validates() {
        let code: SiteCode = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(code.as_str(), "42");
        assert!(serde_json::from_str::<SiteCode>("\"\"").is_err());
    }
}
