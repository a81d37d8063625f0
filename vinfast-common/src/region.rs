//! Deployment markets and their fixed endpoints.
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// The market a vehicle account belongs to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    /// United States
    #[default]
    Us,

    /// Europe
    Eu,

    /// Vietnam
    Vn,
}

/// Identity provider and API endpoints for a region.
#[derive(Debug, Eq, PartialEq)]
pub struct RegionConfig {
    /// Human readable name.
    pub name: &'static str,

    /// Auth0 tenant domain.
    pub auth0_domain: &'static str,

    /// Auth0 client id of the mobile app.
    pub auth0_client_id: &'static str,

    /// Auth0 audience requested for the token.
    pub auth0_audience: &'static str,

    /// Base URL of the connected car API.
    pub api_base: &'static str,
}

static US: RegionConfig = RegionConfig {
    name: "United States",
    auth0_domain: "vinfast-us-prod.us.auth0.com",
    auth0_client_id: "xhGY7XKDFSk1Q22rxidvwujfz0EPAbUP",
    auth0_audience: "https://vinfast-us-prod.us.auth0.com/api/v2/",
    api_base: "https://mobile.connected-car.vinfastauto.us",
};

static EU: RegionConfig = RegionConfig {
    name: "Europe",
    auth0_domain: "vinfast-eu-prod.eu.auth0.com",
    auth0_client_id: "dxxtNkkhsPWW78x6s1BWQlmuCfLQrkze",
    auth0_audience: "https://vinfast-eu-prod.eu.auth0.com/api/v2/",
    api_base: "https://mobile.connected-car.vinfastauto.eu",
};

static VN: RegionConfig = RegionConfig {
    name: "Vietnam",
    auth0_domain: "vin3s.au.auth0.com",
    auth0_client_id: "jE5xt50qC7oIh1f32qMzA6hGznIU5mgH",
    auth0_audience: "https://vin3s.au.auth0.com/api/v2/",
    api_base: "https://mobile.connected-car.vinfast.vn",
};

impl Region {
    /// Every supported region.
    pub const ALL: [Region; 3] = [Region::Us, Region::Eu, Region::Vn];

    /// The endpoints for this region.
    #[must_use]
    pub const fn config(self) -> &'static RegionConfig {
        match self {
            Region::Us => &US,
            Region::Eu => &EU,
            Region::Vn => &VN,
        }
    }

    /// The short code used in configuration files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Region::Us => "us",
            Region::Eu => "eu",
            Region::Vn => "vn",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The region code was not recognised.
#[derive(Debug, Error, Eq, PartialEq)]
#[error("Unknown region: {0}")]
pub struct UnknownRegion(pub String);

impl FromStr for Region {
    type Err = UnknownRegion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::ALL
            .into_iter()
            .find(|region| region.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownRegion(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[rstest::rstest]
    #[case(Region::Us, "vinfast-us-prod.us.auth0.com")]
    #[case(Region::Eu, "vinfast-eu-prod.eu.auth0.com")]
    #[case(Region::Vn, "vin3s.au.auth0.com")]
    fn test_audience_matches_domain(#[case] region: Region, #[case] domain: &str) {
        let config = region.config();
        assert_eq!(config.auth0_domain, domain);
        assert_eq!(config.auth0_audience, format!("https://{domain}/api/v2/"));
    }

    #[test]
    fn test_no_shared_client_ids() {
        for a in Region::ALL {
            for b in Region::ALL {
                if a != b {
                    assert_ne!(a.config().auth0_client_id, b.config().auth0_client_id);
                    assert_ne!(a.config().api_base, b.config().api_base);
                }
            }
        }
    }

    #[test]
    fn test_parse_region() {
        assert_eq!("EU".parse::<Region>().unwrap(), Region::Eu);
        assert_eq!(" vn ".parse::<Region>().unwrap(), Region::Vn);
        assert_eq!(
            "au".parse::<Region>().unwrap_err(),
            UnknownRegion("au".to_string())
        );
    }

    #[test]
    fn test_region_serde() {
        let region: Region = serde_json::from_str("\"us\"").unwrap();
        assert_eq!(region, Region::Us);
        assert_eq!(serde_json::to_string(&Region::Vn).unwrap(), "\"vn\"");
        assert_eq!(Region::default(), Region::Us);
    }
}
