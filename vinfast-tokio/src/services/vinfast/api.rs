//! Wrapper around VinFast's connected car API

use std::time::Duration;

use chrono::{DateTime, Utc};
use opentelemetry::{global, metrics::Counter, KeyValue};
use reqwest::{header, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tap::Pipe;
use thiserror::Error;
use tracing::{debug, info};
use vinfast_common::{
    datetime::{add_duration, duration},
    region::Region,
    telemetry::Snapshot,
};

/// A set of meter counters for the VinFast API
#[derive(Debug)]
pub struct Meters {
    auth_requests: Counter<u64>,
    vehicle_requests: Counter<u64>,
}

impl Meters {
    /// Create a new set of meter counters
    #[must_use]
    pub fn new() -> Self {
        let meter = global::meter("vinfast::api");

        Meters {
            auth_requests: meter.u64_counter("auth_requests").build(),
            vehicle_requests: meter.u64_counter("vehicle_requests").build(),
        }
    }
}

impl Default for Meters {
    fn default() -> Self {
        Self::new()
    }
}

/// Something that can be counted by the meters.
trait MeterStatus {
    fn meter_status(&self) -> &'static str;
}

fn increment_count<U, E: MeterStatus>(
    counter: &Counter<u64>,
    region: Region,
    operation: &'static str,
    result: Result<U, E>,
) -> Result<U, E> {
    let status = match &result {
        Ok(_) => "successful",
        Err(err) => err.meter_status(),
    };

    let attributes = [
        KeyValue::new("region", region.as_str()),
        KeyValue::new("operation", operation),
        KeyValue::new("status", status),
    ];
    counter.add(1, &attributes);
    result
}

/// The URLs and client identity used for one region.
#[derive(Debug, Clone)]
pub struct Endpoints {
    region: Region,
    token_url: Url,
    api_base: Url,
    client_id: &'static str,
    audience: &'static str,
}

/// An endpoint URL could not be built.
#[derive(Debug, Error)]
#[error("Invalid URL {0}: {1}")]
pub struct InvalidUrl(String, url::ParseError);

fn parse_url(url: &str) -> Result<Url, InvalidUrl> {
    Url::parse(url).map_err(|e| InvalidUrl(url.to_string(), e))
}

impl Endpoints {
    /// The production endpoints of a region.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl` if the region table holds an unparsable URL.
    pub fn for_region(region: Region) -> Result<Self, InvalidUrl> {
        let config = region.config();
        Ok(Self {
            region,
            token_url: parse_url(&format!("https://{}/oauth/token", config.auth0_domain))?,
            api_base: parse_url(config.api_base)?,
            client_id: config.auth0_client_id,
            audience: config.auth0_audience,
        })
    }

    /// Send both identity and API requests to another server, keeping the
    /// region's client id and audience. Used for proxies and tests.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl` if `base` is not a valid URL.
    pub fn with_base_url(self, base: &str) -> Result<Self, InvalidUrl> {
        let api_base = parse_url(base)?;
        let token_url = api_base
            .join("oauth/token")
            .map_err(|e| InvalidUrl(base.to_string(), e))?;
        Ok(Self {
            token_url,
            api_base,
            ..self
        })
    }

    /// The region these endpoints belong to.
    #[must_use]
    pub const fn region(&self) -> Region {
        self.region
    }

    /// The Auth0 token endpoint.
    #[must_use]
    pub const fn token_url(&self) -> &Url {
        &self.token_url
    }

    /// The connected car API base.
    #[must_use]
    pub const fn api_base(&self) -> &Url {
        &self.api_base
    }

    fn api_url(&self, path: &str) -> Result<Url, FetchError> {
        self.api_base
            .join(path)
            .map_err(|e| FetchError::Permanent(format!("Invalid API path {path}: {e}")))
    }
}

/// Login details for one VinFast account.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    /// Account email address.
    pub email: String,
    password: String,
}

impl Credentials {
    /// Create credentials.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[censored]")
            .finish()
    }
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    audience: &'a str,
    username: &'a str,
    password: &'a str,
    scope: &'static str,
}

#[derive(Serialize)]
struct RefreshGrant<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    refresh_token: &'a str,
}

/// Raw token from Auth0
#[derive(Deserialize)]
struct RawToken {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: u64,
}

#[derive(Deserialize)]
struct Auth0Error {
    error: String,
    error_description: Option<String>,
}

impl Auth0Error {
    fn describe(self) -> String {
        match self.error_description {
            Some(description) => format!("{}: {description}", self.error),
            None => self.error,
        }
    }
}

/// Token to access the VinFast API
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Token {
    access_token: String,
    refresh_token: Option<String>,

    /// Time we should renew the token.
    pub renew_at: DateTime<Utc>,

    /// Time when the token expires.
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"[censored]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[censored]"),
            )
            .field("renew_at", &self.renew_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl Token {
    /// Renew this long before the token expires.
    const RENEW_MARGIN: Duration = duration::minutes(5);

    /// Create a token that expires after `expires_in`.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        now: DateTime<Utc>,
        expires_in: Duration,
    ) -> Self {
        let margin = Self::RENEW_MARGIN.min(expires_in / 2);
        Self {
            access_token: access_token.into(),
            refresh_token,
            renew_at: add_duration(now, expires_in.saturating_sub(margin)),
            expires_at: add_duration(now, expires_in),
        }
    }

    fn from_raw(raw: RawToken, now: DateTime<Utc>) -> Self {
        Self::new(
            raw.access_token,
            raw.refresh_token,
            now,
            Duration::from_secs(raw.expires_in),
        )
    }

    /// Should the token be renewed before use?
    #[must_use]
    pub fn needs_renewal(&self, now: DateTime<Utc>) -> bool {
        now >= self.renew_at
    }

    /// Has the token expired?
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Can this token be renewed without the password?
    #[must_use]
    pub const fn has_refresh_token(&self) -> bool {
        self.refresh_token.is_some()
    }
}

/// Error when getting or renewing a token
#[derive(Debug, Error)]
pub enum AuthError {
    /// The identity provider rejected the credentials or refresh token.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Reqwest error
    #[error("Reqwest error: {0}")]
    Network(#[from] reqwest::Error),

    /// Rate limit error
    #[error("Rate limit error, retry in: {}", duration::to_string(.0))]
    RateLimit(Duration),

    /// The identity provider failed.
    #[error("Identity provider error {0}: {1}")]
    Server(StatusCode, String),
}

impl MeterStatus for AuthError {
    fn meter_status(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials(_) => "invalid_credentials",
            AuthError::RateLimit(_) => "rate_limited",
            AuthError::Network(_) | AuthError::Server(_, _) => "error",
        }
    }
}

/// Error when fetching data for a vehicle
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum FetchError {
    /// The token was rejected, re-authenticate before trying again.
    #[error("Unauthorized, token expired or revoked")]
    Unauthorized,

    /// Network or server trouble, try again at the next tick.
    #[error("Transient error: {0}")]
    Transient(String),

    /// The request can never succeed as configured.
    #[error("Permanent error: {0}")]
    Permanent(String),
}

impl MeterStatus for FetchError {
    fn meter_status(&self) -> &'static str {
        match self {
            FetchError::Unauthorized => "unauthorized",
            FetchError::Transient(_) => "transient",
            FetchError::Permanent(_) => "permanent",
        }
    }
}

impl FetchError {
    /// Classify an unsuccessful HTTP status.
    #[must_use]
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = if body.is_empty() {
            status.to_string()
        } else {
            format!("{status}: {body}")
        };

        match status {
            StatusCode::UNAUTHORIZED => FetchError::Unauthorized,
            StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
                FetchError::Transient(message)
            }
            status if status.is_server_error() => FetchError::Transient(message),
            _ => FetchError::Permanent(message),
        }
    }
}

fn retry_after(headers: &header::HeaderMap) -> Duration {
    headers
        .get(header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(60)
        .pipe(Duration::from_secs)
}

/// A vehicle registered to the account
#[derive(Deserialize, Debug, Clone, Eq, PartialEq)]
pub struct Vehicle {
    /// Vehicle identification number.
    #[serde(rename = "vinCode")]
    pub vin: String,

    /// Name given by the owner.
    #[serde(rename = "vehicleName", default)]
    pub name: Option<String>,

    /// Model name, e.g. "VF 8".
    #[serde(rename = "marketingName", default)]
    pub model: Option<String>,
}

#[derive(Deserialize, Debug)]
struct DataResponse<T> {
    data: T,
}

/// Client for one region's identity provider and API.
#[derive(Debug)]
pub struct Client {
    http: reqwest::Client,
    endpoints: Endpoints,
    meters: Meters,
}

const AUTH_SCOPE: &str = "openid profile email offline_access";

impl Client {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be initialised.
    pub fn new(endpoints: Endpoints) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("vinfast-tokio/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoints,
            meters: Meters::new(),
        })
    }

    /// The endpoints in use.
    #[must_use]
    pub const fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    async fn request_token<T: Serialize + Sync>(&self, body: &T) -> Result<RawToken, AuthError> {
        let response = self
            .http
            .post(self.endpoints.token_url.clone())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return response.json().await.map_err(AuthError::from);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_time = retry_after(response.headers());
            info!(
                "Got 429 rate limited, retry in: {}",
                duration::to_string(&retry_time)
            );
            return Err(AuthError::RateLimit(retry_time));
        }

        let text = response.text().await.unwrap_or_default();
        let reason = serde_json::from_str::<Auth0Error>(&text).map_or(text, Auth0Error::describe);

        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(AuthError::InvalidCredentials(reason))
            }
            status => Err(AuthError::Server(status, reason)),
        }
    }

    /// Exchange email and password for a token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the login was refused.
    /// Returns `AuthError::Network` if the HTTP request failed.
    /// Returns `AuthError::RateLimit` if Auth0 asked us to slow down.
    #[tracing::instrument(skip(self, credentials), fields(region = %self.endpoints.region, email = %credentials.email))]
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<Token, AuthError> {
        debug!("authenticate");
        let body = PasswordGrant {
            grant_type: "password",
            client_id: self.endpoints.client_id,
            audience: self.endpoints.audience,
            username: &credentials.email,
            password: &credentials.password,
            scope: AUTH_SCOPE,
        };

        self.request_token(&body)
            .await
            .pipe(|result| {
                increment_count(
                    &self.meters.auth_requests,
                    self.endpoints.region,
                    "password",
                    result,
                )
            })
            .map(|raw| Token::from_raw(raw, Utc::now()))
    }

    /// Get a new token using the refresh token.
    ///
    /// Auth0 may not rotate the refresh token, in which case the old one is kept.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if there is no refresh token or it was refused.
    /// Returns `AuthError::Network` if the HTTP request failed.
    #[tracing::instrument(skip(self, token), fields(region = %self.endpoints.region))]
    pub async fn renew(&self, token: &Token) -> Result<Token, AuthError> {
        let Some(refresh_token) = &token.refresh_token else {
            return Err(AuthError::InvalidCredentials("no refresh token".to_string()));
        };

        debug!("renew");
        let body = RefreshGrant {
            grant_type: "refresh_token",
            client_id: self.endpoints.client_id,
            refresh_token,
        };

        let raw = self.request_token(&body).await.pipe(|result| {
            increment_count(
                &self.meters.auth_requests,
                self.endpoints.region,
                "refresh",
                result,
            )
        })?;

        let mut new_token = Token::from_raw(raw, Utc::now());
        if new_token.refresh_token.is_none() {
            new_token.refresh_token = Some(refresh_token.clone());
        }
        Ok(new_token)
    }

    async fn get_with_token<U: DeserializeOwned>(
        &self,
        url: Url,
        token: &Token,
        vin: Option<&str>,
    ) -> Result<U, FetchError> {
        debug!("get_with_token: {}", url);

        let mut request = self
            .http
            .get(url)
            .header(header::ACCEPT, "application/json")
            .bearer_auth(&token.access_token);

        if let Some(vin) = vin {
            request = request.header("x-vin-code", vin);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Transient(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(FetchError::from_status(status, &text));
        }

        response
            .json::<DataResponse<U>>()
            .await
            .map(|response| response.data)
            .map_err(|e| FetchError::Transient(format!("Invalid response: {e}")))
    }

    /// Get all the vehicles on the account.
    ///
    /// # Errors
    ///
    /// Returns a `FetchError` classified by cause.
    #[tracing::instrument(skip(self, token), fields(region = %self.endpoints.region))]
    pub async fn list_vehicles(&self, token: &Token) -> Result<Vec<Vehicle>, FetchError> {
        let url = self.endpoints.api_url("ccarusermgnt/api/v1/user-vehicle")?;
        self.get_with_token(url, token, None).await.pipe(|result| {
            increment_count(
                &self.meters.vehicle_requests,
                self.endpoints.region,
                "list_vehicles",
                result,
            )
        })
    }

    /// Get the current telemetry for a vehicle.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Unauthorized` if the token was rejected.
    /// Returns `FetchError::Transient` for network, timeout, rate limit and server errors.
    /// Returns `FetchError::Permanent` for any other client error.
    #[tracing::instrument(skip(self, token), fields(region = %self.endpoints.region))]
    pub async fn fetch(&self, token: &Token, vin: &str) -> Result<Snapshot, FetchError> {
        let url = self
            .endpoints
            .api_url(&format!("ccaraccessmgmt/api/v1/telemetry/{vin}/status"))?;

        self.get_with_token::<serde_json::Value>(url, token, Some(vin))
            .await
            .pipe(|result| {
                increment_count(
                    &self.meters.vehicle_requests,
                    self.endpoints.region,
                    "telemetry",
                    result,
                )
            })
            .map(|data| Snapshot::new(vin, Utc::now(), data))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn client(region: Region, server: &Server) -> Client {
        let endpoints = Endpoints::for_region(region)
            .unwrap()
            .with_base_url(&server.url())
            .unwrap();
        Client::new(endpoints).unwrap()
    }

    fn token_body(access_token: &str, refresh_token: Option<&str>) -> String {
        json!({
            "access_token": access_token,
            "refresh_token": refresh_token,
            "token_type": "Bearer",
            "expires_in": 86400,
        })
        .to_string()
    }

    fn token(access_token: &str) -> Token {
        Token::new(access_token, None, Utc::now(), duration::hours(1))
    }

    #[rstest::rstest]
    #[case(Region::Us)]
    #[case(Region::Eu)]
    #[case(Region::Vn)]
    fn test_endpoints_for_region(#[case] region: Region) {
        let endpoints = Endpoints::for_region(region).unwrap();
        let config = region.config();
        assert_eq!(endpoints.token_url().host_str(), Some(config.auth0_domain));
        assert_eq!(endpoints.token_url().path(), "/oauth/token");
        assert_eq!(
            endpoints.api_base().as_str().trim_end_matches('/'),
            config.api_base
        );
        assert_eq!(endpoints.client_id, config.auth0_client_id);
        assert_eq!(endpoints.audience, config.auth0_audience);
    }

    #[rstest::rstest]
    #[case(Region::Us)]
    #[case(Region::Eu)]
    #[case(Region::Vn)]
    #[tokio::test]
    async fn test_authenticate_uses_region_identity(#[case] region: Region) {
        let mut server = Server::new_async().await;
        let config = region.config();
        let mock = server
            .mock("POST", "/oauth/token")
            .match_body(Matcher::PartialJson(json!({
                "grant_type": "password",
                "client_id": config.auth0_client_id,
                "audience": config.auth0_audience,
                "username": "me@example.com",
                "password": "hunter2",
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(token_body("access-1", Some("refresh-1")))
            .create_async()
            .await;

        let client = client(region, &server);
        let credentials = Credentials::new("me@example.com", "hunter2");
        let token = client.authenticate(&credentials).await.unwrap();

        assert_eq!(token.access_token, "access-1");
        assert!(token.has_refresh_token());
        assert!(!token.needs_renewal(Utc::now()));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_authenticate_invalid_credentials() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/oauth/token")
            .with_status(403)
            .with_body(
                json!({
                    "error": "invalid_grant",
                    "error_description": "Wrong email or password."
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = client(Region::Us, &server);
        let result = client
            .authenticate(&Credentials::new("me@example.com", "wrong"))
            .await;

        match result {
            Err(AuthError::InvalidCredentials(reason)) => {
                assert_eq!(reason, "invalid_grant: Wrong email or password.");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_authenticate_rate_limited() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/oauth/token")
            .with_status(429)
            .with_header("retry-after", "120")
            .create_async()
            .await;

        let client = client(Region::Eu, &server);
        let result = client
            .authenticate(&Credentials::new("me@example.com", "hunter2"))
            .await;

        assert!(matches!(result, Err(AuthError::RateLimit(d)) if d == Duration::from_secs(120)));
    }

    #[tokio::test]
    async fn test_renew_keeps_refresh_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth/token")
            .match_body(Matcher::PartialJson(json!({
                "grant_type": "refresh_token",
                "client_id": Region::Vn.config().auth0_client_id,
                "refresh_token": "refresh-1",
            })))
            .with_status(200)
            .with_body(token_body("access-2", None))
            .create_async()
            .await;

        let client = client(Region::Vn, &server);
        let old = Token::new(
            "access-1",
            Some("refresh-1".to_string()),
            Utc::now(),
            duration::minutes(1),
        );
        let new = client.renew(&old).await.unwrap();

        assert_eq!(new.access_token, "access-2");
        assert_eq!(new.refresh_token.as_deref(), Some("refresh-1"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_renew_without_refresh_token() {
        let server = Server::new_async().await;
        let client = client(Region::Us, &server);
        let result = client.renew(&token("access-1")).await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials(_))));
    }

    #[test_log::test(tokio::test)]
    async fn test_fetch_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/ccaraccessmgmt/api/v1/telemetry/VIN123/status")
            .match_header("authorization", "Bearer access-1")
            .match_header("x-vin-code", "VIN123")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "data": {
                        "batteryLevel": 64,
                        "chargingStatus": "Charging",
                        "odometer": 1200,
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = client(Region::Us, &server);
        let snapshot = client.fetch(&token("access-1"), "VIN123").await.unwrap();

        assert_eq!(snapshot.vin, "VIN123");
        assert_eq!(snapshot.telemetry.battery_level, Some(64));
        assert!(snapshot.is_charging());
        assert_eq!(snapshot.raw["odometer"], json!(1200));
        mock.assert_async().await;
    }

    #[rstest::rstest]
    #[case(401, FetchError::Unauthorized)]
    #[case(503, FetchError::Transient("503 Service Unavailable: oops".to_string()))]
    #[case(429, FetchError::Transient("429 Too Many Requests: oops".to_string()))]
    #[case(404, FetchError::Permanent("404 Not Found: oops".to_string()))]
    #[tokio::test]
    async fn test_fetch_errors(#[case] status: usize, #[case] expected: FetchError) {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/ccaraccessmgmt/api/v1/telemetry/VIN123/status")
            .with_status(status)
            .with_body("oops")
            .create_async()
            .await;

        let client = client(Region::Us, &server);
        let result = client.fetch(&token("access-1"), "VIN123").await;
        assert_eq!(result.unwrap_err(), expected);
    }

    #[tokio::test]
    async fn test_fetch_invalid_body_is_transient() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/ccaraccessmgmt/api/v1/telemetry/VIN123/status")
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let client = client(Region::Us, &server);
        let result = client.fetch(&token("access-1"), "VIN123").await;
        assert!(matches!(result, Err(FetchError::Transient(_))));
    }

    #[tokio::test]
    async fn test_fetch_unreachable_is_transient() {
        let endpoints = Endpoints::for_region(Region::Us)
            .unwrap()
            .with_base_url("http://127.0.0.1:1")
            .unwrap();
        let client = Client::new(endpoints).unwrap();
        let result = client.fetch(&token("access-1"), "VIN123").await;
        assert!(matches!(result, Err(FetchError::Transient(_))));
    }

    #[tokio::test]
    async fn test_list_vehicles() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/ccarusermgnt/api/v1/user-vehicle")
            .match_header("authorization", "Bearer access-1")
            .with_status(200)
            .with_body(
                json!({
                    "data": [
                        {"vinCode": "VIN1", "vehicleName": "Blue", "marketingName": "VF 8"},
                        {"vinCode": "VIN2"}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = client(Region::Us, &server);
        let vehicles = client.list_vehicles(&token("access-1")).await.unwrap();
        assert_eq!(vehicles.len(), 2);
        assert_eq!(vehicles[0].vin, "VIN1");
        assert_eq!(vehicles[0].model.as_deref(), Some("VF 8"));
        assert_eq!(vehicles[1].name, None);
    }

    #[test]
    fn test_token_renewal_times() {
        let now = Utc::now();
        let token = Token::new("a", None, now, duration::hours(1));
        assert!(!token.needs_renewal(now));
        assert!(token.needs_renewal(add_duration(now, duration::minutes(56))));
        assert!(!token.is_expired(add_duration(now, duration::minutes(56))));
        assert!(token.is_expired(add_duration(now, duration::hours(1))));
    }

    #[test]
    fn test_debug_censors_secrets() {
        let credentials = Credentials::new("me@example.com", "hunter2");
        let token = Token::new(
            "secret-access",
            Some("secret-refresh".into()),
            Utc::now(),
            duration::hours(1),
        );
        let output = format!("{credentials:?} {token:?}");
        assert!(!output.contains("hunter2"));
        assert!(!output.contains("secret-access"));
        assert!(!output.contains("secret-refresh"));
        assert!(output.contains("me@example.com"));
    }
}
