#![allow(dead_code)]
use std::sync::Once;

use chrono::Utc;
use serde_json::json;
use vinfast_common::{datetime::duration, entities::Id, region::Region, schedule::Schedule};
use vinfast_tokio::services::vinfast::{
    api::{Client, Credentials, Endpoints, Token},
    poller::Poller,
};

static INIT: Once = Once::new();

pub const VIN: &str = "VIN123";
pub const STATUS_PATH: &str = "/ccaraccessmgmt/api/v1/telemetry/VIN123/status";

pub fn setup() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("debug,hyper=error,reqwest=error")
            .with_test_writer()
            .init();
    });
}

pub fn client(region: Region, url: &str) -> Client {
    let endpoints = Endpoints::for_region(region)
        .unwrap()
        .with_base_url(url)
        .unwrap();
    Client::new(endpoints).unwrap()
}

pub fn token(access_token: &str) -> Token {
    Token::new(access_token, None, Utc::now(), duration::hours(1))
}

pub fn poller(region: Region, url: &str) -> Poller {
    Poller::new(
        Id::new("vf8"),
        client(region, url),
        Credentials::new("me@example.com", "hunter2"),
        Some(VIN.to_string()),
        Schedule::default(),
    )
}

pub fn telemetry_body(charging_status: &str) -> String {
    json!({
        "data": {
            "chargingStatus": charging_status,
            "batteryLevel": 72,
            "odometer": 4321.5,
        }
    })
    .to_string()
}

pub fn token_body(access_token: &str) -> String {
    json!({
        "access_token": access_token,
        "refresh_token": "refresh",
        "token_type": "Bearer",
        "expires_in": 86400,
    })
    .to_string()
}
