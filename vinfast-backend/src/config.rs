use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    time::Duration,
};

use envconfig::Envconfig;
use serde::Deserialize;
use thiserror::Error;
use vinfast_common::{
    datetime::with_duration,
    entities::Id,
    region::Region,
    schedule::{Schedule, ScheduleError, UPDATE_INTERVAL_CHARGING, UPDATE_INTERVAL_NORMAL},
};
use vinfast_tokio::services::{persistent_state, vinfast::api::Credentials};

use crate::{logging, yaml};

#[derive(Envconfig)]
pub struct Environment {
    #[envconfig(from = "CONFIG_FILE")]
    pub config_file: PathBuf,

    #[envconfig(from = "SECRETS_FILE")]
    pub secrets_file: Option<PathBuf>,
}

fn load_file(filename: &Path) -> Result<serde_yml::Value, Error> {
    let f = std::fs::File::open(filename).map_err(|e| Error::File(filename.to_path_buf(), e))?;
    let config: serde_yml::Value =
        serde_yml::from_reader(f).map_err(|e| Error::Yaml(filename.to_path_buf(), e))?;

    Ok(config)
}

impl Environment {
    /// Load and merge the config and secrets files.
    pub fn config(&self) -> Result<Config, Error> {
        let config = load_file(&self.config_file)?;

        let config = if let Some(secrets_file) = &self.secrets_file {
            let secrets = load_file(secrets_file)?;
            yaml::merge_yaml(config, secrets)?
        } else {
            config
        };

        let config: Config = serde_yml::from_value(config)
            .map_err(|e| Error::Yaml(self.config_file.clone(), e))?;

        config.validate()?;
        Ok(config)
    }

    /// Load the environment from the environment variables.
    pub fn load() -> Result<Self, envconfig::Error> {
        Self::init_from_env()
    }
}

#[derive(Deserialize, Debug)]
pub struct Config {
    #[serde(default)]
    pub logging: logging::Config,
    pub persistent_state: persistent_state::Config,
    pub vehicles: Vec<VehicleConfig>,
}

const fn default_update_interval() -> Duration {
    UPDATE_INTERVAL_NORMAL
}

const fn default_charging_update_interval() -> Duration {
    UPDATE_INTERVAL_CHARGING
}

#[derive(Deserialize, Debug)]
pub struct VehicleConfig {
    pub id: Id,

    #[serde(default)]
    pub region: Region,

    #[serde(flatten)]
    pub credentials: Credentials,

    /// First vehicle on the account if not given.
    #[serde(default)]
    pub vin: Option<String>,

    #[serde(with = "with_duration", default = "default_update_interval")]
    pub update_interval: Duration,

    #[serde(with = "with_duration", default = "default_charging_update_interval")]
    pub charging_update_interval: Duration,
}

impl VehicleConfig {
    pub fn schedule(&self) -> Result<Schedule, ScheduleError> {
        Schedule::new(self.update_interval, self.charging_update_interval)
    }
}

impl Config {
    fn validate(&self) -> Result<(), Error> {
        if self.vehicles.is_empty() {
            return Err(Error::NoVehicles);
        }

        let mut ids = HashSet::new();
        for vehicle in &self.vehicles {
            if !ids.insert(&vehicle.id) {
                return Err(Error::DuplicateId(vehicle.id.clone()));
            }
            vehicle
                .schedule()
                .map_err(|e| Error::Schedule(vehicle.id.clone(), e))?;
        }

        Ok(())
    }
}

/// An error loading the Config
#[derive(Error, Debug)]
pub enum Error {
    /// Error reading the file
    #[error("Error reading file {0}: {1}")]
    File(PathBuf, std::io::Error),

    /// Error parsing the file
    #[error("Error parsing file {0}: {1}")]
    Yaml(PathBuf, serde_yml::Error),

    /// Error merging the files
    #[error("Error merging files: {0}")]
    Merge(#[from] yaml::Error),

    #[error("No vehicles configured")]
    NoVehicles,

    #[error("Vehicle {0} configured more than once")]
    DuplicateId(Id),

    #[error("Vehicle {0}: {1}")]
    Schedule(Id, ScheduleError),
}
