//! Poll one vehicle on a charging aware schedule.
use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::{
    select,
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::{sleep_until, Instant},
};
use tracing::{debug, error, info, warn};
use vinfast_common::{
    datetime::add_duration,
    entities::Id,
    schedule::{PollMode, Schedule},
    telemetry::Snapshot,
};

use super::api::{AuthError, Client, Credentials, FetchError, Token};
use crate::{
    pipes::{stateful, RecvError, PIPE_SIZE},
    services::persistent_state::{self, PersistentStateRow},
    spawn,
};

/// Why a poll did not produce a snapshot.
#[derive(Debug, Error)]
pub enum PollError {
    /// Could not get a token.
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// Could not get the telemetry.
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// No VIN configured and the account has no vehicles.
    #[error("No vehicles registered to the account")]
    NoVehicles,
}

impl PollError {
    /// Errors that need the operator to reconfigure before polling again.
    #[must_use]
    pub const fn pauses(&self) -> bool {
        matches!(
            self,
            PollError::Auth(AuthError::InvalidCredentials(_))
                | PollError::Fetch(FetchError::Permanent(_))
                | PollError::NoVehicles
        )
    }
}

/// Result of one poll.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// New telemetry was fetched.
    Updated(Arc<Snapshot>),

    /// The poll failed, the previous snapshot is kept and we try again next tick.
    Failed(String),

    /// The poller is paused and will not poll until reconfigured.
    Paused(String),
}

/// Externally visible state of a poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollStatus {
    /// Interval mode from the last successful snapshot.
    pub mode: PollMode,

    /// Interval in effect.
    pub interval: Duration,

    /// When the next scheduled poll happens.
    pub next_poll_at: Option<DateTime<Utc>>,

    /// Error from the most recent poll, cleared on success.
    pub last_error: Option<String>,

    /// Reason the poller is paused, if it is.
    pub paused: Option<String>,

    /// Time of the last successful fetch.
    pub last_success: Option<DateTime<Utc>>,
}

/// Polling state for one vehicle.
pub struct Poller {
    id: Id,
    client: Client,
    credentials: Credentials,
    token: Option<Token>,
    token_store: Option<PersistentStateRow<Token>>,
    vin: Option<String>,
    schedule: Schedule,
    snapshot: Option<Arc<Snapshot>>,
    paused: Option<String>,
    last_error: Option<String>,
    last_success: Option<DateTime<Utc>>,
}

impl Poller {
    /// Create a poller for a vehicle. With no VIN the first vehicle on the account is used.
    #[must_use]
    pub const fn new(
        id: Id,
        client: Client,
        credentials: Credentials,
        vin: Option<String>,
        schedule: Schedule,
    ) -> Self {
        Self {
            id,
            client,
            credentials,
            token: None,
            token_store: None,
            vin,
            schedule,
            snapshot: None,
            paused: None,
            last_error: None,
            last_success: None,
        }
    }

    /// Start with a known token.
    #[must_use]
    pub fn with_token(mut self, token: Token) -> Self {
        self.token = Some(token);
        self
    }

    /// Cache tokens on disk, loading any previously saved token.
    #[must_use]
    pub fn with_token_store(mut self, store: PersistentStateRow<Token>) -> Self {
        match store.load() {
            Ok(token) if !token.is_expired(Utc::now()) || token.has_refresh_token() => {
                debug!("{}: loaded cached token", self.id);
                self.token = Some(token);
            }
            Ok(_) => debug!("{}: cached token expired", self.id),
            Err(persistent_state::Error::NotFound(_)) => {}
            Err(err) => warn!("{}: cannot load cached token: {err}", self.id),
        }
        self.token_store = Some(store);
        self
    }

    /// The vehicle this poller is for.
    #[must_use]
    pub const fn id(&self) -> &Id {
        &self.id
    }

    /// The last successful snapshot.
    #[must_use]
    pub const fn snapshot(&self) -> Option<&Arc<Snapshot>> {
        self.snapshot.as_ref()
    }

    /// The interval mode implied by the last successful snapshot.
    #[must_use]
    pub fn mode(&self) -> PollMode {
        PollMode::from_snapshot(self.snapshot.as_deref())
    }

    /// How long to wait before the next scheduled poll.
    #[must_use]
    pub fn next_interval(&self) -> Duration {
        self.schedule.next_interval(self.snapshot.as_deref())
    }

    /// Is polling suspended until new credentials arrive?
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused.is_some()
    }

    /// Current status.
    #[must_use]
    pub fn status(&self, next_poll_at: Option<DateTime<Utc>>) -> PollStatus {
        PollStatus {
            mode: self.mode(),
            interval: self.next_interval(),
            next_poll_at,
            last_error: self.last_error.clone(),
            paused: self.paused.clone(),
            last_success: self.last_success,
        }
    }

    /// Replace the credentials. Clears the pause and any token from the old account.
    pub fn set_credentials(&mut self, credentials: Credentials) {
        info!("{}: credentials updated for {}", self.id, credentials.email);
        self.credentials = credentials;
        self.paused = None;
        self.forget_token();
    }

    /// Poll once.
    ///
    /// The snapshot is only replaced on success.
    pub async fn poll(&mut self) -> PollOutcome {
        if let Some(reason) = &self.paused {
            debug!("{}: paused, not polling: {reason}", self.id);
            return PollOutcome::Paused(reason.clone());
        }

        match self.try_poll().await {
            Ok(snapshot) => {
                info!(
                    "{}: got telemetry, charging={}",
                    self.id,
                    snapshot.is_charging()
                );
                self.last_error = None;
                self.last_success = Some(snapshot.fetched_at);
                self.snapshot = Some(snapshot.clone());
                PollOutcome::Updated(snapshot)
            }
            Err(err) if err.pauses() => {
                let message = err.to_string();
                error!("{}: pausing poller: {message}", self.id);
                self.last_error = Some(message.clone());
                self.paused = Some(message.clone());
                PollOutcome::Paused(message)
            }
            Err(err) => {
                let message = err.to_string();
                warn!("{}: poll failed, will retry: {message}", self.id);
                self.last_error = Some(message.clone());
                PollOutcome::Failed(message)
            }
        }
    }

    async fn try_poll(&mut self) -> Result<Arc<Snapshot>, PollError> {
        let token = self.valid_token().await?;
        match self.fetch_with(&token).await {
            Err(PollError::Fetch(FetchError::Unauthorized)) => {
                info!("{}: token rejected, authenticating again", self.id);
                self.forget_token();
                let token = self.login().await?;
                let result = self.fetch_with(&token).await;
                if matches!(result, Err(PollError::Fetch(FetchError::Unauthorized))) {
                    warn!("{}: new token rejected as well", self.id);
                    self.forget_token();
                }
                result
            }
            result => result,
        }
    }

    async fn fetch_with(&mut self, token: &Token) -> Result<Arc<Snapshot>, PollError> {
        let vin = self.vin(token).await?;
        let snapshot = self.client.fetch(token, &vin).await?;
        Ok(Arc::new(snapshot))
    }

    async fn vin(&mut self, token: &Token) -> Result<String, PollError> {
        if let Some(vin) = &self.vin {
            return Ok(vin.clone());
        }

        let vehicle = self
            .client
            .list_vehicles(token)
            .await?
            .into_iter()
            .next()
            .ok_or(PollError::NoVehicles)?;

        info!("{}: using first vehicle on account {}", self.id, vehicle.vin);
        self.vin = Some(vehicle.vin.clone());
        Ok(vehicle.vin)
    }

    async fn valid_token(&mut self) -> Result<Token, PollError> {
        let now = Utc::now();
        let Some(token) = self.token.clone() else {
            return self.login().await;
        };

        if !token.needs_renewal(now) {
            return Ok(token);
        }

        if !token.has_refresh_token() {
            return match self.login().await {
                Err(PollError::Auth(ref err))
                    if !matches!(err, AuthError::InvalidCredentials(_))
                        && !token.is_expired(now) =>
                {
                    warn!("{}: login failed, using current token: {err}", self.id);
                    Ok(token)
                }
                result => result,
            };
        }

        match self.client.renew(&token).await {
            Ok(new_token) => {
                self.store_token(new_token.clone());
                Ok(new_token)
            }
            Err(AuthError::InvalidCredentials(reason)) => {
                info!("{}: refresh rejected ({reason}), logging in", self.id);
                self.forget_token();
                self.login().await
            }
            Err(err) if !token.is_expired(now) => {
                warn!("{}: renew failed, using current token: {err}", self.id);
                Ok(token)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn login(&mut self) -> Result<Token, PollError> {
        let token = self.client.authenticate(&self.credentials).await?;
        self.store_token(token.clone());
        Ok(token)
    }

    fn store_token(&mut self, token: Token) {
        if let Some(store) = &self.token_store {
            if let Err(err) = store.save(&token) {
                warn!("{}: cannot save token: {err}", self.id);
            }
        }
        self.token = Some(token);
    }

    fn forget_token(&mut self) {
        self.token = None;
        if let Some(store) = &self.token_store {
            if let Err(err) = store.delete() {
                warn!("{}: cannot delete token: {err}", self.id);
            }
        }
    }
}

/// External charger status used to catch the start of charging early.
pub struct ChargerInput {
    /// Charger state, e.g. from an OCPP charger entity.
    pub status: stateful::Receiver<String>,

    /// The state that means the charger is delivering power.
    pub charging_state: String,
}

impl ChargerInput {
    /// Default state reported by OCPP chargers while charging.
    pub const DEFAULT_CHARGING_STATE: &'static str = "Charging";
}

/// Values published by a running poller.
pub struct Outputs {
    /// Last successful snapshot.
    pub snapshot: stateful::Receiver<Arc<Snapshot>>,

    /// Poller status, updated before every wait.
    pub status: stateful::Receiver<PollStatus>,
}

enum Command {
    Refresh,
    UpdateCredentials(Credentials),
}

/// Control a running poller.
pub struct PollerHandle {
    id: Id,
    tx: mpsc::Sender<Command>,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Ask for an immediate poll.
    ///
    /// Requests made while a poll is running are merged into one follow up poll.
    pub fn refresh(&self) {
        if let Err(err) = self.tx.try_send(Command::Refresh) {
            debug!("{}: refresh not queued: {err}", self.id);
        }
    }

    /// Replace the credentials and poll with them straight away.
    pub async fn update_credentials(&self, credentials: Credentials) {
        if self
            .tx
            .send(Command::UpdateCredentials(credentials))
            .await
            .is_err()
        {
            error!("{}: poller is not running", self.id);
        }
    }

    /// Stop the poller, abandoning any request in flight.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            // The task may have stopped already.
            let _ = stop.send(());
        }
        if let Err(err) = self.task.await {
            error!("{}: poller task failed: {err}", self.id);
        }
        info!("{}: poller stopped", self.id);
    }
}

struct ChargerWatch {
    subscription: stateful::Subscription<String>,
    charging_state: String,
}

/// Wait until the charger enters the charging state.
///
/// Never completes if there is no charger or it has gone away.
async fn charging_started(charger: &mut Option<ChargerWatch>) {
    loop {
        let Some(watch) = charger.as_mut() else {
            return std::future::pending().await;
        };

        match watch.subscription.recv_old_new().await {
            Ok((Some(old), new)) => {
                if new == watch.charging_state && old != watch.charging_state {
                    return;
                }
            }
            Ok((None, _)) => {}
            Err(RecvError::Closed) => {
                debug!("charger input closed");
                *charger = None;
            }
        }
    }
}

enum Trigger {
    Timer,
    Command(Command),
    Charger,
}

/// Run the poller in its own task.
///
/// Polls immediately, then waits for the interval chosen from the last
/// successful snapshot, a manual refresh, or the charger starting.
#[must_use]
pub fn run(poller: Poller, charger: Option<ChargerInput>) -> (PollerHandle, Outputs) {
    let id = poller.id.clone();
    let (snapshot_tx, snapshot_rx) = stateful::create_pipe(format!("{id}/snapshot"));
    let (status_tx, status_rx) = stateful::create_pipe(format!("{id}/status"));
    let (tx, rx) = mpsc::channel(PIPE_SIZE);
    let (stop_tx, stop_rx) = oneshot::channel();

    let task = spawn(poll_loop(
        poller,
        charger,
        rx,
        stop_rx,
        snapshot_tx,
        status_tx,
    ));

    let handle = PollerHandle {
        id,
        tx,
        stop: Some(stop_tx),
        task,
    };

    let outputs = Outputs {
        snapshot: snapshot_rx,
        status: status_rx,
    };

    (handle, outputs)
}

async fn poll_loop(
    mut poller: Poller,
    charger: Option<ChargerInput>,
    mut commands: mpsc::Receiver<Command>,
    mut stop: oneshot::Receiver<()>,
    snapshot_tx: stateful::Sender<Arc<Snapshot>>,
    status_tx: stateful::Sender<PollStatus>,
) {
    let id = poller.id.clone();

    let mut charger = match charger {
        Some(input) => Some(ChargerWatch {
            subscription: input.status.subscribe().await,
            charging_state: input.charging_state,
        }),
        None => None,
    };

    let mut trigger = Trigger::Timer;

    loop {
        match trigger {
            Trigger::Timer => debug!("{id}: scheduled poll"),
            Trigger::Command(Command::Refresh) => info!("{id}: manual refresh"),
            Trigger::Command(Command::UpdateCredentials(credentials)) => {
                poller.set_credentials(credentials);
            }
            Trigger::Charger => info!("{id}: charger started charging, polling now"),
        }

        let outcome = select! {
            biased;
            _ = &mut stop => break,
            outcome = poller.poll() => outcome,
        };

        if let PollOutcome::Updated(snapshot) = outcome {
            snapshot_tx.try_send(snapshot);
        }

        let mut follow_up = false;
        while let Ok(command) = commands.try_recv() {
            if let Command::UpdateCredentials(credentials) = command {
                poller.set_credentials(credentials);
            }
            follow_up = true;
        }

        if follow_up {
            status_tx.try_send(poller.status(Some(Utc::now())));
            trigger = Trigger::Command(Command::Refresh);
            continue;
        }

        let interval = poller.next_interval();
        let next_poll = Instant::now() + interval;
        status_tx.try_send(poller.status(Some(add_duration(Utc::now(), interval))));

        trigger = select! {
            biased;
            _ = &mut stop => break,
            Some(command) = commands.recv() => Trigger::Command(command),
            () = charging_started(&mut charger) => Trigger::Charger,
            () = sleep_until(next_poll) => Trigger::Timer,
        };
    }

    debug!("{id}: poll loop finished");
}
