use std::time::Duration;

use crate::hal::wifi::WifiCredentials;
use crate::hal::Platform;
use crate::svc::clock::{Clock, Instant};
use crate::svc::connection::{ConnectRequest, ConnectionManager, ConnectionStatus};
use crate::svc::storage::NonvolatileStore;

const RETRY_PERIOD: Duration = Duration::from_secs(30);

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct SystemState {
    pub connection: ConnectionStatus,
    pub configured: bool,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum AppState {
    Init,
    Unconfigured,
    Connecting,
    Online,
    Offline { since: Instant },
}

pub struct App<'a> {
    store: NonvolatileStore<'a>,
    connection: ConnectionManager<'a>,
    clock: &'a dyn Clock,
    credentials: WifiCredentials,
    state: AppState,
}

impl<'a> App<'a> {
    pub fn new(platform: &'a dyn Platform, clock: &'a dyn Clock) -> Self {
        let store = NonvolatileStore::new(platform.eeprom());
        let connection = ConnectionManager::new(platform.wifi(), clock, platform.delay());

        Self {
            store,
            connection,
            clock,
            credentials: WifiCredentials::default(),
            state: AppState::Init,
        }
    }

    pub fn update(&mut self) {
        let new_state = match self.state {
            AppState::Init => self.update_init(),
            AppState::Unconfigured => AppState::Unconfigured,
            AppState::Connecting => self.update_connecting(),
            AppState::Online => self.update_online(),
            AppState::Offline { since } => self.update_offline(since),
        };

        if new_state != self.state {
            log::debug!("{:?}", &new_state);
            self.state = new_state;
        }
    }

    pub fn system_state(&self) -> SystemState {
        SystemState {
            connection: self.connection.status(),
            configured: self.credentials.is_set,
        }
    }

    pub fn store(&self) -> &NonvolatileStore<'a> {
        &self.store
    }

    fn update_init(&mut self) -> AppState {
        let stored = self.store.get_wifi_auth();

        self.credentials = if stored.is_set {
            stored
        } else if let Ok(fallback) = WifiCredentials::from_env_var() {
            log::info!("Using fallback Wi-Fi credentials");
            fallback
        } else {
            log::warn!("No Wi-Fi credentials configured");
            return AppState::Unconfigured;
        };

        self.start_connection()
    }

    fn update_connecting(&mut self) -> AppState {
        if self.connection.is_connected() {
            log::info!("Connected to {}", self.credentials.ssid);
            AppState::Online
        } else if self.connection.is_timed_out() {
            log::error!("Connection to {} timed out", self.credentials.ssid);
            AppState::Offline {
                since: self.clock.now(),
            }
        } else {
            AppState::Connecting
        }
    }

    fn update_online(&mut self) -> AppState {
        if self.connection.is_connected() {
            AppState::Online
        } else {
            log::warn!("Connection lost");
            self.start_connection()
        }
    }

    fn update_offline(&mut self, since: Instant) -> AppState {
        let elapsed = self.clock.now().millis_since(since);
        if u64::from(elapsed) >= RETRY_PERIOD.as_millis() as u64 {
            AppState::Init
        } else {
            AppState::Offline { since }
        }
    }

    fn start_connection(&mut self) -> AppState {
        let request =
            ConnectRequest::new(&self.credentials.ssid, &self.credentials.password).non_blocking();

        match self.connection.connect(&request) {
            Ok(_) => AppState::Connecting,
            Err(e) => {
                log::error!("{e}");
                AppState::Offline {
                    since: self.clock.now(),
                }
            }
        }
    }
}
