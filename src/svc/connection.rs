use std::time::Duration;

use crate::hal::system::Delay;
use crate::hal::wifi::{StaticIpConfig, Wifi, WifiStatus};
use crate::svc::clock::{Clock, Instant};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct ConnectRequest<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
    pub blocking: bool,
    pub timeout: Duration,
    pub static_ip: Option<StaticIpConfig>,
}

impl<'a> ConnectRequest<'a> {
    pub fn new(ssid: &'a str, password: &'a str) -> Self {
        ConnectRequest {
            ssid,
            password,
            blocking: true,
            timeout: DEFAULT_TIMEOUT,
            static_ip: None,
        }
    }

    pub fn non_blocking(mut self) -> Self {
        self.blocking = false;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_static_ip(mut self, config: StaticIpConfig) -> Self {
        self.static_ip = Some(config);
        self
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, serde::Serialize, serde::Deserialize)]
pub enum ConnectionStatus {
    #[default]
    Idle,
    Connecting,
    Connected,
    TimedOut,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
struct Attempt {
    started: Instant,
    timeout: Duration,
}

pub struct ConnectionManager<'a> {
    wifi: &'a dyn Wifi,
    clock: &'a dyn Clock,
    delay: &'a dyn Delay,
    poll_interval: Duration,
    attempt: Option<Attempt>,
}

impl<'a> ConnectionManager<'a> {
    pub fn new(wifi: &'a dyn Wifi, clock: &'a dyn Clock, delay: &'a dyn Delay) -> Self {
        Self {
            wifi,
            clock,
            delay,
            poll_interval: DEFAULT_POLL_INTERVAL,
            attempt: None,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    // A new request always supersedes the previous attempt, whatever state it
    // ended in. Blocking mode returns true on success and false on timeout;
    // non-blocking mode returns true right after issuing the request and the
    // caller polls is_connected / is_timed_out / status.
    pub fn connect(&mut self, request: &ConnectRequest) -> anyhow::Result<bool> {
        let attempt = Attempt {
            started: self.clock.now(),
            timeout: request.timeout,
        };
        self.attempt = Some(attempt);

        log::info!("Connecting to {}", request.ssid);
        self.wifi.begin_connection(request.ssid, request.password)?;

        if let Some(config) = &request.static_ip {
            self.wifi.apply_static_config(config)?;
        }

        if !request.blocking {
            return Ok(true);
        }

        loop {
            if self.wifi.status() == WifiStatus::Connected {
                return Ok(true);
            }
            if self.has_expired(&attempt) {
                log::warn!("Connection to {} timed out", request.ssid);
                return Ok(false);
            }
            self.delay.delay_ms(self.poll_interval.as_millis() as u32);
        }
    }

    // Asks the radio, not the recorded attempt: true also when the device was
    // already associated before any connect call.
    pub fn is_connected(&self) -> bool {
        self.wifi.is_connected()
    }

    // Pure timeout arithmetic on the recorded attempt. Stays true after a
    // late success; check is_connected first, or use status().
    pub fn is_timed_out(&self) -> bool {
        self.attempt
            .map_or(false, |attempt| self.has_expired(&attempt))
    }

    pub fn status(&self) -> ConnectionStatus {
        if self.wifi.is_connected() {
            return ConnectionStatus::Connected;
        }

        match self.attempt {
            None => ConnectionStatus::Idle,
            Some(attempt) if self.has_expired(&attempt) => ConnectionStatus::TimedOut,
            Some(_) => ConnectionStatus::Connecting,
        }
    }

    fn has_expired(&self, attempt: &Attempt) -> bool {
        let elapsed = self.clock.now().millis_since(attempt.started);
        u64::from(elapsed) >= attempt.timeout.as_millis() as u64
    }
}
