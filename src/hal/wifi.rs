use std::net::Ipv4Addr;

pub trait Wifi {
    fn begin_connection(&self, ssid: &str, password: &str) -> anyhow::Result<()>;

    fn apply_static_config(&self, config: &StaticIpConfig) -> anyhow::Result<()>;

    fn status(&self) -> WifiStatus;

    fn is_connected(&self) -> bool {
        self.status() == WifiStatus::Connected
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum WifiStatus {
    #[default]
    Idle,
    Connecting,
    Connected,
    Disconnected,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct StaticIpConfig {
    pub ip: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub subnet: Ipv4Addr,
    pub dns: Ipv4Addr,
}

#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct WifiCredentials {
    pub ssid: String,
    pub password: String,
    pub is_set: bool,
}

impl WifiCredentials {
    pub fn new(ssid: &str, password: &str) -> Self {
        WifiCredentials {
            ssid: ssid.to_string(),
            password: password.to_string(),
            is_set: true,
        }
    }

    fn try_from_str(s: &str) -> Result<Self, ()> {
        let mut iter = s.split_terminator(':');
        let ssid: &str = iter.next().ok_or(())?;
        if ssid.is_empty() {
            return Err(());
        }
        let password: &str = iter.next().unwrap_or("");
        Ok(WifiCredentials::new(ssid, password))
    }

    pub fn from_env_var() -> Result<Self, ()> {
        if let Some(s) = option_env!("HOUSELIGHTS_WIFI_CONFIG") {
            WifiCredentials::try_from_str(s)
        } else {
            Err(())
        }
    }
}
