use std::cell::RefCell;
use std::net::Ipv4Addr;

use anyhow::bail;
use embedded_svc::ipv4;
use embedded_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::netif::{EspNetif, NetifConfiguration};
use esp_idf_svc::nvs::EspDefaultNvsPartition;

use houselights::hal::wifi::{StaticIpConfig, Wifi, WifiStatus};

pub struct EspWifi {
    esp_wifi: RefCell<esp_idf_svc::wifi::EspWifi<'static>>,
}

fn to_client_config(ssid: &str, password: &str) -> anyhow::Result<Configuration> {
    if ssid.is_empty() {
        bail!("Wi-Fi SSID must be non-empty")
    }

    let auth_method = if password.is_empty() {
        log::info!("Wi-Fi password is empty. Authentication is disabled.");
        AuthMethod::None
    } else {
        AuthMethod::WPA2Personal
    };

    let config = ClientConfiguration {
        ssid: ssid.into(),
        password: password.into(),
        channel: Default::default(),
        auth_method,
        ..Default::default()
    };

    Ok(Configuration::Client(config))
}

fn to_mask(subnet: Ipv4Addr) -> anyhow::Result<ipv4::Mask> {
    let bits = u32::from(subnet);
    if bits.count_ones() != bits.leading_ones() {
        bail!("subnet mask {subnet} is not contiguous")
    }
    Ok(ipv4::Mask(bits.leading_ones() as u8))
}

impl EspWifi {
    pub fn new(
        modem: Modem,
        sys_loop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
    ) -> anyhow::Result<EspWifi> {
        let esp_wifi = esp_idf_svc::wifi::EspWifi::new(modem, sys_loop, Some(nvs))?;
        Ok(Self {
            esp_wifi: RefCell::new(esp_wifi),
        })
    }
}

impl Wifi for EspWifi {
    fn begin_connection(&self, ssid: &str, password: &str) -> anyhow::Result<()> {
        let config = to_client_config(ssid, password)?;

        let mut esp_wifi = self.esp_wifi.try_borrow_mut()?;

        esp_wifi.set_configuration(&config)?;
        if !esp_wifi.is_started().unwrap_or(false) {
            esp_wifi.start()?;
        }
        esp_wifi.connect()?;

        Ok(())
    }

    fn apply_static_config(&self, config: &StaticIpConfig) -> anyhow::Result<()> {
        let settings = ipv4::ClientSettings {
            ip: config.ip,
            subnet: ipv4::Subnet {
                gateway: config.gateway,
                mask: to_mask(config.subnet)?,
            },
            dns: Some(config.dns),
            secondary_dns: None,
        };

        let netif_config = NetifConfiguration {
            ip_configuration: ipv4::Configuration::Client(ipv4::ClientConfiguration::Fixed(
                settings,
            )),
            ..NetifConfiguration::wifi_default_client()
        };

        let mut esp_wifi = self.esp_wifi.try_borrow_mut()?;
        esp_wifi.swap_netif_sta(EspNetif::new_with_conf(&netif_config)?)?;

        Ok(())
    }

    fn status(&self) -> WifiStatus {
        if let Ok(esp_wifi) = self.esp_wifi.try_borrow() {
            if esp_wifi.driver().is_connected().unwrap_or(false) {
                WifiStatus::Connected
            } else if esp_wifi.is_started().unwrap_or(false) {
                WifiStatus::Connecting
            } else {
                WifiStatus::Idle
            }
        } else {
            WifiStatus::Idle
        }
    }
}
