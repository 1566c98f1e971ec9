use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;

use houselights::hal::eeprom::Eeprom;
use houselights::hal::system::{Delay, System};
use houselights::hal::wifi::Wifi;
use houselights::hal::Platform;

use crate::drivers::eeprom::EspEeprom;
use crate::drivers::system::{EspDelay, EspSystem};
use crate::drivers::wifi::EspWifi;

pub struct PlatformImpl {
    wifi: EspWifi,
    eeprom: EspEeprom,
    delay: EspDelay,
    system: EspSystem,
}

impl PlatformImpl {
    pub fn new() -> anyhow::Result<Self> {
        let peripherals = Peripherals::take().unwrap();
        let sys_loop = EspSystemEventLoop::take()?;
        let nvs = EspDefaultNvsPartition::take()?;

        let wifi = EspWifi::new(peripherals.modem, sys_loop, nvs.clone())?;
        let eeprom = EspEeprom::new(nvs)?;

        Ok(Self {
            wifi,
            eeprom,
            delay: EspDelay,
            system: EspSystem,
        })
    }
}

impl Platform for PlatformImpl {
    fn delay(&self) -> &(dyn Delay + '_) {
        &self.delay
    }

    fn eeprom(&self) -> &(dyn Eeprom + '_) {
        &self.eeprom
    }

    fn system(&self) -> &(dyn System + '_) {
        &self.system
    }

    fn wifi(&self) -> &(dyn Wifi + '_) {
        &self.wifi
    }
}
