use esp_idf_hal::delay::FreeRtos;

use houselights::hal::system::{Delay, System};

pub struct EspSystem;

impl System for EspSystem {
    fn restart(&self) -> ! {
        unsafe { esp_idf_sys::esp_restart() };
        unreachable!()
    }
}

pub struct EspDelay;

impl Delay for EspDelay {
    // FreeRTOS delay yields to other tasks, so the radio keeps being serviced
    // while a blocking connect waits.
    fn delay_ms(&self, ms: u32) {
        FreeRtos::delay_ms(ms);
    }
}
