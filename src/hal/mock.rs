use std::cell::{Cell, RefCell};
use std::rc::Rc;

use anyhow::bail;

use crate::hal::eeprom::{Eeprom, REGION_SIZE};
use crate::hal::system::{Delay, System};
use crate::hal::wifi::{StaticIpConfig, Wifi, WifiStatus};
use crate::hal::Platform;
use crate::svc::clock::{Clock, Instant};

// Host-side stand-ins for the device drivers. Deterministic: time only moves
// when MockClock::advance is called, and MockDelay advances it, so a blocking
// wait loop runs through simulated time instead of sleeping.

#[derive(Default, Clone)]
pub struct MockClock {
    now: Rc<Cell<u32>>,
}

impl MockClock {
    pub fn set(&self, ms: u32) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        Instant::from_millis(self.now.get())
    }
}

pub struct MockDelay {
    clock: MockClock,
}

impl MockDelay {
    pub fn new(clock: &MockClock) -> Self {
        Self {
            clock: clock.clone(),
        }
    }
}

impl Delay for MockDelay {
    fn delay_ms(&self, ms: u32) {
        self.clock.advance(ms);
    }
}

pub struct MockEeprom {
    buffer: RefCell<Option<Vec<u8>>>,
    committed: RefCell<Vec<u8>>,
    commits: Cell<usize>,
}

impl Default for MockEeprom {
    fn default() -> Self {
        Self {
            buffer: RefCell::new(None),
            // erased flash reads back 0xFF
            committed: RefCell::new(vec![0xFF; REGION_SIZE]),
            commits: Cell::new(0),
        }
    }
}

impl MockEeprom {
    pub fn committed(&self) -> Vec<u8> {
        self.committed.borrow().clone()
    }

    pub fn commits(&self) -> usize {
        self.commits.get()
    }
}

impl Eeprom for MockEeprom {
    fn begin(&self, size: usize) {
        let mut buffer = self.buffer.borrow_mut();
        if buffer.is_none() {
            let mut working = self.committed.borrow().clone();
            working.resize(size, 0xFF);
            *buffer = Some(working);
        }
    }

    fn read(&self, offset: usize) -> u8 {
        self.buffer
            .borrow()
            .as_ref()
            .map_or(0xFF, |buffer| buffer[offset])
    }

    fn write(&self, offset: usize, value: u8) {
        if let Some(buffer) = self.buffer.borrow_mut().as_mut() {
            buffer[offset] = value;
        }
    }

    fn commit(&self) {
        if let Some(buffer) = self.buffer.borrow().as_ref() {
            *self.committed.borrow_mut() = buffer.clone();
        }
        self.commits.set(self.commits.get() + 1);
    }

    fn end(&self) {
        *self.buffer.borrow_mut() = None;
    }
}

pub struct MockWifi {
    clock: MockClock,
    begun_at: Cell<Option<u32>>,
    connects_after: Cell<Option<u32>>,
    status_override: Cell<Option<WifiStatus>>,
    fail_next_begin: Cell<bool>,
    last_request: RefCell<Option<(String, String)>>,
    static_config: Cell<Option<StaticIpConfig>>,
}

impl MockWifi {
    pub fn new(clock: &MockClock) -> Self {
        Self {
            clock: clock.clone(),
            begun_at: Cell::new(None),
            connects_after: Cell::new(None),
            status_override: Cell::new(None),
            fail_next_begin: Cell::new(false),
            last_request: RefCell::new(None),
            static_config: Cell::new(None),
        }
    }

    // Report connected once the given time has passed since begin_connection.
    pub fn connect_after(&self, ms: u32) {
        self.connects_after.set(Some(ms));
    }

    pub fn set_status(&self, status: WifiStatus) {
        self.status_override.set(Some(status));
    }

    pub fn disconnect(&self) {
        self.begun_at.set(None);
        self.status_override.set(None);
    }

    pub fn fail_next_begin(&self) {
        self.fail_next_begin.set(true);
    }

    pub fn last_request(&self) -> Option<(String, String)> {
        self.last_request.borrow().clone()
    }

    pub fn applied_static_config(&self) -> Option<StaticIpConfig> {
        self.static_config.get()
    }
}

impl Wifi for MockWifi {
    fn begin_connection(&self, ssid: &str, password: &str) -> anyhow::Result<()> {
        if self.fail_next_begin.take() {
            bail!("radio rejected the connection request")
        }
        self.begun_at.set(Some(self.clock.now().to_millis()));
        *self.last_request.borrow_mut() = Some((ssid.to_string(), password.to_string()));
        Ok(())
    }

    fn apply_static_config(&self, config: &StaticIpConfig) -> anyhow::Result<()> {
        self.static_config.set(Some(*config));
        Ok(())
    }

    fn status(&self) -> WifiStatus {
        if let Some(status) = self.status_override.get() {
            return status;
        }

        match (self.begun_at.get(), self.connects_after.get()) {
            (Some(t0), Some(dt)) if self.clock.now().to_millis().wrapping_sub(t0) >= dt => {
                WifiStatus::Connected
            }
            (Some(_), _) => WifiStatus::Connecting,
            (None, _) => WifiStatus::Idle,
        }
    }
}

#[derive(Default)]
pub struct MockSystem {
    restarts: Cell<usize>,
}

impl MockSystem {
    pub fn restarts(&self) -> usize {
        self.restarts.get()
    }
}

impl System for MockSystem {
    fn restart(&self) -> ! {
        self.restarts.set(self.restarts.get() + 1);
        panic!("restart")
    }
}

pub struct MockPlatform {
    pub clock: MockClock,
    pub eeprom: MockEeprom,
    pub wifi: MockWifi,
    pub delay: MockDelay,
    pub system: MockSystem,
}

impl Default for MockPlatform {
    fn default() -> Self {
        let clock = MockClock::default();
        let wifi = MockWifi::new(&clock);
        let delay = MockDelay::new(&clock);

        Self {
            clock,
            eeprom: MockEeprom::default(),
            wifi,
            delay,
            system: MockSystem::default(),
        }
    }
}

impl Platform for MockPlatform {
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
