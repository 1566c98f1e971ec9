use std::cell::RefCell;

use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};

use houselights::hal::eeprom::Eeprom;

const NAMESPACE: &str = "houselights";
const REGION_KEY: &str = "region";

// Emulates a byte-addressable EEPROM on top of an NVS blob: begin loads the
// region into a RAM buffer, read/write touch only the buffer, commit writes
// the whole blob back. A key that was never written reads as erased (0xFF).
pub struct EspEeprom {
    nvs: RefCell<EspNvs<NvsDefault>>,
    buffer: RefCell<Option<Vec<u8>>>,
}

impl EspEeprom {
    pub fn new(partition: EspDefaultNvsPartition) -> anyhow::Result<Self> {
        let nvs = EspNvs::new(partition, NAMESPACE, true)?;
        Ok(Self {
            nvs: RefCell::new(nvs),
            buffer: RefCell::new(None),
        })
    }
}

impl Eeprom for EspEeprom {
    fn begin(&self, size: usize) {
        let mut buffer = self.buffer.borrow_mut();
        if buffer.is_some() {
            return;
        }

        let mut working = vec![0xFF; size];
        let found = {
            let nvs = self.nvs.borrow();
            matches!(nvs.get_raw(REGION_KEY, &mut working), Ok(Some(_)))
        };
        if !found {
            working.fill(0xFF);
        }

        *buffer = Some(working);
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
            if let Err(e) = self.nvs.borrow_mut().set_raw(REGION_KEY, buffer) {
                log::error!("Cannot persist region: {e}");
            }
        }
    }

    fn end(&self) {
        *self.buffer.borrow_mut() = None;
    }
}
