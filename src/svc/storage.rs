use anyhow::bail;

use crate::hal::eeprom::{Eeprom, REGION_SIZE};
use crate::hal::system::System;
use crate::hal::wifi::WifiCredentials;

// An erased region reads back 0xFF, so the first byte doubles as the
// "never configured" marker.
pub const UNINITIALIZED: u8 = 0xFF;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Field {
    pub offset: usize,
    pub capacity: usize,
}

impl Field {
    const fn new(offset: usize, capacity: usize) -> Self {
        Self { offset, capacity }
    }

    const fn end(&self) -> usize {
        self.offset + self.capacity
    }
}

pub const WIFI_SSID: Field = Field::new(0, 32);
pub const WIFI_PASSWORD: Field = Field::new(32, 45);
pub const USER_ID: Field = Field::new(78, 24);
pub const TOKEN: Field = Field::new(103, 24);

const LAYOUT: [Field; 4] = [WIFI_SSID, WIFI_PASSWORD, USER_ID, TOKEN];

const fn layout_fits() -> bool {
    let mut i = 0;
    while i < LAYOUT.len() {
        if LAYOUT[i].end() > REGION_SIZE {
            return false;
        }
        let mut j = i + 1;
        while j < LAYOUT.len() {
            if LAYOUT[i].offset < LAYOUT[j].end() && LAYOUT[j].offset < LAYOUT[i].end() {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

const _: () = assert!(layout_fits(), "fields must be disjoint and fit the region");

pub struct NonvolatileStore<'a> {
    eeprom: &'a dyn Eeprom,
}

impl<'a> NonvolatileStore<'a> {
    pub fn new(eeprom: &'a dyn Eeprom) -> Self {
        Self { eeprom }
    }

    pub fn write_field(&self, value: &str, field: Field) -> anyhow::Result<()> {
        if value.len() + 1 > field.capacity {
            bail!(
                "{} bytes do not fit field at offset {} (capacity {})",
                value.len() + 1,
                field.offset,
                field.capacity
            );
        }

        self.eeprom.begin(REGION_SIZE);
        for (i, byte) in value.bytes().enumerate() {
            self.eeprom.write(field.offset + i, byte);
        }
        self.eeprom.write(field.offset + value.len(), b'\0');
        self.eeprom.commit();
        self.eeprom.end();

        Ok(())
    }

    // Returns the bytes verbatim: anything past the terminator (stale bytes
    // from an earlier, longer write) is included.
    pub fn read_field(&self, field: Field, len: usize) -> String {
        debug_assert!(len <= field.capacity);
        String::from_utf8_lossy(&self.read_raw(field, len)).into_owned()
    }

    pub fn reset_all(&self) {
        self.eeprom.begin(REGION_SIZE);
        self.eeprom.write(0, UNINITIALIZED);
        for offset in 1..REGION_SIZE {
            self.eeprom.write(offset, 0);
        }
        self.eeprom.commit();
        self.eeprom.end();
    }

    pub fn erase_and_restart(&self, system: &dyn System) -> ! {
        self.reset_all();
        system.restart()
    }

    pub fn set_user_id(&self, user_id: &str) -> anyhow::Result<()> {
        self.write_field(user_id, USER_ID)
    }

    pub fn set_token(&self, token: &str) -> anyhow::Result<()> {
        self.write_field(token, TOKEN)
    }

    pub fn get_user_id(&self) -> String {
        self.read_text(USER_ID)
    }

    pub fn get_token(&self) -> String {
        self.read_text(TOKEN)
    }

    pub fn set_wifi_auth(&self, credentials: &WifiCredentials) -> anyhow::Result<()> {
        self.write_field(&credentials.ssid, WIFI_SSID)?;
        self.write_field(&credentials.password, WIFI_PASSWORD)
    }

    pub fn get_wifi_auth(&self) -> WifiCredentials {
        self.eeprom.begin(REGION_SIZE);
        let first = self.eeprom.read(WIFI_SSID.offset);
        self.eeprom.end();

        if first == UNINITIALIZED {
            return WifiCredentials::default();
        }

        WifiCredentials {
            ssid: self.read_text(WIFI_SSID),
            password: self.read_text(WIFI_PASSWORD),
            is_set: true,
        }
    }

    fn read_raw(&self, field: Field, len: usize) -> Vec<u8> {
        self.eeprom.begin(REGION_SIZE);
        let mut bytes = Vec::with_capacity(len);
        for i in 0..len {
            bytes.push(self.eeprom.read(field.offset + i));
        }
        self.eeprom.end();
        bytes
    }

    fn read_text(&self, field: Field) -> String {
        let raw = self.read_raw(field, field.capacity);
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        String::from_utf8_lossy(&raw[..end]).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{catch_unwind, AssertUnwindSafe};

    use crate::hal::mock::{MockEeprom, MockSystem};

    use super::*;

    #[test]
    fn round_trip_with_terminator() {
        let eeprom = MockEeprom::default();
        let store = NonvolatileStore::new(&eeprom);

        store.write_field("net", WIFI_SSID).unwrap();

        assert_eq!(store.read_field(WIFI_SSID, 4), "net\0");
    }

    #[test]
    fn read_keeps_stale_bytes_past_the_terminator() {
        let eeprom = MockEeprom::default();
        let store = NonvolatileStore::new(&eeprom);

        store.set_user_id("longer").unwrap();
        store.set_user_id("ab").unwrap();

        assert_eq!(store.read_field(USER_ID, 7), "ab\0ger\0");
        assert_eq!(store.get_user_id(), "ab");
    }

    #[test]
    fn layout_is_disjoint() {
        for (i, a) in LAYOUT.iter().enumerate() {
            assert!(a.end() <= REGION_SIZE);
            for b in &LAYOUT[i + 1..] {
                assert!(
                    a.end() <= b.offset || b.end() <= a.offset,
                    "fields at {} and {} overlap",
                    a.offset,
                    b.offset
                );
            }
        }
    }

    #[test]
    fn reset_is_idempotent() {
        let eeprom = MockEeprom::default();
        let store = NonvolatileStore::new(&eeprom);
        store
            .set_wifi_auth(&WifiCredentials::new("net", "pw"))
            .unwrap();

        store.reset_all();
        let once = eeprom.committed();

        store.reset_all();
        assert_eq!(eeprom.committed(), once);

        assert_eq!(once[0], UNINITIALIZED);
        assert!(once[1..].iter().all(|&byte| byte == 0));
    }

    #[test]
    fn credentials_absent_after_reset() {
        let eeprom = MockEeprom::default();
        let store = NonvolatileStore::new(&eeprom);
        store
            .set_wifi_auth(&WifiCredentials::new("net", "pw"))
            .unwrap();

        store.reset_all();

        let auth = store.get_wifi_auth();
        assert!(!auth.is_set);
        assert!(auth.ssid.is_empty());
        assert!(auth.password.is_empty());
    }

    #[test]
    fn credentials_present_after_write() {
        let eeprom = MockEeprom::default();
        let store = NonvolatileStore::new(&eeprom);

        store
            .set_wifi_auth(&WifiCredentials::new("net", "pw"))
            .unwrap();

        let auth = store.get_wifi_auth();
        assert!(auth.is_set);
        assert_eq!(auth.ssid, "net");
        assert_eq!(auth.password, "pw");
    }

    #[test]
    fn fresh_region_reads_unconfigured() {
        let eeprom = MockEeprom::default();
        let store = NonvolatileStore::new(&eeprom);

        assert!(!store.get_wifi_auth().is_set);
    }

    #[test]
    fn user_id_and_token_do_not_clobber_each_other() {
        let eeprom = MockEeprom::default();
        let store = NonvolatileStore::new(&eeprom);

        store.set_user_id("user-1").unwrap();
        store.set_token("tok-abcdef").unwrap();

        assert_eq!(store.get_user_id(), "user-1");
        assert_eq!(store.get_token(), "tok-abcdef");
    }

    #[test]
    fn oversized_value_is_rejected_before_writing() {
        let eeprom = MockEeprom::default();
        let store = NonvolatileStore::new(&eeprom);

        let long = "x".repeat(USER_ID.capacity);
        assert!(store.set_user_id(&long).is_err());
        assert_eq!(eeprom.commits(), 0);

        // the largest value that still leaves room for the terminator
        let max = "x".repeat(USER_ID.capacity - 1);
        assert!(store.set_user_id(&max).is_ok());
        assert_eq!(store.get_user_id(), max);
    }

    #[test]
    fn writes_commit_synchronously() {
        let eeprom = MockEeprom::default();
        let store = NonvolatileStore::new(&eeprom);

        store.set_token("tok").unwrap();

        assert_eq!(eeprom.commits(), 1);
        assert_eq!(&eeprom.committed()[TOKEN.offset..TOKEN.offset + 4], b"tok\0");
    }

    #[test]
    fn erase_and_restart_resets_the_region_first() {
        let eeprom = MockEeprom::default();
        let system = MockSystem::default();
        let store = NonvolatileStore::new(&eeprom);
        store.set_user_id("user-1").unwrap();

        let restart = catch_unwind(AssertUnwindSafe(|| store.erase_and_restart(&system)));

        assert!(restart.is_err());
        assert_eq!(system.restarts(), 1);
        assert_eq!(eeprom.committed()[0], UNINITIALIZED);
        assert!(eeprom.committed()[1..].iter().all(|&byte| byte == 0));
    }
}
