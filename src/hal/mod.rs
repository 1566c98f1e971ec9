use crate::hal::eeprom::Eeprom;
use crate::hal::system::{Delay, System};
use crate::hal::wifi::Wifi;

pub mod eeprom;
pub mod mock;
pub mod system;
pub mod wifi;

pub trait Platform {
    fn delay(&self) -> &(dyn Delay + '_);
    fn eeprom(&self) -> &(dyn Eeprom + '_);
    fn system(&self) -> &(dyn System + '_);
    fn wifi(&self) -> &(dyn Wifi + '_);
}
