pub const REGION_SIZE: usize = 128;

pub trait Eeprom {
    fn begin(&self, size: usize);

    fn read(&self, offset: usize) -> u8;

    fn write(&self, offset: usize, value: u8);

    fn commit(&self);

    fn end(&self);
}
