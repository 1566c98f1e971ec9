pub trait System {
    fn restart(&self) -> !;
}

pub trait Delay {
    fn delay_ms(&self, ms: u32);
}
