use std::time::Duration;

use esp_idf_sys as _;

use houselights::app::App;
use houselights::svc::SystemClock;

use houselights_esp_idf::platform::PlatformImpl;

fn main() -> anyhow::Result<()> {
    esp_idf_sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    log::info!("Create platform");
    let platform = PlatformImpl::new()?;
    let clock = SystemClock::default();

    log::info!("Create app");
    let mut app = App::new(&platform, &clock);

    let period = Duration::from_millis(20);

    log::info!("Start loop");
    loop {
        std::thread::sleep(period);
        app.update();

        if log::log_enabled!(log::Level::Trace) {
            log::trace!("{}", serde_json::to_string(&app.system_state())?);
        }
    }
}
