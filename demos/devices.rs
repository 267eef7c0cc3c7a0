use log::info;
use vedirect_serial::serial;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    simplelog::TermLogger::init(
        log::LevelFilter::Debug,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Always,
    )?;

    let devices = serial::find_devices()?;
    info!("Found {} VE.Direct device(s)", devices.len());

    for device in devices {
        info!("{}: {:?}", device.port_name(), device.port_info().port_type);
    }

    Ok(())
}
