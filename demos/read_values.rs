use std::time::Duration;

use vedirect_serial::{
    protocol::Snapshot,
    serial::{self, SerialConfig},
    Connection,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    simplelog::TermLogger::init(
        log::LevelFilter::Warn,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Always,
    )?;

    // Use the port given on the command line, or the first one found
    let device = match std::env::args().nth(1) {
        Some(port) => serial::SerialDevice::from_port_name(port),
        None => serial::find_device()?,
    };
    let mut connection = device.connect(SerialConfig::default())?;

    let mut snapshot = Snapshot::new();
    connection
        .refresh(&mut snapshot, Duration::from_secs(5))
        .await?;

    let show = |value: Option<f64>| value.map_or("n/a".to_string(), |value| value.to_string());

    println!("Battery Voltage: {} V", show(snapshot.battery_voltage()));
    println!("Battery Current: {} A", show(snapshot.battery_current()));
    println!("Solar Voltage: {} V", show(snapshot.solar_voltage()));
    println!("Solar Power: {} W", show(snapshot.solar_power()));
    println!("Device Serial: {}", snapshot.serial_number().unwrap_or("n/a"));
    match snapshot.tracker_state() {
        Some(state) => println!("MPPT State: {state:?}"),
        None => println!("MPPT State: n/a"),
    }

    Ok(())
}
