use std::time::Duration;

use log::{info, warn};
use vedirect_serial::{
    protocol::{interpret, Frame},
    serial::{self, SerialConfig, SerialError},
    Connection, StreamError,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    simplelog::TermLogger::init(
        log::LevelFilter::Debug,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Always,
    )?;

    let device = serial::find_device()?;
    let mut connection = device.connect(SerialConfig::default())?;
    info!("Monitoring {}", device.port_name());

    loop {
        match connection.recv::<Frame>(Duration::from_secs(5)).await {
            Ok(Frame::Text(record)) => {
                for (key, value) in interpret(&record) {
                    match value {
                        Ok(value) => info!("{key}: {value}"),
                        Err(error) => warn!("{key}: {error}"),
                    }
                }
            }
            Ok(Frame::Hex(frame)) => match frame.response() {
                Ok(response) => info!("HEX {response:?}"),
                Err(error) => warn!("HEX frame {:#x}: {error}", frame.command()),
            },
            Err(SerialError::Stream(StreamError::Timeout)) => {
                warn!(
                    "No data for 5 seconds ({} frames discarded so far)",
                    connection.stats().discarded()
                );
            }
            Err(error) => return Err(error.into()),
        }
    }
}
