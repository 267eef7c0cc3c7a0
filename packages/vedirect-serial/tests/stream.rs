use std::time::Duration;

use simplelog::{Config, LevelFilter, TestLogger};
use tokio::io::{duplex, AsyncWriteExt};
use vedirect_serial::{
    protocol::{hex::Response, Frame, HexFrame, Record, Snapshot},
    Connection, StreamConnection, StreamError,
};

const TIMEOUT: Duration = Duration::from_secs(1);

fn init_logger() {
    let _ = TestLogger::init(LevelFilter::Trace, Config::default());
}

fn block(fields: &[(&str, &str)]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for (label, value) in fields {
        bytes.extend_from_slice(b"\r\n");
        bytes.extend_from_slice(label.as_bytes());
        bytes.push(b'\t');
        bytes.extend_from_slice(value.as_bytes());
    }
    bytes.extend_from_slice(b"\r\nChecksum\t");
    let sum = bytes.iter().fold(0u8, |sum, &byte| sum.wrapping_add(byte));
    bytes.push(sum.wrapping_neg());
    bytes
}

// Ping response carrying version 0x4105.
const PING: &[u8] = b":505410A\n";

#[tokio::test]
async fn receives_a_record() -> Result<(), StreamError> {
    init_logger();

    let (mut device, host) = duplex(1024);
    let mut connection = StreamConnection::new(host);

    device
        .write_all(&block(&[("V", "12800"), ("I", "-1500")]))
        .await?;

    let record: Record = connection.recv(TIMEOUT).await?;
    assert_eq!(record.get_str("V"), Some("12800"), "voltage should be correct");
    assert_eq!(connection.stats().records, 1);

    Ok(())
}

#[tokio::test]
async fn record_split_across_writes() -> Result<(), StreamError> {
    init_logger();

    let (mut device, host) = duplex(1024);
    let mut connection = StreamConnection::new(host);

    let bytes = block(&[("PID", "0xA053"), ("V", "13650")]);

    let writer = tokio::spawn(async move {
        let (head, tail) = bytes.split_at(7);
        device.write_all(head).await?;
        tokio::time::sleep(Duration::from_millis(20)).await;
        device.write_all(tail).await?;
        Ok::<_, std::io::Error>(device)
    });

    let record: Record = connection.recv(TIMEOUT).await?;
    assert_eq!(record.get_str("PID"), Some("0xA053"));

    writer.await.expect("writer task panicked")?;
    Ok(())
}

#[tokio::test]
async fn other_frames_stay_queued() -> Result<(), StreamError> {
    init_logger();

    let (mut device, host) = duplex(1024);
    let mut connection = StreamConnection::new(host);

    let mut bytes = PING.to_vec();
    bytes.extend(block(&[("V", "12800")]));
    device.write_all(&bytes).await?;

    let record: Record = connection.recv(TIMEOUT).await?;
    assert_eq!(record.get_str("V"), Some("12800"));

    let hex: HexFrame = connection.recv(TIMEOUT).await?;
    assert_eq!(hex.response(), Ok(Response::Ping { version: 0x4105 }));

    Ok(())
}

#[tokio::test]
async fn frames_arrive_in_order() -> Result<(), StreamError> {
    init_logger();

    let (mut device, host) = duplex(1024);
    let mut connection = StreamConnection::new(host);

    let mut bytes = block(&[("V", "1")]);
    bytes.extend_from_slice(PING);
    device.write_all(&bytes).await?;

    assert!(matches!(connection.recv::<Frame>(TIMEOUT).await?, Frame::Text(_)));
    assert_eq!(
        connection.recv::<Response>(TIMEOUT).await?,
        Response::Ping { version: 0x4105 }
    );

    Ok(())
}

#[tokio::test]
async fn times_out_without_data() {
    init_logger();

    let (_device, host) = duplex(1024);
    let mut connection = StreamConnection::new(host);

    let result = connection
        .recv::<Record>(Duration::from_millis(50))
        .await;
    assert!(matches!(result, Err(StreamError::Timeout)));
}

#[tokio::test]
async fn corrupted_block_is_skipped() -> Result<(), StreamError> {
    init_logger();

    let (mut device, host) = duplex(1024);
    let mut connection = StreamConnection::new(host);

    let mut corrupted = block(&[("V", "12800")]);
    corrupted[5] = b'9';
    device.write_all(&corrupted).await?;
    device.write_all(&block(&[("V", "12900")])).await?;

    let record: Record = connection.recv(TIMEOUT).await?;
    assert_eq!(record.get_str("V"), Some("12900"));
    assert_eq!(connection.stats().checksum_mismatches, 1);

    Ok(())
}

#[tokio::test]
async fn closed_stream() {
    init_logger();

    let (device, host) = duplex(1024);
    let mut connection = StreamConnection::new(host);
    drop(device);

    let result = connection.recv::<Record>(TIMEOUT).await;
    assert!(matches!(result, Err(StreamError::Closed)));
}

#[tokio::test]
async fn refresh_updates_snapshot() -> Result<(), StreamError> {
    init_logger();

    let (mut device, host) = duplex(1024);
    let mut connection = StreamConnection::new(host);
    let mut snapshot = Snapshot::new();

    device
        .write_all(&block(&[("V", "13400"), ("SOC", "955"), ("CS", "5")]))
        .await?;
    connection.refresh(&mut snapshot, TIMEOUT).await?;

    assert_eq!(snapshot.battery_voltage(), Some(13.4));
    assert_eq!(snapshot.state_of_charge(), Some(95.5));
    assert_eq!(snapshot.records(), 1);

    Ok(())
}
