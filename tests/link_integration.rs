//! End-to-end exchanges over in-memory links
//!
//! Drives complete master/slave conversations and board-client flows the
//! way an application would, with nothing mocked below the byte level.

use std::time::Duration;

use fieldlink::board::{BoardClient, EngineConfig, FrameFormat, ScanPolicy};
use fieldlink::constants::{BOARD_DEV_ADDR, BOARD_STATUS_OK};
use fieldlink::crc::crc8_atm;
use fieldlink::modbus::{RtuMaster, RtuSlave};
use fieldlink::transport::{Direction, MockLink, SerialLink};
use fieldlink::FieldlinkError;

const SLAVE_ADDR: u8 = 17;

/// Spawn a slave polling loop over its half of a paired link
fn spawn_slave(mut slave: RtuSlave<MockLink>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match slave.poll().await {
                Ok(_) => tokio::time::sleep(Duration::from_millis(1)).await,
                Err(_) => break,
            }
        }
    })
}

fn board_response(command: u8, parameter: u8, payload: &[u8]) -> Vec<u8> {
    let len = FrameFormat::App24.len();
    let mut frame = vec![0u8; len];
    frame[0] = BOARD_DEV_ADDR;
    frame[1] = BOARD_STATUS_OK;
    frame[2] = command;
    frame[3] = parameter;
    frame[4..4 + payload.len()].copy_from_slice(payload);
    frame[len - 1] = crc8_atm(&frame[..len - 1]);
    frame
}

#[tokio::test]
async fn modbus_write_then_read_back() {
    let (master_link, slave_link) = MockLink::pair("master", "slave");
    let slave = RtuSlave::new(slave_link, SLAVE_ADDR, 16).unwrap();
    let slave_task = spawn_slave(slave);

    let mut master = RtuMaster::new(master_link);

    master
        .write_single_register(SLAVE_ADDR, 0, 1234)
        .await
        .unwrap();
    master
        .write_single_register(SLAVE_ADDR, 1, 0x2222)
        .await
        .unwrap();
    master
        .write_single_register(SLAVE_ADDR, 2, 0x3333)
        .await
        .unwrap();

    let registers = master
        .read_holding_registers(SLAVE_ADDR, 0, 4)
        .await
        .unwrap();
    assert_eq!(registers, vec![1234, 0x2222, 0x3333, 0x0000]);

    // Four exchanges: four 8-byte requests on the wire
    let stats = master.link().stats().await;
    assert_eq!(stats.writes, 4);
    assert_eq!(stats.bytes_sent, 32);
    assert!(stats.bytes_received > 0);

    slave_task.abort();
}

#[tokio::test]
async fn modbus_out_of_bounds_read_is_exception_02() {
    let (master_link, slave_link) = MockLink::pair("master", "slave");
    let slave = RtuSlave::new(slave_link, SLAVE_ADDR, 16).unwrap();
    let slave_task = spawn_slave(slave);

    let mut master = RtuMaster::new(master_link);
    let err = master
        .read_holding_registers(SLAVE_ADDR, 0, 20)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        FieldlinkError::Exception {
            function: 0x03,
            code: 0x02
        }
    );

    slave_task.abort();
}

#[tokio::test]
async fn modbus_wrong_slave_address_times_out_silently() {
    let (master_link, slave_link) = MockLink::pair("master", "slave");
    let slave = RtuSlave::new(slave_link.clone(), SLAVE_ADDR, 16).unwrap();
    let slave_task = spawn_slave(slave);

    let mut master = RtuMaster::new(master_link);
    // Different slave address on the same line: nobody answers
    let err = master.read_holding_registers(33, 0, 1).await.unwrap_err();
    assert!(err.is_timeout());

    // The slave heard the frame but produced no observable effect
    assert!(slave_link.sent_frames().await.is_empty());

    slave_task.abort();
}

#[tokio::test]
async fn modbus_multi_register_reads_preserve_order() {
    let (master_link, slave_link) = MockLink::pair("master", "slave");
    let mut slave = RtuSlave::new(slave_link, SLAVE_ADDR, 32).unwrap();
    for i in 0..32 {
        slave.registers_mut().set(i, (i as u16) * 3 + 7).unwrap();
    }
    let slave_task = spawn_slave(slave);

    let mut master = RtuMaster::new(master_link);
    let registers = master
        .read_holding_registers(SLAVE_ADDR, 4, 8)
        .await
        .unwrap();
    let expected: Vec<u16> = (4..12).map(|i| i * 3 + 7).collect();
    assert_eq!(registers, expected);

    slave_task.abort();
}

#[tokio::test]
async fn board_sensor_round_trip() {
    let link = MockLink::new("board");

    let mut sht_payload = Vec::new();
    sht_payload.extend_from_slice(&2312i16.to_be_bytes());
    sht_payload.extend_from_slice(&4150u16.to_be_bytes());

    let mut bme_payload = Vec::new();
    bme_payload.extend_from_slice(&(-525i32).to_be_bytes());
    bme_payload.extend_from_slice(&(62 * 1024u32).to_be_bytes());
    bme_payload.extend_from_slice(&(989 * 25600u32).to_be_bytes());

    link.queue_responses(vec![
        board_response(0x00, 0x00, &[]),
        board_response(0x03, 0x00, &sht_payload),
        board_response(0x03, 0x01, &bme_payload),
    ])
    .await;

    let mut client = BoardClient::new(link);

    client.ping().await.unwrap();

    let sht = client.sht40().await.unwrap();
    assert!((sht.temperature_c - 23.12).abs() < 1e-9);
    assert!((sht.humidity_pct - 41.50).abs() < 1e-9);

    let bme = client.bme280().await.unwrap();
    assert!((bme.temperature_c + 5.25).abs() < 1e-9);
    assert!((bme.humidity_pct - 62.0).abs() < 1e-9);
    assert!((bme.pressure_hpa - 989.0).abs() < 1e-9);
}

#[tokio::test]
async fn board_scan_policy_controls_corrupt_frame_recovery() {
    // Same wire bytes: garbage, then a corrupt frame, then a good frame
    let build_stream = || {
        let mut corrupt = board_response(0x02, 0x00, &[0x00, 0x42]);
        corrupt[6] ^= 0x10;
        let mut stream = vec![0x00, 0x51];
        stream.extend(corrupt);
        stream.extend(board_response(0x02, 0x00, &[0x00, 0x42, 0x01, 0x99]));
        stream
    };

    // Resync: the good frame wins within the same deadline
    let link = MockLink::new("board-resync");
    link.queue_response(build_stream()).await;
    let mut client = BoardClient::with_config(
        link,
        EngineConfig {
            scan_policy: ScanPolicy::Resync,
            ..Default::default()
        },
    );
    let adc = client.adc_channels().await.unwrap();
    assert_eq!(adc, [0x0042, 0x0199]);

    // Abort: the corrupt frame ends the exchange
    let link = MockLink::new("board-abort");
    link.queue_response(build_stream()).await;
    let mut client = BoardClient::with_config(
        link,
        EngineConfig {
            scan_policy: ScanPolicy::Abort,
            ..Default::default()
        },
    );
    let err = client.adc_channels().await.unwrap_err();
    assert!(matches!(err, FieldlinkError::Checksum { .. }));
}

#[tokio::test(start_paused = true)]
async fn board_timeout_window_is_respected() {
    let link = MockLink::new("board");
    let timeout = Duration::from_millis(300);
    let mut client = BoardClient::with_config(
        link,
        EngineConfig {
            timeout,
            ..Default::default()
        },
    );

    let start = tokio::time::Instant::now();
    let err = client.ping().await.unwrap_err();
    assert!(err.is_timeout());

    let elapsed = start.elapsed();
    assert!(elapsed >= timeout);
    assert!(elapsed <= timeout + Duration::from_millis(10));
}

#[tokio::test]
async fn board_stale_bytes_do_not_poison_next_exchange() {
    let link = MockLink::new("board");
    // Half a frame left over from an abandoned exchange
    let stale = &board_response(0x03, 0x00, &[0x11; 4])[..10];
    link.preload_rx(stale).await;
    link.queue_response(board_response(0x01, 0x00, &[0x00, 0x00, 0x00, 0x2A]))
        .await;

    let mut client = BoardClient::new(link);
    assert_eq!(client.serial_number().await.unwrap(), 42);
}

#[tokio::test]
async fn every_exchange_leaves_the_line_in_receive() {
    // Master side
    let (master_link, slave_link) = MockLink::pair("master", "slave");
    let slave = RtuSlave::new(slave_link.clone(), SLAVE_ADDR, 8).unwrap();
    let slave_task = spawn_slave(slave);

    let mut master = RtuMaster::new(master_link);
    master
        .write_single_register(SLAVE_ADDR, 0, 7)
        .await
        .unwrap();
    let _ = master.read_holding_registers(SLAVE_ADDR, 0, 2).await;
    slave_task.abort();

    let master_log = master.link().direction_log().await;
    assert!(!master_log.is_empty());
    assert_eq!(*master_log.last().unwrap(), Direction::Receive);
    assert_eq!(
        master_log
            .iter()
            .filter(|d| **d == Direction::Transmit)
            .count(),
        master_log
            .iter()
            .filter(|d| **d == Direction::Receive)
            .count()
    );

    // Slave side transmitted at least once and also ended in receive
    let slave_log = slave_link.direction_log().await;
    assert!(!slave_log.is_empty());
    assert_eq!(*slave_log.last().unwrap(), Direction::Receive);

    // Board side, including a timed-out exchange
    let link = MockLink::new("board");
    let mut client = BoardClient::with_config(
        link,
        EngineConfig {
            timeout: Duration::from_millis(30),
            ..Default::default()
        },
    );
    let _ = client.ping().await;
    let log = client.engine().link().direction_log().await;
    assert_eq!(log, vec![Direction::Transmit, Direction::Receive]);
}
