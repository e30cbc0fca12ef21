//! In-process demo of both protocol engines
//!
//! Wires a Modbus RTU master to a slave over a paired in-memory link, then
//! runs a board-client exchange against scripted responses. Useful for
//! watching the packet-level tracing output without any hardware attached.

use std::time::Duration;

use fieldlink::board::{BoardClient, FrameFormat};
use fieldlink::constants::{BOARD_DEV_ADDR, BOARD_STATUS_OK};
use fieldlink::crc::crc8_atm;
use fieldlink::modbus::{RtuMaster, RtuSlave};
use fieldlink::transport::MockLink;
use tracing::info;

const SLAVE_ADDR: u8 = 17;

#[tokio::main]
async fn main() -> fieldlink::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,fieldlink=debug")),
        )
        .init();

    modbus_demo().await?;
    board_demo().await?;
    Ok(())
}

/// Master and slave talking over one virtual RS-485 line
async fn modbus_demo() -> fieldlink::Result<()> {
    info!("--- Modbus RTU master/slave demo ---");

    let (master_link, slave_link) = MockLink::pair("master-side", "slave-side");
    let mut master = RtuMaster::new(master_link);
    let mut slave = RtuSlave::new(slave_link, SLAVE_ADDR, 16)?;

    let slave_task = tokio::spawn(async move {
        // Serve until the demo ends; poll() never raises on bad input
        loop {
            match slave.poll().await {
                Ok(Some(function)) => info!(function, "slave answered"),
                Ok(None) => tokio::time::sleep(Duration::from_millis(1)).await,
                Err(err) => {
                    info!(%err, "slave link closed");
                    break;
                }
            }
        }
    });

    master.write_single_register(SLAVE_ADDR, 0, 1234).await?;
    master.write_single_register(SLAVE_ADDR, 1, 0x2222).await?;

    let registers = master.read_holding_registers(SLAVE_ADDR, 0, 4).await?;
    info!(?registers, "read back holding registers");

    match master.read_holding_registers(SLAVE_ADDR, 0, 32).await {
        Err(err) => info!(%err, "out-of-bounds read rejected as expected"),
        Ok(_) => unreachable!("16-register bank cannot satisfy 32 registers"),
    }

    slave_task.abort();
    Ok(())
}

/// Board client against scripted firmware responses
async fn board_demo() -> fieldlink::Result<()> {
    info!("--- Board protocol demo ---");

    let link = MockLink::new("board");
    link.queue_responses(vec![
        board_response(0x00, 0x00, &[]),
        board_response(0x01, 0x00, &[0x00, 0x12, 0xD6, 0x87]),
        board_response(0x03, 0x00, &{
            let mut p = Vec::new();
            p.extend_from_slice(&2312i16.to_be_bytes());
            p.extend_from_slice(&4150u16.to_be_bytes());
            p
        }),
    ])
    .await;

    let mut client = BoardClient::new(link);

    client.ping().await?;
    info!("board answered ping");

    let serial = client.serial_number().await?;
    info!(serial, "board serial number");

    let reading = client.sht40().await?;
    info!(
        temperature_c = reading.temperature_c,
        humidity_pct = reading.humidity_pct,
        "SHT40 reading"
    );

    Ok(())
}

/// A well-formed response frame the way the firmware would build it
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
