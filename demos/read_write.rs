//! Example: Reading and writing PLC devices
//!
//! Run with: cargo run --example read_write -- 192.168.10.61 5000
//!
//! Set `RUST_LOG=slmp=trace` to see the raw frames.
//!
//! This example demonstrates:
//! - Connecting with a custom configuration
//! - Word reads and writes on D registers
//! - Bit reads and writes on M relays and Y outputs
//! - Handling controller end codes

use slmp::{end_code_description, ClientConfig, Connection, DeviceKind, SlmpError};
use std::time::Duration;

fn main() -> slmp::Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "192.168.10.61".to_string());
    let port = args
        .next()
        .and_then(|p| p.parse().ok())
        .unwrap_or(5000);

    // =========================================================================
    // Connect
    // =========================================================================

    let config = ClientConfig::new(host, port).with_timeout(Duration::from_secs(3));
    let mut conn = Connection::connect_with(config)?;

    // =========================================================================
    // Words
    // =========================================================================

    println!("=== Words ===\n");

    conn.write_words(DeviceKind::D, 100, &[1, 2, 3, 0x1234])?;
    let data = conn.read_words(DeviceKind::D, 100, 4)?;
    println!("D100-D103: {:?}", data);

    let zr = conn.read_words(DeviceKind::ZR, 0, 2)?;
    println!("ZR0-ZR1:   {:04X?}", zr);

    // =========================================================================
    // Bits
    // =========================================================================

    println!("\n=== Bits ===\n");

    conn.write_bits(DeviceKind::M, 0, &[1, 0, 1, 0, 0, 1, 0, 0, 0, 1])?;
    let bits = conn.read_bits(DeviceKind::M, 0, 10)?;
    println!("M0-M9:   {:?}", bits);

    let outputs = conn.read_bits(DeviceKind::Y, 0x20, 16)?;
    println!("Y20-Y2F: {:?}", outputs);

    // =========================================================================
    // Errors
    // =========================================================================

    println!("\n=== Errors ===\n");

    // A head number the controller does not have
    match conn.read_words(DeviceKind::D, 0x00FF_FF00, 16) {
        Ok(data) => println!("Unexpected data: {:?}", data),
        Err(SlmpError::Controller { end_code, .. }) => {
            println!(
                "Controller refused: 0x{:04X} ({})",
                end_code,
                end_code_description(end_code)
            );
        }
        Err(e) => println!("Error: {} (code {})", e, e.code()),
    }

    // Rejected locally, nothing is sent
    if let Err(e) = conn.read_words(DeviceKind::M, 0, 1) {
        println!("Local check: {}", e);
    }

    conn.shutdown()
}
