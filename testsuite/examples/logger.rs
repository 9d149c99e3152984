//! @test-mode: defmt
//!
//! defmt frames sent over UART0 by the global logger, directly to the idle transmitter.

#![no_std]
#![no_main]

use irq_serial::Config;
use testsuite::{SERIAL, bind_uart0, drain_serial, entry, exit_success};

bind_uart0!();

#[entry]
fn main() -> ! {
    let (tx, _rx) = SERIAL.init(&Config::default()).unwrap();
    irq_serial::logger::init(tx).unwrap();

    defmt::info!("logger test: start");
    for i in 0..3u32 {
        defmt::info!("logger test: message {}", i);
    }
    defmt::warn!("logger test: float {=f32}", 1.5);

    drain_serial();
    exit_success();
}
