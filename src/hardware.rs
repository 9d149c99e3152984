//! The boundary between the driver and a UART peripheral.

/// Baud rate used by [`Config::default`].
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Line settings passed to [`Hardware::configure`].
///
/// Framing is fixed at 8 data bits, no parity and one stop bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct Config {
    /// Bits per second.
    pub baud_rate: u32,
}

impl Config {
    /// Creates a configuration for the given baud rate.
    pub const fn new(baud_rate: u32) -> Self {
        Config { baud_rate }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new(DEFAULT_BAUD_RATE)
    }
}

/// Register-level access to a single UART.
///
/// The driver calls these methods from mainline code and from both interrupt handlers,
/// so they take `&self`. Implementations wrap memory-mapped registers and should use
/// volatile accesses.
///
/// The driver expects a "transmit ready" interrupt that stays pending for as long as
/// the transmitter can accept a byte, like the AVR UDRE interrupt or a PL011 with its
/// transmit interrupt level left asserted. The transmit handler disables it once there
/// is nothing left to send.
pub trait Hardware {
    /// Applies the baud rate and 8N1 framing, enables the receiver and transmitter, and
    /// unmasks the UART interrupt at the interrupt controller.
    ///
    /// Called once from [`Serial::init`](crate::Serial::init), before the receive
    /// interrupt is enabled.
    fn configure(&self, config: &Config);

    /// Reads the receive data register. This clears the "byte received" condition.
    fn read_data(&self) -> u8;

    /// Writes the transmit data register, starting transmission of `byte`.
    fn write_data(&self, byte: u8);

    /// Returns `true` if [`Hardware::write_data`] would be accepted right now.
    fn is_transmit_ready(&self) -> bool;

    /// Enables or disables the "ready for the next byte" interrupt.
    fn set_transmit_interrupt(&self, enabled: bool);

    /// Enables or disables the "byte received" interrupt.
    fn set_receive_interrupt(&self, enabled: bool);
}
