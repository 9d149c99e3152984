#![no_std]
#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

pub use format::{INTEGER_BUF_LEN, MAX_FLOAT_PRECISION, format_integer, format_unsigned};
pub use hardware::{Config, DEFAULT_BAUD_RATE, Hardware};
pub use ring_buffer::DEFAULT_CAPACITY;
pub use serial::{Reader, Serial, Writer};

#[cfg(feature = "async-await")]
pub(crate) mod atomic_waker;
mod format;
mod hardware;
#[cfg(feature = "global-logger")]
pub mod logger;
mod ring_buffer;
mod serial;
#[cfg(test)]
mod sim;

/// Error returned by [`Serial::init`] when initialization fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum InitError {
    /// [`Serial::init`] has already been called for this line.
    AlreadyInitialized,
}

/// Returned by [`Writer::try_write`] when the transmit buffer is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct WouldBlock;
