#![no_std]

pub mod config;
pub mod cv;
pub mod decoder;
pub mod error;
pub mod event;
pub mod function;
pub mod gamma;
pub mod renderer;

pub use config::{CvDefinition, DecoderConfig, LightCvMap, SecondaryLightCvs};
pub use cv::{CvRecord, CvStore, FactoryReset, ResetProgress, WriteOutcome};
pub use decoder::Decoder;
pub use error::{ConfigError, Error, StorageError};
pub use event::{DecoderEvent, EventQueue, EventReceiver, EventSender};
pub use function::{FUNCTION_COUNT, FunctionCache, FunctionGroup};
pub use gamma::{LuminanceTable, gamma_cool, gamma_warm};
pub use renderer::{LightChannel, LightOutput, LightRenderer};
pub use embassy_time::Duration;

/// Abstract PWM driver trait
///
/// Implement this trait to support different hardware platforms.
/// The decoder is generic over this trait.
pub trait OutputDriver {
    /// Set the duty cycle of one channel (0 = off, 255 = always on)
    fn set_duty(&mut self, channel: LightChannel, duty: u8);
}

/// Byte addressed non-volatile storage, usually the MCU EEPROM
pub trait Storage {
    fn read_byte(&mut self, address: u16) -> u8;

    fn persist_byte(&mut self, address: u16, value: u8) -> Result<(), StorageError>;

    /// Fill `buf` from consecutive addresses starting at `address`
    fn read_block(&mut self, address: u16, buf: &mut [u8]) {
        for (offset, byte) in (0u16..).zip(buf.iter_mut()) {
            *byte = self.read_byte(address.wrapping_add(offset));
        }
    }

    /// Write `bytes` to consecutive addresses starting at `address`
    fn persist_block(&mut self, address: u16, bytes: &[u8]) -> Result<(), StorageError> {
        for (offset, byte) in (0u16..).zip(bytes) {
            self.persist_byte(address.wrapping_add(offset), *byte)?;
        }
        Ok(())
    }
}

/// Inbound interface driven by the DCC protocol layer
///
/// The protocol library holds a reference to an implementor and calls these
/// from its packet processing.
pub trait DecoderEvents {
    /// A function group packet was received
    fn function_group_changed(&mut self, group: FunctionGroup, bits: u8) -> Result<(), Error>;

    fn cv_read(&mut self, number: u16) -> Result<u8, Error>;

    /// Write a CV, echoing the accepted value
    fn cv_write(&mut self, number: u16, value: u8) -> Result<u8, Error>;

    /// Check if a CV exists, and is writable when `for_write` is set
    fn cv_valid(&mut self, number: u16, for_write: bool) -> bool;

    fn factory_reset_requested(&mut self);

    /// Raise the load on both channels for the acknowledge window
    fn acknowledge_pulse(&mut self);

    fn service_mode_changed(&mut self, active: bool);
}
