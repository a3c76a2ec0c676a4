#![allow(dead_code)]

use dcc_light_decoder::{LightChannel, OutputDriver, Storage, StorageError};

/// 256 byte EEPROM that records every write
pub struct RecordingStorage {
    pub bytes: [u8; 256],
    pub byte_writes: Vec<(u16, u8)>,
    pub block_writes: Vec<(u16, Vec<u8>)>,
    pub fail_writes: bool,
}

impl RecordingStorage {
    /// Freshly erased EEPROM
    pub fn erased() -> Self {
        Self::filled(0xFF)
    }

    pub fn filled(value: u8) -> Self {
        Self {
            bytes: [value; 256],
            byte_writes: Vec::new(),
            block_writes: Vec::new(),
            fail_writes: false,
        }
    }

    /// EEPROM holding the interior light defaults and all functions off
    pub fn programmed() -> Self {
        let mut storage = Self::filled(0);
        let defaults = [3, 0, 0, 0, 0, 0, 2, 50, 255, 1, 30, 255, 20, 0];
        storage.bytes[..defaults.len()].copy_from_slice(&defaults);
        storage
    }

    pub fn write_count(&self) -> usize {
        self.byte_writes.len() + self.block_writes.len()
    }

    pub fn clear_log(&mut self) {
        self.byte_writes.clear();
        self.block_writes.clear();
    }
}

impl Storage for RecordingStorage {
    fn read_byte(&mut self, address: u16) -> u8 {
        self.bytes[usize::from(address)]
    }

    fn persist_byte(&mut self, address: u16, value: u8) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError { address });
        }
        self.bytes[usize::from(address)] = value;
        self.byte_writes.push((address, value));
        Ok(())
    }

    fn persist_block(&mut self, address: u16, bytes: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError { address });
        }
        let start = usize::from(address);
        self.bytes[start..start + bytes.len()].copy_from_slice(bytes);
        self.block_writes.push((address, bytes.to_vec()));
        Ok(())
    }
}

/// PWM driver that keeps the duty cycle history
#[derive(Default)]
pub struct RecordingDriver {
    pub history: Vec<(LightChannel, u8)>,
}

impl RecordingDriver {
    /// Last duty cycle written to `channel`
    pub fn duty(&self, channel: LightChannel) -> Option<u8> {
        self.history
            .iter()
            .rev()
            .find(|(c, _)| *c == channel)
            .map(|(_, duty)| *duty)
    }
}

impl OutputDriver for RecordingDriver {
    fn set_duty(&mut self, channel: LightChannel, duty: u8) {
        self.history.push((channel, duty));
    }
}
