//! Function state cache
//!
//! Functions F0..F28 arrive in five groups, each packed into one byte. The
//! group boundaries and bit positions follow the DCC function packet layout:
//! F0 sits in bit 4 of the first group, every other function counts up from
//! bit 0 of its group.

#[cfg(feature = "esp32-log")]
use esp_println::println;

use crate::Storage;
use crate::error::Error;

/// Number of functions, F0..F28
pub const FUNCTION_COUNT: u8 = 29;

/// Number of function groups
pub const GROUP_COUNT: usize = 5;

/// Function groups as delivered by the protocol layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FunctionGroup {
    /// F0 (bit 4) and F1..F4 (bits 0..3)
    F0To4 = 0,
    F5To8 = 1,
    F9To12 = 2,
    F13To20 = 3,
    F21To28 = 4,
}

impl FunctionGroup {
    pub const ALL: [Self; GROUP_COUNT] = [
        Self::F0To4,
        Self::F5To8,
        Self::F9To12,
        Self::F13To20,
        Self::F21To28,
    ];

    pub const fn from_raw(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::F0To4,
            1 => Self::F5To8,
            2 => Self::F9To12,
            3 => Self::F13To20,
            4 => Self::F21To28,
            _ => return None,
        })
    }

    /// Group owning function `index` and its bit mask within the group byte
    pub const fn locate(index: u8) -> Option<(Self, u8)> {
        Some(match index {
            0 => (Self::F0To4, 0x10),
            1..=4 => (Self::F0To4, 1 << (index - 1)),
            5..=8 => (Self::F5To8, 1 << (index - 5)),
            9..=12 => (Self::F9To12, 1 << (index - 9)),
            13..=20 => (Self::F13To20, 1 << (index - 13)),
            21..=28 => (Self::F21To28, 1 << (index - 21)),
            _ => return None,
        })
    }

    const fn slot(self) -> usize {
        self as usize
    }
}

/// Cached on/off state of all functions
///
/// The five group bytes are persisted as one block at `address` on every change.
#[derive(Debug, Clone)]
pub struct FunctionCache {
    groups: [u8; GROUP_COUNT],
    address: u16,
}

impl FunctionCache {
    /// Create an all-off cache persisted at `address`
    pub const fn new(address: u16) -> Self {
        Self {
            groups: [0; GROUP_COUNT],
            address,
        }
    }

    /// Storage address range used by the cache
    pub fn address_range(&self) -> core::ops::Range<u32> {
        let start = u32::from(self.address);
        start..start + GROUP_COUNT as u32
    }

    /// Restore all groups from the backing store
    pub fn load<S: Storage>(&mut self, storage: &mut S) {
        storage.read_block(self.address, &mut self.groups);
    }

    /// Raw bits of one group
    pub const fn group_bits(&self, group: FunctionGroup) -> u8 {
        self.groups[group.slot()]
    }

    /// Apply a function group packet
    ///
    /// Returns `Ok(false)` without touching storage when the bits are unchanged.
    pub fn update<S: Storage>(
        &mut self,
        storage: &mut S,
        group: FunctionGroup,
        bits: u8,
    ) -> Result<bool, Error> {
        if self.groups[group.slot()] == bits {
            return Ok(false);
        }
        #[cfg(feature = "esp32-log")]
        println!("[FunctionCache.update] group {:?} = {:#010b}", group, bits);

        let mut groups = self.groups;
        groups[group.slot()] = bits;
        storage.persist_block(self.address, &groups)?;
        self.groups = groups;

        Ok(true)
    }

    /// State of function `index`
    pub fn state(&self, index: u8) -> Result<bool, Error> {
        let (group, mask) = FunctionGroup::locate(index).ok_or(Error::IndexOutOfRange(index))?;
        Ok(self.groups[group.slot()] & mask != 0)
    }

    /// Check if function `index` is on, out of range functions are off
    pub fn is_active(&self, index: u8) -> bool {
        self.state(index).unwrap_or(false)
    }
}
