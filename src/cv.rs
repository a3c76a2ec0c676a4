//! CV store
//!
//! Owns every [`CvRecord`] of the decoder. Values are cached in RAM and
//! written through to the backing [`Storage`] at an address derived from
//! the record position in the table.

use heapless::Vec;

#[cfg(feature = "esp32-log")]
use esp_println::println;

use crate::Storage;
use crate::config::CvDefinition;
use crate::error::{ConfigError, Error};

/// A CV definition together with its cached value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CvRecord {
    pub number: u16,
    pub writable: bool,
    pub apply_default_on_reset: bool,
    pub default_value: u8,
    cached_value: u8,
}

impl CvRecord {
    const fn from_definition(def: &CvDefinition) -> Self {
        Self {
            number: def.number,
            writable: def.writable,
            apply_default_on_reset: def.reset_to_default,
            default_value: def.default_value,
            cached_value: def.default_value,
        }
    }

    /// Current value
    pub const fn value(&self) -> u8 {
        self.cached_value
    }
}

/// Result of a successful write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Value equals the cached one, nothing was persisted
    Unchanged,
    /// Value was persisted and cached
    Stored,
}

impl WriteOutcome {
    pub const fn is_stored(self) -> bool {
        matches!(self, Self::Stored)
    }
}

/// Factory reset sequencer state
///
/// `Pending(k)` means `k` records are still to be visited, walking the table
/// from the end towards the start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FactoryReset {
    #[default]
    Idle,
    Pending(usize),
}

impl FactoryReset {
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

/// Progress report of one factory reset step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetProgress {
    /// More steps are needed
    pub in_progress: bool,
    /// Outcome of the default write, if one was issued
    pub write: Option<WriteOutcome>,
}

/// Keyed CV table with defaults, validity and write-through persistence
///
/// N is the maximum number of CVs
#[derive(Debug, Clone)]
pub struct CvStore<const N: usize> {
    records: Vec<CvRecord, N>,
    base_address: u16,
    reset: FactoryReset,
}

impl<const N: usize> CvStore<N> {
    /// Build the store from a CV table
    ///
    /// Cached values start at their defaults until [`CvStore::load`] runs.
    pub fn new(definitions: &[CvDefinition], base_address: u16) -> Result<Self, ConfigError> {
        let mut records: Vec<CvRecord, N> = Vec::new();
        for def in definitions {
            if records.iter().any(|r| r.number == def.number) {
                return Err(ConfigError::DuplicateCv(def.number));
            }
            records
                .push(CvRecord::from_definition(def))
                .map_err(|_| ConfigError::TooManyCvs)?;
        }
        Ok(Self {
            records,
            base_address,
            reset: FactoryReset::Idle,
        })
    }

    /// Number of managed CVs
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in table order
    pub fn records(&self) -> &[CvRecord] {
        &self.records
    }

    /// Storage address range used by the CV bytes
    pub fn address_range(&self) -> core::ops::Range<u32> {
        let start = u32::from(self.base_address);
        start..start + self.records.len() as u32
    }

    /// Fill every cached value from the backing store
    pub fn load<S: Storage>(&mut self, storage: &mut S) {
        for (index, record) in self.records.iter_mut().enumerate() {
            record.cached_value = storage.read_byte(Self::address_of(self.base_address, index));
        }
    }

    /// Table position of a CV number
    pub fn position(&self, number: u16) -> Option<usize> {
        self.records.iter().position(|r| r.number == number)
    }

    /// Check if a CV can be read, or written when `for_write` is set
    pub fn is_valid(&self, number: u16, for_write: bool) -> bool {
        #[cfg(feature = "esp32-log")]
        println!("[CvStore.is_valid] CV{} for_write={}", number, for_write);
        match self.position(number) {
            Some(index) => !for_write || self.records[index].writable,
            None => false,
        }
    }

    /// Read the cached value of a CV
    pub fn read(&self, number: u16) -> Result<u8, Error> {
        let index = self.position(number).ok_or(Error::UnknownCv(number))?;
        let value = self.records[index].cached_value;
        #[cfg(feature = "esp32-log")]
        println!("[CvStore.read] CV{} = {}", number, value);
        Ok(value)
    }

    /// Cached value by table position
    pub(crate) fn value_at(&self, index: usize) -> u8 {
        self.records.get(index).map_or(0, CvRecord::value)
    }

    /// Write a CV, persisting it first when the value changes
    ///
    /// The cached value is only updated after the backing store accepted the byte.
    pub fn write<S: Storage>(
        &mut self,
        storage: &mut S,
        number: u16,
        value: u8,
    ) -> Result<WriteOutcome, Error> {
        let index = self.position(number).ok_or(Error::UnknownCv(number))?;
        if !self.records[index].writable {
            return Err(Error::NotWritable(number));
        }
        self.commit(storage, index, value)
    }

    /// Persist-then-cache for the record at `index`, skipped when unchanged
    fn commit<S: Storage>(
        &mut self,
        storage: &mut S,
        index: usize,
        value: u8,
    ) -> Result<WriteOutcome, Error> {
        let address = Self::address_of(self.base_address, index);
        let record = &mut self.records[index];
        if record.cached_value == value {
            return Ok(WriteOutcome::Unchanged);
        }

        storage.persist_byte(address, value)?;
        record.cached_value = value;
        #[cfg(feature = "esp32-log")]
        println!("[CvStore.write] CV{} = {} at address {}", record.number, value, address);

        Ok(WriteOutcome::Stored)
    }

    /// Current factory reset state
    pub const fn factory_reset(&self) -> FactoryReset {
        self.reset
    }

    /// Arm the factory reset sequencer
    ///
    /// Does nothing while a reset is already pending.
    pub fn begin_factory_reset(&mut self) {
        if self.reset.is_pending() || self.records.is_empty() {
            return;
        }
        #[cfg(feature = "esp32-log")]
        println!("[CvStore.begin_factory_reset] {} CVs pending", self.records.len());
        self.reset = FactoryReset::Pending(self.records.len());
    }

    /// Visit one record of a pending factory reset
    ///
    /// Only advances when `ready` is set. Records flagged for reset get their
    /// default through the same change-detecting, persisting path as
    /// [`CvStore::write`]; the writable flag does not apply to defaults.
    /// A failed write keeps the sequencer on the same record so the next
    /// ready signal retries it.
    pub fn step_factory_reset<S: Storage>(
        &mut self,
        storage: &mut S,
        ready: bool,
    ) -> Result<ResetProgress, Error> {
        let FactoryReset::Pending(remaining) = self.reset else {
            return Ok(ResetProgress {
                in_progress: false,
                write: None,
            });
        };
        if !ready {
            return Ok(ResetProgress {
                in_progress: true,
                write: None,
            });
        }

        let index = remaining - 1;
        let record = self.records[index];
        let write = if record.apply_default_on_reset {
            Some(self.commit(storage, index, record.default_value)?)
        } else {
            None
        };

        self.reset = if index == 0 {
            FactoryReset::Idle
        } else {
            FactoryReset::Pending(index)
        };

        Ok(ResetProgress {
            in_progress: self.reset.is_pending(),
            write,
        })
    }

    fn address_of(base_address: u16, index: usize) -> u16 {
        #[allow(clippy::cast_possible_truncation)]
        base_address.wrapping_add(index as u16)
    }
}
