//! Decoder core
//!
//! Owns the CV store, the function cache and the renderer, and keeps the light
//! output consistent with them. Every state change re-renders synchronously.

use embassy_time::{Duration, block_for};

#[cfg(feature = "esp32-log")]
use esp_println::println;

use crate::config::DecoderConfig;
use crate::cv::CvStore;
use crate::error::{ConfigError, Error};
use crate::event::{DecoderEvent, EventReceiver};
use crate::function::{FunctionCache, FunctionGroup};
use crate::gamma::LuminanceTable;
use crate::renderer::{LightChannel, LightOutput, LightRenderer};
use crate::{DecoderEvents, OutputDriver, Storage};

/// Default CV capacity of a [`Decoder`]
pub const DEFAULT_MAX_CVS: usize = 16;

/// Erased EEPROM cells read back as this value
const ERASED_BYTE: u8 = 0xFF;

/// Light decoder - the main orchestrator
///
/// N is the maximum number of CVs
pub struct Decoder<S: Storage, O: OutputDriver, const N: usize = DEFAULT_MAX_CVS> {
    // External dependencies and configuration
    storage: S,
    output: O,
    ack_pulse: Duration,

    // Internal state
    cvs: CvStore<N>,
    functions: FunctionCache,
    service_mode: bool,
    last_output: LightOutput,

    // Internal dependencies
    renderer: LightRenderer,
}

impl<S: Storage, O: OutputDriver, const N: usize> Decoder<S, O, N> {
    /// Create the decoder and restore the last committed state
    ///
    /// Loads the function cache and every CV from `storage`, arms the factory
    /// reset when the store is erased (if configured), then renders once.
    pub fn new(config: &DecoderConfig<'_>, mut storage: S, output: O) -> Result<Self, ConfigError> {
        let mut cvs = CvStore::new(config.cvs, config.cv_base_address)?;
        let mut functions = FunctionCache::new(config.function_cache_address);
        let cv_range = cvs.address_range();
        let cache_range = functions.address_range();
        let address_limit = u32::from(u16::MAX) + 1;
        if cv_range.end > address_limit || cache_range.end > address_limit {
            return Err(ConfigError::AddressOutOfRange);
        }
        if cv_range.start < cache_range.end && cache_range.start < cv_range.end {
            return Err(ConfigError::CacheOverlapsCvs);
        }
        let renderer = LightRenderer::new(&config.light, &cvs)?;

        functions.load(&mut storage);
        cvs.load(&mut storage);

        if config.auto_factory_default
            && !cvs.is_empty()
            && cvs.records().iter().all(|r| r.value() == ERASED_BYTE)
        {
            #[cfg(feature = "esp32-log")]
            println!("[Decoder.new] storage erased, restoring factory defaults");
            cvs.begin_factory_reset();
        }

        let mut decoder = Self {
            storage,
            output,
            ack_pulse: config.ack_pulse,
            cvs,
            functions,
            service_mode: false,
            last_output: LightOutput::OFF,
            renderer,
        };
        decoder.render();

        Ok(decoder)
    }

    /// Replace the luminance tables and re-render
    #[must_use]
    pub fn with_tables(mut self, warm: LuminanceTable, cool: LuminanceTable) -> Self {
        self.renderer = self.renderer.with_tables(warm, cool);
        self.render();
        self
    }

    /// Re-evaluate the light and drive the outputs
    ///
    /// Outputs stay dark in service mode; the result is still returned.
    pub fn render(&mut self) -> LightOutput {
        let output = self.renderer.render(&self.cvs, &self.functions);
        self.last_output = output;
        if !self.service_mode {
            self.drive(output);
        }
        output
    }

    /// One pass of the main loop
    ///
    /// `cv_ready` tells whether the protocol layer can accept a CV commit.
    /// Returns true while a factory reset is still in progress.
    pub fn poll(&mut self, cv_ready: bool) -> Result<bool, Error> {
        self.step_factory_reset(cv_ready)
    }

    /// Arm the factory reset sequencer
    pub fn begin_factory_reset(&mut self) {
        self.cvs.begin_factory_reset();
    }

    /// Restore at most one CV default
    pub fn step_factory_reset(&mut self, ready: bool) -> Result<bool, Error> {
        let progress = self.cvs.step_factory_reset(&mut self.storage, ready)?;
        if progress.write.is_some_and(|w| w.is_stored()) {
            self.render();
        }
        Ok(progress.in_progress)
    }

    /// Apply every queued event
    ///
    /// Stops at the first rejected event and returns its error; events behind
    /// it stay queued for the next call.
    pub fn process_pending<const SIZE: usize>(
        &mut self,
        events: &EventReceiver<'_, SIZE>,
    ) -> Result<(), Error> {
        while let Some(event) = events.try_receive() {
            self.handle(event)?;
        }
        Ok(())
    }

    /// Apply a single event
    pub fn handle(&mut self, event: DecoderEvent) -> Result<(), Error> {
        match event {
            DecoderEvent::FunctionGroupChanged { group, bits } => {
                self.function_group_changed(group, bits)?;
            }
            DecoderEvent::CvWrite { number, value } => {
                self.cv_write(number, value)?;
            }
            DecoderEvent::FactoryReset => self.factory_reset_requested(),
            DecoderEvent::ServiceMode(active) => self.service_mode_changed(active),
        }
        Ok(())
    }

    /// Check if function `index` is on
    pub fn is_function_active(&self, index: u8) -> bool {
        self.functions.is_active(index)
    }

    /// Last rendered duty cycles
    pub const fn output(&self) -> LightOutput {
        self.last_output
    }

    pub const fn is_service_mode(&self) -> bool {
        self.service_mode
    }

    pub const fn cvs(&self) -> &CvStore<N> {
        &self.cvs
    }

    pub const fn functions(&self) -> &FunctionCache {
        &self.functions
    }

    pub const fn storage(&self) -> &S {
        &self.storage
    }

    pub const fn output_driver(&self) -> &O {
        &self.output
    }

    /// Release the hardware collaborators
    pub fn into_parts(self) -> (S, O) {
        (self.storage, self.output)
    }

    fn drive(&mut self, output: LightOutput) {
        self.output.set_duty(LightChannel::WarmWhite, output.warm);
        self.output.set_duty(LightChannel::CoolWhite, output.cool);
    }
}

impl<S: Storage, O: OutputDriver, const N: usize> DecoderEvents for Decoder<S, O, N> {
    fn function_group_changed(&mut self, group: FunctionGroup, bits: u8) -> Result<(), Error> {
        if self.functions.update(&mut self.storage, group, bits)? {
            self.render();
        }
        Ok(())
    }

    fn cv_read(&mut self, number: u16) -> Result<u8, Error> {
        self.cvs.read(number)
    }

    fn cv_write(&mut self, number: u16, value: u8) -> Result<u8, Error> {
        if self.cvs.write(&mut self.storage, number, value)?.is_stored() {
            self.render();
        }
        Ok(value)
    }

    fn cv_valid(&mut self, number: u16, for_write: bool) -> bool {
        self.cvs.is_valid(number, for_write)
    }

    fn factory_reset_requested(&mut self) {
        self.begin_factory_reset();
    }

    fn acknowledge_pulse(&mut self) {
        #[cfg(feature = "esp32-log")]
        println!("[Decoder.acknowledge_pulse] {}ms", self.ack_pulse.as_millis());
        self.drive(LightOutput::FULL);
        block_for(self.ack_pulse);
        self.drive(LightOutput::OFF);
    }

    fn service_mode_changed(&mut self, active: bool) {
        #[cfg(feature = "esp32-log")]
        println!("[Decoder.service_mode_changed] active={}", active);
        self.service_mode = active;
        if active {
            self.drive(LightOutput::OFF);
        } else {
            self.render();
        }
    }
}
