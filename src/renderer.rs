//! Light rendering
//!
//! Turns the CV store and the function cache into the two duty cycles of the
//! warm white and cool white LED channels. Rendering is pure: the same CVs and
//! functions always give the same output.

#[cfg(feature = "esp32-log")]
use esp_println::println;

use crate::config::{FUNCTION_UNUSED, LightCvMap};
use crate::cv::CvStore;
use crate::error::ConfigError;
use crate::function::FunctionCache;
use crate::gamma::{COOL_WHITE, LuminanceTable, WARM_WHITE};

/// PWM output channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightChannel {
    WarmWhite,
    CoolWhite,
}

/// Duty cycles of both channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LightOutput {
    pub warm: u8,
    pub cool: u8,
}

impl LightOutput {
    pub const OFF: Self = Self { warm: 0, cool: 0 };
    pub const FULL: Self = Self {
        warm: 255,
        cool: 255,
    };

    pub const fn new(warm: u8, cool: u8) -> Self {
        Self { warm, cool }
    }
}

/// Split a brightness into warm and cool levels
///
/// Colour temperature 0 is all warm, 255 all cool.
#[inline]
#[allow(clippy::cast_possible_truncation)]
pub const fn blend_levels(brightness: u8, color_temperature: u8) -> (u8, u8) {
    let brightness = brightness as u16;
    let cool = color_temperature as u16;
    let warm = 255 - cool;
    ((brightness * warm / 256) as u8, (brightness * cool / 256) as u8)
}

/// Table positions of one brightness/colour temperature preset
#[derive(Debug, Clone, Copy)]
struct ParameterSet {
    brightness: usize,
    color_temperature: usize,
}

#[derive(Debug, Clone, Copy)]
struct TestModeCv {
    index: usize,
    default_value: u8,
}

#[derive(Debug, Clone, Copy)]
struct SecondarySet {
    params: ParameterSet,
    function_control: usize,
}

/// Light rendering engine
///
/// CV numbers are resolved to table positions once, at construction.
#[derive(Debug, Clone)]
pub struct LightRenderer {
    primary: ParameterSet,
    function_control: usize,
    secondary: Option<SecondarySet>,
    test_mode: Option<TestModeCv>,
    warm: LuminanceTable,
    cool: LuminanceTable,
}

impl LightRenderer {
    /// Create a renderer with the built-in luminance tables
    pub fn new<const N: usize>(map: &LightCvMap, cvs: &CvStore<N>) -> Result<Self, ConfigError> {
        let resolve = |number: u16| cvs.position(number).ok_or(ConfigError::MissingLightCv(number));

        let primary = ParameterSet {
            brightness: resolve(map.brightness)?,
            color_temperature: resolve(map.color_temperature)?,
        };
        let function_control = resolve(map.function_control)?;
        let test_mode = match map.test_mode {
            Some(number) => {
                let index = resolve(number)?;
                Some(TestModeCv {
                    index,
                    default_value: cvs.records()[index].default_value,
                })
            }
            None => None,
        };
        let secondary = match map.secondary {
            Some(secondary) => Some(SecondarySet {
                params: ParameterSet {
                    brightness: resolve(secondary.brightness)?,
                    color_temperature: resolve(secondary.color_temperature)?,
                },
                function_control: resolve(secondary.function_control)?,
            }),
            None => None,
        };

        Ok(Self {
            primary,
            function_control,
            secondary,
            test_mode,
            warm: WARM_WHITE,
            cool: COOL_WHITE,
        })
    }

    /// Replace the luminance tables
    #[must_use]
    pub const fn with_tables(mut self, warm: LuminanceTable, cool: LuminanceTable) -> Self {
        self.warm = warm;
        self.cool = cool;
        self
    }

    /// Compute the duty cycles for the current state
    pub fn render<const N: usize>(&self, cvs: &CvStore<N>, functions: &FunctionCache) -> LightOutput {
        if !functions.is_active(cvs.value_at(self.function_control)) {
            return LightOutput::OFF;
        }

        if let Some(test_mode) = self.test_mode {
            if cvs.value_at(test_mode.index) != test_mode.default_value {
                return LightOutput::new(
                    cvs.value_at(self.primary.brightness),
                    cvs.value_at(self.primary.color_temperature),
                );
            }
        }

        let params = self.active_set(cvs, functions);
        let (warm_level, cool_level) = blend_levels(
            cvs.value_at(params.brightness),
            cvs.value_at(params.color_temperature),
        );
        let output = LightOutput::new(self.warm.apply(warm_level), self.cool.apply(cool_level));
        #[cfg(feature = "esp32-log")]
        println!(
            "[LightRenderer.render] warm[{}] = {}, cool[{}] = {}",
            warm_level, output.warm, cool_level, output.cool
        );

        output
    }

    /// Secondary preset when it is enabled and its function is on
    fn active_set<const N: usize>(&self, cvs: &CvStore<N>, functions: &FunctionCache) -> ParameterSet {
        match self.secondary {
            Some(secondary) => {
                let selector = cvs.value_at(secondary.function_control);
                if selector != FUNCTION_UNUSED && functions.is_active(selector) {
                    secondary.params
                } else {
                    self.primary
                }
            }
            None => self.primary,
        }
    }
}
