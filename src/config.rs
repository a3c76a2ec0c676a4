//! Decoder configuration
//!
//! CV numbering, storage layout and light roles are data, not code. The
//! built-in [`DecoderConfig::interior_light`] describes a coach interior
//! light with two switchable brightness/colour temperature presets.

use embassy_time::Duration;

/// Selector value meaning "secondary light set not used"
pub const FUNCTION_UNUSED: u8 = 255;

/// Default length of the service mode acknowledge pulse
pub const DEFAULT_ACK_PULSE: Duration = Duration::from_millis(6);

/// Static description of one CV
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CvDefinition {
    /// CV number as used on the wire
    pub number: u16,
    /// False for read-only CVs
    pub writable: bool,
    /// Restore `default_value` on factory reset
    pub reset_to_default: bool,
    pub default_value: u8,
}

impl CvDefinition {
    /// Writable CV restored on factory reset
    pub const fn new(number: u16, default_value: u8) -> Self {
        Self {
            number,
            writable: true,
            reset_to_default: true,
            default_value,
        }
    }

    /// Read-only CV, left alone on factory reset
    pub const fn read_only(number: u16, default_value: u8) -> Self {
        Self {
            number,
            writable: false,
            reset_to_default: false,
            default_value,
        }
    }
}

/// CV numbers of the secondary brightness/colour temperature preset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecondaryLightCvs {
    pub brightness: u16,
    pub color_temperature: u16,
    /// Function selector, [`FUNCTION_UNUSED`] disables the preset
    pub function_control: u16,
}

/// Which CVs drive the light renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightCvMap {
    pub brightness: u16,
    /// 0 is full warm white, 255 full cool white
    pub color_temperature: u16,
    /// Function that switches the light on
    pub function_control: u16,
    pub secondary: Option<SecondaryLightCvs>,
    /// Away from its default, brightness and colour temperature CVs are raw duty cycles
    pub test_mode: Option<u16>,
}

/// Configuration for the decoder
#[derive(Debug, Clone)]
pub struct DecoderConfig<'a> {
    /// Ordered CV table, position `i` lives at `cv_base_address + i`
    pub cvs: &'a [CvDefinition],
    pub cv_base_address: u16,
    /// First byte of the packed function group cache
    pub function_cache_address: u16,
    pub light: LightCvMap,
    pub ack_pulse: Duration,
    /// Arm the factory reset when the backing store is erased
    pub auto_factory_default: bool,
}

pub const CV_PRIMARY_ADDRESS: u16 = 1;
pub const CV_MANUFACTURER_VERSION: u16 = 7;
pub const CV_MANUFACTURER_ID: u16 = 8;
pub const CV_EXTENDED_ADDRESS_MSB: u16 = 17;
pub const CV_EXTENDED_ADDRESS_LSB: u16 = 18;
pub const CV_CONSIST_ADDRESS: u16 = 19;
pub const CV_MODE_CONTROL: u16 = 29;
pub const CV_LIGHT_BRIGHTNESS: u16 = 1000;
pub const CV_LIGHT_COLOR_TEMPERATURE: u16 = 1001;
pub const CV_LIGHT_FUNCTION: u16 = 1002;
pub const CV_LIGHT_BRIGHTNESS_2: u16 = 1003;
pub const CV_LIGHT_COLOR_TEMPERATURE_2: u16 = 1004;
pub const CV_LIGHT_FUNCTION_2: u16 = 1005;
pub const CV_LIGHT_TEST: u16 = 1010;

/// CV table of the interior light decoder
pub const INTERIOR_LIGHT_CVS: [CvDefinition; 14] = [
    CvDefinition::new(CV_PRIMARY_ADDRESS, 3),
    CvDefinition::read_only(CV_MANUFACTURER_VERSION, 0),
    CvDefinition::read_only(CV_MANUFACTURER_ID, 0),
    CvDefinition::new(CV_EXTENDED_ADDRESS_MSB, 0),
    CvDefinition::new(CV_EXTENDED_ADDRESS_LSB, 0),
    CvDefinition::new(CV_CONSIST_ADDRESS, 0),
    CvDefinition::new(CV_MODE_CONTROL, 2),
    CvDefinition::new(CV_LIGHT_BRIGHTNESS, 50),
    CvDefinition::new(CV_LIGHT_COLOR_TEMPERATURE, 255),
    CvDefinition::new(CV_LIGHT_FUNCTION, 1),
    CvDefinition::new(CV_LIGHT_BRIGHTNESS_2, 30),
    CvDefinition::new(CV_LIGHT_COLOR_TEMPERATURE_2, 255),
    CvDefinition::new(CV_LIGHT_FUNCTION_2, 20),
    CvDefinition::new(CV_LIGHT_TEST, 0),
];

/// Light roles of the interior light decoder
pub const INTERIOR_LIGHT_MAP: LightCvMap = LightCvMap {
    brightness: CV_LIGHT_BRIGHTNESS,
    color_temperature: CV_LIGHT_COLOR_TEMPERATURE,
    function_control: CV_LIGHT_FUNCTION,
    secondary: Some(SecondaryLightCvs {
        brightness: CV_LIGHT_BRIGHTNESS_2,
        color_temperature: CV_LIGHT_COLOR_TEMPERATURE_2,
        function_control: CV_LIGHT_FUNCTION_2,
    }),
    test_mode: Some(CV_LIGHT_TEST),
};

impl DecoderConfig<'static> {
    /// Interior light decoder on a 256 byte EEPROM
    ///
    /// CVs occupy the first bytes, the five function groups the last five.
    pub const fn interior_light() -> Self {
        Self {
            cvs: &INTERIOR_LIGHT_CVS,
            cv_base_address: 0,
            function_cache_address: 256 - crate::function::GROUP_COUNT as u16,
            light: INTERIOR_LIGHT_MAP,
            ack_pulse: DEFAULT_ACK_PULSE,
            auto_factory_default: true,
        }
    }
}

impl Default for DecoderConfig<'static> {
    fn default() -> Self {
        Self::interior_light()
    }
}
