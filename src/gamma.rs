//! Luminance correction
//!
//! Perceived brightness is not linear in LED drive level. The tables below map
//! a linear brightness (0-255) to a PWM duty cycle with a gamma of 2.2. The
//! cool white LED is brighter than the warm one, so its table tops out lower.

/// 256 entry brightness to duty cycle lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LuminanceTable([u8; 256]);

impl LuminanceTable {
    /// Wrap a precomputed table
    pub const fn from_lut(lut: [u8; 256]) -> Self {
        Self(lut)
    }

    /// Build a table for `gamma` with outputs scaled to `ceiling`
    ///
    /// Entry `i` is `round(ceiling * (i / 255) ^ gamma)`. Non-positive gammas
    /// fall back to a linear curve.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn with_gamma(gamma: f32, ceiling: u8) -> Self {
        let gamma = if gamma > 0.0 { gamma } else { 1.0 };
        let mut lut = [0u8; 256];
        for (i, entry) in lut.iter_mut().enumerate() {
            let normalized = f32::from(i as u8) / 255.0;
            let level = libm::powf(normalized, gamma) * f32::from(ceiling);
            *entry = libm::roundf(level).clamp(0.0, f32::from(ceiling)) as u8;
        }
        Self(lut)
    }

    /// Duty cycle for a linear brightness level
    #[inline]
    pub const fn apply(&self, level: u8) -> u8 {
        self.0[level as usize]
    }

    /// Highest duty cycle the table produces
    pub const fn ceiling(&self) -> u8 {
        self.0[255]
    }

    pub const fn as_array(&self) -> &[u8; 256] {
        &self.0
    }
}

/// Warm white channel, gamma 2.2, output range 255
pub const WARM_WHITE: LuminanceTable = LuminanceTable::from_lut(WARM_WHITE_LUT);

/// Cool white channel, gamma 2.2, output range 230
pub const COOL_WHITE: LuminanceTable = LuminanceTable::from_lut(COOL_WHITE_LUT);

/// Gamma-correct a warm white brightness level
#[inline]
pub const fn gamma_warm(level: u8) -> u8 {
    WARM_WHITE.apply(level)
}

/// Gamma-correct a cool white brightness level
#[inline]
pub const fn gamma_cool(level: u8) -> u8 {
    COOL_WHITE.apply(level)
}

#[rustfmt::skip]
const WARM_WHITE_LUT: [u8; 256] = [
      0,   0,   0,   1,   1,   1,   1,   1,   1,   1,   1,   1,   1,   1,   1,   1,
      1,   1,   1,   1,   1,   2,   2,   2,   2,   2,   2,   2,   2,   3,   3,   3,
      3,   3,   4,   4,   4,   4,   4,   5,   5,   5,   5,   6,   6,   6,   6,   7,
      7,   7,   8,   8,   8,   9,   9,   9,  10,  10,  10,  11,  11,  11,  12,  12,
     13,  13,  14,  14,  14,  15,  15,  16,  16,  17,  17,  18,  18,  19,  19,  20,
     20,  21,  22,  22,  23,  23,  24,  24,  25,  26,  26,  27,  28,  28,  29,  30,
     30,  31,  32,  32,  33,  34,  34,  35,  36,  37,  37,  38,  39,  40,  41,  41,
     42,  43,  44,  45,  46,  46,  47,  48,  49,  50,  51,  52,  53,  54,  55,  56,
     56,  57,  58,  59,  60,  61,  62,  63,  64,  65,  67,  68,  69,  70,  71,  72,
     73,  74,  75,  76,  78,  79,  80,  81,  82,  83,  85,  86,  87,  88,  89,  91,
     92,  93,  94,  96,  97,  98, 100, 101, 102, 104, 105, 106, 108, 109, 110, 112,
    113, 115, 116, 118, 119, 120, 122, 123, 125, 126, 128, 129, 131, 132, 134, 136,
    137, 139, 140, 142, 143, 145, 147, 148, 150, 152, 153, 155, 157, 158, 160, 162,
    163, 165, 167, 169, 170, 172, 174, 176, 177, 179, 181, 183, 185, 187, 188, 190,
    192, 194, 196, 198, 200, 202, 204, 206, 208, 210, 212, 214, 216, 218, 220, 222,
    224, 226, 228, 230, 232, 234, 236, 238, 240, 242, 245, 247, 249, 251, 253, 255,
];

#[rustfmt::skip]
const COOL_WHITE_LUT: [u8; 256] = [
      0,   0,   0,   1,   1,   1,   1,   1,   1,   1,   1,   1,   1,   1,   1,   1,
      1,   1,   1,   1,   1,   1,   2,   2,   2,   2,   2,   2,   2,   2,   3,   3,
      3,   3,   3,   3,   4,   4,   4,   4,   4,   5,   5,   5,   5,   6,   6,   6,
      6,   7,   7,   7,   7,   8,   8,   8,   9,   9,   9,  10,  10,  10,  11,  11,
     11,  12,  12,  13,  13,  13,  14,  14,  15,  15,  16,  16,  17,  17,  17,  18,
     18,  19,  19,  20,  20,  21,  22,  22,  23,  23,  24,  24,  25,  25,  26,  27,
     27,  28,  29,  29,  30,  30,  31,  32,  32,  33,  34,  35,  35,  36,  37,  37,
     38,  39,  40,  40,  41,  42,  43,  43,  44,  45,  46,  47,  48,  48,  49,  50,
     51,  52,  53,  54,  55,  55,  56,  57,  58,  59,  60,  61,  62,  63,  64,  65,
     66,  67,  68,  69,  70,  71,  72,  73,  74,  75,  76,  77,  79,  80,  81,  82,
     83,  84,  85,  86,  88,  89,  90,  91,  92,  94,  95,  96,  97,  98, 100, 101,
    102, 104, 105, 106, 107, 109, 110, 111, 113, 114, 115, 117, 118, 119, 121, 122,
    124, 125, 127, 128, 129, 131, 132, 134, 135, 137, 138, 140, 141, 143, 144, 146,
    147, 149, 151, 152, 154, 155, 157, 159, 160, 162, 163, 165, 167, 168, 170, 172,
    173, 175, 177, 179, 180, 182, 184, 186, 187, 189, 191, 193, 194, 196, 198, 200,
    202, 204, 205, 207, 209, 211, 213, 215, 217, 219, 221, 223, 225, 227, 229, 230,
];
