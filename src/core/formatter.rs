//! Byte-count to human-readable conversion.
//!
//! Every reading is split into a magnitude ("1.2") and a unit ("GB"), drawn
//! from KB, MB, GB and TB only. Sub-kilobyte counts are reported in KB and zero
//! is rendered numerically. Two process-wide switches select the number and
//! unit style; they are read on every call.

use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

use crate::config::{BYTES_PER_KB, RATE_SUFFIX};

/// Number format of the magnitude string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum NumberStyle {
    /// Shortest rendering: "1.2", "1".
    #[default]
    Auto,
    /// Fraction zero-padded to the unit's precision so widths stay stable: "1.20", "1.0".
    Consistent,
}

/// Format of the unit string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum UnitStyle {
    /// "KB", "MB", "KB/s".
    #[default]
    Full,
    /// Trailing unit character dropped: "K", "M", "K/s".
    Short,
}

static NUMBER_STYLE: AtomicU8 = AtomicU8::new(0);
static UNIT_STYLE: AtomicU8 = AtomicU8::new(0);

/// Current process-wide number style.
pub fn number_style() -> NumberStyle {
    match NUMBER_STYLE.load(Ordering::Relaxed) {
        1 => NumberStyle::Consistent,
        _ => NumberStyle::Auto,
    }
}

/// Change the number style used by every later formatting call.
pub fn set_number_style(style: NumberStyle) {
    let raw = match style {
        NumberStyle::Auto => 0,
        NumberStyle::Consistent => 1,
    };
    NUMBER_STYLE.store(raw, Ordering::Relaxed);
}

/// Current process-wide unit style.
pub fn unit_style() -> UnitStyle {
    match UNIT_STYLE.load(Ordering::Relaxed) {
        1 => UnitStyle::Short,
        _ => UnitStyle::Full,
    }
}

/// Change the unit style used by every later formatting call.
pub fn set_unit_style(style: UnitStyle) {
    let raw = match style {
        UnitStyle::Full => 0,
        UnitStyle::Short => 1,
    };
    UNIT_STYLE.store(raw, Ordering::Relaxed);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteUnit {
    Kilobyte,
    Megabyte,
    Gigabyte,
    Terabyte,
}

const UNITS: [ByteUnit; 4] = [
    ByteUnit::Kilobyte,
    ByteUnit::Megabyte,
    ByteUnit::Gigabyte,
    ByteUnit::Terabyte,
];

impl ByteUnit {
    fn size(self) -> u64 {
        let kb = BYTES_PER_KB as u64;
        match self {
            ByteUnit::Kilobyte => kb,
            ByteUnit::Megabyte => kb.pow(2),
            ByteUnit::Gigabyte => kb.pow(3),
            ByteUnit::Terabyte => kb.pow(4),
        }
    }

    fn fraction_digits(self) -> usize {
        match self {
            ByteUnit::Kilobyte => 0,
            ByteUnit::Megabyte => 1,
            ByteUnit::Gigabyte | ByteUnit::Terabyte => 2,
        }
    }

    fn token(self) -> &'static str {
        match self {
            ByteUnit::Kilobyte => "KB",
            ByteUnit::Megabyte => "MB",
            ByteUnit::Gigabyte => "GB",
            ByteUnit::Terabyte => "TB",
        }
    }
}

/// Pick the unit for `byte_count` and its rounded absolute value in that unit.
fn scale(byte_count: i64) -> (f64, ByteUnit) {
    let abs = byte_count.unsigned_abs();
    let mut idx = UNITS.iter().rposition(|u| abs >= u.size()).unwrap_or(0);
    loop {
        let unit = UNITS[idx];
        let value = round_to(abs as f64 / unit.size() as f64, unit.fraction_digits());
        // 999_999 bytes rounds to "1000 KB"; promote it to "1 MB".
        if value >= 1000.0 && idx + 1 < UNITS.len() {
            idx += 1;
            continue;
        }
        return (value, unit);
    }
}

fn round_to(value: f64, digits: usize) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() / factor
}

/// Magnitude part of `byte_count`, e.g. "1.2" for 1 200 000 000 bytes.
pub fn human_readable_magnitude(byte_count: i64, style: NumberStyle) -> String {
    let (value, unit) = scale(byte_count);
    let mut text = format!("{:.*}", unit.fraction_digits(), value);
    if style == NumberStyle::Auto && text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(trimmed);
    }
    if byte_count < 0 && value != 0.0 {
        text.insert(0, '-');
    }
    text
}

/// Unit part of `byte_count`, e.g. "GB" (full) or "G" (short).
pub fn human_readable_unit(byte_count: i64, style: UnitStyle) -> String {
    let (_, unit) = scale(byte_count);
    let token = unit.token();
    match style {
        UnitStyle::Full => token.to_string(),
        UnitStyle::Short => token[..token.len() - 1].to_string(),
    }
}

/// Unit part of a per-second reading: the styled unit followed by "/s".
pub fn human_readable_rate_unit(byte_count: i64, style: UnitStyle) -> String {
    let mut unit = human_readable_unit(byte_count, style);
    unit.push_str(RATE_SUFFIX);
    unit
}

/// A fixed pair of styles. Packs format every field through one of these so a
/// style change in the middle of building a pack cannot mix styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ByteFormatter {
    pub number_style: NumberStyle,
    pub unit_style: UnitStyle,
}

impl ByteFormatter {
    pub fn new(number_style: NumberStyle, unit_style: UnitStyle) -> Self {
        Self {
            number_style,
            unit_style,
        }
    }

    /// Formatter reflecting the process-wide switches at this instant.
    pub fn current() -> Self {
        Self::new(number_style(), unit_style())
    }

    pub fn magnitude(&self, byte_count: i64) -> String {
        human_readable_magnitude(byte_count, self.number_style)
    }

    pub fn unit(&self, byte_count: i64) -> String {
        human_readable_unit(byte_count, self.unit_style)
    }

    pub fn rate_unit(&self, byte_count: i64) -> String {
        human_readable_rate_unit(byte_count, self.unit_style)
    }
}
