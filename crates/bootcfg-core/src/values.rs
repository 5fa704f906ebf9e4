//! Option value parsers and formatters
//!
//! Every parser takes the raw token of one `key = value` line and either
//! returns a typed value or a [`ValueError`]. Out-of-range input is rejected,
//! never clamped.
//!
//! Fixed-point values are counts of 1e-8 units stored in an `i64`, so `1.5`
//! is stored as `150_000_000` and renders back as `"1.5"`.

use crate::error::ValueError;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Scale of fixed-point values (10^8)
pub const FIXED_POINT_SCALE: i64 = 100_000_000;

/// Number of fractional digits kept by fixed-point values
pub const FIXED_POINT_DIGITS: usize = 8;

/// Button names by bit position. `?` marks unassigned bits.
pub const KEY_NAMES: [&str; 32] = [
    "A",
    "B",
    "Select",
    "Start",
    "Right",
    "Left",
    "Up",
    "Down",
    "R",
    "L",
    "X",
    "Y",
    "?",
    "?",
    "ZL",
    "ZR",
    "?",
    "?",
    "?",
    "?",
    "Touch",
    "?",
    "?",
    "?",
    "CStick Right",
    "CStick Left",
    "CStick Up",
    "CStick Down",
    "CPad Right",
    "CPad Left",
    "CPad Up",
    "CPad Down",
];

const RESERVED_KEY: &str = "?";

/// Mask of the bits that have a button name
pub const ASSIGNED_KEYS_MASK: u32 = assigned_keys_mask();

const fn assigned_keys_mask() -> u32 {
    let mut mask = 0;
    let mut i = 0;
    while i < KEY_NAMES.len() {
        let name = KEY_NAMES[i].as_bytes();
        if !(name.len() == 1 && name[0] == b'?') {
            mask |= 1 << i;
        }
        i += 1;
    }
    mask
}

fn check_range(value: i128, min: i128, max: i128) -> Result<(), ValueError> {
    if value < min || value > max {
        return Err(ValueError::OutOfRange { value, min, max });
    }
    Ok(())
}

/// Accumulate unsigned decimal digits into an `i64`
fn accumulate_decimal(digits: &str) -> Result<i64, ValueError> {
    if digits.is_empty() {
        return Err(ValueError::Empty);
    }
    digits.chars().try_fold(0i64, |acc, c| {
        let digit = c.to_digit(10).ok_or(ValueError::InvalidDigit(c))?;
        acc.checked_mul(10)
            .and_then(|v| v.checked_add(i64::from(digit)))
            .ok_or(ValueError::Overflow)
    })
}

/// Parse a boolean option: exactly `0` or `1`
pub fn parse_bool(token: &str) -> Result<bool, ValueError> {
    match token {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(ValueError::InvalidBool(token.to_string())),
    }
}

/// Parse a signed decimal integer within `[min, max]`.
///
/// A leading `+` or `-` is only a sign when more characters follow it.
pub fn parse_dec_int(token: &str, min: i64, max: i64) -> Result<i64, ValueError> {
    let (negative, digits) = if token.len() >= 2 {
        if let Some(rest) = token.strip_prefix('+') {
            (false, rest)
        } else if let Some(rest) = token.strip_prefix('-') {
            (true, rest)
        } else {
            (false, token)
        }
    } else {
        (false, token)
    };

    let magnitude = accumulate_decimal(digits)?;
    let value = if negative { -magnitude } else { magnitude };
    check_range(i128::from(value), i128::from(min), i128::from(max))?;
    Ok(value)
}

/// Parse an unsigned hexadecimal integer (no prefix, no sign) within `[min, max]`
pub fn parse_hex(token: &str, min: u64, max: u64) -> Result<u64, ValueError> {
    if token.is_empty() {
        return Err(ValueError::Empty);
    }
    let value = token.chars().try_fold(0u64, |acc, c| {
        let digit = c.to_digit(16).ok_or(ValueError::InvalidDigit(c))?;
        acc.checked_mul(16)
            .and_then(|v| v.checked_add(u64::from(digit)))
            .ok_or(ValueError::Overflow)
    })?;
    check_range(i128::from(value), i128::from(min), i128::from(max))?;
    Ok(value)
}

/// Parse a decimal number into fixed-point units within `[min, max]`.
///
/// Accepts `1`, `-0.25`, `.5`, `1.`; digits past the eighth fractional place
/// are validated and truncated.
pub fn parse_fixed_point(token: &str, min: i64, max: i64) -> Result<i64, ValueError> {
    let (negative, body) = match token.as_bytes().first() {
        None => return Err(ValueError::Empty),
        Some(b'+') => (false, &token[1..]),
        Some(b'-') => (true, &token[1..]),
        Some(_) => (false, token),
    };

    let (int_text, frac_text) = match body.split_once('.') {
        Some((int_text, frac_text)) => (int_text, frac_text),
        None => (body, ""),
    };
    if int_text.is_empty() && frac_text.is_empty() {
        return Err(ValueError::Empty);
    }

    let int_part = if int_text.is_empty() {
        0
    } else {
        accumulate_decimal(int_text)?
    };
    let mut magnitude = int_part
        .checked_mul(FIXED_POINT_SCALE)
        .ok_or(ValueError::Overflow)?;

    let mut weight = FIXED_POINT_SCALE / 10;
    for c in frac_text.chars() {
        let digit = c.to_digit(10).ok_or(ValueError::InvalidDigit(c))?;
        magnitude = magnitude
            .checked_add(i64::from(digit) * weight)
            .ok_or(ValueError::Overflow)?;
        weight /= 10;
    }

    let value = if negative { -magnitude } else { magnitude };
    check_range(i128::from(value), i128::from(min), i128::from(max))?;
    Ok(value)
}

/// Bit position of a button name (case-insensitive), `None` for unknown or reserved names
pub fn key_bit(name: &str) -> Option<u32> {
    KEY_NAMES
        .iter()
        .position(|key| *key != RESERVED_KEY && key.eq_ignore_ascii_case(name))
        .map(|bit| bit as u32)
}

/// Parse a `+`-separated button combo such as `L+Down+Select`
pub fn parse_key_combo(token: &str) -> Result<u32, ValueError> {
    let mut combo = 0u32;
    for name in token.split('+') {
        if name.is_empty() {
            return Err(ValueError::EmptyComboToken);
        }
        if name == RESERVED_KEY {
            return Err(ValueError::ReservedKey);
        }
        let bit = key_bit(name).ok_or_else(|| ValueError::UnknownKey(name.to_string()))?;
        if combo & (1 << bit) != 0 {
            return Err(ValueError::DuplicateKey(name.to_string()));
        }
        combo |= 1 << bit;
    }
    Ok(combo)
}

/// Match an enumerated option (case-insensitive), returning the index of the choice
pub fn parse_choice(token: &str, choices: &[&str]) -> Result<usize, ValueError> {
    choices
        .iter()
        .position(|choice| choice.eq_ignore_ascii_case(token))
        .ok_or_else(|| ValueError::UnknownChoice(token.to_string()))
}

/// Render fixed-point units as a decimal string with trailing zeros trimmed
pub fn format_fixed_point(value: i64) -> String {
    let scale = FIXED_POINT_SCALE.unsigned_abs();
    let magnitude = value.unsigned_abs();
    let int_part = magnitude / scale;
    let frac_part = magnitude % scale;
    let sign = if value < 0 { "-" } else { "" };

    if frac_part == 0 {
        return format!("{}{}", sign, int_part);
    }

    let frac = format!("{:0width$}", frac_part, width = FIXED_POINT_DIGITS);
    format!("{}{}.{}", sign, int_part, frac.trim_end_matches('0'))
}

/// Render a button combo from the highest bit down, e.g. `Select+A`.
///
/// Unassigned bits have no name and are left out.
pub fn format_key_combo(combo: u32) -> String {
    (0..KEY_NAMES.len())
        .rev()
        .filter(|&bit| combo & (1 << bit) != 0 && KEY_NAMES[bit] != RESERVED_KEY)
        .map(|bit| KEY_NAMES[bit])
        .collect::<Vec<_>>()
        .join("+")
}

// =============================================================================
// Typed wrappers
// =============================================================================

/// A set of buttons encoded as a bitmask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KeyCombo(pub u32);

impl KeyCombo {
    /// Build a combo from button names
    pub fn from_names(names: &[&str]) -> Result<Self, ValueError> {
        names.join("+").parse()
    }

    /// Raw bitmask
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether no button is set
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether any unassigned bit is set
    pub const fn has_reserved_bits(self) -> bool {
        self.0 & !ASSIGNED_KEYS_MASK != 0
    }

    /// Whether every button of `other` is held in `self`
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl FromStr for KeyCombo {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_key_combo(s).map(Self)
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_key_combo(self.0))
    }
}

impl Serialize for KeyCombo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Decimal value stored as a count of 1e-8 units
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FixedPoint(pub i64);

impl FixedPoint {
    /// Zero
    pub const ZERO: Self = Self(0);

    /// One
    pub const ONE: Self = Self(FIXED_POINT_SCALE);

    /// Fixed-point value of a whole number
    pub const fn from_int(value: i64) -> Self {
        Self(value * FIXED_POINT_SCALE)
    }

    /// Raw count of 1e-8 units
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Approximate floating-point value
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / FIXED_POINT_SCALE as f64
    }
}

impl FromStr for FixedPoint {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_fixed_point(s, i64::MIN, i64::MAX).map(Self)
    }
}

impl fmt::Display for FixedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_fixed_point(self.0))
    }
}

impl Serialize for FixedPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
