//! Unit families, exact-decimal values, and unit-family-closed conversion
//!
//! Magnitudes are stored as exact decimals (integer mantissa and power-of-ten
//! exponent) and conversion factors are exact rationals whose denominators
//! contain only factors of 2 and 5, so every supported conversion is exact
//! and composes without floating-point drift.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A group of units convertible into one another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitFamily {
    /// Time (ps, ns, us, ms)
    Time,
    /// Clock frequency (Hz, kHz, MHz, GHz)
    Frequency,
    /// Transfer rate (MT/s, GT/s). Related to Frequency only through the
    /// documented DDR multiplier, never by direct conversion.
    TransferRate,
    /// Voltage (uV, mV, V)
    Voltage,
    /// Storage capacity (KB, MB, GB, TB), binary multiples
    Capacity,
    /// Unitless quantities such as CAS latency in clocks
    Dimensionless,
}

impl fmt::Display for UnitFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Time => "time",
            Self::Frequency => "frequency",
            Self::TransferRate => "transfer rate",
            Self::Voltage => "voltage",
            Self::Capacity => "capacity",
            Self::Dimensionless => "dimensionless",
        };
        f.write_str(name)
    }
}

/// Exact rational scale factor. Denominators are restricted to products of
/// 2 and 5 so that division stays exact in decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Scale {
    num: i128,
    den: i128,
}

impl Scale {
    pub(crate) const fn new(num: i128, den: i128) -> Self {
        Self { num, den }
    }

    /// Invert the factor; fails if the numerator has prime factors other
    /// than 2 and 5 (the inverse would not be decimal-exact).
    fn invert(self) -> Option<Scale> {
        if !is_two_five_smooth(self.num) {
            return None;
        }
        Some(Scale::new(self.den, self.num))
    }
}

fn is_two_five_smooth(mut n: i128) -> bool {
    if n <= 0 {
        return false;
    }
    while n % 2 == 0 {
        n /= 2;
    }
    while n % 5 == 0 {
        n /= 5;
    }
    n == 1
}

/// Exact decimal number: `mantissa * 10^exponent`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Decimal {
    mantissa: i128,
    exponent: i32,
}

impl Decimal {
    pub fn new(mantissa: i128, exponent: i32) -> Self {
        Self { mantissa, exponent }.normalized()
    }

    fn normalized(mut self) -> Self {
        if self.mantissa == 0 {
            self.exponent = 0;
            return self;
        }
        while self.mantissa % 10 == 0 {
            self.mantissa /= 10;
            self.exponent += 1;
        }
        self
    }

    /// Parse a decimal from a numeric token. Accepts `.` or `,` as the
    /// decimal separator and optional scientific notation.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        let (number, sci_exp) = match token.split_once(['e', 'E']) {
            Some((n, e)) => (n, e.parse::<i32>().ok()?),
            None => (token, 0),
        };

        let normalized = number.replace(',', ".");
        let negative = normalized.starts_with('-');
        let unsigned = normalized.trim_start_matches(['-', '+']);

        let (int_part, frac_part) = match unsigned.split_once('.') {
            Some((i, f)) => (i, f),
            None => (unsigned, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        if !int_part.chars().all(|c| c.is_ascii_digit())
            || !frac_part.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }

        let digits = format!("{}{}", int_part, frac_part);
        if digits.len() > 30 {
            return None;
        }
        let mut mantissa: i128 = digits.parse().ok()?;
        if negative {
            mantissa = -mantissa;
        }
        let exponent = sci_exp - frac_part.len() as i32;
        Some(Self::new(mantissa, exponent))
    }

    /// Multiply by an exact rational factor. Exact because scale
    /// denominators only contain factors of 2 and 5. Returns `None` when
    /// the exact mantissa would not fit in an i128; callers treat that as
    /// unconvertible rather than producing a wrapped value.
    pub(crate) fn apply(self, scale: Scale) -> Option<Self> {
        let (mut a, mut b) = (0u32, 0u32);
        let mut den = scale.den;
        while den % 2 == 0 {
            den /= 2;
            a += 1;
        }
        while den % 5 == 0 {
            den /= 5;
            b += 1;
        }
        debug_assert_eq!(den, 1, "scale denominator must be 2^a * 5^b");

        // x * num / (2^a 5^b) = x * num * 2^(k-a) * 5^(k-b) * 10^-k
        let k = a.max(b);
        let mantissa = self
            .mantissa
            .checked_mul(scale.num)?
            .checked_mul(2i128.checked_pow(k - a)?)?
            .checked_mul(5i128.checked_pow(k - b)?)?;
        Some(Self::new(mantissa, self.exponent - k as i32))
    }

    /// Approximate value as f64, for scoring and display ordering only
    pub fn to_f64(self) -> f64 {
        self.mantissa as f64 * 10f64.powi(self.exponent)
    }

    pub fn is_zero(self) -> bool {
        self.mantissa == 0
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        let a = self.normalized();
        let b = other.normalized();
        a.mantissa == b.mantissa && a.exponent == b.exponent
    }
}

impl Eq for Decimal {}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.normalized();
        if d.mantissa < 0 {
            write!(f, "-")?;
        }
        let digits = d.mantissa.unsigned_abs().to_string();
        if d.exponent >= 0 {
            write!(f, "{}{}", digits, "0".repeat(d.exponent as usize))
        } else {
            let frac_len = (-d.exponent) as usize;
            if digits.len() > frac_len {
                let split = digits.len() - frac_len;
                write!(f, "{}.{}", &digits[..split], &digits[split..])
            } else {
                write!(f, "0.{}{}", "0".repeat(frac_len - digits.len()), digits)
            }
        }
    }
}

/// Unit description: canonical symbol, accepted spellings, family, and the
/// exact factor to the family's base unit.
struct UnitSpec {
    symbol: &'static str,
    aliases: &'static [&'static str],
    family: UnitFamily,
    to_base: Scale,
}

/// Conversion tables. Base units: ps (time), Hz (frequency), MT/s
/// (transfer rate), mV (voltage), MB (capacity). All factors are exact
/// rationals with 2/5-smooth denominators.
static UNITS: &[UnitSpec] = &[
    // Time
    UnitSpec { symbol: "ps", aliases: &["ps", "picosecond", "picoseconds"], family: UnitFamily::Time, to_base: Scale::new(1, 1) },
    UnitSpec { symbol: "ns", aliases: &["ns", "nanosecond", "nanoseconds"], family: UnitFamily::Time, to_base: Scale::new(1_000, 1) },
    UnitSpec { symbol: "us", aliases: &["us", "\u{00b5}s", "\u{03bc}s", "microsecond", "microseconds"], family: UnitFamily::Time, to_base: Scale::new(1_000_000, 1) },
    UnitSpec { symbol: "ms", aliases: &["ms", "millisecond", "milliseconds"], family: UnitFamily::Time, to_base: Scale::new(1_000_000_000, 1) },
    // Frequency
    UnitSpec { symbol: "Hz", aliases: &["hz", "hertz"], family: UnitFamily::Frequency, to_base: Scale::new(1, 1) },
    UnitSpec { symbol: "kHz", aliases: &["khz"], family: UnitFamily::Frequency, to_base: Scale::new(1_000, 1) },
    UnitSpec { symbol: "MHz", aliases: &["mhz"], family: UnitFamily::Frequency, to_base: Scale::new(1_000_000, 1) },
    UnitSpec { symbol: "GHz", aliases: &["ghz"], family: UnitFamily::Frequency, to_base: Scale::new(1_000_000_000, 1) },
    // Transfer rate
    UnitSpec { symbol: "MT/s", aliases: &["mt/s", "mtps"], family: UnitFamily::TransferRate, to_base: Scale::new(1, 1) },
    UnitSpec { symbol: "GT/s", aliases: &["gt/s", "gtps"], family: UnitFamily::TransferRate, to_base: Scale::new(1_000, 1) },
    // Voltage
    UnitSpec { symbol: "uV", aliases: &["uv", "\u{00b5}v", "\u{03bc}v", "microvolt", "microvolts"], family: UnitFamily::Voltage, to_base: Scale::new(1, 1_000) },
    UnitSpec { symbol: "mV", aliases: &["mv", "millivolt", "millivolts"], family: UnitFamily::Voltage, to_base: Scale::new(1, 1) },
    UnitSpec { symbol: "V", aliases: &["v", "volt", "volts"], family: UnitFamily::Voltage, to_base: Scale::new(1_000, 1) },
    // Capacity, binary multiples (1 GB = 1024 MB). 1024 = 2^10, so these
    // factors stay decimal-exact under inversion.
    UnitSpec { symbol: "KB", aliases: &["kb", "kilobyte", "kilobytes"], family: UnitFamily::Capacity, to_base: Scale::new(1, 1_024) },
    UnitSpec { symbol: "MB", aliases: &["mb", "megabyte", "megabytes"], family: UnitFamily::Capacity, to_base: Scale::new(1, 1) },
    UnitSpec { symbol: "GB", aliases: &["gb", "gigabyte", "gigabytes"], family: UnitFamily::Capacity, to_base: Scale::new(1_024, 1) },
    UnitSpec { symbol: "TB", aliases: &["tb", "terabyte", "terabytes"], family: UnitFamily::Capacity, to_base: Scale::new(1_048_576, 1) },
];

fn lookup_unit(token: &str) -> Option<&'static UnitSpec> {
    let needle = token.trim().to_lowercase();
    UNITS
        .iter()
        .find(|u| u.aliases.iter().any(|a| *a == needle))
}

/// Spelled-out unit names mapped to their canonical symbols, used for
/// query rewriting ("picoseconds" -> "ps")
pub fn unit_spellings() -> Vec<(&'static str, &'static str)> {
    UNITS
        .iter()
        .flat_map(|u| {
            u.aliases
                .iter()
                .filter(|a| a.len() > u.symbol.len())
                .map(move |a| (*a, u.symbol))
        })
        .collect()
}

/// All canonical unit symbols within a family
pub fn units_in_family(family: UnitFamily) -> Vec<&'static str> {
    UNITS
        .iter()
        .filter(|u| u.family == family)
        .map(|u| u.symbol)
        .collect()
}

/// A parsed `(magnitude, unit)` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitValue {
    pub magnitude: Decimal,
    /// Canonical unit symbol; empty for dimensionless values
    pub unit: String,
    pub family: UnitFamily,
}

impl UnitValue {
    pub fn new(magnitude: Decimal, unit: &str) -> Result<Self> {
        let spec = lookup_unit(unit).ok_or_else(|| Error::UnknownUnit(unit.to_string()))?;
        Ok(Self {
            magnitude,
            unit: spec.symbol.to_string(),
            family: spec.family,
        })
    }

    /// A bare number with no unit, valid only for dimensionless parameters
    pub fn dimensionless(magnitude: Decimal) -> Self {
        Self {
            magnitude,
            unit: String::new(),
            family: UnitFamily::Dimensionless,
        }
    }
}

impl fmt::Display for UnitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unit.is_empty() {
            write!(f, "{}", self.magnitude)
        } else {
            write!(f, "{} {}", self.magnitude, self.unit)
        }
    }
}

static VALUE_RE: Lazy<Regex> = Lazy::new(|| {
    // Number must not be glued to a preceding letter or digit so entity
    // names like "DDR5" never contribute their trailing digit.
    Regex::new(
        r"(?i)(?:^|[\s(\[=:,;<>~\u{00a0}])(-?\d+(?:[.,]\d+)?(?:e-?\d+)?)\s*([a-z\u{00b5}\u{03bc}]+(?:/s)?)",
    )
    .expect("value regex")
});

static BARE_NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[\s(\[=:,;<>~\u{00a0}])(-?\d+(?:[.,]\d+)?)(?:$|[\s)\],;.])")
        .expect("bare number regex")
});

/// Parse the first magnitude+unit pair in `text`. Bare numbers are never
/// guessed into a family; they return `None`.
pub fn parse_value(text: &str, expected_family: Option<UnitFamily>) -> Option<UnitValue> {
    find_values(text)
        .into_iter()
        .map(|(_, v)| v)
        .find(|v| expected_family.map_or(true, |f| v.family == f))
}

/// Find every magnitude+unit pair in `text`, with the byte span of the match
pub fn find_values(text: &str) -> Vec<(std::ops::Range<usize>, UnitValue)> {
    let mut out = Vec::new();
    for cap in VALUE_RE.captures_iter(text) {
        let number = cap.get(1).expect("number group");
        let unit = cap.get(2).expect("unit group");
        let Some(magnitude) = Decimal::parse(number.as_str()) else {
            continue;
        };
        if let Some(spec) = lookup_unit(unit.as_str()) {
            out.push((
                number.start()..unit.end(),
                UnitValue {
                    magnitude,
                    unit: spec.symbol.to_string(),
                    family: spec.family,
                },
            ));
        }
    }
    out
}

/// Parse a bare number with no unit token. Used only for parameters whose
/// canonical unit family is dimensionless (e.g. CAS latency in clocks).
pub fn parse_bare_number(text: &str) -> Option<Decimal> {
    BARE_NUMBER_RE
        .captures(text)
        .and_then(|cap| Decimal::parse(cap.get(1)?.as_str()))
}

/// Convert a value to another unit within its family. Cross-family
/// conversion fails with `IncompatibleUnitFamily`.
pub fn convert(value: &UnitValue, target_unit: &str) -> Result<UnitValue> {
    let target = lookup_unit(target_unit).ok_or_else(|| Error::UnknownUnit(target_unit.to_string()))?;
    if value.family != target.family {
        return Err(Error::IncompatibleUnitFamily {
            from: value.family,
            to: target.family,
        });
    }
    let source = lookup_unit(&value.unit).ok_or_else(|| Error::UnknownUnit(value.unit.clone()))?;

    // value_in_base = magnitude * source.to_base; result = base / target.to_base
    let inverse = target
        .to_base
        .invert()
        .ok_or_else(|| Error::internal(format!("non-invertible scale for {}", target.symbol)))?;
    let magnitude = value
        .magnitude
        .apply(source.to_base)
        .and_then(|m| m.apply(inverse))
        .ok_or_else(|| Error::MagnitudeOverflow(target.symbol.to_string()))?;

    Ok(UnitValue {
        magnitude,
        unit: target.symbol.to_string(),
        family: target.family,
    })
}

/// Bridge a clock frequency to its DDR transfer rate (or back) using the
/// documented multiplier: 1 MHz clock = `multiplier` MT/s. This is the only
/// sanctioned cross-family rewrite and is used for query expansion, never
/// for comparison-table normalization.
pub fn bridge_transfer_rate(value: &UnitValue, multiplier: u32) -> Option<UnitValue> {
    if multiplier == 0 {
        return None;
    }
    match value.family {
        UnitFamily::Frequency => {
            let mhz = convert(value, "MHz").ok()?;
            let magnitude = mhz.magnitude.apply(Scale::new(multiplier as i128, 1))?;
            UnitValue::new(magnitude, "MT/s").ok()
        }
        UnitFamily::TransferRate => {
            if !is_two_five_smooth(multiplier as i128) {
                return None;
            }
            let mts = convert(value, "MT/s").ok()?;
            let magnitude = mts.magnitude.apply(Scale::new(1, multiplier as i128))?;
            UnitValue::new(magnitude, "MHz").ok()
        }
        _ => None,
    }
}
