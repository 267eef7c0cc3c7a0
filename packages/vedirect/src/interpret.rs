use alloc::{
    string::{String, ToString},
    vec::Vec,
};
use core::{fmt, num::ParseIntError};

use crate::{
    label::{Kind, Label},
    record::Record,
    states::{AlarmReason, ChargeState, DeviceMode, ErrorCode, OffReason, TrackerState},
};

/// Physical unit of a [`Quantity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Unit {
    Volt,
    Ampere,
    Watt,
    VoltAmpere,
    KilowattHour,
    AmpereHour,
    Percent,
    Celsius,
    Minute,
    Second,
}

impl Unit {
    pub const fn symbol(self) -> &'static str {
        match self {
            Unit::Volt => "V",
            Unit::Ampere => "A",
            Unit::Watt => "W",
            Unit::VoltAmpere => "VA",
            Unit::KilowattHour => "kWh",
            Unit::AmpereHour => "Ah",
            Unit::Percent => "%",
            Unit::Celsius => "°C",
            Unit::Minute => "min",
            Unit::Second => "s",
        }
    }
}

/// A scaled measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Quantity {
    pub value: f64,
    pub unit: Unit,
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit.symbol())
    }
}

/// Error decoding the value of a known label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("invalid number: {0}")]
    Number(#[from] ParseIntError),
    #[error("expected ON or OFF")]
    Switch,
    #[error("value is not valid UTF-8")]
    Utf8,
}

/// A typed field value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    Quantity(Quantity),
    Integer(i64),
    Switch(bool),
    ChargeState(ChargeState),
    Tracker(TrackerState),
    Error(ErrorCode),
    OffReason(OffReason),
    Alarm(AlarmReason),
    Mode(DeviceMode),
    ProductId(u16),
    Text(String),
}

impl Value {
    /// Decodes the raw value of a field according to `kind`.
    ///
    /// # Errors
    ///
    /// Returns a [`FieldError`] if `raw` is not a valid value of that kind.
    pub fn parse(kind: Kind, raw: &[u8]) -> Result<Self, FieldError> {
        let text = core::str::from_utf8(raw).map_err(|_| FieldError::Utf8)?;

        Ok(match kind {
            Kind::Scaled { unit, divisor } => Value::Quantity(Quantity {
                value: text.parse::<i64>()? as f64 / divisor,
                unit,
            }),
            Kind::Integer => Value::Integer(text.parse()?),
            Kind::Switch => Value::Switch(parse_switch(text)?),
            Kind::ChargeState => Value::ChargeState(text.parse::<u16>()?.into()),
            Kind::Tracker => Value::Tracker(text.parse::<u16>()?.into()),
            Kind::Error => Value::Error(text.parse::<u16>()?.into()),
            Kind::DeviceMode => Value::Mode(text.parse::<u16>()?.into()),
            Kind::OffReason => Value::OffReason(OffReason::from_bits_retain(
                u32::from_str_radix(strip_hex_prefix(text), 16)?,
            )),
            Kind::Alarm => Value::Alarm(AlarmReason::from_bits_retain(text.parse()?)),
            Kind::ProductId => {
                Value::ProductId(u16::from_str_radix(strip_hex_prefix(text), 16)?)
            }
            Kind::Text => Value::Text(text.to_string()),
        })
    }

    /// The numeric value of a quantity, in its unit.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Quantity(quantity) => Some(quantity.value),
            Value::Integer(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Quantity(quantity) => fmt::Display::fmt(quantity, f),
            Value::Integer(value) => fmt::Display::fmt(value, f),
            Value::Switch(true) => f.write_str("ON"),
            Value::Switch(false) => f.write_str("OFF"),
            Value::ChargeState(state) => write!(f, "{state:?}"),
            Value::Tracker(state) => write!(f, "{state:?}"),
            Value::Error(code) => write!(f, "{code:?}"),
            Value::Mode(mode) => write!(f, "{mode:?}"),
            Value::OffReason(reason) => write!(f, "{:#010X}", reason.bits()),
            Value::Alarm(reason) => fmt::Display::fmt(&reason.bits(), f),
            Value::ProductId(id) => write!(f, "{id:#06X}"),
            Value::Text(text) => f.write_str(text),
        }
    }
}

fn parse_switch(text: &str) -> Result<bool, FieldError> {
    if text.eq_ignore_ascii_case("ON") {
        Ok(true)
    } else if text.eq_ignore_ascii_case("OFF") {
        Ok(false)
    } else {
        Err(FieldError::Switch)
    }
}

fn strip_hex_prefix(text: &str) -> &str {
    text.strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text)
}

/// Identifies a field of an [`Interpretation`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Key {
    Known(Label),
    /// A label missing from the [`Label`] table, lossily converted to text.
    Unknown(String),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Known(label) => f.write_str(label.name()),
            Key::Unknown(label) => f.write_str(label),
        }
    }
}

/// Typed view of one [`Record`], in wire order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Interpretation {
    entries: Vec<(Key, Result<Value, FieldError>)>,
}

impl Interpretation {
    /// Returns the decoded entry for `label`.
    pub fn get(&self, label: Label) -> Option<&Result<Value, FieldError>> {
        self.entries
            .iter()
            .find(|(key, _)| *key == Key::Known(label))
            .map(|(_, value)| value)
    }

    /// Returns the value of `label` if it decoded successfully.
    pub fn value(&self, label: Label) -> Option<&Value> {
        self.get(label)?.as_ref().ok()
    }

    /// Returns the text of a label this crate does not know.
    pub fn unknown(&self, label: &str) -> Option<&str> {
        self.entries.iter().find_map(|(key, value)| match (key, value) {
            (Key::Unknown(unknown), Ok(value)) if unknown == label => value.as_str(),
            _ => None,
        })
    }

    /// Fields of known labels whose values failed to decode.
    pub fn errors(&self) -> impl Iterator<Item = (&Key, &FieldError)> {
        self.entries
            .iter()
            .filter_map(|(key, value)| value.as_ref().err().map(|error| (key, error)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Result<Value, FieldError>)> {
        self.entries.iter().map(|(key, value)| (key, value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for Interpretation {
    type Item = (Key, Result<Value, FieldError>);
    type IntoIter = alloc::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Converts the raw fields of a record into typed values.
///
/// Unknown labels pass through as [`Value::Text`]. The `Checksum` field is
/// skipped. A value that fails to decode only affects its own entry.
pub fn interpret(record: &Record) -> Interpretation {
    let entries = record
        .fields()
        .iter()
        .filter(|field| !field.is_checksum())
        .map(|field| match Label::from_code(field.label()) {
            Some(label) => (Key::Known(label), Value::parse(label.kind(), field.value())),
            None => (
                Key::Unknown(String::from_utf8_lossy(field.label()).into_owned()),
                Ok(Value::Text(
                    String::from_utf8_lossy(field.value()).into_owned(),
                )),
            ),
        })
        .collect();

    Interpretation { entries }
}
