use alloc::{collections::BTreeMap, string::String};

use log::debug;

use crate::{
    interpret::{Key, Value, interpret},
    label::Label,
    record::Record,
    states::{ChargeState, ErrorCode, TrackerState},
};

/// Latest known value of every label, built up from successive records.
///
/// A field whose value fails to decode removes any earlier value for that
/// label, so stale data is never reported as current. A missing value reads
/// as `None`, never as zero.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Snapshot {
    values: BTreeMap<Label, Value>,
    unknown: BTreeMap<String, String>,
    records: u64,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies every field of `record`.
    pub fn update(&mut self, record: &Record) {
        for (key, value) in interpret(record) {
            match (key, value) {
                (Key::Known(label), Ok(value)) => {
                    self.values.insert(label, value);
                }
                (Key::Known(label), Err(error)) => {
                    debug!("Clearing {}: {}", label.code(), error);
                    self.values.remove(&label);
                }
                (Key::Unknown(label), Ok(Value::Text(text))) => {
                    self.unknown.insert(label, text);
                }
                (Key::Unknown(_), _) => {}
            }
        }
        self.records += 1;
    }

    pub fn get(&self, label: Label) -> Option<&Value> {
        self.values.get(&label)
    }

    /// Raw text of a label this crate does not know.
    pub fn unknown(&self, label: &str) -> Option<&str> {
        self.unknown.get(label).map(String::as_str)
    }

    /// Known values in label order.
    pub fn iter(&self) -> impl Iterator<Item = (Label, &Value)> {
        self.values.iter().map(|(label, value)| (*label, value))
    }

    /// Number of records applied so far.
    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.unknown.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn number(&self, label: Label) -> Option<f64> {
        self.get(label)?.as_f64()
    }

    fn text(&self, label: Label) -> Option<&str> {
        self.get(label)?.as_str()
    }

    /// Main battery voltage in volts.
    pub fn battery_voltage(&self) -> Option<f64> {
        self.number(Label::BatteryVoltage)
    }

    /// Main battery current in amperes. Negative while discharging.
    pub fn battery_current(&self) -> Option<f64> {
        self.number(Label::BatteryCurrent)
    }

    /// Panel voltage in volts.
    pub fn solar_voltage(&self) -> Option<f64> {
        self.number(Label::PanelVoltage)
    }

    /// Panel power in watts.
    pub fn solar_power(&self) -> Option<f64> {
        self.number(Label::PanelPower)
    }

    pub fn load_current(&self) -> Option<f64> {
        self.number(Label::LoadCurrent)
    }

    /// State of charge in percent.
    pub fn state_of_charge(&self) -> Option<f64> {
        self.number(Label::StateOfCharge)
    }

    /// Energy harvested today in kWh.
    pub fn yield_today(&self) -> Option<f64> {
        self.number(Label::YieldToday)
    }

    /// Energy harvested since the last reset in kWh.
    pub fn yield_total(&self) -> Option<f64> {
        self.number(Label::YieldTotal)
    }

    pub fn serial_number(&self) -> Option<&str> {
        self.text(Label::SerialNumber)
    }

    pub fn firmware(&self) -> Option<&str> {
        self.text(Label::Firmware)
    }

    pub fn product_id(&self) -> Option<u16> {
        match self.get(Label::ProductId)? {
            Value::ProductId(id) => Some(*id),
            _ => None,
        }
    }

    pub fn charge_state(&self) -> Option<ChargeState> {
        match self.get(Label::ChargeState)? {
            Value::ChargeState(state) => Some(*state),
            _ => None,
        }
    }

    pub fn tracker_state(&self) -> Option<TrackerState> {
        match self.get(Label::Tracker)? {
            Value::Tracker(state) => Some(*state),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<ErrorCode> {
        match self.get(Label::Error)? {
            Value::Error(code) => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Snapshot;
    use crate::{field::Field, label::Label, record::Record, states::ChargeState};

    fn record(fields: &[(&str, &str)]) -> Record {
        fields
            .iter()
            .map(|(label, value)| Field::new(*label, *value))
            .collect()
    }

    #[test]
    fn starts_empty() {
        let snapshot = Snapshot::new();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.battery_voltage(), None);
        assert_eq!(snapshot.records(), 0);
    }

    #[test]
    fn absent_is_not_zero() {
        let mut snapshot = Snapshot::new();
        snapshot.update(&record(&[("V", "0"), ("CS", "5")]));

        assert_eq!(snapshot.battery_voltage(), Some(0.0));
        assert_eq!(snapshot.battery_current(), None);
        assert_eq!(snapshot.charge_state(), Some(ChargeState::Float));
    }

    #[test]
    fn failed_field_clears_previous_value() {
        let mut snapshot = Snapshot::new();
        snapshot.update(&record(&[("V", "12800"), ("I", "100")]));
        snapshot.update(&record(&[("V", "garbage"), ("I", "200")]));

        assert_eq!(snapshot.battery_voltage(), None);
        assert_eq!(snapshot.battery_current(), Some(0.2));
        assert_eq!(snapshot.records(), 2);
        assert!(snapshot.get(Label::BatteryVoltage).is_none());
    }

    #[test]
    fn keeps_fields_missing_from_later_records() {
        let mut snapshot = Snapshot::new();
        snapshot.update(&record(&[("PID", "0xA060"), ("SER#", "HQ2132ABCDE")]));
        snapshot.update(&record(&[("V", "13400"), ("XYZ", "1")]));

        assert_eq!(snapshot.product_id(), Some(0xA060));
        assert_eq!(snapshot.serial_number(), Some("HQ2132ABCDE"));
        assert_eq!(snapshot.battery_voltage(), Some(13.4));
        assert_eq!(snapshot.unknown("XYZ"), Some("1"));
    }
}
