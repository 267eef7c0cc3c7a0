use crate::interpret::Unit;

/// How the text value of a label is decoded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kind {
    /// Decimal integer divided by `divisor` to give `unit`.
    Scaled { unit: Unit, divisor: f64 },
    /// Plain decimal integer (counters, sequence numbers, modes).
    Integer,
    /// `ON` or `OFF`.
    Switch,
    ChargeState,
    Tracker,
    Error,
    DeviceMode,
    /// `0x`-prefixed hexadecimal bitmask.
    OffReason,
    /// Decimal bitmask.
    Alarm,
    /// `0x`-prefixed hexadecimal product id.
    ProductId,
    Text,
}

macro_rules! labels {
    ($($variant:ident => $code:literal, $name:literal, $kind:expr;)*) => {
        /// Every text label the interpreter knows.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub enum Label {
            $($variant,)*
        }

        impl Label {
            /// All known labels, in table order.
            pub const ALL: &'static [Label] = &[$(Label::$variant,)*];

            /// Looks up a label by its wire name.
            pub fn from_code(code: &[u8]) -> Option<Self> {
                match core::str::from_utf8(code).ok()? {
                    $($code => Some(Label::$variant),)*
                    _ => None,
                }
            }

            /// The label as sent on the wire.
            pub const fn code(self) -> &'static str {
                match self {
                    $(Label::$variant => $code,)*
                }
            }

            /// Semantic name, e.g. `battery_voltage` for `V`.
            pub const fn name(self) -> &'static str {
                match self {
                    $(Label::$variant => $name,)*
                }
            }

            pub const fn kind(self) -> Kind {
                match self {
                    $(Label::$variant => $kind,)*
                }
            }
        }
    };
}

const fn scaled(unit: Unit, divisor: f64) -> Kind {
    Kind::Scaled { unit, divisor }
}

const MILLIVOLTS: Kind = scaled(Unit::Volt, 1000.0);
const MILLIAMPS: Kind = scaled(Unit::Ampere, 1000.0);
const MILLIAMP_HOURS: Kind = scaled(Unit::AmpereHour, 1000.0);
const CENTI_KILOWATT_HOURS: Kind = scaled(Unit::KilowattHour, 100.0);
const WATTS: Kind = scaled(Unit::Watt, 1.0);
const PER_MILLE: Kind = scaled(Unit::Percent, 10.0);

labels! {
    BatteryVoltage => "V", "battery_voltage", MILLIVOLTS;
    BatteryVoltage2 => "V2", "battery_voltage_2", MILLIVOLTS;
    BatteryVoltage3 => "V3", "battery_voltage_3", MILLIVOLTS;
    AuxiliaryVoltage => "VS", "auxiliary_voltage", MILLIVOLTS;
    MidPointVoltage => "VM", "mid_point_voltage", MILLIVOLTS;
    MidPointDeviation => "DM", "mid_point_deviation", PER_MILLE;
    PanelVoltage => "VPV", "solar_voltage", MILLIVOLTS;
    PanelPower => "PPV", "solar_power", WATTS;
    BatteryCurrent => "I", "battery_current", MILLIAMPS;
    BatteryCurrent2 => "I2", "battery_current_2", MILLIAMPS;
    BatteryCurrent3 => "I3", "battery_current_3", MILLIAMPS;
    LoadCurrent => "IL", "load_current", MILLIAMPS;
    LoadOutput => "LOAD", "load_output", Kind::Switch;
    BatteryTemperature => "T", "battery_temperature", scaled(Unit::Celsius, 1.0);
    Power => "P", "power", WATTS;
    ConsumedAmpHours => "CE", "consumed_amp_hours", MILLIAMP_HOURS;
    StateOfCharge => "SOC", "state_of_charge", PER_MILLE;
    TimeToGo => "TTG", "time_to_go", scaled(Unit::Minute, 1.0);
    Alarm => "Alarm", "alarm", Kind::Switch;
    Relay => "Relay", "relay", Kind::Switch;
    AlarmReason => "AR", "alarm_reason", Kind::Alarm;
    OffReason => "OR", "off_reason", Kind::OffReason;
    DeepestDischarge => "H1", "deepest_discharge", MILLIAMP_HOURS;
    LastDischarge => "H2", "last_discharge", MILLIAMP_HOURS;
    AverageDischarge => "H3", "average_discharge", MILLIAMP_HOURS;
    ChargeCycles => "H4", "charge_cycles", Kind::Integer;
    FullDischarges => "H5", "full_discharges", Kind::Integer;
    CumulativeAmpHours => "H6", "cumulative_amp_hours", MILLIAMP_HOURS;
    MinimumBatteryVoltage => "H7", "minimum_battery_voltage", MILLIVOLTS;
    MaximumBatteryVoltage => "H8", "maximum_battery_voltage", MILLIVOLTS;
    SinceFullCharge => "H9", "seconds_since_full_charge", scaled(Unit::Second, 1.0);
    AutomaticSynchronizations => "H10", "automatic_synchronizations", Kind::Integer;
    LowVoltageAlarms => "H11", "low_voltage_alarms", Kind::Integer;
    HighVoltageAlarms => "H12", "high_voltage_alarms", Kind::Integer;
    LowAuxiliaryVoltageAlarms => "H13", "low_auxiliary_voltage_alarms", Kind::Integer;
    HighAuxiliaryVoltageAlarms => "H14", "high_auxiliary_voltage_alarms", Kind::Integer;
    MinimumAuxiliaryVoltage => "H15", "minimum_auxiliary_voltage", MILLIVOLTS;
    MaximumAuxiliaryVoltage => "H16", "maximum_auxiliary_voltage", MILLIVOLTS;
    DischargedEnergy => "H17", "discharged_energy", CENTI_KILOWATT_HOURS;
    ChargedEnergy => "H18", "charged_energy", CENTI_KILOWATT_HOURS;
    YieldTotal => "H19", "yield_total", CENTI_KILOWATT_HOURS;
    YieldToday => "H20", "yield_today", CENTI_KILOWATT_HOURS;
    MaximumPowerToday => "H21", "maximum_power_today", WATTS;
    YieldYesterday => "H22", "yield_yesterday", CENTI_KILOWATT_HOURS;
    MaximumPowerYesterday => "H23", "maximum_power_yesterday", WATTS;
    Error => "ERR", "error", Kind::Error;
    ChargeState => "CS", "charge_state", Kind::ChargeState;
    Model => "BMV", "model", Kind::Text;
    Firmware => "FW", "firmware", Kind::Text;
    FirmwareExtended => "FWE", "firmware_extended", Kind::Text;
    ProductId => "PID", "product_id", Kind::ProductId;
    SerialNumber => "SER#", "serial_number", Kind::Text;
    DaySequence => "HSDS", "day_sequence", Kind::Integer;
    DeviceMode => "MODE", "device_mode", Kind::DeviceMode;
    AcOutputVoltage => "AC_OUT_V", "ac_output_voltage", scaled(Unit::Volt, 100.0);
    AcOutputCurrent => "AC_OUT_I", "ac_output_current", scaled(Unit::Ampere, 10.0);
    AcOutputApparentPower => "AC_OUT_S", "ac_output_apparent_power", scaled(Unit::VoltAmpere, 1.0);
    Warning => "WARN", "warning", Kind::Alarm;
    Tracker => "MPPT", "tracker_state", Kind::Tracker;
    MonitorMode => "MON", "monitor_mode", Kind::Integer;
}
