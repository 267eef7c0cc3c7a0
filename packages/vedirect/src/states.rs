//! Enumerated and bitmask values found in text blocks.
//!
//! Each enum keeps an `Other` variant so values introduced by newer firmware
//! still decode.

use bitflags::bitflags;

macro_rules! code_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$variant_meta:meta])* $variant:ident = $code:literal,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub enum $name {
            $($(#[$variant_meta])* $variant,)*
            /// A code this crate does not know.
            Other(u16),
        }

        impl From<u16> for $name {
            fn from(code: u16) -> Self {
                match code {
                    $($code => Self::$variant,)*
                    other => Self::Other(other),
                }
            }
        }

        impl From<$name> for u16 {
            fn from(value: $name) -> Self {
                match value {
                    $($name::$variant => $code,)*
                    $name::Other(other) => other,
                }
            }
        }
    };
}

code_enum! {
    /// Operation state of a charger or inverter (`CS`).
    pub enum ChargeState {
        Off = 0,
        LowPower = 1,
        Fault = 2,
        Bulk = 3,
        Absorption = 4,
        Float = 5,
        Storage = 6,
        Equalize = 7,
        Inverting = 9,
        PowerSupply = 11,
        StartingUp = 245,
        RepeatedAbsorption = 246,
        AutoEqualize = 247,
        BatterySafe = 248,
        ExternalControl = 252,
    }
}

code_enum! {
    /// State of the maximum power point tracker (`MPPT`).
    pub enum TrackerState {
        Off = 0,
        /// Voltage or current limited.
        Limited = 1,
        Active = 2,
    }
}

code_enum! {
    /// Charger error code (`ERR`).
    pub enum ErrorCode {
        NoError = 0,
        BatteryVoltageTooHigh = 2,
        ChargerTemperatureTooHigh = 17,
        ChargerOverCurrent = 18,
        ChargerCurrentReversed = 19,
        BulkTimeLimitExceeded = 20,
        CurrentSensorIssue = 21,
        TerminalsOverheated = 26,
        ConverterIssue = 28,
        InputVoltageTooHigh = 33,
        InputCurrentTooHigh = 34,
        InputShutdownBatteryVoltage = 38,
        InputShutdownCurrentFlow = 39,
        LostCommunication = 65,
        SynchronisedChargingConfig = 66,
        BmsConnectionLost = 67,
        NetworkMisconfigured = 68,
        FactoryCalibrationLost = 116,
        InvalidFirmware = 117,
        UserSettingsInvalid = 119,
    }
}

code_enum! {
    /// Inverter operating mode (`MODE`).
    pub enum DeviceMode {
        Inverter = 2,
        Off = 4,
        Eco = 5,
    }
}

impl ErrorCode {
    pub fn is_error(self) -> bool {
        self != ErrorCode::NoError
    }
}

bitflags! {
    /// Reasons a charger is switched off (`OR`), sent as `0x`-prefixed hex.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct OffReason: u32 {
        const NO_INPUT_POWER = 0x0000_0001;
        const SWITCHED_OFF_POWER_SWITCH = 0x0000_0002;
        const SWITCHED_OFF_REGISTER = 0x0000_0004;
        const REMOTE_INPUT = 0x0000_0008;
        const PROTECTION_ACTIVE = 0x0000_0010;
        const PAYGO = 0x0000_0020;
        const BMS = 0x0000_0040;
        const ENGINE_SHUTDOWN = 0x0000_0080;
        const ANALYSING_INPUT_VOLTAGE = 0x0000_0100;
    }
}

bitflags! {
    /// Active alarms (`AR`) or warnings (`WARN`), sent as a decimal bitmask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct AlarmReason: u16 {
        const LOW_VOLTAGE = 1;
        const HIGH_VOLTAGE = 2;
        const LOW_SOC = 4;
        const LOW_STARTER_VOLTAGE = 8;
        const HIGH_STARTER_VOLTAGE = 16;
        const LOW_TEMPERATURE = 32;
        const HIGH_TEMPERATURE = 64;
        const MID_VOLTAGE = 128;
        const OVERLOAD = 256;
        const DC_RIPPLE = 512;
        const LOW_AC_OUT_VOLTAGE = 1024;
        const HIGH_AC_OUT_VOLTAGE = 2048;
        const SHORT_CIRCUIT = 4096;
        const BMS_LOCKOUT = 8192;
    }
}
