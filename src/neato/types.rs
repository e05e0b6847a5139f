use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

/// A numeric code or symbolic name that doesn't match any known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value `{value}`")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Nucleo reports enums as numeric codes; MQTT payloads may carry either form.
#[derive(Deserialize)]
#[serde(untagged)]
enum CodeOrName {
    Code(u8),
    Name(String),
}

/// Declares a Nucleo enum with its wire code and symbolic name.
///
/// Serializes as the numeric code, deserializes from either the code or the
/// name, and displays as the name.
macro_rules! nucleo_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $code:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum $name {
            $($variant = $code),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub const fn code(self) -> u8 {
                self as u8
            }

            pub const fn name(self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant)),+
                }
            }
        }

        impl TryFrom<u8> for $name {
            type Error = UnknownVariant;

            fn try_from(code: u8) -> Result<Self, UnknownVariant> {
                match code {
                    $($code => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($variant) => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_u8(self.code())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                match CodeOrName::deserialize(deserializer)? {
                    CodeOrName::Code(code) => $name::try_from(code).map_err(de::Error::custom),
                    CodeOrName::Name(name) => name.parse().map_err(de::Error::custom),
                }
            }
        }
    };
}

nucleo_enum! {
    /// Primary robot status.
    StateType {
        Invalid = 0,
        Idle = 1,
        Busy = 2,
        Paused = 3,
        Error = 4,
    }
}

nucleo_enum! {
    /// What the robot is currently doing.
    ActionType {
        Invalid = 0,
        HouseCleaning = 1,
        SpotCleaning = 2,
        ManualCleaning = 3,
        Docking = 4,
        UserMenuActive = 5,
        SuspendedCleaning = 6,
        Updating = 7,
        CopyingLogs = 8,
        RecoveringLocation = 9,
        IecTest = 10,
        MapCleaning = 11,
        ExploringMap = 12,
        AcquiringPersistentMapIds = 13,
        CreatingUploadingMap = 14,
        SuspendedExploration = 15,
    }
}

nucleo_enum! {
    CleaningCategory {
        Manual = 1,
        House = 2,
        Spot = 3,
        Map = 4,
    }
}

nucleo_enum! {
    CleaningMode {
        Eco = 1,
        Turbo = 2,
    }
}

nucleo_enum! {
    /// Cleaning pass frequency, sent as `modifier` on the wire.
    CleaningFrequency {
        Normal = 1,
        Double = 2,
    }
}

nucleo_enum! {
    NavigationMode {
        Normal = 1,
        ExtraCare = 2,
        Deep = 3,
    }
}

/// One reading of robot state as returned by `getRobotState`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RobotState {
    pub state: StateType,
    pub action: ActionType,
    #[serde(default)]
    pub alert: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    pub cleaning: Cleaning,
    pub details: Details,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cleaning {
    pub category: CleaningCategory,
    pub mode: CleaningMode,
    pub navigation_mode: NavigationMode,
    #[serde(default)]
    pub spot_width: u32,
    #[serde(default)]
    pub spot_height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Details {
    pub charge: u8,
    pub is_charging: bool,
    pub is_docked: bool,
    pub is_schedule_enabled: bool,
}

/// Parameters for `startCleaning`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartCleaningParameters {
    pub category: CleaningCategory,
    pub mode: CleaningMode,
    #[serde(default = "default_modifier")]
    pub modifier: CleaningFrequency,
    #[serde(default = "default_navigation_mode")]
    pub navigation_mode: NavigationMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spot_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spot_height: Option<u32>,
}

fn default_modifier() -> CleaningFrequency {
    CleaningFrequency::Normal
}

fn default_navigation_mode() -> NavigationMode {
    NavigationMode::Normal
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn enums_accept_code_or_name() {
        let by_code: CleaningCategory = serde_json::from_value(json!(2)).unwrap();
        let by_name: CleaningCategory = serde_json::from_value(json!("House")).unwrap();
        assert_eq!(by_code, CleaningCategory::House);
        assert_eq!(by_name, CleaningCategory::House);
        assert!(serde_json::from_value::<CleaningCategory>(json!(9)).is_err());
        assert!(serde_json::from_value::<CleaningCategory>(json!("Garage")).is_err());
    }

    #[test]
    fn error_state_converts_from_its_code() {
        assert_eq!(StateType::try_from(4), Ok(StateType::Error));
        assert_eq!(StateType::Error.to_string(), "Error");
        assert_eq!("Error".parse::<StateType>(), Ok(StateType::Error));

        let err = StateType::try_from(7).unwrap_err();
        assert_eq!(err.to_string(), "unknown StateType value `7`");
    }

    #[test]
    fn enums_serialize_as_code() {
        assert_eq!(serde_json::to_value(NavigationMode::ExtraCare).unwrap(), json!(2));
        assert_eq!(ActionType::IecTest.to_string(), "IecTest");
    }

    #[test]
    fn name_round_trips_through_from_str() {
        for mode in CleaningMode::ALL {
            assert_eq!(mode.name().parse::<CleaningMode>(), Ok(*mode));
        }
        let err = "Fast".parse::<CleaningMode>().unwrap_err();
        assert_eq!(err.to_string(), "unknown CleaningMode value `Fast`");
    }

    #[test]
    fn parses_robot_state_response() {
        let body = json!({
            "version": 1,
            "reqId": "1",
            "result": "ok",
            "error": "ui_alert_invalid",
            "alert": null,
            "state": 1,
            "action": 0,
            "cleaning": {
                "category": 2,
                "mode": 1,
                "modifier": 1,
                "navigationMode": 1,
                "spotWidth": 0,
                "spotHeight": 0
            },
            "details": {
                "isCharging": false,
                "isDocked": true,
                "isScheduleEnabled": false,
                "dockHasBeenSeen": false,
                "charge": 98
            }
        });

        let state: RobotState = serde_json::from_value(body).unwrap();
        assert_eq!(state.state, StateType::Idle);
        assert_eq!(state.action, ActionType::Invalid);
        assert_eq!(state.error.as_deref(), Some("ui_alert_invalid"));
        assert_eq!(state.alert, None);
        assert_eq!(state.cleaning.category, CleaningCategory::House);
        assert_eq!(state.details.charge, 98);
        assert!(state.details.is_docked);
    }

    #[test]
    fn start_parameters_default_modifier_and_navigation() {
        let params: StartCleaningParameters =
            serde_json::from_str(r#"{"category":"Map","mode":2}"#).unwrap();
        assert_eq!(params.category, CleaningCategory::Map);
        assert_eq!(params.mode, CleaningMode::Turbo);
        assert_eq!(params.modifier, CleaningFrequency::Normal);
        assert_eq!(params.navigation_mode, NavigationMode::Normal);

        let wire = serde_json::to_value(&params).unwrap();
        assert_eq!(
            wire,
            json!({"category": 4, "mode": 2, "modifier": 1, "navigationMode": 1})
        );
    }
}
