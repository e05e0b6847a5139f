//! Flattening robot state into MQTT topics and diffing successive maps.

use std::collections::BTreeMap;

use crate::neato::RobotState;

/// Topic to value, in sorted topic order.
pub type TopicMap = BTreeMap<String, String>;

/// Every state value published for a robot, each under its own topic suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateField {
    State,
    Action,
    Alert,
    Error,
    CleaningCategory,
    CleaningMode,
    CleaningNavigationMode,
    CleaningSpotWidth,
    CleaningSpotHeight,
    Charge,
    IsCharging,
    IsDocked,
    IsScheduleEnabled,
}

impl StateField {
    pub const ALL: [StateField; 13] = [
        StateField::State,
        StateField::Action,
        StateField::Alert,
        StateField::Error,
        StateField::CleaningCategory,
        StateField::CleaningMode,
        StateField::CleaningNavigationMode,
        StateField::CleaningSpotWidth,
        StateField::CleaningSpotHeight,
        StateField::Charge,
        StateField::IsCharging,
        StateField::IsDocked,
        StateField::IsScheduleEnabled,
    ];

    pub const fn suffix(self) -> &'static str {
        match self {
            StateField::State => "/state",
            StateField::Action => "/action",
            StateField::Alert => "/alert",
            StateField::Error => "/error",
            StateField::CleaningCategory => "/cleaning/category",
            StateField::CleaningMode => "/cleaning/mode",
            StateField::CleaningNavigationMode => "/cleaning/navigationMode",
            StateField::CleaningSpotWidth => "/cleaning/spotWidth",
            StateField::CleaningSpotHeight => "/cleaning/spotHeight",
            StateField::Charge => "/details/charge",
            StateField::IsCharging => "/details/isCharging",
            StateField::IsDocked => "/details/isDocked",
            StateField::IsScheduleEnabled => "/details/isScheduleEnabled",
        }
    }

    pub fn topic(self, root: &str) -> String {
        format!("{root}{}", self.suffix())
    }

    fn render(self, state: &RobotState) -> String {
        match self {
            StateField::State => state.state.to_string(),
            StateField::Action => state.action.to_string(),
            StateField::Alert => state.alert.clone().unwrap_or_default(),
            StateField::Error => state.error.clone().unwrap_or_default(),
            StateField::CleaningCategory => state.cleaning.category.to_string(),
            StateField::CleaningMode => state.cleaning.mode.to_string(),
            StateField::CleaningNavigationMode => state.cleaning.navigation_mode.to_string(),
            StateField::CleaningSpotWidth => state.cleaning.spot_width.to_string(),
            StateField::CleaningSpotHeight => state.cleaning.spot_height.to_string(),
            StateField::Charge => state.details.charge.to_string(),
            StateField::IsCharging => state.details.is_charging.to_string(),
            StateField::IsDocked => state.details.is_docked.to_string(),
            StateField::IsScheduleEnabled => state.details.is_schedule_enabled.to_string(),
        }
    }
}

/// Map a snapshot onto every state topic under `root`. Absent values become "".
pub fn map_state(root: &str, state: &RobotState) -> TopicMap {
    StateField::ALL
        .iter()
        .map(|field| (field.topic(root), field.render(state)))
        .collect()
}

/// Entries of `new` whose value differs from (or is missing in) `old`.
pub fn diff(old: &TopicMap, new: &TopicMap) -> TopicMap {
    new.iter()
        .filter(|(topic, value)| old.get(*topic) != Some(*value))
        .map(|(topic, value)| (topic.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::testing::sample_state;

    const ROOT: &str = "neato/kitchen";

    #[test]
    fn renders_every_field() {
        let map = map_state(ROOT, &sample_state());

        assert_eq!(map.len(), StateField::ALL.len());
        assert_eq!(map["neato/kitchen/state"], "Busy");
        assert_eq!(map["neato/kitchen/action"], "HouseCleaning");
        assert_eq!(map["neato/kitchen/alert"], "");
        assert_eq!(map["neato/kitchen/error"], "");
        assert_eq!(map["neato/kitchen/cleaning/category"], "House");
        assert_eq!(map["neato/kitchen/cleaning/mode"], "Eco");
        assert_eq!(map["neato/kitchen/cleaning/navigationMode"], "Normal");
        assert_eq!(map["neato/kitchen/cleaning/spotWidth"], "0");
        assert_eq!(map["neato/kitchen/details/charge"], "80");
        assert_eq!(map["neato/kitchen/details/isCharging"], "false");
        assert_eq!(map["neato/kitchen/details/isScheduleEnabled"], "true");
    }

    #[test]
    fn optional_fields_keep_their_keys() {
        let mut state = sample_state();
        state.alert = Some("dustbin_full".into());
        state.error = Some("ui_error_brush_stuck".into());
        let with = map_state(ROOT, &state);
        let without = map_state(ROOT, &sample_state());

        assert!(with.keys().eq(without.keys()));
        assert_eq!(with["neato/kitchen/alert"], "dustbin_full");
        assert_eq!(with["neato/kitchen/error"], "ui_error_brush_stuck");
    }

    #[test]
    fn charge_change_is_the_only_delta() {
        let before = map_state(ROOT, &sample_state());
        let mut next = sample_state();
        next.details.charge = 81;
        let after = map_state(ROOT, &next);

        let changes = diff(&before, &after);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes["neato/kitchen/details/charge"], "81");
    }

    #[test]
    fn identical_maps_have_no_delta() {
        let map = map_state(ROOT, &sample_state());
        assert!(diff(&map, &map).is_empty());
    }

    #[test]
    fn keys_missing_from_old_count_as_changed() {
        let new = map_state(ROOT, &sample_state());
        let mut old = new.clone();
        old.remove("neato/kitchen/error");

        let changes = diff(&old, &new);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes["neato/kitchen/error"], "");
    }

    #[test]
    fn stale_keys_only_in_old_are_ignored() {
        let new = map_state(ROOT, &sample_state());
        let mut old = new.clone();
        old.insert("neato/kitchen/legacy".into(), "x".into());

        assert!(diff(&old, &new).is_empty());
    }
}
