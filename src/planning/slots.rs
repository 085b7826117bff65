use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::schema::DayMeals;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotType {
    Breakfast,
    Meal,
    Snack,
}

impl SlotType {
    pub fn as_str(self) -> &'static str {
        match self {
            SlotType::Breakfast => "breakfast",
            SlotType::Meal => "meal",
            SlotType::Snack => "snack",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealSlot {
    pub enabled: bool,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: SlotType,
}

/// Slot key to configuration, as chosen for one plan.
pub type SlotConfig = BTreeMap<String, MealSlot>;

pub fn default_slots() -> SlotConfig {
    let slot = |enabled: bool, label: &str, kind: SlotType| MealSlot {
        enabled,
        label: label.to_string(),
        kind,
    };
    BTreeMap::from([
        ("meal_1".to_string(), slot(true, "Breakfast", SlotType::Breakfast)),
        ("meal_2".to_string(), slot(true, "Lunch", SlotType::Meal)),
        ("meal_3".to_string(), slot(true, "Dinner", SlotType::Meal)),
        ("meal_4".to_string(), slot(false, "Evening snack", SlotType::Snack)),
    ])
}

/// Slot entries in stored order: shorter keys first, then bytewise, the way
/// Postgres orders `jsonb` object keys (`meal_2` before `meal_10`).
pub fn in_slot_order<V>(map: &BTreeMap<String, V>) -> Vec<(&String, &V)> {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by(|a, b| a.0.len().cmp(&b.0.len()).then_with(|| a.0.cmp(b.0)));
    entries
}

/// Reconcile generated meals with the configured slots.
///
/// The result has exactly the configured keys: disabled slots are null even
/// when the generator filled them, missing enabled slots are null, and keys
/// the generator invented are dropped.
pub fn normalize_meals(mut raw: DayMeals, slots: &SlotConfig) -> DayMeals {
    slots
        .iter()
        .map(|(key, slot)| {
            let meal = if slot.enabled {
                raw.remove(key).flatten()
            } else {
                None
            };
            (key.clone(), meal)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planning::schema::Meal;

    fn meal(name: &str) -> Meal {
        Meal {
            name: name.into(),
            description: String::new(),
            ingredients: vec![],
            steps: vec![],
            prep_time_min: 10.0,
            servings: 2.0,
            macro_estimates: None,
            shopping_items: vec![],
            forks: Default::default(),
        }
    }

    #[test]
    fn disabled_forced_null_and_unknown_dropped() {
        let slots = BTreeMap::from([
            ("A".to_string(), MealSlot { enabled: true, label: "A".into(), kind: SlotType::Meal }),
            ("B".to_string(), MealSlot { enabled: false, label: "B".into(), kind: SlotType::Snack }),
        ]);
        let raw: DayMeals = BTreeMap::from([
            ("A".to_string(), Some(meal("a"))),
            ("B".to_string(), Some(meal("b"))),
            ("C".to_string(), Some(meal("c"))),
        ]);

        let out = normalize_meals(raw, &slots);
        assert_eq!(out.len(), 2);
        assert_eq!(out["A"].as_ref().map(|m| m.name.as_str()), Some("a"));
        assert!(out["B"].is_none());
        assert!(!out.contains_key("C"));
    }

    #[test]
    fn missing_enabled_slot_becomes_null() {
        let out = normalize_meals(DayMeals::new(), &default_slots());
        assert_eq!(
            out.keys().cloned().collect::<Vec<_>>(),
            vec!["meal_1", "meal_2", "meal_3", "meal_4"]
        );
        assert!(out.values().all(|m| m.is_none()));
    }

    #[test]
    fn two_digit_slots_come_after_single_digit_ones() {
        let map = BTreeMap::from([
            ("meal_10".to_string(), 10),
            ("meal_2".to_string(), 2),
            ("meal_1".to_string(), 1),
        ]);
        let keys: Vec<&str> = in_slot_order(&map).into_iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["meal_1", "meal_2", "meal_10"]);
    }

    #[test]
    fn slot_type_uses_type_key_on_the_wire() {
        let slot: MealSlot =
            serde_json::from_str(r#"{"enabled":true,"label":"Brunch","type":"breakfast"}"#).unwrap();
        assert_eq!(slot.kind, SlotType::Breakfast);
        assert!(serde_json::to_string(&slot).unwrap().contains("\"type\":\"breakfast\""));
    }
}
