//! Typed contract for generated plans.
//!
//! Model output is parsed straight into these structs. Anything that does not
//! fit (missing field, wrong type) rejects the whole plan; numbers are taken
//! as given and never range-checked.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

/// Slot key to meal; `None` is an empty or disabled slot.
pub type DayMeals = BTreeMap<String, Option<Meal>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    pub name: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub steps: Vec<String>,
    pub prep_time_min: f64,
    pub servings: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macro_estimates: Option<MacroEstimates>,
    #[serde(default)]
    pub shopping_items: Vec<ShoppingItem>,
    /// Keyed by member id.
    #[serde(default)]
    pub forks: BTreeMap<String, Fork>,
}

/// Rough per-serving estimate. Not nutrition data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroEstimates {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingItem {
    pub name: String,
    pub qty: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fork {
    pub reason: String,
    #[serde(default)]
    pub swaps: Vec<Swap>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Swap {
    pub original: String,
    pub replacement: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedDay {
    pub day_index: i32,
    pub meals: DayMeals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedPlan {
    pub days: Vec<GeneratedDay>,
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("empty response content")]
    Empty,
    #[error("response does not match plan schema: {0}")]
    Invalid(#[from] serde_json::Error),
    #[error("day_index {0} appears more than once")]
    DuplicateDay(i32),
}

pub fn parse_plan(content: &str) -> Result<GeneratedPlan, SchemaError> {
    if content.trim().is_empty() {
        return Err(SchemaError::Empty);
    }
    let plan: GeneratedPlan = serde_json::from_str(content)?;

    let mut seen = HashSet::new();
    if let Some(day) = plan.days.iter().find(|d| !seen.insert(d.day_index)) {
        return Err(SchemaError::DuplicateDay(day.day_index));
    }
    Ok(plan)
}
