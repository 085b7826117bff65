use super::{
    constraints::Constraints,
    measurement::MeasurementSystem,
    slots::{in_slot_order, MealSlot, SlotConfig},
};

/// Everything the generator is told about one plan.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub constraints: Constraints,
    pub slots: SlotConfig,
    pub num_days: i32,
    pub measurement: MeasurementSystem,
    /// Only set when use-it-up mode is active for a paid account.
    pub pantry_items: Option<Vec<String>>,
}

impl GenerationRequest {
    pub fn enabled_slots(&self) -> impl Iterator<Item = (&String, &MealSlot)> {
        in_slot_order(&self.slots).into_iter().filter(|(_, slot)| slot.enabled)
    }

    fn fork_instructions(&self) -> String {
        if self.constraints.fork_specs.is_empty() {
            return "\nAll household members share the same dietary profile. Do NOT include any forks."
                .to_string();
        }
        let lines: Vec<String> = self
            .constraints
            .fork_specs
            .iter()
            .map(|f| format!("- {} (id: {}): {}", f.member_name, f.member_id, f.reason))
            .collect();
        format!(
            "\nMembers needing personal forks:\n{}\n\nFor each meal, include a \"forks\" object keyed by memberId with {{ reason, swaps: [{{ original, replacement }}], notes }} ONLY for members who differ from the base meal. If the base meal already suits a member, omit their fork.",
            lines.join("\n")
        )
    }

    fn pantry_note(&self) -> String {
        match &self.pantry_items {
            Some(items) if !items.is_empty() => {
                format!("\nPrioritize using these pantry items: {}", items.join(", "))
            }
            _ => String::new(),
        }
    }

    pub fn to_prompt(&self) -> String {
        let c = &self.constraints;
        let slots = self
            .enabled_slots()
            .map(|(key, slot)| format!("{key}: {} ({})", slot.label, slot.kind.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        let excludes = if c.hard_excludes.is_empty() {
            "none".to_string()
        } else {
            c.hard_excludes.join(", ")
        };

        format!(
            r#"You are a meal planning assistant. Generate a {num_days}-day meal plan as JSON.

Household: {size} people
Base diet: {diet}
Hard allergen excludes: {excludes}
Meal slots per day: {slots}
Measurement system: {system}
{units}
{forks}{pantry}

Output ONLY valid JSON matching this structure exactly:
{{
  "days": [
    {{
      "day_index": 0,
      "meals": {{
        "<meal_slot_key>": {{
          "name": "Meal Name",
          "description": "Brief description",
          "ingredients": ["ingredient1", "ingredient2"],
          "steps": ["Step 1...", "Step 2..."],
          "prep_time_min": 30,
          "servings": {size},
          "macro_estimates": {{ "calories": 500, "protein_g": 30, "carbs_g": 60, "fat_g": 15 }},
          "shopping_items": [{{ "name": "item", "qty": "amount", "category": "produce|pantry|protein|dairy|other" }}],
          "forks": {{}}
        }}
      }}
    }}
  ]
}}

Set disabled meal slots to null. Ensure variety across days. Keep recipes practical and family-friendly.
Macro estimates are rough approximations; label them as such."#,
            num_days = self.num_days,
            size = c.household_size,
            diet = c.base_diet,
            system = self.measurement.as_str(),
            units = self.measurement.unit_directive(),
            forks = self.fork_instructions(),
            pantry = self.pantry_note(),
        )
    }
}
