use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use super::{schema::DayMeals, slots::in_slot_order};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatedItem {
    /// Spelling of the first occurrence.
    pub name: String,
    /// Every occurrence's quantity, oldest first.
    pub quantities: Vec<String>,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingList {
    pub grouped: BTreeMap<String, Vec<AggregatedItem>>,
    pub total_items: usize,
}

impl ShoppingList {
    pub fn is_empty(&self) -> bool {
        self.total_items == 0
    }

    /// Categories in display order.
    pub fn categories(&self) -> Vec<(&str, &[AggregatedItem])> {
        let mut categories: Vec<_> = self
            .grouped
            .iter()
            .map(|(category, items)| (category.as_str(), items.as_slice()))
            .collect();
        categories.sort_by(|a, b| display_order(a.0, b.0));
        categories
    }
}

/// Case-insensitive ordering; exact spelling only breaks ties, lower case first.
pub fn display_order(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

/// Fold the shopping items of every meal in `days` into one list.
///
/// Items merge on their lower-cased name; the first occurrence fixes the
/// display name and category. Days must be given in day order.
pub fn aggregate_shopping_list<'a, I>(days: I) -> ShoppingList
where
    I: IntoIterator<Item = &'a DayMeals>,
{
    let mut items: Vec<AggregatedItem> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    let meals = days
        .into_iter()
        .flat_map(|day| in_slot_order(day))
        .filter_map(|(_, meal)| meal.as_ref());
    for meal in meals {
        for item in &meal.shopping_items {
            let key = item.name.to_lowercase();
            match index.get(&key) {
                Some(&i) => items[i].quantities.push(item.qty.clone()),
                None => {
                    index.insert(key, items.len());
                    items.push(AggregatedItem {
                        name: item.name.clone(),
                        quantities: vec![item.qty.clone()],
                        category: item.category.clone(),
                    });
                }
            }
        }
    }

    let total_items = items.len();
    let mut grouped: BTreeMap<String, Vec<AggregatedItem>> = BTreeMap::new();
    for item in items {
        grouped.entry(item.category.clone()).or_default().push(item);
    }
    for list in grouped.values_mut() {
        list.sort_by(|a, b| display_order(&a.name, &b.name));
    }

    ShoppingList { grouped, total_items }
}

/// `fresh_produce` / `dry-goods` -> `Fresh Produce` / `Dry Goods`.
pub fn title_case(value: &str) -> String {
    value
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Plain-text body used for the shopping-list email.
pub fn render_text(list: &ShoppingList) -> String {
    list.categories()
        .into_iter()
        .map(|(category, items)| {
            let lines = items
                .iter()
                .map(|i| format!("- {}: {}", i.name, i.quantities.join(" + ")))
                .collect::<Vec<_>>()
                .join("\n");
            format!("{}\n{}", title_case(category), lines)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
