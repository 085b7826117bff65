use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum Diet {
    #[default]
    None,
    Pescatarian,
    Halal,
    Kosher,
    Keto,
    Paleo,
    Vegetarian,
    Vegan,
}

impl Diet {
    /// Severity score, higher is more restrictive. Equal scores are ties
    /// (halal/kosher, keto/paleo); the constraint builder resolves them by
    /// member order, so these numbers must not change.
    pub fn rank(self) -> u8 {
        match self {
            Diet::None => 0,
            Diet::Pescatarian => 1,
            Diet::Halal | Diet::Kosher => 2,
            Diet::Keto | Diet::Paleo => 3,
            Diet::Vegetarian => 4,
            Diet::Vegan => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Diet::None => "none",
            Diet::Pescatarian => "pescatarian",
            Diet::Halal => "halal",
            Diet::Kosher => "kosher",
            Diet::Keto => "keto",
            Diet::Paleo => "paleo",
            Diet::Vegetarian => "vegetarian",
            Diet::Vegan => "vegan",
        }
    }
}

impl std::fmt::Display for Diet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Diet; 8] = [
        Diet::None,
        Diet::Pescatarian,
        Diet::Halal,
        Diet::Kosher,
        Diet::Keto,
        Diet::Paleo,
        Diet::Vegetarian,
        Diet::Vegan,
    ];

    #[test]
    fn rank_scale_is_fixed() {
        let ranks: Vec<u8> = ALL.iter().map(|d| d.rank()).collect();
        assert_eq!(ranks, vec![0, 1, 2, 2, 3, 3, 4, 5]);
    }

    #[test]
    fn serde_uses_lowercase_names() {
        for diet in ALL {
            let json = serde_json::to_string(&diet).unwrap();
            assert_eq!(json, format!("\"{}\"", diet.as_str()));
        }
        let parsed: Diet = serde_json::from_str("\"vegan\"").unwrap();
        assert_eq!(parsed, Diet::Vegan);
        assert!(serde_json::from_str::<Diet>("\"carnivore\"").is_err());
    }
}
