use serde::Deserialize;

use crate::{error::AppError, household::dto::check_name};

pub const DEFAULT_CATEGORY: &str = "other";

#[derive(Debug, Deserialize)]
pub struct CreatePantryItemRequest {
    pub name: String,
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

impl CreatePantryItemRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        check_name("name", &self.name, 100)?;
        if self.category.chars().count() > 50 {
            return Err(AppError::validation("category must be at most 50 characters"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_defaults_to_other() {
        let req: CreatePantryItemRequest = serde_json::from_str(r#"{"name":"rice"}"#).unwrap();
        assert_eq!(req.category, "other");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn rejects_blank_name_and_long_category() {
        let req = CreatePantryItemRequest { name: String::new(), category: "other".into() };
        assert!(req.validate().is_err());
        let req = CreatePantryItemRequest { name: "rice".into(), category: "c".repeat(51) };
        assert!(req.validate().is_err());
    }
}
