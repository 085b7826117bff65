use serde::{Deserialize, Serialize};

use super::repo_types::{AgeGroup, Household, Member};
use crate::{error::AppError, planning::diet::Diet};

const NAME_MAX: usize = 50;
const HOUSEHOLD_NAME_MAX: usize = 100;
const ALLERGIES_MAX: usize = 20;
const DISLIKES_MAX: usize = 20;
const GOALS_MAX: usize = 10;
const TOKEN_MAX: usize = 50;
const GOAL_MAX: usize = 100;

#[derive(Debug, Serialize)]
pub struct HouseholdResponse {
    #[serde(flatten)]
    pub household: Household,
    pub members: Vec<Member>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateHouseholdRequest {
    pub name: String,
}

impl UpdateHouseholdRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        check_name("name", &self.name, HOUSEHOLD_NAME_MAX)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateMemberRequest {
    pub name: String,
    #[serde(default)]
    pub age_group: AgeGroup,
    #[serde(default)]
    pub diet: Diet,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub dislikes: Vec<String>,
    #[serde(default)]
    pub goals: Vec<String>,
}

impl CreateMemberRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        check_name("name", &self.name, NAME_MAX)?;
        check_tokens("allergies", &self.allergies, ALLERGIES_MAX, TOKEN_MAX)?;
        check_tokens("dislikes", &self.dislikes, DISLIKES_MAX, TOKEN_MAX)?;
        check_tokens("goals", &self.goals, GOALS_MAX, GOAL_MAX)
    }
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateMemberRequest {
    pub name: Option<String>,
    pub age_group: Option<AgeGroup>,
    pub diet: Option<Diet>,
    pub allergies: Option<Vec<String>>,
    pub dislikes: Option<Vec<String>>,
    pub goals: Option<Vec<String>>,
}

impl UpdateMemberRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = &self.name {
            check_name("name", name, NAME_MAX)?;
        }
        if let Some(v) = &self.allergies {
            check_tokens("allergies", v, ALLERGIES_MAX, TOKEN_MAX)?;
        }
        if let Some(v) = &self.dislikes {
            check_tokens("dislikes", v, DISLIKES_MAX, TOKEN_MAX)?;
        }
        if let Some(v) = &self.goals {
            check_tokens("goals", v, GOALS_MAX, GOAL_MAX)?;
        }
        Ok(())
    }

    pub fn apply(self, member: &mut Member) {
        if let Some(name) = self.name {
            member.name = name;
        }
        if let Some(age_group) = self.age_group {
            member.age_group = age_group;
        }
        if let Some(diet) = self.diet {
            member.diet = diet;
        }
        if let Some(allergies) = self.allergies {
            member.allergies = allergies;
        }
        if let Some(dislikes) = self.dislikes {
            member.dislikes = dislikes;
        }
        if let Some(goals) = self.goals {
            member.goals = goals;
        }
    }
}

pub(crate) fn check_name(field: &str, value: &str, max: usize) -> Result<(), AppError> {
    let len = value.chars().count();
    if len == 0 || len > max {
        return Err(AppError::validation(format!(
            "{field} must be between 1 and {max} characters"
        )));
    }
    Ok(())
}

fn check_tokens(field: &str, values: &[String], max_items: usize, max_len: usize) -> Result<(), AppError> {
    if values.len() > max_items {
        return Err(AppError::validation(format!(
            "{field} accepts at most {max_items} entries"
        )));
    }
    if values.iter().any(|v| v.chars().count() > max_len) {
        return Err(AppError::validation(format!(
            "{field} entries must be at most {max_len} characters"
        )));
    }
    Ok(())
}
