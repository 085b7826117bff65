use serde::Serialize;
use uuid::Uuid;

use super::diet::Diet;
use crate::household::repo_types::Member;

/// A member whose needs differ from the shared base meal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForkSpec {
    pub member_id: Uuid,
    pub member_name: String,
    pub reason: String,
    pub diet: Diet,
    pub allergies: Vec<String>,
    pub goals: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Constraints {
    /// Lower-cased allergy tokens of every member, first occurrence order.
    pub hard_excludes: Vec<String>,
    pub base_diet: Diet,
    pub fork_specs: Vec<ForkSpec>,
    pub household_size: usize,
}

/// Derive the household's shared constraints from its members.
///
/// `members` must be in household sort order: among diets of equal rank the
/// earliest member's diet becomes the base.
pub fn build_constraints(members: &[Member]) -> Constraints {
    let mut hard_excludes: Vec<String> = Vec::new();
    for allergy in members.iter().flat_map(|m| m.allergies.iter()) {
        let token = allergy.to_lowercase();
        if !hard_excludes.contains(&token) {
            hard_excludes.push(token);
        }
    }

    let mut base_diet = Diet::None;
    for m in members {
        // strict: an equal rank later in the list never replaces the base
        if m.diet.rank() > base_diet.rank() {
            base_diet = m.diet;
        }
    }

    let fork_specs = members
        .iter()
        .filter(|m| needs_fork(m, base_diet))
        .map(|m| ForkSpec {
            member_id: m.id,
            member_name: m.name.clone(),
            reason: fork_reason(m, base_diet),
            diet: m.diet,
            allergies: m.allergies.clone(),
            goals: m.goals.clone(),
        })
        .collect();

    Constraints {
        hard_excludes,
        base_diet,
        fork_specs,
        household_size: members.len(),
    }
}

/// Dislikes are informational only and never force a fork.
fn needs_fork(member: &Member, base_diet: Diet) -> bool {
    member.diet != base_diet || !member.allergies.is_empty() || !member.goals.is_empty()
}

fn fork_reason(member: &Member, base_diet: Diet) -> String {
    let mut parts = Vec::with_capacity(3);
    if member.diet != base_diet {
        parts.push(member.diet.to_string());
    }
    if !member.allergies.is_empty() {
        parts.push(format!("allergies: {}", member.allergies.join(", ")));
    }
    if !member.goals.is_empty() {
        parts.push(format!("goals: {}", member.goals.join(", ")));
    }
    parts.join("; ")
}
