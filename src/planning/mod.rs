//! Household constraint resolution, generation contract and plan folding.

pub mod constraints;
pub mod diet;
pub mod measurement;
pub mod prompt;
pub mod quota;
pub mod schema;
pub mod shopping;
pub mod slots;
