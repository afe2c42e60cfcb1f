//! Eligibility verification: result model, normalization, determination and
//! plain-language explanation.

pub mod engine;
pub mod explain;
pub mod handlers;
pub mod models;
pub mod normalize;
pub mod prompts;
