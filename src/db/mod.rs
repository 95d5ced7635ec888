mod repository;
mod schema;

pub use repository::{
    Repository, CODE_ANALYSES_KEY, INSIGHTS_KEY, PRACTICE_PLANS_KEY, RECOMMENDATIONS_KEY,
};
