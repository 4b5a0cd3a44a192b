pub mod arbitrage;
pub mod engine;
pub mod odds;
pub mod steam;
pub mod value;

pub use engine::{EngineConfig, OddsEvaluationEngine};
pub use odds::implied_probability;
