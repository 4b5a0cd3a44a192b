pub mod accuracy_scorer;

pub use accuracy_scorer::AccuracyScorer;
