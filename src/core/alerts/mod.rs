//! Site alerting
//!
//! Rules watch one `(site, pollutant)` pair. The sync run evaluates every
//! newly stored measurement, and can seed demo rules from recent data.

pub mod demo;
pub mod evaluator;

pub use demo::{demo_threshold, ensure_demo_rules, DEMO_RULE_PREFIX};
pub use evaluator::AlertEvaluator;
