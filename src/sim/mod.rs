/// Dispatch policies.
pub mod controller;
pub mod engine;
pub mod kpi;
pub mod microgrid;
/// Synthetic load and production profiles.
pub mod profile;
pub mod series;
pub mod types;
/// Post-run invariant checks.
pub mod validate;
