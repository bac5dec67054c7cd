//! The game engine.
//!
//! `scoring` is a pure function from a finalized grid to a preview result;
//! `publish` applies that result to persistent game state under the
//! once-per-day rule; `achievements` reacts to the state change afterwards.
//! Preview and publish share the same scoring path, so what a player sees in
//! the preview is exactly what publishing applies.

pub mod achievements;
pub mod publish;
pub mod scoring;

pub use publish::PublishGuard;
pub use scoring::{compute_preview, ScoringCoefficients};
