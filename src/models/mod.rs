//! Domain models for AgentBoard.
//!
//! # Core Concepts
//!
//! - [`Project`]: Top-level container. Owns items, API keys and the optional
//!   credentials used by the autonomous worker and the notification sink.
//! - [`Item`]: A unit of work moving through the six-state lifecycle
//!   `draft → pending_review → approved → in_progress → done → accepted`.
//! - [`Dependency`]: A directed "blocks" edge between two items of a project.
//! - [`DecisionLog`]: Append-only rationale record. At least one must exist
//!   before an item may complete.
//! - [`Comment`]: Free-text note on an item. Rejections and generated plans
//!   are stored as comments.
//!
//! Every actor acts under one [`Role`]: planner, implementer or authority.

mod comment;
mod decision;
mod dependency;
mod item;
mod project;
mod role;

pub use comment::*;
pub use decision::*;
pub use dependency::*;
pub use item::*;
pub use project::*;
pub use role::*;
