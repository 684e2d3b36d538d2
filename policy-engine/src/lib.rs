//! A scoped role-based policy decision engine.
//!
//! Policies are five-part tuples: an organization, a program within that
//! organization, a subject, an object and an action. Grouping rules bind a
//! subject to a role within the same (organization, program) scope, and the
//! [`Enforcer`] resolves role inheritance transitively when answering an
//! access question.
//!
//! Durable storage is abstracted behind the [`PolicyAdapter`] trait; the
//! enforcer keeps the full policy set cached in memory and synchronizes with
//! the adapter on every mutation and on explicit load/save calls.

pub mod adapter;
pub mod enforcer;
pub mod error;
pub mod model;

pub use adapter::{MemoryAdapter, PolicyAdapter};
pub use enforcer::{AccessRequest, Enforcer};
pub use error::EngineError;
pub use model::{GroupingRule, PolicyRule, PolicySet, Rule};
