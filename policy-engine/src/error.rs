use thiserror::Error;

/// Errors surfaced by the policy engine.
///
/// A policy question that simply has no matching rule is a normal `false`
/// answer, never an error. Errors are reserved for failures of the durable
/// policy store backing the enforcer.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("policy storage failure: {0}")]
    Adapter(String),
}
