use serde::Serialize;

/// A domain-agnostic event.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **versioned** (the payload shape is identified by `kind` + `version`)
/// - designed to be **append-only**
pub trait Event: Serialize + Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event variant name (e.g. "UserCreated").
    fn kind(&self) -> &'static str;

    /// Schema version tag for this variant's payload (e.g. "v1").
    fn version(&self) -> &'static str;
}
