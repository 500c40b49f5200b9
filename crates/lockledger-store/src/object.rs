use bytes::Bytes;
use lockledger_types::{Generation, ObjectState};

/// Precondition attached to a content write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WritePrecondition {
    /// Unconditional write.
    None,
    /// Succeeds only if no object exists under the name.
    DoesNotExist,
    /// Succeeds only if the object's current generation matches.
    MatchesGeneration(Generation),
}

/// Outcome of a content write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteResult {
    /// The write landed and the object now has `generation`.
    Success { generation: Generation },
    /// The precondition did not hold; nothing was written.
    ///
    /// `current` is the object's generation at the time of the check, or
    /// `None` if it did not exist.
    PreconditionFailed { current: Option<Generation> },
}

impl WriteResult {
    pub fn is_success(&self) -> bool {
        matches!(self, WriteResult::Success { .. })
    }
}

/// An object's content together with its state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredContent {
    pub data: Bytes,
    pub state: ObjectState,
}
