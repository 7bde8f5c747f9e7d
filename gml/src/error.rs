use thiserror::Error;

/// Errors returned by the [`Gml`](crate::Gml) context and its roles.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GmlError {
    /// The server shut down while a call was waiting on it.
    #[error("the server shut down before the call could be completed")]
    Aborted,
    /// A worker slot outside of `1..=max_workers` was requested.
    #[error("thread number {number} is not a worker slot (1..={max_workers})")]
    SlotOutOfRange {
        #[allow(missing_docs)]
        number: usize,
        #[allow(missing_docs)]
        max_workers: usize,
    },
    /// The slot already has a live [`Producer`](crate::Producer).
    #[error("thread number {0} already has a producer")]
    SlotTaken(usize),
    /// Thread number 0 belongs to the server, and there can only be one.
    #[error("thread number 0 is the server, and it has already been created")]
    ServerSlot,
    #[allow(missing_docs)]
    #[error("invalid configuration: {0}")]
    Config(String),
    /// A single record didn't fit in a queue buffer. Reported by panicking.
    #[error("a {len} byte record does not fit in a queue of at most {max} bytes")]
    RecordTooLarge {
        #[allow(missing_docs)]
        len: usize,
        #[allow(missing_docs)]
        max: usize,
    },
}
