use thiserror::Error;

/// The two caller-visible error kinds from the core's error design. Internal
/// warnings (empty RTCP buffers, ignored RTCP subtypes, PTS saturation) are
/// logged, not returned, except where the sorted-mode contract is broken —
/// that case returns `InvalidData` *and* the packet is still processed.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{0}")]
    InvalidData(String),

    #[error("{0}")]
    UnexpectedError(String),
}

pub type SyncResult<T> = Result<T, SyncError>;
