//! RTP-to-wall-clock synchronizer: assigns a presentation timestamp to each
//! RTP media packet on a monotonic nanosecond timeline anchored to the
//! sender's NTP wall clock, as reported through RTCP Sender Reports.
//!
//! See [`Synchronizer`] for the entry point.

mod anchor;
pub mod error;
mod extended_timestamp;
mod pts;
pub mod rtcp;
pub mod rtp;
mod sorted_guard;
mod stats;
mod synchronizer;

pub use error::{SyncError, SyncResult};
pub use extended_timestamp::ExtendedTimestampTracker;
pub use rtp::RtpPacket;
pub use synchronizer::Synchronizer;
