use crate::error::{SyncError, SyncResult};

/// https://datatracker.ietf.org/doc/html/rfc3550#section-6.1
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|    RC   |   PT          |             length            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
#[derive(Debug)]
pub struct RtcpHeader {
    pub report_count: u8,
    pub packet_type: u8,
    pub length_field: u16,
}

impl RtcpHeader {
    pub const SIZE_BYTES: usize = 4;
    pub const SR_PT: u8 = 200;
}

/// The sender-info fields of an RTCP Sender Report that matter for
/// synchronization: the RFC 3550 §6.4.1 NTP/RTP correlation.
///
/// https://datatracker.ietf.org/doc/html/rfc3550#section-6.4.1
#[derive(Debug)]
pub struct SenderInfo {
    pub ssrc: u32,
    pub ntp_timestamp_msw: u32,
    pub ntp_timestamp_lsw: u32,
    pub rtp_timestamp: u32,
}

impl SenderInfo {
    /// The NTP timestamp as a 64-bit fixed-point value (seconds in the
    /// upper 32 bits, fraction in the lower 32).
    pub fn ntp_fixed_point(&self) -> u64 {
        ((self.ntp_timestamp_msw as u64) << 32) | self.ntp_timestamp_lsw as u64
    }
}

const SENDER_INFO_LEN: usize = 20; // ssrc(4) + ntp(8) + rtp_ts(4) + packet_count(4) + octet_count(4)

/// Parses only the first RTCP packet in `buf`, per the core's contract of
/// iterating just the first packet in a (possibly compound) RTCP buffer.
/// Returns `None` for an RTCP header whose type is not `SR` (200) — the
/// caller logs and ignores those.
pub fn parse_first_sr(buf: &[u8]) -> SyncResult<Option<SenderInfo>> {
    if buf.len() < RtcpHeader::SIZE_BYTES {
        return Err(SyncError::UnexpectedError(format!(
            "buffer cannot be mapped as RTCP: {} bytes, need at least {}",
            buf.len(),
            RtcpHeader::SIZE_BYTES
        )));
    }

    let header = RtcpHeader {
        report_count: buf[0] & 0b0001_1111,
        packet_type: buf[1],
        length_field: u16::from_be_bytes([buf[2], buf[3]]),
    };

    if header.packet_type != RtcpHeader::SR_PT {
        log::debug!("ignoring RTCP packet, type: {}", header.packet_type);
        return Ok(None);
    }

    let body = &buf[RtcpHeader::SIZE_BYTES..];
    if body.len() < SENDER_INFO_LEN {
        return Err(SyncError::UnexpectedError(format!(
            "buffer cannot be mapped as RTCP: SR sender-info truncated ({} bytes, need {})",
            body.len(),
            SENDER_INFO_LEN
        )));
    }

    Ok(Some(SenderInfo {
        ssrc: u32::from_be_bytes([body[0], body[1], body[2], body[3]]),
        ntp_timestamp_msw: u32::from_be_bytes([body[4], body[5], body[6], body[7]]),
        ntp_timestamp_lsw: u32::from_be_bytes([body[8], body[9], body[10], body[11]]),
        rtp_timestamp: u32::from_be_bytes([body[12], body[13], body[14], body[15]]),
    }))
}

/// Converts the SR's 64-bit NTP fixed-point timestamp into nanoseconds:
/// `ntp * 1e9 / 2^32`.
pub fn ntp_fixed_point_to_nanos(ntp: u64) -> u64 {
    ((ntp as u128) * 1_000_000_000u128 >> 32) as u64
}
