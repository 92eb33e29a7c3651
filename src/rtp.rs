use bytes::Bytes;

use crate::error::{SyncError, SyncResult};

/// The minimal shape of an RTP packet crossing the core's boundary: a
/// read-only wire buffer (the core never touches the payload) plus the
/// presentation/decode timestamps the core is responsible for assigning and
/// observing. Mirrors the fixed header layout of RFC 3550 §5.1.
///
/// https://datatracker.ietf.org/doc/html/rfc3550#section-5.1
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|X|  CC   |M|     PT      |       sequence number         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           timestamp                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |           synchronization source (SSRC) identifier            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
pub struct RtpPacket {
    data: Bytes,
    /// Presentation timestamp. Read as the arrival-side value the caller
    /// attached before calling `process_rtp`; overwritten as a side effect
    /// of that call.
    pub pts: u64,
    /// Decode timestamp, read-only to the core (observability only).
    pub dts: u64,
}

const FIXED_HEADER_LEN: usize = 12;

impl RtpPacket {
    pub fn new(data: impl Into<Bytes>, pts: u64, dts: u64) -> Self {
        Self { data: data.into(), pts, dts }
    }

    fn header(&self) -> SyncResult<&[u8]> {
        if self.data.len() < FIXED_HEADER_LEN {
            return Err(SyncError::UnexpectedError(format!(
                "buffer cannot be mapped as RTP: {} bytes, need at least {FIXED_HEADER_LEN}",
                self.data.len()
            )));
        }
        Ok(&self.data[..FIXED_HEADER_LEN])
    }

    pub fn ssrc(&self) -> SyncResult<u32> {
        let h = self.header()?;
        Ok(u32::from_be_bytes([h[8], h[9], h[10], h[11]]))
    }

    pub fn timestamp(&self) -> SyncResult<u32> {
        let h = self.header()?;
        Ok(u32::from_be_bytes([h[4], h[5], h[6], h[7]]))
    }

    /// The 7-bit payload type field.
    pub fn payload_type(&self) -> SyncResult<u8> {
        let h = self.header()?;
        Ok(h[1] & 0b0111_1111)
    }

    pub fn sequence_number(&self) -> SyncResult<u16> {
        let h = self.header()?;
        Ok(u16::from_be_bytes([h[2], h[3]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rustfmt::skip]
    fn sample() -> Vec<u8> {
        vec![
            // V=2,P=0,X=0,CC=0,M=0,PT=96, SeqNum=16535
            0x80, 0x60, 0x40, 0x97,
            // Timestamp: 0x0000_1000
            0x00, 0x00, 0x10, 0x00,
            // SSRC: 0x1122_3344
            0x11, 0x22, 0x33, 0x44,
        ]
    }

    #[test]
    fn parses_fixed_header() {
        let packet = RtpPacket::new(sample(), 0, 0);
        assert_eq!(packet.ssrc().unwrap(), 0x1122_3344);
        assert_eq!(packet.timestamp().unwrap(), 0x1000);
        assert_eq!(packet.payload_type().unwrap(), 96);
        assert_eq!(packet.sequence_number().unwrap(), 0x4097);
    }

    #[test]
    fn too_short_is_unexpected_error() {
        let packet = RtpPacket::new(vec![0u8; 4], 0, 0);
        assert!(matches!(packet.ssrc(), Err(SyncError::UnexpectedError(_))));
    }
}
