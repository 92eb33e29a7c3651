/// Lifts 32-bit RTP wire timestamps into a 64-bit counter that survives
/// wraparound, interpreting each new sample as the value nearest the prior
/// extended counter.
///
/// https://datatracker.ietf.org/doc/html/rfc3550#section-5.1
///
/// Correct as long as successive samples are closer together than 2^31
/// clock ticks, true for any realistic media clock rate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtendedTimestampTracker {
    ext_ts: Option<u64>,
}

impl ExtendedTimestampTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a new 32-bit wire timestamp, returning the updated 64-bit
    /// extended timestamp.
    pub fn extend(&mut self, ts: u32) -> u64 {
        let ext = match self.ext_ts {
            None => ts as u64,
            Some(prev) => {
                let diff = ts.wrapping_sub(prev as u32) as i32;
                if diff >= 0 {
                    prev.wrapping_add(diff as u64)
                } else {
                    prev.wrapping_sub(diff.unsigned_abs() as u64)
                }
            }
        };
        self.ext_ts = Some(ext);
        ext
    }

    pub fn current(&self) -> Option<u64> {
        self.ext_ts
    }
}
