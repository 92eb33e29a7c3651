/// The NTP/sync-time/extended-RTP anchor the synchronizer uses to translate
/// extended RTP timestamps into presentation timestamps.
///
/// Two disjoint regimes, selected by whether an RTCP Sender Report has ever
/// been observed:
///
/// - Interpolation regime: active until the first SR arrives. The first RTP
///   packet captures an anchor `(ext_ts, pts)`; later packets derive PTS
///   relative to it.
/// - Synchronized regime: active from the first SR onward. `base_ntp_time`
///   and `base_sync_time` are captured once, from that first SR, and never
///   change again. Every SR (including the first) still refreshes the
///   rolling `last_rtcp_*` pair used as the per-packet reference point.
///
/// The transition is one-way: once synchronized, the interpolation anchor is
/// never consulted again, and `base_ntp_time`/`base_sync_time` are frozen
/// for the instance's lifetime.
#[derive(Debug, Default)]
pub struct AnchorStore {
    base: Option<SyncBase>,
    last_rtcp_ext_ts: Option<u64>,
    last_rtcp_ntp_time: Option<u64>,
    interpolate: Option<InterpolateBase>,
}

#[derive(Debug, Clone, Copy)]
struct SyncBase {
    ntp_time: u64,
    sync_time: u64,
}

#[derive(Debug, Clone, Copy)]
struct InterpolateBase {
    ext_ts: u64,
    pts: u64,
}

impl AnchorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_synchronized(&self) -> bool {
        self.base.is_some()
    }

    /// Record an observed RTCP Sender Report. `ntp_time_ns` is the SR's NTP
    /// timestamp converted to nanoseconds; `arrival_sync_time_ns` is the
    /// pipeline's sync clock at SR arrival; `ext_rtcp_ts` is the SR's RTP
    /// timestamp field lifted through the (shared) extended-timestamp
    /// tracker. Returns `true` the first time this call transitions the
    /// store into the synchronized regime.
    pub fn observe_sr(&mut self, ntp_time_ns: u64, arrival_sync_time_ns: u64, ext_rtcp_ts: u64) -> bool {
        let first = self.base.is_none();
        if first {
            self.base = Some(SyncBase {
                ntp_time: ntp_time_ns,
                sync_time: arrival_sync_time_ns,
            });
        }
        self.last_rtcp_ext_ts = Some(ext_rtcp_ts);
        self.last_rtcp_ntp_time = Some(ntp_time_ns);
        first
    }

    /// Returns `(base_ntp_time, base_sync_time)` once synchronized.
    pub fn base(&self) -> Option<(u64, u64)> {
        self.base.map(|b| (b.ntp_time, b.sync_time))
    }

    pub fn last_rtcp_ext_ts(&self) -> Option<u64> {
        self.last_rtcp_ext_ts
    }

    pub fn last_rtcp_ntp_time(&self) -> Option<u64> {
        self.last_rtcp_ntp_time
    }

    /// Returns `(anchor_ext_ts, anchor_pts)` for the interpolation regime, if
    /// established.
    pub fn interpolation_anchor(&self) -> Option<(u64, u64)> {
        self.interpolate.map(|a| (a.ext_ts, a.pts))
    }

    /// Establishes the interpolation anchor from the first RTP packet seen
    /// before any SR. A no-op if already established or if the synchronized
    /// regime has since taken over.
    pub fn init_interpolation(&mut self, ext_ts: u64, pts: u64) {
        if self.interpolate.is_none() {
            self.interpolate = Some(InterpolateBase { ext_ts, pts });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sr_sets_base_and_rolling() {
        let mut anchors = AnchorStore::new();
        assert!(!anchors.is_synchronized());
        let first = anchors.observe_sr(1_000, 2_000, 500);
        assert!(first);
        assert!(anchors.is_synchronized());
        assert_eq!(anchors.base(), Some((1_000, 2_000)));
        assert_eq!(anchors.last_rtcp_ext_ts(), Some(500));
        assert_eq!(anchors.last_rtcp_ntp_time(), Some(1_000));
    }

    #[test]
    fn later_sr_refreshes_rolling_but_not_base() {
        let mut anchors = AnchorStore::new();
        anchors.observe_sr(1_000, 2_000, 500);
        let first = anchors.observe_sr(9_999, 8_888, 900);
        assert!(!first);
        assert_eq!(anchors.base(), Some((1_000, 2_000)));
        assert_eq!(anchors.last_rtcp_ext_ts(), Some(900));
        assert_eq!(anchors.last_rtcp_ntp_time(), Some(9_999));
    }

    #[test]
    fn interpolation_anchor_latches_once() {
        let mut anchors = AnchorStore::new();
        anchors.init_interpolation(100, 200);
        anchors.init_interpolation(500, 999);
        assert_eq!(anchors.interpolation_anchor(), Some((100, 200)));
    }
}
