use std::cell::RefCell;

use parking_lot::ReentrantMutex;

use crate::anchor::AnchorStore;
use crate::error::{SyncError, SyncResult};
use crate::extended_timestamp::ExtendedTimestampTracker;
use crate::pts;
use crate::rtcp;
use crate::rtp::RtpPacket;
use crate::sorted_guard::{PreCheck, SortedModeGuard};
use crate::stats::{StatsRow, StatsSink};

struct Config {
    pt: u8,
    clock_rate: i32,
}

struct Inner {
    ssrc: Option<u32>,
    config: Option<Config>,
    feeded_sorted: bool,
    base_initiated_logged: bool,
    tracker: ExtendedTimestampTracker,
    anchors: AnchorStore,
    sorted_guard: SortedModeGuard,
}

/// One instance per inbound media stream (one SSRC, one payload type).
///
/// Fed two independent event streams: RTCP Sender Reports, which update the
/// NTP/RTP anchor, and RTP packets, whose presentation timestamp this type
/// computes and writes back. All state mutation is serialized behind a
/// single reentrant mutex; the stats sink is guarded independently so its
/// I/O never widens that critical section.
pub struct Synchronizer {
    inner: ReentrantMutex<RefCell<Inner>>,
    stats: StatsSink,
}

impl Synchronizer {
    /// `feeded_sorted` is the creator's initial promise that RTP packets
    /// will arrive in non-decreasing timestamp order; it may be demoted to
    /// `false` on the first observed regression, but never promoted back.
    /// `stats_name` of `None` disables the stats sink regardless of the
    /// `KMS_RTP_SYNC_STATS_PATH` environment variable.
    pub fn new(feeded_sorted: bool, stats_name: Option<&str>) -> Self {
        Self {
            inner: ReentrantMutex::new(RefCell::new(Inner {
                ssrc: None,
                config: None,
                feeded_sorted,
                base_initiated_logged: false,
                tracker: ExtendedTimestampTracker::new(),
                anchors: AnchorStore::new(),
                sorted_guard: SortedModeGuard::new(),
            })),
            stats: StatsSink::new(stats_name),
        }
    }

    pub fn is_stats_enabled(&self) -> bool {
        self.stats.is_enabled()
    }

    /// Configures the payload type and clock rate for this instance's
    /// lifetime. Fails if `clock_rate <= 0`, or if this instance has already
    /// been configured — a second call, even with identical arguments, is
    /// not treated as idempotent.
    pub fn configure(&self, pt: u8, clock_rate: i32) -> SyncResult<()> {
        if clock_rate <= 0 {
            return Err(SyncError::InvalidData(format!("clock-rate <= 0 not allowed: {clock_rate}")));
        }

        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();

        if inner.config.is_some() {
            return Err(SyncError::InvalidData("only one PT allowed per instance".to_string()));
        }

        inner.config = Some(Config { pt, clock_rate });
        Ok(())
    }

    /// Parses `buf` as an RTCP packet, consuming only the first packet in a
    /// compound buffer. Non-SR types are silently ignored (logged at debug
    /// level). An empty buffer is a warning, not an error.
    pub fn process_rtcp(&self, buf: &[u8], arrival_sync_time_ns: u64) -> SyncResult<()> {
        if buf.is_empty() {
            log::warn!("empty RTCP buffer");
            return Ok(());
        }

        let sender_info = match rtcp::parse_first_sr(buf)? {
            Some(info) => info,
            None => return Ok(()),
        };

        let ntp_ns = rtcp::ntp_fixed_point_to_nanos(sender_info.ntp_fixed_point());

        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();

        // Preserves the original's documented FIXME: the SR's RTP timestamp
        // feeds the same extended-timestamp tracker used for media packets,
        // even though RFC 3550 notes it need not align with adjacent RTP
        // packets.
        let ext_rtcp_ts = inner.tracker.extend(sender_info.rtp_timestamp);

        let first = inner.anchors.observe_sr(ntp_ns, arrival_sync_time_ns, ext_rtcp_ts);
        if first {
            log::debug!("RTCP Sender Report received: stop interpolating PTS");
        }

        Ok(())
    }

    /// Computes and writes back `packet.pts`. Returns `Err(InvalidData)` if
    /// the packet's SSRC doesn't match the learned SSRC (PTS left
    /// untouched), if the payload type doesn't match the configured one, or
    /// if the instance demotes out of sorted mode on this call — in the
    /// last case the packet is still fully processed despite the error.
    pub fn process_rtp(&self, packet: &mut RtpPacket) -> SyncResult<()> {
        let ssrc = packet.ssrc()?;
        let pt = packet.payload_type()?;
        let rtp_ts = packet.timestamp()?;

        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();

        let learned_ssrc = *inner.ssrc.get_or_insert(ssrc);
        if ssrc != learned_ssrc {
            return Err(SyncError::InvalidData(format!(
                "Invalid SSRC ({ssrc}), not matching with {learned_ssrc}"
            )));
        }

        let clock_rate = match &inner.config {
            None => {
                return Err(SyncError::InvalidData("clock rate not configured".to_string()));
            }
            Some(config) if config.pt != pt => {
                return Err(SyncError::InvalidData(format!("Unknown PT: {pt}, expected: {}", config.pt)));
            }
            Some(config) => config.clock_rate,
        };

        let pts_orig = packet.pts;
        let ext_ts = inner.tracker.extend(rtp_ts);

        let mut regressed = false;
        let mut cached: Option<u64> = None;

        if inner.feeded_sorted {
            match inner.sorted_guard.pre_check(ext_ts) {
                PreCheck::Regressed => {
                    inner.feeded_sorted = false;
                    regressed = true;
                }
                PreCheck::UseCached(pts) => cached = Some(pts),
                PreCheck::Proceed => {}
            }
        }

        let mut pts = if let Some(pts) = cached {
            pts
        } else if !inner.anchors.is_synchronized() {
            if !inner.base_initiated_logged {
                log::debug!("RTCP Sender Report not received yet: interpolate PTS (SSRC: {ssrc}, PT: {pt})");
                inner.base_initiated_logged = true;
            }
            match inner.anchors.interpolation_anchor() {
                Some((anchor_ext, anchor_pts)) => pts::interpolated_pts(anchor_ext, anchor_pts, ext_ts, clock_rate),
                None => {
                    inner.anchors.init_interpolation(ext_ts, pts_orig);
                    pts_orig
                }
            }
        } else {
            let (base_ntp, base_sync) = inner.anchors.base().expect("synchronized regime implies a base");
            let last_ntp = inner.anchors.last_rtcp_ntp_time().expect("synchronized regime implies a rolling SR");
            let last_ext = inner.anchors.last_rtcp_ext_ts().expect("synchronized regime implies a rolling SR");
            pts::synchronized_pts(base_ntp, base_sync, last_ntp, last_ext, ext_ts, clock_rate)
        };

        if cached.is_none() && inner.feeded_sorted {
            pts = inner.sorted_guard.post_fix(ext_ts, pts);
        }

        packet.pts = pts;

        let last_rtcp_ntp_ns = inner.anchors.last_rtcp_ntp_time();
        let last_rtcp_ext_ts = inner.anchors.last_rtcp_ext_ts();

        drop(inner);
        drop(guard);

        self.stats.record(&StatsRow {
            ssrc,
            clock_rate,
            pts_orig,
            pts,
            dts: packet.dts,
            ext_rtp_ts: ext_ts,
            last_rtcp_ntp_ns,
            last_rtcp_ext_ts,
        });

        if regressed {
            Err(SyncError::InvalidData(format!(
                "received an unsorted RTP buffer when expecting sorted (ssrc: {ssrc}, ts: {rtp_ts}, ext_ts: {ext_ts}), moving to unsorted mode"
            )))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rtp_packet(ssrc: u32, pt: u8, ts: u32, pts: u64) -> RtpPacket {
        #[rustfmt::skip]
        let mut header = vec![
            0x80, pt & 0x7F, 0x00, 0x01,
            0, 0, 0, 0,
            0, 0, 0, 0,
        ];
        header[4..8].copy_from_slice(&ts.to_be_bytes());
        header[8..12].copy_from_slice(&ssrc.to_be_bytes());
        RtpPacket::new(header, pts, 0)
    }

    #[test]
    fn configure_rejects_non_positive_clock_rate() {
        let sync = Synchronizer::new(true, None);
        assert!(matches!(sync.configure(96, 0), Err(SyncError::InvalidData(_))));
        assert!(matches!(sync.configure(96, -1), Err(SyncError::InvalidData(_))));
    }

    #[test]
    fn reconfigure_fails() {
        let sync = Synchronizer::new(true, None);
        sync.configure(96, 90_000).unwrap();
        assert!(matches!(sync.configure(96, 90_000), Err(SyncError::InvalidData(_))));
    }

    #[test]
    fn ssrc_mismatch_leaves_pts_untouched() {
        let sync = Synchronizer::new(true, None);
        sync.configure(96, 90_000).unwrap();
        let mut p1 = rtp_packet(1111, 96, 1000, 100);
        sync.process_rtp(&mut p1).unwrap();

        let mut p2 = rtp_packet(2222, 96, 2000, 999);
        let err = sync.process_rtp(&mut p2).unwrap_err();
        assert!(matches!(err, SyncError::InvalidData(_)));
        assert_eq!(p2.pts, 999);
    }

    #[test]
    fn unconfigured_instance_rejects_rtp() {
        let sync = Synchronizer::new(true, None);
        let mut p = rtp_packet(1, 96, 1000, 0);
        assert!(matches!(sync.process_rtp(&mut p), Err(SyncError::InvalidData(_))));
    }

    #[test]
    fn pt_mismatch_is_rejected() {
        let sync = Synchronizer::new(true, None);
        sync.configure(96, 90_000).unwrap();

        let mut p1 = rtp_packet(1, 96, 1000, 0);
        sync.process_rtp(&mut p1).unwrap();

        let mut p2 = rtp_packet(1, 97, 2000, 0);
        assert!(matches!(sync.process_rtp(&mut p2), Err(SyncError::InvalidData(_))));
    }

    #[test]
    fn stats_disabled_by_default() {
        let sync = Synchronizer::new(true, None);
        assert!(!sync.is_stats_enabled());
    }

    // The S1-S6 named scenarios from the synchronization contract are
    // exercised end-to-end against this same public API in
    // tests/scenarios.rs.
}
