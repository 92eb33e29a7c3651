//! The arithmetic engine that translates an extended RTP timestamp plus the
//! current anchor into a presentation timestamp, saturating instead of
//! wrapping at the `u64` nanosecond range's edges.

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Scales a tick count to nanoseconds at `clock_rate`, saturating to
/// `u64::MAX` instead of wrapping when the result overflows — mirrors
/// `gst_util_uint64_scale_int`'s saturating contract, which the saturation
/// branches in `apply_rtp_offset` depend on to see the true overflow
/// magnitude rather than a silently-wrapped small value.
fn ticks_to_nanos(ticks: u64, clock_rate: i32) -> u64 {
    ((ticks as u128) * NANOS_PER_SEC / (clock_rate as u128)).min(u64::MAX as u128) as u64
}

/// Applies the signed RTP-timestamp offset between `ext_ts` and
/// `base_ext_ts` to `*pts`, in the same saturating style as the
/// NTP-to-sync-time offset applied beforehand. `wrapped_down`/`wrapped_up`
/// carry forward whatever an earlier step already decided; once a value has
/// saturated, further adjustments keep it saturated in that direction
/// rather than drifting back toward a plausible-looking but meaningless
/// number.
fn apply_rtp_offset(pts: &mut u64, ext_ts: u64, base_ext_ts: u64, clock_rate: i32, wrapped_down: bool, wrapped_up: bool) {
    use std::cmp::Ordering::*;

    match ext_ts.cmp(&base_ext_ts) {
        Greater => {
            let diff_ns = ticks_to_nanos(ext_ts - base_ext_ts, clock_rate);
            if wrapped_up {
                *pts = u64::MAX;
            } else if wrapped_down && diff_ns < (u64::MAX - *pts) {
                *pts = 0;
            } else if !wrapped_down && diff_ns > (u64::MAX - *pts) {
                *pts = u64::MAX;
            } else {
                *pts = pts.wrapping_add(diff_ns);
            }
        }
        Less => {
            let diff_ns = ticks_to_nanos(base_ext_ts - ext_ts, clock_rate);
            if wrapped_down {
                *pts = 0;
            } else if wrapped_up && diff_ns < *pts {
                *pts = u64::MAX;
            } else if !wrapped_up && diff_ns > *pts {
                *pts = 0;
            } else {
                *pts = pts.wrapping_sub(diff_ns);
            }
        }
        Equal => {
            if wrapped_down {
                *pts = 0;
            } else if wrapped_up {
                *pts = u64::MAX;
            }
        }
    }
}

/// Interpolation-regime PTS: `base_pts` adjusted by the signed delta between
/// `ext_ts` and `base_ext_ts`, with no prior wrap state to carry in.
pub fn interpolated_pts(base_ext_ts: u64, base_pts: u64, ext_ts: u64, clock_rate: i32) -> u64 {
    let mut pts = base_pts;
    apply_rtp_offset(&mut pts, ext_ts, base_ext_ts, clock_rate, false, false);
    pts
}

/// Synchronized-regime PTS: `base_sync_time` adjusted first by the signed
/// NTP delta between the most recent SR and the base SR, then by the signed
/// RTP-timestamp delta between this packet and that most recent SR.
pub fn synchronized_pts(
    base_ntp_time: u64,
    base_sync_time: u64,
    last_rtcp_ntp_time: u64,
    last_rtcp_ext_ts: u64,
    ext_ts: u64,
    clock_rate: i32,
) -> u64 {
    let mut pts = base_sync_time;
    let mut wrapped_down = false;
    let mut wrapped_up = false;

    if last_rtcp_ntp_time > base_ntp_time {
        let diff = last_rtcp_ntp_time - base_ntp_time;
        wrapped_up = diff > (u64::MAX - pts);
        pts = pts.wrapping_add(diff);
    } else if last_rtcp_ntp_time < base_ntp_time {
        let diff = base_ntp_time - last_rtcp_ntp_time;
        wrapped_down = pts < diff;
        pts = pts.wrapping_sub(diff);
    }

    apply_rtp_offset(&mut pts, ext_ts, last_rtcp_ext_ts, clock_rate, wrapped_down, wrapped_up);
    pts
}
