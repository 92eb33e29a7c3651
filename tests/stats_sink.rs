//! Exercises the stats sink's file-open path end to end: pointing
//! `KMS_RTP_SYNC_STATS_PATH` at a real directory and confirming a CSV with
//! the expected header and a row per processed packet shows up on disk.

use std::fs;

use rtp_sync::{RtpPacket, Synchronizer};
use tempfile::TempDir;

#[rustfmt::skip]
fn rtp_packet(ssrc: u32, pt: u8, ts: u32, pts: u64) -> RtpPacket {
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
fn enabled_sink_writes_a_csv_row_per_packet() {
    let dir = TempDir::new().unwrap();
    std::env::set_var("KMS_RTP_SYNC_STATS_PATH", dir.path());

    let sync = Synchronizer::new(true, Some("enabled_sink_writes_a_csv_row_per_packet"));
    assert!(sync.is_stats_enabled());

    sync.configure(96, 90_000).unwrap();
    let mut p = rtp_packet(1, 96, 1000, 100_000_000);
    sync.process_rtp(&mut p).unwrap();

    let mut entries: Vec<_> = fs::read_dir(dir.path()).unwrap().filter_map(|e| e.ok()).collect();
    assert_eq!(entries.len(), 1);
    let path = entries.remove(0).path();
    assert!(path.file_name().unwrap().to_str().unwrap().ends_with("_enabled_sink_writes_a_csv_row_per_packet.csv"));

    let contents = fs::read_to_string(&path).unwrap();
    let mut lines = contents.lines();
    assert_eq!(
        lines.next().unwrap(),
        "ENTRY_TS,THREAD,SSRC,CLOCK_RATE,PTS_ORIG,PTS,DTS,EXT_RTP,SR_NTP_NS,SR_EXT_RTP"
    );
    let row = lines.next().unwrap();
    let fields: Vec<_> = row.split(',').collect();
    assert_eq!(fields.len(), 10);
    assert_eq!(fields[2], "1"); // SSRC
    assert_eq!(fields[3], "90000"); // clock rate
    assert_eq!(fields[5], "100000000"); // PTS
}

/// `stats_name: None` disables the sink unconditionally — independent of
/// whatever `KMS_RTP_SYNC_STATS_PATH` is set to by the other test in this
/// file, so this assertion holds regardless of test execution order.
#[test]
fn disabled_without_a_stats_name() {
    let sync = Synchronizer::new(true, None);
    assert!(!sync.is_stats_enabled());
}
