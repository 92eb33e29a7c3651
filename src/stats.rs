use std::cell::Cell;
use std::fs::{self, File, OpenOptions};
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use once_cell::sync::Lazy;
use parking_lot::Mutex;

const STATS_PATH_ENV_VAR: &str = "KMS_RTP_SYNC_STATS_PATH";
const CSV_HEADER: &str = "ENTRY_TS,THREAD,SSRC,CLOCK_RATE,PTS_ORIG,PTS,DTS,EXT_RTP,SR_NTP_NS,SR_EXT_RTP\n";

/// Read once at process initialization, per the shared-resource policy: the
/// stats directory is process-wide, so re-reading the environment on every
/// instance would just be redundant syscalls.
static STATS_DIR: Lazy<Option<PathBuf>> = Lazy::new(|| std::env::var_os(STATS_PATH_ENV_VAR).map(PathBuf::from));

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_ID: Cell<u64> = Cell::new(0);
}

/// A small, stable, numeric id for the calling thread, assigned the first
/// time it touches the stats sink. Cheaper to read back offline than a
/// raw thread-handle pointer.
fn current_thread_id() -> u64 {
    THREAD_ID.with(|cell| {
        let id = cell.get();
        if id != 0 {
            return id;
        }
        let id = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
        cell.set(id);
        id
    })
}

fn entry_ts_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// One row of the stats CSV, recorded per processed RTP packet.
pub struct StatsRow {
    pub ssrc: u32,
    pub clock_rate: i32,
    pub pts_orig: u64,
    pub pts: u64,
    pub dts: u64,
    pub ext_rtp_ts: u64,
    pub last_rtcp_ntp_ns: Option<u64>,
    pub last_rtcp_ext_ts: Option<u64>,
}

/// Append-only CSV writer, independently locked from the instance's
/// reentrant mutex so stats I/O never widens the critical section that
/// guards PTS computation.
///
/// Enabled iff `KMS_RTP_SYNC_STATS_PATH` names a directory *and* the
/// instance was created with a non-empty stats name. Any failure along the
/// way (directory creation, file open) degrades silently to `Disabled`.
pub struct StatsSink {
    file: Option<Mutex<File>>,
}

impl StatsSink {
    /// `stats_name` of `None` disables the sink unconditionally, matching
    /// the constructor contract: a null name means "no stats", independent
    /// of whether the environment variable is set.
    pub fn new(stats_name: Option<&str>) -> Self {
        let file = stats_name.and_then(|name| Self::open(name));
        Self { file }
    }

    fn open(name: &str) -> Option<Mutex<File>> {
        let dir = STATS_DIR.as_ref()?;

        if let Err(e) = fs::create_dir_all(dir) {
            log::error!("cannot create directory for stats {}: {}", dir.display(), e);
            return None;
        }

        let timestamp = chrono::Local::now().format("%Y%m%d%H%M%S");
        let path = dir.join(format!("{timestamp}_{name}.csv"));

        match OpenOptions::new().create(true).write(true).truncate(true).open(&path) {
            Ok(mut file) => {
                if let Err(e) = file.write_all(CSV_HEADER.as_bytes()) {
                    log::error!("cannot write stats header to {}: {}", path.display(), e);
                    return None;
                }
                log::debug!("stats file: {}", path.display());
                Some(Mutex::new(file))
            }
            Err(e) => {
                log::error!("cannot open file for stats {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.file.is_some()
    }

    pub fn record(&self, row: &StatsRow) {
        let Some(file) = &self.file else {
            return;
        };

        let line = format!(
            "{},{},{},{},{},{},{},{},{},{}\n",
            entry_ts_micros(),
            current_thread_id(),
            row.ssrc,
            row.clock_rate,
            row.pts_orig,
            row.pts,
            row.dts,
            row.ext_rtp_ts,
            row.last_rtcp_ntp_ns.unwrap_or(0),
            row.last_rtcp_ext_ts.unwrap_or(0),
        );

        let mut file = file.lock();
        if let Err(e) = file.write_all(line.as_bytes()) {
            log::error!("failed writing stats row: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_without_name() {
        let sink = StatsSink::new(None);
        assert!(!sink.is_enabled());
    }

    #[test]
    fn disabled_without_env_var() {
        // STATS_DIR is resolved once, lazily, from whatever the environment
        // looked like the first time any test in the process touched it;
        // this crate's test suite never sets KMS_RTP_SYNC_STATS_PATH, so a
        // name alone is not enough to enable the sink.
        let sink = StatsSink::new(Some("probe"));
        assert!(!sink.is_enabled());
    }
}
