use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use swt_placement::error::AppError;
use swt_placement::placement::{
    seed, CapacityPolicy, Clock, JobSort, LedgerPolicy, LedgerSnapshot, PlacementLedger,
};

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_sort(raw: &str) -> Result<JobSort, String> {
    raw.parse()
}

pub(crate) fn parse_policy(raw: &str) -> Result<CapacityPolicy, String> {
    raw.parse()
}

/// Start of `date` in UTC.
pub(crate) fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()
}

/// Loads a snapshot file when one is given, otherwise the demo records.
pub(crate) fn load_ledger(
    snapshot: Option<&Path>,
    policy: LedgerPolicy,
    clock: Arc<dyn Clock>,
) -> Result<PlacementLedger, AppError> {
    match snapshot {
        Some(path) => {
            let reader = BufReader::new(File::open(path)?);
            let snapshot = LedgerSnapshot::from_reader(reader)?;
            Ok(PlacementLedger::from_snapshot(snapshot, policy, clock)?)
        }
        None => Ok(seed::demo_ledger(policy, clock)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swt_placement::placement::SystemClock;

    #[test]
    fn parses_cli_values() {
        assert_eq!(
            parse_date(" 2024-06-15 "),
            Ok(NaiveDate::from_ymd_opt(2024, 6, 15).expect("valid date"))
        );
        assert!(parse_date("15/06/2024").is_err());
        assert_eq!(parse_sort("Applicants"), Ok(JobSort::Applicants));
        assert_eq!(parse_policy("soft"), Ok(CapacityPolicy::Soft));
        assert!(parse_policy("sometimes").is_err());
    }

    #[test]
    fn start_of_day_is_midnight_utc() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 15).expect("valid date");
        assert_eq!(start_of_day(date).to_rfc3339(), "2024-06-15T00:00:00+00:00");
    }

    #[test]
    fn missing_snapshot_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_ledger(
            Some(&dir.path().join("absent.json")),
            LedgerPolicy::default(),
            Arc::new(SystemClock),
        )
        .expect_err("no such file");
        assert!(matches!(err, AppError::Io(_)));
    }

    #[test]
    fn falls_back_to_demo_records() {
        let ledger = load_ledger(None, LedgerPolicy::default(), Arc::new(SystemClock))
            .expect("demo ledger");
        assert_eq!(ledger.jobs().count(), 3);
    }
}
