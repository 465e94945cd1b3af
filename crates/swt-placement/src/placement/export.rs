//! Applicant report for a single job, as downloaded by administrators.

use std::fmt;
use std::io::Write;

use chrono::{DateTime, Months, Utc};

use super::domain::{Job, JobId};
use super::error::LedgerError;
use super::ledger::PlacementLedger;

pub const EXPORT_HEADER: [&str; 6] = ["Name", "Phone", "School", "Score", "ApplyTime", "Status"];

/// Trailing window of applications included in a report.
const REPORT_WINDOW_MONTHS: u32 = 3;

#[derive(Debug)]
pub enum ExportError {
    Ledger(LedgerError),
    Csv(csv::Error),
    Io(std::io::Error),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Ledger(err) => write!(f, "cannot export applicants: {}", err),
            ExportError::Csv(err) => write!(f, "failed to write applicant CSV: {}", err),
            ExportError::Io(err) => write!(f, "failed to flush applicant CSV: {}", err),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Ledger(err) => Some(err),
            ExportError::Csv(err) => Some(err),
            ExportError::Io(err) => Some(err),
        }
    }
}

impl From<LedgerError> for ExportError {
    fn from(err: LedgerError) -> Self {
        Self::Ledger(err)
    }
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// Download name offered for a job's report.
pub fn export_file_name(job: &Job) -> String {
    format!("{}_Report.csv", job.title)
}

/// Writes one row per application on `job_id` filed after `now` minus three calendar
/// months, in application order. Returns the number of rows written.
pub fn export_job_csv<W: Write>(
    ledger: &PlacementLedger,
    job_id: &JobId,
    now: DateTime<Utc>,
    writer: W,
) -> Result<usize, ExportError> {
    if ledger.job(job_id).is_none() {
        return Err(LedgerError::UnknownJob(job_id.clone()).into());
    }
    let cutoff = now
        .checked_sub_months(Months::new(REPORT_WINDOW_MONTHS))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(EXPORT_HEADER)?;

    let mut rows = 0;
    for application in ledger
        .applications()
        .iter()
        .filter(|application| &application.job_id == job_id && application.timestamp > cutoff)
    {
        let Some(student) = ledger.user(&application.student_id) else {
            continue;
        };
        let score = student.score.to_string();
        let apply_time = application.timestamp.format("%Y-%m-%d").to_string();
        csv_writer.write_record([
            student.name.as_str(),
            student.phone.as_deref().unwrap_or_default(),
            student.school.as_deref().unwrap_or_default(),
            score.as_str(),
            apply_time.as_str(),
            application.status.label(),
        ])?;
        rows += 1;
    }

    csv_writer.flush()?;
    tracing::info!(job_id = %job_id, rows, "applicant report exported");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::{LedgerPolicy, PlacementLedger};

    #[test]
    fn file_name_uses_job_title() {
        let ledger = crate::placement::seed::demo_ledger(
            LedgerPolicy::default(),
            std::sync::Arc::new(crate::placement::SystemClock),
        );
        let job = ledger.job(&JobId::new("j2")).expect("seeded job");
        assert_eq!(export_file_name(job), "Line Cook (西餐厅帮厨)_Report.csv");
    }

    #[test]
    fn unknown_job_is_rejected_before_writing() {
        let ledger = PlacementLedger::new(LedgerPolicy::default());
        let mut buffer = Vec::new();
        let err = export_job_csv(&ledger, &JobId::new("missing"), Utc::now(), &mut buffer)
            .expect_err("unknown job");
        assert!(matches!(err, ExportError::Ledger(LedgerError::UnknownJob(_))));
        assert!(buffer.is_empty());
    }

    #[test]
    fn empty_job_still_gets_a_header() {
        let ledger = crate::placement::seed::demo_ledger(
            LedgerPolicy::default(),
            std::sync::Arc::new(crate::placement::SystemClock),
        );
        let mut buffer = Vec::new();
        let rows = export_job_csv(&ledger, &JobId::new("j3"), Utc::now(), &mut buffer)
            .expect("export succeeds");
        assert_eq!(rows, 0);
        assert_eq!(
            String::from_utf8(buffer).expect("utf8"),
            "Name,Phone,School,Score,ApplyTime,Status\n"
        );
    }
}
