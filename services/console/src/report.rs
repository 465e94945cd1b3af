use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use clap::Args;
use swt_placement::error::AppError;
use swt_placement::placement::{
    export_file_name, export_job_csv, Job, JobId, JobOverviewEntry, JobSort, LedgerError,
    LedgerPolicy, PlacementLedger, SystemClock,
};
use tracing::info;

use crate::infra::{load_ledger, start_of_day};

#[derive(Args, Debug, Default)]
pub(crate) struct JobsArgs {
    /// Ledger snapshot (JSON) to report on. Defaults to the demo records.
    #[arg(long)]
    pub(crate) snapshot: Option<PathBuf>,
    /// Sort order: applicants, score or date.
    #[arg(long, default_value = "date", value_parser = crate::infra::parse_sort)]
    pub(crate) sort: JobSort,
    /// Print the overview as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    /// Job id to export applicants for
    #[arg(long)]
    pub(crate) job: String,
    /// Ledger snapshot (JSON) to export from. Defaults to the demo records.
    #[arg(long)]
    pub(crate) snapshot: Option<PathBuf>,
    /// Output file, or `-` for stdout. Defaults to `{title}_Report.csv`.
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// Report date (YYYY-MM-DD) anchoring the three month window. Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) fn run_jobs(args: JobsArgs, policy: LedgerPolicy) -> Result<(), AppError> {
    let ledger = load_ledger(args.snapshot.as_deref(), policy, Arc::new(SystemClock))?;
    let entries = ledger.admin_job_overview(args.sort)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.json {
        serde_json::to_writer_pretty(&mut out, &entries).map_err(io::Error::from)?;
        writeln!(out)?;
    } else {
        render_overview(&mut out, &entries)?;
    }
    Ok(())
}

pub(crate) fn render_overview<W: Write>(
    out: &mut W,
    entries: &[JobOverviewEntry],
) -> io::Result<()> {
    writeln!(out, "Job overview ({} jobs)", entries.len())?;
    for JobOverviewEntry { job, stats } in entries {
        writeln!(
            out,
            "- [{}] {} | {} | cohort {} | min score {}",
            job.id, job.title, job.company, job.program_year, job.min_score
        )?;
        writeln!(
            out,
            "  applicants {} (pending {}, approved {}, rejected {}) | scores {}-{} | remaining {}/{}",
            stats.applicant_count,
            stats.pending_count,
            stats.approved_count,
            stats.rejected_count,
            stats.score_range.min,
            stats.score_range.max,
            stats.remaining_capacity,
            job.capacity
        )?;
        if stats.overbooked {
            writeln!(out, "  overbooked: approvals exceed capacity")?;
        }
        if stats.feedback_count > 0 {
            writeln!(out, "  feedback received: {}", stats.feedback_count)?;
        }
    }
    Ok(())
}

pub(crate) fn run_export(args: ExportArgs, policy: LedgerPolicy) -> Result<(), AppError> {
    let ledger = load_ledger(args.snapshot.as_deref(), policy, Arc::new(SystemClock))?;
    let job_id = JobId::new(args.job);
    let now = args.today.map(start_of_day).unwrap_or_else(Utc::now);

    let destination = match args.output {
        Some(path) => path,
        None => {
            let job = ledger
                .job(&job_id)
                .ok_or_else(|| LedgerError::UnknownJob(job_id.clone()))?;
            default_destination(job)
        }
    };
    export_to(&ledger, &job_id, now, &destination)
}

/// `{title}_Report.csv` in the working directory, with path separators in the title
/// replaced so the file never lands in a subdirectory.
fn default_destination(job: &Job) -> PathBuf {
    PathBuf::from(export_file_name(job).replace(['/', '\\'], "_"))
}

fn export_to(
    ledger: &PlacementLedger,
    job_id: &JobId,
    now: DateTime<Utc>,
    destination: &Path,
) -> Result<(), AppError> {
    if destination == Path::new("-") {
        export_job_csv(ledger, job_id, now, io::stdout().lock())?;
        return Ok(());
    }
    if ledger.job(job_id).is_none() {
        return Err(LedgerError::UnknownJob(job_id.clone()).into());
    }
    let file = BufWriter::new(File::create(destination)?);
    let rows = export_job_csv(ledger, job_id, now, file)?;
    info!(path = %destination.display(), rows, "report written");
    eprintln!("wrote {rows} rows to {}", destination.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use swt_placement::placement::{seed, FixedClock, JobPosting, Registration, Role};

    fn ledger_with_applicant() -> (PlacementLedger, JobId) {
        let start = Utc
            .with_ymd_and_hms(2024, 5, 1, 9, 0, 0)
            .single()
            .expect("valid timestamp");
        let clock = Arc::new(FixedClock::new(start));
        let mut ledger = seed::demo_ledger(LedgerPolicy::default(), clock.clone());
        clock.advance(Duration::minutes(5));
        let student = ledger
            .register(Registration {
                name: "Zhao Lei".to_string(),
                school: "Zhejiang University".to_string(),
                phone: "13700137000".to_string(),
                score: "8.5".to_string(),
                program_year: "2024".to_string(),
                verification_code: "1234".to_string(),
            })
            .expect("registered");
        let job = JobId::new("j2");
        ledger.apply(&student.id, &job).expect("applied");
        (ledger, job)
    }

    #[test]
    fn export_writes_file_at_destination() {
        let (ledger, job) = ledger_with_applicant();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("report.csv");
        let now = start_of_day(NaiveDate::from_ymd_opt(2024, 6, 1).expect("valid date"));

        export_to(&ledger, &job, now, &path).expect("export succeeds");

        let written = std::fs::read_to_string(&path).expect("report readable");
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines[0], "Name,Phone,School,Score,ApplyTime,Status");
        assert_eq!(
            lines[1],
            "Zhao Lei,13700137000,Zhejiang University,8.5,2024-05-01,pending"
        );
    }

    #[test]
    fn default_destination_keeps_slashed_titles_in_one_file() {
        let (mut ledger, _) = ledger_with_applicant();
        ledger.login(Role::Admin).expect("admin login");
        let job = ledger
            .post_job(JobPosting {
                title: "Housekeeping/Laundry".to_string(),
                description: "Rooms and linen.".to_string(),
                housing: "$95/week".to_string(),
                start_date_range: "Jun 05 - Jun 20".to_string(),
                ..JobPosting::default()
            })
            .expect("posted");

        let destination = default_destination(&job);
        assert_eq!(destination, PathBuf::from("Housekeeping_Laundry_Report.csv"));
        assert_eq!(destination.components().count(), 1);
    }

    #[test]
    fn unknown_job_does_not_create_a_file() {
        let (ledger, _) = ledger_with_applicant();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("report.csv");

        let err = export_to(&ledger, &JobId::new("j404"), Utc::now(), &path)
            .expect_err("unknown job");
        assert!(matches!(err, AppError::Ledger(LedgerError::UnknownJob(_))));
        assert!(!path.exists());
    }

    #[test]
    fn overview_lists_counts_and_capacity() {
        let (ledger, _) = ledger_with_applicant();
        let entries = ledger
            .admin_job_overview(JobSort::Applicants)
            .expect("overview");
        let mut out = Vec::new();
        render_overview(&mut out, &entries).expect("render");
        let text = String::from_utf8(out).expect("utf8");

        assert!(text.starts_with("Job overview (3 jobs)"));
        let first_job = text.lines().nth(1).expect("first job line");
        assert!(first_job.contains("[j2] Line Cook"));
        assert!(text.contains("applicants 1 (pending 1, approved 0, rejected 0) | scores 8.5-8.5 | remaining 5/5"));
    }

    #[test]
    fn overview_serializes_with_stats() {
        let (ledger, _) = ledger_with_applicant();
        let entries = ledger
            .admin_job_overview(JobSort::Applicants)
            .expect("overview");
        let value = serde_json::to_value(&entries).expect("serializes");
        assert_eq!(value[0]["job"]["id"], "j2");
        assert_eq!(value[0]["stats"]["applicant_count"], 1);
    }
}
