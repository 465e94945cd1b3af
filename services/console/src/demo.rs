use std::io::{self, Write};
use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use clap::Args;
use swt_placement::error::AppError;
use swt_placement::placement::{
    seed, ApplicationStatus, CapacityPolicy, FixedClock, JobId, JobPosting, JobSort,
    LedgerPolicy, PlacementLedger, Registration, Role, UserId,
};

use crate::report::render_overview;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Capacity policy for the run: enforced or soft. Defaults to the configured policy.
    #[arg(long, value_parser = crate::infra::parse_policy)]
    pub(crate) policy: Option<CapacityPolicy>,
}

pub(crate) fn run_demo(args: DemoArgs, mut policy: LedgerPolicy) -> Result<(), AppError> {
    if let Some(capacity) = args.policy {
        policy.capacity = capacity;
    }
    let stdout = io::stdout();
    run_scenario(&mut stdout.lock(), policy)
}

/// Walks the placement lifecycle on the demo records: a cohort-matched job with one seat,
/// an out-of-reach job, a second applicant for the full job, then cleanup.
pub(crate) fn run_scenario<W: Write>(out: &mut W, policy: LedgerPolicy) -> Result<(), AppError> {
    let start = Utc
        .with_ymd_and_hms(2024, 3, 1, 9, 0, 0)
        .single()
        .unwrap_or_default();
    let clock = Arc::new(FixedClock::new(start));
    let mut ledger = seed::demo_ledger(policy.clone(), clock.clone());
    let tick = || clock.advance(Duration::minutes(5));

    writeln!(out, "Placement demo")?;
    writeln!(
        out,
        "Policy: capacity {} | eligibility {}",
        policy.capacity,
        if policy.enforce_eligibility {
            "checked on apply"
        } else {
            "shown on the board only"
        }
    )?;

    let admin = ledger.login(Role::Admin)?;
    writeln!(out, "\n1. {} posts two jobs for the 2024 cohort", admin.name)?;
    let job_a = ledger.post_job(posting("Water Park Lifeguard", 7.0, 1))?.id;
    tick();
    let job_b = ledger.post_job(posting("Swim Instructor", 9.0, 3))?.id;
    writeln!(out, "- A: Water Park Lifeguard (min score 7, capacity 1)")?;
    writeln!(out, "- B: Swim Instructor (min score 9, capacity 3)")?;
    ledger.logout();

    writeln!(out, "\n2. Li Ming registers with score 7.5")?;
    tick();
    let li_ming = register(&mut ledger, "Li Ming", "13800138011", "7.5")?;
    for entry in ledger.job_board(&li_ming, "")? {
        writeln!(
            out,
            "- {}: {} | {} applicants{}",
            entry.job.title,
            if entry.eligible { "eligible" } else { "score too low" },
            entry.applicant_count,
            if entry.full { " | full" } else { "" }
        )?;
    }

    writeln!(out, "\n3. Li Ming tries job B")?;
    tick();
    match ledger.apply(&li_ming, &job_b) {
        Ok(application) => {
            writeln!(out, "- accepted as {}; only the board flags the gap", application.id)?;
            ledger.set_application_status(&application.id, ApplicationStatus::Rejected)?;
            writeln!(out, "- admin rejects it so Li Ming can apply elsewhere")?;
        }
        Err(err) => writeln!(out, "- rejected: {err}")?,
    }

    writeln!(out, "\n4. Li Ming applies to job A")?;
    tick();
    let application = ledger.apply(&li_ming, &job_a)?;
    summarize(out, &ledger, &job_a, application.status)?;
    match ledger.apply(&li_ming, &job_b) {
        Ok(_) => writeln!(out, "- second application unexpectedly accepted")?,
        Err(err) => writeln!(out, "- applying to B as well: rejected: {err}")?,
    }

    writeln!(out, "\n5. Admin approves Li Ming for job A")?;
    let approved = ledger.set_application_status(&application.id, ApplicationStatus::Approved)?;
    summarize(out, &ledger, &job_a, approved.status)?;

    writeln!(out, "\n6. Wang Fang (score 8.0) applies to the full job A")?;
    tick();
    let wang_fang = register(&mut ledger, "Wang Fang", "13800138022", "8.0")?;
    tick();
    match ledger.apply(&wang_fang, &job_a) {
        Ok(late) => {
            writeln!(out, "- accepted as {}; capacity is advisory", late.id)?;
            let changed = ledger.batch_set_status(&job_a, ApplicationStatus::Approved)?;
            writeln!(out, "- batch approve changed {changed} application(s)")?;
            summarize(out, &ledger, &job_a, ApplicationStatus::Approved)?;
        }
        Err(err) => writeln!(out, "- rejected: {err}")?,
    }

    writeln!(out, "\n7. Li Ming leaves feedback on job A")?;
    tick();
    let feedback = ledger.submit_feedback(&li_ming, &job_a, "Work is great")?;
    writeln!(out, "- \"{}\" recorded", feedback.option)?;

    writeln!(out, "\n8. Admin overview")?;
    render_overview(out, &ledger.admin_job_overview(JobSort::Applicants)?)?;

    writeln!(out, "\n9. Admin deletes Wang Fang and job A")?;
    let removed = ledger.delete_user(&wang_fang)?;
    writeln!(
        out,
        "- Wang Fang: {} application(s), {} feedback removed",
        removed.applications_removed, removed.feedback_removed
    )?;
    let removed = ledger.delete_job(&job_a)?;
    writeln!(
        out,
        "- job A: {} application(s), {} feedback removed",
        removed.applications_removed, removed.feedback_removed
    )?;
    match ledger.active_application(&li_ming) {
        Some(active) => writeln!(out, "- Li Ming still holds {}", active.id)?,
        None => writeln!(out, "- Li Ming is free to apply again")?,
    }
    Ok(())
}

fn posting(title: &str, min_score: f64, capacity: u32) -> JobPosting {
    JobPosting {
        title: title.to_string(),
        company: Some("Wisconsin Dells Resort".to_string()),
        location: Some("Wisconsin Dells, WI".to_string()),
        min_score: Some(min_score),
        description: "Keep guests safe at the water park.".to_string(),
        capacity: Some(capacity),
        housing: "$100/week".to_string(),
        start_date_range: "Jun 10 - Jun 25".to_string(),
        program_year: Some("2024".to_string()),
        ..JobPosting::default()
    }
}

fn register(
    ledger: &mut PlacementLedger,
    name: &str,
    phone: &str,
    score: &str,
) -> Result<UserId, AppError> {
    let code = ledger.send_verification_code(phone)?.to_string();
    let user = ledger.register(Registration {
        name: name.to_string(),
        school: "上海交通大学".to_string(),
        phone: phone.to_string(),
        score: score.to_string(),
        program_year: "2024".to_string(),
        verification_code: code,
    })?;
    Ok(user.id)
}

fn summarize<W: Write>(
    out: &mut W,
    ledger: &PlacementLedger,
    job_id: &JobId,
    status: ApplicationStatus,
) -> Result<(), AppError> {
    let stats = ledger.job_stats(job_id)?;
    writeln!(
        out,
        "- status {status} | applicants {} | remaining capacity {}{}",
        stats.applicant_count,
        stats.remaining_capacity,
        if stats.overbooked { " (overbooked)" } else { "" }
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript(policy: LedgerPolicy) -> String {
        let mut out = Vec::new();
        run_scenario(&mut out, policy).expect("scenario runs");
        String::from_utf8(out).expect("utf8")
    }

    #[test]
    fn enforced_run_turns_away_second_applicant() {
        let text = transcript(LedgerPolicy::default());
        assert!(text.contains("- Water Park Lifeguard: eligible | 0 applicants"));
        assert!(text.contains("- Swim Instructor: score too low | 0 applicants"));
        assert!(text.contains("- status pending | applicants 1 | remaining capacity 1"));
        assert!(text.contains("- status approved | applicants 1 | remaining capacity 0"));
        assert!(text.contains("\"Water Park Lifeguard\" is at capacity"));
        assert!(text.contains("- Li Ming is free to apply again"));
    }

    #[test]
    fn permissive_run_shows_overbooking() {
        let text = transcript(LedgerPolicy::permissive());
        assert!(text.contains("only the board flags the gap"));
        assert!(text.contains("capacity is advisory"));
        assert!(text.contains("remaining capacity -1 (overbooked)"));
        assert!(text.contains("- Wang Fang: 1 application(s), 0 feedback removed"));
    }
}
