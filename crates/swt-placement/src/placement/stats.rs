//! Read-only views recomputed from ledger state on every call.

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::Serialize;
use tracing::warn;

use super::domain::{Application, ApplicationStatus, Job, JobId, User, UserId};
use super::error::LedgerError;
use super::ledger::PlacementLedger;

/// A student may apply when their score meets the job's threshold.
pub fn eligible(student: &User, job: &Job) -> bool {
    student.score >= job.min_score
}

/// Lowest and highest score among a job's applicants; `0/0` when nobody applied.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ScoreRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStats {
    pub job_id: JobId,
    pub applicant_count: usize,
    pub pending_count: usize,
    pub approved_count: usize,
    pub rejected_count: usize,
    pub score_range: ScoreRange,
    /// `capacity - approved`; negative only when a soft capacity policy let a job overbook.
    pub remaining_capacity: i64,
    pub overbooked: bool,
    pub feedback_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobSort {
    Applicants,
    Score,
    #[default]
    Date,
}

impl FromStr for JobSort {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "applicants" => Ok(Self::Applicants),
            "score" => Ok(Self::Score),
            "date" => Ok(Self::Date),
            other => Err(format!(
                "unknown sort '{other}' (expected applicants, score or date)"
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobOverviewEntry {
    pub job: Job,
    pub stats: JobStats,
}

/// A job as offered to one student.
#[derive(Debug, Clone, Serialize)]
pub struct JobBoardEntry {
    pub job: Job,
    pub eligible: bool,
    pub applicant_count: usize,
    pub full: bool,
    /// Another job holds the student's active application.
    pub locked: bool,
    pub own_status: Option<ApplicationStatus>,
}

impl JobBoardEntry {
    /// Whether the UI should offer the apply action.
    pub fn can_apply(&self) -> bool {
        self.eligible
            && !self.full
            && !self.locked
            && !self.own_status.is_some_and(ApplicationStatus::is_active)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentDirectoryEntry {
    pub student: User,
    pub active_application: Option<Application>,
    pub active_job_title: Option<String>,
}

impl PlacementLedger {
    /// Applications on the job in any status.
    pub fn applicant_count(&self, job_id: &JobId) -> Result<usize, LedgerError> {
        self.require_job(job_id)?;
        Ok(self.count_with(job_id, |_| true))
    }

    pub fn approved_count(&self, job_id: &JobId) -> usize {
        self.count_with(job_id, |status| status == ApplicationStatus::Approved)
    }

    pub fn score_range(&self, job_id: &JobId) -> Result<ScoreRange, LedgerError> {
        self.require_job(job_id)?;
        let applicants: BTreeSet<&UserId> = self
            .applications
            .iter()
            .filter(|application| &application.job_id == job_id)
            .map(|application| &application.student_id)
            .collect();

        let range = applicants
            .into_iter()
            .filter_map(|id| self.users.get(id))
            .map(|student| student.score)
            .fold(None, |range: Option<ScoreRange>, score| {
                Some(match range {
                    None => ScoreRange {
                        min: score,
                        max: score,
                    },
                    Some(range) => ScoreRange {
                        min: range.min.min(score),
                        max: range.max.max(score),
                    },
                })
            });
        Ok(range.unwrap_or_default())
    }

    pub fn remaining_capacity(&self, job_id: &JobId) -> Result<i64, LedgerError> {
        let job = self.require_job(job_id)?;
        let remaining = i64::from(job.capacity) - self.approved_count(job_id) as i64;
        if remaining < 0 {
            warn!(job_id = %job_id, remaining, "job is overbooked");
        }
        Ok(remaining)
    }

    /// The student's single pending or approved application, if any.
    pub fn active_application(&self, student_id: &UserId) -> Option<&Application> {
        self.applications.iter().find(|application| {
            &application.student_id == student_id && application.status.is_active()
        })
    }

    pub fn is_eligible(&self, student_id: &UserId, job_id: &JobId) -> Result<bool, LedgerError> {
        let student = self
            .users
            .get(student_id)
            .ok_or_else(|| LedgerError::UnknownUser(student_id.clone()))?;
        let job = self.require_job(job_id)?;
        Ok(eligible(student, job))
    }

    pub fn job_stats(&self, job_id: &JobId) -> Result<JobStats, LedgerError> {
        let remaining_capacity = self.remaining_capacity(job_id)?;
        Ok(JobStats {
            job_id: job_id.clone(),
            applicant_count: self.count_with(job_id, |_| true),
            pending_count: self.count_with(job_id, |status| status == ApplicationStatus::Pending),
            approved_count: self.approved_count(job_id),
            rejected_count: self
                .count_with(job_id, |status| status == ApplicationStatus::Rejected),
            score_range: self.score_range(job_id)?,
            remaining_capacity,
            overbooked: remaining_capacity < 0,
            feedback_count: self
                .feedback
                .iter()
                .filter(|entry| &entry.job_id == job_id)
                .count(),
        })
    }

    /// Admin home: every job with its statistics.
    pub fn admin_job_overview(&self, sort: JobSort) -> Result<Vec<JobOverviewEntry>, LedgerError> {
        let mut entries = self
            .jobs
            .values()
            .map(|job| {
                Ok(JobOverviewEntry {
                    job: job.clone(),
                    stats: self.job_stats(&job.id)?,
                })
            })
            .collect::<Result<Vec<_>, LedgerError>>()?;

        match sort {
            JobSort::Applicants => entries.sort_by(|a, b| {
                b.stats
                    .applicant_count
                    .cmp(&a.stats.applicant_count)
                    .then_with(|| a.job.id.cmp(&b.job.id))
            }),
            JobSort::Score => entries.sort_by(|a, b| {
                b.job
                    .min_score
                    .total_cmp(&a.job.min_score)
                    .then_with(|| a.job.id.cmp(&b.job.id))
            }),
            JobSort::Date => entries.sort_by(|a, b| {
                b.job
                    .publish_date
                    .cmp(&a.job.publish_date)
                    .then_with(|| a.job.id.cmp(&b.job.id))
            }),
        }
        Ok(entries)
    }

    /// Student job board: jobs of the student's cohort matching `query` on title or location,
    /// newest first.
    pub fn job_board(
        &self,
        student_id: &UserId,
        query: &str,
    ) -> Result<Vec<JobBoardEntry>, LedgerError> {
        let student = self
            .users
            .get(student_id)
            .ok_or_else(|| LedgerError::UnknownUser(student_id.clone()))?;
        let needle = query.trim().to_lowercase();
        let active = self.active_application(student_id);

        let mut jobs: Vec<&Job> = self
            .jobs
            .values()
            .filter(|job| student.program_year.as_deref() == Some(job.program_year.as_str()))
            .filter(|job| {
                needle.is_empty()
                    || job.title.to_lowercase().contains(&needle)
                    || job.location.to_lowercase().contains(&needle)
            })
            .collect();
        jobs.sort_by(|a, b| b.publish_date.cmp(&a.publish_date));

        Ok(jobs
            .into_iter()
            .map(|job| {
                let own_status = self
                    .applications
                    .iter()
                    .rev()
                    .find(|application| {
                        &application.student_id == student_id && application.job_id == job.id
                    })
                    .map(|application| application.status);
                JobBoardEntry {
                    eligible: eligible(student, job),
                    applicant_count: self.count_with(&job.id, |_| true),
                    full: self.approved_count(&job.id) >= job.capacity as usize,
                    locked: active.is_some_and(|application| application.job_id != job.id),
                    own_status,
                    job: job.clone(),
                }
            })
            .collect())
    }

    /// Students whose name or school matches `query`, with their active application.
    pub fn student_directory(&self, query: &str) -> Vec<StudentDirectoryEntry> {
        let needle = query.trim().to_lowercase();
        self.students()
            .filter(|student| {
                needle.is_empty()
                    || student.name.to_lowercase().contains(&needle)
                    || student
                        .school
                        .as_deref()
                        .is_some_and(|school| school.to_lowercase().contains(&needle))
            })
            .map(|student| {
                let active_application = self.active_application(&student.id).cloned();
                let active_job_title = active_application
                    .as_ref()
                    .map(|application| self.job_title(&application.job_id));
                StudentDirectoryEntry {
                    student: student.clone(),
                    active_application,
                    active_job_title,
                }
            })
            .collect()
    }

    /// Applications on a job, newest first.
    pub fn applications_for_job(&self, job_id: &JobId) -> Vec<&Application> {
        let mut applications: Vec<&Application> = self
            .applications
            .iter()
            .rev()
            .filter(|application| &application.job_id == job_id)
            .collect();
        applications.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        applications
    }

    /// A student's application history, newest first.
    pub fn applications_for_student(&self, student_id: &UserId) -> Vec<&Application> {
        let mut applications: Vec<&Application> = self
            .applications
            .iter()
            .rev()
            .filter(|application| &application.student_id == student_id)
            .collect();
        applications.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        applications
    }

    fn require_job(&self, job_id: &JobId) -> Result<&Job, LedgerError> {
        self.jobs
            .get(job_id)
            .ok_or_else(|| LedgerError::UnknownJob(job_id.clone()))
    }

    fn count_with(&self, job_id: &JobId, matches: impl Fn(ApplicationStatus) -> bool) -> usize {
        self.applications
            .iter()
            .filter(|application| &application.job_id == job_id && matches(application.status))
            .count()
    }
}
