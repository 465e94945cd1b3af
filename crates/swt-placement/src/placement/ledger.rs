use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::clock::{Clock, SystemClock};
use super::domain::{
    Application, ApplicationId, ApplicationStatus, Feedback, Guide, GuideId, Job, JobId,
    JobPosting, Registration, Role, User, UserId,
};
use super::error::LedgerError;
use super::policy::{CapacityPolicy, LedgerPolicy};
use super::stats::eligible;

const DEFAULT_COMPANY: &str = "SWT Partner Employer";
const DEFAULT_LOCATION: &str = "USA";
const DEFAULT_SALARY: &str = "$12/hr";
const DEFAULT_MIN_SCORE: f64 = 6.0;
const DEFAULT_TAG: &str = "Summer Job";
const DEFAULT_COVER_IMAGE: &str = "https://images.unsplash.com/photo-1526772662000-3f88f10405ff?ixlib=rb-1.2.1&auto=format&fit=crop&w=800&q=80";
const DEFAULT_CAPACITY: u32 = 5;
const DEFAULT_END_DATE: &str = "Sept 15";
const AVATAR_BASE_URL: &str = "https://api.dicebear.com/9.x/avataaars/svg?seed=";

/// Records dropped together with a deleted job or user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CascadeSummary {
    pub applications_removed: usize,
    pub feedback_removed: usize,
}

/// Single in-memory store for users, jobs, applications, feedback and guides.
///
/// Every mutation goes through a method on this type so the placement rules
/// (single active application, eligibility, capacity) are checked in one place.
/// Rejected operations leave the ledger untouched.
pub struct PlacementLedger {
    pub(super) policy: LedgerPolicy,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) users: BTreeMap<UserId, User>,
    pub(super) jobs: BTreeMap<JobId, Job>,
    /// Creation order.
    pub(super) applications: Vec<Application>,
    pub(super) feedback: Vec<Feedback>,
    pub(super) guides: BTreeMap<GuideId, Guide>,
    pub(super) current_user: Option<UserId>,
    sequence: u64,
}

impl fmt::Debug for PlacementLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlacementLedger")
            .field("policy", &self.policy)
            .field("users", &self.users.len())
            .field("jobs", &self.jobs.len())
            .field("applications", &self.applications.len())
            .field("feedback", &self.feedback.len())
            .field("guides", &self.guides.len())
            .finish_non_exhaustive()
    }
}

impl PlacementLedger {
    pub fn new(policy: LedgerPolicy) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    pub fn with_clock(policy: LedgerPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            clock,
            users: BTreeMap::new(),
            jobs: BTreeMap::new(),
            applications: Vec::new(),
            feedback: Vec::new(),
            guides: BTreeMap::new(),
            current_user: None,
            sequence: 0,
        }
    }

    pub fn policy(&self) -> &LedgerPolicy {
        &self.policy
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Models sending a verification SMS. Nothing is delivered; the fixed code is returned.
    pub fn send_verification_code(&self, phone: &str) -> Result<&str, LedgerError> {
        let phone = phone.trim();
        if phone.len() != 11 || !phone.chars().all(|c| c.is_ascii_digit()) {
            return Err(LedgerError::InvalidPhone);
        }
        info!(phone, "verification code issued");
        Ok(&self.policy.verification_code)
    }

    /// Creates a student account and makes it the current session.
    pub fn register(&mut self, registration: Registration) -> Result<User, LedgerError> {
        let name = required(&registration.name, "name")?;
        let school = required(&registration.school, "school")?;
        let raw_score = required(&registration.score, "score")?;
        let program_year = required(&registration.program_year, "program year")?;
        if registration.verification_code.trim() != self.policy.verification_code {
            return Err(LedgerError::InvalidVerificationCode);
        }
        let score = raw_score
            .parse::<f64>()
            .map_err(|_| LedgerError::InvalidScore(raw_score.clone()))?;
        let score = validate_score(score)?;

        let id = UserId(self.next_id("user", |ledger, id| {
            ledger.users.contains_key(&UserId::new(id))
        }));
        let user = User {
            id: id.clone(),
            avatar: format!("{AVATAR_BASE_URL}{name}"),
            name,
            role: Role::Student,
            score,
            school: Some(school),
            phone: optional(&registration.phone),
            emergency_info: None,
            program_year: Some(program_year),
        };

        self.users.insert(id.clone(), user.clone());
        self.current_user = Some(id.clone());
        info!(user_id = %id, program_year = ?user.program_year, "student registered");
        Ok(user)
    }

    /// Demo one-click login: the seeded admin, or the first student on record.
    pub fn login(&mut self, role: Role) -> Result<User, LedgerError> {
        let user = self
            .users
            .values()
            .find(|user| user.role == role)
            .cloned()
            .ok_or(LedgerError::NoSuchRole(role))?;
        self.current_user = Some(user.id.clone());
        info!(user_id = %user.id, %role, "demo login");
        Ok(user)
    }

    pub fn logout(&mut self) {
        self.current_user = None;
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current_user
            .as_ref()
            .and_then(|id| self.users.get(id))
    }

    pub fn user(&self, id: &UserId) -> Option<&User> {
        self.users.get(id)
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn students(&self) -> impl Iterator<Item = &User> {
        self.users.values().filter(|user| user.is_student())
    }

    /// Admin score correction. Out-of-range values leave the prior score in place.
    pub fn update_score(&mut self, user_id: &UserId, score: f64) -> Result<User, LedgerError> {
        let score = validate_score(score).inspect_err(|error| {
            warn!(user_id = %user_id, %error, "score update rejected");
        })?;
        let user = self
            .users
            .get_mut(user_id)
            .ok_or_else(|| LedgerError::UnknownUser(user_id.clone()))?;
        let previous = user.score;
        user.score = score;
        info!(user_id = %user_id, previous, score, "score updated");
        Ok(user.clone())
    }

    /// Removes a user together with every application and feedback entry referencing them.
    pub fn delete_user(&mut self, user_id: &UserId) -> Result<CascadeSummary, LedgerError> {
        if self.users.remove(user_id).is_none() {
            return Err(LedgerError::UnknownUser(user_id.clone()));
        }
        let summary = self.cascade(|application| &application.student_id == user_id, |entry| {
            &entry.student_id == user_id
        });
        if self.current_user.as_ref() == Some(user_id) {
            self.current_user = None;
        }
        info!(
            user_id = %user_id,
            applications_removed = summary.applications_removed,
            feedback_removed = summary.feedback_removed,
            "user deleted"
        );
        Ok(summary)
    }

    pub fn job(&self, id: &JobId) -> Option<&Job> {
        self.jobs.get(id)
    }

    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    pub fn post_job(&mut self, posting: JobPosting) -> Result<Job, LedgerError> {
        let title = required(&posting.title, "title")?;
        let description = required(&posting.description, "description")?;
        let housing = required(&posting.housing, "housing")?;
        let start_date_range = required(&posting.start_date_range, "start date range")?;

        let publish_date = self.now();
        let tags = {
            let tags: Vec<String> = posting
                .tags
                .iter()
                .filter_map(|tag| optional(tag))
                .collect();
            if tags.is_empty() {
                vec![DEFAULT_TAG.to_string()]
            } else {
                tags
            }
        };
        let id = JobId(self.next_id("job", |ledger, id| {
            ledger.jobs.contains_key(&JobId::new(id))
        }));

        let job = Job {
            id: id.clone(),
            title,
            company: or_default(posting.company, DEFAULT_COMPANY),
            location: or_default(posting.location, DEFAULT_LOCATION),
            salary: or_default(posting.salary, DEFAULT_SALARY),
            min_score: posting.min_score.unwrap_or(DEFAULT_MIN_SCORE),
            description,
            tags,
            image: or_default(posting.image, DEFAULT_COVER_IMAGE),
            capacity: posting.capacity.unwrap_or(DEFAULT_CAPACITY),
            publish_date,
            housing,
            start_date_range,
            end_date: or_default(posting.end_date, DEFAULT_END_DATE),
            program_year: posting
                .program_year
                .and_then(|year| optional(&year))
                .unwrap_or_else(|| publish_date.year().to_string()),
        };

        self.jobs.insert(id.clone(), job.clone());
        info!(job_id = %id, title = %job.title, capacity = job.capacity, "job posted");
        Ok(job)
    }

    /// Removes a job together with every application and feedback entry referencing it.
    pub fn delete_job(&mut self, job_id: &JobId) -> Result<CascadeSummary, LedgerError> {
        if self.jobs.remove(job_id).is_none() {
            return Err(LedgerError::UnknownJob(job_id.clone()));
        }
        let summary = self.cascade(|application| &application.job_id == job_id, |entry| {
            &entry.job_id == job_id
        });
        info!(
            job_id = %job_id,
            applications_removed = summary.applications_removed,
            feedback_removed = summary.feedback_removed,
            "job deleted"
        );
        Ok(summary)
    }

    pub fn application(&self, id: &ApplicationId) -> Option<&Application> {
        self.applications.iter().find(|application| &application.id == id)
    }

    pub fn applications(&self) -> &[Application] {
        &self.applications
    }

    /// Files a pending application for `student_id` on `job_id`.
    ///
    /// Checks, in order: the student holds no pending/approved application on any job;
    /// then, depending on policy, cohort and minimum score, and remaining capacity.
    pub fn apply(
        &mut self,
        student_id: &UserId,
        job_id: &JobId,
    ) -> Result<Application, LedgerError> {
        self.check_application(student_id, job_id)
            .inspect_err(|error| {
                warn!(student_id = %student_id, job_id = %job_id, %error, "application rejected");
            })?;

        let id = ApplicationId(self.next_id("app", |ledger, id| {
            ledger
                .applications
                .iter()
                .any(|application| application.id.as_str() == id)
        }));
        let application = Application {
            id,
            job_id: job_id.clone(),
            student_id: student_id.clone(),
            status: ApplicationStatus::Pending,
            timestamp: self.now(),
        };
        self.applications.push(application.clone());
        info!(
            application_id = %application.id,
            student_id = %student_id,
            job_id = %job_id,
            "application submitted"
        );
        Ok(application)
    }

    /// Reviewer decision on a pending application: approve or reject.
    pub fn set_application_status(
        &mut self,
        application_id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<Application, LedgerError> {
        let application = self.find_application(application_id)?;
        match (application.status, status) {
            (ApplicationStatus::Pending, ApplicationStatus::Approved)
            | (ApplicationStatus::Pending, ApplicationStatus::Rejected) => {}
            (from, to) => {
                warn!(application_id = %application_id, %from, %to, "transition rejected");
                return Err(LedgerError::InvalidTransition { from, to });
            }
        }
        if status == ApplicationStatus::Approved {
            self.ensure_capacity(&application.job_id, Some(application_id))?;
        }
        self.transition(application_id, status)
    }

    /// Admin correction: moves an application to any status, including back to pending.
    ///
    /// The single-active-application rule and the capacity policy still hold.
    pub fn override_application_status(
        &mut self,
        application_id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<Application, LedgerError> {
        let application = self.find_application(application_id)?;
        if application.status == status {
            return Ok(application.clone());
        }
        if status.is_active() && !application.status.is_active() {
            if let Some(active) = self.active_application(&application.student_id) {
                let job_title = self.job_title(&active.job_id);
                return Err(LedgerError::DuplicateActiveApplication {
                    application_id: active.id.clone(),
                    job_id: active.job_id.clone(),
                    job_title,
                });
            }
        }
        if status == ApplicationStatus::Approved {
            self.ensure_capacity(&application.job_id, Some(application_id))?;
        }
        self.transition(application_id, status)
    }

    /// Approves or rejects every pending application on a job, returning how many changed.
    ///
    /// Under an enforced capacity policy approvals go oldest first and stop once the job is
    /// full; the remaining applications stay pending.
    pub fn batch_set_status(
        &mut self,
        job_id: &JobId,
        status: ApplicationStatus,
    ) -> Result<usize, LedgerError> {
        if !matches!(
            status,
            ApplicationStatus::Approved | ApplicationStatus::Rejected
        ) {
            return Err(LedgerError::InvalidBatchStatus(status));
        }
        let approved = self.approved_count(job_id);
        let capacity = self
            .jobs
            .get(job_id)
            .map(|job| job.capacity)
            .ok_or_else(|| LedgerError::UnknownJob(job_id.clone()))?;

        let mut budget = match (status, self.policy.capacity) {
            (ApplicationStatus::Approved, CapacityPolicy::Enforced) => {
                Some((capacity as usize).saturating_sub(approved))
            }
            _ => None,
        };

        let mut pending: Vec<usize> = self
            .applications
            .iter()
            .enumerate()
            .filter(|(_, application)| {
                &application.job_id == job_id && application.status == ApplicationStatus::Pending
            })
            .map(|(index, _)| index)
            .collect();
        pending.sort_by_key(|&index| self.applications[index].timestamp);

        let mut changed = 0;
        let mut held_back = 0;
        for index in pending {
            if let Some(remaining) = budget.as_mut() {
                if *remaining == 0 {
                    held_back += 1;
                    continue;
                }
                *remaining -= 1;
            }
            self.applications[index].status = status;
            changed += 1;
        }

        info!(job_id = %job_id, %status, changed, held_back, "batch status update");
        if held_back > 0 {
            warn!(job_id = %job_id, held_back, capacity, "job filled during batch approval");
        }
        Ok(changed)
    }

    fn check_application(&self, student_id: &UserId, job_id: &JobId) -> Result<(), LedgerError> {
        let student = self
            .users
            .get(student_id)
            .ok_or_else(|| LedgerError::UnknownUser(student_id.clone()))?;
        if !student.is_student() {
            return Err(LedgerError::NotAStudent(student_id.clone()));
        }
        let job = self
            .jobs
            .get(job_id)
            .ok_or_else(|| LedgerError::UnknownJob(job_id.clone()))?;

        if let Some(active) = self.active_application(student_id) {
            return Err(LedgerError::DuplicateActiveApplication {
                application_id: active.id.clone(),
                job_id: active.job_id.clone(),
                job_title: self.job_title(&active.job_id),
            });
        }

        if self.policy.enforce_eligibility {
            if student.program_year.as_deref() != Some(job.program_year.as_str()) {
                return Err(LedgerError::ProgramYearMismatch {
                    student_year: student
                        .program_year
                        .clone()
                        .unwrap_or_else(|| "unassigned".to_string()),
                    job_year: job.program_year.clone(),
                });
            }
            if !eligible(student, job) {
                return Err(LedgerError::NotEligible {
                    job_title: job.title.clone(),
                    score: student.score,
                    min_score: job.min_score,
                });
            }
        }

        self.ensure_capacity(job_id, None)
    }

    /// Under an enforced policy, fails when approving one more application would overbook
    /// the job. `moving` is the application being approved, if it already counts.
    fn ensure_capacity(
        &self,
        job_id: &JobId,
        moving: Option<&ApplicationId>,
    ) -> Result<(), LedgerError> {
        if self.policy.capacity == CapacityPolicy::Soft {
            return Ok(());
        }
        let job = self
            .jobs
            .get(job_id)
            .ok_or_else(|| LedgerError::UnknownJob(job_id.clone()))?;
        let approved = self
            .applications
            .iter()
            .filter(|application| {
                &application.job_id == job_id
                    && application.status == ApplicationStatus::Approved
                    && Some(&application.id) != moving
            })
            .count();
        if approved >= job.capacity as usize {
            warn!(job_id = %job_id, capacity = job.capacity, "job at capacity");
            return Err(LedgerError::JobAtCapacity {
                job_id: job_id.clone(),
                job_title: job.title.clone(),
                capacity: job.capacity,
            });
        }
        Ok(())
    }

    fn find_application(&self, id: &ApplicationId) -> Result<&Application, LedgerError> {
        self.application(id)
            .ok_or_else(|| LedgerError::UnknownApplication(id.clone()))
    }

    fn transition(
        &mut self,
        id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<Application, LedgerError> {
        let application = self
            .applications
            .iter_mut()
            .find(|application| &application.id == id)
            .ok_or_else(|| LedgerError::UnknownApplication(id.clone()))?;
        let from = application.status;
        application.status = status;
        info!(application_id = %id, %from, to = %status, "application status changed");
        Ok(application.clone())
    }

    fn cascade(
        &mut self,
        drop_application: impl Fn(&Application) -> bool,
        drop_feedback: impl Fn(&Feedback) -> bool,
    ) -> CascadeSummary {
        let applications_before = self.applications.len();
        self.applications
            .retain(|application| !drop_application(application));
        let feedback_before = self.feedback.len();
        self.feedback.retain(|entry| !drop_feedback(entry));
        CascadeSummary {
            applications_removed: applications_before - self.applications.len(),
            feedback_removed: feedback_before - self.feedback.len(),
        }
    }

    pub(super) fn job_title(&self, job_id: &JobId) -> String {
        self.jobs
            .get(job_id)
            .map(|job| job.title.clone())
            .unwrap_or_else(|| "another job".to_string())
    }

    pub(super) fn next_id(&mut self, prefix: &str, taken: impl Fn(&Self, &str) -> bool) -> String {
        loop {
            self.sequence += 1;
            let candidate = format!("{prefix}-{:06}", self.sequence);
            if !taken(self, &candidate) {
                return candidate;
            }
        }
    }
}

pub(super) fn required(value: &str, field: &'static str) -> Result<String, LedgerError> {
    optional(value).ok_or(LedgerError::MissingField(field))
}

pub(super) fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn or_default(value: Option<String>, fallback: &str) -> String {
    value
        .and_then(|value| optional(&value))
        .unwrap_or_else(|| fallback.to_string())
}

pub(super) fn validate_score(score: f64) -> Result<f64, LedgerError> {
    if score.is_finite() && (0.0..=10.0).contains(&score) {
        Ok(score)
    } else {
        Err(LedgerError::InvalidScoreRange(score))
    }
}
