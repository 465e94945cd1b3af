use super::domain::{ApplicationId, ApplicationStatus, GuideId, JobId, Role, UserId};

/// User-facing rejection raised by a ledger operation. Nothing is mutated when one is returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("phone number must contain exactly 11 digits")]
    InvalidPhone,
    #[error("verification code does not match")]
    InvalidVerificationCode,
    #[error("score '{0}' is not a number")]
    InvalidScore(String),
    #[error("score {0} is outside the allowed range 0-10")]
    InvalidScoreRange(f64),
    #[error(
        "already holding an active application for \"{job_title}\"; only one job may be applied for at a time"
    )]
    DuplicateActiveApplication {
        application_id: ApplicationId,
        job_id: JobId,
        job_title: String,
    },
    #[error("score {score} is below the minimum {min_score} required for \"{job_title}\"")]
    NotEligible {
        job_title: String,
        score: f64,
        min_score: f64,
    },
    #[error("program year {student_year} does not match job program year {job_year}")]
    ProgramYearMismatch {
        student_year: String,
        job_year: String,
    },
    #[error("\"{job_title}\" is at capacity ({capacity} approved)")]
    JobAtCapacity {
        job_id: JobId,
        job_title: String,
        capacity: u32,
    },
    #[error("cannot move application from {from} to {to}")]
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    #[error("batch updates accept approved or rejected, not {0}")]
    InvalidBatchStatus(ApplicationStatus),
    #[error("user {0} is not a student")]
    NotAStudent(UserId),
    #[error("no {0} account available for demo login")]
    NoSuchRole(Role),
    #[error("unknown user {0}")]
    UnknownUser(UserId),
    #[error("unknown job {0}")]
    UnknownJob(JobId),
    #[error("unknown application {0}")]
    UnknownApplication(ApplicationId),
    #[error("unknown guide {0}")]
    UnknownGuide(GuideId),
}
