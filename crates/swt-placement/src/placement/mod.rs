//! In-memory placement ledger: users, jobs, applications, feedback and guides, with the
//! single-active-application, eligibility and capacity rules enforced at one choke point.

pub mod clock;
pub mod domain;
pub mod error;
pub mod export;
mod ledger;
pub mod policy;
mod records;
pub mod seed;
pub mod snapshot;
pub mod stats;

#[cfg(test)]
mod tests;

pub use clock::{Clock, FixedClock, SystemClock};
pub use domain::{
    Application, ApplicationId, ApplicationStatus, ContactField, CustomContact, EmergencyInfo,
    Feedback, FeedbackId, Guide, GuideDraft, GuideId, Job, JobId, JobPosting, ProfileUpdate,
    Registration, Role, User, UserId, FEEDBACK_OPTIONS,
};
pub use error::LedgerError;
pub use export::{export_file_name, export_job_csv, ExportError, EXPORT_HEADER};
pub use ledger::{CascadeSummary, PlacementLedger};
pub use policy::{CapacityPolicy, LedgerPolicy, DEFAULT_VERIFICATION_CODE};
pub use snapshot::{LedgerSnapshot, SnapshotError};
pub use stats::{
    eligible, JobBoardEntry, JobOverviewEntry, JobSort, JobStats, ScoreRange,
    StudentDirectoryEntry,
};
