use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Write};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::clock::Clock;
use super::domain::{
    Application, ApplicationStatus, Feedback, Guide, Job, JobId, Role, User, UserId,
};
use super::ledger::PlacementLedger;
use super::policy::{CapacityPolicy, LedgerPolicy};

/// JSON fixture form of the whole ledger. Field names follow the web client's store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub jobs: Vec<Job>,
    #[serde(default)]
    pub applications: Vec<Application>,
    #[serde(default, rename = "feedbacks")]
    pub feedback: Vec<Feedback>,
    #[serde(default)]
    pub guides: Vec<Guide>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_user: Option<UserId>,
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("invalid snapshot JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("{record} references missing {missing}")]
    DanglingReference { record: String, missing: String },
    #[error("student {0} holds more than one pending or approved application")]
    MultipleActiveApplications(UserId),
    #[error("duplicate id {0}")]
    DuplicateId(String),
    #[error("user {user} has score {score}, outside 0-10")]
    InvalidScore { user: UserId, score: f64 },
    #[error("{record} belongs to {user}, who is not a student")]
    NotAStudent { record: String, user: UserId },
    #[error("job {job} has {approved} approved applications for {capacity} places")]
    Overbooked {
        job: JobId,
        approved: usize,
        capacity: u32,
    },
}

impl LedgerSnapshot {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), SnapshotError> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

impl PlacementLedger {
    /// Builds a ledger from a fixture, refusing one the ledger itself could never have
    /// produced: dangling references, scores outside 0-10, admin-owned applications or
    /// feedback, two active applications per student, and overbooked jobs when capacity
    /// is enforced.
    pub fn from_snapshot(
        snapshot: LedgerSnapshot,
        policy: LedgerPolicy,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SnapshotError> {
        let users = index(snapshot.users, |user| user.id.clone(), |id| id.to_string())?;
        let jobs = index(snapshot.jobs, |job| job.id.clone(), |id| id.to_string())?;
        let guides = index(snapshot.guides, |guide| guide.id.clone(), |id| id.to_string())?;
        if let Some(user) = users
            .values()
            .find(|user| !(user.score.is_finite() && (0.0..=10.0).contains(&user.score)))
        {
            return Err(SnapshotError::InvalidScore {
                user: user.id.clone(),
                score: user.score,
            });
        }

        let mut seen = BTreeSet::new();
        let mut active = BTreeSet::new();
        let mut approved: BTreeMap<&JobId, usize> = BTreeMap::new();
        for application in &snapshot.applications {
            if !seen.insert(application.id.clone()) {
                return Err(SnapshotError::DuplicateId(application.id.to_string()));
            }
            let record = format!("application {}", application.id);
            student(&users, &record, &application.student_id)?;
            if !jobs.contains_key(&application.job_id) {
                return Err(dangling(&record, "job", &application.job_id));
            }
            if application.status == ApplicationStatus::Approved {
                *approved.entry(&application.job_id).or_default() += 1;
            }
            if application.status.is_active() && !active.insert(&application.student_id) {
                return Err(SnapshotError::MultipleActiveApplications(
                    application.student_id.clone(),
                ));
            }
        }

        let mut seen = BTreeSet::new();
        for entry in &snapshot.feedback {
            if !seen.insert(entry.id.clone()) {
                return Err(SnapshotError::DuplicateId(entry.id.to_string()));
            }
            let record = format!("feedback {}", entry.id);
            student(&users, &record, &entry.student_id)?;
            if !jobs.contains_key(&entry.job_id) {
                return Err(dangling(&record, "job", &entry.job_id));
            }
        }

        if policy.capacity == CapacityPolicy::Enforced {
            for (job_id, count) in approved {
                let capacity = jobs[job_id].capacity;
                if count > capacity as usize {
                    return Err(SnapshotError::Overbooked {
                        job: job_id.clone(),
                        approved: count,
                        capacity,
                    });
                }
            }
        }

        if let Some(current) = &snapshot.current_user {
            if !users.contains_key(current) {
                return Err(dangling("session", "user", current));
            }
        }

        let mut ledger = PlacementLedger::with_clock(policy, clock);
        ledger.users = users;
        ledger.jobs = jobs;
        ledger.applications = snapshot.applications;
        ledger.feedback = snapshot.feedback;
        ledger.guides = guides;
        ledger.current_user = snapshot.current_user;
        info!(
            users = ledger.users.len(),
            jobs = ledger.jobs.len(),
            applications = ledger.applications.len(),
            "ledger loaded from snapshot"
        );
        Ok(ledger)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            users: self.users.values().cloned().collect(),
            jobs: self.jobs.values().cloned().collect(),
            applications: self.applications.clone(),
            feedback: self.feedback.clone(),
            guides: self.guides.values().cloned().collect(),
            current_user: self.current_user.clone(),
        }
    }
}

fn index<K: Ord, V>(
    records: Vec<V>,
    key: impl Fn(&V) -> K,
    label: impl Fn(&K) -> String,
) -> Result<BTreeMap<K, V>, SnapshotError> {
    let mut map = BTreeMap::new();
    for record in records {
        let id = key(&record);
        if map.contains_key(&id) {
            return Err(SnapshotError::DuplicateId(label(&id)));
        }
        map.insert(id, record);
    }
    Ok(map)
}

fn student(
    users: &BTreeMap<UserId, User>,
    record: &str,
    id: &UserId,
) -> Result<(), SnapshotError> {
    match users.get(id) {
        None => Err(dangling(record, "user", id)),
        Some(user) if user.role != Role::Student => Err(SnapshotError::NotAStudent {
            record: record.to_string(),
            user: id.clone(),
        }),
        Some(_) => Ok(()),
    }
}

fn dangling(record: &str, kind: &str, id: &impl std::fmt::Display) -> SnapshotError {
    SnapshotError::DanglingReference {
        record: record.to_string(),
        missing: format!("{kind} {id}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::SystemClock;

    fn load(raw: &str) -> Result<PlacementLedger, SnapshotError> {
        load_with(raw, LedgerPolicy::default())
    }

    fn load_with(raw: &str, policy: LedgerPolicy) -> Result<PlacementLedger, SnapshotError> {
        let snapshot = LedgerSnapshot::from_reader(raw.as_bytes())?;
        PlacementLedger::from_snapshot(snapshot, policy, Arc::new(SystemClock))
    }

    const JOB: &str = r#"{"id":"j1","title":"Lifeguard","company":"Resort","location":"WI",
        "salary":"$16","minScore":7,"description":"d","capacity":1,
        "publishDate":"2024-03-01T00:00:00Z","housing":"$100/week",
        "startDateRange":"Jun 10 - Jun 25","endDate":"Sept 15","programYear":"2024"}"#;
    const STUDENT: &str = r#"{"id":"u2","name":"Li Ming","role":"student","score":7.5,"programYear":"2024"}"#;
    const SECOND_STUDENT: &str = r#"{"id":"u3","name":"Wang Fang","role":"student","score":8,"programYear":"2024"}"#;
    const ADMIN: &str = r#"{"id":"u1","name":"Admin","role":"admin","score":0}"#;

    #[test]
    fn rejects_application_for_missing_job() {
        let raw = format!(
            r#"{{"users":[{STUDENT}],"applications":[{{"id":"a1","jobId":"gone","studentId":"u2",
            "status":"pending","timestamp":"2024-03-02T00:00:00Z"}}]}}"#
        );
        let err = load(&raw).expect_err("dangling job");
        assert!(matches!(
            err,
            SnapshotError::DanglingReference { ref missing, .. } if missing == "job gone"
        ));
    }

    #[test]
    fn rejects_two_active_applications_for_one_student() {
        let raw = format!(
            r#"{{"users":[{STUDENT}],"jobs":[{JOB}],"applications":[
            {{"id":"a1","jobId":"j1","studentId":"u2","status":"approved","timestamp":"2024-03-02T00:00:00Z"}},
            {{"id":"a2","jobId":"j1","studentId":"u2","status":"pending","timestamp":"2024-03-03T00:00:00Z"}}]}}"#
        );
        let err = load(&raw).expect_err("two active applications");
        assert!(matches!(err, SnapshotError::MultipleActiveApplications(id) if id.as_str() == "u2"));
    }

    #[test]
    fn accepts_rejected_history_and_reads_feedbacks_key() {
        let raw = format!(
            r#"{{"users":[{STUDENT}],"jobs":[{JOB}],"applications":[
            {{"id":"a1","jobId":"j1","studentId":"u2","status":"rejected","timestamp":"2024-03-02T00:00:00Z"}},
            {{"id":"a2","jobId":"j1","studentId":"u2","status":"approved","timestamp":"2024-03-03T00:00:00Z"}}],
            "feedbacks":[{{"id":"f1","studentId":"u2","jobId":"j1","option":"Work is great",
            "timestamp":"2024-04-01T00:00:00Z"}}]}}"#
        );
        let ledger = load(&raw).expect("valid snapshot");
        assert_eq!(ledger.applications().len(), 2);
        assert_eq!(ledger.feedback_for_job(&crate::placement::JobId::new("j1")).len(), 1);

        let mut buffer = Vec::new();
        ledger.snapshot().to_writer(&mut buffer).expect("serializes");
        let text = String::from_utf8(buffer).expect("utf8");
        assert!(text.contains("\"feedbacks\""));
    }

    #[test]
    fn rejects_duplicate_user_ids() {
        let raw = format!(r#"{{"users":[{STUDENT},{STUDENT}]}}"#);
        let err = load(&raw).expect_err("duplicate id");
        assert!(matches!(err, SnapshotError::DuplicateId(id) if id == "u2"));
    }

    #[test]
    fn overbooked_job_is_refused_only_when_capacity_is_enforced() {
        let raw = format!(
            r#"{{"users":[{STUDENT},{SECOND_STUDENT}],"jobs":[{JOB}],"applications":[
            {{"id":"a1","jobId":"j1","studentId":"u2","status":"approved","timestamp":"2024-03-02T00:00:00Z"}},
            {{"id":"a2","jobId":"j1","studentId":"u3","status":"approved","timestamp":"2024-03-03T00:00:00Z"}}]}}"#
        );
        let err = load(&raw).expect_err("two approvals for one place");
        assert!(matches!(
            err,
            SnapshotError::Overbooked { ref job, approved: 2, capacity: 1 } if job.as_str() == "j1"
        ));

        let ledger = load_with(&raw, LedgerPolicy::permissive()).expect("soft capacity loads");
        let job = crate::placement::JobId::new("j1");
        assert_eq!(ledger.remaining_capacity(&job), Ok(-1));
    }

    #[test]
    fn rejects_score_outside_range() {
        let raw = r#"{"users":[{"id":"u2","name":"Li Ming","role":"student","score":42}]}"#;
        let err = load(raw).expect_err("score out of range");
        assert!(matches!(
            err,
            SnapshotError::InvalidScore { ref user, score } if user.as_str() == "u2" && score == 42.0
        ));
    }

    #[test]
    fn rejects_applications_and_feedback_owned_by_admin() {
        let raw = format!(
            r#"{{"users":[{ADMIN}],"jobs":[{JOB}],"applications":[
            {{"id":"a1","jobId":"j1","studentId":"u1","status":"pending","timestamp":"2024-03-02T00:00:00Z"}}]}}"#
        );
        let err = load(&raw).expect_err("admin application");
        assert!(matches!(
            err,
            SnapshotError::NotAStudent { ref record, ref user } if record == "application a1" && user.as_str() == "u1"
        ));

        let raw = format!(
            r#"{{"users":[{ADMIN}],"jobs":[{JOB}],"feedbacks":[{{"id":"f1","studentId":"u1","jobId":"j1",
            "option":"Work is great","timestamp":"2024-04-01T00:00:00Z"}}]}}"#
        );
        let err = load(&raw).expect_err("admin feedback");
        assert!(matches!(err, SnapshotError::NotAStudent { ref record, .. } if record == "feedback f1"));
    }
}
