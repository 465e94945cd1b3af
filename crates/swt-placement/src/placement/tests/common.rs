use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::placement::{
    ApplicationId, FixedClock, JobId, JobPosting, LedgerPolicy, PlacementLedger, Registration,
    UserId,
};

pub(super) fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn registration(name: &str, score: &str, program_year: &str) -> Registration {
    Registration {
        name: name.to_string(),
        school: "Fudan University".to_string(),
        phone: "13800138001".to_string(),
        score: score.to_string(),
        program_year: program_year.to_string(),
        verification_code: "1234".to_string(),
    }
}

pub(super) fn posting(title: &str, min_score: f64, capacity: u32) -> JobPosting {
    JobPosting {
        title: title.to_string(),
        location: Some("Ocean City, MD".to_string()),
        min_score: Some(min_score),
        description: "Boardwalk season work.".to_string(),
        capacity: Some(capacity),
        housing: "$90/week".to_string(),
        start_date_range: "Jun 01 - Jun 20".to_string(),
        program_year: Some("2024".to_string()),
        ..JobPosting::default()
    }
}

/// Two 2024 students (7.5 and 8.0) and two 2024 jobs: A (min 7, capacity 1) and B (min 9,
/// capacity 2).
pub(super) struct Fixture {
    pub ledger: PlacementLedger,
    pub clock: Arc<FixedClock>,
    pub li_ming: UserId,
    pub wang_fang: UserId,
    pub job_a: JobId,
    pub job_b: JobId,
}

impl Fixture {
    pub fn new(policy: LedgerPolicy) -> Self {
        let clock = Arc::new(FixedClock::new(start()));
        let mut ledger = PlacementLedger::with_clock(policy, clock.clone());
        let li_ming = ledger
            .register(registration("Li Ming", "7.5", "2024"))
            .expect("register Li Ming")
            .id;
        let wang_fang = ledger
            .register(registration("Wang Fang", "8.0", "2024"))
            .expect("register Wang Fang")
            .id;
        let job_a = ledger
            .post_job(posting("Lifeguard", 7.0, 1))
            .expect("post job A")
            .id;
        clock.advance(Duration::minutes(1));
        let job_b = ledger
            .post_job(posting("Front Desk Agent", 9.0, 2))
            .expect("post job B")
            .id;
        Self {
            ledger,
            clock,
            li_ming,
            wang_fang,
            job_a,
            job_b,
        }
    }

    pub fn enforced() -> Self {
        Self::new(LedgerPolicy::default())
    }

    pub fn permissive() -> Self {
        Self::new(LedgerPolicy::permissive())
    }

    /// Moves the clock forward so consecutive records get distinct timestamps.
    pub fn tick(&self) {
        self.clock.advance(Duration::minutes(5));
    }

    pub fn apply(&mut self, student: &UserId, job: &JobId) -> ApplicationId {
        self.tick();
        self.ledger
            .apply(student, job)
            .expect("application accepted")
            .id
    }
}
