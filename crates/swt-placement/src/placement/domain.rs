use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

identifier!(
    /// Identifier wrapper for students and administrators.
    UserId
);
identifier!(
    /// Identifier wrapper for posted jobs.
    JobId
);
identifier!(
    /// Identifier wrapper for submitted applications.
    ApplicationId
);
identifier!(FeedbackId);
identifier!(GuideId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Admin,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Review state of an application. Pending and approved applications are "active".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    /// Active applications count toward the one-application-per-student rule.
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Pending | ApplicationStatus::Approved
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!(
                "unknown application status '{other}' (expected pending, approved or rejected)"
            )),
        }
    }
}

/// Extra contact a student keeps alongside family and manager details (friend, insurer, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomContact {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub role: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactField {
    Name,
    Phone,
    Role,
}

/// Emergency card kept on a student's profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyInfo {
    pub contact_name: String,
    pub contact_phone: String,
    pub manager_name: String,
    pub manager_phone: String,
    pub manager_email: String,
    #[serde(default)]
    pub others: Vec<CustomContact>,
}

impl EmergencyInfo {
    /// Appends a blank contact and returns its id.
    pub fn add_contact(&mut self) -> String {
        let next = self
            .others
            .iter()
            .filter_map(|contact| contact.id.strip_prefix("contact-"))
            .filter_map(|suffix| suffix.parse::<u32>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        let id = format!("contact-{next}");
        self.others.push(CustomContact {
            id: id.clone(),
            name: String::new(),
            phone: String::new(),
            role: String::new(),
        });
        id
    }

    pub fn update_contact(&mut self, id: &str, field: ContactField, value: &str) -> bool {
        let Some(contact) = self.others.iter_mut().find(|contact| contact.id == id) else {
            return false;
        };
        let slot = match field {
            ContactField::Name => &mut contact.name,
            ContactField::Phone => &mut contact.phone,
            ContactField::Role => &mut contact.role,
        };
        *slot = value.to_string();
        true
    }

    pub fn remove_contact(&mut self, id: &str) -> bool {
        let before = self.others.len();
        self.others.retain(|contact| contact.id != id);
        self.others.len() != before
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub role: Role,
    /// English proficiency proxy on a 0-10 scale.
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub avatar: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_info: Option<EmergencyInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_year: Option<String>,
}

impl User {
    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub title: String,
    /// Employer name.
    pub company: String,
    pub location: String,
    /// Hourly wage as displayed.
    pub salary: String,
    pub min_score: f64,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub image: String,
    /// Maximum number of concurrently approved students.
    pub capacity: u32,
    pub publish_date: DateTime<Utc>,
    pub housing: String,
    pub start_date_range: String,
    pub end_date: String,
    pub program_year: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: ApplicationId,
    pub job_id: JobId,
    pub student_id: UserId,
    pub status: ApplicationStatus,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: FeedbackId,
    pub student_id: UserId,
    pub job_id: JobId,
    pub option: String,
    pub timestamp: DateTime<Utc>,
}

/// Check-in labels offered to students with an approved placement.
pub const FEEDBACK_OPTIONS: [&str; 4] = ["Work is great", "Need Housing Help", "Job Issues", "Other"];

/// Admin-authored pre-departure content. `content` is markdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guide {
    pub id: GuideId,
    pub title: String,
    pub content: String,
    pub update_date: NaiveDate,
}

/// Raw registration form. `score` stays textual until the ledger parses it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub school: String,
    pub phone: String,
    pub score: String,
    pub program_year: String,
    pub verification_code: String,
}

/// Job posting form; unset optional fields fall back to posting defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobPosting {
    pub title: String,
    pub company: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub min_score: Option<f64>,
    pub description: String,
    pub tags: Vec<String>,
    pub image: Option<String>,
    pub capacity: Option<u32>,
    pub housing: String,
    pub start_date_range: String,
    pub end_date: Option<String>,
    pub program_year: Option<String>,
}

/// Self-service profile edits. The score is deliberately absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub school: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuideDraft {
    pub id: Option<GuideId>,
    pub title: String,
    pub content: String,
}
