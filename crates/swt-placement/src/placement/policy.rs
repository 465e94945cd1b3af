use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const DEFAULT_VERIFICATION_CODE: &str = "1234";

/// How job capacity is treated when applications are created or approved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapacityPolicy {
    /// Capacity is a hard limit on approved applications, checked on apply and on approval.
    #[default]
    Enforced,
    /// Capacity is advisory; approvals may overbook a job.
    Soft,
}

impl CapacityPolicy {
    pub const fn label(self) -> &'static str {
        match self {
            CapacityPolicy::Enforced => "enforced",
            CapacityPolicy::Soft => "soft",
        }
    }
}

impl fmt::Display for CapacityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CapacityPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "enforced" | "hard" | "strict" => Ok(Self::Enforced),
            "soft" | "advisory" => Ok(Self::Soft),
            other => Err(format!(
                "unknown capacity policy '{other}' (expected enforced or soft)"
            )),
        }
    }
}

/// Rule dials for the placement ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerPolicy {
    pub capacity: CapacityPolicy,
    /// Reject applications from students below the job's minimum score or outside its cohort.
    pub enforce_eligibility: bool,
    /// Fixed code accepted at registration; codes are never delivered.
    pub verification_code: String,
}

impl LedgerPolicy {
    /// Reference behavior: only the single-active-application rule is checked on write.
    pub fn permissive() -> Self {
        Self {
            capacity: CapacityPolicy::Soft,
            enforce_eligibility: false,
            verification_code: DEFAULT_VERIFICATION_CODE.to_string(),
        }
    }
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            capacity: CapacityPolicy::Enforced,
            enforce_eligibility: true,
            verification_code: DEFAULT_VERIFICATION_CODE.to_string(),
        }
    }
}
