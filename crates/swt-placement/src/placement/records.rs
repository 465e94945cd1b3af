use tracing::info;

use super::domain::{
    EmergencyInfo, Feedback, FeedbackId, Guide, GuideDraft, GuideId, JobId, ProfileUpdate, User,
    UserId,
};
use super::error::LedgerError;
use super::ledger::{optional, required, PlacementLedger};

impl PlacementLedger {
    /// Self-service profile edit. Blank fields in the update are ignored.
    pub fn update_profile(
        &mut self,
        user_id: &UserId,
        update: ProfileUpdate,
    ) -> Result<User, LedgerError> {
        let user = self
            .users
            .get_mut(user_id)
            .ok_or_else(|| LedgerError::UnknownUser(user_id.clone()))?;

        if let Some(name) = update.name.as_deref().and_then(optional) {
            user.name = name;
        }
        if let Some(school) = update.school.as_deref().and_then(optional) {
            user.school = Some(school);
        }
        if let Some(phone) = update.phone.as_deref().and_then(optional) {
            user.phone = Some(phone);
        }
        if let Some(avatar) = update.avatar.as_deref().and_then(optional) {
            user.avatar = avatar;
        }
        info!(user_id = %user_id, "profile updated");
        Ok(user.clone())
    }

    pub fn update_emergency_info(
        &mut self,
        user_id: &UserId,
        info: EmergencyInfo,
    ) -> Result<User, LedgerError> {
        let user = self
            .users
            .get_mut(user_id)
            .ok_or_else(|| LedgerError::UnknownUser(user_id.clone()))?;
        let contacts = info.others.len();
        user.emergency_info = Some(info);
        info!(user_id = %user_id, extra_contacts = contacts, "emergency info saved");
        Ok(user.clone())
    }

    /// Weekly check-in from a student. The ledger does not require an approved placement.
    pub fn submit_feedback(
        &mut self,
        student_id: &UserId,
        job_id: &JobId,
        option: &str,
    ) -> Result<Feedback, LedgerError> {
        let student = self
            .users
            .get(student_id)
            .ok_or_else(|| LedgerError::UnknownUser(student_id.clone()))?;
        if !student.is_student() {
            return Err(LedgerError::NotAStudent(student_id.clone()));
        }
        if !self.jobs.contains_key(job_id) {
            return Err(LedgerError::UnknownJob(job_id.clone()));
        }
        let option = required(option, "feedback option")?;

        let id = FeedbackId(self.next_id("fb", |ledger, id| {
            ledger.feedback.iter().any(|entry| entry.id.as_str() == id)
        }));
        let entry = Feedback {
            id,
            student_id: student_id.clone(),
            job_id: job_id.clone(),
            option,
            timestamp: self.now(),
        };
        self.feedback.push(entry.clone());
        info!(feedback_id = %entry.id, job_id = %job_id, option = %entry.option, "feedback submitted");
        Ok(entry)
    }

    /// Feedback left on a job, newest first.
    pub fn feedback_for_job(&self, job_id: &JobId) -> Vec<&Feedback> {
        let mut entries: Vec<&Feedback> = self
            .feedback
            .iter()
            .rev()
            .filter(|entry| &entry.job_id == job_id)
            .collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries
    }

    pub fn guides(&self) -> impl Iterator<Item = &Guide> {
        self.guides.values()
    }

    pub fn guide(&self, id: &GuideId) -> Option<&Guide> {
        self.guides.get(id)
    }

    /// Creates a guide, or replaces the one named by `draft.id`. Stamps today's date.
    pub fn save_guide(&mut self, draft: GuideDraft) -> Result<Guide, LedgerError> {
        let title = required(&draft.title, "title")?;
        let content = required(&draft.content, "content")?;
        let id = match draft.id {
            Some(id) if self.guides.contains_key(&id) => id,
            Some(id) => return Err(LedgerError::UnknownGuide(id)),
            None => GuideId(self.next_id("guide", |ledger, id| {
                ledger.guides.contains_key(&GuideId::new(id))
            })),
        };

        let guide = Guide {
            id: id.clone(),
            title,
            content,
            update_date: self.now().date_naive(),
        };
        self.guides.insert(id.clone(), guide.clone());
        info!(guide_id = %id, "guide saved");
        Ok(guide)
    }

    pub fn delete_guide(&mut self, id: &GuideId) -> Result<Guide, LedgerError> {
        let guide = self
            .guides
            .remove(id)
            .ok_or_else(|| LedgerError::UnknownGuide(id.clone()))?;
        info!(guide_id = %id, "guide deleted");
        Ok(guide)
    }
}
