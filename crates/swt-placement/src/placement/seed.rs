//! Demo records a fresh install starts with: three jobs, one admin, one student, three guides.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use super::clock::Clock;
use super::domain::{EmergencyInfo, Guide, GuideId, Job, JobId, Role, User, UserId};
use super::ledger::PlacementLedger;
use super::policy::LedgerPolicy;

const UNSPLASH_PARAMS: &str = "?ixlib=rb-1.2.1&auto=format&fit=crop&w=800&q=80";

/// A ledger holding the demo records and no applications.
pub fn demo_ledger(policy: LedgerPolicy, clock: Arc<dyn Clock>) -> PlacementLedger {
    let mut ledger = PlacementLedger::with_clock(policy, clock);
    for user in demo_users() {
        ledger.users.insert(user.id.clone(), user);
    }
    for job in demo_jobs() {
        ledger.jobs.insert(job.id.clone(), job);
    }
    for guide in demo_guides() {
        ledger.guides.insert(guide.id.clone(), guide);
    }
    ledger
}

fn demo_users() -> Vec<User> {
    vec![
        User {
            id: UserId::new("u1"),
            name: "Admin".to_string(),
            role: Role::Admin,
            score: 10.0,
            school: None,
            phone: None,
            avatar: avatar("Admin"),
            emergency_info: None,
            program_year: None,
        },
        User {
            id: UserId::new("u2"),
            name: "李明".to_string(),
            role: Role::Student,
            score: 7.5,
            school: Some("上海交通大学".to_string()),
            phone: Some("13800138000".to_string()),
            avatar: avatar("LiMing"),
            emergency_info: Some(EmergencyInfo {
                contact_name: "李父".to_string(),
                contact_phone: "13900000000".to_string(),
                manager_name: "John Doe".to_string(),
                manager_phone: "+1 555-0199".to_string(),
                manager_email: "john@example.com".to_string(),
                others: Vec::new(),
            }),
            program_year: Some("2024".to_string()),
        },
    ]
}

fn demo_jobs() -> Vec<Job> {
    vec![
        Job {
            id: JobId::new("j1"),
            title: "Resort Lifeguard (度假村救生员)".to_string(),
            company: "Wisconsin Dells Resort".to_string(),
            location: "Wisconsin Dells, WI".to_string(),
            salary: "$16.00/hr".to_string(),
            min_score: 7.0,
            description: "Provide safety and hospitality to guests at our water park. \
                Certification training provided. Housing available nearby."
                .to_string(),
            tags: tags(&["Lifeguard", "Theme Park"]),
            image: unsplash("photo-1575263629043-f93335501dc6"),
            capacity: 10,
            publish_date: utc(2023, 11, 1, 10),
            housing: "$100/week".to_string(),
            start_date_range: "Jun 10 - Jun 25".to_string(),
            end_date: "Sept 15".to_string(),
            program_year: "2024".to_string(),
        },
        Job {
            id: JobId::new("j2"),
            title: "Line Cook (西餐厅帮厨)".to_string(),
            company: "Ocean View Restaurant".to_string(),
            location: "Myrtle Beach, SC".to_string(),
            salary: "$18.50/hr".to_string(),
            min_score: 6.0,
            description: "Assist in preparing delicious seafood dishes. \
                Great team environment right on the beach."
                .to_string(),
            tags: tags(&["Restaurant", "Cooking"]),
            image: unsplash("photo-1559339352-11d035aa65de"),
            capacity: 5,
            publish_date: utc(2023, 11, 5, 14),
            housing: "Provided (Free)".to_string(),
            start_date_range: "May 20 - Jun 10".to_string(),
            end_date: "Sept 15".to_string(),
            program_year: "2024".to_string(),
        },
        Job {
            id: JobId::new("j3"),
            title: "Housekeeping (客房服务)".to_string(),
            company: "Grand Teton Lodge".to_string(),
            location: "Jackson Hole, WY".to_string(),
            salary: "$15.00/hr + Tips".to_string(),
            min_score: 8.0,
            description: "Work in one of the most beautiful national parks. \
                Employee housing and meal plan included. **This is a 2025 Program Job.**"
                .to_string(),
            tags: tags(&["Hospitality", "National Park"]),
            image: unsplash("photo-1582719478250-c89cae4dc85b"),
            capacity: 20,
            publish_date: utc(2023, 10, 25, 9),
            housing: "$75/week".to_string(),
            start_date_range: "Jun 01 - Jun 15".to_string(),
            end_date: "Sept 15".to_string(),
            program_year: "2025".to_string(),
        },
    ]
}

fn demo_guides() -> Vec<Guide> {
    vec![
        Guide {
            id: GuideId::new("g1"),
            title: "Visa Interview Tips".to_string(),
            content: "### J-1 Visa Interview Guide\n\n\
                1. **Be Confident**: Speak clearly and confidently.\n\
                2. **Know Your Job**: Be ready to explain what you will be doing.\n\
                3. **Intent to Return**: Clearly state your plan to return to China after the program."
                .to_string(),
            update_date: date(2023, 10, 1),
        },
        Guide {
            id: GuideId::new("g2"),
            title: "Packing List".to_string(),
            content: "### Essential Packing List\n\n\
                - Passport & DS-2019\n\
                - Power Adapter (US Type)\n\
                - Personal Medicine\n\
                - Comfortable Shoes for work\n\
                - Warm jacket (even for summer nights)"
                .to_string(),
            update_date: date(2023, 10, 5),
        },
        Guide {
            id: GuideId::new("g3"),
            title: "Insurance Overview".to_string(),
            content: "### Medical Insurance\n\n\
                Your program includes basic medical insurance. \n\n\
                **Deductible**: $100 per visit.\n\
                **Coverage**: Emergency situations.\n\n\
                *Note: Dental and vision are usually not covered.*"
                .to_string(),
            update_date: date(2023, 9, 20),
        },
    ]
}

fn avatar(seed: &str) -> String {
    format!("https://api.dicebear.com/9.x/avataaars/svg?seed={seed}")
}

fn unsplash(photo: &str) -> String {
    format!("https://images.unsplash.com/{photo}{UNSPLASH_PARAMS}")
}

fn tags(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn utc(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
        .single()
        .unwrap_or_default()
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}
