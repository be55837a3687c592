/// Bootstrap data for a fresh database
///
/// Runs at every startup but only writes into empty tables: the admin
/// account and default locations go in when there are no users, the sample
/// forms when there are no forms.

use serde_json::json;
use sqlx::PgPool;
use tracing::info;

use crate::auth::password::{hash_password, PasswordError};
use crate::models::form::{CreateForm, Form, Question};
use crate::models::location::{CreateLocation, Location};
use crate::models::user::{CreateUser, User, UserRole};

/// Username of the bootstrap admin
pub const BOOTSTRAP_ADMIN_USERNAME: &str = "admin";

/// Stores created with the bootstrap admin
pub const DEFAULT_LOCATIONS: &[(&str, &str)] = &[
    ("Main Office", "Headquarters"),
    ("Downtown", "City Mall"),
    ("Eastside", "East Shopping Center"),
];

/// Error type for seeding
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Failed to hash bootstrap passcode: {0}")]
    Password(#[from] PasswordError),

    #[error("Sample form data is invalid: {0}")]
    SampleForm(#[from] serde_json::Error),
}

/// What a seeding run wrote
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub admin_created: bool,
    pub locations_created: usize,
    pub forms_created: usize,
}

/// Seeds the admin account, default locations and sample forms
///
/// `admin_passcode` is hashed before it is stored.
pub async fn seed_defaults(pool: &PgPool, admin_passcode: &str) -> Result<SeedReport, SeedError> {
    let mut report = SeedReport::default();

    if User::count(pool).await? == 0 {
        User::create(
            pool,
            CreateUser {
                username: BOOTSTRAP_ADMIN_USERNAME.to_string(),
                password_hash: hash_password(admin_passcode)?,
                email: Some("admin@monumetracker.com".to_string()),
                name: Some("Administrator".to_string()),
                role: UserRole::Admin,
                location: Some(DEFAULT_LOCATIONS[0].0.to_string()),
            },
        )
        .await?;
        report.admin_created = true;

        if Location::count(pool).await? == 0 {
            for (name, mall) in DEFAULT_LOCATIONS {
                Location::create(
                    pool,
                    CreateLocation {
                        location_name: name.to_string(),
                        mall: Some(mall.to_string()),
                    },
                )
                .await?;
                report.locations_created += 1;
            }
        }
    }

    if Form::count(pool).await? == 0 {
        for form in sample_forms()? {
            Form::create(pool, form).await?;
            report.forms_created += 1;
        }
    }

    info!(
        admin_created = report.admin_created,
        locations_created = report.locations_created,
        forms_created = report.forms_created,
        "Bootstrap data checked"
    );

    Ok(report)
}

/// The four forms shown on a fresh install
pub fn sample_forms() -> Result<Vec<CreateForm>, serde_json::Error> {
    let forms = [
        (
            "Team Feedback Form",
            "Please share your feedback to help us improve our team processes.",
            json!([
                {"id": "q1", "title": "How would you rate team communication?", "type": "linear-scale"},
                {"id": "q2", "title": "What aspects of our team process work well?", "type": "long-text"},
                {"id": "q3", "title": "What could be improved?", "type": "long-text"}
            ]),
        ),
        (
            "Project Evaluation",
            "Evaluate the outcomes and processes of our recent project.",
            json!([
                {"id": "q1", "title": "How would you rate the project outcome?", "type": "linear-scale"},
                {"id": "q2", "title": "Were project timelines met?", "type": "multiple-choice",
                 "options": ["Yes", "Partially", "No"]},
                {"id": "q3", "title": "What were the key challenges?", "type": "long-text"}
            ]),
        ),
        (
            "Client Satisfaction Survey",
            "Help us improve our services by providing your feedback.",
            json!([
                {"id": "q1", "title": "How satisfied are you with our services?", "type": "linear-scale"},
                {"id": "q2", "title": "Would you recommend our services to others?", "type": "multiple-choice",
                 "options": ["Definitely", "Probably", "Not sure", "Probably not", "Definitely not"]},
                {"id": "q3", "title": "What additional services would you like us to offer?", "type": "long-text"}
            ]),
        ),
        (
            "Event Registration",
            "Register for our upcoming team building event.",
            json!([
                {"id": "q1", "title": "Will you be attending the event?", "type": "multiple-choice",
                 "options": ["Yes", "No", "Maybe"]},
                {"id": "q2", "title": "Any dietary restrictions we should know about?", "type": "checkbox",
                 "options": ["Vegetarian", "Vegan", "Gluten-free", "Nut allergies", "None"]},
                {"id": "q3", "title": "Any additional comments?", "type": "long-text"}
            ]),
        ),
    ];

    forms
        .into_iter()
        .map(|(title, description, questions)| {
            let questions: Vec<Question> = serde_json::from_value(questions)?;
            Ok(CreateForm {
                title: title.to_string(),
                description: Some(description.to_string()),
                questions,
            })
        })
        .collect()
}
