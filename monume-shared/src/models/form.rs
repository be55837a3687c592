/// Dynamic forms and their responses
///
/// A form is a title, an optional description and an ordered list of
/// questions stored as JSONB. Responses are free-form `question_id -> answer`
/// objects; answer keys are not checked against the form's question ids.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE forms (
///     id BIGSERIAL PRIMARY KEY,
///     title TEXT NOT NULL,
///     description TEXT,
///     questions JSONB NOT NULL DEFAULT '[]'::jsonb,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE form_responses (
///     id BIGSERIAL PRIMARY KEY,
///     form_id BIGINT NOT NULL REFERENCES forms(id) ON DELETE CASCADE,
///     responses JSONB NOT NULL DEFAULT '{}'::jsonb,
///     submitted_by TEXT NOT NULL DEFAULT 'anonymous',
///     submitted_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::PgPool;

/// Submitter recorded when a response names nobody
pub const ANONYMOUS_SUBMITTER: &str = "anonymous";

/// Error type for question-list validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("Form title must not be empty")]
    EmptyTitle,

    #[error("Question {index} has an empty id")]
    EmptyQuestionId { index: usize },

    #[error("Duplicate question id: {0}")]
    DuplicateQuestionId(String),

    #[error("Question {0} has an empty title")]
    EmptyQuestionTitle(String),

    #[error("Question {0} needs at least one option")]
    MissingOptions(String),
}

/// Question input type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    LinearScale,
    LongText,
    MultipleChoice,
    Checkbox,
}

impl QuestionType {
    /// Choice questions must carry options
    pub fn requires_options(&self) -> bool {
        matches!(self, QuestionType::MultipleChoice | QuestionType::Checkbox)
    }
}

/// A single form question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,

    pub title: String,

    #[serde(rename = "type")]
    pub kind: QuestionType,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// Checks a question list before it is stored
///
/// Ids must be non-empty and unique, titles non-empty, and choice
/// questions need at least one non-blank option.
pub fn validate_questions(questions: &[Question]) -> Result<(), FormError> {
    let mut seen = HashSet::new();

    for (index, question) in questions.iter().enumerate() {
        let id = question.id.trim();
        if id.is_empty() {
            return Err(FormError::EmptyQuestionId { index });
        }
        if !seen.insert(id) {
            return Err(FormError::DuplicateQuestionId(id.to_string()));
        }
        if question.title.trim().is_empty() {
            return Err(FormError::EmptyQuestionTitle(id.to_string()));
        }
        if question.kind.requires_options()
            && !question.options.iter().any(|o| !o.trim().is_empty())
        {
            return Err(FormError::MissingOptions(id.to_string()));
        }
    }

    Ok(())
}

/// A stored form
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Form {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub questions: Json<Vec<Question>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateForm {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl CreateForm {
    pub fn validate(&self) -> Result<(), FormError> {
        if self.title.trim().is_empty() {
            return Err(FormError::EmptyTitle);
        }
        validate_questions(&self.questions)
    }
}

/// Partial update for a form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub questions: Option<Vec<Question>>,
}

impl UpdateForm {
    pub fn validate(&self) -> Result<(), FormError> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(FormError::EmptyTitle);
            }
        }
        match &self.questions {
            Some(questions) => validate_questions(questions),
            None => Ok(()),
        }
    }
}

/// Raw stored response
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FormResponse {
    pub id: i64,
    pub form_id: i64,
    pub responses: Json<Value>,
    pub submitted_by: String,
    pub submitted_at: DateTime<Utc>,
}

/// A response decoded for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormResponseView {
    pub id: i64,
    pub form_id: i64,
    pub submitted_by: String,
    pub submitted_at: DateTime<Utc>,
    pub answers: Map<String, Value>,
}

impl From<FormResponse> for FormResponseView {
    fn from(row: FormResponse) -> Self {
        let answers = match row.responses.0 {
            Value::Object(map) => map,
            other => {
                tracing::warn!(
                    response_id = row.id,
                    form_id = row.form_id,
                    kind = json_kind(&other),
                    "Stored form response is not an object; showing no answers"
                );
                Map::new()
            }
        };

        Self {
            id: row.id,
            form_id: row.form_id,
            submitted_by: row.submitted_by,
            submitted_at: row.submitted_at,
            answers,
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

const FORM_COLUMNS: &str = "id, title, description, questions, created_at, updated_at";

impl Form {
    pub async fn create(pool: &PgPool, data: CreateForm) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO forms (title, description, questions) VALUES ($1, $2, $3) RETURNING {}",
            FORM_COLUMNS
        );

        let form = sqlx::query_as::<_, Form>(&query)
            .bind(data.title)
            .bind(data.description)
            .bind(Json(data.questions))
            .fetch_one(pool)
            .await?;

        Ok(form)
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM forms WHERE id = $1", FORM_COLUMNS);

        let form = sqlx::query_as::<_, Form>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(form)
    }

    /// Lists forms, newest first
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM forms ORDER BY created_at DESC, id DESC",
            FORM_COLUMNS
        );

        let forms = sqlx::query_as::<_, Form>(&query).fetch_all(pool).await?;

        Ok(forms)
    }

    /// Applies a partial update and bumps `updated_at`
    pub async fn update(
        pool: &PgPool,
        id: i64,
        data: UpdateForm,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE forms
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                questions = COALESCE($4, questions),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            FORM_COLUMNS
        );

        let form = sqlx::query_as::<_, Form>(&query)
            .bind(id)
            .bind(data.title)
            .bind(data.description)
            .bind(data.questions.map(Json))
            .fetch_optional(pool)
            .await?;

        Ok(form)
    }

    /// Deletes a form; its responses cascade
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM forms WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM forms")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}

impl FormResponse {
    /// Stores a submission as given
    ///
    /// A blank or missing submitter is recorded as `anonymous`.
    pub async fn submit(
        pool: &PgPool,
        form_id: i64,
        answers: Value,
        submitted_by: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        let submitted_by = submitted_by
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(ANONYMOUS_SUBMITTER);

        let response = sqlx::query_as::<_, FormResponse>(
            r#"
            INSERT INTO form_responses (form_id, responses, submitted_by)
            VALUES ($1, $2, $3)
            RETURNING id, form_id, responses, submitted_by, submitted_at
            "#,
        )
        .bind(form_id)
        .bind(Json(answers))
        .bind(submitted_by)
        .fetch_one(pool)
        .await?;

        Ok(response)
    }

    /// Lists responses for a form, newest first
    pub async fn list_for_form(pool: &PgPool, form_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let responses = sqlx::query_as::<_, FormResponse>(
            r#"
            SELECT id, form_id, responses, submitted_by, submitted_at
            FROM form_responses
            WHERE form_id = $1
            ORDER BY submitted_at DESC, id DESC
            "#,
        )
        .bind(form_id)
        .fetch_all(pool)
        .await?;

        Ok(responses)
    }
}
