use std::env;

use reqwest::{Client, StatusCode};
use url::Url;

use quiz_core::model::{CourseId, QuizDefinition, QuizPayload};
use storage::repository::{QuizSource, StorageError};

use crate::error::CatalogError;

/// Connection settings for the remote course API.
///
/// Carried explicitly by whatever needs it; there is no process-wide token
/// holder, and dropping the catalog drops the credentials with it.
#[derive(Clone, Debug)]
pub struct CatalogConfig {
    pub base_url: Url,
    pub api_token: String,
}

impl CatalogConfig {
    /// Reads `LMS_API_URL` and `LMS_API_TOKEN` from the environment.
    ///
    /// Returns `None` when either is missing or unusable, in which case the
    /// app runs against local storage only.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("LMS_API_URL").ok()?;
        let base_url = Url::parse(base_url.trim()).ok()?;
        let api_token = env::var("LMS_API_TOKEN").ok()?;
        if api_token.trim().is_empty() {
            return None;
        }
        Some(Self {
            base_url,
            api_token,
        })
    }
}

/// Course-data provider backed by the remote LMS API.
#[derive(Clone)]
pub struct ApiCourseCatalog {
    client: Client,
    config: CatalogConfig,
}

impl ApiCourseCatalog {
    #[must_use]
    pub fn new(config: CatalogConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Fetch and validate the quiz for a course.
    ///
    /// A 404 means the course has no quiz and maps to `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` for transport failures, unexpected statuses,
    /// or a payload that fails definition validation.
    pub async fn fetch_quiz(
        &self,
        course_id: CourseId,
    ) -> Result<Option<QuizDefinition>, CatalogError> {
        let url = self
            .config
            .base_url
            .join(&format!("courses/{}/quiz", course_id.value()))?;

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.config.api_token)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(CatalogError::HttpStatus(response.status()));
        }

        let payload: QuizPayload = response.json().await?;
        Ok(Some(payload.into_definition()?))
    }
}

#[async_trait::async_trait]
impl QuizSource for ApiCourseCatalog {
    async fn get_quiz(&self, course_id: CourseId) -> Result<Option<QuizDefinition>, StorageError> {
        self.fetch_quiz(course_id).await.map_err(|err| match err {
            CatalogError::Definition(e) => StorageError::Serialization(e.to_string()),
            other => StorageError::Connection(other.to_string()),
        })
    }
}
