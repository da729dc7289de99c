pub mod auth;
pub mod dto;
pub mod query;

use std::env;

use async_trait::async_trait;
use reqwest::header::CONTENT_RANGE;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::{DeserializeOwned, IgnoredAny};
use tracing::{debug, error};

use crate::error::AppError;
use crate::models::{NewTask, Project, Task, TaskPatch, TaskRow, normalize_task, normalize_tasks};
use crate::session::SessionManager;
use crate::store::{Filter, TaskQuery, TaskStore};

pub use auth::SupabaseAuth;
use query::{PROJECT_SELECT, TASK_SELECT, parse_content_range, task_params};

const TASKS: &str = "tasks";
const PROJECTS: &str = "projects";

#[derive(Clone, Debug)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
}

impl SupabaseConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let url = env::var("SUPABASE_URL")
            .map_err(|_| AppError::Config("SUPABASE_URL is not set".to_string()))?;
        let anon_key = env::var("SUPABASE_ANON_KEY")
            .map_err(|_| AppError::Config("SUPABASE_ANON_KEY is not set".to_string()))?;

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        Url::parse(&format!("{}/{}", self.url, path))
            .map_err(|e| AppError::Config(format!("Invalid SUPABASE_URL: {}", e)))
    }

    pub fn rest_url(&self, table: &str) -> Result<Url, AppError> {
        self.endpoint(&format!("rest/v1/{}", table))
    }

    pub fn auth_url(&self, path: &str) -> Result<Url, AppError> {
        self.endpoint(&format!("auth/v1/{}", path))
    }
}

pub(crate) fn build_client() -> Result<Client, AppError> {
    Client::builder()
        .build()
        .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))
}

/// Data access over PostgREST.
///
/// Rows come back in the raw persisted shape and are normalized here, so
/// nothing past this type sees a [`TaskRow`].
pub struct SupabaseStore {
    client: Client,
    config: SupabaseConfig,
    sessions: SessionManager,
}

impl SupabaseStore {
    pub fn new(config: SupabaseConfig, sessions: SessionManager) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client()?,
            config,
            sessions,
        })
    }

    fn request(
        &self,
        method: Method,
        table: &str,
        params: &[(&str, String)],
    ) -> Result<RequestBuilder, AppError> {
        let mut url = self.config.rest_url(table)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }
        let token = self
            .sessions
            .access_token()
            .unwrap_or_else(|| self.config.anon_key.clone());

        Ok(self
            .client
            .request(method, url)
            .header("apikey", &self.config.anon_key)
            .header("Authorization", format!("Bearer {}", token)))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, AppError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<dto::PostgrestError>(&body)
            .map(|e| e.describe())
            .unwrap_or_else(|_| format!("PostgREST error {}: {}", status, body));
        error!("PostgREST request failed: {}", message);
        Err(AppError::Remote(message))
    }

    async fn rows<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<Vec<T>, AppError> {
        let response = self.send(builder).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn count(&self, table: &str, params: &[(&str, String)]) -> Result<usize, AppError> {
        let builder = self
            .request(Method::HEAD, table, params)?
            .header("Prefer", "count=exact");
        let response = self.send(builder).await?;
        let range = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Remote("Missing Content-Range header".to_string()))?;
        parse_content_range(range)
    }

    fn with_select(params: Vec<(&'static str, String)>, select: &str) -> Vec<(&'static str, String)> {
        let mut all = vec![("select", select.to_string())];
        all.extend(params);
        all
    }

    fn by_id(id: &str, select: &str) -> Vec<(&'static str, String)> {
        Self::with_select(vec![("id", format!("eq.{}", id))], select)
    }
}

#[async_trait]
impl TaskStore for SupabaseStore {
    async fn select_tasks(&self, query: &TaskQuery) -> Result<Vec<Task>, AppError> {
        let params = Self::with_select(task_params(query), TASK_SELECT);
        let rows: Vec<TaskRow> = self.rows(self.request(Method::GET, TASKS, &params)?).await?;
        debug!("selected {} task rows", rows.len());
        Ok(normalize_tasks(rows))
    }

    async fn count_tasks(&self, query: &TaskQuery) -> Result<usize, AppError> {
        let params = Self::with_select(task_params(query), "id");
        self.count(TASKS, &params).await
    }

    async fn fetch_task(&self, id: &str) -> Result<Option<Task>, AppError> {
        let query = TaskQuery::new().filter(Filter::Id(id.to_string())).limit(1);
        Ok(self.select_tasks(&query).await?.into_iter().next())
    }

    async fn insert_task(&self, task: &NewTask) -> Result<Task, AppError> {
        let params = Self::with_select(Vec::new(), TASK_SELECT);
        let builder = self
            .request(Method::POST, TASKS, &params)?
            .header("Prefer", "return=representation")
            .json(task);
        let rows: Vec<TaskRow> = self.rows(builder).await?;
        rows.into_iter()
            .next()
            .map(normalize_task)
            .ok_or_else(|| AppError::Remote("Insert returned no row".to_string()))
    }

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Option<Task>, AppError> {
        let builder = self
            .request(Method::PATCH, TASKS, &Self::by_id(id, TASK_SELECT))?
            .header("Prefer", "return=representation")
            .json(patch);
        let rows: Vec<TaskRow> = self.rows(builder).await?;
        Ok(rows.into_iter().next().map(normalize_task))
    }

    async fn delete_task(&self, id: &str) -> Result<bool, AppError> {
        let builder = self
            .request(Method::DELETE, TASKS, &Self::by_id(id, "id"))?
            .header("Prefer", "return=representation");
        let rows: Vec<IgnoredAny> = self.rows(builder).await?;
        Ok(!rows.is_empty())
    }

    async fn list_projects(&self) -> Result<Vec<Project>, AppError> {
        let params = Self::with_select(vec![("order", "name.asc".to_string())], PROJECT_SELECT);
        self.rows(self.request(Method::GET, PROJECTS, &params)?).await
    }

    async fn count_projects(&self) -> Result<usize, AppError> {
        self.count(PROJECTS, &[("select", "id".to_string())]).await
    }

    async fn insert_project(&self, name: &str, color: Option<&str>) -> Result<Project, AppError> {
        let params = Self::with_select(Vec::new(), PROJECT_SELECT);
        let builder = self
            .request(Method::POST, PROJECTS, &params)?
            .header("Prefer", "return=representation")
            .json(&dto::ProjectInsert { name, color });
        let rows: Vec<Project> = self.rows(builder).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::Remote("Insert returned no row".to_string()))
    }

    async fn rename_project(&self, id: &str, name: &str) -> Result<Option<Project>, AppError> {
        let builder = self
            .request(Method::PATCH, PROJECTS, &Self::by_id(id, PROJECT_SELECT))?
            .header("Prefer", "return=representation")
            .json(&dto::ProjectRename { name });
        let rows: Vec<Project> = self.rows(builder).await?;
        Ok(rows.into_iter().next())
    }

    async fn delete_project(&self, id: &str) -> Result<bool, AppError> {
        let builder = self
            .request(Method::DELETE, PROJECTS, &Self::by_id(id, "id"))?
            .header("Prefer", "return=representation");
        let rows: Vec<IgnoredAny> = self.rows(builder).await?;
        Ok(!rows.is_empty())
    }

    async fn detach_project(&self, project_id: &str) -> Result<usize, AppError> {
        let params = Self::with_select(
            vec![("project_id", format!("eq.{}", project_id))],
            "id",
        );
        let builder = self
            .request(Method::PATCH, TASKS, &params)?
            .header("Prefer", "return=representation")
            .json(&dto::DetachProject { project_id: None });
        let rows: Vec<IgnoredAny> = self.rows(builder).await?;
        Ok(rows.len())
    }
}
