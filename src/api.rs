//! HTTP client for the task-scheduler API.

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::session::Credential;
use crate::task::{TaskDraft, TaskId, TaskRecord};
use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    #[serde(default)]
    pub user_id: Option<u64>,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<u64>,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl From<&AuthResponse> for UserProfile {
    fn from(auth: &AuthResponse) -> Self {
        Self {
            id: auth.user_id,
            name: auth.name.clone(),
            email: auth.email.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<()> {
        if self.password != self.confirm_password {
            return Err(Error::Validation("Passwords do not match".into()));
        }
        Ok(())
    }
}

/// The remote operations the app relies on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse>;
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse>;
    async fn user_info(&self, credential: &Credential) -> Result<UserProfile>;
    async fn list_all(&self, credential: &Credential) -> Result<Vec<TaskRecord>>;
    async fn add(&self, credential: &Credential, draft: &TaskDraft) -> Result<TaskRecord>;
    async fn edit(&self, credential: &Credential, id: TaskId, draft: &TaskDraft) -> Result<TaskRecord>;
    /// The server flips `done`; the client only names the task.
    async fn toggle(&self, credential: &Credential, id: TaskId) -> Result<TaskRecord>;
    async fn delete(&self, credential: &Credential, id: TaskId) -> Result<()>;
}

pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    /// Every request is bounded by `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(settings.api_base.clone(), settings.request_timeout())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send_raw(&self, request: RequestBuilder) -> Result<String> {
        let res = request.send().await?;
        let status = res.status();
        let text = res.text().await?;
        debug!(%status, bytes = text.len(), "response");
        if !status.is_success() {
            return Err(Error::from_response(status, text));
        }
        Ok(text)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let text = self.send_raw(request).await?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Any rejection on an auth endpoint means the user is not signed in.
fn as_auth_failure(err: Error) -> Error {
    match err {
        Error::Remote { message, .. } | Error::NotFound(message) => Error::Auth(message),
        other => other,
    }
}

#[async_trait]
impl TaskApi for ApiClient {
    #[instrument(level = "debug", skip(self, password))]
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let request = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&LoginRequest { email, password });
        self.send(request).await.map_err(as_auth_failure)
    }

    #[instrument(level = "debug", skip_all, fields(email = %request.email))]
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse> {
        let request = self
            .client
            .post(self.url("/api/auth/register"))
            .json(request);
        self.send(request).await.map_err(as_auth_failure)
    }

    #[instrument(level = "debug", skip_all)]
    async fn user_info(&self, credential: &Credential) -> Result<UserProfile> {
        let request = self
            .client
            .post(self.url("/api/auth/user-info"))
            .bearer_auth(credential.token());
        let profile: UserProfile = self.send(request).await.map_err(as_auth_failure)?;
        if profile.name.trim().is_empty() {
            return Err(Error::Auth("Invalid user data".into()));
        }
        Ok(profile)
    }

    #[instrument(level = "debug", skip_all)]
    async fn list_all(&self, credential: &Credential) -> Result<Vec<TaskRecord>> {
        let request = self
            .client
            .get(self.url("/api/tasks/all"))
            .bearer_auth(credential.token());
        self.send(request).await
    }

    #[instrument(level = "debug", skip_all)]
    async fn add(&self, credential: &Credential, draft: &TaskDraft) -> Result<TaskRecord> {
        draft.validate()?;
        let request = self
            .client
            .post(self.url("/api/tasks/add"))
            .bearer_auth(credential.token())
            .json(draft);
        self.send(request).await
    }

    #[instrument(level = "debug", skip(self, credential, draft))]
    async fn edit(&self, credential: &Credential, id: TaskId, draft: &TaskDraft) -> Result<TaskRecord> {
        draft.validate()?;
        let request = self
            .client
            .put(self.url(&format!("/api/tasks/edit/{id}")))
            .bearer_auth(credential.token())
            .json(draft);
        self.send(request).await
    }

    #[instrument(level = "debug", skip(self, credential))]
    async fn toggle(&self, credential: &Credential, id: TaskId) -> Result<TaskRecord> {
        let request = self
            .client
            .put(self.url(&format!("/api/tasks/toggle/{id}")))
            .bearer_auth(credential.token());
        self.send(request).await
    }

    #[instrument(level = "debug", skip(self, credential))]
    async fn delete(&self, credential: &Credential, id: TaskId) -> Result<()> {
        let request = self
            .client
            .delete(self.url(&format!("/api/tasks/delete/{id}")))
            .bearer_auth(credential.token());
        self.send_raw(request).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::fixtures::{at, record};
    use crate::task::Priority;
    use mockito::Matcher;
    use reqwest::StatusCode;

    const TASKS_JSON: &str = r#"[
        {"id": 1, "description": "Ship release", "category": "Work", "priority": "High",
         "startTime": "2025-03-10T09:00:00", "endTime": "2025-03-10T10:00:00", "done": false, "notes": null},
        {"id": 2, "description": "Groceries", "category": "Personal", "priority": "Low",
         "startTime": "2025-03-10T17:00:00", "endTime": "2025-03-10T18:00:00", "done": true, "notes": "milk"}
    ]"#;

    fn client(server: &mockito::Server) -> ApiClient {
        ApiClient::new(server.url(), Duration::from_secs(5)).unwrap()
    }

    fn token() -> Credential {
        Credential::new("tok")
    }

    #[tokio::test]
    async fn unanswered_request_times_out() {
        // accepted by the kernel backlog but never read or answered
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let client = ApiClient::new(base, Duration::from_millis(200)).unwrap();

        let err = client.list_all(&token()).await.unwrap_err();

        assert!(matches!(err, Error::Timeout), "unexpected error: {err:?}");
        drop(listener);
    }

    #[tokio::test]
    async fn list_all_sends_bearer_and_parses_records() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/tasks/all")
            .match_header("authorization", "Bearer tok")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(TASKS_JSON)
            .create_async()
            .await;

        let tasks = client(&server).list_all(&token()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].priority, Priority::High);
        assert_eq!(tasks[1].notes(), Some("milk"));
    }

    #[tokio::test]
    async fn add_posts_the_draft() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/tasks/add")
            .match_header("authorization", "Bearer tok")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "description": "Task 9",
                "category": "Work",
                "priority": "Medium",
                "startTime": "2025-03-10T09:00:00",
                "endTime": "2025-03-10T10:00:00"
            })))
            .with_status(201)
            .with_body(
                r#"{"id": 9, "description": "Task 9", "category": "Work", "priority": "Medium",
                    "startTime": "2025-03-10T09:00:00", "endTime": "2025-03-10T10:00:00", "done": false}"#,
            )
            .create_async()
            .await;

        let draft = record(9, "Work", Priority::Medium, false).to_draft();
        let created = client(&server).add(&token(), &draft).await.unwrap();

        mock.assert_async().await;
        assert_eq!(created.id, TaskId(9));
    }

    #[tokio::test]
    async fn invalid_draft_never_reaches_the_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/tasks/add")
            .expect(0)
            .create_async()
            .await;

        let mut draft = record(1, "Work", Priority::Low, false).to_draft();
        draft.end_time = at(10, 8);
        let err = client(&server).add(&token(), &draft).await.unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn toggle_and_delete_hit_id_paths() {
        let mut server = mockito::Server::new_async().await;
        let toggle = server
            .mock("PUT", "/api/tasks/toggle/1")
            .with_status(200)
            .with_body(
                r#"{"id": 1, "description": "x", "category": "Work", "priority": "High",
                    "startTime": "2025-03-10T09:00:00", "endTime": "2025-03-10T10:00:00", "done": true}"#,
            )
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/api/tasks/delete/1")
            .with_status(200)
            .with_body("Task deleted successfully")
            .create_async()
            .await;

        let api = client(&server);
        assert!(api.toggle(&token(), TaskId(1)).await.unwrap().done);
        api.delete(&token(), TaskId(1)).await.unwrap();

        toggle.assert_async().await;
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn server_message_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", "/api/tasks/edit/3")
            .with_status(500)
            .with_body("Error updating task: constraint violated")
            .create_async()
            .await;

        let draft = record(3, "Work", Priority::Low, false).to_draft();
        let err = client(&server)
            .edit(&token(), TaskId(3), &draft)
            .await
            .unwrap_err();

        match err {
            Error::Remote { status, message } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(message, "Error updating task: constraint violated");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unauthorized_list_is_an_auth_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/tasks/all")
            .with_status(401)
            .with_body("Authentication error: Invalid token")
            .create_async()
            .await;

        let err = client(&server).list_all(&token()).await.unwrap_err();
        assert!(err.is_auth());
    }

    #[tokio::test]
    async fn login_returns_token_and_profile() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/auth/login")
            .match_body(Matcher::Json(serde_json::json!({
                "email": "ada@example.com",
                "password": "pw"
            })))
            .with_status(200)
            .with_body(r#"{"token": "jwt", "userId": 4, "name": "Ada", "email": "ada@example.com"}"#)
            .create_async()
            .await;

        let auth = client(&server).login("ada@example.com", "pw").await.unwrap();

        assert_eq!(auth.token, "jwt");
        assert_eq!(UserProfile::from(&auth).id, Some(4));
    }

    #[tokio::test]
    async fn rejected_registration_is_an_auth_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/auth/register")
            .with_status(400)
            .with_body("Registration failed: Email already exists")
            .create_async()
            .await;

        let request = RegisterRequest {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password: "pw".into(),
            confirm_password: "pw".into(),
        };
        let err = client(&server).register(&request).await.unwrap_err();
        assert!(matches!(err, Error::Auth(ref m) if m.contains("Email already exists")));
    }

    #[tokio::test]
    async fn user_info_without_name_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/auth/user-info")
            .match_header("authorization", "Bearer tok")
            .with_status(200)
            .with_body(r#"{"id": 1, "name": ""}"#)
            .create_async()
            .await;

        let err = client(&server).user_info(&token()).await.unwrap_err();
        assert!(err.is_auth());
    }

    #[test]
    fn register_checks_password_confirmation() {
        let request = RegisterRequest {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password: "one".into(),
            confirm_password: "two".into(),
        };
        assert!(matches!(request.validate(), Err(Error::Validation(_))));
    }
}
