//! Typed client for the grievance portal API.
//!
//! # Responsibilities
//! - Issue each logical operation through the retry policy
//! - Attach the bearer credential and a per-operation request ID
//! - Map non-success statuses onto `ClientError`
//! - Drive session transitions (establish, sign-out, expiry)

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::envelope::{self, AuthOutcome};
use crate::api::error::{ClientError, ClientResult};
use crate::api::types::{
    Classification, Complaint, ComplaintDraft, ComplaintStatus, DashboardStats, HealthStatus,
    Notification, OfficerDraft, Registration, User, UserRole,
};
use crate::config::ClientConfig;
use crate::resilience::RetryPolicy;
use crate::session::{FileTokenStore, Session};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MIN_OFFICER_PASSWORD_LEN: usize = 8;
const UNKNOWN_USER: &str = "Unknown User";

/// Status and decoded body of the final attempt.
#[derive(Debug)]
struct ApiResponse {
    status: u16,
    body: Value,
    /// Credential every attempt of this operation was sent with.
    credential: Option<Arc<String>>,
}

impl ApiResponse {
    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Failure carrying the server's message when it sent one.
    fn failure(&self, fallback: &str) -> ClientError {
        ClientError::Api {
            status: self.status,
            message: envelope::error_message(&self.body).unwrap_or_else(|| fallback.to_string()),
        }
    }

    /// Failure with a fixed message, ignoring the body.
    fn generic_failure(&self, message: &str) -> ClientError {
        ClientError::Api {
            status: self.status,
            message: message.to_string(),
        }
    }
}

#[derive(Serialize)]
struct RegisterPayload<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
    role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    department: Option<&'a str>,
}

/// Client for the grievance portal API.
pub struct GrievanceClient {
    http: Client,
    base_url: String,
    retry: RetryPolicy,
    session: Arc<Session>,
    current_user: ArcSwapOption<User>,
}

impl GrievanceClient {
    /// Create a client with the default retry policy.
    pub fn new(base_url: &str, session: Arc<Session>) -> Self {
        Self::with_http_client(Client::new(), base_url, session)
    }

    /// Create a client over a caller-built `reqwest::Client`.
    pub fn with_http_client(http: Client, base_url: &str, session: Arc<Session>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
            session,
            current_user: ArcSwapOption::empty(),
        }
    }

    /// Build a client from configuration: resolved base URL, retry policy,
    /// request timeout and credential storage.
    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.api.request_timeout_secs))
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        let session = match &config.session.token_path {
            Some(path) => Session::new(Arc::new(FileTokenStore::new(path))),
            None => Session::in_memory(),
        };

        let base_url = config.api.resolved_base_url();
        tracing::info!(base_url = %base_url, "API client configured");

        Ok(Self::with_http_client(http, &base_url, Arc::new(session))
            .with_retry_policy(RetryPolicy::from_config(&config.retries)))
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// The user from the last login or registration in this process.
    pub fn current_user(&self) -> Option<Arc<User>> {
        self.current_user.load_full()
    }

    // ---- authentication ----

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<User> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(ClientError::InvalidInput("Email and password are required".to_string()));
        }

        let body = json!({ "email": email, "password": password });
        let response = self
            .send("login", Method::POST, "/auth/login", Some(&body), false)
            .await?;

        if !response.is_success() {
            if response.status == 401 {
                return Err(ClientError::InvalidCredentials(
                    envelope::error_message(&response.body)
                        .unwrap_or_else(|| "Invalid email or password".to_string()),
                ));
            }
            return Err(response.failure("Login failed"));
        }

        self.complete_auth(envelope::normalize_auth(response.body)?)
    }

    /// Self-service registration. The department is sent only for officers.
    pub async fn register(&self, registration: &Registration) -> ClientResult<User> {
        if registration.name.trim().is_empty()
            || registration.email.trim().is_empty()
            || registration.password.is_empty()
        {
            return Err(ClientError::InvalidInput(
                "Name, email and password are required".to_string(),
            ));
        }

        let department = match registration.role {
            UserRole::Officer => Some(
                registration
                    .department
                    .as_deref()
                    .filter(|d| !d.trim().is_empty())
                    .ok_or_else(|| {
                        ClientError::InvalidInput("Department is required for officers".to_string())
                    })?,
            ),
            _ => None,
        };

        let payload = serde_json::to_value(RegisterPayload {
            name: &registration.name,
            email: &registration.email,
            password: &registration.password,
            role: registration.role,
            department,
        })?;

        let response = self
            .send("register", Method::POST, "/auth/register", Some(&payload), false)
            .await?;

        if !response.is_success() {
            if response.status == 409 {
                return Err(ClientError::UserExists);
            }
            return Err(response.failure("Registration failed"));
        }

        self.complete_auth(envelope::normalize_auth(response.body)?)
    }

    pub fn logout(&self) {
        self.current_user.store(None);
        self.session.sign_out();
    }

    fn complete_auth(&self, outcome: AuthOutcome) -> ClientResult<User> {
        match outcome.token {
            Some(token) => self.session.establish(token),
            None => {
                tracing::warn!(user_id = %outcome.user.id, "Auth response carried no access token");
                // The previous credential belongs to another account
                self.session.sign_out();
            }
        }
        self.current_user.store(Some(Arc::new(outcome.user.clone())));
        Ok(outcome.user)
    }

    // ---- complaints ----

    pub async fn submit_complaint(&self, draft: &ComplaintDraft) -> ClientResult<Complaint> {
        if draft.title.trim().is_empty()
            || draft.description.trim().is_empty()
            || draft.location.trim().is_empty()
        {
            return Err(ClientError::InvalidInput(
                "Title, description and location are required".to_string(),
            ));
        }

        let body = json!({
            "title": draft.title,
            "description": draft.description,
            "location": draft.location,
        });
        let response = self
            .send("submit_complaint", Method::POST, "/complaints/submit", Some(&body), true)
            .await?;

        if !response.is_success() {
            return Err(response.failure("Failed to submit complaint"));
        }

        let submitter = self.current_user_name();
        envelope::normalize_complaint(response.body, &submitter, &draft.attachments)
    }

    /// Complaints visible to the signed-in user, in server order.
    ///
    /// The server scopes the list by the credential; `role` and `department`
    /// are checked locally so an officer without a department fails early.
    pub async fn list_complaints(
        &self,
        role: UserRole,
        department: Option<&str>,
    ) -> ClientResult<Vec<Complaint>> {
        if role == UserRole::Officer && department.map_or(true, |d| d.trim().is_empty()) {
            return Err(ClientError::InvalidInput(
                "Department is required to list officer complaints".to_string(),
            ));
        }

        let response = self
            .send("list_complaints", Method::GET, "/complaints", None, true)
            .await?;
        self.check_session(&response)?;

        if !response.is_success() {
            return Err(response.generic_failure("Failed to fetch complaints"));
        }

        envelope::normalize_complaints(response.body, UNKNOWN_USER)
    }

    /// Best-effort background refresh: on failure the error is logged and
    /// `complaints` is left untouched. Returns whether the list was replaced.
    pub async fn refresh_complaints(
        &self,
        role: UserRole,
        department: Option<&str>,
        complaints: &mut Vec<Complaint>,
    ) -> bool {
        match self.list_complaints(role, department).await {
            Ok(fresh) => {
                *complaints = fresh;
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Background complaint refresh failed, keeping previous list");
                false
            }
        }
    }

    pub async fn fetch_complaint(&self, id: &str) -> ClientResult<Complaint> {
        let path = format!("/complaints/{}", validate_path_id(id)?);
        let response = self
            .send("fetch_complaint", Method::GET, &path, None, true)
            .await?;
        self.check_session(&response)?;

        if !response.is_success() {
            if response.status == 404 {
                return Err(response.failure("Complaint not found"));
            }
            return Err(response.generic_failure("Failed to fetch complaint"));
        }

        envelope::normalize_complaint(response.body, UNKNOWN_USER, &[])
    }

    pub async fn update_status(&self, id: &str, status: ComplaintStatus) -> ClientResult<Complaint> {
        let path = format!("/complaints/{}/status", validate_path_id(id)?);
        let body = json!({ "status": status });
        let response = self
            .send("update_status", Method::PUT, &path, Some(&body), true)
            .await?;

        if !response.is_success() {
            return Err(response.generic_failure("Failed to update status"));
        }

        envelope::normalize_complaint(response.body, UNKNOWN_USER, &[])
    }

    /// Ask the classifier how it would route `text`, without filing anything.
    pub async fn classify_text(&self, text: &str) -> ClientResult<Classification> {
        if text.trim().is_empty() {
            return Err(ClientError::InvalidInput("Text to classify is required".to_string()));
        }

        let body = json!({ "text": text });
        let response = self
            .send("classify_text", Method::POST, "/nlp/classify", Some(&body), true)
            .await?;

        if !response.is_success() {
            return Err(response.failure("Failed to classify text"));
        }

        envelope::normalize_classification(response.body)
    }

    // ---- dashboard ----

    pub async fn fetch_stats(&self) -> ClientResult<DashboardStats> {
        let response = self.send("fetch_stats", Method::GET, "/analytics", None, true).await?;
        self.check_session(&response)?;

        if !response.is_success() {
            return Err(response.generic_failure("Failed to fetch stats"));
        }

        envelope::normalize_stats(response.body)
    }

    pub async fn fetch_departments(&self) -> ClientResult<Vec<String>> {
        let response = self
            .send("fetch_departments", Method::GET, "/departments", None, false)
            .await?;

        if !response.is_success() {
            return Err(response.generic_failure("Failed to fetch departments"));
        }

        envelope::normalize_departments(response.body)
    }

    pub async fn list_notifications(&self) -> ClientResult<Vec<Notification>> {
        let response = self
            .send("list_notifications", Method::GET, "/notifications", None, true)
            .await?;
        self.check_session(&response)?;

        if !response.is_success() {
            return Err(response.generic_failure("Failed to fetch notifications"));
        }

        envelope::normalize_notifications(response.body)
    }

    pub async fn mark_notification_read(&self, id: &str) -> ClientResult<()> {
        let path = format!("/notifications/{}/read", validate_path_id(id)?);
        let response = self
            .send("mark_notification_read", Method::PUT, &path, None, true)
            .await?;

        if !response.is_success() {
            return Err(response.failure("Failed to mark notification as read"));
        }
        Ok(())
    }

    pub async fn health(&self) -> ClientResult<HealthStatus> {
        let response = self.send("health", Method::GET, "/health", None, false).await?;

        if !response.is_success() {
            return Err(response.generic_failure("Service is unavailable"));
        }

        envelope::normalize_health(response.body)
    }

    // ---- administration ----

    pub async fn list_users(&self) -> ClientResult<Vec<User>> {
        let response = self.send("list_users", Method::GET, "/admin/users", None, true).await?;
        self.check_session(&response)?;

        if !response.is_success() {
            return Err(response.generic_failure("Failed to fetch users"));
        }

        envelope::normalize_users(response.body)
    }

    pub async fn create_officer(&self, draft: &OfficerDraft) -> ClientResult<User> {
        if draft.email.trim().is_empty()
            || draft.name.trim().is_empty()
            || draft.department.trim().is_empty()
            || draft.password.is_empty()
        {
            return Err(ClientError::InvalidInput(
                "Email, password, name and department are required".to_string(),
            ));
        }
        if draft.password.chars().count() < MIN_OFFICER_PASSWORD_LEN {
            return Err(ClientError::InvalidInput(format!(
                "Password must be at least {} characters",
                MIN_OFFICER_PASSWORD_LEN
            )));
        }

        let body = serde_json::to_value(draft)?;
        let response = self
            .send("create_officer", Method::POST, "/admin/users", Some(&body), true)
            .await?;

        if !response.is_success() {
            return Err(response.failure("Failed to create officer"));
        }

        envelope::normalize_user(response.body)
    }

    // ---- plumbing ----

    /// A 401 on an authenticated read means the credential it carried is
    /// dead. A credential established while the read was in flight survives.
    fn check_session(&self, response: &ApiResponse) -> ClientResult<()> {
        if response.status == 401 {
            let expired = match &response.credential {
                Some(sent) => self.session.expire_if_current(sent),
                None => !self.session.is_authenticated(),
            };
            if expired {
                self.current_user.store(None);
            }
            return Err(ClientError::SessionExpired);
        }
        Ok(())
    }

    fn current_user_name(&self) -> String {
        self.current_user
            .load_full()
            .map(|user| user.name.clone())
            .unwrap_or_else(|| UNKNOWN_USER.to_string())
    }

    /// Send one logical request through the retry policy and decode the body
    /// of the final response.
    async fn send(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        body: Option<&Value>,
        authenticated: bool,
    ) -> ClientResult<ApiResponse> {
        let url = format!("{}{}", self.base_url, path);
        let request_id = Uuid::new_v4().to_string();
        let credential = if authenticated { self.session.token() } else { None };
        let authorization = credential
            .as_deref()
            .map(|token| format!("Bearer {}", token))
            .unwrap_or_default();

        tracing::debug!(request_id = %request_id, operation, method = %method, url = %url, "Sending request");

        let response = self
            .retry
            .execute(operation, || {
                let mut request = self
                    .http
                    .request(method.clone(), &url)
                    .header(REQUEST_ID_HEADER, request_id.as_str());
                if authenticated {
                    request = request.header(AUTHORIZATION, authorization.as_str());
                }
                if let Some(body) = body {
                    request = request.json(body);
                }
                request.send()
            })
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        let success = (200..300).contains(&status);

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str(&text) {
                Ok(value) => value,
                Err(e) if success => return Err(ClientError::Decode(e.to_string())),
                Err(_) => Value::Null,
            }
        };

        tracing::debug!(request_id = %request_id, operation, status, "Response received");
        Ok(ApiResponse {
            status,
            body,
            credential,
        })
    }
}

impl std::fmt::Debug for GrievanceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrievanceClient")
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .field("session", &self.session)
            .finish()
    }
}

/// Ids are interpolated into the path, so they must be a single segment that
/// the URL parser will not collapse.
fn validate_path_id(id: &str) -> ClientResult<&str> {
    let id = id.trim();
    if id.is_empty()
        || id == "."
        || id == ".."
        || id.contains(|c: char| matches!(c, '/' | '\\' | '?' | '#' | '%'))
    {
        return Err(ClientError::InvalidInput(format!("Invalid identifier '{}'", id)));
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GrievanceClient {
        GrievanceClient::new("http://127.0.0.1:9/api/", Arc::new(Session::in_memory()))
    }

    #[test]
    fn test_base_url_trimmed() {
        assert_eq!(client().base_url(), "http://127.0.0.1:9/api");
    }

    #[test]
    fn test_validate_path_id() {
        assert_eq!(validate_path_id(" GRV-1 ").unwrap(), "GRV-1");
        assert!(validate_path_id("").is_err());
        assert!(validate_path_id("a/b").is_err());
        assert!(validate_path_id(".").is_err());
        assert!(validate_path_id(" .. ").is_err());
        assert!(validate_path_id("%2e%2e").is_err());
        assert!(validate_path_id("a\\b").is_err());
        assert_eq!(validate_path_id("v1.2").unwrap(), "v1.2");
    }

    #[test]
    fn test_register_payload_omits_department() {
        let payload = serde_json::to_value(RegisterPayload {
            name: "n",
            email: "e",
            password: "p",
            role: UserRole::Citizen,
            department: None,
        })
        .unwrap();
        assert!(payload.get("department").is_none());
        assert_eq!(payload["role"], "CITIZEN");
    }

    // Input validation never reaches the (unroutable) network.
    #[tokio::test]
    async fn test_local_validation() {
        let c = client();

        let err = c.login("", "pw").await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidInput(_)));

        let err = c
            .submit_complaint(&ComplaintDraft {
                title: "Pothole".into(),
                description: " ".into(),
                location: "Main St".into(),
                attachments: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidInput(_)));

        let err = c
            .register(&Registration {
                name: "O".into(),
                email: "o@example.org".into(),
                password: "secret123".into(),
                role: UserRole::Officer,
                department: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Department is required for officers");

        let err = c
            .create_officer(&OfficerDraft {
                email: "o@example.org".into(),
                password: "short".into(),
                name: "O".into(),
                department: "Education".into(),
                phone: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Password must be at least 8 characters");

        let err = c.list_complaints(UserRole::Officer, None).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidInput(_)));
    }
}
