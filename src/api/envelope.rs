//! Response envelope normalization.
//!
//! The service has shipped two envelope styles: payloads returned directly,
//! and payloads nested under `data` (with auth tokens under `session`). Each
//! function here checks the nested form first, falls back to the flat form,
//! and translates snake_case wire fields into the internal types.

use serde::Deserialize;
use serde_json::Value;

use crate::api::error::{ClientError, ClientResult};
use crate::api::types::{
    Classification, Complaint, ComplaintStatus, DashboardStats, HealthStatus, Notification,
    Priority, Sentiment, User, UserRole,
};

/// Identifiers arrive as strings or bare integers depending on the backend.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Number(i64),
}

impl From<WireId> for String {
    fn from(id: WireId) -> Self {
        match id {
            WireId::Text(s) => s,
            WireId::Number(n) => n.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct WireUser {
    id: WireId,
    name: String,
    email: String,
    #[serde(default)]
    phone: Option<String>,
    role: UserRole,
    #[serde(default)]
    department: Option<String>,
    #[serde(default, alias = "createdAt")]
    created_at: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireClassification {
    #[serde(alias = "predicted_department")]
    predicted_department: String,
    #[serde(alias = "confidence_score")]
    confidence_score: f64,
    urgency: Priority,
    keywords: Vec<String>,
    sentiment: Sentiment,
    #[serde(default, alias = "suggested_steps")]
    suggested_steps: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct WireComplaint {
    id: WireId,
    user_id: WireId,
    #[serde(default, rename = "userName", alias = "user_name")]
    user_name: Option<String>,
    title: String,
    description: String,
    location: String,
    status: ComplaintStatus,
    department: String,
    date_submitted: String,
    date_updated: String,
    priority: Priority,
    #[serde(default)]
    attachments: Option<Vec<String>>,
    #[serde(default)]
    nlp_analysis: Option<Value>,
}

#[derive(Deserialize)]
struct WireStats {
    total: u64,
    pending: u64,
    resolved: u64,
    #[serde(rename = "avgResolutionTime", alias = "avg_resolution_time")]
    avg_resolution_time: String,
}

#[derive(Deserialize)]
struct WireNotification {
    id: WireId,
    complaint_id: WireId,
    #[serde(rename = "type")]
    kind: String,
    message: String,
    #[serde(default)]
    is_read: bool,
    created_at: String,
}

#[derive(Deserialize)]
struct WireHealth {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

/// Identity plus credential returned by login and registration.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthOutcome {
    pub user: User,
    pub token: Option<String>,
}

/// Peel a `data` wrapper if present.
pub fn unwrap_data(value: Value) -> Value {
    match value {
        Value::Object(mut map) => match map.remove("data") {
            Some(data) if !data.is_null() => data,
            _ => Value::Object(map),
        },
        other => other,
    }
}

/// Bearer token from `data.session.access_token`, else `session.access_token`.
pub fn extract_token(value: &Value) -> Option<String> {
    ["/data/session/access_token", "/session/access_token"]
        .iter()
        .find_map(|pointer| value.pointer(pointer).and_then(Value::as_str))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Server-supplied error text: `message`, else a string `error`.
pub fn error_message(value: &Value) -> Option<String> {
    ["message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|msg| !msg.is_empty())
        .map(str::to_string)
}

pub fn normalize_auth(value: Value) -> ClientResult<AuthOutcome> {
    let token = extract_token(&value);
    let user = value
        .pointer("/data/user")
        .filter(|user| !user.is_null())
        .or_else(|| value.get("user"))
        .cloned()
        .ok_or_else(|| ClientError::Decode("missing user in auth response".to_string()))?;

    Ok(AuthOutcome {
        user: normalize_user(user)?,
        token,
    })
}

/// Enforces that only officers carry a department.
pub fn normalize_user(value: Value) -> ClientResult<User> {
    let wire: WireUser = serde_json::from_value(unwrap_data(value))?;
    let department = non_empty(wire.department).filter(|_| wire.role == UserRole::Officer);

    Ok(User {
        id: wire.id.into(),
        name: wire.name,
        email: wire.email,
        phone: non_empty(wire.phone),
        role: wire.role,
        department,
        created_at: non_empty(wire.created_at),
    })
}

pub fn normalize_users(value: Value) -> ClientResult<Vec<User>> {
    expect_array(unwrap_data(value), "users")?
        .into_iter()
        .map(normalize_user)
        .collect()
}

pub fn normalize_classification(value: Value) -> ClientResult<Classification> {
    let wire: WireClassification = serde_json::from_value(unwrap_data(value))?;
    Ok(Classification {
        predicted_department: wire.predicted_department,
        confidence_score: wire.confidence_score.clamp(0.0, 1.0),
        urgency: wire.urgency,
        keywords: wire.keywords,
        sentiment: wire.sentiment,
        suggested_steps: wire.suggested_steps,
    })
}

/// `fallback_user_name` and `fallback_attachments` fill in what the server
/// leaves out; a classification that fails to parse is dropped, not fatal.
pub fn normalize_complaint(
    value: Value,
    fallback_user_name: &str,
    fallback_attachments: &[String],
) -> ClientResult<Complaint> {
    let wire: WireComplaint = serde_json::from_value(unwrap_data(value))?;
    let id: String = wire.id.into();

    let classification = match wire.nlp_analysis.filter(|v| !v.is_null()) {
        Some(raw) => match normalize_classification(raw) {
            Ok(c) => Some(c),
            Err(e) => {
                tracing::warn!(complaint_id = %id, error = %e, "Ignoring malformed classification");
                None
            }
        },
        None => None,
    };

    Ok(Complaint {
        id,
        user_id: wire.user_id.into(),
        user_name: non_empty(wire.user_name).unwrap_or_else(|| fallback_user_name.to_string()),
        title: wire.title,
        description: wire.description,
        location: wire.location,
        status: wire.status,
        department: wire.department,
        date_submitted: wire.date_submitted,
        date_updated: wire.date_updated,
        priority: wire.priority,
        attachments: wire
            .attachments
            .unwrap_or_else(|| fallback_attachments.to_vec()),
        classification,
    })
}

/// Order is preserved as returned.
pub fn normalize_complaints(value: Value, fallback_user_name: &str) -> ClientResult<Vec<Complaint>> {
    expect_array(unwrap_data(value), "complaints")?
        .into_iter()
        .map(|item| normalize_complaint(item, fallback_user_name, &[]))
        .collect()
}

pub fn normalize_stats(value: Value) -> ClientResult<DashboardStats> {
    let wire: WireStats = serde_json::from_value(unwrap_data(value))?;
    Ok(DashboardStats {
        total: wire.total,
        pending: wire.pending,
        resolved: wire.resolved,
        avg_resolution_time: wire.avg_resolution_time,
    })
}

/// Accepts plain names or objects carrying a `name` field.
pub fn normalize_departments(value: Value) -> ClientResult<Vec<String>> {
    expect_array(unwrap_data(value), "departments")?
        .into_iter()
        .map(|item| match item {
            Value::String(name) => Ok(name),
            Value::Object(ref map) => map
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| ClientError::Decode("department without a name".to_string())),
            other => Err(ClientError::Decode(format!("unexpected department entry: {}", other))),
        })
        .collect()
}

pub fn normalize_notifications(value: Value) -> ClientResult<Vec<Notification>> {
    expect_array(unwrap_data(value), "notifications")?
        .into_iter()
        .map(|item| {
            let wire: WireNotification = serde_json::from_value(item)?;
            Ok(Notification {
                id: wire.id.into(),
                complaint_id: wire.complaint_id.into(),
                kind: wire.kind,
                message: wire.message,
                is_read: wire.is_read,
                created_at: wire.created_at,
            })
        })
        .collect()
}

pub fn normalize_health(value: Value) -> ClientResult<HealthStatus> {
    let wire: WireHealth = serde_json::from_value(unwrap_data(value))?;
    Ok(HealthStatus {
        status: wire.status,
        message: non_empty(wire.message),
    })
}

fn expect_array(value: Value, what: &str) -> ClientResult<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(ClientError::Decode(format!(
            "expected a list of {}, got {}",
            what,
            kind_of(&other)
        ))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
