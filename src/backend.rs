use crate::records::{AuthUser, BaselineReport, DropdownData, PerformanceStatus, TopicList};
use reqwest::blocking::Client;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const TEACHER_DROPDOWNS_PATH: &str = "/api/teacher/dropdowns";
pub const SUBJECT_TOPICS_PATH: &str = "/api/teacher/subject-topics";
pub const PERFORMANCE_STATUS_PATH: &str = "/api/teacher/concept-student-status";
pub const BASELINE_REPORT_PATH: &str = "/api/baseline/report";

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("could not reach {endpoint}: {message}")]
    Network {
        endpoint: &'static str,
        message: String,
    },

    #[error("{endpoint} responded with HTTP {status}")]
    Status { endpoint: &'static str, status: u16 },

    #[error("unexpected {endpoint} response: {message}")]
    Decode {
        endpoint: &'static str,
        message: String,
    },

    #[error("login rejected: {0}")]
    Rejected(String),
}

impl BackendError {
    pub fn code(&self) -> &'static str {
        match self {
            BackendError::Network { .. } => "backend_unavailable",
            BackendError::Status { .. } => "backend_http_error",
            BackendError::Decode { .. } => "backend_bad_response",
            BackendError::Rejected(_) => "login_rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginParams {
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_code: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DropdownParams {
    pub org_code: String,
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TopicParams {
    pub org_code: String,
    pub user_id: i64,
    pub batch_id: i64,
    pub subject_id: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PerformanceParams {
    pub org_code: String,
    pub user_id: i64,
    pub batch_id: i64,
    pub topic_id: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BaselineParams {
    pub org_code: String,
    pub user_id: i64,
    pub batch_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<i64>,
}

/// The five backend calls the dashboards depend on.
pub trait DataSource {
    fn login(&self, params: &LoginParams) -> Result<AuthUser, BackendError>;
    fn teacher_dropdowns(&self, params: &DropdownParams) -> Result<DropdownData, BackendError>;
    fn subject_topics(&self, params: &TopicParams) -> Result<TopicList, BackendError>;
    fn performance_status(
        &self,
        params: &PerformanceParams,
    ) -> Result<PerformanceStatus, BackendError>;
    fn baseline_report(&self, params: &BaselineParams) -> Result<BaselineReport, BackendError>;
}

pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, api_token: Option<&str>) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = api_token.filter(|t| !t.trim().is_empty()) {
            let mut v = HeaderValue::from_str(&format!("Bearer {}", token.trim()))?;
            v.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, v);
        }

        let client = Client::builder().default_headers(headers).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn post<P, T>(&self, endpoint: &'static str, path: &str, params: &P) -> Result<T, BackendError>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let logged = serde_json::to_value(params)
            .map(redact)
            .unwrap_or(Value::Null);
        info!(endpoint, params = %logged, "backend request");

        let response = self
            .client
            .post(&url)
            .json(params)
            .send()
            .map_err(|e| {
                warn!(endpoint, error = %e, "backend request failed");
                BackendError::Network {
                    endpoint,
                    message: e.to_string(),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(endpoint, status = status.as_u16(), "backend returned error status");
            return Err(BackendError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }

        let body: Value = response.json().map_err(|e| BackendError::Decode {
            endpoint,
            message: e.to_string(),
        })?;
        let body = unwrap_data(body);
        info!(endpoint, lists = %list_counts(&body), "backend response");

        serde_json::from_value(body).map_err(|e| BackendError::Decode {
            endpoint,
            message: e.to_string(),
        })
    }
}

impl DataSource for HttpBackend {
    fn login(&self, params: &LoginParams) -> Result<AuthUser, BackendError> {
        let body: Value = self
            .post("login", LOGIN_PATH, params)
            .map_err(|e| match e {
                BackendError::Status { status, .. } if status == 401 || status == 403 => {
                    BackendError::Rejected("invalid credentials".into())
                }
                other => other,
            })?;
        if body.get("success").and_then(|v| v.as_bool()) == Some(false) {
            let message = body
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or("invalid credentials");
            return Err(BackendError::Rejected(message.to_string()));
        }
        let user_value = body.get("user").cloned().unwrap_or(body);
        let user: AuthUser =
            serde_json::from_value(user_value).map_err(|e| BackendError::Decode {
                endpoint: "login",
                message: e.to_string(),
            })?;
        if user.user_id == 0 {
            return Err(BackendError::Rejected("no user in login response".into()));
        }
        debug!(user_id = user.user_id, role = ?user.role, "login accepted");
        Ok(user)
    }

    fn teacher_dropdowns(&self, params: &DropdownParams) -> Result<DropdownData, BackendError> {
        self.post("teacher_dropdowns", TEACHER_DROPDOWNS_PATH, params)
    }

    fn subject_topics(&self, params: &TopicParams) -> Result<TopicList, BackendError> {
        self.post("subject_topics", SUBJECT_TOPICS_PATH, params)
    }

    fn performance_status(
        &self,
        params: &PerformanceParams,
    ) -> Result<PerformanceStatus, BackendError> {
        self.post("performance_status", PERFORMANCE_STATUS_PATH, params)
    }

    fn baseline_report(&self, params: &BaselineParams) -> Result<BaselineReport, BackendError> {
        self.post("baseline_report", BASELINE_REPORT_PATH, params)
    }
}

/// Some endpoints wrap their payload as `{"status": ..., "data": {...}}`.
fn unwrap_data(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.get("data").map(|d| d.is_object()).unwrap_or(false) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn redact(mut v: Value) -> Value {
    if let Some(map) = v.as_object_mut() {
        if map.contains_key("password") {
            map.insert("password".into(), Value::String("***".into()));
        }
    }
    v
}

fn list_counts(body: &Value) -> String {
    let Some(map) = body.as_object() else {
        return "none".to_string();
    };
    let parts = map
        .iter()
        .filter_map(|(k, v)| v.as_array().map(|a| format!("{}={}", k, a.len())))
        .collect::<Vec<_>>();
    if parts.is_empty() {
        "none".to_string()
    } else {
        parts.join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unwrap_data_only_unwraps_objects() {
        let wrapped = json!({ "status": "ok", "data": { "topics": [] } });
        assert_eq!(unwrap_data(wrapped), json!({ "topics": [] }));

        let list_data = json!({ "data": [1, 2] });
        assert_eq!(unwrap_data(list_data.clone()), list_data);
    }

    #[test]
    fn redact_hides_password() {
        let v = redact(json!({ "username": "t1", "password": "hunter2" }));
        assert_eq!(v.get("password").and_then(|v| v.as_str()), Some("***"));
        assert_eq!(v.get("username").and_then(|v| v.as_str()), Some("t1"));
    }

    #[test]
    fn list_counts_reports_array_lengths() {
        let body = json!({ "concepts": [1, 2, 3], "students": [], "name": "x" });
        let s = list_counts(&body);
        assert!(s.contains("concepts=3"));
        assert!(s.contains("students=0"));
        assert!(!s.contains("name"));
        assert_eq!(list_counts(&json!([1])), "none");
    }

    #[test]
    fn error_codes_are_stable() {
        let e = BackendError::Status {
            endpoint: "subject_topics",
            status: 502,
        };
        assert_eq!(e.code(), "backend_http_error");
        assert!(e.to_string().contains("502"));
        assert_eq!(BackendError::Rejected("x".into()).code(), "login_rejected");
    }
}
