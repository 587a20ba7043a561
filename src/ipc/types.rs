use crate::backend::DataSource;
use crate::llm::LlmBackend;
use crate::session::SessionContext;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub session: SessionContext,
    pub backend: Box<dyn DataSource>,
    pub backend_url: String,
    pub llm: Option<Box<dyn LlmBackend>>,
    pub default_org_code: Option<String>,
}

impl AppState {
    pub fn new(
        backend: Box<dyn DataSource>,
        backend_url: String,
        llm: Option<Box<dyn LlmBackend>>,
        default_org_code: Option<String>,
    ) -> Self {
        Self {
            session: SessionContext::new(),
            backend,
            backend_url,
            llm,
            default_org_code,
        }
    }

    pub fn llm(&self) -> Option<&dyn LlmBackend> {
        self.llm.as_deref()
    }
}
