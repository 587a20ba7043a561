//! Sidecar configuration

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "eeebeed")]
#[command(about = "EeeBee class-insight sidecar (JSON lines over stdio)")]
pub struct Config {
    /// Base URL of the school backend
    #[arg(long, env = "EEEBEE_BACKEND_URL", default_value = "http://127.0.0.1:8000")]
    pub backend_url: String,

    /// Static bearer token sent with every backend request
    #[arg(long, env = "EEEBEE_API_TOKEN")]
    pub api_token: Option<String>,

    /// Organization code used when a login does not return one
    #[arg(long, env = "EEEBEE_ORG_CODE")]
    pub org_code: Option<String>,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "EEEBEE_LLM_URL", default_value = "https://api.openai.com/v1")]
    pub llm_url: String,

    /// Model used for tutoring and generation
    #[arg(long, env = "EEEBEE_LLM_MODEL", default_value = "gpt-4o-mini")]
    pub llm_model: String,

    /// API key for the generation service; generation is disabled without one
    #[arg(long, env = "EEEBEE_LLM_API_KEY")]
    pub llm_api_key: Option<String>,
}

impl Config {
    pub fn llm_enabled(&self) -> bool {
        self.llm_api_key
            .as_deref()
            .map(|k| !k.trim().is_empty())
            .unwrap_or(false)
    }
}
