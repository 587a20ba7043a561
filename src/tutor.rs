use crate::llm::{CompletionRequest, LlmBackend, LlmError};
use serde::Serialize;
use tracing::{info, warn};

/// Generated text, or the inline error text shown in its place.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Generated {
    pub content: String,
    pub generated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Run one completion. Failures never propagate: the caller gets a
/// displayable message with `generated: false`.
pub fn generate(backend: Option<&dyn LlmBackend>, request: &CompletionRequest) -> Generated {
    let Some(backend) = backend else {
        return unavailable(&LlmError::Unavailable, None);
    };

    match backend.complete(request) {
        Ok(content) => {
            info!(model = backend.id(), chars = content.len(), "content generated");
            Generated {
                content,
                generated: true,
                model: Some(backend.id().to_string()),
            }
        }
        Err(e) => {
            warn!(model = backend.id(), error = %e, "generation failed");
            unavailable(&e, Some(backend.id()))
        }
    }
}

fn unavailable(e: &LlmError, model: Option<&str>) -> Generated {
    Generated {
        content: format!("EeeBee can't generate content right now: {}", e),
        generated: false,
        model: model.map(|m| m.to_string()),
    }
}
