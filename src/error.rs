use thiserror::Error;

/// Failures talking to the control API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-2xx reply, or a 2xx reply whose body is not a valid page.
    #[error("account [{account}] API request failed: {status} - {body}")]
    Remote {
        account: String,
        status: u16,
        body: String,
    },

    /// Network failure or a reply body that could not be read.
    #[error("account [{account}] API request error: {source}")]
    Transport {
        account: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Body of a failed control API reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteErrorBody {
    Structured { message: String },
    Opaque(String),
}

impl RemoteErrorBody {
    pub fn parse(body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .filter(|m| !m.is_empty());
        match message {
            Some(message) => RemoteErrorBody::Structured { message },
            None => RemoteErrorBody::Opaque(body.to_string()),
        }
    }

    pub fn into_message(self) -> String {
        match self {
            RemoteErrorBody::Structured { message } => message,
            RemoteErrorBody::Opaque(text) => text,
        }
    }
}
