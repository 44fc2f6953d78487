use thiserror::Error;

/// The outbound call itself failed; no payload was received.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExternalCallError {
    #[error("Gemini API key is not set (GEMINI_API_KEY or API_KEY)")]
    MissingCredential,

    #[error("Gemini request failed: {0}")]
    Transport(String),

    #[error("Gemini error {status}: {message}")]
    Provider { status: u16, message: String },
}

/// The call succeeded but the payload does not satisfy the result contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedResponseError {
    #[error("model returned an empty response")]
    Empty,

    #[error("model response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("model response violates the result contract: {0}")]
    ContractViolation(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimulationError {
    #[error("invalid simulation request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    ExternalCall(#[from] ExternalCallError),

    #[error(transparent)]
    MalformedResponse(#[from] MalformedResponseError),
}

impl SimulationError {
    pub fn is_malformed(&self) -> bool {
        matches!(self, SimulationError::MalformedResponse(_))
    }

    /// Short tag for logs and `/state.json`.
    pub fn kind(&self) -> &'static str {
        match self {
            SimulationError::InvalidRequest(_) => "invalid_request",
            SimulationError::ExternalCall(_) => "external_call",
            SimulationError::MalformedResponse(_) => "malformed_response",
        }
    }
}
