pub type ForgeResult<T> = Result<T, ForgeError>;

#[derive(thiserror::Error, Debug)]
pub enum ForgeError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("layer '{0}' has no candidates")]
    EmptyLayer(String),

    #[error("layer '{0}' has zero total weight")]
    ZeroWeightLayer(String),

    #[error("malformed candidate reference: {0}")]
    MalformedCandidate(String),

    #[error("discovery error: {0}")]
    Discovery(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("publish error: {0}")]
    Publish(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ForgeError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn empty_layer(name: impl Into<String>) -> Self {
        Self::EmptyLayer(name.into())
    }

    pub fn zero_weight_layer(name: impl Into<String>) -> Self {
        Self::ZeroWeightLayer(name.into())
    }

    pub fn malformed_candidate(msg: impl Into<String>) -> Self {
        Self::MalformedCandidate(msg.into())
    }

    pub fn discovery(msg: impl Into<String>) -> Self {
        Self::Discovery(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn publish(msg: impl Into<String>) -> Self {
        Self::Publish(msg.into())
    }
}
