use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Common(#[from] objects_counter_common::Error),

    #[error("Request to {uri} failed: {source}")]
    Network {
        uri: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Session expired or not logged in. Run `objects-counter login` first")]
    Unauthorized,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Invalid data or user already exists")]
    RegistrationRejected,

    #[error("{message} (status {status})")]
    RequestFailed { status: u16, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("No images found: {0}")]
    NoImagesFound(String),

    #[error("No image is being edited")]
    NoCurrentImage,

    #[error("Not possible on the current screen: {0}")]
    InvalidState(String),

    #[error("Response arrived after the workflow was restarted and was dropped")]
    StaleResponse,
}

impl ClientError {
    /// ログアウトを強制すべきエラーか
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized)
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
