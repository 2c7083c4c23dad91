use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("a sticky message already exists in channel {channel_id}")]
    AlreadyExists { channel_id: String },

    #[error("no sticky message in channel {channel_id}")]
    NotFound { channel_id: String },

    /// Both the webhook path (when attempted) and the direct post failed.
    #[error("failed to post sticky message in channel {channel_id}: {source}")]
    DispatchFailed {
        channel_id: String,
        #[source]
        source: Box<Error>,
    },

    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// A chat platform call failed.
    #[error("{context}: {source}")]
    Platform {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn already_exists(channel_id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            channel_id: channel_id.into(),
        }
    }

    #[must_use]
    pub fn not_found(channel_id: impl Into<String>) -> Self {
        Self::NotFound {
            channel_id: channel_id.into(),
        }
    }

    #[must_use]
    pub fn dispatch_failed(channel_id: impl Into<String>, source: Error) -> Self {
        Self::DispatchFailed {
            channel_id: channel_id.into(),
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn platform(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Platform {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Short explanation suitable for showing to the person who ran a command.
    #[must_use]
    pub fn user_reason(&self) -> String {
        match self {
            Self::AlreadyExists { .. } => {
                "This channel already has a sticky message. Delete it first or use edit.".into()
            },
            Self::NotFound { .. } => "This channel has no sticky message.".into(),
            Self::InvalidInput { message } => format!("Invalid input: {message}."),
            Self::DispatchFailed { .. } => {
                "The sticky message could not be posted. Check my permissions in this channel."
                    .into()
            },
            _ => "Something went wrong while saving the sticky message.".into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
