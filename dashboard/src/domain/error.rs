//! Request failure taxonomy shared by the executor, the bindings and the
//! dashboard service.
//!
//! These errors are transport agnostic. The reqwest adapter maps its failures
//! into them and the bindings turn them into the single user-facing string held
//! in [`RequestState::error`](super::RequestState).

use thiserror::Error;

/// Failure produced while preparing, sending or interpreting a request.
///
/// `Display` yields the message a form would render inline. The one exception
/// is [`RequestError::Cancelled`], which never reaches binding state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// The attempt was superseded, explicitly cancelled or unbound.
    #[error("request cancelled")]
    Cancelled,
    /// Network-level failure before a response arrived.
    #[error("{message}")]
    Transport {
        /// Message shown to the user.
        message: String,
    },
    /// The server answered with a non-success status.
    #[error("{message}")]
    Application {
        /// HTTP status returned by the server.
        status: u16,
        /// Message shown to the user.
        message: String,
    },
    /// Client-side validation rejected the input before any network call.
    #[error("{message}")]
    Validation {
        /// Message shown to the user.
        message: String,
    },
    /// A response declared a structured body that could not be decoded.
    #[error("{message}")]
    Decode {
        /// Message shown to the user.
        message: String,
    },
}

impl RequestError {
    /// Build a [`RequestError::Transport`].
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Build a [`RequestError::Application`] for `status`.
    #[must_use]
    pub fn application(status: u16, message: impl Into<String>) -> Self {
        Self::Application {
            status,
            message: message.into(),
        }
    }

    /// Build a [`RequestError::Validation`].
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Build a [`RequestError::Decode`].
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Whether this failure is a cancellation rather than a real error.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// HTTP status attached to application errors.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Application { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message to surface in binding state, or `None` for cancellations.
    ///
    /// # Examples
    /// ```
    /// use dashboard::domain::RequestError;
    ///
    /// assert_eq!(RequestError::Cancelled.user_message(), None);
    /// assert_eq!(
    ///     RequestError::application(409, "Email taken").user_message().as_deref(),
    ///     Some("Email taken"),
    /// );
    /// ```
    #[must_use]
    pub fn user_message(&self) -> Option<String> {
        if self.is_cancelled() {
            None
        } else {
            Some(self.to_string())
        }
    }
}
