/*!

Error types and the diagnostic classifier.

The secret service reports failures as free text (a D-Bus error message,
or whatever libdbus prints on stderr). [`classify`] is the only place that
text is interpreted; everything else branches on [`ErrorKind`].

*/

use thiserror::Error;

/// Everything that can end a run of the treasurer.
///
/// The `Display` text of each variant is what the user sees in the alert.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Gnome Keyring Daemon is not available")]
    ServiceUnavailable(String),

    #[error("There is no keyring with name \"{0}\"")]
    NoSuchKeyring(String),

    #[error("Could not lock keyring \"{0}\"")]
    LockFailed(String),

    #[error("The password for keyring \"{0}\" was incorrect")]
    WrongPassword(String),

    #[error("Keyring \"{0}\" is still locked after unlocking it")]
    StillLocked(String),

    #[error("Cannot find password for \"{hint}\" in keyring \"{keyring}\"")]
    NotFound { hint: String, keyring: String },

    #[error("No password was provided")]
    NoPassword,

    /// A store failure that matched none of the known diagnostics.
    #[error("{0}")]
    Unclassified(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A failed call into the storage service, carrying its raw diagnostic text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub diagnostic: String,
}

impl Failure {
    pub fn new(diagnostic: impl Into<String>) -> Self {
        Self {
            diagnostic: diagnostic.into(),
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.diagnostic)
    }
}

/// The store failures the unlock flow knows how to react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Locked,
    WrongPassword,
    Unclassified,
}

impl ErrorKind {
    fn patterns(self) -> &'static [&'static str] {
        match self {
            // gnome-keyring's IsLocked text, and ours for a locked collection
            ErrorKind::Locked => &["Cannot get secret of a locked object", "is locked"],
            ErrorKind::WrongPassword => &["The password was incorrect"],
            ErrorKind::Unclassified => &[],
        }
    }
}

/// Map diagnostic text onto the closed set of failures we recognize.
pub fn classify(raw: &str) -> ErrorKind {
    [ErrorKind::Locked, ErrorKind::WrongPassword]
        .into_iter()
        .find(|kind| kind.patterns().iter().any(|p| raw.contains(p)))
        .unwrap_or(ErrorKind::Unclassified)
}

/// Diagnostic text for a collection found locked before any call was made.
pub(crate) const LOCKED_COLLECTION: &str = "Collection is locked";

/// Render a dbus-secret-service error as a store failure.
///
/// Wrapped D-Bus errors render with the daemon's own message last, which
/// is the part the classifier looks at.
pub fn decode_error(err: dbus_secret_service::Error) -> Failure {
    match err {
        dbus_secret_service::Error::Locked => Failure::new(LOCKED_COLLECTION),
        err => Failure::new(err.to_string()),
    }
}

/// Render a raw D-Bus error (from the calls we make ourselves) as a store failure.
pub fn decode_dbus_error(err: dbus::Error) -> Failure {
    match (err.name(), err.message()) {
        (Some(name), Some(message)) => Failure::new(format!("{name}: {message}")),
        (None, Some(message)) => Failure::new(message),
        _ => Failure::new(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_gnome_keyring_texts() {
        assert_eq!(
            classify("Cannot get secret of a locked object"),
            ErrorKind::Locked
        );
        assert_eq!(classify(LOCKED_COLLECTION), ErrorKind::Locked);
        assert_eq!(
            classify("The password was incorrect."),
            ErrorKind::WrongPassword
        );
    }

    #[test]
    fn anything_else_is_unclassified() {
        assert_eq!(classify(""), ErrorKind::Unclassified);
        assert_eq!(
            classify("org.freedesktop.DBus.Error.ServiceUnknown"),
            ErrorKind::Unclassified
        );
    }

    #[test]
    fn alert_texts_name_the_keyring() {
        let err = Error::WrongPassword("Login".to_string());
        assert_eq!(err.to_string(), "The password for keyring \"Login\" was incorrect");
        let err = Error::NotFound {
            hint: "github".to_string(),
            keyring: "Login".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot find password for \"github\" in keyring \"Login\""
        );
    }
}
