/*!

Everything that faces the user: desktop alerts, the password dialog, and
reading back what the keyring libraries complained about.

*/

use std::fs::File;
use std::io::Read;
use std::process::{Command, Stdio};

use notify_rust::{Notification, Urgency};
use tracing::{debug, error, warn};

use crate::channel::{ErrorChannel, message_of};
use crate::errors::{Error, Failure, Result};
use crate::secret::Password;

/// Name shown in alert and dialog titles.
pub const APP_NAME: &str = "The Treasurer";

/// Raises critical desktop notifications and ends the process.
#[derive(Debug)]
pub struct Notifier {
    app_name: String,
    available: bool,
}

impl Notifier {
    /// Check for a notification server. Without one, alerts are only logged.
    pub fn new(app_name: impl Into<String>) -> Self {
        let available = match notify_rust::get_server_information() {
            Ok(info) => {
                debug!(server = %info.name, "found notification server");
                true
            }
            Err(e) => {
                error!(error = %e, "Could not initialize notification mechanism!");
                false
            }
        };
        Self {
            app_name: app_name.into(),
            available,
        }
    }

    /// Show a critical alert. Failing to show it is logged, nothing more.
    pub fn alert(&self, message: &str) {
        if !self.available {
            return;
        }
        let shown = Notification::new()
            .appname(&self.app_name)
            .summary(&self.app_name)
            .body(message)
            .urgency(Urgency::Critical)
            .show();
        if let Err(e) = shown {
            error!(error = %e, "Cannot display notification!");
        }
    }

    /// Notify the user and exit with an error.
    pub fn close_shop(&self, message: &str) -> ! {
        error!("{message}");
        self.alert(message);
        std::process::exit(1)
    }
}

/// Source of keyring unlock passwords.
pub trait PasswordPrompt {
    fn ask_for_keyring_pass(&self, keyring: &str) -> Result<Password>;
}

pub fn prompt_text(keyring: &str) -> String {
    format!("Please enter the password to unlock the keyring \"{keyring}\"")
}

/// Asks through an external dialog program.
///
/// The prompt text is appended as the last argument; the program's
/// trimmed stdout is the password.
#[derive(Debug)]
pub struct DialogPrompt {
    command: Vec<String>,
    stderr: Option<File>,
}

impl DialogPrompt {
    pub fn new(command: Vec<String>) -> Self {
        Self {
            command,
            stderr: None,
        }
    }

    /// `zenity --entry --hide-text --title <app_name> --text <prompt>`
    pub fn zenity(app_name: &str) -> Self {
        Self::new(
            ["zenity", "--entry", "--hide-text", "--title", app_name, "--text"]
                .into_iter()
                .map(String::from)
                .collect(),
        )
    }

    /// Send the dialog's own stderr here instead of the inherited descriptor.
    pub fn with_stderr(mut self, stderr: File) -> Self {
        self.stderr = Some(stderr);
        self
    }
}

impl PasswordPrompt for DialogPrompt {
    fn ask_for_keyring_pass(&self, keyring: &str) -> Result<Password> {
        let (program, args) = self.command.split_first().ok_or(Error::NoPassword)?;
        let stderr = match &self.stderr {
            Some(file) => Stdio::from(file.try_clone()?),
            None => Stdio::inherit(),
        };
        let output = Command::new(program)
            .args(args)
            .arg(prompt_text(keyring))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(stderr)
            .output()
            .map_err(|e| {
                warn!(program = %program, error = %e, "could not run password dialog");
                Error::NoPassword
            })?;
        let mut password = Password::new(output.stdout);
        if !output.status.success() {
            debug!(status = %output.status, "password dialog cancelled");
            return Err(Error::NoPassword);
        }
        password.trim();
        Ok(password)
    }
}

/// The treasurer's assistant for everything that involves the user.
pub struct Clerk<R = File> {
    prompt: Box<dyn PasswordPrompt>,
    channel: Option<ErrorChannel<R>>,
}

impl<R: Read> Clerk<R> {
    pub fn new(prompt: Box<dyn PasswordPrompt>, channel: Option<ErrorChannel<R>>) -> Self {
        Self { prompt, channel }
    }

    /// Ask the user for the password to the given keyring.
    pub fn ask_for_keyring_pass(&self, keyring: &str) -> Result<Password> {
        self.prompt.ask_for_keyring_pass(keyring)
    }

    /// The error text to classify for a failed store call.
    ///
    /// A line the keyring library printed to the captured stderr wins over
    /// the failure's own message. Lines are taken oldest first, so an
    /// unrelated line left on stderr earlier masks the failure's own text
    /// for one call.
    pub fn keyring_error(&mut self, failure: &Failure) -> String {
        self.channel
            .as_mut()
            .and_then(|channel| channel.next_error())
            .unwrap_or_else(|| message_of(&failure.diagnostic).to_string())
    }
}
