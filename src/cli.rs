/*!

Command line surface and the single retrieval flow.

*/

use std::io::{Read, Write};

use clap::{ArgAction, Parser};

use crate::errors::{Error, Result};
use crate::store::{Treasurer, Vault};

/// The treasurer commands access to your gnome keyring daemon
#[derive(Debug, Parser)]
#[command(name = "treasurer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Keyring to open (a collection label, or `default`)
    pub keyring: String,

    /// Label of the secret to print
    #[arg(required_unless_present = "list")]
    pub hint: Option<String>,

    /// Print all labels in the keyring instead of a secret
    #[arg(short, long)]
    pub list: bool,

    /// Lock the keyring before exiting
    #[arg(long)]
    pub lock: bool,

    /// Password dialog command; the prompt text is appended as its last argument
    #[arg(long, env = "TREASURER_ASKPASS", value_name = "CMD")]
    pub ask_pass: Option<String>,

    /// Increase logging verbosity
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// The dialog command split into program and arguments, if one was given.
    pub fn ask_pass_command(&self) -> Option<Vec<String>> {
        let command: Vec<String> = self
            .ask_pass
            .as_deref()?
            .split_whitespace()
            .map(String::from)
            .collect();
        (!command.is_empty()).then_some(command)
    }

    /// Default `EnvFilter` directive for the chosen verbosity.
    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 => "treasurer=warn",
            1 => "treasurer=info",
            2 => "treasurer=debug",
            _ => "treasurer=trace",
        }
    }
}

/// List labels or print one secret, then lock the keyring if asked to.
pub fn execute<V: Vault, R: Read>(
    cli: &Cli,
    treasurer: &mut Treasurer<V, R>,
    out: &mut impl Write,
) -> Result<()> {
    if cli.list {
        for hint in treasurer.get_hints()? {
            writeln!(out, "- {hint}")?;
        }
    } else if let Some(hint) = cli.hint.as_deref() {
        // an empty secret counts as missing
        let mut password = treasurer
            .get_password(hint)?
            .filter(|password| !password.is_empty())
            .ok_or_else(|| Error::NotFound {
                hint: hint.to_string(),
                keyring: treasurer.keyring().to_string(),
            })?;
        let written = out
            .write_all(password.expose())
            .and_then(|()| writeln!(out));
        password.shred();
        written?;
    }
    out.flush()?;

    if cli.lock {
        treasurer.lock_keyring()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hint_is_required_without_list() {
        assert!(Cli::try_parse_from(["treasurer", "Login"]).is_err());
        let cli = Cli::try_parse_from(["treasurer", "--list", "Login"]).unwrap();
        assert!(cli.list);
        assert_eq!(cli.hint, None);
    }

    #[test]
    fn parses_fetch_with_lock() {
        let cli = Cli::try_parse_from(["treasurer", "--lock", "-vv", "Login", "github"]).unwrap();
        assert_eq!(cli.keyring, "Login");
        assert_eq!(cli.hint.as_deref(), Some("github"));
        assert!(cli.lock);
        assert_eq!(cli.log_directive(), "treasurer=debug");
    }

    #[test]
    fn ask_pass_is_split_on_whitespace() {
        let cli = Cli::try_parse_from([
            "treasurer",
            "--ask-pass",
            "kdialog --password",
            "Login",
            "github",
        ])
        .unwrap();
        assert_eq!(
            cli.ask_pass_command(),
            Some(vec!["kdialog".to_string(), "--password".to_string()])
        );

        let blank = Cli::try_parse_from(["treasurer", "--ask-pass", " ", "Login", "x"]).unwrap();
        assert_eq!(blank.ask_pass_command(), None);
    }
}
