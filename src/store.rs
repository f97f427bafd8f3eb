/*!

The treasurer: list and fetch secrets from one keyring.

A [`Treasurer`] talks to the storage service through the [`Vault`] trait
and to the user through a [`Clerk`]. When the service reports the keyring
as locked, the treasurer asks the clerk for the keyring password, unlocks,
and retries the original call once.

*/

use std::fs::File;
use std::io::Read;

use tracing::{debug, warn};

use crate::clerk::Clerk;
use crate::errors::{Error, ErrorKind, Failure, Result, classify};
use crate::secret::Password;

/// The calls the treasurer needs from a secret storage service.
///
/// Keyrings are addressed by name. Every failure carries the service's
/// diagnostic text so the treasurer can classify it.
pub trait Vault {
    /// Whether a keyring with this name exists.
    fn has_keyring(&self, keyring: &str) -> std::result::Result<bool, Failure>;

    /// Labels of all items in the keyring, in the service's order.
    fn labels(&self, keyring: &str) -> std::result::Result<Vec<String>, Failure>;

    /// Secret of the first item carrying `label`, if any.
    fn secret(&self, keyring: &str, label: &str) -> std::result::Result<Option<Password>, Failure>;

    fn unlock(&self, keyring: &str, password: &Password) -> std::result::Result<(), Failure>;

    fn lock(&self, keyring: &str) -> std::result::Result<(), Failure>;
}

impl<V: Vault + ?Sized> Vault for &V {
    fn has_keyring(&self, keyring: &str) -> std::result::Result<bool, Failure> {
        (**self).has_keyring(keyring)
    }

    fn labels(&self, keyring: &str) -> std::result::Result<Vec<String>, Failure> {
        (**self).labels(keyring)
    }

    fn secret(&self, keyring: &str, label: &str) -> std::result::Result<Option<Password>, Failure> {
        (**self).secret(keyring, label)
    }

    fn unlock(&self, keyring: &str, password: &Password) -> std::result::Result<(), Failure> {
        (**self).unlock(keyring, password)
    }

    fn lock(&self, keyring: &str) -> std::result::Result<(), Failure> {
        (**self).lock(keyring)
    }
}

pub struct Treasurer<V, R = File> {
    vault: V,
    clerk: Clerk<R>,
    keyring: String,
}

impl<V: Vault, R: Read> Treasurer<V, R> {
    /// Open the named keyring, failing if the service doesn't know it.
    pub fn new(vault: V, clerk: Clerk<R>, keyring: impl Into<String>) -> Result<Self> {
        let keyring = keyring.into();
        let found = vault
            .has_keyring(&keyring)
            .map_err(|f| Error::ServiceUnavailable(f.diagnostic))?;
        if !found {
            return Err(Error::NoSuchKeyring(keyring));
        }
        Ok(Self {
            vault,
            clerk,
            keyring,
        })
    }

    pub fn keyring(&self) -> &str {
        &self.keyring
    }

    /// List all available password hints.
    pub fn get_hints(&mut self) -> Result<Vec<String>> {
        self.with_unlock(|vault, keyring| vault.labels(keyring))
    }

    /// Retrieve the password that belongs to the given hint.
    pub fn get_password(&mut self, hint: &str) -> Result<Option<Password>> {
        self.with_unlock(|vault, keyring| vault.secret(keyring, hint))
    }

    pub fn lock_keyring(&self) -> Result<()> {
        self.vault.lock(&self.keyring).map_err(|f| {
            debug!(keyring = %self.keyring, diagnostic = %f, "lock failed");
            Error::LockFailed(self.keyring.clone())
        })
    }

    /// Run `op`, unlocking the keyring and retrying once if it reports locked.
    fn with_unlock<T>(
        &mut self,
        op: impl Fn(&V, &str) -> std::result::Result<T, Failure>,
    ) -> Result<T> {
        let mut unlocked = false;
        loop {
            let failure = match op(&self.vault, &self.keyring) {
                Ok(value) => return Ok(value),
                Err(failure) => failure,
            };
            let error = self.clerk.keyring_error(&failure);
            match classify(&error) {
                ErrorKind::Locked if unlocked => {
                    return Err(Error::StillLocked(self.keyring.clone()));
                }
                ErrorKind::Locked => {
                    warn!(keyring = %self.keyring, "keyring is locked, asking for its password");
                    self.unlock()?;
                    unlocked = true;
                }
                _ => return Err(Error::Unclassified(error)),
            }
        }
    }

    fn unlock(&mut self) -> Result<()> {
        let password = self.clerk.ask_for_keyring_pass(&self.keyring)?;
        let result = self.vault.unlock(&self.keyring, &password);
        drop(password);
        match result {
            Ok(()) => {
                debug!(keyring = %self.keyring, "unlocked");
                Ok(())
            }
            Err(failure) => {
                let error = self.clerk.keyring_error(&failure);
                match classify(&error) {
                    ErrorKind::WrongPassword => Err(Error::WrongPassword(self.keyring.clone())),
                    _ => Err(Error::Unclassified(error)),
                }
            }
        }
    }
}
