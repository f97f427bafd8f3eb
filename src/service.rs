/*!

Secret Service access.

This module implements [`Vault`] on top of the freedesktop Secret Service.
Keyrings are collections, found by their label; items are listed and read
through dbus-secret-service.

The Secret Service API has no call for unlocking with a known password,
so unlocking goes through gnome-keyring's internal interface on a
separate session-bus connection.

*/

#[cfg(not(any(feature = "crypto-rust", feature = "crypto-openssl")))]
compile_error!("You must enable one of the features crypto-rust or crypto-openssl");

use dbus_secret_service::{Collection, EncryptionType, SecretService};
use tracing::debug;

use crate::errors::{Error, Failure, LOCKED_COLLECTION, Result, decode_error};
use crate::secret::Password;
use crate::store::Vault;

pub struct Service {
    ss: SecretService,
}

impl Service {
    /// Connect to the Secret Service on the session bus.
    pub fn new() -> Result<Self> {
        let ss = SecretService::connect(EncryptionType::Dh)
            .map_err(|e| Error::ServiceUnavailable(decode_error(e).diagnostic))?;
        Ok(Self { ss })
    }

    /// The named collection, which must exist and be unlocked.
    fn unlocked_collection(&self, keyring: &str) -> std::result::Result<Collection<'_>, Failure> {
        let collection = self.collection(keyring)?;
        if collection.is_locked().map_err(decode_error)? {
            return Err(Failure::new(LOCKED_COLLECTION));
        }
        Ok(collection)
    }

    fn collection(&self, keyring: &str) -> std::result::Result<Collection<'_>, Failure> {
        util::find_collection(&self.ss, keyring)?
            .ok_or_else(|| Failure::new(format!("There is no keyring named \"{keyring}\"")))
    }
}

impl Vault for Service {
    fn has_keyring(&self, keyring: &str) -> std::result::Result<bool, Failure> {
        Ok(util::find_collection(&self.ss, keyring)?.is_some())
    }

    fn labels(&self, keyring: &str) -> std::result::Result<Vec<String>, Failure> {
        let collection = self.unlocked_collection(keyring)?;
        let items = collection.get_all_items().map_err(decode_error)?;
        debug!(keyring, count = items.len(), "listing items");
        items
            .iter()
            .map(|item| item.get_label().map_err(decode_error))
            .collect()
    }

    fn secret(&self, keyring: &str, label: &str) -> std::result::Result<Option<Password>, Failure> {
        let collection = self.unlocked_collection(keyring)?;
        for item in collection.get_all_items().map_err(decode_error)? {
            if item.get_label().map_err(decode_error)? == label {
                debug!(keyring, label, "found item");
                let secret = item.get_secret().map_err(decode_error)?;
                return Ok(Some(Password::new(secret)));
            }
        }
        Ok(None)
    }

    fn unlock(&self, keyring: &str, password: &Password) -> std::result::Result<(), Failure> {
        let collection = self.collection(keyring)?;
        util::unlock_with_password(&collection.path, password.expose())
    }

    fn lock(&self, keyring: &str) -> std::result::Result<(), Failure> {
        let collection = self.collection(keyring)?;
        collection.lock().map_err(decode_error)
    }
}

/// Secret Service utilities: private because they are only called from
/// the methods of [`Service`], which owns the connection.
mod util {
    use std::time::Duration;

    use dbus::arg::{RefArg, Variant};
    use dbus::blocking::Connection;
    use dbus_secret_service::{Collection, Error, Path, SecretService};
    use tracing::debug;

    use crate::errors::{Failure, decode_dbus_error, decode_error};

    const SS_DEST: &str = "org.freedesktop.secrets";
    const SS_PATH: &str = "/org/freedesktop/secrets";
    const SS_SERVICE: &str = "org.freedesktop.Secret.Service";
    const SS_SESSION: &str = "org.freedesktop.Secret.Session";
    const GNOME_INTERNAL: &str = "org.gnome.keyring.InternalUnsupportedGuiltRiddenInterface";
    const TIMEOUT: Duration = Duration::from_secs(30);

    /// Find the secret service collection whose label is the given name.
    ///
    /// The name `default` is treated specially and is interpreted as naming
    /// the default collection regardless of its label (which might be different).
    /// Collections are never unlocked here.
    pub(crate) fn find_collection<'a>(
        ss: &'a SecretService,
        name: &str,
    ) -> Result<Option<Collection<'a>>, Failure> {
        if name.eq("default") {
            return match ss.get_default_collection() {
                Ok(c) => Ok(Some(c)),
                Err(Error::NoResult) => Ok(None),
                Err(e) => Err(decode_error(e)),
            };
        }
        let all = ss.get_all_collections().map_err(decode_error)?;
        Ok(all
            .into_iter()
            .find(|c| c.get_label().map(|l| l.eq(name)).unwrap_or(false)))
    }

    /// Unlock a collection with its password, without a daemon prompt.
    ///
    /// The password travels in a `plain` session: the session bus is
    /// local to the user, and this is the transfer gnome-keyring's own
    /// tools use.
    pub(crate) fn unlock_with_password(
        collection: &Path<'static>,
        password: &[u8],
    ) -> Result<(), Failure> {
        let conn = Connection::new_session().map_err(decode_dbus_error)?;
        let service = conn.with_proxy(SS_DEST, SS_PATH, TIMEOUT);
        let (_, session): (Variant<Box<dyn RefArg>>, Path<'static>) = service
            .method_call(SS_SERVICE, "OpenSession", ("plain", Variant("")))
            .map_err(decode_dbus_error)?;

        let secret = (session.clone(), Vec::<u8>::new(), password, "text/plain");
        let unlocked: Result<(), dbus::Error> = service.method_call(
            GNOME_INTERNAL,
            "UnlockWithMasterPassword",
            (collection.clone(), secret),
        );

        let closed: Result<(), dbus::Error> = conn
            .with_proxy(SS_DEST, session, TIMEOUT)
            .method_call(SS_SESSION, "Close", ());
        if let Err(e) = closed {
            debug!(error = %e, "could not close secret session");
        }
        unlocked.map_err(decode_dbus_error)
    }
}
