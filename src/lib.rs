/*!

# treasurer: fetch secrets from the desktop keyring

This crate backs the `treasurer` command, which prints a secret stored in
a gnome-keyring (or any freedesktop
[Secret Service](https://specifications.freedesktop.org/secret-service/)
provider) so it can be piped into other tools:

```shell
treasurer Login github | xclip -selection clipboard
treasurer --list Login
```

## Keyrings and hints

A keyring is a Secret Service collection, named by its label. The name
`default` addresses the default collection regardless of its label.
A hint is the label of an item in that collection. If several items
share a label, the first one the service returns wins.

## Locked keyrings

If the keyring is locked, the treasurer asks for its password through an
external dialog (`zenity` unless `--ask-pass` or `TREASURER_ASKPASS` name
another program), unlocks the keyring and retries once. A wrong password,
a cancelled dialog, or a keyring that is still locked after unlocking are
all fatal.

Unlocking with a known password uses gnome-keyring's
`InternalUnsupportedGuiltRiddenInterface`, so it only works against
gnome-keyring.

## Failures

Every failure ends the process with status 1 after a critical desktop
notification. The service's failures arrive as text, either in a D-Bus
error or printed by libdbus on stderr, which is why the binary captures
its own stderr (see [`channel`]) and classifies what it reads there
(see [`errors::classify`]).

## Secrets in memory

Passwords and secrets are held in [`secret::Password`], which overwrites
its bytes with random data when dropped. That does not erase copies made
by libdbus, by the standard output buffer, or by the allocator, and the
length stays visible. Treat it as a mitigation, not a guarantee.

 */

pub mod channel;
pub mod clerk;
pub mod cli;
pub mod errors;
pub mod secret;
mod service;
pub mod store;
pub use errors::{Error, Result};
pub use service::Service;
pub use store::{Treasurer, Vault};
