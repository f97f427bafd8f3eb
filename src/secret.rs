/*!

Sensitive byte buffers.

Unlock passwords and fetched secrets live in a [`Password`], which
overwrites its bytes with random values when dropped.

This is defense in depth, not a guarantee. The length of the buffer is
left intact, the random source is not cryptographic, and copies made
elsewhere (by libdbus while marshalling, by the dialog's pipe, or by an
allocator moving a growing `Vec`) are out of reach.

*/

use std::fmt;

/// Overwrite every byte of `buf` with random values.
pub fn shred(buf: &mut [u8]) {
    buf.iter_mut().for_each(|b| *b = fastrand::u8(..));
}

/// A secret byte buffer that shreds itself on drop.
#[derive(Default, PartialEq, Eq)]
pub struct Password(Vec<u8>);

impl Password {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Shred the contents now. The buffer keeps its length.
    pub fn shred(&mut self) {
        shred(&mut self.0);
    }

    /// Strip leading and trailing ASCII whitespace in place.
    ///
    /// The kept bytes move to the front of the buffer; every byte past the
    /// new length is shredded before the buffer is shortened, so nothing
    /// lingers in the spare capacity.
    pub fn trim(&mut self) {
        let start = self
            .0
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(self.0.len());
        let end = self
            .0
            .iter()
            .rposition(|b| !b.is_ascii_whitespace())
            .map_or(start, |i| i + 1);
        let kept = end - start;
        self.0.copy_within(start..end, 0);
        shred(&mut self.0[kept..]);
        self.0.truncate(kept);
    }
}

impl From<Vec<u8>> for Password {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl Drop for Password {
    fn drop(&mut self) {
        self.shred();
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Password([REDACTED; {}])", self.0.len())
    }
}
