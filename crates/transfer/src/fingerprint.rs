use sha2::{Digest, Sha256};

use crate::types::FileDescriptor;

/// Derives the stable local identity of a picked file.
///
/// Hashes name, modification time and byte size, so picking the same file
/// twice yields the same identity while a re-saved copy does not. The
/// contents are not read.
pub fn fingerprint(file: &FileDescriptor) -> String {
    let mut hasher = Sha256::new();
    hasher.update(file.name.as_bytes());
    hasher.update([0u8]);
    hasher.update(file.modified_ms.to_le_bytes());
    hasher.update(file.size.to_le_bytes());
    hex::encode(&hasher.finalize()[..16])
}
