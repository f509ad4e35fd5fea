//! Password digests.
//!
//! Credentials are stored as an unsalted SHA-224 hex digest so that existing
//! reader rows keep working. Login compares digests for equality, which
//! requires the transform to be deterministic.
//!
//! Unsalted fast hashes are weak against offline attacks. Moving to a salted
//! slow hash means a migration of every stored credential.

use sha2::{Digest, Sha224};

pub fn hash(password: &str) -> String {
	format!("{:x}", Sha224::digest(password.as_bytes()))
}
