//! Print an Argon2id digest for a password, for seeding users by hand.
//!
//! Usage: `hollow-hash <password>`

use hollow_api::{CredentialHasher, HasherConfig};

fn main() -> anyhow::Result<()> {
    let password = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: hollow-hash <password>"))?;

    let hasher = CredentialHasher::new(&HasherConfig::default())?;
    println!("{}", hasher.hash(&password)?);
    Ok(())
}
