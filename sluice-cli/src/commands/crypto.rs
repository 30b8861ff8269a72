//! Credential encryption commands

use anyhow::{Context, Result};

use crate::config::Config;

pub fn encrypt(config: &Config, plaintext: &str) -> Result<()> {
    let store = config.credential_store()?;
    println!("{}", store.encrypt(plaintext));
    Ok(())
}

pub fn decrypt(config: &Config, ciphertext: &str) -> Result<()> {
    let store = config.credential_store()?;
    let plaintext = store
        .decrypt(ciphertext)
        .context("Failed to decrypt value")?;
    println!("{plaintext}");
    Ok(())
}
