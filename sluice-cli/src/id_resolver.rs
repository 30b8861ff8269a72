//! ID resolver module
//!
//! Lets users name a connection by a UUID prefix or by its name instead of
//! typing the full UUID.

use anyhow::{Result, anyhow};
use uuid::Uuid;

use crate::workspace::ConnectionEntry;

/// How the user named a connection on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionSelector {
    Id(Uuid),
    /// Name, or a prefix of the UUID
    Text(String),
}

impl ConnectionSelector {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        match Uuid::parse_str(input) {
            Ok(uuid) => ConnectionSelector::Id(uuid),
            Err(_) => ConnectionSelector::Text(input.to_lowercase()),
        }
    }
}

/// Resolve a connection ID, prefix or name to a full UUID
///
/// An exact (case-insensitive) name match wins over prefix matches.
///
/// # Errors
/// Returns an error if nothing matches or if the prefix is ambiguous.
pub fn resolve_connection_id(entries: &[ConnectionEntry], selector: &ConnectionSelector) -> Result<Uuid> {
    let needle = match selector {
        ConnectionSelector::Id(uuid) => return Ok(*uuid),
        ConnectionSelector::Text(text) => text.as_str(),
    };

    if let Some(entry) = entries.iter().find(|e| e.name.to_lowercase() == needle) {
        return Ok(entry.id);
    }

    let matches: Vec<_> = entries
        .iter()
        .filter(|e| e.id.to_string().starts_with(needle))
        .collect();

    match matches.len() {
        0 => Err(anyhow!(
            "No connection found with name or ID starting with '{}'",
            needle
        )),
        1 => Ok(matches[0].id),
        _ => {
            let ids: Vec<String> = matches.iter().map(|e| e.id.to_string()).collect();
            Err(anyhow!(
                "Ambiguous prefix '{}' matches multiple connections: {}",
                needle,
                ids.join(", ")
            ))
        }
    }
}
