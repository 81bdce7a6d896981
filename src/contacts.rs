/// Contact resolution for the monitored lab
use std::collections::{HashMap, HashSet};
use std::path::Path;

use log::{debug, warn};

/// Read the do-not-contact list: one user per line, only the first
/// comma-separated column counts, blank lines and `#` comments are skipped.
///
/// A missing or unreadable file excludes nobody.
pub fn read_no_contact(path: &Path) -> HashSet<String> {
    match std::fs::read_to_string(path) {
        Ok(raw) => raw
            .lines()
            .filter_map(|line| line.split(',').next())
            .map(str::trim)
            .filter(|user| !user.is_empty() && !user.starts_with('#'))
            .map(str::to_string)
            .collect(),
        Err(e) => {
            warn!("Could not read do-not-contact list {}: {}", path.display(), e);
            HashSet::new()
        }
    }
}

/// Addresses of every lab user not on the exclusion list, in lab-user order.
pub fn resolve_contacts(
    lab_users: &[String],
    directory: &HashMap<String, Vec<String>>,
    excluded: &HashSet<String>,
) -> Vec<String> {
    let mut addresses = Vec::new();
    for user in lab_users {
        if excluded.contains(user) {
            debug!("Skipping {} (do not contact)", user);
            continue;
        }
        match directory.get(user) {
            Some(entries) => {
                for address in entries {
                    if !addresses.contains(address) {
                        addresses.push(address.clone());
                    }
                }
            }
            None => warn!("Lab user {} has no contact entry", user),
        }
    }
    addresses
}
