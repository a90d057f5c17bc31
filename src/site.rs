//! Multi-site support.
//!
//! This module handles site discovery, naming conventions, and site-specific
//! database file management. Sites are stored as individual JSON files with
//! the naming convention: `<site_name>_site.json`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::db::Database;

/// Represents a construction site with its name and database file path.
#[derive(Debug, Clone)]
pub struct Site {
    pub name: String,
    pub display_name: String,
    pub file_path: PathBuf,
}

impl Site {
    /// Create a new site with the given display name.
    pub fn new(display_name: &str, ct_dir: &Path) -> Self {
        let name = sanitize_site_name(display_name);
        let file_path = ct_dir.join(format!("{}_site.json", name));

        Site {
            name,
            display_name: display_name.to_string(),
            file_path,
        }
    }

    /// Load a site from an existing database file.
    pub fn from_file(file_path: PathBuf) -> Option<Self> {
        let file_name = file_path.file_stem()?.to_str()?;

        if !file_name.ends_with("_site") {
            return None;
        }

        let name = file_name.strip_suffix("_site")?;
        let display_name = name.replace('_', " ");

        Some(Site {
            name: name.to_string(),
            display_name,
            file_path,
        })
    }

    /// Create the database file for this site if it doesn't exist.
    pub fn create_if_not_exists(&self) -> Result<(), std::io::Error> {
        if !self.file_path.exists() {
            let db = Database::default();
            db.save(&self.file_path)?;
        }
        Ok(())
    }
}

/// Convert a display name to a safe site name for file naming.
/// Converts to lowercase and replaces spaces with underscores.
pub fn sanitize_site_name(display_name: &str) -> String {
    display_name
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .split('_')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Discover all existing sites in the CT directory.
pub fn discover_sites(ct_dir: &Path) -> Result<Vec<Site>, std::io::Error> {
    let mut sites = Vec::new();

    if !ct_dir.exists() {
        return Ok(sites);
    }

    for entry in fs::read_dir(ct_dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_file() {
            if let Some(site) = Site::from_file(path) {
                sites.push(site);
            }
        }
    }

    // Sort sites by display name
    sites.sort_by(|a, b| a.display_name.cmp(&b.display_name));

    Ok(sites)
}

/// Create a new site with the given name.
pub fn create_site(display_name: &str, ct_dir: &Path) -> Result<Site, Box<dyn std::error::Error>> {
    if display_name.trim().is_empty() {
        return Err("Site name cannot be empty".into());
    }

    let site = Site::new(display_name, ct_dir);

    if site.file_path.exists() {
        return Err(format!("Site '{}' already exists", display_name).into());
    }

    site.create_if_not_exists()?;

    Ok(site)
}

/// Find the most recently modified site in the CT directory.
pub fn get_most_recent_site(ct_dir: &Path) -> Result<Option<Site>, std::io::Error> {
    let sites = discover_sites(ct_dir)?;

    if sites.is_empty() {
        return Ok(None);
    }

    let mut most_recent: Option<(Site, std::time::SystemTime)> = None;

    for site in sites {
        if let Ok(metadata) = fs::metadata(&site.file_path) {
            if let Ok(modified) = metadata.modified() {
                match most_recent {
                    None => most_recent = Some((site, modified)),
                    Some((_, current_time)) => {
                        if modified > current_time {
                            most_recent = Some((site, modified));
                        }
                    }
                }
            }
        }
    }

    Ok(most_recent.map(|(site, _)| site))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_site_name() {
        assert_eq!(sanitize_site_name("North Tower"), "north_tower");
        assert_eq!(sanitize_site_name("Dock-7_Extension"), "dock_7_extension");
        assert_eq!(sanitize_site_name("Quai! Est"), "quai_est");
        assert_eq!(sanitize_site_name("  Multiple   Spaces  "), "multiple_spaces");
        assert_eq!(sanitize_site_name(""), "");
    }
}
