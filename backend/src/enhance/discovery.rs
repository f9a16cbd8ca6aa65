use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::imaging::is_image_file;

use super::handoff::HandoffNames;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryTier {
    Exact,
    Alternate,
    /// Most recent image in the directory. Racy when several runs share the
    /// output directory.
    Newest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovered {
    pub path: PathBuf,
    pub tier: DiscoveryTier,
}

/// Locate the upscaler's result: exact name, then known alternates, then the
/// newest image file in `output_dir`.
pub fn discover_output(output_dir: &Path, names: &HandoffNames) -> io::Result<Option<Discovered>> {
    let exact = names.expected_output_path(output_dir);
    if exact.is_file() {
        return Ok(Some(Discovered {
            path: exact,
            tier: DiscoveryTier::Exact,
        }));
    }

    if let Some(path) = names
        .alternates()
        .into_iter()
        .map(|name| output_dir.join(name))
        .find(|path| path.is_file())
    {
        return Ok(Some(Discovered {
            path,
            tier: DiscoveryTier::Alternate,
        }));
    }

    Ok(newest_image(output_dir)?.map(|path| Discovered {
        path,
        tier: DiscoveryTier::Newest,
    }))
}

fn newest_image(dir: &Path) -> io::Result<Option<PathBuf>> {
    if !dir.is_dir() {
        return Ok(None);
    }

    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !is_image_file(&path) {
            continue;
        }
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        let stamp = metadata.created().or_else(|_| metadata.modified())?;
        if newest.as_ref().is_none_or(|(best, _)| stamp > *best) {
            newest = Some((stamp, path));
        }
    }
    Ok(newest.map(|(_, path)| path))
}

/// File names in `dir`, for error reports.
pub fn list_dir(dir: &Path) -> Vec<String> {
    match fs::read_dir(dir) {
        Ok(entries) => {
            let mut names: Vec<String> = entries
                .filter_map(Result::ok)
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect();
            names.sort();
            names
        }
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"x").unwrap();
        path
    }

    #[test]
    fn exact_name_wins_over_everything() {
        let dir = TempDir::new().unwrap();
        let names = HandoffNames::fresh("plantcare", "png");
        touch(dir.path(), &format!("{}.png", names.stem()));
        let exact = touch(dir.path(), &names.expected_output());

        let found = discover_output(dir.path(), &names).unwrap().unwrap();
        assert_eq!(found.tier, DiscoveryTier::Exact);
        assert_eq!(found.path, exact);
    }

    #[test]
    fn alternates_are_checked_in_order() {
        let dir = TempDir::new().unwrap();
        let names = HandoffNames::fresh("plantcare", "png");
        touch(dir.path(), &format!("{}.jpg", names.stem()));
        let preferred = touch(dir.path(), &format!("{}_out.jpg", names.stem()));

        let found = discover_output(dir.path(), &names).unwrap().unwrap();
        assert_eq!(found.tier, DiscoveryTier::Alternate);
        assert_eq!(found.path, preferred);
    }

    #[test]
    fn falls_back_to_newest_image_file() {
        let dir = TempDir::new().unwrap();
        let names = HandoffNames::fresh("plantcare", "png");
        touch(dir.path(), "older.png");
        sleep(Duration::from_millis(20));
        let newest = touch(dir.path(), "renamed_by_tool.jpeg");
        sleep(Duration::from_millis(20));
        touch(dir.path(), "notes.txt");

        let found = discover_output(dir.path(), &names).unwrap().unwrap();
        assert_eq!(found.tier, DiscoveryTier::Newest);
        assert_eq!(found.path, newest);
    }

    #[test]
    fn nothing_found_in_empty_or_missing_directory() {
        let dir = TempDir::new().unwrap();
        let names = HandoffNames::fresh("plantcare", "png");
        assert_eq!(discover_output(dir.path(), &names).unwrap(), None);
        assert_eq!(
            discover_output(&dir.path().join("absent"), &names).unwrap(),
            None
        );
    }

    #[test]
    fn listing_is_sorted() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "b.png");
        touch(dir.path(), "a.txt");
        assert_eq!(list_dir(dir.path()), vec!["a.txt", "b.png"]);
        assert!(list_dir(&dir.path().join("absent")).is_empty());
    }
}
