use crate::error::ArchiveError;
use anyhow::Result;
use chrono::{DateTime, TimeZone};
use regex::Regex;
use std::fs::{self, File};
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// A downloaded zip held in memory together with the directory name it will
/// be extracted into.
#[derive(Debug)]
pub struct DownloadBundle {
    pub bytes: Vec<u8>,
    pub dir_name: String,
}

#[derive(Debug)]
pub struct Extraction {
    pub directory: PathBuf,
    pub files: Vec<PathBuf>,
}

impl DownloadBundle {
    pub fn new<Tz: TimeZone>(bytes: Vec<u8>, scene_id: &str, timestamp: &DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            bytes,
            dir_name: directory_name(timestamp, scene_id),
        }
    }

    /// Extracts every entry under `output_folder/<dir_name>`. The archive is
    /// opened before anything is created on disk, so a corrupt payload
    /// leaves no directory behind.
    pub fn extract(self: Self, output_folder: &Path) -> Result<Extraction> {
        let mut archive = ZipArchive::new(Cursor::new(self.bytes)).map_err(ArchiveError::from)?;

        let directory = unique_directory(&output_folder.join(&self.dir_name));
        fs::create_dir_all(&directory)?;

        let mut files = vec![];
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(ArchiveError::from)?;
            let relative = entry
                .enclosed_name()
                .ok_or_else(|| ArchiveError::UnsafeEntry(entry.name().to_string()))?;
            let path = directory.join(relative);

            if entry.is_dir() {
                fs::create_dir_all(&path)?;
                continue;
            }
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut file = File::create(&path)?;
            io::copy(&mut entry, &mut file)?;
            files.push(path);
        }

        Ok(Extraction { directory, files })
    }
}

/// `<YYYYMMDD_HHMMSS>_<scene>` where `<scene>` is the last segment of the
/// catalog id.
pub fn directory_name<Tz: TimeZone>(timestamp: &DateTime<Tz>, scene_id: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{}_{}", timestamp.format(TIMESTAMP_FORMAT), scene_slug(scene_id))
}

pub fn scene_slug(scene_id: &str) -> String {
    let re = Regex::new(r"[^A-Za-z0-9_.-]+").expect("Regex pattern should always compile");
    let last = scene_id
        .rsplit('/')
        .find(|s| !s.is_empty())
        .unwrap_or("scene");
    re.replace_all(last, "_").into_owned()
}

/// Appends `-1`, `-2`, ... until the path does not exist yet.
fn unique_directory(base: &Path) -> PathBuf {
    if !base.exists() {
        return base.to_path_buf();
    }
    let name = base
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    (1..)
        .map(|n| base.with_file_name(format!("{}-{}", name, n)))
        .find(|p| !p.exists())
        .unwrap_or_else(|| base.to_path_buf())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Local, Utc};
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    pub(crate) fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 2).unwrap()
    }

    #[test]
    fn test_directory_name() {
        let name = directory_name(&fixed_time(), "LANDSAT/LC08/C01/T1_SR/LC08_044034_20170614");
        assert_eq!(name, "20240309_070502_LC08_044034_20170614");
    }

    #[test]
    fn test_directory_name_matches_timestamp_pattern() {
        let name = directory_name(&Local::now(), "COLL/scene 1");
        let re = Regex::new(r"^\d{8}_\d{6}_scene_1$").unwrap();
        assert!(re.is_match(&name), "{name}");
    }

    #[test]
    fn test_scene_slug() {
        assert_eq!(scene_slug("a/b/c"), "c");
        assert_eq!(scene_slug("trailing/"), "trailing");
        assert_eq!(scene_slug("we:ird*name"), "we_ird_name");
        assert_eq!(scene_slug(""), "scene");
    }

    #[test]
    fn test_extract_all_entries() {
        let temp = TempDir::new().unwrap();
        let bytes = zip_bytes(&[
            ("scene.B1.tif", "band one"),
            ("scene.B2.tif", "band two"),
            ("meta/info.txt", "nested"),
        ]);
        let bundle = DownloadBundle::new(bytes, "COLL/scene", &fixed_time());
        let extraction = bundle.extract(temp.path()).unwrap();

        assert_eq!(
            extraction.directory,
            temp.path().join("20240309_070502_scene")
        );
        assert_eq!(extraction.files.len(), 3);
        assert_eq!(
            fs::read(extraction.directory.join("scene.B2.tif")).unwrap(),
            b"band two"
        );
        assert_eq!(
            fs::read(extraction.directory.join("meta").join("info.txt")).unwrap(),
            b"nested"
        );
    }

    #[test]
    fn test_same_second_same_scene_does_not_merge() {
        let temp = TempDir::new().unwrap();
        let first = DownloadBundle::new(zip_bytes(&[("a.tif", "1")]), "COLL/s", &fixed_time())
            .extract(temp.path())
            .unwrap();
        let second = DownloadBundle::new(zip_bytes(&[("a.tif", "2")]), "COLL/s", &fixed_time())
            .extract(temp.path())
            .unwrap();

        assert_ne!(first.directory, second.directory);
        assert_eq!(fs::read_to_string(first.directory.join("a.tif")).unwrap(), "1");
        assert_eq!(fs::read_to_string(second.directory.join("a.tif")).unwrap(), "2");
    }

    #[test]
    fn test_corrupt_archive() {
        let temp = TempDir::new().unwrap();
        let payload = b"<html>quota exceeded</html>".to_vec();
        let bundle = DownloadBundle::new(payload, "COLL/s", &fixed_time());
        let err = bundle.extract(temp.path()).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ArchiveError>(),
            Some(ArchiveError::Corrupt(_))
        ));
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_rejects_entries_outside_destination() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("out");
        let bytes = zip_bytes(&[("../escaped.txt", "nope")]);
        let err = DownloadBundle::new(bytes, "COLL/s", &fixed_time())
            .extract(&output)
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ArchiveError>(),
            Some(ArchiveError::UnsafeEntry(_))
        ));
        assert!(!temp.path().join("escaped.txt").exists());
    }
}
