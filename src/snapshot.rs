//! Capture a still with an external command and upload it over HTTP.
//!
//! The whole thing is one unit: the caller gets a public reference or an error, and the
//! local file is removed either way.

use chrono::Local;
use reqwest::blocking::Client;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Placeholder in the capture command replaced by the output path.
pub const FILE_PLACEHOLDER: &str = "{file}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    Capture(String),
    Upload(String),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::Capture(msg) => write!(f, "snapshot capture failed: {msg}"),
            SnapshotError::Upload(msg) => write!(f, "snapshot upload failed: {msg}"),
        }
    }
}

impl std::error::Error for SnapshotError {}

pub trait SnapshotUploader: Send {
    /// Take one picture and return where it can be viewed.
    fn capture_and_upload(&mut self) -> Result<String, SnapshotError>;
}

#[derive(Debug, Clone)]
pub struct SnapshotSettings {
    pub capture_argv: Vec<String>,
    pub scratch_dir: PathBuf,
    pub upload_url: Option<String>,
    pub public_url: Option<String>,
}

pub struct CommandSnapshotUploader {
    settings: SnapshotSettings,
    client: Client,
}

impl CommandSnapshotUploader {
    pub fn new(settings: SnapshotSettings) -> Self {
        Self {
            settings,
            client: Client::new(),
        }
    }

    fn capture(&self, path: &Path) -> Result<(), SnapshotError> {
        let argv = capture_args(&self.settings.capture_argv, path);
        let Some((program, args)) = argv.split_first() else {
            return Err(SnapshotError::Capture("empty capture command".to_string()));
        };
        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|err| SnapshotError::Capture(format!("{program}: {err}")))?;
        if !status.success() {
            return Err(SnapshotError::Capture(format!("{program} exited with {status}")));
        }
        if !path.is_file() {
            return Err(SnapshotError::Capture(format!(
                "{program} did not write {}",
                path.display()
            )));
        }
        Ok(())
    }

    fn upload(&self, path: &Path, filename: &str) -> Result<String, SnapshotError> {
        let Some(upload_url) = self.settings.upload_url.as_deref() else {
            return Err(SnapshotError::Upload(
                "no upload target configured".to_string(),
            ));
        };
        let bytes = fs::read(path)
            .map_err(|err| SnapshotError::Upload(format!("read {}: {err}", path.display())))?;
        let response = self
            .client
            .put(join_url(upload_url, filename))
            .header(reqwest::header::CONTENT_TYPE, "image/jpeg")
            .body(bytes)
            .send()
            .map_err(|err| SnapshotError::Upload(err.to_string()))?;
        if !response.status().is_success() {
            return Err(SnapshotError::Upload(format!(
                "upload returned {}",
                response.status()
            )));
        }
        let public = self.settings.public_url.as_deref().unwrap_or(upload_url);
        Ok(join_url(public, filename))
    }
}

impl SnapshotUploader for CommandSnapshotUploader {
    fn capture_and_upload(&mut self) -> Result<String, SnapshotError> {
        let filename = snapshot_filename(Local::now());
        let path = self.settings.scratch_dir.join(&filename);
        let result = self
            .capture(&path)
            .and_then(|()| self.upload(&path, &filename));
        if path.exists() {
            if let Err(err) = fs::remove_file(&path) {
                tracing::warn!("could not remove {}: {err}", path.display());
            }
        }
        result
    }
}

pub(crate) fn snapshot_filename<Tz>(now: chrono::DateTime<Tz>) -> String
where
    Tz: chrono::TimeZone,
    Tz::Offset: fmt::Display,
{
    format!("snap{}.jpg", now.format("%Y-%m-%d--%H-%M-%S"))
}

pub(crate) fn capture_args(template: &[String], path: &Path) -> Vec<String> {
    let file = path.to_string_lossy();
    template
        .iter()
        .map(|arg| arg.replace(FILE_PLACEHOLDER, &file))
        .collect()
}

fn join_url(base: &str, filename: &str) -> String {
    format!("{}/{filename}", base.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use httpmock::prelude::*;

    fn settings(dir: &Path, capture: &[&str], upload_url: Option<&str>) -> SnapshotSettings {
        SnapshotSettings {
            capture_argv: capture.iter().map(|arg| arg.to_string()).collect(),
            scratch_dir: dir.to_path_buf(),
            upload_url: upload_url.map(str::to_string),
            public_url: None,
        }
    }

    #[test]
    fn filename_uses_timestamp_layout() {
        let when = Utc.with_ymd_and_hms(2019, 1, 25, 7, 5, 9).unwrap();
        assert_eq!(snapshot_filename(when), "snap2019-01-25--07-05-09.jpg");
    }

    #[test]
    fn placeholder_is_substituted_everywhere() {
        let template = vec![
            "cam".to_string(),
            "-o".to_string(),
            "{file}".to_string(),
            "--tag={file}".to_string(),
        ];
        let args = capture_args(&template, Path::new("/tmp/x.jpg"));
        assert_eq!(args, vec!["cam", "-o", "/tmp/x.jpg", "--tag=/tmp/x.jpg"]);
    }

    #[test]
    fn failing_capture_is_a_capture_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut uploader =
            CommandSnapshotUploader::new(settings(dir.path(), &["false"], Some("http://h")));
        assert!(matches!(
            uploader.capture_and_upload(),
            Err(SnapshotError::Capture(_))
        ));
    }

    #[test]
    fn missing_upload_target_fails_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let mut uploader =
            CommandSnapshotUploader::new(settings(dir.path(), &["touch", "{file}"], None));
        assert!(matches!(
            uploader.capture_and_upload(),
            Err(SnapshotError::Upload(_))
        ));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn public_url_joins_filename() {
        assert_eq!(join_url("http://h/snaps/", "a.jpg"), "http://h/snaps/a.jpg");
    }

    fn writing_capture() -> Vec<&'static str> {
        vec!["sh", "-c", "printf jpegbytes > \"$0\"", "{file}"]
    }

    #[test]
    fn upload_puts_the_picture_and_returns_the_public_reference() {
        let dir = tempfile::tempdir().unwrap();
        let server = MockServer::start();
        let upload = server.mock(|when, then| {
            when.method(PUT)
                .path_contains("/snaps/snap")
                .header("content-type", "image/jpeg")
                .body("jpegbytes");
            then.status(201);
        });
        let mut settings = settings(
            dir.path(),
            &writing_capture(),
            Some(&server.url("/snaps/")),
        );
        settings.public_url = Some("https://cdn.example/snaps".to_string());
        let mut uploader = CommandSnapshotUploader::new(settings);

        let reference = uploader.capture_and_upload().expect("snapshot uploaded");
        upload.assert();
        assert!(reference.starts_with("https://cdn.example/snaps/snap"));
        assert!(reference.ends_with(".jpg"));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn upload_url_is_the_reference_without_a_public_url() {
        let dir = tempfile::tempdir().unwrap();
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(PUT);
            then.status(200);
        });
        let upload_root = server.url("/snaps");
        let mut uploader = CommandSnapshotUploader::new(settings(
            dir.path(),
            &writing_capture(),
            Some(&upload_root),
        ));
        let reference = uploader.capture_and_upload().unwrap();
        assert!(reference.starts_with(&format!("{upload_root}/snap")));
    }

    #[test]
    fn rejected_upload_is_an_upload_error_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(PUT);
            then.status(500);
        });
        let mut uploader = CommandSnapshotUploader::new(settings(
            dir.path(),
            &writing_capture(),
            Some(&server.url("/snaps")),
        ));
        assert!(matches!(
            uploader.capture_and_upload(),
            Err(SnapshotError::Upload(_))
        ));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
