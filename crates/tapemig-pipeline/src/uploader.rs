//! Object storage upload through the AWS CLI.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tapemig_config::UploaderConfig;
use tapemig_core::{CoreError, CoreResult, Uploader};
use tokio::process::Command;
use tracing::info;
use walkdir::WalkDir;

use crate::tools::run_tool;

const UPLOADER: &str = "uploader";

/// Uploads a directory with `aws s3 cp --recursive`, preserving relative paths.
#[derive(Debug, Clone)]
pub struct AwsCliUploader {
    executable: PathBuf,
    bucket: String,
    prefix: String,
    endpoint_url: Option<String>,
    verify_ssl: bool,
}

impl AwsCliUploader {
    /// Upload into `s3://<bucket>/<prefix>/` using `executable`.
    #[must_use]
    pub fn new(
        executable: impl Into<PathBuf>,
        bucket: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            executable: executable.into(),
            bucket: bucket.into(),
            prefix: prefix.into(),
            endpoint_url: None,
            verify_ssl: true,
        }
    }

    /// Build from the `uploader` configuration section.
    #[must_use]
    pub fn from_config(config: &UploaderConfig) -> Self {
        Self::new(
            config.aws_executable.clone(),
            config.bucket.clone(),
            config.prefix.clone(),
        )
        .with_endpoint_url(config.endpoint_url.clone())
        .with_verify_ssl(config.verify_ssl)
    }

    /// Target a non-default S3 endpoint.
    #[must_use]
    pub fn with_endpoint_url(mut self, endpoint_url: Option<String>) -> Self {
        self.endpoint_url = endpoint_url;
        self
    }

    /// Toggle TLS certificate verification.
    #[must_use]
    pub const fn with_verify_ssl(mut self, verify_ssl: bool) -> Self {
        self.verify_ssl = verify_ssl;
        self
    }

    /// Remote destination URI, always ending in `/`.
    #[must_use]
    pub fn destination(&self) -> String {
        let prefix = self.prefix.trim_matches('/');
        if prefix.is_empty() {
            format!("s3://{}/", self.bucket)
        } else {
            format!("s3://{}/{prefix}/", self.bucket)
        }
    }

    fn arguments(&self, directory: &Path) -> Vec<OsString> {
        let mut source = directory.as_os_str().to_os_string();
        source.push("/");
        let mut args: Vec<OsString> = vec![
            "s3".into(),
            "cp".into(),
            source,
            self.destination().into(),
            "--recursive".into(),
            "--only-show-errors".into(),
        ];
        if let Some(endpoint) = &self.endpoint_url {
            args.push("--endpoint-url".into());
            args.push(endpoint.into());
        }
        if !self.verify_ssl {
            args.push("--no-verify-ssl".into());
        }
        args
    }
}

#[async_trait]
impl Uploader for AwsCliUploader {
    async fn upload_dir(&self, directory: &Path) -> CoreResult<usize> {
        let root = directory.to_path_buf();
        let files = tokio::task::spawn_blocking(move || count_files(&root))
            .await
            .map_err(|source| CoreError::Task {
                operation: "upload.count_files",
                source: Box::new(source),
            })??;
        if files == 0 {
            info!(directory = %directory.display(), "nothing to upload");
            return Ok(0);
        }

        info!(
            directory = %directory.display(),
            destination = %self.destination(),
            files,
            "uploading directory"
        );
        let mut command = Command::new(&self.executable);
        command.args(self.arguments(directory));
        run_tool(UPLOADER, &self.executable, command).await?;
        info!(files, destination = %self.destination(), "upload finished");
        Ok(files)
    }
}

fn count_files(root: &Path) -> CoreResult<usize> {
    if !root.exists() {
        return Ok(0);
    }
    let mut files = 0;
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(root).to_path_buf();
            CoreError::io("upload.count_files", path, err.into())
        })?;
        // Symbolic link trees are uploaded through the links.
        if !entry.file_type().is_dir() {
            files += 1;
        }
    }
    Ok(files)
}
