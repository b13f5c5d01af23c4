//! S3 backend
//!
//! Drives the AWS SDK from synchronous calls through an owned current-thread
//! runtime. Works with S3-compatible services (MinIO and friends) through the
//! `endpoint_url` fs argument.

use crate::backend::{clean_path, Backend, FsArgs};
use crate::error::BackendError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use std::collections::BTreeSet;
use tokio::runtime::Runtime;
use tracing::debug;

/// Backend over `s3://bucket/prefix`
///
/// S3 has no directories: `makedirs` writes a zero-byte `path/` marker so an empty
/// run or store still lists, and `rename` is a copy followed by a delete.
pub struct S3Backend {
    client: Client,
    runtime: Runtime,
    bucket: String,
    prefix: String,
    name: String,
}

impl S3Backend {
    /// Connect to `bucket`, rooting every path under `prefix`
    ///
    /// Recognised fs arguments: `endpoint_url`, `region`, `profile`.
    pub fn connect(bucket: &str, prefix: &str, fs_args: &FsArgs) -> Result<Self, BackendError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| BackendError::unavailable(format!("s3://{}", bucket), e))?;

        let endpoint = fs_args.get("endpoint_url").and_then(|v| v.as_str());
        let region = fs_args
            .get("region")
            .and_then(|v| v.as_str())
            .unwrap_or("us-east-1");
        let profile = fs_args.get("profile").and_then(|v| v.as_str());

        let client = runtime.block_on(create_s3_client(endpoint, region, profile));
        Ok(Self::with_client(client, runtime, bucket, prefix))
    }

    /// Wrap an already configured client
    pub fn with_client(client: Client, runtime: Runtime, bucket: &str, prefix: &str) -> Self {
        let prefix = clean_path(prefix).to_string();
        let name = if prefix.is_empty() {
            format!("s3://{}", bucket)
        } else {
            format!("s3://{}/{}", bucket, prefix)
        };
        Self {
            client,
            runtime,
            bucket: bucket.to_string(),
            prefix,
            name,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn key(&self, path: &str) -> String {
        let path = clean_path(path);
        match (self.prefix.is_empty(), path.is_empty()) {
            (true, _) => path.to_string(),
            (false, true) => self.prefix.clone(),
            (false, false) => format!("{}/{}", self.prefix, path),
        }
    }

    fn dir_key(&self, path: &str) -> String {
        let key = self.key(path);
        if key.is_empty() {
            key
        } else {
            format!("{}/", key)
        }
    }

    fn relative<'a>(&self, key: &'a str) -> &'a str {
        if self.prefix.is_empty() {
            key
        } else {
            key.strip_prefix(&self.prefix)
                .map(|k| k.trim_start_matches('/'))
                .unwrap_or(key)
        }
    }

    fn unavailable(&self, err: impl ToString) -> BackendError {
        BackendError::unavailable(self.name.clone(), err)
    }

    /// Every object key under `dir_key`, following continuation tokens
    fn list_keys(&self, dir_key: &str) -> Result<Vec<String>, BackendError> {
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(dir_key)
                .max_keys(1000);
            if let Some(token) = continuation_token {
                request = request.continuation_token(token);
            }

            let result = self
                .runtime
                .block_on(request.send())
                .map_err(|e| self.unavailable(e))?;

            for obj in result.contents() {
                if let Some(key) = obj.key() {
                    keys.push(key.to_string());
                }
            }

            if result.is_truncated() == Some(true) {
                continuation_token = result.next_continuation_token().map(|s| s.to_string());
            } else {
                break;
            }
        }

        Ok(keys)
    }

    fn object_exists(&self, key: &str) -> Result<bool, BackendError> {
        let result = self.runtime.block_on(
            self.client
                .head_object()
                .bucket(&self.bucket)
                .key(key)
                .send(),
        );
        match result {
            Ok(_) => Ok(true),
            Err(e) => {
                let is_not_found = e
                    .as_service_error()
                    .map(|se| se.is_not_found())
                    .unwrap_or(false);
                let status_is_404 = e
                    .raw_response()
                    .map(|r| r.status().as_u16() == 404)
                    .unwrap_or(false);
                if is_not_found || status_is_404 {
                    Ok(false)
                } else {
                    Err(self.unavailable(e))
                }
            }
        }
    }

    fn delete_key(&self, key: &str) -> Result<(), BackendError> {
        self.runtime
            .block_on(
                self.client
                    .delete_object()
                    .bucket(&self.bucket)
                    .key(key)
                    .send(),
            )
            .map_err(|e| self.unavailable(e))?;
        Ok(())
    }

    fn read_object(&self, key: &str, range: Option<String>) -> Result<Bytes, BackendError> {
        let mut request = self.client.get_object().bucket(&self.bucket).key(key);
        if let Some(range) = range {
            request = request.range(range);
        }

        let resp = self.runtime.block_on(request.send()).map_err(|e| {
            let is_not_found = e
                .as_service_error()
                .map(|se| se.is_no_such_key())
                .unwrap_or(false);
            if is_not_found {
                BackendError::NotFound(format!("s3://{}/{}", self.bucket, key))
            } else {
                self.unavailable(e)
            }
        })?;

        let data = self
            .runtime
            .block_on(resp.body.collect())
            .map_err(|e| self.unavailable(e))?
            .into_bytes();
        Ok(data)
    }
}

impl Backend for S3Backend {
    fn name(&self) -> &str {
        &self.name
    }

    fn exists(&self, path: &str) -> Result<bool, BackendError> {
        let key = self.key(path);
        if !key.is_empty() && self.object_exists(&key)? {
            return Ok(true);
        }
        let result = self
            .runtime
            .block_on(
                self.client
                    .list_objects_v2()
                    .bucket(&self.bucket)
                    .prefix(self.dir_key(path))
                    .max_keys(1)
                    .send(),
            )
            .map_err(|e| self.unavailable(e))?;
        Ok(!result.contents().is_empty())
    }

    fn list(&self, prefix: &str) -> Result<BTreeSet<String>, BackendError> {
        let dir_key = self.dir_key(prefix);
        let mut names = BTreeSet::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&dir_key)
                .delimiter("/")
                .max_keys(1000);
            if let Some(token) = continuation_token {
                request = request.continuation_token(token);
            }

            let result = self
                .runtime
                .block_on(request.send())
                .map_err(|e| self.unavailable(e))?;

            for common in result.common_prefixes() {
                if let Some(p) = common.prefix() {
                    let name = p[dir_key.len().min(p.len())..].trim_end_matches('/');
                    if !name.is_empty() {
                        names.insert(name.to_string());
                    }
                }
            }
            for obj in result.contents() {
                if let Some(key) = obj.key() {
                    let name = &key[dir_key.len().min(key.len())..];
                    if !name.is_empty() {
                        names.insert(name.to_string());
                    }
                }
            }

            if result.is_truncated() == Some(true) {
                continuation_token = result.next_continuation_token().map(|s| s.to_string());
            } else {
                break;
            }
        }

        debug!(backend = %self.name, prefix, count = names.len(), "Listed prefix");
        Ok(names)
    }

    fn get(&self, path: &str) -> Result<Bytes, BackendError> {
        self.read_object(&self.key(path), None)
    }

    fn get_range(&self, path: &str, offset: u64, len: usize) -> Result<Bytes, BackendError> {
        if len == 0 {
            return Ok(Bytes::new());
        }
        // Range header is inclusive on both ends
        let range = format!("bytes={}-{}", offset, offset + len as u64 - 1);
        let data = self.read_object(&self.key(path), Some(range))?;
        if data.len() != len {
            return Err(BackendError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("Short range read from {}: wanted {}, got {}", path, len, data.len()),
            )));
        }
        Ok(data)
    }

    fn put(&self, path: &str, data: &[u8]) -> Result<(), BackendError> {
        let key = self.key(path);
        self.runtime
            .block_on(
                self.client
                    .put_object()
                    .bucket(&self.bucket)
                    .key(&key)
                    .body(ByteStream::from(data.to_vec()))
                    .send(),
            )
            .map_err(|e| self.unavailable(e))?;
        debug!(backend = %self.name, path, bytes = data.len(), "Wrote object");
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<(), BackendError> {
        let key = self.key(path);
        let mut found = false;
        if self.object_exists(&key)? {
            self.delete_key(&key)?;
            found = true;
        }
        for child in self.list_keys(&self.dir_key(path))? {
            self.delete_key(&child)?;
            found = true;
        }
        if found {
            Ok(())
        } else {
            Err(BackendError::NotFound(format!("s3://{}/{}", self.bucket, key)))
        }
    }

    fn makedirs(&self, path: &str) -> Result<(), BackendError> {
        let marker = self.dir_key(path);
        if marker.is_empty() {
            return Ok(());
        }
        self.runtime
            .block_on(
                self.client
                    .put_object()
                    .bucket(&self.bucket)
                    .key(&marker)
                    .body(ByteStream::from(Vec::new()))
                    .send(),
            )
            .map_err(|e| self.unavailable(e))?;
        Ok(())
    }

    fn rename(&self, from: &str, to: &str) -> Result<(), BackendError> {
        if self.exists(to)? {
            self.delete(to)?;
        }

        let from_key = self.key(from);
        let to_key = self.key(to);
        let mut sources = self.list_keys(&self.dir_key(from))?;
        if self.object_exists(&from_key)? {
            sources.push(from_key.clone());
        }
        if sources.is_empty() {
            return Err(BackendError::NotFound(format!("s3://{}/{}", self.bucket, from_key)));
        }

        for source in sources {
            let target = format!("{}{}", to_key, &source[from_key.len()..]);
            self.runtime
                .block_on(
                    self.client
                        .copy_object()
                        .bucket(&self.bucket)
                        .copy_source(format!("{}/{}", self.bucket, source))
                        .key(&target)
                        .send(),
                )
                .map_err(|e| self.unavailable(e))?;
            self.delete_key(&source)?;
        }
        Ok(())
    }

    fn walk(&self, prefix: &str) -> Result<Vec<String>, BackendError> {
        let mut files: Vec<String> = self
            .list_keys(&self.dir_key(prefix))?
            .into_iter()
            .filter(|k| !k.ends_with('/'))
            .map(|k| self.relative(&k).to_string())
            .collect();
        let key = self.key(prefix);
        if !key.is_empty() && self.object_exists(&key)? {
            files.push(self.relative(&key).to_string());
        }
        files.sort();
        Ok(files)
    }
}

/// Create an S3 client with optional custom endpoint, region and profile.
///
/// S3-compatible services need path-style addressing, so it is forced whenever
/// a custom endpoint is given.
pub async fn create_s3_client(endpoint_url: Option<&str>, region: &str, profile: Option<&str>) -> Client {
    let region = aws_config::Region::new(region.to_string());
    let mut config_loader =
        aws_config::defaults(aws_config::BehaviorVersion::latest()).region(region);

    if let Some(endpoint) = endpoint_url {
        config_loader = config_loader.endpoint_url(endpoint);
    }
    if let Some(profile) = profile {
        config_loader = config_loader.profile_name(profile);
    }

    let sdk_config = config_loader.load().await;

    let s3_config = if endpoint_url.is_some() {
        aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build()
    } else {
        aws_sdk_s3::config::Builder::from(&sdk_config).build()
    };

    Client::from_conf(s3_config)
}
