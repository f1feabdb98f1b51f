use std::env;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream as AwsByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::warn;

use crate::{BlobClient, BlobError, BlobResult, TransferEvent, TransferEvents};

/// S3-compatible client configuration, read from `FERRY_S3_*` environment variables
#[derive(Debug, Clone)]
pub struct S3Config {
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub endpoint_url: String,
    pub bucket: String,
}

impl S3Config {
    pub fn from_env() -> BlobResult<Self> {
        fn get_env(key: &str) -> BlobResult<String> {
            env::var(key)
                .map_err(|_| BlobError::invalid(format!("{} environment variable required", key)))
        }

        Ok(Self {
            region: get_env("FERRY_S3_REGION")?,
            access_key_id: get_env("FERRY_S3_ACCESS_KEY_ID")?,
            secret_access_key: get_env("FERRY_S3_SECRET_ACCESS_KEY")?,
            endpoint_url: get_env("FERRY_S3_ENDPOINT_URL")?,
            bucket: get_env("FERRY_S3_BUCKET")?,
        })
    }
}

/// Production client for any S3-compatible backend (AWS, MinIO, RustFS).
///
/// Payloads at or below `part_size` go through a single `put_object`; larger
/// payloads use a multipart upload, which is where real incremental progress
/// comes from: one `Progress` event per uploaded part.
#[derive(Clone)]
pub struct S3BlobClient {
    client: Client,
    bucket: String,
    part_size: usize,
    presign_ttl: Duration,
}

impl S3BlobClient {
    pub async fn from_env() -> BlobResult<Self> {
        Self::new(S3Config::from_env()?).await
    }

    pub async fn new(config: S3Config) -> BlobResult<Self> {
        let credentials = Credentials::new(
            config.access_key_id,
            config.secret_access_key,
            None,
            None,
            "ferry",
        );

        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .endpoint_url(config.endpoint_url)
            .load()
            .await;

        let client = Client::from_conf(
            aws_sdk_s3::config::Builder::from(&aws_config)
                .force_path_style(true) // required by MinIO/RustFS style backends
                .build(),
        );

        Ok(Self {
            client,
            bucket: config.bucket,
            part_size: 8 * 1024 * 1024,
            presign_ttl: Duration::from_secs(3600),
        })
    }

    /// Part size for multipart uploads (S3 requires at least 5 MiB per non-final part)
    pub fn with_part_size(mut self, part_size: usize) -> Self {
        self.part_size = part_size.max(5 * 1024 * 1024);
        self
    }

    /// Lifetime of presigned download URLs
    pub fn with_presign_ttl(mut self, ttl: Duration) -> Self {
        self.presign_ttl = ttl;
        self
    }

    fn map_aws_error(err: impl std::error::Error + Send + Sync + 'static) -> BlobError {
        BlobError::backend(err)
    }

    async fn upload_single(
        client: &Client,
        bucket: &str,
        key: &str,
        bytes: Bytes,
        progress: &mpsc::UnboundedSender<TransferEvent>,
    ) -> BlobResult<()> {
        let total = bytes.len() as u64;
        client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(AwsByteStream::from(bytes))
            .send()
            .await
            .map_err(Self::map_aws_error)?;

        let _ = progress.send(TransferEvent::Progress {
            bytes_transferred: total,
            total_bytes: Some(total),
        });
        Ok(())
    }

    async fn upload_multipart(
        client: &Client,
        bucket: &str,
        key: &str,
        bytes: Bytes,
        part_size: usize,
        progress: &mpsc::UnboundedSender<TransferEvent>,
    ) -> BlobResult<()> {
        let create = client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(Self::map_aws_error)?;
        let upload_id = create
            .upload_id()
            .ok_or_else(|| BlobError::invalid("backend returned no multipart upload id"))?
            .to_string();

        let result =
            Self::upload_parts(client, bucket, key, &upload_id, bytes, part_size, progress).await;

        if result.is_err() {
            let _ = client
                .abort_multipart_upload()
                .bucket(bucket)
                .key(key)
                .upload_id(&upload_id)
                .send()
                .await;
        }
        result
    }

    async fn upload_parts(
        client: &Client,
        bucket: &str,
        key: &str,
        upload_id: &str,
        bytes: Bytes,
        part_size: usize,
        progress: &mpsc::UnboundedSender<TransferEvent>,
    ) -> BlobResult<()> {
        let total = bytes.len() as u64;
        let mut remaining = bytes;
        let mut parts = Vec::new();
        let mut sent = 0u64;
        let mut part_number = 1i32;

        while !remaining.is_empty() {
            let take = remaining.len().min(part_size);
            let chunk = remaining.split_to(take);

            let part = client
                .upload_part()
                .bucket(bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(AwsByteStream::from(chunk))
                .send()
                .await
                .map_err(Self::map_aws_error)?;

            parts.push(
                CompletedPart::builder()
                    .part_number(part_number)
                    .e_tag(part.e_tag().unwrap_or_default())
                    .build(),
            );

            sent += take as u64;
            let _ = progress.send(TransferEvent::Progress {
                bytes_transferred: sent,
                total_bytes: Some(total),
            });
            part_number += 1;
        }

        client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await
            .map_err(Self::map_aws_error)?;
        Ok(())
    }
}

#[async_trait]
impl BlobClient for S3BlobClient {
    async fn begin_upload(&self, key: &str, bytes: Bytes) -> BlobResult<TransferEvents> {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = self.client.clone();
        let bucket = self.bucket.clone();
        let key = key.to_string();
        let part_size = self.part_size;

        tokio::spawn(async move {
            let result = if bytes.len() <= part_size {
                Self::upload_single(&client, &bucket, &key, bytes, &tx).await
            } else {
                Self::upload_multipart(&client, &bucket, &key, bytes, part_size, &tx).await
            };

            let event = match result {
                Ok(()) => TransferEvent::Completed { key },
                Err(err) => {
                    warn!(key = %key, error = %err, "upload failed");
                    TransferEvent::Failed {
                        reason: err.to_string(),
                    }
                }
            };
            let _ = tx.send(event);
        });

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }

    async fn resolve_url(&self, key: &str) -> BlobResult<String> {
        let presigning =
            PresigningConfig::expires_in(self.presign_ttl).map_err(Self::map_aws_error)?;
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(Self::map_aws_error)?;

        Ok(presigned.uri().to_string())
    }

    async fn list_objects(&self, prefix: &str) -> BlobResult<Vec<String>> {
        let result = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .send()
            .await
            .map_err(Self::map_aws_error)?;

        Ok(result
            .contents
            .unwrap_or_default()
            .into_iter()
            .filter_map(|object| object.key)
            .collect())
    }
}
