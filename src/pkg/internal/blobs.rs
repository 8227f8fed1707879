use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{Client, config::Region, error::DisplayErrorContext, primitives::ByteStream};

use crate::{
    conf::Settings,
    prelude::{Error, Result},
};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[async_trait]
pub trait BlobOps: Send + Sync {
    async fn upload_object(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<()>;

    /// Returns the stored bytes and the content type they were uploaded with.
    async fn retrieve_object(&self, key: &str) -> Result<(Vec<u8>, String)>;

    /// Deleting a key that does not exist is not an error.
    async fn delete_object(&self, key: &str) -> Result<()>;
}

pub async fn from_settings(settings: &Settings) -> Result<Arc<dyn BlobOps>> {
    match settings.blob_backend.as_str() {
        "s3" | "minio" => {
            let blobs = S3Blobs::connect(settings).await?;
            tracing::info!(
                "using s3 blob storage, bucket {}",
                &settings.s3_bucket_name
            );
            Ok(Arc::new(blobs))
        }
        _ => {
            tracing::info!("using filesystem blob storage at {}", &settings.blob_root);
            Ok(Arc::new(FsBlobs::new(&settings.blob_root)))
        }
    }
}

pub struct S3Blobs {
    client: Client,
    bucket: String,
}

impl S3Blobs {
    pub async fn connect(settings: &Settings) -> Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.s3_region.clone()));
        if !settings.s3_endpoint.is_empty() {
            loader = loader.endpoint_url(&settings.s3_endpoint);
        }
        let sdk_config = loader.load().await;
        let conf = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();
        let client = Client::from_conf(conf);
        create_bucket(&client, &settings.s3_bucket_name, &settings.s3_region).await?;
        Ok(S3Blobs {
            client,
            bucket: settings.s3_bucket_name.clone(),
        })
    }
}

pub async fn create_bucket(
    client: &Client,
    bucket_name: &str,
    region: &str,
) -> Result<Option<aws_sdk_s3::operation::create_bucket::CreateBucketOutput>> {
    let mut create = client.create_bucket().bucket(bucket_name);
    // us-east-1 rejects an explicit location constraint
    if region != "us-east-1" {
        let constraint = aws_sdk_s3::types::BucketLocationConstraint::from(region);
        let cfg = aws_sdk_s3::types::CreateBucketConfiguration::builder()
            .location_constraint(constraint)
            .build();
        create = create.create_bucket_configuration(cfg);
    }
    create.send().await.map(Some).or_else(|err| {
        if err
            .as_service_error()
            .map(|se| se.is_bucket_already_exists() || se.is_bucket_already_owned_by_you())
            == Some(true)
        {
            Ok(None)
        } else {
            Err(Error::Blob(format!("{}", DisplayErrorContext(&err))))
        }
    })
}

#[async_trait]
impl BlobOps for S3Blobs {
    async fn upload_object(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<()> {
        let len = data.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| Error::Blob(format!("{}", DisplayErrorContext(&e))))?;
        tracing::debug!("uploaded {} ({} bytes) to {}", key, len, &self.bucket);
        Ok(())
    }

    async fn retrieve_object(&self, key: &str) -> Result<(Vec<u8>, String)> {
        let out = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().map(|se| se.is_no_such_key()) == Some(true) {
                    Error::not_found("blob", key)
                } else {
                    Error::Blob(format!("{}", DisplayErrorContext(&e)))
                }
            })?;
        let content_type = out
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let data = out
            .body
            .collect()
            .await
            .map_err(|e| Error::Blob(e.to_string()))?
            .into_bytes()
            .to_vec();
        Ok((data, content_type))
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Error::Blob(format!("{}", DisplayErrorContext(&e))))?;
        tracing::debug!("deleted {} from {}", key, &self.bucket);
        Ok(())
    }
}

/// Blob storage on the local filesystem. The content type is kept in a
/// sidecar file next to the object.
#[derive(Debug, Clone)]
pub struct FsBlobs {
    root: PathBuf,
}

impl FsBlobs {
    pub fn new(root: impl AsRef<Path>) -> Self {
        FsBlobs {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn object_path(&self, key: &str) -> Result<PathBuf> {
        let rel = Path::new(key);
        if key.is_empty() || !rel.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(Error::Invalid(format!("invalid blob key '{}'", key)));
        }
        Ok(self.root.join(rel))
    }

    fn meta_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(".content-type");
        PathBuf::from(name)
    }
}

#[async_trait]
impl BlobOps for FsBlobs {
    async fn upload_object(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<()> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let len = data.len();
        tokio::fs::write(&path, data).await?;
        tokio::fs::write(Self::meta_path(&path), content_type).await?;
        tracing::debug!("stored {} ({} bytes) at {}", key, len, path.display());
        Ok(())
    }

    async fn retrieve_object(&self, key: &str) -> Result<(Vec<u8>, String)> {
        let path = self.object_path(key)?;
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::not_found("blob", key));
            }
            Err(e) => return Err(e.into()),
        };
        let content_type = tokio::fs::read_to_string(Self::meta_path(&path))
            .await
            .unwrap_or_else(|_| DEFAULT_CONTENT_TYPE.to_string());
        Ok((data, content_type))
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        let path = self.object_path(key)?;
        for p in [Self::meta_path(&path), path] {
            match tokio::fs::remove_file(&p).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        tracing::debug!("deleted {}", key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;

    #[tokio::test]
    #[traced_test]
    async fn test_fs_blob_lifecycle() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let blobs = FsBlobs::new(dir.path());
        blobs
            .upload_object("candidates/abc/files/cv.txt", b"hello".to_vec(), "text/plain")
            .await?;
        let (data, content_type) = blobs.retrieve_object("candidates/abc/files/cv.txt").await?;
        assert_eq!(data, b"hello");
        assert_eq!(content_type, "text/plain");

        blobs.delete_object("candidates/abc/files/cv.txt").await?;
        let missing = blobs.retrieve_object("candidates/abc/files/cv.txt").await;
        assert!(matches!(missing, Err(Error::NotFound { .. })));
        // deleting again is fine
        blobs.delete_object("candidates/abc/files/cv.txt").await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_fs_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = FsBlobs::new(dir.path());
        for key in ["../outside", "/etc/passwd", "a/../../b", ""] {
            let res = blobs.upload_object(key, vec![1], "text/plain").await;
            assert!(matches!(res, Err(Error::Invalid(_))), "{} accepted", key);
        }
    }
}
