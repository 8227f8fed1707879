use config::{Config, ConfigError, Environment};
use lazy_static::lazy_static;
use serde::Deserialize;

use crate::pkg::internal::{attachments::UploadPolicy, compress::CompressionPolicy};

#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    pub service_name: String,
    pub listen_port: String,
    pub database_url: String,
    pub database_pool_max_connections: u32,
    //blobs
    pub blob_backend: String,
    pub blob_root: String,
    pub s3_bucket_name: String,
    pub s3_region: String,
    pub s3_endpoint: String,
    //uploads
    pub max_upload_bytes: u64,
    pub max_profile_image_bytes: u64,
    pub compression_level: i32,
    pub compression_threshold: u64,
    pub min_compression_ratio: f64,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let conf = Config::builder()
            .set_default("service_name", "roster")?
            .set_default("listen_port", "8000")?
            .set_default("database_url", "sqlite://roster.db")?
            .set_default("database_pool_max_connections", 5_i64)?
            .set_default("blob_backend", "fs")?
            .set_default("blob_root", "./blobs")?
            .set_default("s3_bucket_name", "roster")?
            .set_default("s3_region", "us-east-1")?
            .set_default("s3_endpoint", "")?
            .set_default("max_upload_bytes", 10_i64 * 1024 * 1024)?
            .set_default("max_profile_image_bytes", 5_i64 * 1024 * 1024)?
            .set_default("compression_level", 3_i64)?
            .set_default("compression_threshold", 1024_i64)?
            .set_default("min_compression_ratio", 1.05_f64)?
            .add_source(Environment::default())
            .build()?;
        let mut s: Settings = conf.try_deserialize()?;
        s.blob_backend = s.blob_backend.trim().to_lowercase();
        match s.blob_backend.as_str() {
            "fs" => {}
            "s3" => {}
            "minio" => {
                if s.s3_endpoint.is_empty() {
                    s.s3_endpoint = "http://localhost:9000".into();
                }
            }
            other => {
                return Err(ConfigError::Message(format!(
                    "unknown blob backend '{}', expected one of fs, s3, minio",
                    other
                )));
            }
        }
        Ok(s)
    }

    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy {
            max_upload_bytes: self.max_upload_bytes,
            max_profile_image_bytes: self.max_profile_image_bytes,
            compression: CompressionPolicy {
                level: self.compression_level,
                threshold: self.compression_threshold,
                min_ratio: self.min_compression_ratio,
            },
        }
    }
}

lazy_static! {
    #[allow(non_upper_case_globals)]
    pub static ref settings: Settings = Settings::new().expect("improperly configured");
}
