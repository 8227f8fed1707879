use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    pkg::{
        internal::{
            adaptors::{
                files::{
                    mutators::FileMutator,
                    selectors::FileSelector,
                    spec::{CreateFileData, FileEntry},
                },
                owners::{mutators::OwnerMutator, selectors::OwnerSelector, spec::Owner},
            },
            compress::{self, CompressionPolicy},
        },
        server::state::{AppState, GetTxn},
    },
    prelude::{Error, Result},
};

const COMPRESSED_CONTENT_TYPE: &str = "application/zstd";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadPolicy {
    pub max_upload_bytes: u64,
    pub max_profile_image_bytes: u64,
    pub compression: CompressionPolicy,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        UploadPolicy {
            max_upload_bytes: 10 * 1024 * 1024,
            max_profile_image_bytes: 5 * 1024 * 1024,
            compression: CompressionPolicy::default(),
        }
    }
}

/// One file as received from a form.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Last path segment of a client-supplied filename, trimmed.
pub fn display_name(name: &str) -> Result<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("").trim();
    if base.is_empty() || base == "." || base == ".." {
        return Err(Error::Invalid(format!("invalid file name '{}'", name)));
    }
    Ok(base.to_string())
}

/// Filename reduced to characters that are safe in blob keys and headers.
pub fn key_safe(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn check_size(size: u64, limit: u64) -> Result<()> {
    if size == 0 {
        return Err(Error::Invalid("file is empty".into()));
    }
    if size > limit {
        return Err(Error::TooLarge { size, limit });
    }
    Ok(())
}

async fn discard_blob(state: &AppState, key: &str) -> bool {
    match state.blobs.delete_object(key).await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!("could not delete blob {}: {}", key, err);
            false
        }
    }
}

pub async fn list_files(state: &AppState, owner: Owner, owner_id: &str) -> Result<Vec<FileEntry>> {
    let mut conn = state.db_pool.acquire().await?;
    OwnerSelector::new(&mut conn)
        .ensure_exists(owner, owner_id)
        .await?;
    FileSelector::new(&mut conn)
        .list_for_owner(owner, owner_id)
        .await
}

/// An upload whose size and name have been checked.
struct Accepted {
    name: String,
    content_type: String,
    data: Vec<u8>,
}

fn accept(policy: &UploadPolicy, upload: Upload) -> Result<Accepted> {
    check_size(upload.data.len() as u64, policy.max_upload_bytes)?;
    let name = display_name(&upload.name)?;
    let content_type = match compress::essence(&upload.content_type) {
        ct if ct.is_empty() => "application/octet-stream".to_string(),
        _ => upload.content_type.trim().to_string(),
    };
    Ok(Accepted {
        name,
        content_type,
        data: upload.data,
    })
}

async fn ensure_owner(state: &AppState, owner: Owner, owner_id: &str) -> Result<()> {
    let mut conn = state.db_pool.acquire().await?;
    OwnerSelector::new(&mut conn)
        .ensure_exists(owner, owner_id)
        .await
}

/// All-or-nothing batch upload. Every file is checked before anything is
/// stored; if storing one fails, the files already stored are removed again.
pub async fn upload_files(
    state: &AppState,
    owner: Owner,
    owner_id: &str,
    uploads: Vec<Upload>,
) -> Result<Vec<FileEntry>> {
    let accepted = uploads
        .into_iter()
        .map(|upload| accept(&state.policy, upload))
        .collect::<Result<Vec<_>>>()?;
    ensure_owner(state, owner, owner_id).await?;

    let mut stored = Vec::with_capacity(accepted.len());
    for file in accepted {
        match store(state, owner, owner_id, file).await {
            Ok(entry) => stored.push(entry),
            Err(err) => {
                tracing::warn!(
                    "upload to {} {} failed after {} files, rolling back",
                    owner.label(),
                    owner_id,
                    stored.len()
                );
                undo(state, owner, owner_id, &stored).await;
                return Err(err);
            }
        }
    }
    Ok(stored)
}

async fn undo(state: &AppState, owner: Owner, owner_id: &str, entries: &[FileEntry]) {
    for entry in entries {
        let removed = match state.db_pool.acquire().await {
            Ok(mut conn) => {
                FileMutator::new(&mut conn)
                    .delete(owner, owner_id, &entry.id)
                    .await
            }
            Err(err) => Err(err.into()),
        };
        if let Err(err) = removed {
            tracing::warn!("could not remove file record {}: {}", &entry.id, err);
        }
        discard_blob(state, &entry.storage_path).await;
    }
}

/// Stores the blob first and the record second; a failed insert takes the
/// blob back out so nothing is left unreferenced.
async fn store(
    state: &AppState,
    owner: Owner,
    owner_id: &str,
    file: Accepted,
) -> Result<FileEntry> {
    let Accepted {
        name,
        content_type,
        data,
    } = file;
    let size = data.len() as u64;
    let policy = state.policy.compression.clone();
    let ct = content_type.clone();
    let packed = tokio::task::spawn_blocking(move || policy.pack(data, &ct)).await??;

    let file_id = Uuid::new_v4().to_string();
    let key = format!(
        "{}/{}/files/{}-{}",
        owner.table(),
        owner_id,
        &file_id,
        key_safe(&name)
    );
    let stored_size = packed.bytes.len() as i64;
    let blob_type = if packed.compressed {
        COMPRESSED_CONTENT_TYPE
    } else {
        content_type.as_str()
    };
    state
        .blobs
        .upload_object(&key, packed.bytes, blob_type)
        .await?;

    let record = CreateFileData {
        id: file_id,
        owner_id: owner_id.to_string(),
        name,
        content_type,
        storage_path: key.clone(),
        size: size as i64,
        stored_size,
        compressed: packed.compressed,
    };
    let created = match state.db_pool.acquire().await {
        Ok(mut conn) => FileMutator::new(&mut conn).create(owner, record).await,
        Err(err) => Err(err.into()),
    };
    match created {
        Ok(entry) => {
            tracing::info!(
                "stored {} for {} {} ({} -> {} bytes)",
                &entry.name,
                owner.label(),
                owner_id,
                entry.size,
                entry.stored_size
            );
            Ok(entry)
        }
        Err(err) => {
            tracing::warn!("file record insert failed, removing blob {}", &key);
            discard_blob(state, &key).await;
            match err {
                // the owner was deleted after the existence check
                Error::Db(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
                    Err(owner.not_found(owner_id))
                }
                err => Err(err),
            }
        }
    }
}

/// Record plus original (decompressed) bytes.
pub async fn download_file(
    state: &AppState,
    owner: Owner,
    owner_id: &str,
    file_id: &str,
) -> Result<(FileEntry, Vec<u8>)> {
    let entry = {
        let mut conn = state.db_pool.acquire().await?;
        FileSelector::new(&mut conn)
            .get(owner, owner_id, file_id)
            .await?
            .ok_or_else(|| Error::not_found("file", file_id))?
    };
    let (stored, _) = state.blobs.retrieve_object(&entry.storage_path).await?;
    let compressed = entry.compressed;
    let data = tokio::task::spawn_blocking(move || compress::unpack(stored, compressed)).await??;
    tracing::debug!(
        "retrieved {} of type {}, {} bytes",
        &entry.storage_path,
        &entry.content_type,
        data.len()
    );
    Ok((entry, data))
}

/// Record first, then the blob on a best-effort basis.
pub async fn delete_file(
    state: &AppState,
    owner: Owner,
    owner_id: &str,
    file_id: &str,
) -> Result<FileEntry> {
    let entry = {
        let mut conn = state.db_pool.acquire().await?;
        FileMutator::new(&mut conn)
            .delete(owner, owner_id, file_id)
            .await?
            .ok_or_else(|| Error::not_found("file", file_id))?
    };
    discard_blob(state, &entry.storage_path).await;
    tracing::info!("deleted file {} of {} {}", &entry.name, owner.label(), owner_id);
    Ok(entry)
}

async fn swap_profile_image(
    state: &AppState,
    owner: Owner,
    owner_id: &str,
    key: Option<&str>,
) -> Result<Option<String>> {
    let mut tx = state.db_pool.begin_txn().await?;
    let previous = OwnerMutator::new(&mut tx)
        .set_profile_image(owner, owner_id, key)
        .await?;
    tx.commit().await?;
    Ok(previous)
}

pub async fn set_profile_image(
    state: &AppState,
    owner: Owner,
    owner_id: &str,
    upload: Upload,
) -> Result<String> {
    let content_type = compress::essence(&upload.content_type);
    if !content_type.starts_with("image/") {
        return Err(Error::UnsupportedType(content_type));
    }
    check_size(upload.data.len() as u64, state.policy.max_profile_image_bytes)?;
    let name = display_name(&upload.name)?;
    {
        let mut conn = state.db_pool.acquire().await?;
        OwnerSelector::new(&mut conn)
            .ensure_exists(owner, owner_id)
            .await?;
    }

    let key = format!(
        "{}/{}/profile-{}-{}",
        owner.table(),
        owner_id,
        Uuid::new_v4(),
        key_safe(&name)
    );
    state
        .blobs
        .upload_object(&key, upload.data, &content_type)
        .await?;

    let replaced = swap_profile_image(state, owner, owner_id, Some(&key)).await;
    match replaced {
        Ok(previous) => {
            if let Some(previous) = previous {
                discard_blob(state, &previous).await;
            }
            tracing::info!("profile image of {} {} set to {}", owner.label(), owner_id, &key);
            Ok(key)
        }
        Err(err) => {
            discard_blob(state, &key).await;
            Err(err)
        }
    }
}

pub async fn profile_image(
    state: &AppState,
    owner: Owner,
    owner_id: &str,
) -> Result<(Vec<u8>, String)> {
    let key = {
        let mut conn = state.db_pool.acquire().await?;
        OwnerSelector::new(&mut conn)
            .profile_image(owner, owner_id)
            .await?
            .ok_or_else(|| Error::not_found("profile image", owner_id))?
    };
    state.blobs.retrieve_object(&key).await
}

/// Returns whether an image was set.
pub async fn clear_profile_image(state: &AppState, owner: Owner, owner_id: &str) -> Result<bool> {
    let previous = swap_profile_image(state, owner, owner_id, None).await?;
    match previous {
        Some(key) => {
            discard_blob(state, &key).await;
            tracing::info!("profile image of {} {} cleared", owner.label(), owner_id);
            Ok(true)
        }
        None => Ok(false),
    }
}
