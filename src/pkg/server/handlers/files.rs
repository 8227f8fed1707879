use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::{
        StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::IntoResponse,
};
use serde_json::{Value, json};

use crate::{
    pkg::{
        internal::{
            adaptors::{files::spec::FileEntry, owners::spec::Owner},
            attachments::{self, Upload, key_safe},
        },
        server::state::AppState,
    },
    prelude::{Error, Result},
};

/// Every part that carries a filename becomes an upload; plain fields are
/// drained and ignored.
async fn read_uploads(multipart: &mut Multipart) -> Result<Vec<Upload>> {
    let mut uploads = vec![];
    while let Some(field) = multipart.next_field().await? {
        let name = field.file_name().map(str::to_string);
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field.bytes().await?;
        match name {
            Some(name) => uploads.push(Upload {
                name,
                content_type,
                data: data.to_vec(),
            }),
            None => tracing::debug!("ignoring non-file form field"),
        }
    }
    if uploads.is_empty() {
        return Err(Error::Invalid("no files in upload".into()));
    }
    Ok(uploads)
}

pub async fn list(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Path(id): Path<String>,
) -> Result<Json<Vec<FileEntry>>> {
    let files = attachments::list_files(&state, owner, &id).await?;
    Ok(Json(files))
}

pub async fn upload(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Vec<FileEntry>>)> {
    let uploads = read_uploads(&mut multipart).await?;
    let stored = attachments::upload_files(&state, owner, &id, uploads).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

pub async fn download(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Path((id, file_id)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    let (entry, data) = attachments::download_file(&state, owner, &id, &file_id).await?;
    Ok((
        [
            (CONTENT_TYPE, entry.content_type.clone()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", key_safe(&entry.name)),
            ),
        ],
        data,
    ))
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Path((id, file_id)): Path<(String, String)>,
) -> Result<Json<FileEntry>> {
    let entry = attachments::delete_file(&state, owner, &id, &file_id).await?;
    Ok(Json(entry))
}

pub async fn set_profile_image(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<Value>> {
    let mut uploads = read_uploads(&mut multipart).await?;
    if uploads.len() > 1 {
        return Err(Error::Invalid("expected a single image".into()));
    }
    let image = uploads.remove(0);
    let key = attachments::set_profile_image(&state, owner, &id, image).await?;
    Ok(Json(json!({
        "profile_image": key
    })))
}

pub async fn profile_image(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let (data, content_type) = attachments::profile_image(&state, owner, &id).await?;
    Ok(([(CONTENT_TYPE, content_type)], data))
}

pub async fn clear_profile_image(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    attachments::clear_profile_image(&state, owner, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
