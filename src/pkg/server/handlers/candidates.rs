use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use validator::Validate;

use crate::{
    pkg::{
        internal::{
            adaptors::{
                candidates::{
                    mutators::CandidateMutator,
                    selectors::CandidateSelector,
                    spec::{CandidateEntry, CandidateFilter, CandidateInput, CandidatePatch},
                },
                owners::spec::Owner,
            },
            purge::{PurgeReport, purge},
        },
        server::state::{AppState, GetTxn},
    },
    prelude::{Error, Result},
};

pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CandidateInput>,
) -> Result<(StatusCode, Json<CandidateEntry>)> {
    let input = input.normalize();
    input.validate()?;
    let mut conn = state.db_pool.acquire().await?;
    let candidate = CandidateMutator::new(&mut conn).create(input).await?;
    tracing::info!("created candidate {} ({})", &candidate.id, &candidate.name);
    Ok((StatusCode::CREATED, Json(candidate)))
}

pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<CandidateFilter>,
) -> Result<Json<Vec<CandidateEntry>>> {
    let mut conn = state.db_pool.acquire().await?;
    let candidates = CandidateSelector::new(&mut conn).list(&filter).await?;
    Ok(Json(candidates))
}

pub async fn retrieve(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CandidateEntry>> {
    let mut conn = state.db_pool.acquire().await?;
    let candidate = CandidateSelector::new(&mut conn)
        .get_by_id(&id)
        .await?
        .ok_or_else(|| Error::not_found("candidate", &id))?;
    Ok(Json(candidate))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<CandidatePatch>,
) -> Result<Json<CandidateEntry>> {
    let mut tx = state.db_pool.begin_txn().await?;
    let current = CandidateSelector::new(&mut tx)
        .get_by_id(&id)
        .await?
        .ok_or_else(|| Error::not_found("candidate", &id))?;
    let input = patch.apply(&current).normalize();
    input.validate()?;
    let candidate = CandidateMutator::new(&mut tx).update(&id, input).await?;
    tx.commit().await?;
    tracing::info!("updated candidate {}", &id);
    Ok(Json(candidate))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PurgeReport>> {
    let report = purge(&state, Owner::Candidate, &id).await?;
    Ok(Json(report))
}
