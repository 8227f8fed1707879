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
                employees::{
                    mutators::EmployeeMutator,
                    selectors::EmployeeSelector,
                    spec::{EmployeeEntry, EmployeeFilter, EmployeeInput, EmployeePatch},
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
    Json(input): Json<EmployeeInput>,
) -> Result<(StatusCode, Json<EmployeeEntry>)> {
    let input = input.normalize();
    input.validate()?;
    let mut conn = state.db_pool.acquire().await?;
    let employee = EmployeeMutator::new(&mut conn).create(input).await?;
    tracing::info!("created employee {} ({})", &employee.id, &employee.name);
    Ok((StatusCode::CREATED, Json(employee)))
}

pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<EmployeeFilter>,
) -> Result<Json<Vec<EmployeeEntry>>> {
    let mut conn = state.db_pool.acquire().await?;
    let employees = EmployeeSelector::new(&mut conn).list(&filter).await?;
    Ok(Json(employees))
}

pub async fn retrieve(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EmployeeEntry>> {
    let mut conn = state.db_pool.acquire().await?;
    let employee = EmployeeSelector::new(&mut conn)
        .get_by_id(&id)
        .await?
        .ok_or_else(|| Error::not_found("employee", &id))?;
    Ok(Json(employee))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<EmployeePatch>,
) -> Result<Json<EmployeeEntry>> {
    let mut tx = state.db_pool.begin_txn().await?;
    let current = EmployeeSelector::new(&mut tx)
        .get_by_id(&id)
        .await?
        .ok_or_else(|| Error::not_found("employee", &id))?;
    let input = patch.apply(&current).normalize();
    input.validate()?;
    let employee = EmployeeMutator::new(&mut tx).update(&id, input).await?;
    tx.commit().await?;
    tracing::info!("updated employee {}", &id);
    Ok(Json(employee))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PurgeReport>> {
    let report = purge(&state, Owner::Employee, &id).await?;
    Ok(Json(report))
}
