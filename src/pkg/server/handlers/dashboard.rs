use axum::{Json, extract::State};
use chrono::Utc;

use crate::{
    pkg::{internal::dashboard::Dashboard, server::state::AppState},
    prelude::Result,
};

pub async fn show(State(state): State<AppState>) -> Result<Json<Dashboard>> {
    let dashboard = Dashboard::build(&state, Utc::now().date_naive()).await?;
    Ok(Json(dashboard))
}
