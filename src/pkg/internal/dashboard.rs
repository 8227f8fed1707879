use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::{
    pkg::{
        internal::adaptors::{
            Returning,
            candidates::{selectors::CandidateSelector, spec::CandidateStatus},
            employees::{selectors::EmployeeSelector, spec::EmployeeStatus},
            files::{selectors::FileSelector, spec::FileTotals},
            owners::spec::Owner,
        },
        server::state::AppState,
    },
    prelude::Result,
};

const RECENT_DAYS: i64 = 30;
const RETURNING_WITHIN_DAYS: i64 = 14;

#[derive(Debug, Clone, Serialize)]
pub struct EntitySummary {
    pub total: i64,
    pub by_status: BTreeMap<&'static str, i64>,
    pub added_last_30_days: i64,
    pub returning_soon: Vec<Returning>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub as_of: NaiveDate,
    pub candidates: EntitySummary,
    pub employees: EntitySummary,
    pub files: FileTotals,
}

fn summarize<S: Copy + PartialEq>(
    statuses: &[S],
    label: impl Fn(&S) -> &'static str,
    counts: Vec<(S, i64)>,
    added: i64,
    returning_soon: Vec<Returning>,
) -> EntitySummary {
    let by_status: BTreeMap<&'static str, i64> = statuses
        .iter()
        .map(|s| {
            let count = counts
                .iter()
                .filter(|(status, _)| status == s)
                .map(|(_, c)| *c)
                .sum::<i64>();
            (label(s), count)
        })
        .collect();
    EntitySummary {
        total: by_status.values().sum(),
        by_status,
        added_last_30_days: added,
        returning_soon,
    }
}

impl Dashboard {
    pub async fn build(state: &AppState, today: NaiveDate) -> Result<Self> {
        let since = Utc::now() - Duration::days(RECENT_DAYS);
        let horizon = today + Duration::days(RETURNING_WITHIN_DAYS);
        let mut conn = state.db_pool.acquire().await?;

        let candidates = {
            let mut selector = CandidateSelector::new(&mut conn);
            let counts = selector.count_by_status().await?;
            let added = selector.count_created_since(since).await?;
            let returning = selector.returning_between(today, horizon).await?;
            summarize(&CandidateStatus::ALL, CandidateStatus::as_str, counts, added, returning)
        };
        let employees = {
            let mut selector = EmployeeSelector::new(&mut conn);
            let counts = selector.count_by_status().await?;
            let added = selector.count_created_since(since).await?;
            let returning = selector.returning_between(today, horizon).await?;
            summarize(&EmployeeStatus::ALL, EmployeeStatus::as_str, counts, added, returning)
        };
        let files = {
            let mut selector = FileSelector::new(&mut conn);
            let c = selector.totals(Owner::Candidate).await?;
            let e = selector.totals(Owner::Employee).await?;
            FileTotals {
                count: c.count + e.count,
                size: c.size + e.size,
                stored_size: c.stored_size + e.stored_size,
            }
        };
        tracing::debug!(
            "dashboard: {} candidates, {} employees, {} files",
            candidates.total,
            employees.total,
            files.count
        );
        Ok(Dashboard {
            as_of: today,
            candidates,
            employees,
            files,
        })
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;
    use crate::pkg::internal::adaptors::candidates::{
        mutators::CandidateMutator, spec::CandidateInput,
    };
    use crate::pkg::internal::attachments::{self, Upload};
    use crate::pkg::testing;

    #[tokio::test]
    #[traced_test]
    async fn test_dashboard_counts_every_status() -> Result<()> {
        let (state, _dir) = testing::state().await;
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let mut ids = vec![];
        for (name, status, until) in [
            ("Ann", "available", None),
            ("Ben", "unavailable", Some("2026-10-25")),
            ("Cy", "unavailable", Some("2026-12-25")),
        ] {
            let input: CandidateInput = serde_json::from_value(serde_json::json!({
                "name": name,
                "email": format!("{}@example.com", name.to_lowercase()),
                "status": status,
                "unavailable_until": until,
            }))?;
            let mut conn = state.db_pool.acquire().await?;
            ids.push(CandidateMutator::new(&mut conn).create(input.normalize()).await?.id);
        }
        attachments::upload_files(
            &state,
            Owner::Candidate,
            &ids[0],
            vec![Upload {
                name: "cv.txt".into(),
                content_type: "text/plain".into(),
                data: b"short cv".to_vec(),
            }],
        )
        .await?;

        let dashboard = Dashboard::build(&state, today).await?;
        assert_eq!(dashboard.candidates.total, 3);
        assert_eq!(dashboard.candidates.added_last_30_days, 3);
        assert_eq!(dashboard.candidates.by_status["available"], 1);
        assert_eq!(dashboard.candidates.by_status["unavailable"], 2);
        assert_eq!(dashboard.candidates.by_status["placed"], 0);
        assert_eq!(dashboard.candidates.returning_soon.len(), 1);
        assert_eq!(dashboard.candidates.returning_soon[0].name, "Ben");

        assert_eq!(dashboard.employees.total, 0);
        assert_eq!(dashboard.employees.by_status.len(), 4);
        assert_eq!(dashboard.files.count, 1);
        assert_eq!(dashboard.files.size, 8);
        Ok(())
    }
}
