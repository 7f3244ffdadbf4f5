//! Server-side reports and the dashboard.

use std::fmt;

use entregas_types::{ExpenseReport, UserStatistics, WorkReport};
use serde_json::Value;

use super::record;
use crate::errors::ApiResult;
use crate::http::ApiClient;

const DASHBOARD_PATH: &str = "/registro/api/dashboard-data/";
const WORK_REPORT_PATH: &str = "/api/relatorios/trabalho/";
const EXPENSE_REPORT_PATH: &str = "/api/relatorios/despesas/";
const STATISTICS_PATH: &str = "/api/relatorios/estatisticas/";

/// `periodo` query value. The backend treats anything else as a month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportPeriod {
    Week,
    #[default]
    Month,
    Year,
}

impl ReportPeriod {
    pub fn as_query(self) -> &'static str {
        match self {
            ReportPeriod::Week => "semana",
            ReportPeriod::Month => "mes",
            ReportPeriod::Year => "ano",
        }
    }
}

impl fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query())
    }
}

impl ApiClient {
    /// Dashboard payload; its shape varies with the backend version.
    pub async fn dashboard(&self) -> ApiResult<Value> {
        self.get(DASHBOARD_PATH).await
    }

    pub async fn work_report(&self, period: ReportPeriod) -> ApiResult<WorkReport> {
        let raw: Value = self
            .get_query(WORK_REPORT_PATH, &[("periodo", period.as_query())])
            .await?;
        record(raw, "work report")
    }

    pub async fn expense_report(&self, period: ReportPeriod) -> ApiResult<ExpenseReport> {
        let raw: Value = self
            .get_query(EXPENSE_REPORT_PATH, &[("periodo", period.as_query())])
            .await?;
        record(raw, "expense report")
    }

    pub async fn statistics(&self) -> ApiResult<UserStatistics> {
        self.get(STATISTICS_PATH).await
    }
}
