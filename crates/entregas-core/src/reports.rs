//! Local aggregation over fetched work days and expenses.
//!
//! Every ratio is 0 when its denominator is 0.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{Datelike, Duration, NaiveDate};
use entregas_types::{ExpenseRecord, WorkRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Period {
    /// Last 7 days, today included.
    Week,
    /// Current calendar month.
    #[default]
    Month,
    /// Current calendar year.
    Year,
    All,
}

impl Period {
    pub fn contains(self, date: NaiveDate, today: NaiveDate) -> bool {
        if date > today {
            return false;
        }
        match self {
            Period::Week => date > today - Duration::days(7),
            Period::Month => date.year() == today.year() && date.month() == today.month(),
            Period::Year => date.year() == today.year(),
            Period::All => true,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "week" | "semana" => Some(Period::Week),
            "month" | "mes" | "mês" => Some(Period::Month),
            "year" | "ano" => Some(Period::Year),
            "all" | "todos" => Some(Period::All),
            _ => None,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Period::Week => "last 7 days",
            Period::Month => "this month",
            Period::Year => "this year",
            Period::All => "all time",
        })
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator.abs() < f64::EPSILON {
        0.0
    } else {
        numerator / denominator
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkSummary {
    pub days_worked: usize,
    pub delivered: u32,
    pub not_delivered: u32,
    /// Delivered share of all attempts, in percent.
    pub delivery_rate: f64,
    pub earnings: f64,
    pub earnings_per_day: f64,
    pub deliveries_per_day: f64,
}

impl WorkSummary {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a WorkRecord>) -> Self {
        let mut days = BTreeSet::new();
        let mut summary = Self::default();
        for record in records {
            days.insert(record.date);
            summary.delivered = summary.delivered.saturating_add(record.delivered);
            summary.not_delivered = summary.not_delivered.saturating_add(record.not_delivered);
            summary.earnings += record.value;
        }
        summary.days_worked = days.len();
        let days = days.len() as f64;
        let attempts = f64::from(summary.delivered) + f64::from(summary.not_delivered);
        summary.delivery_rate = ratio(f64::from(summary.delivered) * 100.0, attempts);
        summary.earnings_per_day = ratio(summary.earnings, days);
        summary.deliveries_per_day = ratio(f64::from(summary.delivered), days);
        summary
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryShare {
    pub kind: String,
    pub total: f64,
    /// Percent of all expenses.
    pub share: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseSummary {
    pub total: f64,
    /// Largest category first.
    pub by_kind: Vec<CategoryShare>,
}

impl ExpenseSummary {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a ExpenseRecord>) -> Self {
        let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
        for record in records {
            *totals.entry(record.kind.as_str()).or_default() += record.value;
        }
        let total: f64 = totals.values().sum();
        let mut by_kind: Vec<CategoryShare> = totals
            .into_iter()
            .map(|(kind, sum)| CategoryShare {
                kind: kind.to_string(),
                total: sum,
                share: ratio(sum * 100.0, total),
            })
            .collect();
        by_kind.sort_by(|a, b| b.total.total_cmp(&a.total));
        Self { total, by_kind }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinancialSummary {
    pub work: WorkSummary,
    pub expenses: ExpenseSummary,
    /// Earnings minus expenses.
    pub net: f64,
    /// Net as a percent of earnings.
    pub margin: f64,
}

impl FinancialSummary {
    pub fn compute(
        work: &[WorkRecord],
        expenses: &[ExpenseRecord],
        period: Period,
        today: NaiveDate,
    ) -> Self {
        let work = WorkSummary::from_records(work.iter().filter(|r| period.contains(r.date, today)));
        let expenses = ExpenseSummary::from_records(
            expenses.iter().filter(|r| period.contains(r.date, today)),
        );
        let net = work.earnings - expenses.total;
        Self {
            margin: ratio(net * 100.0, work.earnings),
            net,
            work,
            expenses,
        }
    }
}
