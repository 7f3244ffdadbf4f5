//! Financial reports.

use anyhow::{Result, bail};
use chrono::Local;
use entregas_core::api::ReportPeriod;
use entregas_core::auth::AuthSession;
use entregas_core::reports::{FinancialSummary, Period};

use super::{money, require_signed, warn_partial};
use crate::cli::PeriodArg;

pub async fn report(session: &AuthSession, period: PeriodArg, remote: bool) -> Result<()> {
    require_signed(session)?;
    if remote {
        return remote_report(session, period).await;
    }

    let ledger = session.api().ledger().await;
    warn_partial(&ledger.failed);
    let period = Period::from(period);
    let summary =
        FinancialSummary::compute(&ledger.work, &ledger.expenses, period, Local::now().date_naive());

    let work = &summary.work;
    println!("Report ({period})");
    println!();
    println!("  Days worked:        {}", work.days_worked);
    println!(
        "  Deliveries:         {} delivered, {} missed ({:.1}%)",
        work.delivered, work.not_delivered, work.delivery_rate
    );
    println!("  Deliveries per day: {:.1}", work.deliveries_per_day);
    println!("  Earnings:           {}", money(work.earnings));
    println!("  Earnings per day:   {}", money(work.earnings_per_day));
    println!("  Expenses:           {}", money(summary.expenses.total));
    for share in &summary.expenses.by_kind {
        println!(
            "    {:<16} {:>12} {:>5.1}%",
            share.kind,
            money(share.total),
            share.share
        );
    }
    println!("  Net:                {}", money(summary.net));
    println!("  Margin:             {:.1}%", summary.margin);
    Ok(())
}

async fn remote_report(session: &AuthSession, period: PeriodArg) -> Result<()> {
    let period = match period {
        PeriodArg::Week => ReportPeriod::Week,
        PeriodArg::Month => ReportPeriod::Month,
        PeriodArg::Year => ReportPeriod::Year,
        PeriodArg::All => bail!("The server report supports week, month or year."),
    };
    let api = session.api();
    let (work, expenses) = tokio::join!(api.work_report(period), api.expense_report(period));
    let work = work?;
    let expenses = expenses?;

    println!("Server report ({period})");
    println!();
    println!("  Days worked:        {}", work.total_days);
    println!(
        "  Deliveries:         {} delivered, {} missed",
        work.delivered, work.not_delivered
    );
    println!("  Deliveries per day: {:.1}", work.deliveries_per_day);
    println!("  Earnings:           {}", money(work.total_earnings));
    println!("  Expenses:           {}", money(expenses.total));
    println!("  Expenses per day:   {}", money(expenses.per_day));
    if let Some(category) = &expenses.top_category {
        println!("  Top category:       {category}");
    }
    for category in &expenses.by_category {
        println!("    {:<16} {:>12}", category.name, money(category.total));
    }
    println!("  Net:                {}", money(work.total_earnings - expenses.total));
    Ok(())
}

/// Account statistics, followed by the raw dashboard payload when the server has one.
pub async fn dashboard(session: &AuthSession) -> Result<()> {
    require_signed(session)?;
    let api = session.api();
    let (stats, data) = tokio::join!(api.statistics(), api.dashboard());
    let stats = stats?;
    println!("Deliveries:     {}", stats.total_entregas);
    println!("Earnings:       {}", money(stats.total_ganhos));
    println!("Vehicles:       {}", stats.veiculos_cadastrados);
    println!("Days worked:    {}", stats.dias_trabalhados);
    println!("Days connected: {}", stats.dias_conectado);

    match data {
        Ok(data) if !data.is_null() => {
            println!();
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!("dashboard data unavailable: {e}");
            warn_partial(&["dashboard"]);
        }
    }
    Ok(())
}
