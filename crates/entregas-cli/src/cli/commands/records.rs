//! Work days, expenses and expense categories.

use anyhow::Result;
use entregas_core::auth::AuthSession;
use entregas_core::validation::{ExpenseForm, WorkRecordForm};

use super::{money, require_signed, today};
use crate::cli::{ExpenseArgs, WorkArgs};

pub async fn list_work(session: &AuthSession) -> Result<()> {
    require_signed(session)?;
    let mut records = session.api().list_work_records().await?;
    if records.is_empty() {
        println!("No work days recorded.");
        return Ok(());
    }
    records.sort_by(|a, b| b.date.cmp(&a.date));
    println!(
        "{:>5}  {:<10} {:<11} {:>9} {:>7} {:>12}",
        "ID", "DATE", "HOURS", "DELIVERED", "MISSED", "VALUE"
    );
    for r in records {
        let hours = match (&r.start_time, &r.end_time) {
            (Some(start), Some(end)) => format!("{}-{}", short_time(start), short_time(end)),
            _ => "-".to_string(),
        };
        println!(
            "{:>5}  {:<10} {:<11} {:>9} {:>7} {:>12}",
            r.id.map(|id| id.to_string()).unwrap_or_default(),
            r.date.to_string(),
            hours,
            r.delivered,
            r.not_delivered,
            money(r.value)
        );
    }
    Ok(())
}

/// Creates a work day, or replaces `id` when given.
pub async fn add_work(session: &AuthSession, id: Option<i64>, args: WorkArgs) -> Result<()> {
    require_signed(session)?;
    let form = WorkRecordForm {
        date: args.date.unwrap_or_else(today),
        start_time: args.start,
        end_time: args.end,
        delivered: args.delivered,
        not_delivered: args.not_delivered,
        payment_type: args.payment_type,
        value: args.value,
    };
    let record = match id {
        Some(id) => session.api().update_work_record(id, &form).await?,
        None => session.api().create_work_record(&form).await?,
    };
    let verb = if id.is_some() { "Updated" } else { "Recorded" };
    println!(
        "✓ {verb} {}: {} deliveries, {}",
        record.date,
        record.delivered,
        money(record.value)
    );
    Ok(())
}

pub async fn remove_work(session: &AuthSession, id: i64) -> Result<()> {
    require_signed(session)?;
    session.api().delete_work_record(id).await?;
    println!("✓ Removed work day {id}");
    Ok(())
}

pub async fn list_expenses(session: &AuthSession) -> Result<()> {
    require_signed(session)?;
    let mut expenses = session.api().list_expenses().await?;
    if expenses.is_empty() {
        println!("No expenses recorded.");
        return Ok(());
    }
    expenses.sort_by(|a, b| b.date.cmp(&a.date));
    println!("{:>5}  {:<10} {:<15} {:>12}  DESCRIPTION", "ID", "DATE", "TYPE", "VALUE");
    for e in expenses {
        println!(
            "{:>5}  {:<10} {:<15} {:>12}  {}",
            e.id.map(|id| id.to_string()).unwrap_or_default(),
            e.date.to_string(),
            e.kind.as_str(),
            money(e.value),
            e.description.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

/// Creates an expense, or replaces `id` when given.
pub async fn add_expense(session: &AuthSession, id: Option<i64>, args: ExpenseArgs) -> Result<()> {
    require_signed(session)?;
    let form = ExpenseForm {
        kind: args.kind,
        description: args.description,
        value: args.value,
        date: args.date.unwrap_or_else(today),
    };
    let expense = match id {
        Some(id) => session.api().update_expense(id, &form).await?,
        None => session.api().create_expense(&form).await?,
    };
    let verb = if id.is_some() { "Updated" } else { "Recorded" };
    println!(
        "✓ {verb} {} expense of {} on {}",
        expense.kind,
        money(expense.value),
        expense.date
    );
    Ok(())
}

pub async fn remove_expense(session: &AuthSession, id: i64) -> Result<()> {
    require_signed(session)?;
    session.api().delete_expense(id).await?;
    println!("✓ Removed expense {id}");
    Ok(())
}

pub async fn list_categories(session: &AuthSession) -> Result<()> {
    require_signed(session)?;
    let categories = session.api().list_categories().await?;
    if categories.is_empty() {
        println!("No categories.");
        return Ok(());
    }
    for c in categories {
        let id = c.id.map(|id| id.to_string()).unwrap_or_default();
        match c.description.as_deref().filter(|d| !d.is_empty()) {
            Some(description) => println!("{id:>5}  {}  ({description})", c.name),
            None => println!("{id:>5}  {}", c.name),
        }
    }
    Ok(())
}

pub async fn add_category(
    session: &AuthSession,
    name: &str,
    description: Option<&str>,
) -> Result<()> {
    require_signed(session)?;
    let category = session.api().create_category(name, description).await?;
    println!("✓ Added category {}", category.name);
    Ok(())
}

pub async fn remove_category(session: &AuthSession, id: i64) -> Result<()> {
    require_signed(session)?;
    session.api().delete_category(id).await?;
    println!("✓ Removed category {id}");
    Ok(())
}

/// `08:00:00` → `08:00`.
fn short_time(time: &str) -> &str {
    time.get(..5).unwrap_or(time)
}
