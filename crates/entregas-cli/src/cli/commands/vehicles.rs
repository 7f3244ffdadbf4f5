use anyhow::Result;
use entregas_core::auth::AuthSession;
use entregas_core::validation::VehicleForm;

use super::require_signed;
use crate::cli::VehicleArgs;

pub async fn list(session: &AuthSession) -> Result<()> {
    require_signed(session)?;
    let vehicles = session.api().list_vehicles().await?;
    if vehicles.is_empty() {
        println!("No vehicles registered.");
        return Ok(());
    }
    println!("{:>5}  {:<6} {:<20} {:<9} {:>8}", "ID", "TYPE", "MODEL", "PLATE", "KM/L");
    for v in vehicles {
        println!(
            "{:>5}  {:<6} {:<20} {:<9} {:>8.1}",
            v.id.map(|id| id.to_string()).unwrap_or_default(),
            v.kind.as_str(),
            v.model,
            v.plate.as_deref().unwrap_or("-"),
            v.km_per_liter
        );
    }
    Ok(())
}

pub async fn add(session: &AuthSession, args: VehicleArgs) -> Result<()> {
    require_signed(session)?;
    let form = VehicleForm {
        kind: args.kind,
        model: args.model,
        plate: args.plate,
        category: args.category,
        km_per_liter: args.km_per_liter,
    };
    let vehicle = session.api().create_vehicle(&form).await?;
    match vehicle.id {
        Some(id) => println!("✓ Added {} {} (id {id})", vehicle.kind, vehicle.model),
        None => println!("✓ Added {} {}", vehicle.kind, vehicle.model),
    }
    Ok(())
}

pub async fn remove(session: &AuthSession, id: i64) -> Result<()> {
    require_signed(session)?;
    session.api().delete_vehicle(id).await?;
    println!("✓ Removed vehicle {id}");
    Ok(())
}
