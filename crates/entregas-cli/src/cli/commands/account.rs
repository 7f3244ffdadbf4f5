//! Profile, password and two-factor settings.

use anyhow::Result;
use entregas_core::auth::AuthSession;
use entregas_core::validation::{PasswordChangeForm, ProfileForm};

use super::{prompt, require_signed, value_or_prompt};
use crate::cli::ProfileArgs;

pub async fn update_profile(session: &AuthSession, args: ProfileArgs) -> Result<()> {
    require_signed(session)?;
    let form = ProfileForm {
        name: args.name,
        phone: args.phone,
        cpf: args.cpf,
        cep: args.cep,
        address: args.address,
        city: args.city,
        state: args.state,
    };
    let user = session.update_profile(&form).await?;
    println!("✓ Profile updated for {}", user.display_name());
    Ok(())
}

pub async fn change_password(
    session: &AuthSession,
    current: Option<String>,
    new_password: Option<String>,
) -> Result<()> {
    require_signed(session)?;
    let current_password = value_or_prompt(current, "Current password: ")?;
    let (new_password, new_password_confirm) = match new_password {
        Some(p) => (p.clone(), p),
        None => (prompt("New password: ")?, prompt("Confirm new password: ")?),
    };
    let form = PasswordChangeForm {
        current_password,
        new_password,
        new_password_confirm,
    };
    let message = session.change_password(&form).await?;
    println!("✓ {message}");
    Ok(())
}

pub async fn reset_password(session: &AuthSession, email: Option<String>) -> Result<()> {
    let email = value_or_prompt(email, "Email: ")?;
    let message = session.request_password_reset(&email).await?;
    println!("✓ {message}");
    Ok(())
}

pub async fn two_factor_status(session: &AuthSession) -> Result<()> {
    require_signed(session)?;
    let status = session.two_factor_status().await?;
    let state = if status.two_factor_enabled { "on" } else { "off" };
    match status.email {
        Some(email) => println!("Two-factor authentication is {state} (codes go to {email})."),
        None => println!("Two-factor authentication is {state}."),
    }
    Ok(())
}

pub async fn two_factor_setup(session: &AuthSession) -> Result<()> {
    require_signed(session)?;
    let delivery = session.two_factor_setup().await?;
    let message = delivery
        .message
        .unwrap_or_else(|| "An activation code was sent to your email.".to_string());
    println!("{message}");
    println!("Run `entregas two-factor enable --code <CODE>` to finish.");
    Ok(())
}

pub async fn two_factor_enable(session: &AuthSession, code: &str) -> Result<()> {
    require_signed(session)?;
    let message = session.two_factor_enable(code).await?;
    println!("✓ {message}");
    Ok(())
}

pub async fn two_factor_disable(
    session: &AuthSession,
    password: Option<String>,
    code: &str,
) -> Result<()> {
    require_signed(session)?;
    let password = value_or_prompt(password, "Password: ")?;
    let message = session.two_factor_disable(&password, code).await?;
    println!("✓ {message}");
    Ok(())
}
