//! Auth command handlers.

use anyhow::{Result, bail};
use chrono::Utc;
use entregas_core::auth::{
    AuthSession, FlowPurpose, SignInOutcome, SignUpOutcome, TwoFactorFlow, VerifyOutcome,
};
use entregas_core::store::mask_token;
use entregas_core::validation::RegistrationForm;
use entregas_types::User;

use super::{prompt, require_signed, value_or_prompt};
use crate::cli::RegisterArgs;

pub async fn login(
    session: &AuthSession,
    email: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let email = value_or_prompt(email, "Email: ")?;
    let password = value_or_prompt(password, "Password: ")?;

    match session.sign_in(&email, &password).await {
        SignInOutcome::SignedIn(user) => {
            print_signed_in(session, &user);
            Ok(())
        }
        SignInOutcome::TwoFactorRequired(challenge) => {
            println!("A verification code was sent to {}.", challenge.email);
            let mut flow = TwoFactorFlow::started(FlowPurpose::Login, challenge, Utc::now());
            match collect_code(session, &mut flow, None).await {
                Ok(outcome) => finish(session, outcome),
                Err(e) => {
                    session.cancel_two_factor();
                    Err(e)
                }
            }
        }
        SignInOutcome::Failed(failure) => Err(failure.into()),
    }
}

pub fn logout(session: &AuthSession) {
    let was_signed = session.signed();
    session.sign_out();
    if was_signed {
        println!("✓ Signed out");
    } else {
        println!("Not signed in.");
    }
}

pub async fn whoami(session: &AuthSession, refresh: bool) -> Result<()> {
    require_signed(session)?;
    let user = if refresh {
        Some(session.refresh_profile().await?)
    } else {
        session.user()
    };
    match user {
        Some(user) => print_user(&user),
        None => println!("Signed in (profile not cached; use --refresh)."),
    }
    Ok(())
}

pub async fn register(session: &AuthSession, args: RegisterArgs) -> Result<()> {
    let (password, password_confirm) = match args.password {
        Some(p) => (p.clone(), p),
        None => (prompt("Password: ")?, prompt("Confirm password: ")?),
    };
    let form = RegistrationForm {
        name: args.name,
        username: args.username,
        email: args.email,
        phone: args.phone,
        cpf: args.cpf,
        password,
        password_confirm,
    };

    match session.sign_up(&form).await {
        SignUpOutcome::VerificationRequired(challenge) => {
            println!("Account created. A verification code was sent to {}.", challenge.email);
            let mut flow =
                TwoFactorFlow::started(FlowPurpose::Registration, challenge, Utc::now());
            let outcome = collect_code(session, &mut flow, None).await?;
            finish(session, outcome)
        }
        SignUpOutcome::SignedIn(user) => {
            print_signed_in(session, &user);
            Ok(())
        }
        SignUpOutcome::Registered { message } => {
            println!("{message}");
            Ok(())
        }
        SignUpOutcome::Failed(failure) => Err(failure.into()),
    }
}

pub async fn verify_email(session: &AuthSession, email: String, code: Option<String>) -> Result<()> {
    let challenge = session.new_challenge(email, None);
    let mut flow = TwoFactorFlow::started(FlowPurpose::Registration, challenge, Utc::now());
    let outcome = collect_code(session, &mut flow, code).await?;
    finish(session, outcome)
}

pub async fn resend_code(session: &AuthSession, email: String) -> Result<()> {
    let challenge = session.new_challenge(email, None);
    let mut flow = TwoFactorFlow::new(FlowPurpose::Registration, challenge);
    session
        .resend_registration_code(&mut flow, Utc::now())
        .await?;
    println!("A new code was sent to {}.", flow.email());
    Ok(())
}

/// Reads codes until one is accepted, the flow blocks, or the user quits.
///
/// `r` requests a new code once the countdown is over; `q` or EOF cancels.
async fn collect_code(
    session: &AuthSession,
    flow: &mut TwoFactorFlow,
    mut code: Option<String>,
) -> Result<VerifyOutcome> {
    loop {
        let now = Utc::now();
        let input = match code.take() {
            Some(code) => code,
            None => {
                if let Some(status) = flow.status_message(now) {
                    println!("{status}");
                }
                prompt("Code (r = resend, q = cancel): ")?
            }
        };

        match input.as_str() {
            "" | "q" => bail!("Verification cancelled."),
            "r" => {
                let resent = match flow.purpose() {
                    FlowPurpose::Login => session.resend_two_factor(flow, now).await,
                    FlowPurpose::Registration => session.resend_registration_code(flow, now).await,
                };
                match resent {
                    Ok(()) => println!("A new code was sent to {}.", flow.email()),
                    Err(failure) => println!("{failure}"),
                }
            }
            code => {
                let outcome = match flow.purpose() {
                    FlowPurpose::Login => session.verify_two_factor(flow, code, now).await,
                    FlowPurpose::Registration => {
                        session.verify_registration(flow, code, now).await
                    }
                };
                match outcome {
                    VerifyOutcome::Rejected(failure) => println!("{failure}"),
                    other => return Ok(other),
                }
            }
        }
    }
}

fn finish(session: &AuthSession, outcome: VerifyOutcome) -> Result<()> {
    match outcome {
        VerifyOutcome::SignedIn(user) => {
            print_signed_in(session, &user);
            Ok(())
        }
        VerifyOutcome::Verified { message } => {
            println!("✓ {message}");
            Ok(())
        }
        VerifyOutcome::Blocked { message } => bail!(message),
        VerifyOutcome::Rejected(failure) => Err(failure.into()),
    }
}

fn print_signed_in(session: &AuthSession, user: &User) {
    println!("✓ Signed in as {}", user.display_name());
    if let Some(token) = session.state().token {
        println!("  Token: {}", mask_token(&token));
    }
}

fn print_user(user: &User) {
    println!("{}", user.display_name());
    println!("  Email:    {}", user.email);
    if let Some(username) = &user.username {
        println!("  Username: {username}");
    }
    if let Some(phone) = &user.phone {
        println!("  Phone:    {phone}");
    }
    if let Some(city) = &user.city {
        match &user.state {
            Some(state) => println!("  City:     {city}/{state}"),
            None => println!("  City:     {city}"),
        }
    }
    println!("  Role:     {}", user.role());
    println!(
        "  2FA:      {}",
        if user.two_factor_enabled { "on" } else { "off" }
    );
}
