mod cli;

use entregas_core::ApiError;
use entregas_core::auth::AuthFailure;

fn main() {
    if let Err(e) = cli::run() {
        report(&e);
        std::process::exit(1);
    }
}

/// Backend and form failures print their user-facing message and field
/// errors; anything else prints the anyhow chain.
fn report(e: &anyhow::Error) {
    if let Some(api) = e.downcast_ref::<ApiError>() {
        eprintln!("{}", api.user_message());
        for (field, message) in api.field_errors().iter() {
            eprintln!("  {field}: {message}");
        }
        if api.is_unauthorized() {
            eprintln!("Session expired, run `entregas login`.");
        }
    } else if let Some(failure) = e.downcast_ref::<AuthFailure>() {
        eprintln!("{failure}");
        for (field, message) in failure.fields.iter() {
            eprintln!("  {field}: {message}");
        }
    } else {
        eprintln!("{e:#}"); // pretty anyhow chain
    }
}
