use anyhow::{Result, bail};
use serde_json::json;
use tracing::info;

use claims_client::validation::password_strength;
use claims_client::{AuthOutcome, RegistrationForm, Role, Route};

use super::{App, read_secret};
use crate::cli::RegisterArgs;
use crate::render;

pub async fn login(app: &App, email: &str, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => read_secret("Password")?,
    };

    match app.store().login(email, &password).await {
        AuthOutcome::Success(user) => {
            let next = Route::after_login();
            info!(email = %user.email, role = %user.role, "Signed in");
            app.printer.emit(
                format!("{}\n\nContinue at {}", render::user(&user), next),
                json!({ "user": user, "next": next.path() }),
            );
            Ok(())
        }
        AuthOutcome::Failure { message } => bail!(message),
    }
}

pub async fn register(app: &App, args: RegisterArgs) -> Result<()> {
    let password = match args.password {
        Some(password) => password,
        None => read_secret("Password")?,
    };
    let role: Role = args.role.parse().map_err(anyhow::Error::msg)?;

    let form = RegistrationForm {
        name: args.name,
        email: args.email,
        password,
        role: Some(role),
        country_code: args.country_code,
        phone_number: args.phone,
        aadhar_number: args.aadhar,
    };
    let strength = password_strength(&form.password);
    let registration = form.validate()?;

    match app.store().register(&registration).await {
        AuthOutcome::Success(message) => {
            app.printer.emit(
                format!(
                    "{message}\nPassword strength: {}\nSign in with: claims-portal login {}",
                    strength.label(),
                    registration.email
                ),
                json!({ "message": message, "email": registration.email }),
            );
            Ok(())
        }
        AuthOutcome::Failure { message } => bail!(message),
    }
}

pub fn logout(app: &App) -> Result<()> {
    app.store().logout();
    app.printer.emit(
        "Signed out.".to_string(),
        json!({ "signedOut": true, "next": Route::Login.path() }),
    );
    Ok(())
}

pub fn whoami(app: &App) -> Result<()> {
    match app.store().current() {
        Some(session) => {
            let user = session.user();
            app.printer.emit(render::user(&user), json!(user));
        }
        None => app
            .printer
            .emit("Not signed in.".to_string(), json!({ "signedIn": false })),
    }
    Ok(())
}
