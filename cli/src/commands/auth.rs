use anyhow::Result;
use chrono::Utc;

use wellnoosh_core::remote::Session;
use wellnoosh_core::service::WellnooshService;

use super::helpers::{print_json, prompt_line};

fn print_session(session: &Session, verb: &str) {
    if session.is_demo() {
        println!("{verb} in demo mode (no backend configured); data stays on this machine");
    } else {
        println!("{verb} as {}", session.user.email);
    }
}

/// Password from the flag, or read from stdin so it stays out of shell history.
fn password_or_prompt(password: Option<String>) -> Result<String> {
    match password {
        Some(p) => Ok(p),
        None => prompt_line("Password: "),
    }
}

pub(crate) async fn cmd_auth_signup(
    service: &WellnooshService,
    email: &str,
    password: Option<String>,
    name: Option<&str>,
    json: bool,
) -> Result<()> {
    let password = password_or_prompt(password)?;
    let session = service.sign_up(email, &password, name).await?;
    if json {
        print_json(&session.user)?;
    } else {
        print_session(&session, "Signed up");
    }
    Ok(())
}

pub(crate) async fn cmd_auth_signin(
    service: &WellnooshService,
    email: &str,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let password = password_or_prompt(password)?;
    let session = service.sign_in(email, &password).await?;
    let synced = service.sync_pending().await?;
    if json {
        print_json(&serde_json::json!({ "user": session.user, "synced": synced }))?;
    } else {
        print_session(&session, "Signed in");
        if synced > 0 {
            println!("Synced {synced} tracker day{} saved while offline", if synced == 1 { "" } else { "s" });
        }
    }
    Ok(())
}

pub(crate) async fn cmd_auth_signout(service: &WellnooshService, json: bool) -> Result<()> {
    let had_session = service.session()?.is_some();
    service.sign_out().await?;
    if json {
        println!("{}", serde_json::json!({ "signedOut": had_session }));
    } else if had_session {
        println!("Signed out");
    } else {
        eprintln!("Not signed in");
    }
    Ok(())
}

pub(crate) fn cmd_auth_status(service: &WellnooshService, json: bool) -> Result<()> {
    let session = service.session()?;
    let backend = service.is_remote_configured();
    let expired = session.as_ref().is_some_and(|s| s.is_expired(Utc::now()));

    if json {
        print_json(&serde_json::json!({
            "backendConfigured": backend,
            "signedIn": session.is_some() && !expired,
            "demo": session.as_ref().is_some_and(Session::is_demo),
            "expired": expired,
            "user": session.as_ref().map(|s| &s.user),
        }))?;
        return Ok(());
    }

    println!(
        "Backend:  {}",
        if backend { "configured" } else { "not configured (offline mode)" }
    );
    match session {
        None => println!("Session:  signed out"),
        Some(s) if s.is_demo() => println!("Session:  demo ({})", s.user.email),
        Some(s) if expired => println!("Session:  expired for {}; sign in again", s.user.email),
        Some(s) => println!(
            "Session:  {} (until {})",
            s.user.email,
            s.expires_at.format("%Y-%m-%d %H:%M UTC")
        ),
    }
    Ok(())
}
