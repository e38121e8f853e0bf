use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::{Value, json};

use crate::auth::{self, StoredCredentials};
use crate::cli::LoginArgs;
use crate::client::MedimartClient;
use crate::output::print_success;

pub async fn login(server: &str, args: &LoginArgs, profile: &str) -> Result<()> {
    let client = MedimartClient::new(server, None);
    let body = json!({
        "email": args.email,
        "password": args.password,
        "role": args.role.as_str(),
    });
    let resp = client.post("auth/login", &body).await?;
    let field = |name: &str| -> Result<String> {
        resp.get(name)
            .and_then(Value::as_str)
            .map(str::to_string)
            .with_context(|| format!("Login response has no '{name}'"))
    };

    let creds = StoredCredentials {
        server: server.to_string(),
        email: args.email.clone(),
        role: field("role")?,
        subject_id: field("subjectId")?,
        token: field("token")?,
    };
    auth::save_credentials(profile, &creds)?;
    print_success(&format!(
        "Logged in to {} as {} ({})",
        server.cyan(),
        creds.email.cyan(),
        creds.role
    ));
    Ok(())
}

pub fn logout(profile: &str) -> Result<()> {
    if auth::remove_credentials(profile)? {
        print_success("Logged out (credentials removed)");
    } else {
        println!("No credentials found for profile \"{profile}\"");
    }
    Ok(())
}

/// Asks the server about the stored token, so expiry shows up here.
pub async fn whoami(client: &MedimartClient, creds: Option<&StoredCredentials>) -> Result<()> {
    let Some(creds) = creds else {
        println!("Not logged in. Run: medimart login --email <email> --password <password>");
        return Ok(());
    };
    let claims = client.get("auth/me", &()).await?;
    let text = |key: &str| claims.get(key).and_then(Value::as_str).unwrap_or("-").to_string();
    println!("{}: {}", "Server".cyan(), creds.server);
    println!("{}: {}", "Email".cyan(), text("email"));
    println!("{}: {}", "Role".cyan(), text("role"));
    println!("{}: {}", "Id".cyan(), text("sub"));
    Ok(())
}
