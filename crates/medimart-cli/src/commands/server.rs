use anyhow::Result;
use colored::Colorize;

use crate::client::MedimartClient;

pub async fn status(client: &MedimartClient, server: &str) -> Result<()> {
    let (code, body) = client.health().await?;
    if code == 200 {
        println!("{} {} is {}", "✓".green(), server.cyan(), "healthy".green());
        if !body.is_empty() {
            println!("  {body}");
        }
    } else {
        println!(
            "{} {} returned {} {}",
            "✗".red(),
            server.cyan(),
            code.to_string().red(),
            body
        );
    }
    Ok(())
}
