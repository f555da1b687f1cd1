//! Mint a JWT for the moderation API.
//!
//! Prompts for subject, role and lifetime, then signs the token with
//! `JWT_SECRET` (read from the environment or `.env`).
//!
//! Usage:
//!     cargo run --bin generate_service_token
//!
//! Use the `admin` role for dashboards and the `service` role for content
//! services that submit work.

use moderation::presentation::http::middleware::auth::{Claims, Role, issue_token};
use std::io::{self, Write};

fn prompt(label: &str) -> io::Result<String> {
    print!("{}\n> ", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    println!("\n╔══════════════════════════════════════════════════════════╗");
    println!("║      Moderation API Token Generator                      ║");
    println!("╚══════════════════════════════════════════════════════════╝\n");

    let Ok(secret) = std::env::var("JWT_SECRET") else {
        eprintln!("❌ Error: JWT_SECRET is not set");
        return Ok(());
    };

    let subject = prompt("Subject (admin id or service name):")?;
    if subject.is_empty() {
        eprintln!("❌ Error: Subject cannot be empty");
        return Ok(());
    }

    let role = match prompt("Role [admin/service]:")?.to_ascii_lowercase().as_str() {
        "admin" => Role::Admin,
        "service" => Role::Service,
        other => {
            eprintln!("❌ Error: Unknown role '{}'", other);
            return Ok(());
        }
    };

    let days: i64 = match prompt("Lifetime in days [30]:")?.as_str() {
        "" => 30,
        raw => match raw.parse() {
            Ok(days) if days > 0 => days,
            _ => {
                eprintln!("❌ Error: Lifetime must be a positive number of days");
                return Ok(());
            }
        },
    };

    let exp = (chrono::Utc::now() + chrono::Duration::days(days)).timestamp();
    let claims = Claims {
        sub: subject,
        role,
        exp: usize::try_from(exp).unwrap_or(usize::MAX),
    };

    match issue_token(&claims, &secret) {
        Ok(token) => {
            println!("\n✅ Token valid for {} days:\n", days);
            println!("Authorization: Bearer {}\n", token);
        }
        Err(e) => {
            eprintln!("❌ Error: Failed to sign token: {}", e);
        }
    }

    Ok(())
}
