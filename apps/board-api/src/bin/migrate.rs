//! Applies the embedded schema migrations for the usage-counter table.
//!
//!   cargo run -p board-api --bin board-migrate             # apply
//!   cargo run -p board-api --bin board-migrate -- --pending # list only
//!
//! DATABASE_URL comes from the environment or `.env`.

use std::error::Error;
use std::path::Path;

use diesel::pg::PgConnection;
use diesel::migration::Migration;
use diesel::Connection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

type BoxError = Box<dyn Error + Send + Sync>;

fn main() -> Result<(), BoxError> {
    if dotenvy::dotenv().is_err() {
        let _ = dotenvy::from_path(Path::new(env!("CARGO_MANIFEST_DIR")).join(".env"));
    }

    let list_only = std::env::args().skip(1).any(|arg| arg == "--pending");
    let database_url =
        std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL env var is required")?;

    let mut conn = PgConnection::establish(&database_url)?;

    if list_only {
        let pending = conn.pending_migrations(MIGRATIONS)?;
        if pending.is_empty() {
            println!("recruiter_post_limits schema is up to date.");
        }
        for migration in pending {
            println!("  pending: {}", migration.name());
        }
        return Ok(());
    }

    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    match applied.len() {
        0 => println!("recruiter_post_limits schema is up to date."),
        n => {
            for version in &applied {
                println!("  applied: {version}");
            }
            println!("{n} migration(s) applied.");
        }
    }
    Ok(())
}
