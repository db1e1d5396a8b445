use colored::*;
use migration::Migrator;
use sea_orm_migration::prelude::*;
use std::io::{self, Write};
use std::time::Instant;

const STATUS_COLUMN: usize = 80;

/// Applies pending migrations one at a time, printing a status line for each.
pub async fn run_all_migrations(url: &str) {
    let db = sea_orm::Database::connect(url)
        .await
        .expect("DB connection failed");

    let pending = Migrator::get_pending_migrations(&db)
        .await
        .expect("Failed to read migration status");

    if pending.is_empty() {
        println!("{}", "Nothing to migrate".dimmed());
        return;
    }

    println!("Running {} migration(s)...", pending.len());
    for migration in pending {
        let name_str = format!("Applying {}", migration.name().bold());
        let dots = ".".repeat(STATUS_COLUMN.saturating_sub(name_str.len()));
        print!("{}{} ", name_str, dots);
        let _ = io::stdout().flush();

        let start = Instant::now();
        match Migrator::up(&db, Some(1)).await {
            Ok(()) => {
                let time_str = format!("({:.2?})", start.elapsed()).dimmed();
                println!("{} {}", "done".green(), time_str);
            }
            Err(e) => {
                println!("{} {}", "failed".red(), e);
                std::process::exit(1);
            }
        }
    }
}
