use sea_orm::Database;
use sea_orm_migration::prelude::*;

const USAGE: &str = "usage: migration [up [N] | down [N] | fresh | refresh | status]";

fn parse_steps(arg: Option<String>) -> Result<Option<u32>, String> {
    arg.map(|raw| {
        raw.parse::<u32>()
            .map_err(|_| format!("invalid step count '{raw}'\n{USAGE}"))
    })
    .transpose()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut args = std::env::args().skip(1);
    let cmd = args.next().unwrap_or_else(|| "up".to_string());

    let db_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:./flowdistributor.db?mode=rwc".to_string());
    let db = Database::connect(&db_url).await?;

    match cmd.as_str() {
        "up" => migration::Migrator::up(&db, parse_steps(args.next())?).await?,
        "down" => {
            // Without a count, roll back a single migration, never the whole schema.
            let steps = parse_steps(args.next())?.unwrap_or(1);
            migration::Migrator::down(&db, Some(steps)).await?
        }
        "fresh" => migration::Migrator::fresh(&db).await?,
        "refresh" => migration::Migrator::refresh(&db).await?,
        "status" => migration::Migrator::status(&db).await?,
        _ => {
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    }

    Ok(())
}
