use ravetable::libs::rave;
use ravetable::{Config, Connection, RequestCache, render_inputs};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "rave.toml".to_string());
    let department = args.next().unwrap_or_else(|| "Police".to_string());

    let config = Config::from_file(&path)?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("ravetable={}", config.logging.level)))
        .init();

    let mut conn = Connection::open_or_exit(&config.database).await;
    let mut cache = RequestCache::new();

    let roster = rave::department_roster(&mut conn, &department).await?;
    println!("{} ({} people)", department, roster.rows().len());
    for row in roster.rows() {
        println!(
            "  {:<32} {:<24} {}",
            row.text(rave::LOADER_ID),
            rave::display_name(row),
            row.text("Role")
        );
    }

    if let Some(first) = roster.first_row() {
        let id = first.text(rave::LOADER_ID);
        let person = rave::person(&mut conn, &mut cache, &department, &id).await?;
        if let Some(row) = person.first_row() {
            println!("\nEdit form for {}:", rave::display_name(row));
            print!("{}", render_inputs(&person)?);
        }
    }

    println!("\nsmartloader.csv:");
    print!("{}", rave::smartloader_export(&mut conn).await?);

    conn.close().await?;
    Ok(())
}
