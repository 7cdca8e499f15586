use anyhow::Result;
use clap::Parser;
use tracing::info;

use homepage_sync::config::SyncConfig;
use homepage_sync::firestore::FirestoreStore;
use homepage_sync::homepage::assemble::HomepageAssembler;
use homepage_sync::igdb::client::IgdbClient;
use homepage_sync::tracing::init_tracing;
use homepage_sync::util::env::init_env;

/// Rebuilds the homepage sections document from provider popularity data
/// and publishes it wholesale to the destination store.
#[derive(Debug, Parser)]
#[command(name = "homepage_sync", version, about)]
struct Args {
    /// Assemble and print the document without writing to Firestore.
    #[arg(long)]
    dry_run: bool,

    /// Tracing filter when RUST_LOG is unset (e.g. "info", "homepage=debug").
    #[arg(long, default_value = "info")]
    log_filter: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_env();
    init_tracing(&args.log_filter)?;

    let cfg = SyncConfig::from_env()?;
    let catalog = IgdbClient::new(&cfg)?;
    let assembler = HomepageAssembler::new(&catalog, &cfg);

    if args.dry_run {
        let doc = assembler.assemble().await?;
        println!("{}", serde_json::to_string_pretty(&doc)?);
        info!(target = "homepage_sync", "dry run complete; nothing written");
        return Ok(());
    }

    let store = FirestoreStore::connect(&cfg).await?;
    let doc = assembler.run(&store).await?;
    info!(
        target = "homepage_sync",
        featured = doc.featured.len(),
        popular = doc.popular.len(),
        genres = doc.genres.len(),
        "sync complete"
    );
    Ok(())
}
