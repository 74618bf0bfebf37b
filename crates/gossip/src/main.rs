use std::sync::Arc;

use gossip_core::{config::Config, store::RecordStore};

#[tokio::main]
async fn main() -> Result<(), gossip_core::Error> {
    gossip_core::logging::init("gossip")?;

    let cfg = Arc::new(Config::load()?);
    let store = Arc::new(RecordStore::open(&cfg.store_file));

    gossip_telegram::router::run_polling(cfg, store)
        .await
        .map_err(|e| gossip_core::Error::ExternalSurface(format!("telegram bot failed: {e}")))?;

    Ok(())
}
