use anyhow::{anyhow, Result};
use serde::Serialize;

use friendcircle::archive::gateway_url;
use friendcircle::config::FriendCircleConfig;
use friendcircle::users::store;
use friendcircle::users::types::WalletAddress;

#[derive(Debug, Serialize)]
struct ExportEntry {
    cid: String,
    url: String,
}

/// Print a user's archived conversation CIDs and gateway URLs as JSON to stdout.
pub fn export(config: &FriendCircleConfig, wallet: &str) -> Result<()> {
    let wallet: WalletAddress = wallet.parse().map_err(|e: String| anyhow!(e))?;

    let db_path = config.resolved_db_path();
    let conn = friendcircle::db::open_database(&db_path)?;

    let cids = store::cids_for_wallet(&conn, &wallet)?
        .ok_or_else(|| anyhow!("no user registered with wallet {wallet}"))?;

    let entries: Vec<ExportEntry> = cids
        .into_iter()
        .map(|cid| ExportEntry {
            url: gateway_url(&config.archive.gateway_url, &cid),
            cid,
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&entries)?);
    eprintln!("Exported {} conversation CIDs.", entries.len());

    Ok(())
}
