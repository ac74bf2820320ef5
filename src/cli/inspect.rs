//! CLI `inspect` command: display a single user record.

use anyhow::{bail, Result};

use friendcircle::config::FriendCircleConfig;
use friendcircle::users::store;
use friendcircle::users::types::WalletAddress;

/// Look a user up by wallet (if `who` parses as one) or by uid.
pub fn inspect(config: &FriendCircleConfig, who: &str) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = friendcircle::db::open_database(&db_path)?;

    let user = match who.parse::<WalletAddress>() {
        Ok(wallet) => store::find_by_wallet(&conn, &wallet)?,
        Err(_) => store::find_by_uid(&conn, who)?,
    };
    let Some(u) = user else {
        bail!("no user matches {who}");
    };

    println!("User: {}", u.uid);
    println!("{}", "=".repeat(50));
    println!("  Wallet:          {}", u.wallet_address.as_deref().unwrap_or("(not registered)"));
    println!("  Setup completed: {}", u.is_setup_completed);
    println!("  Created:         {}", u.created_at);
    println!("  Updated:         {}", u.updated_at);
    println!();

    let tags: Vec<&str> = u.tags.iter().map(|t| t.as_str()).collect();
    println!("Tags: {}", if tags.is_empty() { "(none)".to_string() } else { tags.join(", ") });

    if !u.conversation_cids.is_empty() {
        println!();
        println!("Archived conversations:");
        for cid in &u.conversation_cids {
            println!("  {cid}");
        }
    }

    Ok(())
}
