use anyhow::Result;

use friendcircle::config::FriendCircleConfig;
use friendcircle::users::store;
use friendcircle::users::types::Tag;

/// Display user and tag statistics in the terminal.
pub fn stats(config: &FriendCircleConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = friendcircle::db::open_database(&db_path)?;

    let stats = store::user_stats(&conn)?;

    println!("User Statistics");
    println!("{}", "=".repeat(40));
    println!("  Total users:         {}", stats.total_users);
    println!("  With wallet:         {}", stats.registered_users);
    println!("  Setup completed:     {}", stats.completed_setup);
    println!("  Archived CIDs:       {}", stats.conversation_cids);
    println!();

    println!("By Tag:");
    for tag in Tag::ALL {
        let count = stats.by_tag.get(tag.as_str()).copied().unwrap_or(0);
        println!("  {:<14} {}", tag.as_str(), count);
    }

    Ok(())
}
