//! CLI `doctor` command: run database diagnostics and print a health report.

use anyhow::{Context, Result};

use friendcircle::config::FriendCircleConfig;
use friendcircle::db;

/// Run database diagnostics and print a health report.
pub fn doctor(config: &FriendCircleConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `friendcircle serve` to initialize.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    let conn = db::open_database(&db_path).context("failed to open database (may be corrupt)")?;
    let report = db::check_database_health(&conn).context("failed to run health check")?;

    println!("FriendCircle Health Report");
    println!("==========================");
    println!();
    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    println!();
    println!("Row counts:");
    println!("  Users:           {}", report.user_count);
    println!("  Tags:            {}", report.tag_count);
    println!("  CIDs:            {}", report.cid_count);
    println!();
    println!("Collaborators:");
    println!("  Classifier:      {} ({})", config.classifier.api_url, config.classifier.model);
    println!("  Archive:         {}", config.archive.api_url);
    println!("  Relay:           {}", config.chat.relay_url);
    if config.classifier.api_key.is_empty() {
        println!("  WARNING: classifier api_key is not set (FRIENDCIRCLE_LLM_API_KEY)");
    }
    if config.archive.api_token.is_empty() {
        println!("  WARNING: archive api_token is not set (FRIENDCIRCLE_ARCHIVE_TOKEN)");
    }
    println!();
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
