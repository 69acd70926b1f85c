//! `fitcoach sessions`: list stored sessions.

use std::path::Path;

pub async fn run(config_path: Option<&Path>, user: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let user_id = user.unwrap_or_else(|| config.session.user_id.clone());

    let store = fitcoach_session::open(&config.session, false).await?;
    let sessions = store.list(&config.app_name, &user_id).await;
    store.close().await;
    let sessions = sessions?;

    println!("Sessions for {user_id} ({})", config.app_name);
    println!("========================================");

    if sessions.is_empty() {
        println!("  (none yet, run `fitcoach chat` to start one)");
        return Ok(());
    }

    for s in &sessions {
        println!(
            "  {:<38} {:>4} messages   last active {}",
            s.key.session_id,
            s.event_count,
            s.updated_at.format("%Y-%m-%d %H:%M"),
        );
    }
    println!("\n  {} session(s)", sessions.len());

    Ok(())
}
