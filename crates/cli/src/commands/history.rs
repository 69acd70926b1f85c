//! `fitcoach history`: print what was said in a stored session.

use fitcoach_core::message::{Message, Role};
use fitcoach_core::session::SessionKey;
use std::path::Path;

/// User messages and final agent answers; tool traffic is left out.
fn is_visible(message: &Message) -> bool {
    match message.role {
        Role::User => true,
        Role::Assistant => message.tool_calls.is_empty() && !message.content.trim().is_empty(),
        Role::System | Role::Tool => false,
    }
}

pub async fn run(
    config_path: Option<&Path>,
    user: Option<String>,
    session: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let user_id = user.unwrap_or_else(|| config.session.user_id.clone());
    let store = fitcoach_session::open(&config.session, false).await?;

    let session_id = match session {
        Some(id) => Some(id),
        None => store
            .list(&config.app_name, &user_id)
            .await?
            .into_iter()
            .next()
            .map(|s| s.key.session_id),
    };

    let Some(session_id) = session_id else {
        store.close().await;
        println!("No sessions for {user_id} yet.");
        return Ok(());
    };

    let key = SessionKey::new(&config.app_name, &user_id, &session_id);
    let session = store.get(&key).await;
    store.close().await;
    let session = session?.ok_or_else(|| format!("Session not found: {key}"))?;

    println!("Session {session_id}");
    println!("========================================");
    for message in session.events.iter().filter(|m| is_visible(m)) {
        println!(
            "[{}] {} > {}",
            message.timestamp.format("%Y-%m-%d %H:%M"),
            message.author(),
            message.content
        );
    }

    Ok(())
}
