use reqwest::Client;
use serde_json::Value;

use crate::error::{BotError, Result};
use crate::registry::Registry;
use crate::types::response::DiscordErrorResponse;

/// Push every pending command's schema to Discord and record the assigned
/// ids back into the registry. Any rejection aborts the whole pass; a
/// partially-synced catalog must not serve traffic.
pub async fn sync_commands(
    client: &Client,
    token: &str,
    app_id: &str,
    registry: &mut Registry,
) -> Result<()> {
    let pending: Vec<(String, Option<String>, Value)> = registry
        .pending()
        .iter()
        .map(|c| (c.name.clone(), c.guild_id.clone(), c.registration_json()))
        .collect();

    for (name, guild_id, body) in pending {
        let url = match &guild_id {
            Some(guild) => format!(
                "https://discord.com/api/v10/applications/{}/guilds/{}/commands",
                app_id, guild
            ),
            None => format!(
                "https://discord.com/api/v10/applications/{}/commands",
                app_id
            ),
        };

        let response = client
            .post(&url)
            .header("Authorization", format!("Bot {}", token))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            if let Ok(discord_err) = serde_json::from_str::<DiscordErrorResponse>(&error_text) {
                return Err(BotError::new("registration_failure")
                    .push_str(format!("POST {}: {}", url, discord_err)));
            }

            return Err(BotError::new("registration_failure")
                .push_str(format!("POST {}: {} - {}", url, status, error_text)));
        }

        let created: Value = response.json().await?;
        let Some(remote_id) = created["id"].as_str() else {
            return Err(BotError::new("registration_failure")
                .push_str(format!("POST {}: response carries no id", url)));
        };

        registry.adopt(&name, guild_id.as_deref(), remote_id)?;
        eprintln!("[SYNC] registered /{} -> {}", name, remote_id);
    }

    Ok(())
}

/// Remove a command by remote id, globally or from one guild.
pub async fn delete_command(
    client: &Client,
    token: &str,
    app_id: &str,
    command_id: &str,
    guild_id: Option<&str>,
) -> Result<()> {
    let url = match guild_id {
        Some(guild) => format!(
            "https://discord.com/api/v10/applications/{}/guilds/{}/commands/{}",
            app_id, guild, command_id
        ),
        None => format!(
            "https://discord.com/api/v10/applications/{}/commands/{}",
            app_id, command_id
        ),
    };

    let response = client
        .delete(&url)
        .header("Authorization", format!("Bot {}", token))
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();

        if let Ok(discord_err) = serde_json::from_str::<DiscordErrorResponse>(&error_text) {
            return Err(BotError::new("discord_api_error")
                .push_str(format!("DELETE {}: {}", url, discord_err)));
        }

        return Err(BotError::new("discord_api_error")
            .push_str(format!("DELETE {}: {} - {}", url, status, error_text)));
    }

    Ok(())
}

/// Send a follow-up message through the interaction webhook, for handlers
/// that deferred their first response.
pub async fn send_followup(
    client: &Client,
    token: &str,
    app_id: &str,
    interaction_token: &str,
    payload: &Value,
) -> Result<Value> {
    let url = format!(
        "https://discord.com/api/v10/webhooks/{}/{}",
        app_id, interaction_token
    );

    let response = client
        .post(&url)
        .header("Authorization", format!("Bot {}", token))
        .header("Content-Type", "application/json")
        .json(payload)
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();

        if let Ok(discord_err) = serde_json::from_str::<DiscordErrorResponse>(&error_text) {
            return Err(BotError::new("discord_api_error")
                .push_str(format!("POST {}: {}", url, discord_err)));
        }

        return Err(BotError::new("discord_api_error")
            .push_str(format!("POST {}: {} - {}", url, status, error_text)));
    }

    let message: Value = response.json().await?;
    Ok(message)
}
