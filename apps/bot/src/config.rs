use std::env::var;

use anyhow::{Context as _, Error, ensure};

use crate::schedule::Schedule;

pub const DEFAULT_BROADCAST_TIMES: &str = "09:00,12:00,18:00";
pub const DEFAULT_BROADCAST_TZ: &str = "UTC";

#[derive(Clone)]
pub struct Config {
    pub discord_token: String,
    pub target_channel_id: u64,
    pub version: String,
    pub schedule: Schedule,
}

impl Config {
    /// Missing or malformed values are fatal; the bot never starts half-configured.
    pub fn from_env() -> Result<Self, Error> {
        let discord_token = var("DISCORD_TOKEN").context("DISCORD_TOKEN not set")?;
        let target_channel_id = var("DISCORD_TARGET_CHANNEL_ID")
            .context("DISCORD_TARGET_CHANNEL_ID not set")?
            .trim()
            .parse::<u64>()
            .context("DISCORD_TARGET_CHANNEL_ID is not a channel id")?;
        ensure!(target_channel_id != 0, "DISCORD_TARGET_CHANNEL_ID must be non-zero");

        let times = var("BROADCAST_TIMES").unwrap_or_else(|_| DEFAULT_BROADCAST_TIMES.to_string());
        let tz = var("BROADCAST_TZ").unwrap_or_else(|_| DEFAULT_BROADCAST_TZ.to_string());
        let schedule = Schedule::parse(&times, &tz).context("invalid BROADCAST_TIMES/BROADCAST_TZ")?;

        Ok(Self {
            discord_token,
            target_channel_id,
            version: var("APP_VERSION").unwrap_or_else(|_| "Unknown".to_string()),
            schedule,
        })
    }
}
