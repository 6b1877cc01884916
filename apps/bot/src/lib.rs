use std::sync::Arc;

use market::{PriceTracker, report::format_report};
use serenity::all::ChannelId;

use crate::{responses::ResponseStore, schedule::Schedule};

pub mod command;
pub mod config;
pub mod dispatch;
pub mod event;
pub mod responses;
pub mod schedule;

pub struct Data {
    pub responses: Arc<ResponseStore>,
    pub tracker: Arc<PriceTracker>,
    pub schedule: Schedule,
    /// Group channel for broadcasts and the welcome fallback.
    pub channel: ChannelId,
}

pub type Error = anyhow::Error;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Fetch a fresh snapshot and render it, stamped in the schedule's zone.
pub async fn market_report(tracker: &PriceTracker, schedule: &Schedule, title: &str) -> String {
    let quotes = tracker.snapshot().await;
    format_report(&quotes, title, &schedule.local_now())
}
