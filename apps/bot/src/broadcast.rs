use std::sync::Arc;

use anyhow::Result;
use market::{PriceTracker, report::UPDATE_TITLE};
use pricebot::{
    market_report,
    schedule::{FiredSlots, Schedule, Slot},
};
use serenity::all::{ChannelId, Http};
use tokio::sync::Mutex;
use tracing::{info, instrument};

#[instrument(
    name = "broadcast",
    skip(http, tracker, schedule, fired),
    fields(channel_id = %channel, slot = %slot)
)]
pub async fn run_broadcast(
    http: Arc<Http>,
    channel: ChannelId,
    tracker: Arc<PriceTracker>,
    schedule: Schedule,
    fired: Arc<Mutex<FiredSlots>>,
    slot: Slot,
) -> Result<()> {
    let today = schedule.local_now().date_naive();
    if !fired.lock().await.claim(today, slot) {
        info!(%today, "slot already broadcast today");
        return Ok(());
    }

    let text = market_report(&tracker, &schedule, UPDATE_TITLE).await;
    channel.say(&http, text).await?;

    info!("market update sent");
    Ok(())
}
