use market::report::LIVE_TITLE;
use tracing::info;

use crate::{Context, Error, market_report};

/// Show live market prices
#[poise::command(slash_command)]
pub async fn price(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer().await?;

    let user_id = ctx.author().id.get();
    info!(user_id, "price: invoked");

    let data = ctx.data();
    let text = market_report(&data.tracker, &data.schedule, LIVE_TITLE).await;
    ctx.say(text).await?;

    info!(user_id, "price: report sent");
    Ok(())
}
