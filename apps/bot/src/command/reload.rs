use tracing::{info, warn};

use crate::{Context, Error};

/// Reload keyword responses from disk
#[poise::command(slash_command)]
pub async fn reload(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer().await?;

    let user_id = ctx.author().id.get();
    let store = &ctx.data().responses;

    info!(user_id, path = %store.path().display(), "reload: invoked");

    match store.reload().await {
        Ok(templates) => {
            ctx.say(templates.reload_success).await?;
        }
        Err(e) => {
            // the previous table stays active
            warn!(user_id, error = ?e, "reload: failed");
            ctx.say(format!("⚠️ Could not reload responses: {e:#}"))
                .await?;
        }
    }

    Ok(())
}
