use std::{sync::Arc, time::Duration};

use anyhow::Result;
use chrono::Utc;
use market::{Instrument, ObservationStore, PriceTracker, QuoteClient};
use poise::{Framework, FrameworkOptions};
use pricebot::{
    Data, command, config::Config, event, responses::ResponseStore, schedule::FiredSlots,
};
use serenity::all::{ActivityData, ChannelId, ClientBuilder, GatewayIntents};
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod broadcast;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let channel = ChannelId::new(config.target_channel_id);

    let responses = Arc::new(ResponseStore::from_env().await);
    let tracker = Arc::new(
        PriceTracker::load(
            Instrument::defaults(),
            QuoteClient::from_env()?,
            ObservationStore::from_env(),
        )
        .await,
    );

    let intents = GatewayIntents::non_privileged()
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::MESSAGE_CONTENT;

    let framework = Framework::builder()
        .options(FrameworkOptions {
            event_handler: |serenity_ctx, event, _framework_ctx, data| {
                Box::pin(async move {
                    if let Err(e) = event::handle_event(serenity_ctx, event, data).await {
                        error!(error = ?e, "event handling failed");
                    }
                    Ok(())
                })
            },
            commands: command::all(),
            ..Default::default()
        })
        .setup({
            let responses = Arc::clone(&responses);
            let tracker = Arc::clone(&tracker);
            let config = config.clone();

            move |ctx, ready, framework| {
                let responses = Arc::clone(&responses);
                let tracker = Arc::clone(&tracker);
                let config = config.clone();

                Box::pin(async move {
                    info!(
                        "{} [{}] connected successfully!",
                        ready.user.name, ready.user.id
                    );

                    poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                    let ctx_clone = ctx.clone();
                    let version = config.version.clone();
                    let schedule = config.schedule.clone();
                    tokio::spawn(async move {
                        let mut show_version = true;
                        let mut tick = tokio::time::interval(Duration::from_secs(30));

                        loop {
                            tick.tick().await;

                            let text = if show_version {
                                if version.starts_with('v') {
                                    version.clone()
                                } else {
                                    format!("Version - {}", version)
                                }
                            } else {
                                match schedule.next_after(Utc::now()) {
                                    Some((_, at)) => {
                                        format!("Next update - {}", at.format("%H:%M (%Z)"))
                                    }
                                    None => "No update scheduled".to_string(),
                                }
                            };

                            ctx_clone.set_activity(Some(ActivityData::custom(text)));
                            show_version = !show_version;
                        }
                    });

                    Ok(Data {
                        responses,
                        tracker,
                        schedule: config.schedule,
                        channel,
                    })
                })
            }
        })
        .build();

    let mut client = ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .await?;

    let http = client.http.clone();

    let sched = JobScheduler::new().await?;
    let fired = Arc::new(Mutex::new(FiredSlots::default()));

    for slot in config.schedule.slots().iter().copied() {
        let http = http.clone();
        let tracker = Arc::clone(&tracker);
        let schedule = config.schedule.clone();
        let fired = Arc::clone(&fired);

        sched
            .add(Job::new_async_tz(
                slot.cron().as_str(),
                config.schedule.tz(),
                move |_uuid, _l| {
                    let http = http.clone();
                    let tracker = Arc::clone(&tracker);
                    let schedule = schedule.clone();
                    let fired = Arc::clone(&fired);

                    Box::pin(async move {
                        if let Err(e) =
                            broadcast::run_broadcast(http, channel, tracker, schedule, fired, slot)
                                .await
                        {
                            error!(error = ?e, %slot, "run_broadcast failed");
                        }
                    })
                },
            )?)
            .await?;
    }

    match config.schedule.next_after(Utc::now()) {
        Some((slot, at)) => info!(
            slots = config.schedule.slots().len(),
            tz = %config.schedule.tz(),
            %slot,
            at = %at.format("%Y-%m-%d %H:%M %Z"),
            "market updates scheduled"
        ),
        None => warn!("no upcoming market update could be computed"),
    }

    sched.shutdown_on_ctrl_c();
    sched.start().await?;

    tokio::spawn(async move {
        if let Err(why) = client.start().await {
            error!("Client error: {why:?}");
        }
    });

    shutdown_signal().await?;

    info!("Shutdown complete.");
    Ok(())
}

async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::{
            select,
            signal::unix::{SignalKind, signal},
        };
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv()  => {},
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }

    Ok(())
}
