use market::report::LIVE_TITLE;
use serenity::all::{
    ChannelId, Context as SerenityContext, FullEvent, GuildId, Member, Mentionable, Message, User,
};
use tracing::{debug, info, warn};

use crate::{
    Data, Error,
    dispatch::{MemberStatus, Route, join_transition, route, should_welcome, update_transition},
    market_report,
};

pub async fn handle_event(ctx: &SerenityContext, event: &FullEvent, data: &Data) -> Result<(), Error> {
    match event {
        FullEvent::Message { new_message } => on_message(ctx, data, new_message).await,
        FullEvent::GuildMemberAddition { new_member } => on_member_join(ctx, data, new_member).await,
        FullEvent::GuildMemberUpdate {
            old_if_available,
            event,
            ..
        } => {
            let was_pending = old_if_available.as_ref().map(|m| m.pending);
            match update_transition(was_pending, event.pending) {
                Some((old, new)) => on_member_change(ctx, data, event.guild_id, &event.user, old, new).await,
                None => Ok(()),
            }
        }
        _ => Ok(()),
    }
}

async fn on_message(ctx: &SerenityContext, data: &Data, msg: &Message) -> Result<(), Error> {
    // our own reports mention "Prices" and would loop forever
    if msg.author.bot || msg.content.trim().is_empty() {
        return Ok(());
    }

    let table = data.responses.snapshot().await;
    let reply = match route(&table, &msg.content) {
        Route::Price => {
            info!(user_id = msg.author.id.get(), channel_id = %msg.channel_id, "message: price request");
            let _ = msg.channel_id.broadcast_typing(&ctx.http).await;
            market_report(&data.tracker, &data.schedule, LIVE_TITLE).await
        }
        Route::Reply(text) => {
            debug!(user_id = msg.author.id.get(), channel_id = %msg.channel_id, "message: keyword reply");
            text.to_string()
        }
        Route::Ignore => return Ok(()),
    };

    msg.channel_id.say(&ctx.http, reply).await?;
    Ok(())
}

async fn on_member_join(ctx: &SerenityContext, data: &Data, member: &Member) -> Result<(), Error> {
    let (old, new) = join_transition(member.pending);
    on_member_change(ctx, data, member.guild_id, &member.user, old, new).await
}

async fn on_member_change(
    ctx: &SerenityContext,
    data: &Data,
    guild_id: GuildId,
    user: &User,
    old: MemberStatus,
    new: MemberStatus,
) -> Result<(), Error> {
    if !should_welcome(old, new) {
        debug!(user_id = user.id.get(), ?old, ?new, "member: no welcome");
        return Ok(());
    }

    let system = ctx.cache.guild(guild_id).and_then(|guild| guild.system_channel_id);
    let fallback_guild = match system {
        Some(_) => None,
        None => match data.channel.to_channel(ctx).await {
            Ok(channel) => channel.guild().map(|c| c.guild_id),
            Err(e) => {
                warn!(error = ?e, channel_id = %data.channel, "member: cannot resolve broadcast channel");
                None
            }
        },
    };

    let Some(channel) = welcome_channel(system, data.channel, fallback_guild, guild_id) else {
        warn!(
            user_id = user.id.get(),
            guild_id = %guild_id,
            "member: no welcome channel in this guild"
        );
        return Ok(());
    };

    let text = data.responses.templates().await.welcome_for(&user.mention().to_string());

    info!(
        user_id = user.id.get(),
        guild_id = %guild_id,
        channel_id = %channel,
        "member: welcoming"
    );
    channel.say(&ctx.http, text).await?;
    Ok(())
}

/// The guild's system channel, else the broadcast channel when it lives in
/// the same guild. Welcomes never cross into another guild.
fn welcome_channel(
    system: Option<ChannelId>,
    fallback: ChannelId,
    fallback_guild: Option<GuildId>,
    guild: GuildId,
) -> Option<ChannelId> {
    system.or_else(|| (fallback_guild == Some(guild)).then_some(fallback))
}
