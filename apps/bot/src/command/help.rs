use std::fmt::Write as _;

use crate::{Context, Error, responses::ResponseTable};

/// List commands and auto-reply keywords
#[poise::command(slash_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let table = ctx.data().responses.snapshot().await;
    ctx.say(help_text(&table)).await?;
    Ok(())
}

pub fn help_text(table: &ResponseTable) -> String {
    let mut text = String::from(
        "📌 Commands:\n\
         - /price: Live market prices\n\
         - /reload: Reload auto-replies\n\
         - /help: This message\n",
    );

    let keywords: Vec<&str> = table.keywords().collect();
    if keywords.is_empty() {
        text.push_str("\nNo auto-reply keywords configured.");
    } else {
        let _ = write!(text, "\n💬 Keywords: {}", keywords.join(", "));
    }
    text.push_str("\nAny message mentioning \"price\" gets the live report.");
    text
}
