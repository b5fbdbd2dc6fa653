// help.rs - Help Command Module
// Lists the bot commands with the configured prefix

use serenity::{
    client::Context,
    framework::standard::{macros::command, macros::group, CommandResult},
    model::channel::Message,
};

use crate::commands::services;

pub fn help_text(prefix: &str, min_topic: usize, max_topic: usize) -> String {
    format!(
        r#"**📚 Docs Drafter - Command Help**

**📝 Drafting:**
• `{p}draft <text>` - Generate an article and save it as a WordPress draft
• `{p}draft` with a .txt attachment - Use the file as the article source
• `{p}draft` as a reply - Use the replied-to message as the source
• `<text> {p}draft` - Same as `{p}draft <text>`
• `{p}reloadprompts` - Reload the prompt templates

**🔍 Search:**
• `{p}topic <term>` - Search the documentation ({min}-{max} characters), results go to a new thread

**⚙️ Settings:**
• `{p}setrelatedarticles [1-10]` - Show or set related articles per draft
• `{p}setrelatedvideos [1-10]` - Show or set related videos per draft
• `{p}status` - Current settings

**❓ Help:**
• `{p}help` - Show this message"#,
        p = prefix,
        min = min_topic,
        max = max_topic,
    )
}

#[command]
#[aliases("h", "commands")]
/// Display help information for all available commands
pub async fn help(ctx: &Context, msg: &Message) -> CommandResult {
    let text = match services(ctx).await {
        Some(services) => {
            let config = services.config.read().await;
            help_text(
                &services.prefix,
                config.commands.topic.min_length,
                config.commands.topic.max_length,
            )
        }
        None => help_text("!", 3, 100),
    };
    msg.reply(ctx, text).await?;
    Ok(())
}

#[group]
#[commands(help)]
pub struct Help;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_help_uses_prefix() {
        let text = help_text("?", 3, 100);
        assert!(text.contains("`?draft <text>`"));
        assert!(text.contains("`?setrelatedvideos [1-10]`"));
        assert!(text.contains("3-100 characters"));
        assert!(!text.contains("{p}"));
    }
}
