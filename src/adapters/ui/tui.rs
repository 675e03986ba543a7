//! Inquire-based interactive prompts: theme and chat picker.

use crate::domain::{Chat, ChatType, DomainError};
use inquire::ui::{Color, RenderConfig, StyleSheet, Styled};
use inquire::Select;

fn chat_type_indicator(kind: ChatType) -> &'static str {
    match kind {
        ChatType::User => "[U]",
        ChatType::Group => "[G]",
        ChatType::Supergroup => "[S]",
        ChatType::Channel => "[C]",
    }
}

/// Applies the prompt theme for all subsequent inquire prompts.
pub fn apply_theme() {
    let config = RenderConfig::default()
        .with_prompt_prefix(Styled::new("?").with_fg(Color::LightCyan))
        .with_highlighted_option_prefix(Styled::new(">").with_fg(Color::LightGreen))
        .with_selected_option(Some(StyleSheet::new().with_fg(Color::LightGreen)));
    inquire::set_global_render_config(config);
}

/// Let the user pick one chat from their dialogs. Used when no chat id is
/// configured.
pub fn pick_chat(chats: &[Chat]) -> Result<i64, DomainError> {
    if chats.is_empty() {
        return Err(DomainError::Config("no dialogs available".into()));
    }
    let options: Vec<String> = chats
        .iter()
        .map(|c| format!("{} {} ({})", chat_type_indicator(c.kind), c.title, c.id))
        .collect();
    let selected = Select::new("Select a chat to download from", options.clone())
        .prompt()
        .map_err(|e| DomainError::Config(e.to_string()))?;
    // Map the selected display string back to its chat id.
    let index = options
        .iter()
        .position(|o| *o == selected)
        .ok_or_else(|| DomainError::Config("invalid chat selection".into()))?;
    Ok(chats[index].id)
}
