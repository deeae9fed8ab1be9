//! Notification text.

use crate::github::ReleaseInfo;

/// Release notes longer than this are cut in notifications.
pub const NOTES_PREVIEW_CHARS: usize = 300;

/// Cuts `text` to at most `max` characters, appending `...` when anything
/// was dropped. Never splits a multi-byte character.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Static parts of a notification for one watched project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
    pub project: String,
    pub repo: String,
    pub upgrade_commands: Vec<String>,
}

impl MessageTemplate {
    /// Link to the release page, preferring the URL GitHub reported.
    pub fn release_url(&self, release: &ReleaseInfo) -> String {
        if release.html_url.is_empty() {
            format!("https://github.com/{}/releases/tag/{}", self.repo, release.tag)
        } else {
            release.html_url.clone()
        }
    }

    /// Renders the announcement for `release`.
    pub fn render(&self, release: &ReleaseInfo, local: Option<&str>) -> String {
        let upgraded_from_known = local.is_some_and(|l| l != release.tag);
        let emoji = if upgraded_from_known { "🎉" } else { "📢" };

        let mut message = format!(
            "{emoji} **{} update available**\n\nNew version: **{}**\n",
            self.project, release.tag
        );
        if let Some(local) = local {
            message.push_str(&format!("Current version: `{local}`\n"));
        }

        let notes = release.body.trim();
        if !notes.is_empty() {
            message.push_str(&format!(
                "\n📋 **Release notes:**\n{}\n",
                truncate_chars(notes, NOTES_PREVIEW_CHARS)
            ));
        }

        message.push_str(&format!("\n🔗 **Details:** {}\n", self.release_url(release)));

        if !self.upgrade_commands.is_empty() {
            let commands = self
                .upgrade_commands
                .iter()
                .map(|cmd| format!("```\n{cmd}\n```"))
                .collect::<Vec<_>>()
                .join("\nor\n");
            message.push_str(&format!("\n💻 **Upgrade:**\n{commands}\n"));
        }

        message
    }
}
