//! Message templates for outbound notification bodies.
//!
//! Large fixed texts live under `messages/` and are embedded at compile
//! time; the monitor only supplies substitution values. Template files are
//! authored pre-escaped for MarkdownV2.

/// Loaded message templates.
pub struct MessageTemplates {
    notification_footer: String,
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self {
            notification_footer: include_str!("../messages/notification_footer.txt")
                .trim()
                .to_string(),
        }
    }
}

impl MessageTemplates {
    /// The notification footer with the (already escaped) keyword filled in.
    #[must_use]
    pub fn notification_footer(&self, keyword: &str) -> String {
        self.notification_footer.replace("{keyword}", keyword)
    }
}
