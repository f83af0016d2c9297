use super::*;

impl App {
    /// Snapshot of past exchanges sent as context with the next query,
    /// clamped to the configured turn budget.
    pub(super) fn history_payload(&self) -> Vec<ChatTurn> {
        let max_messages = self.config.history_max_turns.saturating_mul(2);
        let start = self.chat_turns.len().saturating_sub(max_messages);
        self.chat_turns[start..].to_vec()
    }

    /// Record a finished exchange, dropping the oldest turns once past the
    /// budget so the in-memory context never grows without bound.
    pub(super) fn record_exchange(&mut self, query: &str, reply: &str) {
        self.chat_turns.push(ChatTurn::user(query));
        self.chat_turns.push(ChatTurn::assistant(reply));
        let max_messages = self.config.history_max_turns.saturating_mul(2);
        if self.chat_turns.len() > max_messages {
            let drop = self.chat_turns.len() - max_messages;
            self.chat_turns.drain(..drop);
        }
    }
}
