use super::*;

impl App {
    fn fill_placeholder(&mut self, replacement: &str) {
        if let Some(i) = self.assistant_idx {
            if let Some(entry) = self.entries.get_mut(i) {
                if entry.text.contains(THINKING_PLACEHOLDER) {
                    entry.text = entry.text.replacen(THINKING_PLACEHOLDER, replacement, 1);
                } else if entry.text.trim().is_empty() {
                    entry.text = replacement.to_string();
                }
            }
        }
    }

    pub(super) fn cancel_running_request(&mut self, reason: &str) {
        if !self.running {
            return;
        }
        self.fill_placeholder("(cancelled)");
        self.clear_running_state();
        self.last_status = "cancelled".to_string();
        self.push_entry(EntryKind::System, reason.to_string());
    }

    pub(super) fn poll_worker(&mut self) -> bool {
        if let Some(rx) = self.rx.clone() {
            let mut processed_any = false;
            let mut render_changed = false;
            loop {
                match rx.try_recv() {
                    Ok(WorkerEvent::Chunk(chunk)) => {
                        processed_any = true;
                        let chunk = sanitize_runtime_text(&chunk);
                        if chunk.is_empty() {
                            continue;
                        }
                        self.streamed_chars += chunk.chars().count();
                        if let Some(i) = self.assistant_idx {
                            if let Some(entry) = self.entries.get_mut(i) {
                                if !self.stream_had_chunk
                                    && entry.text.contains(THINKING_PLACEHOLDER)
                                {
                                    entry.text = entry.text.replacen(THINKING_PLACEHOLDER, "", 1);
                                }
                                entry.text.push_str(&chunk);
                                render_changed = true;
                            }
                        }
                        self.stream_had_chunk = true;
                        self.last_status = "streaming".to_string();
                    }
                    Ok(WorkerEvent::KnowledgeBases(bases)) => {
                        processed_any = true;
                        self.known_bases = bases.into_iter().map(|b| b.name).collect();
                    }
                    Ok(WorkerEvent::Done(final_text)) => {
                        processed_any = true;
                        render_changed = true;
                        let elapsed_secs = self.running_elapsed_secs();
                        let pending_query = self.pending_query.take();
                        if let Some(i) = self.assistant_idx {
                            if let Some(entry) = self.entries.get_mut(i) {
                                if entry.elapsed_secs.is_none() {
                                    entry.elapsed_secs = Some(elapsed_secs);
                                }
                                if !self.stream_had_chunk {
                                    let final_text = final_text.trim();
                                    if final_text.is_empty() {
                                        if entry.text.trim().is_empty()
                                            || entry.text.trim() == THINKING_PLACEHOLDER
                                        {
                                            entry.text = "(no output)".to_string();
                                        }
                                    } else if entry.text.trim() == THINKING_PLACEHOLDER {
                                        entry.text = final_text.to_string();
                                    } else {
                                        entry.text.push_str(final_text);
                                    }
                                } else if entry.text.trim().is_empty() {
                                    entry.text = "(no output)".to_string();
                                }
                            }
                            // A finished chat exchange joins the context window.
                            if let Some(query) = pending_query {
                                let reply = self
                                    .entries
                                    .get(i)
                                    .map(|entry| cleaned_assistant_text(entry))
                                    .unwrap_or_default();
                                let reply = reply.trim();
                                if !reply.is_empty() && reply != "(no output)" {
                                    self.record_exchange(&query, reply);
                                }
                            }
                        }
                        self.clear_running_state();
                        self.last_status =
                            format!("done ({:02}:{:02})", elapsed_secs / 60, elapsed_secs % 60);
                        break;
                    }
                    Ok(WorkerEvent::Error(err)) => {
                        processed_any = true;
                        render_changed = true;
                        // Keep partial streamed text; only a bare placeholder
                        // becomes the failure marker.
                        if let Some(i) = self.assistant_idx {
                            if let Some(entry) = self.entries.get_mut(i) {
                                if entry.text.trim().is_empty()
                                    || entry.text.trim() == THINKING_PLACEHOLDER
                                {
                                    entry.text = "(failed)".to_string();
                                }
                            }
                        }
                        self.push_entry(EntryKind::Error, err);
                        self.clear_running_state();
                        self.last_status = "error".to_string();
                        break;
                    }
                    Err(crossbeam_channel::TryRecvError::Empty) => break,
                    Err(crossbeam_channel::TryRecvError::Disconnected) => {
                        processed_any = true;
                        render_changed = true;
                        if let Some(i) = self.assistant_idx {
                            if let Some(entry) = self.entries.get_mut(i) {
                                if entry.text.trim().is_empty()
                                    || entry.text.trim() == THINKING_PLACEHOLDER
                                {
                                    entry.text = "(disconnected)".to_string();
                                }
                            }
                        }
                        self.clear_running_state();
                        self.last_status = "disconnected".to_string();
                        break;
                    }
                }
            }
            if render_changed {
                self.follow_scroll();
            }
            processed_any
        } else {
            false
        }
    }
}
