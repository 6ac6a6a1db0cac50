//! Inbound command listener.
//!
//! Long-polls getUpdates on its own thread and answers users directly:
//! `/start` gets the greeting, any other text is echoed back, non-text
//! messages get a stock reply. The listener shares the alert transport but is
//! otherwise outside the detection path; losing it never stops the pipeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::notify::telegram::{TelegramClient, Update};

const GREETING: &str = "Welcome!\nThis bot sends a notification whenever the camera in your \
                        lift cabin spots an incident.";
const NON_TEXT_REPLY: &str = "Nice try!";

/// Pause before re-polling after a transport error.
const RETRY_PAUSE: Duration = Duration::from_secs(3);

pub struct CommandListener {
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl CommandListener {
    /// Start the polling thread.
    pub fn spawn(client: Arc<TelegramClient>) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let thread_shutdown = shutdown.clone();
        let join = std::thread::spawn(move || {
            poll_loop(client, thread_shutdown);
        });

        Self {
            shutdown,
            join: Some(join),
        }
    }

    /// Signal the thread and wait for it to finish its current poll.
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("command listener thread panicked"))?;
        }
        Ok(())
    }
}

fn poll_loop(client: Arc<TelegramClient>, shutdown: Arc<AtomicBool>) {
    let mut offset: i64 = 0;
    log::info!("command listener polling for updates");

    while !shutdown.load(Ordering::SeqCst) {
        let updates = match client.get_updates(offset) {
            Ok(updates) => updates,
            Err(e) => {
                log::warn!("getUpdates failed: {}", e);
                std::thread::sleep(RETRY_PAUSE);
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            respond(&client, &update);
        }
    }

    log::info!("command listener stopped");
}

fn respond(client: &TelegramClient, update: &Update) {
    let Some(message) = &update.message else {
        return;
    };
    let chat_id = message.chat.id.to_string();
    let reply = reply_for(message.text.as_deref());
    if let Err(e) = client.send_message(&chat_id, reply) {
        log::warn!("command reply to chat {} failed: {}", chat_id, e);
    }
}

fn reply_for(text: Option<&str>) -> &str {
    match text {
        Some(text) if text.trim() == "/start" => GREETING,
        Some(text) => text,
        None => NON_TEXT_REPLY,
    }
}
