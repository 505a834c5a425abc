use super::api::TelegramApiClient;
use super::updates::{to_inbound, TgUpdate};
use crate::channels::Inbound;
use crate::shared::{ChatId, EventLog};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Long-polls for updates until `stop` is raised. Each batch is split by
/// chat: chats are processed concurrently, updates of one chat in order.
pub fn run_polling(
    client: &TelegramApiClient,
    handler: &(dyn Fn(Inbound) + Sync),
    stop: &AtomicBool,
    log: &EventLog,
) {
    let mut offset: Option<i64> = None;
    let mut backoff = Duration::from_secs(1);
    log.info("telegram.poll_started", "polling for updates");

    while !stop.load(Ordering::Relaxed) {
        let updates = match client.get_updates(offset) {
            Ok(updates) => {
                backoff = Duration::from_secs(1);
                updates
            }
            Err(err) => {
                log.warn(
                    "telegram.poll_failed",
                    &format!("getUpdates failed, retrying in {}s: {err}", backoff.as_secs()),
                );
                if !sleep_with_stop(stop, backoff) {
                    break;
                }
                backoff = (backoff * 2).min(MAX_BACKOFF);
                continue;
            }
        };
        if let Some(last) = updates.iter().map(|u| u.update_id).max() {
            offset = Some(last + 1);
        }
        process_batch(client, handler, log, updates);
    }

    log.info("telegram.poll_stopped", "polling stopped");
}

fn process_batch(
    client: &TelegramApiClient,
    handler: &(dyn Fn(Inbound) + Sync),
    log: &EventLog,
    updates: Vec<TgUpdate>,
) {
    for update in &updates {
        if let Some(query) = &update.callback_query {
            if let Err(err) = client.answer_callback_query(&query.id) {
                log.warn(
                    "telegram.callback_ack_failed",
                    &format!("callback={}: {err}", query.id),
                );
            }
        }
    }

    let batches = group_by_chat(updates);
    thread::scope(|scope| {
        for (_, chat_updates) in batches {
            scope.spawn(move || {
                for update in chat_updates {
                    if let Some(inbound) = to_inbound(&update) {
                        handler(inbound);
                    }
                }
            });
        }
    });
}

fn group_by_chat(updates: Vec<TgUpdate>) -> BTreeMap<ChatId, Vec<TgUpdate>> {
    let mut batches: BTreeMap<ChatId, Vec<TgUpdate>> = BTreeMap::new();
    for update in updates {
        if let Some(chat) = update.chat() {
            batches.entry(chat).or_default().push(update);
        }
    }
    batches
}

fn sleep_with_stop(stop: &AtomicBool, total: Duration) -> bool {
    let mut remaining = total;
    while remaining > Duration::from_millis(0) {
        if stop.load(Ordering::Relaxed) {
            return false;
        }
        let step = remaining.min(Duration::from_millis(25));
        thread::sleep(step);
        remaining = remaining.saturating_sub(step);
    }
    !stop.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updates_are_grouped_per_chat_in_arrival_order() {
        let updates: Vec<TgUpdate> = serde_json::from_str(
            r#"[
                {"update_id":1,"message":{"message_id":1,"chat":{"id":10},"text":"a"}},
                {"update_id":2,"message":{"message_id":2,"chat":{"id":20},"text":"b"}},
                {"update_id":3,"callback_query":{"id":"q","from":{"id":10},"data":"main_menu"}},
                {"update_id":4}
            ]"#,
        )
        .expect("parse");
        let batches = group_by_chat(updates);
        assert_eq!(batches.len(), 2);
        let first: Vec<i64> = batches[&ChatId::new(10)]
            .iter()
            .map(|u| u.update_id)
            .collect();
        assert_eq!(first, vec![1, 3]);
    }

    #[test]
    fn sleep_with_stop_returns_early_when_stopped() {
        let stop = AtomicBool::new(true);
        assert!(!sleep_with_stop(&stop, Duration::from_secs(5)));
    }
}
