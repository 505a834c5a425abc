use crate::channels::{Inbound, InboundKind, Transport};
use crate::config::{ConfigError, Settings};
use crate::dispatch::catalog::names;
use crate::dispatch::{Dispatcher, FlowError, Input, Services, Turn};
use crate::notify::{FanOut, Notifier};
use crate::orders::{
    Actor, LifecycleError, MediaItem, OrderLifecycle, OrderRepository, PaymentOutcome,
    RepositoryError, Role, SqliteOrderStore, UserDirectory,
};
use crate::payments::{
    parse_payment_event, HttpPaymentClient, PaymentError, PaymentEvent, PaymentGateway,
};
use crate::session::FileSessionStore;
use crate::shared::{ChatId, EventLog, MessageId};
use chrono::{NaiveDateTime, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error(transparent)]
    Flow(#[from] FlowError),
}

type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// One mutex per chat, created on first use.
#[derive(Default)]
struct ChatLocks {
    locks: Mutex<HashMap<ChatId, Arc<Mutex<()>>>>,
}

impl ChatLocks {
    fn map(&self) -> MutexGuard<'_, HashMap<ChatId, Arc<Mutex<()>>>> {
        match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn for_chat(&self, chat: ChatId) -> Arc<Mutex<()>> {
        self.map().entry(chat).or_default().clone()
    }

    /// Hands back a lock taken with `for_chat`; the entry goes away once no
    /// other unit of work holds or waits on it.
    fn release(&self, chat: ChatId, lock: Arc<Mutex<()>>) {
        let mut locks = self.map();
        drop(lock);
        if locks
            .get(&chat)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(&chat);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.map().len()
    }
}

fn acquire(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Entry point for every inbound interaction. Resolves the actor, serializes
/// work per chat and hands the interaction to the dispatcher.
pub struct Bot {
    dispatcher: Dispatcher,
    locks: ChatLocks,
    clock: Clock,
    owner_chat: Option<ChatId>,
}

impl Bot {
    /// Builds a bot over already wired services. Local time follows the
    /// configured business timezone.
    pub fn new(services: Services, owner_chat: Option<ChatId>) -> Result<Self, BotError> {
        let timezone: Tz = services.business.tz()?;
        Ok(Self {
            dispatcher: Dispatcher::new(services),
            locks: ChatLocks::default(),
            clock: Arc::new(move || Utc::now().with_timezone(&timezone).naive_local()),
            owner_chat,
        })
    }

    /// Wires the SQLite store, file sessions, fan-out and the optional
    /// payment client from settings.
    pub fn from_settings(
        settings: &Settings,
        transport: Arc<dyn Transport>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, BotError> {
        let paths = settings.paths();
        paths.bootstrap()?;
        let log = EventLog::for_state_root(paths.root());

        let store = Arc::new(SqliteOrderStore::open(&paths.orders_db_path())?);
        let orders: Arc<dyn OrderRepository> = store.clone();
        let users: Arc<dyn UserDirectory> = store;
        let fanout = FanOut::new(
            notifier,
            users.clone(),
            orders.clone(),
            settings.staff.owner_chat_id,
            settings.staff.group_chat_id,
            log.clone(),
        );
        let lifecycle = OrderLifecycle::new(orders.clone(), fanout.clone(), log.clone());
        let payments: Option<Arc<dyn PaymentGateway>> = if settings.payments.enabled {
            Some(Arc::new(HttpPaymentClient::from_config(&settings.payments)?))
        } else {
            None
        };

        let services = Services {
            sessions: Arc::new(FileSessionStore::new(paths.sessions_dir(), log.clone())),
            orders,
            users,
            lifecycle,
            fanout,
            transport,
            payments,
            payment_settings: settings.payments.clone(),
            business: settings.business.clone(),
            log,
        };
        Self::new(services, settings.staff.owner_chat_id)
    }

    /// Replaces the wall clock, mainly so tests can pin "now".
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDateTime + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn start(&self, chat: ChatId, first_name: Option<&str>) -> Result<MessageId, BotError> {
        self.run(chat, first_name, Input::Token(names::START.to_string()), None)
    }

    pub fn handle_token(
        &self,
        chat: ChatId,
        token: &str,
        origin: Option<MessageId>,
    ) -> Result<MessageId, BotError> {
        self.run(chat, None, Input::Token(token.to_string()), origin)
    }

    pub fn handle_text(&self, chat: ChatId, text: &str) -> Result<MessageId, BotError> {
        self.run(chat, None, Input::Text(text.to_string()), None)
    }

    pub fn handle_location(
        &self,
        chat: ChatId,
        latitude: f64,
        longitude: f64,
    ) -> Result<MessageId, BotError> {
        self.run(
            chat,
            None,
            Input::Location {
                latitude,
                longitude,
            },
            None,
        )
    }

    pub fn handle_media(&self, chat: ChatId, item: MediaItem) -> Result<MessageId, BotError> {
        self.run(chat, None, Input::Media(item), None)
    }

    pub fn handle_inbound(&self, inbound: Inbound) -> Result<MessageId, BotError> {
        let Inbound {
            chat,
            first_name,
            kind,
        } = inbound;
        let input = match kind {
            InboundKind::Start => Input::Token(names::START.to_string()),
            InboundKind::Token { token, message } => {
                return self.run(chat, first_name.as_deref(), Input::Token(token), message)
            }
            InboundKind::Text(text) => Input::Text(text),
            InboundKind::Location {
                latitude,
                longitude,
            } => Input::Location {
                latitude,
                longitude,
            },
            InboundKind::Media(item) => Input::Media(item),
        };
        self.run(chat, first_name.as_deref(), input, None)
    }

    /// Applies a payment notification. Returns `None` for events other than
    /// a successful payment.
    pub fn handle_payment_webhook(&self, body: &str) -> Result<Option<PaymentOutcome>, BotError> {
        let log = &self.dispatcher.services().log;
        let event = match parse_payment_event(body) {
            Ok(event) => event,
            Err(err) => {
                log.warn("payment.webhook", &format!("rejected notification: {err}"));
                return Err(err.into());
            }
        };
        match event {
            PaymentEvent::Succeeded { order_id } => {
                let outcome = self
                    .dispatcher
                    .services()
                    .lifecycle
                    .record_payment(order_id)?;
                if let PaymentOutcome::Applied(_) = outcome {
                    log.info("payment.webhook", &format!("order={order_id} paid"));
                }
                Ok(Some(outcome))
            }
            PaymentEvent::Other { event } => {
                log.info("payment.webhook", &format!("ignored event `{event}`"));
                Ok(None)
            }
        }
    }

    fn run(
        &self,
        chat: ChatId,
        first_name: Option<&str>,
        input: Input,
        origin: Option<MessageId>,
    ) -> Result<MessageId, BotError> {
        let lock = self.locks.for_chat(chat);
        let result = {
            let _guard = acquire(&lock);
            self.run_locked(chat, first_name, input, origin)
        };
        self.locks.release(chat, lock);
        result
    }

    fn run_locked(
        &self,
        chat: ChatId,
        first_name: Option<&str>,
        input: Input,
        origin: Option<MessageId>,
    ) -> Result<MessageId, BotError> {
        let actor = match self.resolve_actor(chat, first_name) {
            Ok(actor) => actor,
            Err(err) => {
                let rendered = self.dispatcher.render_unattributed_failure(chat, origin);
                if let Err(render_err) = rendered {
                    self.dispatcher.services().log.error(
                        "dispatch.failed",
                        &format!("chat={chat} failed to render failure screen: {render_err}"),
                    );
                }
                return Err(err);
            }
        };
        let turn = Turn {
            actor,
            chat,
            now: (self.clock)(),
        };
        Ok(self.dispatcher.handle(turn, input, origin)?)
    }

    /// Registers first-time users as customers. The configured owner chat is
    /// always promoted to owner.
    fn resolve_actor(&self, chat: ChatId, first_name: Option<&str>) -> Result<Actor, BotError> {
        let users = &self.dispatcher.services().users;
        let resolved = users.ensure_user(chat, Role::Customer, first_name).and_then(|profile| {
            if self.owner_chat == Some(chat) && profile.role != Role::Owner {
                users.set_role(chat, Role::Owner)?;
                return Ok(Role::Owner);
            }
            Ok(profile.role)
        });
        match resolved {
            Ok(role) => Ok(Actor::new(chat, role)),
            Err(err) => {
                self.dispatcher.services().log.error(
                    "dispatch.failed",
                    &format!("chat={chat} failed to resolve user: {err}"),
                );
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_locks_are_pruned_once_released() {
        let locks = ChatLocks::default();
        let first = locks.for_chat(ChatId::new(1));
        let waiting = locks.for_chat(ChatId::new(1));
        assert!(Arc::ptr_eq(&first, &waiting));

        locks.release(ChatId::new(1), first);
        assert_eq!(locks.len(), 1, "still held by the waiting unit of work");
        locks.release(ChatId::new(1), waiting);
        assert_eq!(locks.len(), 0);

        let other = locks.for_chat(ChatId::new(2));
        locks.release(ChatId::new(2), other);
        assert_eq!(locks.len(), 0);
    }
}
