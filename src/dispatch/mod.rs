pub mod catalog;
pub mod command;
pub mod error;
pub mod handlers;
pub mod token;
pub mod views;

pub use command::Command;
pub use error::{FlowError, GENERIC_FAILURE};
pub use token::{decode, TokenError};

use crate::channels::{Screen, Transport};
use crate::config::{BusinessConfig, PaymentsConfig};
use crate::notify::FanOut;
use crate::orders::{Actor, MediaItem, OrderLifecycle, OrderRepository, UserDirectory};
use crate::payments::PaymentGateway;
use crate::session::{ChatState, Session, SessionStore};
use crate::shared::{ChatId, ErrorClass, EventLog, MessageId};
use chrono::NaiveDateTime;
use handlers::HandlerContext;
use std::sync::Arc;

/// Collaborators shared by every unit of work.
#[derive(Clone)]
pub struct Services {
    pub sessions: Arc<dyn SessionStore>,
    pub orders: Arc<dyn OrderRepository>,
    pub users: Arc<dyn UserDirectory>,
    pub lifecycle: OrderLifecycle,
    pub fanout: FanOut,
    pub transport: Arc<dyn Transport>,
    pub payments: Option<Arc<dyn PaymentGateway>>,
    pub payment_settings: PaymentsConfig,
    pub business: BusinessConfig,
    pub log: EventLog,
}

/// Who is acting, where, and the local time the interaction is judged at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Turn {
    pub actor: Actor,
    pub chat: ChatId,
    pub now: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Token(String),
    Text(String),
    Location { latitude: f64, longitude: f64 },
    Media(MediaItem),
}

/// What a handler wants on screen once it is done.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Replaces the current screen; edited in place after a button press.
    Show(Screen),
    /// Posted as a new message below whatever the handler already sent.
    Below(Screen),
    /// Leaves the current screen as it is.
    Unchanged,
}

pub struct Dispatcher {
    services: Services,
}

impl Dispatcher {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Decodes and runs one action token. Returns the id of the message that
    /// shows the resulting screen.
    pub fn dispatch(
        &self,
        token: &str,
        turn: Turn,
        origin: Option<MessageId>,
    ) -> Result<MessageId, FlowError> {
        self.handle(turn, Input::Token(token.to_string()), origin)
    }

    /// Runs one inbound interaction as a single unit of work. The caller
    /// holds the chat lock for the duration.
    pub fn handle(
        &self,
        turn: Turn,
        input: Input,
        origin: Option<MessageId>,
    ) -> Result<MessageId, FlowError> {
        let cx = HandlerContext::new(&self.services, turn);
        let before = self.services.sessions.get(turn.chat);
        let mut session = before.clone();
        let stale_previews = std::mem::take(&mut session.draft.ephemeral_messages);
        // Only a pressed button has a screen to edit; typed input and
        // `/start` answer below the conversation.
        let in_place = matches!(input, Input::Token(_)) && origin.is_some();

        let result = match input {
            Input::Token(raw) => self.run_token(&cx, &mut session, &raw),
            Input::Text(text) => handlers::on_text(&cx, &mut session, &text),
            Input::Location {
                latitude,
                longitude,
            } => handlers::on_location(&cx, &mut session, latitude, longitude),
            Input::Media(item) => handlers::on_media(&cx, &mut session, item),
        };

        match result {
            Ok(reply) => {
                for message in stale_previews {
                    self.delete_quietly(turn.chat, message);
                }
                self.drop_location_prompt(turn.chat, &before, &mut session);
                self.render(&cx, session, reply, origin, in_place)
            }
            Err(err) => self.render_failure(&cx, before, err, origin, in_place),
        }
    }

    /// Generic failure screen for an interaction that never reached a
    /// handler, e.g. because the user directory was unavailable. Only the
    /// screen bookkeeping of the session changes.
    pub fn render_unattributed_failure(
        &self,
        chat: ChatId,
        origin: Option<MessageId>,
    ) -> Result<MessageId, FlowError> {
        let mut session = self.services.sessions.get(chat);
        let screen = views::failure(GENERIC_FAILURE);
        let message = match origin {
            Some(pressed) => self.show(chat, Some(pressed), &screen)?,
            None => {
                let message = self.show(chat, None, &screen)?;
                if let Some(previous) = session.current_message {
                    self.delete_quietly(chat, previous);
                }
                message
            }
        };
        session.current_message = Some(message);
        self.save(chat, &session);
        Ok(message)
    }

    fn run_token(
        &self,
        cx: &HandlerContext<'_>,
        session: &mut Session,
        raw: &str,
    ) -> Result<Reply, FlowError> {
        let (def, command) = match decode(raw) {
            Ok(decoded) => decoded,
            Err(err) => {
                if matches!(err, TokenError::Unknown { .. }) {
                    self.services.log.warn(
                        "dispatch.unknown_token",
                        &format!("chat={} token=`{raw}`", cx.turn.chat),
                    );
                }
                return Err(err.into());
            }
        };
        if !def.gate.allows(cx.turn.actor.role) {
            self.services.log.warn(
                "dispatch.denied",
                &format!(
                    "chat={} role={} command={}",
                    cx.turn.chat, cx.turn.actor.role, def.name
                ),
            );
            return Err(FlowError::Denied {
                command: def.name,
                role: cx.turn.actor.role,
            });
        }
        handlers::run_command(cx, session, command)
    }

    fn render(
        &self,
        cx: &HandlerContext<'_>,
        mut session: Session,
        reply: Reply,
        origin: Option<MessageId>,
        in_place: bool,
    ) -> Result<MessageId, FlowError> {
        let chat = cx.turn.chat;
        let current = origin.or(session.current_message);
        let shown = match reply {
            Reply::Unchanged => match current {
                Some(message) => Ok(message),
                None => handlers::state_screen(cx, &session)
                    .and_then(|screen| self.show(chat, None, &screen)),
            },
            Reply::Show(screen) if in_place => self.show(chat, current, &screen),
            Reply::Show(screen) | Reply::Below(screen) => {
                let shown = self.show(chat, None, &screen);
                if shown.is_ok() {
                    if let Some(previous) = current {
                        self.delete_quietly(chat, previous);
                    }
                }
                shown
            }
        };
        match shown {
            Ok(message) => {
                session.current_message = Some(message);
                self.save(chat, &session);
                Ok(message)
            }
            Err(err) => {
                self.services.log.error(
                    "dispatch.failed",
                    &format!("chat={chat} failed to render screen: {err}"),
                );
                self.save(chat, &session);
                Err(err)
            }
        }
    }

    /// Shows the screen for a failed unit of work. The session goes back to
    /// what it was before; only the screen bookkeeping moves.
    fn render_failure(
        &self,
        cx: &HandlerContext<'_>,
        mut session: Session,
        err: FlowError,
        origin: Option<MessageId>,
        in_place: bool,
    ) -> Result<MessageId, FlowError> {
        let chat = cx.turn.chat;
        let role = cx.turn.actor.role;
        let class = err.class();
        let screen = match (&err, class) {
            (FlowError::Token(TokenError::Unknown { .. }), _) => views::unknown_command(),
            (FlowError::Token(_), _) => views::failure(&err.user_message()),
            (_, ErrorClass::Format) => match handlers::state_screen(cx, &session) {
                Ok(screen) => screen.with_error(&err.user_message()),
                Err(_) => views::failure(&err.user_message()),
            },
            (_, ErrorClass::Authorization) => views::access_denied(),
            (_, ErrorClass::Consistency) => views::consistency_problem(&err.user_message(), role),
            (_, ErrorClass::Infrastructure) => views::failure(GENERIC_FAILURE),
        };
        match class {
            ErrorClass::Infrastructure => self
                .services
                .log
                .error("dispatch.failed", &format!("chat={chat} state={}: {err}", session.state)),
            ErrorClass::Consistency => self
                .services
                .log
                .info("dispatch.failed", &format!("chat={chat} state={}: {err}", session.state)),
            ErrorClass::Format | ErrorClass::Authorization => {}
        }

        let current = origin.or(session.current_message);
        let shown = if in_place {
            self.show(chat, current, &screen)
        } else {
            let shown = self.show(chat, None, &screen);
            if let (Ok(_), Some(previous)) = (&shown, current) {
                self.delete_quietly(chat, previous);
            }
            shown
        };
        let message = shown?;
        session.current_message = Some(message);
        self.save(chat, &session);
        Ok(message)
    }

    fn show(
        &self,
        chat: ChatId,
        current: Option<MessageId>,
        screen: &Screen,
    ) -> Result<MessageId, FlowError> {
        Ok(self
            .services
            .transport
            .send_or_edit_screen(chat, current, screen)?)
    }

    fn save(&self, chat: ChatId, session: &Session) {
        if let Err(err) = self.services.sessions.put(chat, session) {
            self.services.log.error(
                "dispatch.failed",
                &format!("chat={chat} failed to store session: {err}"),
            );
        }
    }

    fn delete_quietly(&self, chat: ChatId, message: MessageId) {
        if let Err(err) = self.services.transport.delete_message(chat, message) {
            self.services.log.info(
                "dispatch.cleanup",
                &format!("chat={chat} message={message} not deleted: {err}"),
            );
        }
    }

    fn drop_location_prompt(&self, chat: ChatId, before: &Session, session: &mut Session) {
        let Some(prompt) = before.draft.location_prompt else {
            return;
        };
        let replaced = session.draft.location_prompt != Some(prompt);
        if replaced || session.state != ChatState::Address {
            self.delete_quietly(chat, prompt);
            if !replaced {
                session.draft.location_prompt = None;
            }
        }
    }
}
