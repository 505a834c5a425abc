use crate::channels::ChannelError;
use crate::orders::{Order, OrderRepository, Role, UserDirectory, UserProfile};
use crate::shared::{ChatId, EventLog};
use std::collections::BTreeSet;
use std::sync::Arc;

pub mod messages;

pub trait Notifier: Send + Sync {
    fn notify(&self, recipient: ChatId, text: &str) -> Result<(), ChannelError>;
}

/// Something that happened to an order and may concern other parties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderEvent {
    Submitted,
    Priced,
    CostAccepted,
    CostRejected,
    CanceledByCustomer,
    CanceledByOperator,
    PaymentReceived,
    StaffFinalized,
    Completed,
    Resumed,
    ExecutorAssigned(ChatId),
    ExecutorRemoved(ChatId),
}

/// A customer reaching out to staff outside of any order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactRequest {
    Callback { phone: String },
    Message { text: String },
}

impl ContactRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Callback { .. } => "callback",
            Self::Message { .. } => "message",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Audience {
    Customer,
    Operators,
    Executors,
    Single(ChatId),
}

impl OrderEvent {
    fn audiences(self) -> &'static [Audience] {
        match self {
            Self::Submitted
            | Self::CostAccepted
            | Self::CostRejected
            | Self::CanceledByCustomer => &[Audience::Operators],
            Self::Priced | Self::Resumed => &[Audience::Customer],
            Self::CanceledByOperator => &[Audience::Customer, Audience::Executors],
            Self::PaymentReceived => &[Audience::Customer, Audience::Operators],
            Self::StaffFinalized => &[Audience::Customer, Audience::Executors],
            Self::Completed => &[Audience::Customer, Audience::Operators],
            Self::ExecutorAssigned(_) | Self::ExecutorRemoved(_) => &[],
        }
    }

    fn direct_recipient(self) -> Option<ChatId> {
        match self {
            Self::ExecutorAssigned(chat) | Self::ExecutorRemoved(chat) => Some(chat),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanOutReport {
    pub delivered: Vec<ChatId>,
    pub failed: Vec<ChatId>,
}

/// Best-effort delivery of order events. Failures are logged and reported,
/// never propagated.
#[derive(Clone)]
pub struct FanOut {
    notifier: Arc<dyn Notifier>,
    users: Arc<dyn UserDirectory>,
    orders: Arc<dyn OrderRepository>,
    owner_chat: Option<ChatId>,
    group_chat: Option<ChatId>,
    log: EventLog,
}

impl FanOut {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        users: Arc<dyn UserDirectory>,
        orders: Arc<dyn OrderRepository>,
        owner_chat: Option<ChatId>,
        group_chat: Option<ChatId>,
        log: EventLog,
    ) -> Self {
        Self {
            notifier,
            users,
            orders,
            owner_chat,
            group_chat,
            log,
        }
    }

    pub fn announce(&self, event: OrderEvent, order: &Order, initiator: ChatId) -> FanOutReport {
        let text = messages::event_text(event, order);
        let mut recipients = BTreeSet::new();
        let mut audiences: Vec<Audience> = event.audiences().to_vec();
        if let Some(chat) = event.direct_recipient() {
            audiences.push(Audience::Single(chat));
        }
        for audience in audiences {
            match audience {
                Audience::Customer => recipients.extend(order.customer),
                Audience::Executors => {
                    recipients.extend(order.executors.iter().map(|e| e.chat_id))
                }
                Audience::Operators => recipients.extend(self.operator_recipients()),
                Audience::Single(chat) => {
                    recipients.insert(chat);
                }
            }
        }
        recipients.remove(&initiator);

        let subject = format!(
            "order={} event={event:?}",
            order
                .id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string())
        );
        self.deliver(recipients, &text, &subject, |recipient| {
            self.mark_executor_notified(order, recipient)
        })
    }

    /// Passes a customer's contact request on to whoever handles operator
    /// traffic. The sender never receives their own request.
    pub fn relay_to_operators(
        &self,
        request: &ContactRequest,
        from: &UserProfile,
    ) -> FanOutReport {
        let text = messages::contact_text(request, from);
        let mut recipients: BTreeSet<ChatId> = self.operator_recipients().into_iter().collect();
        recipients.remove(&from.chat_id);
        let subject = format!("contact={} from={}", request.kind(), from.chat_id);
        self.deliver(recipients, &text, &subject, |_| {})
    }

    fn deliver(
        &self,
        recipients: BTreeSet<ChatId>,
        text: &str,
        subject: &str,
        mut on_delivered: impl FnMut(ChatId),
    ) -> FanOutReport {
        let mut report = FanOutReport::default();
        for recipient in recipients {
            match self.notifier.notify(recipient, text) {
                Ok(()) => {
                    report.delivered.push(recipient);
                    on_delivered(recipient);
                }
                Err(err) => {
                    self.log.warn(
                        "notify.failed",
                        &format!("{subject} recipient={recipient}: {err}"),
                    );
                    report.failed.push(recipient);
                }
            }
        }
        report
    }

    /// The staff group chat when configured, otherwise every operator-level
    /// user plus the configured owner.
    fn operator_recipients(&self) -> Vec<ChatId> {
        if let Some(group) = self.group_chat {
            return vec![group];
        }
        let mut recipients: Vec<ChatId> = self.owner_chat.into_iter().collect();
        match self
            .users
            .list_by_roles(&[Role::Operator, Role::MainOperator, Role::Owner])
        {
            Ok(users) => recipients.extend(users.into_iter().map(|u| u.chat_id)),
            Err(err) => self.log.warn(
                "notify.failed",
                &format!("failed to resolve operator recipients: {err}"),
            ),
        }
        recipients
    }

    fn mark_executor_notified(&self, order: &Order, recipient: ChatId) {
        let Some(order_id) = order.id else {
            return;
        };
        if !order.executors.iter().any(|e| e.chat_id == recipient) {
            return;
        }
        if let Err(err) = self.orders.mark_executor_notified(order_id, recipient) {
            self.log.warn(
                "notify.failed",
                &format!("order={order_id} failed to flag executor {recipient} as notified: {err}"),
            );
        }
    }
}
