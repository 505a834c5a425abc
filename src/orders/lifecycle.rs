use super::error::RepositoryError;
use super::model::{Actor, ExecutorRole, Order, OrderStatus, PaymentPreference, Role};
use super::repository::{OrderRepository, StatusGuard};
use super::validate::{validate_cost, validate_reason};
use crate::notify::{FanOut, OrderEvent};
use crate::shared::{ChatId, ErrorClass, EventLog, OrderId};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("{role} may not {action} order {order_id}")]
    Unauthorized {
        order_id: OrderId,
        action: &'static str,
        role: Role,
    },
    #[error("order {order_id} cannot {action} while {status}")]
    InvalidTransition {
        order_id: OrderId,
        action: &'static str,
        status: OrderStatus,
    },
    #[error("order {order_id} cannot {action}: {message}")]
    Precondition {
        order_id: OrderId,
        action: &'static str,
        message: String,
    },
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl LifecycleError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Unauthorized { .. } => ErrorClass::Authorization,
            Self::InvalidTransition { .. } | Self::Precondition { .. } => ErrorClass::Consistency,
            Self::Invalid(_) => ErrorClass::Format,
            Self::Repository(err) if err.is_consistency() => ErrorClass::Consistency,
            Self::Repository(_) => ErrorClass::Infrastructure,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaymentOutcome {
    Applied(Order),
    /// The order was not awaiting payment; nothing changed.
    Ignored { order_id: OrderId, status: OrderStatus },
}

/// Owns every order status change. Each operation takes the values it needs,
/// checks role and ownership, then writes status together with its dependent
/// fields in a single guarded repository call.
#[derive(Clone)]
pub struct OrderLifecycle {
    orders: Arc<dyn OrderRepository>,
    fanout: FanOut,
    log: EventLog,
}

const PRICEABLE: &[OrderStatus] = &[
    OrderStatus::New,
    OrderStatus::AwaitingCost,
    OrderStatus::AwaitingConfirmation,
];
const CUSTOMER_CANCELABLE: &[OrderStatus] = &[
    OrderStatus::Draft,
    OrderStatus::New,
    OrderStatus::AwaitingCost,
];
const OPERATOR_CANCELABLE: &[OrderStatus] = &[
    OrderStatus::Draft,
    OrderStatus::New,
    OrderStatus::AwaitingCost,
    OrderStatus::AwaitingConfirmation,
    OrderStatus::AwaitingPayment,
    OrderStatus::InProgress,
];

impl OrderLifecycle {
    pub fn new(orders: Arc<dyn OrderRepository>, fanout: FanOut, log: EventLog) -> Self {
        Self {
            orders,
            fanout,
            log,
        }
    }

    pub fn submit(&self, actor: Actor, id: OrderId) -> Result<Order, LifecycleError> {
        const ACTION: &str = "be submitted";
        let order = self.orders.load(id)?;
        require_customer(actor, &order, id, ACTION)?;
        self.submit_loaded(actor, id, order)
    }

    /// Staff variant of `submit` for orders they entered on someone's
    /// behalf; the order joins the regular pricing queue.
    pub fn submit_on_behalf(&self, actor: Actor, id: OrderId) -> Result<Order, LifecycleError> {
        const ACTION: &str = "be submitted";
        let order = self.orders.load(id)?;
        if !actor.role.is_staff_creator() || order.creator != Some(actor.chat_id) {
            return Err(unauthorized(id, ACTION, actor));
        }
        self.submit_loaded(actor, id, order)
    }

    fn submit_loaded(
        &self,
        actor: Actor,
        id: OrderId,
        order: Order,
    ) -> Result<Order, LifecycleError> {
        const ACTION: &str = "be submitted";
        require_status(&order, id, &[OrderStatus::Draft], ACTION)?;
        if order.cost.is_some() {
            return Err(precondition(id, ACTION, "cost is already set"));
        }
        require_complete(&order, id, ACTION)?;

        let updated = self.orders.update_status(
            id,
            StatusGuard::allowing(&[OrderStatus::Draft]).cost_unset(),
            OrderStatus::New,
        );
        self.finish(actor, order.status, updated, ACTION, Some(OrderEvent::Submitted))
    }

    pub fn begin_pricing(&self, actor: Actor, id: OrderId) -> Result<Order, LifecycleError> {
        const ACTION: &str = "start pricing";
        let order = self.orders.load(id)?;
        require_operator(actor, id, ACTION)?;
        if order.status == OrderStatus::AwaitingCost {
            return Ok(order);
        }
        require_status(&order, id, &[OrderStatus::New], ACTION)?;
        let updated = self.orders.update_status(
            id,
            StatusGuard::allowing(&[OrderStatus::New]),
            OrderStatus::AwaitingCost,
        );
        self.finish(actor, order.status, updated, ACTION, None)
    }

    /// Sets the price and moves the order to awaiting confirmation. Concurrent
    /// pricing is last-writer-wins; cost and status always land together.
    pub fn price(&self, actor: Actor, id: OrderId, cost: f64) -> Result<Order, LifecycleError> {
        const ACTION: &str = "be priced";
        require_operator(actor, id, ACTION)?;
        let cost = validate_cost(cost).map_err(LifecycleError::Invalid)?;
        let order = self.orders.load(id)?;
        require_status(&order, id, PRICEABLE, ACTION)?;
        let updated = self.orders.update_cost_and_status(
            id,
            StatusGuard::allowing(PRICEABLE),
            cost,
            OrderStatus::AwaitingConfirmation,
        );
        self.finish(actor, order.status, updated, ACTION, Some(OrderEvent::Priced))
    }

    pub fn accept_cost(&self, actor: Actor, id: OrderId) -> Result<Order, LifecycleError> {
        const ACTION: &str = "accept the cost";
        let order = self.orders.load(id)?;
        require_customer(actor, &order, id, ACTION)?;
        require_status(&order, id, &[OrderStatus::AwaitingConfirmation], ACTION)?;
        if !order.has_positive_cost() {
            return Err(precondition(id, ACTION, "no positive cost is set"));
        }
        let next = match order.payment {
            Some(PaymentPreference::Now) => OrderStatus::AwaitingPayment,
            _ => OrderStatus::InProgress,
        };
        let updated = self.orders.update_status(
            id,
            StatusGuard::allowing(&[OrderStatus::AwaitingConfirmation]),
            next,
        );
        self.finish(actor, order.status, updated, ACTION, Some(OrderEvent::CostAccepted))
    }

    pub fn reject_cost(
        &self,
        actor: Actor,
        id: OrderId,
        reason: &str,
    ) -> Result<Order, LifecycleError> {
        const ACTION: &str = "reject the cost";
        let reason = validate_reason(reason).map_err(LifecycleError::Invalid)?;
        let order = self.orders.load(id)?;
        require_customer(actor, &order, id, ACTION)?;
        require_status(&order, id, &[OrderStatus::AwaitingConfirmation], ACTION)?;
        let updated = self.orders.update_status_and_reason(
            id,
            StatusGuard::allowing(&[OrderStatus::AwaitingConfirmation]),
            OrderStatus::Canceled,
            Some(&reason),
        );
        self.finish(actor, order.status, updated, ACTION, Some(OrderEvent::CostRejected))
    }

    /// Customers may cancel only before a price exists.
    pub fn cancel_by_customer(
        &self,
        actor: Actor,
        id: OrderId,
        reason: &str,
    ) -> Result<Order, LifecycleError> {
        const ACTION: &str = "be canceled by the customer";
        let order = self.orders.load(id)?;
        require_customer(actor, &order, id, ACTION)?;
        self.customer_may_cancel(&order, id)?;
        let reason = validate_reason(reason).map_err(LifecycleError::Invalid)?;
        let updated = self.orders.update_status_and_reason(
            id,
            StatusGuard::allowing(CUSTOMER_CANCELABLE).cost_unset(),
            OrderStatus::Canceled,
            Some(&reason),
        );
        self.finish(
            actor,
            order.status,
            updated,
            ACTION,
            Some(OrderEvent::CanceledByCustomer),
        )
    }

    /// Checks whether the customer may cancel `order` without writing anything.
    pub fn customer_may_cancel(&self, order: &Order, id: OrderId) -> Result<(), LifecycleError> {
        const ACTION: &str = "be canceled by the customer";
        require_status(order, id, CUSTOMER_CANCELABLE, ACTION)?;
        if order.cost.is_some() {
            return Err(precondition(
                id,
                ACTION,
                "a price was already set; please contact an operator",
            ));
        }
        Ok(())
    }

    pub fn cancel_by_operator(
        &self,
        actor: Actor,
        id: OrderId,
        reason: &str,
    ) -> Result<Order, LifecycleError> {
        const ACTION: &str = "be canceled";
        require_operator(actor, id, ACTION)?;
        let reason = validate_reason(reason).map_err(LifecycleError::Invalid)?;
        let order = self.orders.load(id)?;
        require_status(&order, id, OPERATOR_CANCELABLE, ACTION)?;
        let updated = self.orders.update_status_and_reason(
            id,
            StatusGuard::allowing(OPERATOR_CANCELABLE),
            OrderStatus::Canceled,
            Some(&reason),
        );
        self.finish(
            actor,
            order.status,
            updated,
            ACTION,
            Some(OrderEvent::CanceledByOperator),
        )
    }

    /// Applies a payment confirmation. Repeated deliveries are ignored.
    pub fn record_payment(&self, id: OrderId) -> Result<PaymentOutcome, LifecycleError> {
        let order = self.orders.load(id)?;
        if order.status != OrderStatus::AwaitingPayment {
            self.log.info(
                "payment.webhook",
                &format!("order={id} ignored payment while {}", order.status),
            );
            return Ok(PaymentOutcome::Ignored {
                order_id: id,
                status: order.status,
            });
        }
        let updated = match self.orders.update_status(
            id,
            StatusGuard::allowing(&[OrderStatus::AwaitingPayment]),
            OrderStatus::InProgress,
        ) {
            Ok(updated) => updated,
            Err(RepositoryError::StatusConflict { actual, .. }) => {
                return Ok(PaymentOutcome::Ignored {
                    order_id: id,
                    status: actual,
                })
            }
            Err(err) => return Err(err.into()),
        };
        self.log_transition(id, order.status, updated.status, "payment gateway");
        let initiator = ChatId::new(0);
        self.fanout
            .announce(OrderEvent::PaymentReceived, &updated, initiator);
        Ok(PaymentOutcome::Applied(updated))
    }

    /// Completes creation of an order entered by staff on someone's behalf.
    pub fn finalize_staff_order(
        &self,
        actor: Actor,
        id: OrderId,
        cost: Option<f64>,
    ) -> Result<Order, LifecycleError> {
        const ACTION: &str = "be finalized";
        let order = self.orders.load(id)?;
        let is_creator = order.creator == Some(actor.chat_id);
        if !actor.role.is_staff_creator() || !(is_creator || actor.role.is_operator_or_higher()) {
            return Err(unauthorized(id, ACTION, actor));
        }
        require_status(&order, id, &[OrderStatus::Draft], ACTION)?;
        require_complete(&order, id, ACTION)?;
        let guard = StatusGuard::allowing(&[OrderStatus::Draft]);
        let updated = match cost {
            Some(cost) => {
                let cost = validate_cost(cost).map_err(LifecycleError::Invalid)?;
                self.orders
                    .update_cost_and_status(id, guard, cost, OrderStatus::InProgress)
            }
            None => self.orders.update_status(id, guard, OrderStatus::InProgress),
        };
        self.finish(actor, order.status, updated, ACTION, Some(OrderEvent::StaffFinalized))
    }

    pub fn complete(&self, actor: Actor, id: OrderId) -> Result<Order, LifecycleError> {
        const ACTION: &str = "be completed";
        let order = self.orders.load(id)?;
        if !(actor.role.is_operator_or_higher() || order.assigned_driver(actor.chat_id)) {
            return Err(unauthorized(id, ACTION, actor));
        }
        require_status(&order, id, &[OrderStatus::InProgress], ACTION)?;
        let updated = self.orders.update_status(
            id,
            StatusGuard::allowing(&[OrderStatus::InProgress]),
            OrderStatus::Completed,
        );
        self.finish(actor, order.status, updated, ACTION, Some(OrderEvent::Completed))
    }

    /// Corrects the price after the work is done; status is unchanged.
    pub fn correct_final_cost(
        &self,
        actor: Actor,
        id: OrderId,
        cost: f64,
    ) -> Result<Order, LifecycleError> {
        const ACTION: &str = "change the final cost";
        require_operator(actor, id, ACTION)?;
        let cost = validate_cost(cost).map_err(LifecycleError::Invalid)?;
        let order = self.orders.load(id)?;
        require_status(&order, id, &[OrderStatus::Completed], ACTION)?;
        let updated = self.orders.update_cost_and_status(
            id,
            StatusGuard::allowing(&[OrderStatus::Completed]),
            cost,
            OrderStatus::Completed,
        )?;
        self.log.info(
            "lifecycle.final_cost",
            &format!("order={id} final cost set to {cost} by {}", actor.chat_id),
        );
        Ok(updated)
    }

    pub fn mark_calculated(&self, actor: Actor, id: OrderId) -> Result<Order, LifecycleError> {
        self.bookkeeping_step(actor, id, OrderStatus::Completed, OrderStatus::Calculated)
    }

    pub fn mark_settled(&self, actor: Actor, id: OrderId) -> Result<Order, LifecycleError> {
        self.bookkeeping_step(actor, id, OrderStatus::Calculated, OrderStatus::Settled)
    }

    pub fn resume(&self, actor: Actor, id: OrderId) -> Result<Order, LifecycleError> {
        const ACTION: &str = "be resumed";
        require_operator(actor, id, ACTION)?;
        let order = self.orders.load(id)?;
        require_status(&order, id, &[OrderStatus::Canceled], ACTION)?;
        let updated = self.orders.update_status_and_reason(
            id,
            StatusGuard::allowing(&[OrderStatus::Canceled]),
            OrderStatus::New,
            None,
        );
        self.finish(actor, order.status, updated, ACTION, Some(OrderEvent::Resumed))
    }

    pub fn assign_executor(
        &self,
        actor: Actor,
        id: OrderId,
        executor: ChatId,
        role: ExecutorRole,
    ) -> Result<Order, LifecycleError> {
        const ACTION: &str = "get executors assigned";
        if !(actor.role.is_operator_or_higher() || self.is_creating_driver(actor, id)?) {
            return Err(unauthorized(id, ACTION, actor));
        }
        self.orders.assign_executor(id, executor, role)?;
        let order = self.orders.load(id)?;
        self.fanout
            .announce(OrderEvent::ExecutorAssigned(executor), &order, actor.chat_id);
        Ok(self.orders.load(id)?)
    }

    pub fn remove_executor(
        &self,
        actor: Actor,
        id: OrderId,
        executor: ChatId,
    ) -> Result<Order, LifecycleError> {
        const ACTION: &str = "get executors removed";
        if !(actor.role.is_operator_or_higher() || self.is_creating_driver(actor, id)?) {
            return Err(unauthorized(id, ACTION, actor));
        }
        let before = self.orders.load(id)?;
        if self.orders.remove_executor(id, executor)? {
            self.fanout
                .announce(OrderEvent::ExecutorRemoved(executor), &before, actor.chat_id);
        }
        Ok(self.orders.load(id)?)
    }

    fn is_creating_driver(&self, actor: Actor, id: OrderId) -> Result<bool, LifecycleError> {
        if actor.role != Role::Driver {
            return Ok(false);
        }
        let order = self.orders.load(id)?;
        Ok(order.creator == Some(actor.chat_id) && order.status == OrderStatus::Draft)
    }

    fn bookkeeping_step(
        &self,
        actor: Actor,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order, LifecycleError> {
        const ACTION: &str = "advance bookkeeping";
        require_operator(actor, id, ACTION)?;
        let order = self.orders.load(id)?;
        require_status(&order, id, &[from], ACTION)?;
        let updated = self
            .orders
            .update_status(id, StatusGuard::allowing(&[from]), to);
        self.finish(actor, order.status, updated, ACTION, None)
    }

    fn finish(
        &self,
        actor: Actor,
        from: OrderStatus,
        updated: Result<Order, RepositoryError>,
        action: &'static str,
        event: Option<OrderEvent>,
    ) -> Result<Order, LifecycleError> {
        let updated = updated.map_err(|err| match err {
            RepositoryError::StatusConflict {
                order_id, actual, ..
            } => LifecycleError::InvalidTransition {
                order_id,
                action,
                status: actual,
            },
            RepositoryError::Precondition { order_id, message } => LifecycleError::Precondition {
                order_id,
                action,
                message,
            },
            other => LifecycleError::Repository(other),
        })?;
        if let Some(id) = updated.id {
            self.log_transition(id, from, updated.status, &actor.chat_id.to_string());
        }
        if let Some(event) = event {
            self.fanout.announce(event, &updated, actor.chat_id);
        }
        Ok(updated)
    }

    fn log_transition(&self, id: OrderId, from: OrderStatus, to: OrderStatus, by: &str) {
        self.log.info(
            "lifecycle.transition",
            &format!("order={id} {from} -> {to} by {by}"),
        );
    }
}

fn unauthorized(order_id: OrderId, action: &'static str, actor: Actor) -> LifecycleError {
    LifecycleError::Unauthorized {
        order_id,
        action,
        role: actor.role,
    }
}

fn precondition(order_id: OrderId, action: &'static str, message: &str) -> LifecycleError {
    LifecycleError::Precondition {
        order_id,
        action,
        message: message.to_string(),
    }
}

fn require_operator(
    actor: Actor,
    order_id: OrderId,
    action: &'static str,
) -> Result<(), LifecycleError> {
    if actor.role.is_operator_or_higher() {
        Ok(())
    } else {
        Err(unauthorized(order_id, action, actor))
    }
}

fn require_customer(
    actor: Actor,
    order: &Order,
    order_id: OrderId,
    action: &'static str,
) -> Result<(), LifecycleError> {
    if order.is_customer(actor.chat_id) {
        Ok(())
    } else {
        Err(unauthorized(order_id, action, actor))
    }
}

fn require_status(
    order: &Order,
    order_id: OrderId,
    allowed: &[OrderStatus],
    action: &'static str,
) -> Result<(), LifecycleError> {
    if allowed.contains(&order.status) {
        Ok(())
    } else {
        Err(LifecycleError::InvalidTransition {
            order_id,
            action,
            status: order.status,
        })
    }
}

fn require_complete(
    order: &Order,
    order_id: OrderId,
    action: &'static str,
) -> Result<(), LifecycleError> {
    let missing = order.missing_required_fields();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(precondition(
            order_id,
            action,
            &format!("missing {}", missing.join(", ")),
        ))
    }
}
