use super::{executor_candidates, staff, HandlerContext};
use crate::channels::Button;
use crate::dispatch::catalog::{names, token};
use crate::dispatch::error::FlowError;
use crate::dispatch::{views, Reply};
use crate::orders::validate::parse_cost;
use crate::orders::{ExecutorRole, Order, OrderStatus};
use crate::payments::PaymentLinkRequest;
use crate::session::{ChatState, PendingReason, ReasonKind, Session};
use crate::shared::{ChatId, OrderId};

pub fn my_orders(
    cx: &HandlerContext<'_>,
    session: &mut Session,
    page: u32,
) -> Result<Reply, FlowError> {
    session.reset_flow();
    let listed = cx
        .services
        .orders
        .list_by_customer(cx.turn.chat, page, cx.per_page())?;
    Ok(Reply::Show(views::order_list(
        "📋 Your orders",
        &listed,
        |page| token(names::MY_ORDERS, &[&page]),
        Button::token("🏠 Main menu", names::MAIN_MENU),
    )))
}

pub fn manage_orders(session: &mut Session) -> Result<Reply, FlowError> {
    session.reset_flow();
    Ok(Reply::Show(views::manage_menu()))
}

pub fn orders_by_status(
    cx: &HandlerContext<'_>,
    session: &mut Session,
    status: OrderStatus,
    page: u32,
) -> Result<Reply, FlowError> {
    session.reset_flow();
    let listed = cx
        .services
        .orders
        .list_by_status(&[status], page, cx.per_page())?;
    Ok(Reply::Show(views::order_list(
        &format!("🗂 {}", status.label()),
        &listed,
        |page| token(names::ORDERS_BY_STATUS, &[&status.as_str(), &page]),
        Button::token("⬅️ Back", names::MANAGE_ORDERS),
    )))
}

pub fn view_order(
    cx: &HandlerContext<'_>,
    session: &mut Session,
    id: OrderId,
) -> Result<Reply, FlowError> {
    let order = cx.load_visible(id)?;
    session.reset_flow();
    Ok(Reply::Show(views::order_card(cx.actor(), &order, None)))
}

fn card(cx: &HandlerContext<'_>, order: &Order, notice: &str) -> Reply {
    Reply::Show(views::order_card(cx.actor(), order, Some(notice)))
}

fn unavailable(id: OrderId, order: &Order, action: &str) -> FlowError {
    FlowError::Stale(format!(
        "Order #{id} cannot {action}: it is {}.",
        order.status.label().to_lowercase()
    ))
}

/// Opens pricing; a freshly submitted order moves to awaiting cost first.
pub fn set_cost(
    cx: &HandlerContext<'_>,
    session: &mut Session,
    id: OrderId,
) -> Result<Reply, FlowError> {
    let mut order = cx.services.orders.load(id)?;
    match order.status {
        OrderStatus::New => order = cx.services.lifecycle.begin_pricing(cx.actor(), id)?,
        OrderStatus::AwaitingCost | OrderStatus::AwaitingConfirmation => {}
        _ => return Err(unavailable(id, &order, "be priced")),
    }
    session.reset_flow();
    session.draft.order = order;
    session.draft.target_order = Some(id);
    session.push_state(ChatState::CostInput);
    Ok(Reply::Show(views::cost_prompt(&session.draft.order)))
}

pub fn cost_text(
    cx: &HandlerContext<'_>,
    session: &mut Session,
    text: &str,
) -> Result<Reply, FlowError> {
    let id = target_order(session)?;
    let cost = parse_cost(text).map_err(FlowError::Format)?;
    let order = cx.services.lifecycle.price(cx.actor(), id, cost)?;
    session.reset_flow();
    Ok(card(cx, &order, "💰 The cost was sent to the customer."))
}

pub fn accept_cost(
    cx: &HandlerContext<'_>,
    session: &mut Session,
    id: OrderId,
) -> Result<Reply, FlowError> {
    let order = cx.services.lifecycle.accept_cost(cx.actor(), id)?;
    session.reset_flow();
    let notice = match order.status {
        OrderStatus::AwaitingPayment => "✅ Cost accepted. Pay online to start the order.",
        _ => "✅ Cost accepted. The order is in progress.",
    };
    Ok(card(cx, &order, notice))
}

fn ask_reason(session: &mut Session, kind: ReasonKind, order_id: OrderId) -> Reply {
    session.reset_flow();
    session.draft.pending_reason = Some(PendingReason { kind, order_id });
    session.push_state(ChatState::ReasonInput);
    Reply::Show(views::reason_prompt(kind, order_id))
}

pub fn reject_cost(
    cx: &HandlerContext<'_>,
    session: &mut Session,
    id: OrderId,
) -> Result<Reply, FlowError> {
    let order = cx.load_visible(id)?;
    if !order.is_customer(cx.turn.chat) {
        return Err(FlowError::NotYourOrder { order_id: id });
    }
    if order.status != OrderStatus::AwaitingConfirmation {
        return Err(unavailable(id, &order, "have its cost rejected"));
    }
    Ok(ask_reason(session, ReasonKind::RejectCost, id))
}

pub fn cancel_order(
    cx: &HandlerContext<'_>,
    session: &mut Session,
    id: OrderId,
) -> Result<Reply, FlowError> {
    let order = cx.load_visible(id)?;
    if !order.is_customer(cx.turn.chat) {
        return Err(FlowError::NotYourOrder { order_id: id });
    }
    cx.services.lifecycle.customer_may_cancel(&order, id)?;
    Ok(ask_reason(session, ReasonKind::Cancel, id))
}

pub fn cancel_order_operator(
    cx: &HandlerContext<'_>,
    session: &mut Session,
    id: OrderId,
) -> Result<Reply, FlowError> {
    let order = cx.services.orders.load(id)?;
    if order.status.is_final() || order.status == OrderStatus::Canceled {
        return Err(unavailable(id, &order, "be canceled"));
    }
    Ok(ask_reason(session, ReasonKind::OperatorCancel, id))
}

pub fn reason_text(
    cx: &HandlerContext<'_>,
    session: &mut Session,
    text: &str,
) -> Result<Reply, FlowError> {
    let Some(pending) = session.draft.pending_reason else {
        return Err(FlowError::Stale(
            "Nothing is waiting for a reason. Open the order again.".to_string(),
        ));
    };
    let lifecycle = &cx.services.lifecycle;
    let actor = cx.actor();
    let order = match pending.kind {
        ReasonKind::Cancel => lifecycle.cancel_by_customer(actor, pending.order_id, text)?,
        ReasonKind::RejectCost => lifecycle.reject_cost(actor, pending.order_id, text)?,
        ReasonKind::OperatorCancel => {
            lifecycle.cancel_by_operator(actor, pending.order_id, text)?
        }
    };
    session.reset_flow();
    Ok(card(cx, &order, "🚫 The order was canceled."))
}

pub fn pay_order(cx: &HandlerContext<'_>, id: OrderId) -> Result<Reply, FlowError> {
    let order = cx.load_visible(id)?;
    if !order.is_customer(cx.turn.chat) {
        return Err(FlowError::NotYourOrder { order_id: id });
    }
    if order.status != OrderStatus::AwaitingPayment {
        return Err(unavailable(id, &order, "be paid"));
    }
    let (Some(gateway), Some(amount)) = (cx.services.payments.as_ref(), order.cost) else {
        return Err(FlowError::Stale(
            "Online payment is not available right now. An operator will contact you."
                .to_string(),
        ));
    };
    let settings = &cx.services.payment_settings;
    let request = PaymentLinkRequest {
        order_id: id,
        amount,
        currency: settings.currency.clone(),
        description: format!("Order #{id}"),
        return_url: settings.return_url.clone(),
        customer_phone: order.phone.clone(),
    };
    let url = gateway.create_payment_link(&request)?;
    Ok(Reply::Show(views::payment_link(id, &url)))
}

pub fn executor_menu(cx: &HandlerContext<'_>, id: OrderId) -> Result<Reply, FlowError> {
    let order = cx.services.orders.load(id)?;
    let actor = cx.actor();
    if !actor.role.is_operator_or_higher() && order.creator != Some(actor.chat_id) {
        return Err(FlowError::NotYourOrder { order_id: id });
    }
    let candidates = executor_candidates(cx)?;
    Ok(Reply::Show(views::executor_menu(&order, &candidates)))
}

/// Re-renders whichever executor picker the change came from.
fn executor_reply(
    cx: &HandlerContext<'_>,
    session: &Session,
    order: &Order,
) -> Result<Reply, FlowError> {
    if session.state == ChatState::StaffAssignExecutors && session.draft.order.id == order.id {
        return Ok(Reply::Show(staff::executor_screen(cx, session)?));
    }
    let candidates = executor_candidates(cx)?;
    Ok(Reply::Show(views::executor_menu(order, &candidates)))
}

pub fn assign_executor(
    cx: &HandlerContext<'_>,
    session: &mut Session,
    id: OrderId,
    executor: ChatId,
    role: ExecutorRole,
) -> Result<Reply, FlowError> {
    let order = cx
        .services
        .lifecycle
        .assign_executor(cx.actor(), id, executor, role)?;
    executor_reply(cx, session, &order)
}

pub fn unassign_executor(
    cx: &HandlerContext<'_>,
    session: &mut Session,
    id: OrderId,
    executor: ChatId,
) -> Result<Reply, FlowError> {
    let order = cx
        .services
        .lifecycle
        .remove_executor(cx.actor(), id, executor)?;
    executor_reply(cx, session, &order)
}

pub fn mark_done(
    cx: &HandlerContext<'_>,
    session: &mut Session,
    id: OrderId,
) -> Result<Reply, FlowError> {
    let order = cx.services.lifecycle.complete(cx.actor(), id)?;
    session.reset_flow();
    Ok(card(cx, &order, "🏁 The order is completed."))
}

pub fn set_final_cost(
    cx: &HandlerContext<'_>,
    session: &mut Session,
    id: OrderId,
) -> Result<Reply, FlowError> {
    let order = cx.services.orders.load(id)?;
    if order.status != OrderStatus::Completed {
        return Err(unavailable(id, &order, "get a final cost"));
    }
    session.reset_flow();
    session.draft.order = order;
    session.draft.target_order = Some(id);
    session.push_state(ChatState::FinalCostInput);
    Ok(Reply::Show(views::final_cost_prompt(&session.draft.order)))
}

pub fn final_cost_text(
    cx: &HandlerContext<'_>,
    session: &mut Session,
    text: &str,
) -> Result<Reply, FlowError> {
    let id = target_order(session)?;
    let cost = parse_cost(text).map_err(FlowError::Format)?;
    let order = cx
        .services
        .lifecycle
        .correct_final_cost(cx.actor(), id, cost)?;
    session.reset_flow();
    Ok(card(cx, &order, "💵 The final cost was saved."))
}

pub fn mark_calculated(
    cx: &HandlerContext<'_>,
    session: &mut Session,
    id: OrderId,
) -> Result<Reply, FlowError> {
    let order = cx.services.lifecycle.mark_calculated(cx.actor(), id)?;
    session.reset_flow();
    Ok(card(cx, &order, "🧮 Marked as calculated."))
}

pub fn mark_settled(
    cx: &HandlerContext<'_>,
    session: &mut Session,
    id: OrderId,
) -> Result<Reply, FlowError> {
    let order = cx.services.lifecycle.mark_settled(cx.actor(), id)?;
    session.reset_flow();
    Ok(card(cx, &order, "📒 Marked as settled."))
}

pub fn resume(
    cx: &HandlerContext<'_>,
    session: &mut Session,
    id: OrderId,
) -> Result<Reply, FlowError> {
    let order = cx.services.lifecycle.resume(cx.actor(), id)?;
    session.reset_flow();
    Ok(card(cx, &order, "🔄 The order is back in the queue."))
}

fn target_order(session: &Session) -> Result<OrderId, FlowError> {
    session.draft.target_order.ok_or_else(|| {
        FlowError::Stale("Nothing is waiting for a cost. Open the order again.".to_string())
    })
}
