use super::{executor_candidates, HandlerContext};
use crate::channels::Screen;
use crate::dispatch::error::FlowError;
use crate::dispatch::{views, Reply};
use crate::orders::validate::parse_cost;
use crate::session::{ChatState, Session};
use crate::shared::OrderId;

/// Staff actions only apply to the on-behalf draft held by this session.
fn require_staff_draft(session: &Session, id: OrderId) -> Result<(), FlowError> {
    super::creation::require_current_draft(session, id)?;
    if !session.draft.on_behalf {
        return Err(FlowError::Stale(
            "This option is only available while entering an order for a customer.".to_string(),
        ));
    }
    Ok(())
}

pub fn set_cost(session: &mut Session, id: OrderId) -> Result<Reply, FlowError> {
    require_staff_draft(session, id)?;
    session.push_state(ChatState::StaffCostInput);
    Ok(Reply::Show(views::staff_cost_prompt()))
}

pub fn skip_cost(
    cx: &HandlerContext<'_>,
    session: &mut Session,
    id: OrderId,
) -> Result<Reply, FlowError> {
    require_staff_draft(session, id)?;
    session.draft.order.cost = None;
    session.push_state(ChatState::StaffAssignExecutors);
    Ok(Reply::Show(executor_screen(cx, session)?))
}

pub fn cost_text(
    cx: &HandlerContext<'_>,
    session: &mut Session,
    text: &str,
) -> Result<Reply, FlowError> {
    let cost = parse_cost(text).map_err(FlowError::Format)?;
    session.draft.order.cost = Some(cost);
    session.push_state(ChatState::StaffAssignExecutors);
    Ok(Reply::Show(executor_screen(cx, session)?))
}

/// Sends the order to the regular pricing queue.
pub fn confirm_simple(
    cx: &HandlerContext<'_>,
    session: &mut Session,
    id: OrderId,
) -> Result<Reply, FlowError> {
    require_staff_draft(session, id)?;
    let order = cx.services.lifecycle.submit_on_behalf(cx.actor(), id)?;
    session.reset_flow();
    Ok(Reply::Show(views::order_card(
        cx.actor(),
        &order,
        Some("📨 The order was sent for pricing."),
    )))
}

/// Starts work on the order right away, with the cost typed earlier if any.
pub fn finalize(
    cx: &HandlerContext<'_>,
    session: &mut Session,
    id: OrderId,
) -> Result<Reply, FlowError> {
    require_staff_draft(session, id)?;
    let cost = session.draft.order.cost;
    let order = cx
        .services
        .lifecycle
        .finalize_staff_order(cx.actor(), id, cost)?;
    session.reset_flow();
    Ok(Reply::Show(views::order_card(
        cx.actor(),
        &order,
        Some("🚚 The order is in progress."),
    )))
}

/// Executor picker for the on-behalf draft; executors live in storage while
/// the cost is still only in the session.
pub fn executor_screen(cx: &HandlerContext<'_>, session: &Session) -> Result<Screen, FlowError> {
    let Some(id) = session.draft.order.id else {
        return Ok(views::failure("This order is not saved yet."));
    };
    let mut order = cx.services.orders.load(id)?;
    order.cost = session.draft.order.cost;
    let candidates = executor_candidates(cx)?;
    Ok(views::staff_executor_menu(&order, &candidates))
}
