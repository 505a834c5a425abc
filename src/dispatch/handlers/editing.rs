use super::{state_screen, HandlerContext};
use crate::dispatch::error::FlowError;
use crate::dispatch::{views, Reply};
use crate::orders::{EditableField, FieldUpdate};
use crate::session::{ChatState, DraftOrder, Session};
use crate::shared::OrderId;
use crate::wizard::entry_step;

pub fn edit_order(
    cx: &HandlerContext<'_>,
    session: &mut Session,
    id: OrderId,
) -> Result<Reply, FlowError> {
    let order = cx.load_visible(id)?;
    if !views::may_edit(cx.actor(), &order) {
        return Err(FlowError::Stale(format!(
            "Order #{id} can no longer be edited: it is {}.",
            order.status.label().to_lowercase()
        )));
    }
    session.reset_flow();
    session.draft = DraftOrder::editing(order);
    session.draft.target_order = Some(id);
    session.push_state(ChatState::EditMenu);
    Ok(Reply::Show(views::edit_menu(&session.draft.order)))
}

pub fn edit_field(
    cx: &HandlerContext<'_>,
    session: &mut Session,
    field: EditableField,
    id: OrderId,
) -> Result<Reply, FlowError> {
    if !session.draft.is_editing() || session.draft.order.id != Some(id) {
        return Err(FlowError::Stale(
            "This edit menu is out of date. Open the order again.".to_string(),
        ));
    }
    if !field.editable_in(session.draft.order.status) {
        return Err(frozen_field(id, field));
    }
    let draft = &mut session.draft;
    draft.editing_field = Some(field);
    draft.manual_entry = false;
    draft.date_page = 0;
    draft.selected_hour = None;
    session.return_to(ChatState::EditMenu);
    session.push_state(entry_step(field));
    Ok(Reply::Show(state_screen(cx, session)?))
}

/// Called when a wizard step lands back on the edit menu: writes the changed
/// field and shows the menu with the stored order.
pub fn finish_field(
    cx: &HandlerContext<'_>,
    session: &mut Session,
    field: Option<EditableField>,
) -> Result<Reply, FlowError> {
    let Some(id) = session.draft.order.id else {
        return Err(FlowError::Stale(
            "This edit menu is out of date. Open the order again.".to_string(),
        ));
    };
    let stored = cx.load_visible(id)?;
    if !views::may_edit(cx.actor(), &stored) {
        return Err(FlowError::Stale(format!(
            "Order #{id} can no longer be edited: it is {}.",
            stored.status.label().to_lowercase()
        )));
    }
    if let Some(field) = field.filter(|f| !f.editable_in(stored.status)) {
        return Err(frozen_field(id, field));
    }
    if let Some(update) = field.and_then(|f| FieldUpdate::capture(f, &session.draft.order)) {
        cx.services.orders.update_field(id, &update)?;
    }
    session.draft.order = cx.services.orders.load(id)?;
    Ok(Reply::Show(views::edit_menu(&session.draft.order)))
}

fn frozen_field(id: OrderId, field: EditableField) -> FlowError {
    FlowError::Stale(format!(
        "{} of order #{id} can no longer be changed.",
        field.label()
    ))
}
