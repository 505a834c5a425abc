use super::{editing, state_screen, HandlerContext};
use crate::channels::Screen;
use crate::dispatch::error::FlowError;
use crate::dispatch::{views, Reply};
use crate::orders::{
    FieldUpdate, MediaItem, MediaKind, Order, UserProfile, ALL_EDITABLE_FIELDS,
};
use crate::session::{ChatState, DraftOrder, Session};
use crate::shared::OrderId;
use crate::wizard::{self, StepInput, StepOutcome};

pub fn new_order(
    cx: &HandlerContext<'_>,
    session: &mut Session,
    on_behalf: bool,
) -> Result<Reply, FlowError> {
    let chat = cx.turn.chat;
    session.reset_flow();
    let customer = if on_behalf { None } else { Some(chat) };
    session.draft = DraftOrder::creating(Order::new_draft(customer, Some(chat)), on_behalf);
    session.push_state(ChatState::Category);
    Ok(Reply::Show(state_screen(cx, session)?))
}

/// Feeds one input to the wizard and reacts to where it went.
pub fn wizard_input(
    cx: &HandlerContext<'_>,
    session: &mut Session,
    input: StepInput,
) -> Result<Reply, FlowError> {
    let profile = cx.profile();
    let step = session.state;
    let outcome = wizard::apply(session, input, &cx.step_context(profile.as_ref()));
    match outcome {
        StepOutcome::Stay { error: Some(error) } => Err(FlowError::Format(error)),
        StepOutcome::Stay { error: None } => Ok(Reply::Show(state_screen(cx, session)?)),
        StepOutcome::MediaAdded { new_group: true } => {
            Ok(Reply::Show(state_screen(cx, session)?))
        }
        StepOutcome::MediaAdded { new_group: false } => Ok(Reply::Unchanged),
        StepOutcome::Moved { next, persist } => {
            remember_in_profile(cx, session, step, profile.as_ref())?;
            if next == ChatState::EditMenu {
                return editing::finish_field(cx, session, persist);
            }
            if matches!(next, ChatState::Confirm | ChatState::StaffConfirmOptions) {
                persist_draft(cx, session)?;
            }
            Ok(Reply::Show(state_screen(cx, session)?))
        }
    }
}

/// A customer typing a name or phone their profile lacks gets it stored.
fn remember_in_profile(
    cx: &HandlerContext<'_>,
    session: &Session,
    step: ChatState,
    profile: Option<&UserProfile>,
) -> Result<(), FlowError> {
    let draft = &session.draft;
    let chat = cx.turn.chat;
    if draft.on_behalf || !draft.order.is_customer(chat) {
        return Ok(());
    }
    let users = &cx.services.users;
    match step {
        ChatState::Name if profile.is_some_and(|p| p.first_name.is_none()) => {
            if let Some(name) = &draft.order.name {
                users.save_profile_name(chat, name)?;
            }
        }
        ChatState::Phone if profile.is_some_and(|p| p.phone.is_none()) => {
            if let Some(phone) = &draft.order.phone {
                users.save_profile_phone(chat, phone)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Writes the draft row the first time the confirmation is reached and
/// re-syncs every field on later visits.
fn persist_draft(cx: &HandlerContext<'_>, session: &mut Session) -> Result<(), FlowError> {
    let orders = &cx.services.orders;
    let order = &mut session.draft.order;
    match order.id {
        None => {
            let id = orders.create_draft(order)?;
            order.id = Some(id);
        }
        Some(id) => {
            for field in ALL_EDITABLE_FIELDS {
                if let Some(update) = FieldUpdate::capture(field, order) {
                    orders.update_field(id, &update)?;
                }
            }
        }
    }
    Ok(())
}

/// Rejects confirmations that do not belong to the draft in this session.
pub(super) fn require_current_draft(session: &Session, id: OrderId) -> Result<(), FlowError> {
    if session.draft.is_editing() || session.draft.order.id != Some(id) {
        return Err(FlowError::Stale(
            "This confirmation is out of date. Please start again from the menu.".to_string(),
        ));
    }
    Ok(())
}

pub fn confirm_order(
    cx: &HandlerContext<'_>,
    session: &mut Session,
    id: OrderId,
) -> Result<Reply, FlowError> {
    require_current_draft(session, id)?;
    let order = cx.services.lifecycle.submit(cx.actor(), id)?;
    session.reset_flow();
    Ok(Reply::Show(views::submitted(&order)))
}

pub fn send_location_prompt(
    cx: &HandlerContext<'_>,
    session: &mut Session,
) -> Result<Reply, FlowError> {
    if session.state != ChatState::Address {
        return Err(FlowError::Format(
            "A location can only be shared at the address step.".to_string(),
        ));
    }
    let prompt = Screen::new("📎 Tap the attachment button, choose Location and send it here.");
    let message = cx
        .services
        .transport
        .send_or_edit_screen(cx.turn.chat, None, &prompt)?;
    session.draft.location_prompt = Some(message);
    Ok(Reply::Unchanged)
}

pub fn view_media(cx: &HandlerContext<'_>, session: &mut Session) -> Result<Reply, FlowError> {
    if session.state != ChatState::Media {
        return Err(FlowError::Format(
            "Media can only be viewed at the media step.".to_string(),
        ));
    }
    let order = &session.draft.order;
    let items: Vec<MediaItem> = order
        .photos
        .iter()
        .map(|file| (MediaKind::Photo, file))
        .chain(order.videos.iter().map(|file| (MediaKind::Video, file)))
        .map(|(kind, file)| MediaItem {
            kind,
            file_id: file.clone(),
            group_id: None,
        })
        .collect();
    if items.is_empty() {
        return Err(FlowError::Format("Nothing has been uploaded yet.".to_string()));
    }
    let previews = cx.services.transport.send_media(cx.turn.chat, &items)?;
    session.draft.ephemeral_messages = previews;
    Ok(Reply::Below(state_screen(cx, session)?))
}
