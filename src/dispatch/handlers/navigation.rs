use super::{state_screen, HandlerContext};
use crate::dispatch::error::FlowError;
use crate::dispatch::{views, Reply};
use crate::session::{ChatState, Session};

pub fn start(cx: &HandlerContext<'_>, session: &mut Session) -> Result<Reply, FlowError> {
    session.reset_flow();
    let profile = cx.profile();
    Ok(Reply::Show(views::main_menu(
        cx.actor(),
        profile.as_ref().and_then(|p| p.first_name.as_deref()),
    )))
}

pub fn main_menu(cx: &HandlerContext<'_>, session: &mut Session) -> Result<Reply, FlowError> {
    session.reset_flow();
    Ok(Reply::Show(views::main_menu(cx.actor(), None)))
}

pub fn back(cx: &HandlerContext<'_>, session: &mut Session) -> Result<Reply, FlowError> {
    if session.state == ChatState::EditMenu {
        return match session.draft.order.id {
            Some(id) => super::manage::view_order(cx, session, id),
            None => main_menu(cx, session),
        };
    }
    session.draft.manual_entry = false;
    if session.pop_state() == ChatState::Idle {
        return main_menu(cx, session);
    }
    refresh_edited_order(cx, session)?;
    Ok(Reply::Show(state_screen(cx, session)?))
}

/// Jumps back to a step visited earlier in this flow.
pub fn back_to(
    cx: &HandlerContext<'_>,
    session: &mut Session,
    state: ChatState,
) -> Result<Reply, FlowError> {
    if state != session.state && !session.history.contains(&state) {
        return Err(FlowError::Stale(
            "That step is no longer part of this flow.".to_string(),
        ));
    }
    session.draft.manual_entry = false;
    session.return_to(state);
    refresh_edited_order(cx, session)?;
    Ok(Reply::Show(state_screen(cx, session)?))
}

pub fn cancel_flow(cx: &HandlerContext<'_>, session: &mut Session) -> Result<Reply, FlowError> {
    if session.state == ChatState::Idle {
        return main_menu(cx, session);
    }
    Ok(Reply::Show(views::cancel_flow_prompt(session.state.as_str())))
}

pub fn cancel_flow_confirmed(
    cx: &HandlerContext<'_>,
    session: &mut Session,
) -> Result<Reply, FlowError> {
    session.reset_flow();
    let mut screen = views::main_menu(cx.actor(), None);
    screen.text = format!("Canceled.\n\n{}", screen.text);
    Ok(Reply::Show(screen))
}

/// Unsaved changes are dropped when an edit step is left without finishing.
fn refresh_edited_order(cx: &HandlerContext<'_>, session: &mut Session) -> Result<(), FlowError> {
    if session.state != ChatState::EditMenu || !session.draft.is_editing() {
        return Ok(());
    }
    if let Some(id) = session.draft.order.id {
        session.draft.order = cx.load_visible(id)?;
    }
    session.draft.editing_field = None;
    Ok(())
}
