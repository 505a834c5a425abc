use super::HandlerContext;
use crate::dispatch::catalog::names;
use crate::dispatch::error::FlowError;
use crate::dispatch::{views, Reply};
use crate::notify::ContactRequest;
use crate::orders::validate::{normalize_phone, validate_message};
use crate::orders::UserProfile;
use crate::session::{ChatState, Session};

pub fn contact_menu(cx: &HandlerContext<'_>, session: &mut Session) -> Result<Reply, FlowError> {
    session.reset_flow();
    Ok(Reply::Show(views::contact_menu(
        cx.services.business.contact_phone.as_deref(),
    )))
}

pub fn request_callback(
    cx: &HandlerContext<'_>,
    session: &mut Session,
) -> Result<Reply, FlowError> {
    session.reset_flow();
    session.push_state(ChatState::CallbackPhoneInput);
    let profile = cx.profile();
    Ok(Reply::Show(views::callback_prompt(
        profile.as_ref().and_then(|p| p.phone.as_deref()),
    )))
}

pub fn callback_phone_text(
    cx: &HandlerContext<'_>,
    session: &mut Session,
    text: &str,
) -> Result<Reply, FlowError> {
    let phone = normalize_phone(text).map_err(FlowError::Format)?;
    let reached = relay(cx, ContactRequest::Callback { phone: phone.clone() });
    session.reset_flow();
    Ok(Reply::Show(views::contact_sent(
        &format!("✅ Thank you! An operator will call you at {phone}."),
        reached,
        None,
    )))
}

pub fn write_message(session: &mut Session) -> Result<Reply, FlowError> {
    session.reset_flow();
    session.push_state(ChatState::OperatorMessageInput);
    Ok(Reply::Show(views::operator_message_prompt()))
}

pub fn message_text(
    cx: &HandlerContext<'_>,
    session: &mut Session,
    text: &str,
) -> Result<Reply, FlowError> {
    let text = validate_message(text).map_err(FlowError::Format)?;
    let reached = relay(cx, ContactRequest::Message { text });
    session.reset_flow();
    Ok(Reply::Show(views::contact_sent(
        "✅ Your message was passed to the operators.",
        reached,
        Some(names::CONTACT_CHAT),
    )))
}

/// True when at least one operator got the request.
fn relay(cx: &HandlerContext<'_>, request: ContactRequest) -> bool {
    let actor = cx.actor();
    let from = cx.profile().unwrap_or(UserProfile {
        chat_id: actor.chat_id,
        role: actor.role,
        first_name: None,
        phone: None,
    });
    let report = cx.services.fanout.relay_to_operators(&request, &from);
    let reached = !report.delivered.is_empty();
    let message = format!(
        "chat={} kind={} delivered={} failed={}",
        actor.chat_id,
        request.kind(),
        report.delivered.len(),
        report.failed.len()
    );
    if reached {
        cx.services.log.info("contact.relayed", &message);
    } else {
        cx.services.log.warn("contact.relayed", &message);
    }
    reached
}
