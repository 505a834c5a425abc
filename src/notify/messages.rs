use super::{ContactRequest, OrderEvent};
use crate::orders::format::{format_cost, order_title};
use crate::orders::{Order, UserProfile};

pub fn event_text(event: OrderEvent, order: &Order) -> String {
    let title = order_title(order);
    match event {
        OrderEvent::Submitted => format!("🆕 {title} was submitted and waits for pricing."),
        OrderEvent::Priced => format!(
            "💰 {title} was priced at {}. Open the order to accept or reject the cost.",
            format_cost(order.cost)
        ),
        OrderEvent::CostAccepted => format!(
            "✅ The customer accepted {} for {title}.",
            format_cost(order.cost)
        ),
        OrderEvent::CostRejected => format!(
            "❌ The customer rejected the cost of {title}. Reason: {}",
            order.reason.as_deref().unwrap_or("-")
        ),
        OrderEvent::CanceledByCustomer => format!(
            "🚫 The customer canceled {title}. Reason: {}",
            order.reason.as_deref().unwrap_or("-")
        ),
        OrderEvent::CanceledByOperator => format!(
            "🚫 {title} was canceled by the operator. Reason: {}",
            order.reason.as_deref().unwrap_or("-")
        ),
        OrderEvent::PaymentReceived => format!("💳 Payment for {title} was received."),
        OrderEvent::StaffFinalized => format!("📋 {title} was created and is in progress."),
        OrderEvent::Completed => format!("🏁 {title} is completed."),
        OrderEvent::Resumed => format!("🔄 {title} was resumed."),
        OrderEvent::ExecutorAssigned(_) => format!("🚚 You were assigned to {title}."),
        OrderEvent::ExecutorRemoved(_) => format!("↩️ You were removed from {title}."),
    }
}

pub fn contact_text(request: &ContactRequest, from: &UserProfile) -> String {
    let who = match from.first_name.as_deref() {
        Some(name) => format!("{name} (chat {})", from.chat_id),
        None => format!("chat {}", from.chat_id),
    };
    match request {
        ContactRequest::Callback { phone } => {
            format!("📞 {who} asks for a call back at {phone}.")
        }
        ContactRequest::Message { text } => format!("💬 Message from {who}:\n{text}"),
    }
}
