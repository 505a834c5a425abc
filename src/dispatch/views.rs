use super::catalog::{names, token};
use crate::channels::{Button, Screen};
use crate::orders::format::{format_cost, order_details};
use crate::orders::{
    Actor, EditableField, ExecutorRole, Order, OrderPage, OrderStatus, PaymentPreference,
    RequestedDate, Role, UserProfile, ALL_EDITABLE_FIELDS, ALL_ORDER_STATUSES,
};
use crate::session::ReasonKind;
use crate::shared::OrderId;

pub fn main_menu(actor: Actor, greeting: Option<&str>) -> Screen {
    let text = match greeting {
        Some(name) => format!("Hello, {name}! What would you like to do?"),
        None => "What would you like to do?".to_string(),
    };
    let mut screen = Screen::new(text)
        .button("🆕 New order", names::NEW_ORDER)
        .button("📋 My orders", token(names::MY_ORDERS, &[&0]));
    if actor.role.is_staff_creator() {
        screen = screen.button("👥 Order for a customer", names::STAFF_NEW_ORDER);
    }
    if actor.role.is_operator_or_higher() {
        screen = screen.button("🗂 Manage orders", names::MANAGE_ORDERS);
    } else {
        screen = screen.button("☎️ Contact an operator", names::CONTACT_OPERATOR);
    }
    screen
}

/// Token of the list a screen falls back to after an error.
pub fn safe_list_token(role: Role) -> String {
    if role.is_operator_or_higher() {
        names::MANAGE_ORDERS.to_string()
    } else {
        token(names::MY_ORDERS, &[&0])
    }
}

pub fn unknown_command() -> Screen {
    Screen::new("Unknown command. Please use the menu buttons.")
        .button("🏠 Main menu", names::MAIN_MENU)
}

pub fn access_denied() -> Screen {
    Screen::new("⛔ Access denied: you cannot perform this action.")
        .button("🏠 Main menu", names::MAIN_MENU)
}

pub fn consistency_problem(message: &str, role: Role) -> Screen {
    Screen::new(message)
        .button("📋 Back to orders", safe_list_token(role))
        .button("🏠 Main menu", names::MAIN_MENU)
}

pub fn failure(message: &str) -> Screen {
    Screen::new(message).button("🏠 Main menu", names::MAIN_MENU)
}

pub fn cancel_flow_prompt(resume_state: &str) -> Screen {
    Screen::new("Abandon the current order? Everything entered so far will be lost.").row(vec![
        Button::token("Yes, abandon", names::CANCEL_FLOW_CONFIRMED),
        Button::token("No, continue", token(names::BACK_TO, &[&resume_state])),
    ])
}

fn order_line(order: &Order) -> String {
    let id = order.id.map(|id| id.to_string()).unwrap_or_default();
    let category = order.category.map(|c| c.label()).unwrap_or("-");
    format!(
        "#{id} {category} · {} · {}",
        order.status.label(),
        format_cost(order.cost)
    )
}

/// One page of orders. `page_token` builds the token for another page.
pub fn order_list(
    title: &str,
    page: &OrderPage,
    page_token: impl Fn(u32) -> String,
    back: Button,
) -> Screen {
    if page.orders.is_empty() && page.page == 0 {
        return Screen::new(format!("{title}\n\nNo orders yet.")).row(vec![back]);
    }
    let mut screen = Screen::new(format!("{title} (page {})", page.page + 1));
    for order in &page.orders {
        if let Some(id) = order.id {
            screen = screen.button(order_line(order), token(names::VIEW_ORDER, &[&id]));
        }
    }
    let mut paging = Vec::new();
    if page.page > 0 {
        paging.push(Button::token("◀️", page_token(page.page - 1)));
    }
    if page.has_more {
        paging.push(Button::token("▶️", page_token(page.page + 1)));
    }
    screen.row(paging).row(vec![back])
}

pub fn manage_menu() -> Screen {
    let mut screen = Screen::new("🗂 Orders by status");
    let statuses: Vec<OrderStatus> = ALL_ORDER_STATUSES
        .into_iter()
        .filter(|status| *status != OrderStatus::Draft)
        .collect();
    for pair in statuses.chunks(2) {
        screen = screen.row(
            pair.iter()
                .map(|status| {
                    Button::token(
                        status.label(),
                        token(names::ORDERS_BY_STATUS, &[&status.as_str(), &0]),
                    )
                })
                .collect(),
        );
    }
    screen.button("🏠 Main menu", names::MAIN_MENU)
}

/// Whether `actor` may open the edit menu for `order`.
pub fn may_edit(actor: Actor, order: &Order) -> bool {
    if actor.role.is_operator_or_higher() {
        return !order.status.is_final() && order.status != OrderStatus::Canceled;
    }
    order.is_customer(actor.chat_id)
        && matches!(
            order.status,
            OrderStatus::Draft | OrderStatus::New | OrderStatus::AwaitingCost
        )
        && order.cost.is_none()
}

/// Whether `actor` may see `order` at all.
pub fn may_view(actor: Actor, order: &Order) -> bool {
    if actor.role.is_operator_or_higher() || order.is_customer(actor.chat_id) {
        return true;
    }
    matches!(actor.role, Role::Driver | Role::Loader)
        && (order.creator == Some(actor.chat_id)
            || order.executors.iter().any(|e| e.chat_id == actor.chat_id))
}

/// Order card with the actions available to `actor` right now.
pub fn order_card(actor: Actor, order: &Order, notice: Option<&str>) -> Screen {
    let mut text = order_details(order);
    if let Some(notice) = notice {
        text = format!("{notice}\n\n{text}");
    }
    let mut screen = Screen::new(text);
    let Some(id) = order.id else {
        return screen.button("🏠 Main menu", names::MAIN_MENU);
    };
    let status = order.status;
    let is_customer = order.is_customer(actor.chat_id);
    let operator = actor.role.is_operator_or_higher();

    if is_customer && status == OrderStatus::AwaitingConfirmation {
        screen = screen.row(vec![
            Button::token("✅ Accept cost", token(names::ACCEPT_COST, &[&id])),
            Button::token("❌ Reject", token(names::REJECT_COST, &[&id])),
        ]);
    }
    if is_customer
        && status == OrderStatus::AwaitingPayment
        && order.payment == Some(PaymentPreference::Now)
    {
        screen = screen.button("💳 Pay", token(names::PAY_ORDER, &[&id]));
    }
    if operator
        && matches!(
            status,
            OrderStatus::New | OrderStatus::AwaitingCost | OrderStatus::AwaitingConfirmation
        )
    {
        screen = screen.button("💰 Set cost", token(names::SET_COST, &[&id]));
    }
    if may_edit(actor, order) {
        screen = screen.button("✏️ Edit", token(names::EDIT_ORDER, &[&id]));
    }
    if operator && !status.is_final() && status != OrderStatus::Canceled {
        screen = screen.button("🚚 Executors", token(names::ASSIGN_EXECUTORS, &[&id]));
    }
    if status == OrderStatus::InProgress && (operator || order.assigned_driver(actor.chat_id)) {
        screen = screen.button("🏁 Mark done", token(names::MARK_DONE, &[&id]));
    }
    if operator {
        match status {
            OrderStatus::Completed => {
                screen = screen
                    .button("💵 Final cost", token(names::SET_FINAL_COST, &[&id]))
                    .button("🧮 Mark calculated", token(names::MARK_CALCULATED, &[&id]));
            }
            OrderStatus::Calculated => {
                screen = screen.button("📒 Mark settled", token(names::MARK_SETTLED, &[&id]));
            }
            OrderStatus::Canceled => {
                screen = screen.button("🔄 Resume", token(names::RESUME_ORDER, &[&id]));
            }
            _ => {}
        }
    }
    let cancelable_by_customer = is_customer
        && matches!(status, OrderStatus::New | OrderStatus::AwaitingCost)
        && order.cost.is_none();
    if cancelable_by_customer && !operator {
        screen = screen.button("🚫 Cancel order", token(names::CANCEL_ORDER, &[&id]));
    }
    if operator && !status.is_final() && status != OrderStatus::Canceled {
        screen = screen.button(
            "🚫 Cancel order",
            token(names::CANCEL_ORDER_OPERATOR, &[&id]),
        );
    }
    screen.button("⬅️ To the list", safe_list_token(actor.role))
}

pub fn edit_menu(order: &Order) -> Screen {
    let Some(id) = order.id else {
        return failure("This order can no longer be edited.");
    };
    let mut screen = Screen::new(format!(
        "✏️ What would you like to change?\n\n{}",
        order_details(order)
    ));
    for field in ALL_EDITABLE_FIELDS {
        let has_calendar_date = matches!(order.date, Some(RequestedDate::On(_)));
        if field == EditableField::Time && !has_calendar_date {
            continue;
        }
        if !field.editable_in(order.status) {
            continue;
        }
        screen = screen.button(
            field.label(),
            token(names::EDIT_FIELD, &[&field.as_str(), &id]),
        );
    }
    screen.button("✅ Done", token(names::VIEW_ORDER, &[&id]))
}

pub fn reason_prompt(kind: ReasonKind, order_id: OrderId) -> Screen {
    let text = match kind {
        ReasonKind::Cancel => "Why do you want to cancel the order?",
        ReasonKind::RejectCost => "Why does the cost not suit you?",
        ReasonKind::OperatorCancel => {
            "Why is the order being canceled? The customer will see this."
        }
    };
    Screen::new(format!("{text} (at least 6 characters)"))
        .button("⬅️ Back", token(names::VIEW_ORDER, &[&order_id]))
}

pub fn cost_prompt(order: &Order) -> Screen {
    let current = match order.cost {
        Some(_) => format!("\nCurrent cost: {}", format_cost(order.cost)),
        None => String::new(),
    };
    let back = order
        .id
        .map(|id| token(names::VIEW_ORDER, &[&id]))
        .unwrap_or_else(|| names::MAIN_MENU.to_string());
    Screen::new(format!("💰 Type the cost in rubles, e.g. 1500.{current}"))
        .button("⬅️ Back", back)
}

pub fn final_cost_prompt(order: &Order) -> Screen {
    let back = order
        .id
        .map(|id| token(names::VIEW_ORDER, &[&id]))
        .unwrap_or_else(|| names::MAIN_MENU.to_string());
    Screen::new(format!(
        "💵 Type the final cost. Agreed cost: {}",
        format_cost(order.cost)
    ))
    .button("⬅️ Back", back)
}

pub fn staff_confirm_options(order: &Order) -> Screen {
    let mut screen = Screen::new(format!(
        "Check the order before saving:\n\n{}",
        order_details(order)
    ));
    if let Some(id) = order.id {
        screen = screen
            .button("💰 Set cost and start", token(names::STAFF_SET_COST, &[&id]))
            .button("🚚 Start without cost", token(names::STAFF_SKIP_COST, &[&id]))
            .button("📨 Send for pricing", token(names::STAFF_CONFIRM_SIMPLE, &[&id]));
    }
    screen.row(vec![
        Button::token("⬅️ Back", names::BACK),
        Button::token("✖️ Cancel", names::CANCEL_FLOW),
    ])
}

pub fn staff_cost_prompt() -> Screen {
    Screen::new("💰 Type the agreed cost in rubles, e.g. 1500.").row(vec![
        Button::token("⬅️ Back", names::BACK),
        Button::token("✖️ Cancel", names::CANCEL_FLOW),
    ])
}

fn executor_label(profile: &UserProfile) -> String {
    match &profile.first_name {
        Some(name) => format!("{name} ({})", profile.chat_id),
        None => profile.chat_id.to_string(),
    }
}

/// Buttons that toggle each candidate on or off the order.
fn executor_rows(order_id: OrderId, order: &Order, candidates: &[UserProfile]) -> Vec<Vec<Button>> {
    candidates
        .iter()
        .map(|candidate| {
            let label = executor_label(candidate);
            let assigned = order
                .executors
                .iter()
                .find(|e| e.chat_id == candidate.chat_id);
            if let Some(assigned) = assigned {
                let role = match assigned.role {
                    ExecutorRole::Driver => "driver",
                    ExecutorRole::Loader => "loader",
                };
                return vec![Button::token(
                    format!("❌ {label}, {role}"),
                    token(names::UNASSIGN_EXECUTOR, &[&order_id, &candidate.chat_id]),
                )];
            }
            let mut row = Vec::new();
            if candidate.role != Role::Loader {
                row.push(Button::token(
                    format!("🚚 {label}"),
                    token(names::ASSIGN_DRIVER, &[&order_id, &candidate.chat_id]),
                ));
            }
            row.push(Button::token(
                format!("💪 {label}"),
                token(names::ASSIGN_LOADER, &[&order_id, &candidate.chat_id]),
            ));
            row
        })
        .collect()
}

pub fn executor_menu(order: &Order, candidates: &[UserProfile]) -> Screen {
    let Some(id) = order.id else {
        return failure("This order is not saved yet.");
    };
    let mut screen = Screen::new(format!(
        "🚚 Executors for order #{id}. 🚚 assigns a driver, 💪 a loader, ❌ removes."
    ));
    if candidates.is_empty() {
        screen.text.push_str("\n\nNo drivers or loaders are registered yet.");
    }
    for row in executor_rows(id, order, candidates) {
        screen = screen.row(row);
    }
    screen.button("⬅️ Back", token(names::VIEW_ORDER, &[&id]))
}

pub fn staff_executor_menu(order: &Order, candidates: &[UserProfile]) -> Screen {
    let Some(id) = order.id else {
        return failure("This order is not saved yet.");
    };
    let mut screen = Screen::new(format!(
        "🚚 Who goes on order #{id}? Cost: {}",
        format_cost(order.cost)
    ));
    for row in executor_rows(id, order, candidates) {
        screen = screen.row(row);
    }
    if order.executors.is_empty() {
        screen = screen.button(
            "Continue without executors",
            token(names::STAFF_SKIP_ASSIGN, &[&id]),
        );
    } else {
        screen = screen.button("✅ Start the order", token(names::STAFF_FINALIZE, &[&id]));
    }
    screen.row(vec![
        Button::token("⬅️ Back", names::BACK),
        Button::token("✖️ Cancel", names::CANCEL_FLOW),
    ])
}

pub fn payment_link(order_id: OrderId, url: &str) -> Screen {
    Screen::new(format!(
        "💳 Follow the link to pay for order #{order_id}. The order starts as soon as the payment arrives."
    ))
    .row(vec![Button::url("Pay online", url)])
    .button("⬅️ Back", token(names::VIEW_ORDER, &[&order_id]))
}

pub fn submitted(order: &Order) -> Screen {
    let id = order.id.map(|id| id.to_string()).unwrap_or_default();
    Screen::new(format!(
        "✅ Order #{id} was sent. An operator will price it shortly."
    ))
    .button("📋 My orders", token(names::MY_ORDERS, &[&0]))
    .button("🏠 Main menu", names::MAIN_MENU)
}

pub fn contact_menu(contact_phone: Option<&str>) -> Screen {
    let text = match contact_phone {
        Some(phone) => format!(
            "☎️ Call us at {phone}, ask for a call back or write to the operators here."
        ),
        None => "☎️ Ask for a call back or write to the operators here.".to_string(),
    };
    Screen::new(text)
        .button("📞 Call me back", names::REQUEST_CALLBACK)
        .button("💬 Write a message", names::CONTACT_CHAT)
        .button("🏠 Main menu", names::MAIN_MENU)
}

pub fn callback_prompt(profile_phone: Option<&str>) -> Screen {
    let hint = match profile_phone {
        Some(phone) => format!("\nThe phone we have on file is {phone}."),
        None => String::new(),
    };
    Screen::new(format!(
        "📞 Type the phone number the operator should call, e.g. +79991234567.{hint}"
    ))
    .button("⬅️ Back", names::CONTACT_OPERATOR)
}

pub fn operator_message_prompt() -> Screen {
    Screen::new("💬 Type your message. An operator will answer you shortly.")
        .button("⬅️ Back", names::CONTACT_OPERATOR)
}

/// Confirmation after a contact request; `reached` is false when no operator
/// could be notified.
pub fn contact_sent(text: &str, reached: bool, again: Option<&str>) -> Screen {
    let text = if reached {
        text.to_string()
    } else {
        "⚠️ No operator could be reached right now. Please try again a little later.".to_string()
    };
    let mut screen = Screen::new(text);
    if let Some(again) = again {
        screen = screen.button("✉️ Send another message", again);
    }
    screen.button("🏠 Main menu", names::MAIN_MENU)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::ChatId;

    fn order(status: OrderStatus, customer: i64) -> Order {
        let mut order = Order::new_draft(Some(ChatId::new(customer)), Some(ChatId::new(customer)));
        order.id = Some(OrderId::new(7));
        order.status = status;
        order
    }

    #[test]
    fn customer_sees_accept_and_reject_only_when_priced() {
        let customer = Actor::new(ChatId::new(1), Role::Customer);
        let mut priced = order(OrderStatus::AwaitingConfirmation, 1);
        priced.cost = Some(1500.0);
        let screen = order_card(customer, &priced, None);
        assert!(screen.has_token("accept_cost_7"));
        assert!(screen.has_token("reject_cost_7"));
        assert!(!screen.has_token("set_cost_7"));
        assert!(!screen.has_token("cancel_order_7"));

        let fresh = order(OrderStatus::New, 1);
        let screen = order_card(customer, &fresh, None);
        assert!(!screen.has_token("accept_cost_7"));
        assert!(screen.has_token("cancel_order_7"));
        assert!(screen.has_token("edit_order_7"));
    }

    #[test]
    fn operator_actions_follow_status() {
        let operator = Actor::new(ChatId::new(2), Role::Operator);
        let screen = order_card(operator, &order(OrderStatus::New, 1), None);
        assert!(screen.has_token("set_cost_7"));
        assert!(screen.has_token("cancel_order_operator_7"));

        let screen = order_card(operator, &order(OrderStatus::Completed, 1), None);
        assert!(screen.has_token("set_final_cost_7"));
        assert!(screen.has_token("mark_calculated_7"));
        assert!(!screen.has_token("cancel_order_operator_7"));

        let screen = order_card(operator, &order(OrderStatus::Canceled, 1), None);
        assert!(screen.has_token("resume_order_7"));
    }

    #[test]
    fn strangers_cannot_view_or_edit() {
        let stranger = Actor::new(ChatId::new(3), Role::Customer);
        let loader = Actor::new(ChatId::new(4), Role::Loader);
        let order = order(OrderStatus::New, 1);
        assert!(!may_view(stranger, &order));
        assert!(!may_view(loader, &order));
        assert!(!may_edit(stranger, &order));
    }

    #[test]
    fn contact_entry_is_offered_to_customers_only() {
        let customer = Actor::new(ChatId::new(1), Role::Customer);
        let operator = Actor::new(ChatId::new(2), Role::Operator);
        assert!(main_menu(customer, None).has_token(names::CONTACT_OPERATOR));
        assert!(!main_menu(operator, None).has_token(names::CONTACT_OPERATOR));

        let menu = contact_menu(Some("+79990000000"));
        assert!(menu.text.contains("+79990000000"));
        assert!(menu.has_token(names::REQUEST_CALLBACK));
        assert!(menu.has_token(names::CONTACT_CHAT));
        assert!(contact_sent("sent", false, None).text.starts_with("⚠️"));
    }
}
