use super::model::{Order, PaymentPreference};

pub fn order_title(order: &Order) -> String {
    match order.id {
        Some(id) => format!("order #{id}"),
        None => "the new order".to_string(),
    }
}

pub fn format_cost(cost: Option<f64>) -> String {
    match cost {
        Some(value) if value.fract() == 0.0 => format!("{value:.0} ₽"),
        Some(value) => format!("{value:.2} ₽"),
        None => "not set".to_string(),
    }
}

/// Multi-line plain-text card used by order screens.
pub fn order_details(order: &Order) -> String {
    let mut lines = vec![format!(
        "📦 {} ({})",
        capitalize(&order_title(order)),
        order.status.label()
    )];

    let category = match (order.category, order.subcategory) {
        (Some(category), Some(sub)) => format!("{} / {}", category.label(), sub.label()),
        (Some(category), None) => category.label().to_string(),
        _ => "-".to_string(),
    };
    lines.push(format!("Category: {category}"));
    lines.push(format!(
        "Description: {}",
        order.description.as_deref().unwrap_or("-")
    ));
    lines.push(format!("Name: {}", order.name.as_deref().unwrap_or("-")));
    let when = match (order.date, order.time) {
        (Some(date), Some(time)) if date.is_asap() => format!("{date} ({time})"),
        (Some(date), Some(time)) => format!("{date} {time}"),
        (Some(date), None) => date.to_string(),
        _ => "-".to_string(),
    };
    lines.push(format!("When: {when}"));
    lines.push(format!("Phone: {}", order.phone.as_deref().unwrap_or("-")));
    let address = match &order.address {
        Some(address) => match address.location {
            Some(point) => format!(
                "{} ({:.5}, {:.5})",
                address.text, point.latitude, point.longitude
            ),
            None => address.text.clone(),
        },
        None => "-".to_string(),
    };
    lines.push(format!("Address: {address}"));
    lines.push(format!(
        "Media: {} photo(s), {} video(s)",
        order.photos.len(),
        order.videos.len()
    ));
    let payment = match order.payment {
        Some(PaymentPreference::Now) => "pay now",
        Some(PaymentPreference::Later) => "pay later",
        None => "-",
    };
    lines.push(format!("Payment: {payment}"));
    lines.push(format!("Cost: {}", format_cost(order.cost)));
    if let Some(reason) = &order.reason {
        lines.push(format!("Reason: {reason}"));
    }
    if !order.executors.is_empty() {
        let executors = order
            .executors
            .iter()
            .map(|e| {
                format!(
                    "{} {}{}",
                    e.role.as_str(),
                    e.chat_id,
                    if e.notified { " ✓" } else { "" }
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("Executors: {executors}"));
    }
    lines.join("\n")
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
