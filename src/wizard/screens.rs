use super::input::StepContext;
use crate::channels::{Button, Screen};
use crate::dispatch::catalog::{names, token};
use crate::orders::format::order_details;
use crate::orders::{RequestedDate, ALL_CATEGORIES};
use crate::session::{ChatState, Session};
use chrono::{Datelike, Days, NaiveDate, Timelike, Weekday};

pub const QUARTER_HOURS: [u32; 4] = [0, 15, 30, 45];
const HOURS_PER_ROW: usize = 3;
const DATES_PER_ROW: usize = 2;

/// Prompt for the wizard step the session is at. States that are not wizard
/// steps render an empty screen; callers route those elsewhere.
pub fn prompt(session: &Session, ctx: &StepContext<'_>) -> Screen {
    let screen = match session.state {
        ChatState::Category => category_screen(),
        ChatState::Subcategory => subcategory_screen(session),
        ChatState::Description => Screen::new(
            "📝 Describe the job: volume, floor, access, anything the crew should know.",
        )
        .button("Skip", names::SKIP_DESCRIPTION),
        ChatState::Name => name_screen(session, ctx),
        ChatState::Date => date_screen(session, ctx),
        ChatState::Time => hour_screen(session, ctx),
        ChatState::MinuteSelection => minute_screen(session, ctx),
        ChatState::Phone => phone_screen(session, ctx),
        ChatState::Address => Screen::new(
            "📍 Type the address (street, house, entrance) or share a location.",
        )
        .button("📍 Share location", names::SEND_LOCATION_PROMPT),
        ChatState::Media => media_screen(session, ctx),
        ChatState::Payment => Screen::new("💳 How would you like to pay?").row(vec![
            Button::token("Online after pricing", names::PAYMENT_NOW),
            Button::token("On completion", names::PAYMENT_LATER),
        ]),
        ChatState::Confirm => return confirm_screen(session),
        _ => return Screen::default(),
    };
    with_navigation(screen, session)
}

fn with_navigation(screen: Screen, session: &Session) -> Screen {
    let first_step = !session.draft.is_editing() && session.state == ChatState::Category;
    let mut nav = Vec::new();
    if !first_step {
        nav.push(Button::token("⬅️ Back", names::BACK));
    }
    nav.push(Button::token("✖️ Cancel", names::CANCEL_FLOW));
    screen.row(nav)
}

fn category_screen() -> Screen {
    let mut screen = Screen::new("What do you need?");
    for category in ALL_CATEGORIES {
        screen = screen.button(
            category.label(),
            token(names::CATEGORY, &[&category.as_str()]),
        );
    }
    screen
}

fn subcategory_screen(session: &Session) -> Screen {
    let Some(category) = session.draft.order.category else {
        return Screen::new("Choose a category first.");
    };
    let mut screen = Screen::new(format!("{}: pick what fits best.", category.label()));
    for sub in category.subcategories() {
        screen = screen.button(sub.label(), token(names::SUBCATEGORY, &[&sub.as_str()]));
    }
    screen
}

fn name_screen(session: &Session, ctx: &StepContext<'_>) -> Screen {
    let draft = &session.draft;
    let whose = if draft.on_behalf { "the customer's" } else { "your" };
    let mut screen = Screen::new(format!("👤 Type {whose} name."));
    if draft.manual_entry {
        return screen;
    }
    if let Some(name) = &draft.order.name {
        screen = screen.button(format!("Keep: {name}"), names::CONFIRM_DRAFT_NAME);
    }
    if !draft.on_behalf {
        if let Some(name) = ctx.profile.and_then(|p| p.first_name.as_deref()) {
            if draft.order.name.as_deref() != Some(name) {
                screen = screen.button(format!("Use: {name}"), names::USE_PROFILE_NAME);
            }
        }
    }
    if screen.keyboard.is_empty() {
        return screen;
    }
    screen.button("Type another name", names::ENTER_ANOTHER_NAME)
}

fn phone_screen(session: &Session, ctx: &StepContext<'_>) -> Screen {
    let draft = &session.draft;
    let whose = if draft.on_behalf { "the customer's" } else { "your" };
    let mut screen = Screen::new(format!("📞 Type {whose} phone number, e.g. +79991234567."));
    if draft.manual_entry {
        return screen;
    }
    if let Some(phone) = &draft.order.phone {
        screen = screen.button(format!("Keep: {phone}"), names::CONFIRM_DRAFT_PHONE);
    }
    if !draft.on_behalf {
        if let Some(phone) = ctx.profile.and_then(|p| p.phone.as_deref()) {
            if draft.order.phone.as_deref() != Some(phone) {
                screen = screen.button(format!("Use: {phone}"), names::USE_PROFILE_PHONE);
            }
        }
    }
    if screen.keyboard.is_empty() {
        return screen;
    }
    screen.button("Type another number", names::CHANGE_PHONE)
}

fn date_screen(session: &Session, ctx: &StepContext<'_>) -> Screen {
    let business = ctx.business;
    let page = session.draft.date_page.min(business.max_date_pages.saturating_sub(1));
    let mut screen = Screen::new("📅 When should we come?");
    if page == 0 && !session.draft.is_editing() {
        screen = screen.button("⚡ As soon as possible", names::SELECT_DATE_ASAP);
    }

    let first = u64::from(page) * u64::from(business.date_page_days);
    let days: Vec<NaiveDate> = (0..u64::from(business.date_page_days))
        .filter_map(|offset| ctx.today().checked_add_days(Days::new(first + offset)))
        .collect();
    for chunk in days.chunks(DATES_PER_ROW) {
        let row = chunk
            .iter()
            .map(|day| {
                Button::token(
                    date_label(*day, ctx.today()),
                    token(names::SELECT_DATE, &[&day.format("%Y-%m-%d")]),
                )
            })
            .collect();
        screen = screen.row(row);
    }

    let mut paging = Vec::new();
    if page > 0 {
        paging.push(Button::token("◀️", token(names::DATE_PAGE, &[&(page - 1)])));
    }
    if page + 1 < business.max_date_pages {
        paging.push(Button::token("▶️", token(names::DATE_PAGE, &[&(page + 1)])));
    }
    screen.row(paging)
}

fn date_label(day: NaiveDate, today: NaiveDate) -> String {
    let weekday = match day.weekday() {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    };
    if day == today {
        return format!("Today {}", day.format("%d.%m"));
    }
    format!("{weekday} {}", day.format("%d.%m"))
}

fn is_today(session: &Session, ctx: &StepContext<'_>) -> bool {
    session.draft.order.date == Some(RequestedDate::On(ctx.today()))
}

/// Work hours still bookable for the chosen date.
pub fn available_hours(session: &Session, ctx: &StepContext<'_>) -> Vec<u32> {
    let today = is_today(session, ctx);
    ctx.business
        .work_hours
        .hours()
        .filter(|hour| !today || *hour >= ctx.now.hour())
        .collect()
}

fn hour_screen(session: &Session, ctx: &StepContext<'_>) -> Screen {
    let hours = available_hours(session, ctx);
    if hours.is_empty() {
        return Screen::new(
            "There are no free hours left on that day. Go back and pick another date.",
        );
    }
    let mut screen = Screen::new("🕒 Pick an hour or type the time as HH:MM.");
    for chunk in hours.chunks(HOURS_PER_ROW) {
        let row = chunk
            .iter()
            .map(|hour| {
                Button::token(format!("{hour:02}:00"), token(names::SELECT_HOUR, &[hour]))
            })
            .collect();
        screen = screen.row(row);
    }
    screen
}

fn minute_screen(session: &Session, ctx: &StepContext<'_>) -> Screen {
    let Some(hour) = session.draft.selected_hour else {
        return hour_screen(session, ctx);
    };
    let today = is_today(session, ctx);
    let row = QUARTER_HOURS
        .iter()
        .filter(|minute| !today || (hour, **minute) > (ctx.now.hour(), ctx.now.minute()))
        .map(|minute| {
            let label = format!("{hour:02}:{minute:02}");
            Button::token(label.clone(), token(names::SELECT_TIME, &[&label]))
        })
        .collect();
    Screen::new(format!("🕒 {hour:02}:__ Pick the minutes.")).row(row)
}

fn media_screen(session: &Session, ctx: &StepContext<'_>) -> Screen {
    let order = &session.draft.order;
    let mut screen = Screen::new(format!(
        "📷 Send photos or videos of the job.\nPhotos: {}/{}, videos: {}/{}",
        order.photos.len(),
        ctx.business.max_photos,
        order.videos.len(),
        ctx.business.max_videos
    ));
    if order.photos.is_empty() && order.videos.is_empty() {
        return screen.button("Skip", names::SKIP_MEDIA);
    }
    screen = screen.button("✅ Done", names::FINISH_MEDIA);
    screen.row(vec![
        Button::token("👀 View", names::VIEW_MEDIA),
        Button::token("🗑 Start over", names::RESET_MEDIA),
    ])
}

fn confirm_screen(session: &Session) -> Screen {
    let draft = &session.draft;
    let mut screen = Screen::new(format!(
        "Please check your order:\n\n{}",
        order_details(&draft.order)
    ));
    if let Some(id) = draft.order.id {
        screen = screen.button("✅ Confirm", token(names::CONFIRM_ORDER, &[&id]));
    }
    for state in &draft.visited {
        if state.is_wizard_step() && *state != ChatState::MinuteSelection {
            screen = screen.button(
                format!("✏️ {}", step_label(*state)),
                token(names::BACK_TO, &[state]),
            );
        }
    }
    screen.row(vec![
        Button::token("⬅️ Back", names::BACK),
        Button::token("✖️ Cancel", names::CANCEL_FLOW),
    ])
}

pub fn step_label(state: ChatState) -> &'static str {
    match state {
        ChatState::Category => "Category",
        ChatState::Subcategory => "Subcategory",
        ChatState::Description => "Description",
        ChatState::Name => "Name",
        ChatState::Date => "Date",
        ChatState::Time | ChatState::MinuteSelection => "Time",
        ChatState::Phone => "Phone",
        ChatState::Address => "Address",
        ChatState::Media => "Photos and videos",
        ChatState::Payment => "Payment",
        _ => "Step",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BusinessConfig;
    use crate::orders::{Category, Order};
    use crate::session::DraftOrder;
    use chrono::NaiveDateTime;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2030, 1, 10)
            .and_then(|d| d.and_hms_opt(14, 20, 0))
            .expect("now")
    }

    fn session_at(state: ChatState, draft: DraftOrder) -> Session {
        let mut session = Session {
            draft,
            ..Session::default()
        };
        session.push_state(state);
        session
    }

    #[test]
    fn first_date_page_offers_asap_only_while_creating() {
        let business = BusinessConfig::default();
        let ctx = StepContext {
            now: now(),
            profile: None,
            business: &business,
        };
        let creating = session_at(ChatState::Date, DraftOrder::creating(Order::default(), false));
        let screen = prompt(&creating, &ctx);
        assert!(screen.has_token(names::SELECT_DATE_ASAP));
        assert!(screen.has_token("select_date_2030-01-10"));
        assert!(screen.has_token("select_date_2030-01-16"));
        assert!(!screen.has_token("select_date_2030-01-17"));
        assert!(screen.has_token("date_page_1"));

        let editing = session_at(ChatState::Date, DraftOrder::editing(Order::default()));
        assert!(!prompt(&editing, &ctx).has_token(names::SELECT_DATE_ASAP));
    }

    #[test]
    fn today_hides_past_hours_and_minutes() {
        let business = BusinessConfig::default();
        let ctx = StepContext {
            now: now(),
            profile: None,
            business: &business,
        };
        let mut order = Order::default();
        order.category = Some(Category::Other);
        order.date = Some(RequestedDate::On(now().date()));
        let mut session = session_at(ChatState::Time, DraftOrder::creating(order, false));
        let hours = prompt(&session, &ctx);
        assert!(!hours.has_token("select_hour_13"));
        assert!(hours.has_token("select_hour_14"));
        assert!(hours.has_token("select_hour_17"));

        session.draft.selected_hour = Some(14);
        session.push_state(ChatState::MinuteSelection);
        let minutes = prompt(&session, &ctx);
        assert!(!minutes.has_token("select_time_14:15"));
        assert!(minutes.has_token("select_time_14:30"));
    }

    #[test]
    fn confirm_screen_carries_draft_id() {
        let mut order = Order::default();
        order.id = Some(crate::shared::OrderId::new(42));
        let session = session_at(ChatState::Confirm, DraftOrder::creating(order, false));
        let business = BusinessConfig::default();
        let ctx = StepContext {
            now: now(),
            profile: None,
            business: &business,
        };
        assert!(prompt(&session, &ctx).has_token("confirm_order_42"));
    }
}
