use super::navigation::next_step;
use crate::config::BusinessConfig;
use crate::orders::validate::{
    normalize_phone, validate_address, validate_coordinates, validate_description, validate_name,
};
use crate::orders::{
    Address, Category, EditableField, MediaItem, MediaKind, PaymentPreference, RequestedDate,
    RequestedTime, Subcategory, UserProfile,
};
use crate::session::{ChatState, Session};
use chrono::{Days, NaiveDate, NaiveDateTime, Timelike};

/// Everything outside the session a step needs to validate input.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    /// Local wall-clock time in the business timezone.
    pub now: NaiveDateTime,
    pub profile: Option<&'a UserProfile>,
    pub business: &'a BusinessConfig,
}

impl StepContext<'_> {
    pub fn today(&self) -> NaiveDate {
        self.now.date()
    }

    /// Last day offered by the paged date menu.
    pub fn last_bookable_day(&self) -> NaiveDate {
        let span =
            u64::from(self.business.date_page_days) * u64::from(self.business.max_date_pages);
        self.today()
            .checked_add_days(Days::new(span.saturating_sub(1)))
            .unwrap_or(NaiveDate::MAX)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepInput {
    Text(String),
    Category(Category),
    Subcategory(Subcategory),
    SkipDescription,
    UseProfileName,
    ConfirmDraftName,
    TypeManually,
    Date(NaiveDate),
    DatePage(u32),
    DateAsap,
    Hour(u32),
    Time { hour: u32, minute: u32 },
    UseProfilePhone,
    ConfirmDraftPhone,
    Location { latitude: f64, longitude: f64 },
    Media(MediaItem),
    SkipMedia,
    FinishMedia,
    ResetMedia,
    Payment(PaymentPreference),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step was completed. `persist` names the field to write back when
    /// an edit of a stored order has just finished.
    Moved {
        next: ChatState,
        persist: Option<EditableField>,
    },
    /// Nothing advanced; re-render the current prompt, with the error when
    /// the input was rejected.
    Stay { error: Option<String> },
    /// A media file was collected. `new_group` is false for the later
    /// parts of an album whose first part was already acknowledged.
    MediaAdded { new_group: bool },
}

enum Accepted {
    Advance,
    GoTo(ChatState),
    Quiet,
    Media { new_group: bool },
}

/// Applies one input to the step the session is at. Rejected input leaves
/// the draft and history exactly as they were.
pub fn apply(session: &mut Session, input: StepInput, ctx: &StepContext<'_>) -> StepOutcome {
    let current = session.state;
    match accept(session, input, ctx) {
        Err(error) => StepOutcome::Stay { error: Some(error) },
        Ok(Accepted::Quiet) => StepOutcome::Stay { error: None },
        Ok(Accepted::Media { new_group }) => StepOutcome::MediaAdded { new_group },
        Ok(Accepted::GoTo(next)) => {
            session.draft.mark_visited(current);
            session.draft.manual_entry = false;
            session.push_state(next);
            StepOutcome::Moved {
                next,
                persist: None,
            }
        }
        Ok(Accepted::Advance) => {
            session.draft.mark_visited(current);
            session.draft.manual_entry = false;
            let next = next_step(current, &session.draft);
            if next == ChatState::EditMenu {
                session.return_to(ChatState::EditMenu);
                let persist = session.draft.editing_field.take();
                return StepOutcome::Moved { next, persist };
            }
            session.push_state(next);
            StepOutcome::Moved {
                next,
                persist: None,
            }
        }
    }
}

fn accept(
    session: &mut Session,
    input: StepInput,
    ctx: &StepContext<'_>,
) -> Result<Accepted, String> {
    let state = session.state;
    let draft = &mut session.draft;
    match (state, input) {
        (ChatState::Category, StepInput::Category(category)) => {
            draft.order.category = Some(category);
            draft.order.subcategory = None;
            Ok(Accepted::Advance)
        }
        (ChatState::Subcategory, StepInput::Subcategory(sub)) => {
            if draft.order.category != Some(sub.category()) {
                return Err("That option does not belong to the chosen category.".to_string());
            }
            draft.order.subcategory = Some(sub);
            Ok(Accepted::Advance)
        }
        (ChatState::Description, StepInput::Text(raw)) => {
            draft.order.description = Some(validate_description(&raw)?);
            Ok(Accepted::Advance)
        }
        (ChatState::Description, StepInput::SkipDescription) => {
            draft.order.description = None;
            Ok(Accepted::Advance)
        }
        (ChatState::Name, StepInput::Text(raw)) => {
            draft.order.name = Some(validate_name(&raw)?);
            Ok(Accepted::Advance)
        }
        (ChatState::Name, StepInput::UseProfileName) => {
            if draft.on_behalf {
                return Err("Type the customer's name.".to_string());
            }
            let stored = ctx
                .profile
                .and_then(|p| p.first_name.as_deref())
                .ok_or_else(|| "Your profile has no name yet; please type it.".to_string())?;
            draft.order.name = Some(validate_name(stored)?);
            Ok(Accepted::Advance)
        }
        (ChatState::Name, StepInput::ConfirmDraftName) => {
            if draft.order.name.is_none() {
                return Err("No name has been entered yet.".to_string());
            }
            Ok(Accepted::Advance)
        }
        (ChatState::Name | ChatState::Phone, StepInput::TypeManually) => {
            draft.manual_entry = true;
            Ok(Accepted::Quiet)
        }
        (ChatState::Date, StepInput::Date(date)) => {
            if date < ctx.today() {
                return Err("That date is in the past. Please pick another day.".to_string());
            }
            if date > ctx.last_bookable_day() {
                return Err("That date is too far ahead. Please pick another day.".to_string());
            }
            draft.order.date = Some(RequestedDate::On(date));
            draft.order.time = None;
            draft.selected_hour = None;
            Ok(Accepted::Advance)
        }
        (ChatState::Date, StepInput::DateAsap) => {
            if draft.is_editing() {
                return Err("\"As soon as possible\" is only available for new orders.".to_string());
            }
            draft.order.date = Some(RequestedDate::Asap);
            draft.order.time = Some(RequestedTime::Asap);
            draft.selected_hour = None;
            Ok(Accepted::Advance)
        }
        (ChatState::Date, StepInput::DatePage(page)) => {
            if page >= ctx.business.max_date_pages {
                return Err("There are no more dates to show.".to_string());
            }
            draft.date_page = page;
            Ok(Accepted::Quiet)
        }
        (ChatState::Time | ChatState::MinuteSelection, StepInput::Hour(hour)) => {
            check_hour(hour, draft.order.date, ctx)?;
            draft.selected_hour = Some(hour);
            Ok(Accepted::GoTo(ChatState::MinuteSelection))
        }
        (ChatState::Time | ChatState::MinuteSelection, StepInput::Time { hour, minute }) => {
            let time = checked_time(hour, minute, draft.order.date, ctx)?;
            draft.order.time = Some(time);
            draft.selected_hour = None;
            Ok(Accepted::Advance)
        }
        (ChatState::Time | ChatState::MinuteSelection, StepInput::Text(raw)) => {
            let (hour, minute) = match RequestedTime::parse(&raw) {
                Ok(RequestedTime::At { hour, minute }) => (hour, minute),
                _ => return Err("Please type the time as HH:MM, for example 14:30.".to_string()),
            };
            let time = checked_time(hour, minute, draft.order.date, ctx)?;
            draft.order.time = Some(time);
            draft.selected_hour = None;
            Ok(Accepted::Advance)
        }
        (ChatState::Phone, StepInput::Text(raw)) => {
            draft.order.phone = Some(normalize_phone(&raw)?);
            Ok(Accepted::Advance)
        }
        (ChatState::Phone, StepInput::UseProfilePhone) => {
            if draft.on_behalf {
                return Err("Type the customer's phone number.".to_string());
            }
            let stored = ctx
                .profile
                .and_then(|p| p.phone.as_deref())
                .ok_or_else(|| "Your profile has no phone yet; please type it.".to_string())?;
            draft.order.phone = Some(normalize_phone(stored)?);
            Ok(Accepted::Advance)
        }
        (ChatState::Phone, StepInput::ConfirmDraftPhone) => {
            if draft.order.phone.is_none() {
                return Err("No phone number has been entered yet.".to_string());
            }
            Ok(Accepted::Advance)
        }
        (ChatState::Address, StepInput::Text(raw)) => {
            draft.order.address = Some(Address::text(validate_address(&raw)?));
            Ok(Accepted::Advance)
        }
        (
            ChatState::Address,
            StepInput::Location {
                latitude,
                longitude,
            },
        ) => {
            let point = validate_coordinates(latitude, longitude)?;
            draft.order.address = Some(Address::location(point));
            Ok(Accepted::Advance)
        }
        (ChatState::Media, StepInput::Media(item)) => {
            let (count, limit, noun) = match item.kind {
                MediaKind::Photo => (draft.order.photos.len(), ctx.business.max_photos, "photos"),
                MediaKind::Video => (draft.order.videos.len(), ctx.business.max_videos, "videos"),
            };
            if count >= limit {
                return Err(format!("You can attach at most {limit} {noun}."));
            }
            let new_group = match &item.group_id {
                Some(group) => draft.media_group.as_deref() != Some(group.as_str()),
                None => true,
            };
            draft.media_group = item.group_id.clone();
            match item.kind {
                MediaKind::Photo => draft.order.photos.push(item.file_id),
                MediaKind::Video => draft.order.videos.push(item.file_id),
            }
            Ok(Accepted::Media { new_group })
        }
        (ChatState::Media, StepInput::SkipMedia) => Ok(Accepted::Advance),
        (ChatState::Media, StepInput::FinishMedia) => {
            if draft.order.photos.is_empty() && draft.order.videos.is_empty() {
                return Err("Nothing has been uploaded yet.".to_string());
            }
            draft.media_group = None;
            Ok(Accepted::Advance)
        }
        (ChatState::Media, StepInput::ResetMedia) => {
            draft.order.photos.clear();
            draft.order.videos.clear();
            draft.media_group = None;
            Ok(Accepted::Quiet)
        }
        (ChatState::Payment, StepInput::Payment(payment)) => {
            draft.order.payment = Some(payment);
            Ok(Accepted::Advance)
        }
        (_, StepInput::Text(_)) => Err("Please use the buttons below.".to_string()),
        (_, StepInput::Media(_)) => {
            Err("Media can only be attached at the media step.".to_string())
        }
        (_, StepInput::Location { .. }) => {
            Err("A location can only be shared at the address step.".to_string())
        }
        _ => Err("This button belongs to another step. Please use the current menu.".to_string()),
    }
}

fn check_hour(
    hour: u32,
    date: Option<RequestedDate>,
    ctx: &StepContext<'_>,
) -> Result<(), String> {
    let Some(RequestedDate::On(day)) = date else {
        return Err("Pick a date first.".to_string());
    };
    let hours = ctx.business.work_hours;
    if !hours.contains(hour) {
        return Err(format!(
            "We work from {:02}:00 to {:02}:59.",
            hours.start, hours.end
        ));
    }
    if day == ctx.today() && hour < ctx.now.hour() {
        return Err("That hour has already passed today.".to_string());
    }
    Ok(())
}

fn checked_time(
    hour: u32,
    minute: u32,
    date: Option<RequestedDate>,
    ctx: &StepContext<'_>,
) -> Result<RequestedTime, String> {
    check_hour(hour, date, ctx)?;
    let time = RequestedTime::at(hour, minute)?;
    if date == Some(RequestedDate::On(ctx.today()))
        && (hour, minute) <= (ctx.now.hour(), ctx.now.minute())
    {
        return Err("That time has already passed today.".to_string());
    }
    Ok(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::{Order, Role};
    use crate::session::DraftOrder;
    use crate::shared::ChatId;

    fn ctx_at<'a>(
        business: &'a BusinessConfig,
        profile: Option<&'a UserProfile>,
    ) -> StepContext<'a> {
        StepContext {
            now: NaiveDate::from_ymd_opt(2030, 1, 10)
                .and_then(|d| d.and_hms_opt(12, 5, 0))
                .expect("now"),
            profile,
            business,
        }
    }

    fn session_at(state: ChatState) -> Session {
        let mut session = Session {
            draft: DraftOrder::creating(Order::default(), false),
            ..Session::default()
        };
        session.push_state(state);
        session
    }

    #[test]
    fn invalid_text_keeps_draft_and_history() {
        let business = BusinessConfig::default();
        let ctx = ctx_at(&business, None);
        let mut session = session_at(ChatState::Name);
        let before = session.clone();
        let outcome = apply(&mut session, StepInput::Text("I".to_string()), &ctx);
        assert!(matches!(outcome, StepOutcome::Stay { error: Some(_) }));
        assert_eq!(session, before);
    }

    #[test]
    fn profile_name_shortcut_requires_stored_name() {
        let business = BusinessConfig::default();
        let profile = UserProfile {
            chat_id: ChatId::new(1),
            role: Role::Customer,
            first_name: Some("Ivan".to_string()),
            phone: None,
        };
        let ctx = ctx_at(&business, Some(&profile));
        let mut session = session_at(ChatState::Name);
        let outcome = apply(&mut session, StepInput::UseProfileName, &ctx);
        assert_eq!(
            outcome,
            StepOutcome::Moved {
                next: ChatState::Date,
                persist: None
            }
        );
        assert_eq!(session.draft.order.name.as_deref(), Some("Ivan"));

        let mut session = session_at(ChatState::Phone);
        let outcome = apply(&mut session, StepInput::UseProfilePhone, &ctx);
        assert!(matches!(outcome, StepOutcome::Stay { error: Some(_) }));
    }

    #[test]
    fn date_selection_resets_time_and_rejects_past_days() {
        let business = BusinessConfig::default();
        let ctx = ctx_at(&business, None);
        let mut session = session_at(ChatState::Date);
        session.draft.order.time = Some(RequestedTime::At { hour: 10, minute: 0 });

        let yesterday = NaiveDate::from_ymd_opt(2030, 1, 9).expect("date");
        let outcome = apply(&mut session, StepInput::Date(yesterday), &ctx);
        assert!(matches!(outcome, StepOutcome::Stay { error: Some(_) }));

        let tomorrow = NaiveDate::from_ymd_opt(2030, 1, 11).expect("date");
        let outcome = apply(&mut session, StepInput::Date(tomorrow), &ctx);
        assert_eq!(
            outcome,
            StepOutcome::Moved {
                next: ChatState::Time,
                persist: None
            }
        );
        assert_eq!(session.draft.order.time, None);
    }

    #[test]
    fn hour_then_minute_sets_time() {
        let business = BusinessConfig::default();
        let ctx = ctx_at(&business, None);
        let mut session = session_at(ChatState::Time);
        session.draft.order.date = Some(RequestedDate::On(
            NaiveDate::from_ymd_opt(2030, 1, 10).expect("date"),
        ));

        let outcome = apply(&mut session, StepInput::Hour(11), &ctx);
        assert!(matches!(outcome, StepOutcome::Stay { error: Some(_) }));
        let outcome = apply(&mut session, StepInput::Hour(18), &ctx);
        assert!(matches!(outcome, StepOutcome::Stay { error: Some(_) }));

        let outcome = apply(&mut session, StepInput::Hour(14), &ctx);
        assert_eq!(
            outcome,
            StepOutcome::Moved {
                next: ChatState::MinuteSelection,
                persist: None
            }
        );
        let outcome = apply(&mut session, StepInput::Time { hour: 14, minute: 30 }, &ctx);
        assert_eq!(
            outcome,
            StepOutcome::Moved {
                next: ChatState::Phone,
                persist: None
            }
        );
        assert_eq!(
            session.draft.order.time,
            Some(RequestedTime::At { hour: 14, minute: 30 })
        );
        assert_eq!(session.draft.selected_hour, None);
    }

    #[test]
    fn asap_is_refused_while_editing() {
        let business = BusinessConfig::default();
        let ctx = ctx_at(&business, None);
        let mut session = Session {
            draft: DraftOrder::editing(Order::default()),
            ..Session::default()
        };
        session.push_state(ChatState::Date);
        let outcome = apply(&mut session, StepInput::DateAsap, &ctx);
        assert!(matches!(outcome, StepOutcome::Stay { error: Some(_) }));
    }

    #[test]
    fn media_is_bounded_and_albums_are_acknowledged_once() {
        let business = BusinessConfig {
            max_photos: 2,
            ..BusinessConfig::default()
        };
        let ctx = ctx_at(&business, None);
        let mut session = session_at(ChatState::Media);
        let photo = |id: &str| MediaItem {
            kind: MediaKind::Photo,
            file_id: id.to_string(),
            group_id: Some("album-1".to_string()),
        };

        assert_eq!(
            apply(&mut session, StepInput::Media(photo("a")), &ctx),
            StepOutcome::MediaAdded { new_group: true }
        );
        assert_eq!(
            apply(&mut session, StepInput::Media(photo("b")), &ctx),
            StepOutcome::MediaAdded { new_group: false }
        );
        assert!(matches!(
            apply(&mut session, StepInput::Media(photo("c")), &ctx),
            StepOutcome::Stay { error: Some(_) }
        ));
        assert_eq!(session.draft.order.photos, vec!["a", "b"]);

        apply(&mut session, StepInput::ResetMedia, &ctx);
        assert!(session.draft.order.photos.is_empty());
        assert!(matches!(
            apply(&mut session, StepInput::FinishMedia, &ctx),
            StepOutcome::Stay { error: Some(_) }
        ));
    }

    #[test]
    fn editing_change_reports_field_to_persist() {
        let business = BusinessConfig::default();
        let ctx = ctx_at(&business, None);
        let mut session = Session {
            draft: DraftOrder::editing(Order::default()),
            ..Session::default()
        };
        session.draft.editing_field = Some(EditableField::Phone);
        session.push_state(ChatState::EditMenu);
        session.push_state(ChatState::Phone);

        let outcome = apply(&mut session, StepInput::Text("89991234567".to_string()), &ctx);
        assert_eq!(
            outcome,
            StepOutcome::Moved {
                next: ChatState::EditMenu,
                persist: Some(EditableField::Phone)
            }
        );
        assert_eq!(session.history, vec![ChatState::EditMenu]);
        assert_eq!(session.draft.order.phone.as_deref(), Some("+79991234567"));
    }
}
