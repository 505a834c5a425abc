use crate::orders::{EditableField, RequestedDate};
use crate::session::{ChatState, DraftOrder};

/// Where the wizard goes after `current` was filled in successfully.
///
/// While creating, steps run in a fixed order with subcategory and time
/// skipped when they do not apply. While editing, a single change returns
/// to the edit menu unless the changed value needs a follow-up step.
pub fn next_step(current: ChatState, draft: &DraftOrder) -> ChatState {
    let order = &draft.order;
    let needs_subcategory = order.category.is_some_and(|c| c.has_subcategories());
    let needs_time = matches!(order.date, Some(RequestedDate::On(_))) && order.time.is_none();

    if draft.is_editing() {
        return match current {
            ChatState::Category if needs_subcategory => ChatState::Subcategory,
            ChatState::Date if needs_time => ChatState::Time,
            _ => ChatState::EditMenu,
        };
    }

    match current {
        ChatState::Idle => ChatState::Category,
        ChatState::Category if needs_subcategory => ChatState::Subcategory,
        ChatState::Category | ChatState::Subcategory => ChatState::Description,
        ChatState::Description => ChatState::Name,
        ChatState::Name => ChatState::Date,
        ChatState::Date if needs_time => ChatState::Time,
        ChatState::Date | ChatState::Time | ChatState::MinuteSelection => ChatState::Phone,
        ChatState::Phone => ChatState::Address,
        ChatState::Address => ChatState::Media,
        ChatState::Media => ChatState::Payment,
        ChatState::Payment if draft.on_behalf => ChatState::StaffConfirmOptions,
        ChatState::Payment => ChatState::Confirm,
        other => other,
    }
}

/// First step shown when one field is picked from the edit menu.
pub fn entry_step(field: EditableField) -> ChatState {
    match field {
        EditableField::Category => ChatState::Category,
        EditableField::Description => ChatState::Description,
        EditableField::Name => ChatState::Name,
        EditableField::Date => ChatState::Date,
        EditableField::Time => ChatState::Time,
        EditableField::Phone => ChatState::Phone,
        EditableField::Address => ChatState::Address,
        EditableField::Media => ChatState::Media,
        EditableField::Payment => ChatState::Payment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::{Category, Order, RequestedTime};
    use chrono::NaiveDate;

    fn draft_with(category: Category) -> DraftOrder {
        let mut order = Order::default();
        order.category = Some(category);
        DraftOrder::creating(order, false)
    }

    #[test]
    fn subcategory_only_for_categories_that_have_them() {
        assert_eq!(
            next_step(ChatState::Category, &draft_with(Category::WasteRemoval)),
            ChatState::Subcategory
        );
        assert_eq!(
            next_step(ChatState::Category, &draft_with(Category::Other)),
            ChatState::Description
        );
    }

    #[test]
    fn asap_skips_time_step() {
        let mut draft = draft_with(Category::Other);
        draft.order.date = Some(RequestedDate::Asap);
        draft.order.time = Some(RequestedTime::Asap);
        assert_eq!(next_step(ChatState::Date, &draft), ChatState::Phone);

        draft.order.date = Some(RequestedDate::On(
            NaiveDate::from_ymd_opt(2030, 1, 2).expect("date"),
        ));
        draft.order.time = None;
        assert_eq!(next_step(ChatState::Date, &draft), ChatState::Time);
    }

    #[test]
    fn editing_returns_to_edit_menu() {
        let mut draft = DraftOrder::editing(Order::default());
        draft.order.category = Some(Category::Other);
        for state in [
            ChatState::Category,
            ChatState::Name,
            ChatState::Phone,
            ChatState::Time,
            ChatState::MinuteSelection,
            ChatState::Payment,
        ] {
            assert_eq!(next_step(state, &draft), ChatState::EditMenu, "{state}");
        }
        draft.order.category = Some(Category::Demolition);
        assert_eq!(next_step(ChatState::Category, &draft), ChatState::Subcategory);
    }

    #[test]
    fn staff_drafts_end_at_staff_options() {
        let mut draft = draft_with(Category::Other);
        assert_eq!(next_step(ChatState::Payment, &draft), ChatState::Confirm);
        draft.on_behalf = true;
        assert_eq!(
            next_step(ChatState::Payment, &draft),
            ChatState::StaffConfirmOptions
        );
    }
}
