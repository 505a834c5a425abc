use crate::orders::{EditableField, Order};
use crate::shared::{MessageId, OrderId};
use serde::{Deserialize, Serialize};

/// Where a chat currently is in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatState {
    Idle,
    Category,
    Subcategory,
    Description,
    Name,
    Date,
    Time,
    MinuteSelection,
    Phone,
    Address,
    Media,
    Payment,
    Confirm,
    EditMenu,
    ReasonInput,
    CostInput,
    FinalCostInput,
    StaffConfirmOptions,
    StaffCostInput,
    StaffAssignExecutors,
    CallbackPhoneInput,
    OperatorMessageInput,
}

pub const ALL_CHAT_STATES: [ChatState; 22] = [
    ChatState::Idle,
    ChatState::Category,
    ChatState::Subcategory,
    ChatState::Description,
    ChatState::Name,
    ChatState::Date,
    ChatState::Time,
    ChatState::MinuteSelection,
    ChatState::Phone,
    ChatState::Address,
    ChatState::Media,
    ChatState::Payment,
    ChatState::Confirm,
    ChatState::EditMenu,
    ChatState::ReasonInput,
    ChatState::CostInput,
    ChatState::FinalCostInput,
    ChatState::StaffConfirmOptions,
    ChatState::StaffCostInput,
    ChatState::StaffAssignExecutors,
    ChatState::CallbackPhoneInput,
    ChatState::OperatorMessageInput,
];

impl ChatState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Category => "category",
            Self::Subcategory => "subcategory",
            Self::Description => "description",
            Self::Name => "name",
            Self::Date => "date",
            Self::Time => "time",
            Self::MinuteSelection => "minute_selection",
            Self::Phone => "phone",
            Self::Address => "address",
            Self::Media => "media",
            Self::Payment => "payment",
            Self::Confirm => "confirm",
            Self::EditMenu => "edit_menu",
            Self::ReasonInput => "reason_input",
            Self::CostInput => "cost_input",
            Self::FinalCostInput => "final_cost_input",
            Self::StaffConfirmOptions => "staff_confirm_options",
            Self::StaffCostInput => "staff_cost_input",
            Self::StaffAssignExecutors => "staff_assign_executors",
            Self::CallbackPhoneInput => "callback_phone_input",
            Self::OperatorMessageInput => "operator_message_input",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        let normalized = raw.trim().to_ascii_lowercase();
        ALL_CHAT_STATES
            .into_iter()
            .find(|state| state.as_str() == normalized)
            .ok_or_else(|| format!("unknown chat state `{}`", raw.trim()))
    }

    /// Steps of the order wizard that collect one field each.
    pub fn is_wizard_step(self) -> bool {
        matches!(
            self,
            Self::Category
                | Self::Subcategory
                | Self::Description
                | Self::Name
                | Self::Date
                | Self::Time
                | Self::MinuteSelection
                | Self::Phone
                | Self::Address
                | Self::Media
                | Self::Payment
        )
    }
}

impl std::fmt::Display for ChatState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftMode {
    #[default]
    Creating,
    Editing,
}

/// What a typed reason will be used for once it is long enough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonKind {
    Cancel,
    RejectCost,
    OperatorCancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct PendingReason {
    pub kind: ReasonKind,
    pub order_id: OrderId,
}

/// Scratch data for the flow a chat is in.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DraftOrder {
    #[serde(default)]
    pub order: Order,
    #[serde(default)]
    pub mode: DraftMode,
    /// Staff member entering the order for someone else.
    #[serde(default)]
    pub on_behalf: bool,
    #[serde(default)]
    pub editing_field: Option<EditableField>,
    #[serde(default)]
    pub pending_reason: Option<PendingReason>,
    /// Order an operator is entering a price for.
    #[serde(default)]
    pub target_order: Option<OrderId>,
    #[serde(default)]
    pub selected_hour: Option<u32>,
    #[serde(default)]
    pub date_page: u32,
    #[serde(default)]
    pub media_group: Option<String>,
    #[serde(default)]
    pub ephemeral_messages: Vec<MessageId>,
    #[serde(default)]
    pub location_prompt: Option<MessageId>,
    #[serde(default)]
    pub visited: Vec<ChatState>,
    /// Set when the actor chose to type a value instead of a shortcut.
    #[serde(default)]
    pub manual_entry: bool,
}

impl DraftOrder {
    pub fn creating(order: Order, on_behalf: bool) -> Self {
        Self {
            order,
            on_behalf,
            ..Self::default()
        }
    }

    pub fn editing(order: Order) -> Self {
        Self {
            order,
            mode: DraftMode::Editing,
            ..Self::default()
        }
    }

    pub fn is_editing(&self) -> bool {
        self.mode == DraftMode::Editing
    }

    pub fn mark_visited(&mut self, state: ChatState) {
        if !self.visited.contains(&state) {
            self.visited.push(state);
        }
    }

    pub fn has_visited(&self, state: ChatState) -> bool {
        self.visited.contains(&state)
    }
}

/// Everything remembered about one chat between interactions.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Session {
    pub state: ChatState,
    #[serde(default)]
    pub history: Vec<ChatState>,
    #[serde(default)]
    pub draft: DraftOrder,
    #[serde(default)]
    pub current_message: Option<MessageId>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            state: ChatState::Idle,
            history: Vec::new(),
            draft: DraftOrder::default(),
            current_message: None,
        }
    }
}

impl Session {
    /// Enters `state`, recording it on the history stack unless it is
    /// already on top.
    pub fn push_state(&mut self, state: ChatState) {
        if self.history.last() != Some(&state) {
            self.history.push(state);
        }
        self.state = state;
    }

    /// Enters `state`, dropping everything recorded after its last visit.
    pub fn return_to(&mut self, state: ChatState) {
        match self.history.iter().rposition(|entry| *entry == state) {
            Some(index) => self.history.truncate(index + 1),
            None => self.history.push(state),
        }
        self.state = state;
    }

    /// Steps back one entry. With nothing to go back to the history resets
    /// to idle.
    pub fn pop_state(&mut self) -> ChatState {
        if self.history.len() > 1 {
            self.history.pop();
            let previous = self.history.last().copied().unwrap_or(ChatState::Idle);
            self.state = previous;
            return previous;
        }
        self.history = vec![ChatState::Idle];
        self.state = ChatState::Idle;
        ChatState::Idle
    }

    /// Drops flow data but keeps the screen that is currently shown.
    pub fn reset_flow(&mut self) {
        let current_message = self.current_message;
        *self = Self::default();
        self.current_message = current_message;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_state_skips_duplicate_top() {
        let mut session = Session::default();
        session.push_state(ChatState::Category);
        session.push_state(ChatState::Category);
        session.push_state(ChatState::Description);
        assert_eq!(
            session.history,
            vec![ChatState::Category, ChatState::Description]
        );
        assert_eq!(session.state, ChatState::Description);
    }

    #[test]
    fn pop_state_returns_previous_or_resets_to_idle() {
        let mut session = Session::default();
        session.push_state(ChatState::Category);
        session.push_state(ChatState::Subcategory);
        assert_eq!(session.pop_state(), ChatState::Category);
        assert_eq!(session.state, ChatState::Category);

        assert_eq!(session.pop_state(), ChatState::Idle);
        assert_eq!(session.history, vec![ChatState::Idle]);
        assert_eq!(session.state, ChatState::Idle);
    }

    #[test]
    fn return_to_truncates_history_after_last_visit() {
        let mut session = Session::default();
        session.push_state(ChatState::EditMenu);
        session.push_state(ChatState::Date);
        session.push_state(ChatState::Time);
        session.return_to(ChatState::EditMenu);
        assert_eq!(session.history, vec![ChatState::EditMenu]);
        assert_eq!(session.state, ChatState::EditMenu);
    }

    #[test]
    fn chat_states_round_trip_through_as_str() {
        for state in ALL_CHAT_STATES {
            assert_eq!(ChatState::parse(state.as_str()), Ok(state));
        }
        assert!(ChatState::parse("floating").is_err());
    }

    #[test]
    fn reset_flow_keeps_current_message() {
        let mut session = Session::default();
        session.push_state(ChatState::Name);
        session.draft.on_behalf = true;
        session.current_message = Some(MessageId::new(4));
        session.reset_flow();
        assert_eq!(session.state, ChatState::Idle);
        assert!(session.history.is_empty());
        assert!(!session.draft.on_behalf);
        assert_eq!(session.current_message, Some(MessageId::new(4)));
    }
}
