use crate::orders::{
    Category, EditableField, ExecutorRole, OrderStatus, PaymentPreference, Subcategory,
};
use crate::session::ChatState;
use crate::shared::{ChatId, OrderId};
use chrono::NaiveDate;

/// A decoded action token. Built once at the boundary; handlers never look
/// at raw token text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    MainMenu,
    Noop,
    Back,
    BackTo(ChatState),
    CancelFlow,
    CancelFlowConfirmed,

    NewOrder,
    StaffNewOrder,
    ContactOperator,
    RequestCallback,
    ContactChat,
    Category(Category),
    Subcategory(Subcategory),
    SkipDescription,
    UseProfileName,
    EnterAnotherName,
    ConfirmDraftName,
    SelectDate(NaiveDate),
    DatePage(u32),
    SelectDateAsap,
    SelectHour(u32),
    SelectTime { hour: u32, minute: u32 },
    UseProfilePhone,
    ConfirmDraftPhone,
    ChangePhone,
    SendLocationPrompt,
    SkipMedia,
    FinishMedia,
    ResetMedia,
    ViewMedia,
    Payment(PaymentPreference),
    ConfirmOrder(OrderId),

    StaffSetCost(OrderId),
    StaffSkipCost(OrderId),
    StaffConfirmSimple(OrderId),
    StaffSkipAssign(OrderId),
    StaffFinalize(OrderId),

    EditOrder(OrderId),
    EditField {
        field: EditableField,
        order_id: OrderId,
    },

    MyOrders(u32),
    ManageOrders,
    OrdersByStatus {
        status: OrderStatus,
        page: u32,
    },
    ViewOrder(OrderId),
    SetCost(OrderId),
    AcceptCost(OrderId),
    RejectCost(OrderId),
    CancelOrder(OrderId),
    CancelOrderOperator(OrderId),
    PayOrder(OrderId),
    AssignExecutor {
        order_id: OrderId,
        executor: ChatId,
        role: ExecutorRole,
    },
    UnassignExecutor {
        order_id: OrderId,
        executor: ChatId,
    },
    AssignExecutors(OrderId),
    MarkDone(OrderId),
    SetFinalCost(OrderId),
    MarkCalculated(OrderId),
    MarkSettled(OrderId),
    ResumeOrder(OrderId),
}

impl Command {
    /// Registered token name this command decodes from.
    pub fn name(&self) -> &'static str {
        use super::catalog::names;
        match self {
            Self::Start => names::START,
            Self::MainMenu => names::MAIN_MENU,
            Self::Noop => names::NOOP,
            Self::Back => names::BACK,
            Self::BackTo(_) => names::BACK_TO,
            Self::CancelFlow => names::CANCEL_FLOW,
            Self::CancelFlowConfirmed => names::CANCEL_FLOW_CONFIRMED,
            Self::NewOrder => names::NEW_ORDER,
            Self::StaffNewOrder => names::STAFF_NEW_ORDER,
            Self::ContactOperator => names::CONTACT_OPERATOR,
            Self::RequestCallback => names::REQUEST_CALLBACK,
            Self::ContactChat => names::CONTACT_CHAT,
            Self::Category(_) => names::CATEGORY,
            Self::Subcategory(_) => names::SUBCATEGORY,
            Self::SkipDescription => names::SKIP_DESCRIPTION,
            Self::UseProfileName => names::USE_PROFILE_NAME,
            Self::EnterAnotherName => names::ENTER_ANOTHER_NAME,
            Self::ConfirmDraftName => names::CONFIRM_DRAFT_NAME,
            Self::SelectDate(_) => names::SELECT_DATE,
            Self::DatePage(_) => names::DATE_PAGE,
            Self::SelectDateAsap => names::SELECT_DATE_ASAP,
            Self::SelectHour(_) => names::SELECT_HOUR,
            Self::SelectTime { .. } => names::SELECT_TIME,
            Self::UseProfilePhone => names::USE_PROFILE_PHONE,
            Self::ConfirmDraftPhone => names::CONFIRM_DRAFT_PHONE,
            Self::ChangePhone => names::CHANGE_PHONE,
            Self::SendLocationPrompt => names::SEND_LOCATION_PROMPT,
            Self::SkipMedia => names::SKIP_MEDIA,
            Self::FinishMedia => names::FINISH_MEDIA,
            Self::ResetMedia => names::RESET_MEDIA,
            Self::ViewMedia => names::VIEW_MEDIA,
            Self::Payment(PaymentPreference::Now) => names::PAYMENT_NOW,
            Self::Payment(PaymentPreference::Later) => names::PAYMENT_LATER,
            Self::ConfirmOrder(_) => names::CONFIRM_ORDER,
            Self::StaffSetCost(_) => names::STAFF_SET_COST,
            Self::StaffSkipCost(_) => names::STAFF_SKIP_COST,
            Self::StaffConfirmSimple(_) => names::STAFF_CONFIRM_SIMPLE,
            Self::StaffSkipAssign(_) => names::STAFF_SKIP_ASSIGN,
            Self::StaffFinalize(_) => names::STAFF_FINALIZE,
            Self::EditOrder(_) => names::EDIT_ORDER,
            Self::EditField { .. } => names::EDIT_FIELD,
            Self::MyOrders(_) => names::MY_ORDERS,
            Self::ManageOrders => names::MANAGE_ORDERS,
            Self::OrdersByStatus { .. } => names::ORDERS_BY_STATUS,
            Self::ViewOrder(_) => names::VIEW_ORDER,
            Self::SetCost(_) => names::SET_COST,
            Self::AcceptCost(_) => names::ACCEPT_COST,
            Self::RejectCost(_) => names::REJECT_COST,
            Self::CancelOrder(_) => names::CANCEL_ORDER,
            Self::CancelOrderOperator(_) => names::CANCEL_ORDER_OPERATOR,
            Self::PayOrder(_) => names::PAY_ORDER,
            Self::AssignExecutor {
                role: ExecutorRole::Driver,
                ..
            } => names::ASSIGN_DRIVER,
            Self::AssignExecutor {
                role: ExecutorRole::Loader,
                ..
            } => names::ASSIGN_LOADER,
            Self::UnassignExecutor { .. } => names::UNASSIGN_EXECUTOR,
            Self::AssignExecutors(_) => names::ASSIGN_EXECUTORS,
            Self::MarkDone(_) => names::MARK_DONE,
            Self::SetFinalCost(_) => names::SET_FINAL_COST,
            Self::MarkCalculated(_) => names::MARK_CALCULATED,
            Self::MarkSettled(_) => names::MARK_SETTLED,
            Self::ResumeOrder(_) => names::RESUME_ORDER,
        }
    }

    /// Commands that only make sense inside an order-entry flow.
    pub fn is_wizard_input(&self) -> bool {
        matches!(
            self,
            Self::Category(_)
                | Self::Subcategory(_)
                | Self::SkipDescription
                | Self::UseProfileName
                | Self::EnterAnotherName
                | Self::ConfirmDraftName
                | Self::SelectDate(_)
                | Self::DatePage(_)
                | Self::SelectDateAsap
                | Self::SelectHour(_)
                | Self::SelectTime { .. }
                | Self::UseProfilePhone
                | Self::ConfirmDraftPhone
                | Self::ChangePhone
                | Self::SkipMedia
                | Self::FinishMedia
                | Self::ResetMedia
                | Self::Payment(_)
        )
    }
}
