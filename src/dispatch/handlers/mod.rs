use super::command::Command;
use super::error::FlowError;
use super::{views, Reply, Services, Turn};
use crate::channels::Screen;
use crate::orders::{Actor, MediaItem, Order, Role, UserProfile};
use crate::session::{ChatState, Session};
use crate::shared::OrderId;
use crate::wizard::{self, StepContext, StepInput};

pub mod contact;
pub mod creation;
pub mod editing;
pub mod manage;
pub mod navigation;
pub mod staff;

/// Everything a handler may touch besides the session it was handed.
pub struct HandlerContext<'a> {
    pub services: &'a Services,
    pub turn: Turn,
}

impl<'a> HandlerContext<'a> {
    pub fn new(services: &'a Services, turn: Turn) -> Self {
        Self { services, turn }
    }

    pub fn actor(&self) -> Actor {
        self.turn.actor
    }

    /// Stored profile of the acting chat. A lookup failure only costs the
    /// profile shortcuts, so it is logged and treated as absent.
    pub fn profile(&self) -> Option<UserProfile> {
        match self.services.users.find_user(self.turn.chat) {
            Ok(profile) => profile,
            Err(err) => {
                self.services.log.warn(
                    "dispatch.failed",
                    &format!("chat={} profile lookup failed: {err}", self.turn.chat),
                );
                None
            }
        }
    }

    pub fn step_context<'p>(&'p self, profile: Option<&'p UserProfile>) -> StepContext<'p> {
        StepContext {
            now: self.turn.now,
            profile,
            business: &self.services.business,
        }
    }

    /// Loads an order the actor is allowed to see.
    pub fn load_visible(&self, id: OrderId) -> Result<Order, FlowError> {
        let order = self.services.orders.load(id)?;
        if !views::may_view(self.actor(), &order) {
            return Err(FlowError::NotYourOrder { order_id: id });
        }
        Ok(order)
    }

    pub fn per_page(&self) -> u32 {
        self.services.business.orders_per_page
    }
}

pub fn run_command(
    cx: &HandlerContext<'_>,
    session: &mut Session,
    command: Command,
) -> Result<Reply, FlowError> {
    match command {
        Command::Start => navigation::start(cx, session),
        Command::MainMenu => navigation::main_menu(cx, session),
        Command::Noop => Ok(Reply::Unchanged),
        Command::Back => navigation::back(cx, session),
        Command::BackTo(state) => navigation::back_to(cx, session, state),
        Command::CancelFlow => navigation::cancel_flow(cx, session),
        Command::CancelFlowConfirmed => navigation::cancel_flow_confirmed(cx, session),

        Command::NewOrder => creation::new_order(cx, session, false),
        Command::StaffNewOrder => creation::new_order(cx, session, true),
        Command::ContactOperator => contact::contact_menu(cx, session),
        Command::RequestCallback => contact::request_callback(cx, session),
        Command::ContactChat => contact::write_message(session),
        Command::Category(category) => {
            creation::wizard_input(cx, session, StepInput::Category(category))
        }
        Command::Subcategory(sub) => {
            creation::wizard_input(cx, session, StepInput::Subcategory(sub))
        }
        Command::SkipDescription => {
            creation::wizard_input(cx, session, StepInput::SkipDescription)
        }
        Command::UseProfileName => creation::wizard_input(cx, session, StepInput::UseProfileName),
        Command::EnterAnotherName | Command::ChangePhone => {
            creation::wizard_input(cx, session, StepInput::TypeManually)
        }
        Command::ConfirmDraftName => {
            creation::wizard_input(cx, session, StepInput::ConfirmDraftName)
        }
        Command::SelectDate(date) => creation::wizard_input(cx, session, StepInput::Date(date)),
        Command::DatePage(page) => creation::wizard_input(cx, session, StepInput::DatePage(page)),
        Command::SelectDateAsap => creation::wizard_input(cx, session, StepInput::DateAsap),
        Command::SelectHour(hour) => creation::wizard_input(cx, session, StepInput::Hour(hour)),
        Command::SelectTime { hour, minute } => {
            creation::wizard_input(cx, session, StepInput::Time { hour, minute })
        }
        Command::UseProfilePhone => creation::wizard_input(cx, session, StepInput::UseProfilePhone),
        Command::ConfirmDraftPhone => {
            creation::wizard_input(cx, session, StepInput::ConfirmDraftPhone)
        }
        Command::SendLocationPrompt => creation::send_location_prompt(cx, session),
        Command::SkipMedia => creation::wizard_input(cx, session, StepInput::SkipMedia),
        Command::FinishMedia => creation::wizard_input(cx, session, StepInput::FinishMedia),
        Command::ResetMedia => creation::wizard_input(cx, session, StepInput::ResetMedia),
        Command::ViewMedia => creation::view_media(cx, session),
        Command::Payment(payment) => {
            creation::wizard_input(cx, session, StepInput::Payment(payment))
        }
        Command::ConfirmOrder(id) => creation::confirm_order(cx, session, id),

        Command::StaffSetCost(id) => staff::set_cost(session, id),
        Command::StaffSkipCost(id) => staff::skip_cost(cx, session, id),
        Command::StaffConfirmSimple(id) => staff::confirm_simple(cx, session, id),
        Command::StaffSkipAssign(id) | Command::StaffFinalize(id) => {
            staff::finalize(cx, session, id)
        }

        Command::EditOrder(id) => editing::edit_order(cx, session, id),
        Command::EditField { field, order_id } => {
            editing::edit_field(cx, session, field, order_id)
        }

        Command::MyOrders(page) => manage::my_orders(cx, session, page),
        Command::ManageOrders => manage::manage_orders(session),
        Command::OrdersByStatus { status, page } => {
            manage::orders_by_status(cx, session, status, page)
        }
        Command::ViewOrder(id) => manage::view_order(cx, session, id),
        Command::SetCost(id) => manage::set_cost(cx, session, id),
        Command::AcceptCost(id) => manage::accept_cost(cx, session, id),
        Command::RejectCost(id) => manage::reject_cost(cx, session, id),
        Command::CancelOrder(id) => manage::cancel_order(cx, session, id),
        Command::CancelOrderOperator(id) => manage::cancel_order_operator(cx, session, id),
        Command::PayOrder(id) => manage::pay_order(cx, id),
        Command::AssignExecutor {
            order_id,
            executor,
            role,
        } => manage::assign_executor(cx, session, order_id, executor, role),
        Command::UnassignExecutor { order_id, executor } => {
            manage::unassign_executor(cx, session, order_id, executor)
        }
        Command::AssignExecutors(id) => manage::executor_menu(cx, id),
        Command::MarkDone(id) => manage::mark_done(cx, session, id),
        Command::SetFinalCost(id) => manage::set_final_cost(cx, session, id),
        Command::MarkCalculated(id) => manage::mark_calculated(cx, session, id),
        Command::MarkSettled(id) => manage::mark_settled(cx, session, id),
        Command::ResumeOrder(id) => manage::resume(cx, session, id),
    }
}

/// Free text is interpreted by whatever the chat is currently waiting for.
pub fn on_text(
    cx: &HandlerContext<'_>,
    session: &mut Session,
    text: &str,
) -> Result<Reply, FlowError> {
    match session.state {
        state if state.is_wizard_step() => {
            creation::wizard_input(cx, session, StepInput::Text(text.to_string()))
        }
        ChatState::ReasonInput => manage::reason_text(cx, session, text),
        ChatState::CostInput => manage::cost_text(cx, session, text),
        ChatState::FinalCostInput => manage::final_cost_text(cx, session, text),
        ChatState::StaffCostInput => staff::cost_text(cx, session, text),
        ChatState::CallbackPhoneInput => contact::callback_phone_text(cx, session, text),
        ChatState::OperatorMessageInput => contact::message_text(cx, session, text),
        _ => Err(FlowError::Format("Please use the buttons below.".to_string())),
    }
}

pub fn on_location(
    cx: &HandlerContext<'_>,
    session: &mut Session,
    latitude: f64,
    longitude: f64,
) -> Result<Reply, FlowError> {
    creation::wizard_input(
        cx,
        session,
        StepInput::Location {
            latitude,
            longitude,
        },
    )
}

pub fn on_media(
    cx: &HandlerContext<'_>,
    session: &mut Session,
    item: MediaItem,
) -> Result<Reply, FlowError> {
    creation::wizard_input(cx, session, StepInput::Media(item))
}

/// Screen for whatever state the session is in, used after navigation and
/// when re-prompting after bad input.
pub fn state_screen(cx: &HandlerContext<'_>, session: &Session) -> Result<Screen, FlowError> {
    let draft = &session.draft;
    let screen = match session.state {
        ChatState::Idle => {
            let profile = cx.profile();
            views::main_menu(
                cx.actor(),
                profile.as_ref().and_then(|p| p.first_name.as_deref()),
            )
        }
        state if state.is_wizard_step() || state == ChatState::Confirm => {
            let profile = cx.profile();
            wizard::prompt(session, &cx.step_context(profile.as_ref()))
        }
        ChatState::EditMenu => views::edit_menu(&draft.order),
        ChatState::ReasonInput => match draft.pending_reason {
            Some(pending) => views::reason_prompt(pending.kind, pending.order_id),
            None => views::main_menu(cx.actor(), None),
        },
        ChatState::CostInput => views::cost_prompt(&draft.order),
        ChatState::FinalCostInput => views::final_cost_prompt(&draft.order),
        ChatState::StaffConfirmOptions => views::staff_confirm_options(&draft.order),
        ChatState::StaffCostInput => views::staff_cost_prompt(),
        ChatState::StaffAssignExecutors => staff::executor_screen(cx, session)?,
        ChatState::CallbackPhoneInput => {
            let profile = cx.profile();
            views::callback_prompt(profile.as_ref().and_then(|p| p.phone.as_deref()))
        }
        ChatState::OperatorMessageInput => views::operator_message_prompt(),
        _ => views::main_menu(cx.actor(), None),
    };
    Ok(screen)
}

/// Drivers and loaders that can be put on an order.
pub(crate) fn executor_candidates(cx: &HandlerContext<'_>) -> Result<Vec<UserProfile>, FlowError> {
    Ok(cx
        .services
        .users
        .list_by_roles(&[Role::Driver, Role::Loader])?)
}
