use super::command::Command;
use crate::orders::{
    Category, EditableField, ExecutorRole, OrderStatus, PaymentPreference, Role, Subcategory,
};
use crate::session::ChatState;
use crate::shared::{ChatId, OrderId};
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    OrderId,
    ChatId,
    Number,
    Date,
    /// Free-form slug; may itself contain `_`. At most one per command.
    Text,
}

impl ArgKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OrderId => "order id",
            Self::ChatId => "chat id",
            Self::Number => "number",
            Self::Date => "date",
            Self::Text => "text",
        }
    }
}

/// A decoded positional argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Order(OrderId),
    Chat(ChatId),
    Number(u32),
    Date(NaiveDate),
    Text(String),
}

/// Minimum role needed before a command may run at all. Finer ownership
/// checks happen in the lifecycle manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Anyone,
    Staff,
    StaffCreator,
    OperatorOrHigher,
}

impl Gate {
    pub fn allows(self, role: Role) -> bool {
        match self {
            Self::Anyone => true,
            Self::Staff => role.level() >= Role::Driver.level(),
            Self::StaffCreator => role.is_staff_creator(),
            Self::OperatorOrHigher => role.is_operator_or_higher(),
        }
    }
}

pub type CommandBuilder = fn(&[Arg]) -> Result<Command, String>;

#[derive(Debug, Clone, Copy)]
pub struct CommandDef {
    pub name: &'static str,
    pub args: &'static [ArgKind],
    pub gate: Gate,
    pub description: &'static str,
    pub build: CommandBuilder,
}

impl CommandDef {
    /// Token shape with placeholders, e.g. `assign_driver_<order id>_<chat id>`.
    pub fn usage(&self) -> String {
        let mut out = self.name.to_string();
        for kind in self.args {
            out.push_str(&format!("_<{}>", kind.as_str()));
        }
        out
    }
}

pub mod names {
    pub const START: &str = "start";
    pub const MAIN_MENU: &str = "main_menu";
    pub const NOOP: &str = "noop";
    pub const BACK: &str = "back";
    pub const BACK_TO: &str = "back_to";
    pub const CANCEL_FLOW: &str = "cancel_flow";
    pub const CANCEL_FLOW_CONFIRMED: &str = "cancel_flow_confirmed";
    pub const NEW_ORDER: &str = "new_order";
    pub const STAFF_NEW_ORDER: &str = "staff_new_order";
    pub const CATEGORY: &str = "category";
    pub const SUBCATEGORY: &str = "subcategory";
    pub const SKIP_DESCRIPTION: &str = "skip_description";
    pub const USE_PROFILE_NAME: &str = "use_profile_name";
    pub const ENTER_ANOTHER_NAME: &str = "enter_another_name";
    pub const CONFIRM_DRAFT_NAME: &str = "confirm_draft_name";
    pub const SELECT_DATE: &str = "select_date";
    pub const DATE_PAGE: &str = "date_page";
    pub const SELECT_DATE_ASAP: &str = "select_date_asap";
    pub const SELECT_HOUR: &str = "select_hour";
    pub const SELECT_TIME: &str = "select_time";
    pub const USE_PROFILE_PHONE: &str = "use_profile_phone";
    pub const CONFIRM_DRAFT_PHONE: &str = "confirm_draft_phone";
    pub const CHANGE_PHONE: &str = "change_phone";
    pub const SEND_LOCATION_PROMPT: &str = "send_location_prompt";
    pub const SKIP_MEDIA: &str = "skip_media";
    pub const FINISH_MEDIA: &str = "finish_media";
    pub const RESET_MEDIA: &str = "reset_media";
    pub const VIEW_MEDIA: &str = "view_media";
    pub const PAYMENT_NOW: &str = "payment_now";
    pub const PAYMENT_LATER: &str = "payment_later";
    pub const CONFIRM_ORDER: &str = "confirm_order";
    pub const STAFF_SET_COST: &str = "staff_set_cost";
    pub const STAFF_SKIP_COST: &str = "staff_skip_cost";
    pub const STAFF_CONFIRM_SIMPLE: &str = "staff_confirm_simple";
    pub const STAFF_SKIP_ASSIGN: &str = "staff_skip_assign";
    pub const STAFF_FINALIZE: &str = "staff_finalize";
    pub const EDIT_ORDER: &str = "edit_order";
    pub const EDIT_FIELD: &str = "edit_field";
    pub const MY_ORDERS: &str = "my_orders";
    pub const MANAGE_ORDERS: &str = "manage_orders";
    pub const ORDERS_BY_STATUS: &str = "orders_by_status";
    pub const VIEW_ORDER: &str = "view_order";
    pub const SET_COST: &str = "set_cost";
    pub const ACCEPT_COST: &str = "accept_cost";
    pub const REJECT_COST: &str = "reject_cost";
    pub const CANCEL_ORDER: &str = "cancel_order";
    pub const CANCEL_ORDER_OPERATOR: &str = "cancel_order_operator";
    pub const PAY_ORDER: &str = "pay_order";
    pub const ASSIGN_DRIVER: &str = "assign_driver";
    pub const ASSIGN_LOADER: &str = "assign_loader";
    pub const UNASSIGN_EXECUTOR: &str = "unassign_executor";
    pub const ASSIGN_EXECUTORS: &str = "assign_executors";
    pub const MARK_DONE: &str = "mark_done";
    pub const SET_FINAL_COST: &str = "set_final_cost";
    pub const MARK_CALCULATED: &str = "mark_calculated";
    pub const MARK_SETTLED: &str = "mark_settled";
    pub const RESUME_ORDER: &str = "resume_order";
    pub const CONTACT_OPERATOR: &str = "contact_operator";
    pub const REQUEST_CALLBACK: &str = "request_callback";
    pub const CONTACT_CHAT: &str = "contact_chat";
}

/// Joins a command name and its arguments into a token.
pub fn token(name: &str, args: &[&dyn std::fmt::Display]) -> String {
    let mut out = name.to_string();
    for arg in args {
        out.push('_');
        out.push_str(&arg.to_string());
    }
    out
}

const ORDER: &[ArgKind] = &[ArgKind::OrderId];
const ORDER_AND_CHAT: &[ArgKind] = &[ArgKind::OrderId, ArgKind::ChatId];

macro_rules! simple {
    ($name:expr, $gate:expr, $description:expr, $command:expr) => {
        CommandDef {
            name: $name,
            args: &[],
            gate: $gate,
            description: $description,
            build: |_| Ok($command),
        }
    };
}

macro_rules! order_command {
    ($name:expr, $gate:expr, $description:expr, $variant:path) => {
        CommandDef {
            name: $name,
            args: ORDER,
            gate: $gate,
            description: $description,
            build: |args| order_arg(args, 0).map($variant),
        }
    };
}

pub const COMMANDS: &[CommandDef] = &[
    simple!(names::START, Gate::Anyone, "Reset the chat and show the main menu", Command::Start),
    simple!(names::MAIN_MENU, Gate::Anyone, "Show the main menu", Command::MainMenu),
    simple!(names::NOOP, Gate::Anyone, "Inert label button", Command::Noop),
    simple!(names::BACK, Gate::Anyone, "Return to the previous step", Command::Back),
    CommandDef {
        name: names::BACK_TO,
        args: &[ArgKind::Text],
        gate: Gate::Anyone,
        description: "Return to a named step",
        build: |args| text_arg(args, 0).and_then(ChatState::parse).map(Command::BackTo),
    },
    simple!(
        names::CANCEL_FLOW,
        Gate::Anyone,
        "Ask to abandon the current flow",
        Command::CancelFlow
    ),
    simple!(
        names::CANCEL_FLOW_CONFIRMED,
        Gate::Anyone,
        "Abandon the current flow",
        Command::CancelFlowConfirmed
    ),
    simple!(names::NEW_ORDER, Gate::Anyone, "Start a new order", Command::NewOrder),
    simple!(
        names::CONTACT_OPERATOR,
        Gate::Anyone,
        "Ways to reach an operator",
        Command::ContactOperator
    ),
    simple!(
        names::REQUEST_CALLBACK,
        Gate::Anyone,
        "Ask an operator to call back",
        Command::RequestCallback
    ),
    simple!(
        names::CONTACT_CHAT,
        Gate::Anyone,
        "Write a message to the operators",
        Command::ContactChat
    ),
    simple!(
        names::STAFF_NEW_ORDER,
        Gate::StaffCreator,
        "Start an order on behalf of a customer",
        Command::StaffNewOrder
    ),
    CommandDef {
        name: names::CATEGORY,
        args: &[ArgKind::Text],
        gate: Gate::Anyone,
        description: "Choose the service category",
        build: |args| text_arg(args, 0).and_then(Category::parse).map(Command::Category),
    },
    CommandDef {
        name: names::SUBCATEGORY,
        args: &[ArgKind::Text],
        gate: Gate::Anyone,
        description: "Choose the subcategory",
        build: |args| {
            text_arg(args, 0)
                .and_then(Subcategory::parse)
                .map(Command::Subcategory)
        },
    },
    simple!(
        names::SKIP_DESCRIPTION,
        Gate::Anyone,
        "Leave the description empty",
        Command::SkipDescription
    ),
    simple!(names::USE_PROFILE_NAME, Gate::Anyone, "Use the profile name", Command::UseProfileName),
    simple!(
        names::ENTER_ANOTHER_NAME,
        Gate::Anyone,
        "Type a different name",
        Command::EnterAnotherName
    ),
    simple!(
        names::CONFIRM_DRAFT_NAME,
        Gate::Anyone,
        "Keep the name already entered",
        Command::ConfirmDraftName
    ),
    CommandDef {
        name: names::SELECT_DATE,
        args: &[ArgKind::Date],
        gate: Gate::Anyone,
        description: "Pick a calendar date",
        build: |args| match args.first() {
            Some(Arg::Date(date)) => Ok(Command::SelectDate(*date)),
            _ => Err("expected a date".to_string()),
        },
    },
    CommandDef {
        name: names::DATE_PAGE,
        args: &[ArgKind::Number],
        gate: Gate::Anyone,
        description: "Page through the date menu",
        build: |args| number_arg(args, 0).map(Command::DatePage),
    },
    simple!(names::SELECT_DATE_ASAP, Gate::Anyone, "As soon as possible", Command::SelectDateAsap),
    CommandDef {
        name: names::SELECT_HOUR,
        args: &[ArgKind::Number],
        gate: Gate::Anyone,
        description: "Pick the hour",
        build: |args| {
            let hour = number_arg(args, 0)?;
            if hour > 23 {
                return Err(format!("hour {hour} is out of range"));
            }
            Ok(Command::SelectHour(hour))
        },
    },
    CommandDef {
        name: names::SELECT_TIME,
        args: &[ArgKind::Text],
        gate: Gate::Anyone,
        description: "Pick the exact time",
        build: |args| {
            let raw = text_arg(args, 0)?;
            match crate::orders::RequestedTime::parse(raw)? {
                crate::orders::RequestedTime::At { hour, minute } => {
                    Ok(Command::SelectTime { hour, minute })
                }
                crate::orders::RequestedTime::Asap => Err("expected HH:MM".to_string()),
            }
        },
    },
    simple!(
        names::USE_PROFILE_PHONE,
        Gate::Anyone,
        "Use the profile phone",
        Command::UseProfilePhone
    ),
    simple!(
        names::CONFIRM_DRAFT_PHONE,
        Gate::Anyone,
        "Keep the phone already entered",
        Command::ConfirmDraftPhone
    ),
    simple!(names::CHANGE_PHONE, Gate::Anyone, "Type a different phone", Command::ChangePhone),
    simple!(
        names::SEND_LOCATION_PROMPT,
        Gate::Anyone,
        "Ask for a shared location",
        Command::SendLocationPrompt
    ),
    simple!(names::SKIP_MEDIA, Gate::Anyone, "Continue without media", Command::SkipMedia),
    simple!(names::FINISH_MEDIA, Gate::Anyone, "Done uploading media", Command::FinishMedia),
    simple!(names::RESET_MEDIA, Gate::Anyone, "Remove uploaded media", Command::ResetMedia),
    simple!(names::VIEW_MEDIA, Gate::Anyone, "Preview uploaded media", Command::ViewMedia),
    simple!(
        names::PAYMENT_NOW,
        Gate::Anyone,
        "Pay online after pricing",
        Command::Payment(PaymentPreference::Now)
    ),
    simple!(
        names::PAYMENT_LATER,
        Gate::Anyone,
        "Pay on completion",
        Command::Payment(PaymentPreference::Later)
    ),
    order_command!(names::CONFIRM_ORDER, Gate::Anyone, "Submit the order", Command::ConfirmOrder),
    order_command!(
        names::STAFF_SET_COST,
        Gate::StaffCreator,
        "Enter a price while creating",
        Command::StaffSetCost
    ),
    order_command!(
        names::STAFF_SKIP_COST,
        Gate::StaffCreator,
        "Continue to executors without a price",
        Command::StaffSkipCost
    ),
    order_command!(
        names::STAFF_CONFIRM_SIMPLE,
        Gate::StaffCreator,
        "Submit for regular pricing",
        Command::StaffConfirmSimple
    ),
    order_command!(
        names::STAFF_SKIP_ASSIGN,
        Gate::StaffCreator,
        "Continue without executors",
        Command::StaffSkipAssign
    ),
    order_command!(
        names::STAFF_FINALIZE,
        Gate::StaffCreator,
        "Start work on the order",
        Command::StaffFinalize
    ),
    order_command!(names::EDIT_ORDER, Gate::Anyone, "Open the edit menu", Command::EditOrder),
    CommandDef {
        name: names::EDIT_FIELD,
        args: &[ArgKind::Text, ArgKind::OrderId],
        gate: Gate::Anyone,
        description: "Edit one field",
        build: |args| {
            let field = text_arg(args, 0).and_then(EditableField::parse)?;
            let order_id = order_arg(args, 1)?;
            Ok(Command::EditField { field, order_id })
        },
    },
    CommandDef {
        name: names::MY_ORDERS,
        args: &[ArgKind::Number],
        gate: Gate::Anyone,
        description: "List own orders",
        build: |args| number_arg(args, 0).map(Command::MyOrders),
    },
    simple!(
        names::MANAGE_ORDERS,
        Gate::OperatorOrHigher,
        "Order management menu",
        Command::ManageOrders
    ),
    CommandDef {
        name: names::ORDERS_BY_STATUS,
        args: &[ArgKind::Text, ArgKind::Number],
        gate: Gate::OperatorOrHigher,
        description: "List orders in one status",
        build: |args| {
            let status = text_arg(args, 0).and_then(OrderStatus::parse)?;
            let page = number_arg(args, 1)?;
            Ok(Command::OrdersByStatus { status, page })
        },
    },
    order_command!(names::VIEW_ORDER, Gate::Anyone, "Show order details", Command::ViewOrder),
    order_command!(names::SET_COST, Gate::OperatorOrHigher, "Price the order", Command::SetCost),
    order_command!(names::ACCEPT_COST, Gate::Anyone, "Accept the price", Command::AcceptCost),
    order_command!(names::REJECT_COST, Gate::Anyone, "Reject the price", Command::RejectCost),
    order_command!(names::CANCEL_ORDER, Gate::Anyone, "Cancel own order", Command::CancelOrder),
    order_command!(
        names::CANCEL_ORDER_OPERATOR,
        Gate::OperatorOrHigher,
        "Cancel any active order",
        Command::CancelOrderOperator
    ),
    order_command!(names::PAY_ORDER, Gate::Anyone, "Get a payment link", Command::PayOrder),
    CommandDef {
        name: names::ASSIGN_DRIVER,
        args: ORDER_AND_CHAT,
        gate: Gate::StaffCreator,
        description: "Assign a driver",
        build: |args| executor_command(args, ExecutorRole::Driver),
    },
    CommandDef {
        name: names::ASSIGN_LOADER,
        args: ORDER_AND_CHAT,
        gate: Gate::StaffCreator,
        description: "Assign a loader",
        build: |args| executor_command(args, ExecutorRole::Loader),
    },
    CommandDef {
        name: names::UNASSIGN_EXECUTOR,
        args: ORDER_AND_CHAT,
        gate: Gate::StaffCreator,
        description: "Remove an executor",
        build: |args| {
            Ok(Command::UnassignExecutor {
                order_id: order_arg(args, 0)?,
                executor: chat_arg(args, 1)?,
            })
        },
    },
    order_command!(
        names::ASSIGN_EXECUTORS,
        Gate::StaffCreator,
        "Executor assignment menu",
        Command::AssignExecutors
    ),
    order_command!(names::MARK_DONE, Gate::Staff, "Mark the work as done", Command::MarkDone),
    order_command!(
        names::SET_FINAL_COST,
        Gate::OperatorOrHigher,
        "Correct the final price",
        Command::SetFinalCost
    ),
    order_command!(
        names::MARK_CALCULATED,
        Gate::OperatorOrHigher,
        "Mark expenses as calculated",
        Command::MarkCalculated
    ),
    order_command!(
        names::MARK_SETTLED,
        Gate::OperatorOrHigher,
        "Mark the order as settled",
        Command::MarkSettled
    ),
    order_command!(
        names::RESUME_ORDER,
        Gate::OperatorOrHigher,
        "Resume a canceled order",
        Command::ResumeOrder
    ),
];

pub fn command_def(name: &str) -> Option<&'static CommandDef> {
    COMMANDS.iter().find(|def| def.name == name)
}

/// Reference for typed tokens: every command, or just `name`.
pub fn command_help(name: Option<&str>) -> Result<String, String> {
    let line = |def: &CommandDef| format!("{:<44} {}", def.usage(), def.description);
    match name {
        Some(name) => command_def(name)
            .map(line)
            .ok_or_else(|| format!("no command named `{name}`")),
        None => Ok(COMMANDS.iter().map(line).collect::<Vec<_>>().join("\n")),
    }
}

fn order_arg(args: &[Arg], index: usize) -> Result<OrderId, String> {
    match args.get(index) {
        Some(Arg::Order(id)) => Ok(*id),
        _ => Err(format!("argument {} must be an order id", index + 1)),
    }
}

fn chat_arg(args: &[Arg], index: usize) -> Result<ChatId, String> {
    match args.get(index) {
        Some(Arg::Chat(id)) => Ok(*id),
        _ => Err(format!("argument {} must be a chat id", index + 1)),
    }
}

fn number_arg(args: &[Arg], index: usize) -> Result<u32, String> {
    match args.get(index) {
        Some(Arg::Number(value)) => Ok(*value),
        _ => Err(format!("argument {} must be a number", index + 1)),
    }
}

fn text_arg(args: &[Arg], index: usize) -> Result<&str, String> {
    match args.get(index) {
        Some(Arg::Text(value)) => Ok(value.as_str()),
        _ => Err(format!("argument {} must be text", index + 1)),
    }
}

fn executor_command(args: &[Arg], role: ExecutorRole) -> Result<Command, String> {
    Ok(Command::AssignExecutor {
        order_id: order_arg(args, 0)?,
        executor: chat_arg(args, 1)?,
        role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn command_names_are_unique() {
        let mut seen = BTreeSet::new();
        for def in COMMANDS {
            assert!(seen.insert(def.name), "duplicate command {}", def.name);
        }
    }

    #[test]
    fn every_command_takes_at_most_one_text_argument() {
        for def in COMMANDS {
            let text_args = def.args.iter().filter(|k| **k == ArgKind::Text).count();
            assert!(text_args <= 1, "{} has {text_args} text args", def.name);
        }
    }

    #[test]
    fn gates_follow_role_hierarchy() {
        assert!(Gate::OperatorOrHigher.allows(Role::Owner));
        assert!(!Gate::OperatorOrHigher.allows(Role::Driver));
        assert!(Gate::StaffCreator.allows(Role::Driver));
        assert!(!Gate::StaffCreator.allows(Role::Loader));
        assert!(Gate::Staff.allows(Role::Loader));
        assert!(!Gate::Staff.allows(Role::Customer));
    }

    #[test]
    fn help_lists_usage_and_description() {
        let help = command_help(Some(names::ASSIGN_DRIVER)).expect("known command");
        assert!(help.starts_with("assign_driver_<order id>_<chat id>"));
        assert!(help.ends_with("Assign a driver"));

        let all = command_help(None).expect("full help");
        assert_eq!(all.lines().count(), COMMANDS.len());
        assert!(command_help(Some("launch_rockets")).is_err());
    }

    #[test]
    fn token_joins_arguments_with_separator() {
        assert_eq!(token(names::VIEW_ORDER, &[&12]), "view_order_12");
        assert_eq!(
            token(names::ORDERS_BY_STATUS, &[&"awaiting_cost", &0]),
            "orders_by_status_awaiting_cost_0"
        );
        assert_eq!(token(names::MAIN_MENU, &[]), "main_menu");
    }
}
