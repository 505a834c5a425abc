use crate::shared::serde_ext::parse_via_string;
use crate::shared::{ChatId, OrderId};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Marker stored for both date and time when the customer asks for the
/// earliest possible visit.
pub const ASAP_MARKER: &str = "ASAP";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Draft,
    New,
    AwaitingCost,
    AwaitingConfirmation,
    AwaitingPayment,
    InProgress,
    Completed,
    Calculated,
    Settled,
    Canceled,
}

pub const ALL_ORDER_STATUSES: [OrderStatus; 10] = [
    OrderStatus::Draft,
    OrderStatus::New,
    OrderStatus::AwaitingCost,
    OrderStatus::AwaitingConfirmation,
    OrderStatus::AwaitingPayment,
    OrderStatus::InProgress,
    OrderStatus::Completed,
    OrderStatus::Calculated,
    OrderStatus::Settled,
    OrderStatus::Canceled,
];

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::New => "new",
            Self::AwaitingCost => "awaiting_cost",
            Self::AwaitingConfirmation => "awaiting_confirmation",
            Self::AwaitingPayment => "awaiting_payment",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Calculated => "calculated",
            Self::Settled => "settled",
            Self::Canceled => "canceled",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        let normalized = raw.trim().to_ascii_lowercase();
        ALL_ORDER_STATUSES
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| format!("unknown order status `{}`", raw.trim()))
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::New => "New",
            Self::AwaitingCost => "Awaiting cost",
            Self::AwaitingConfirmation => "Awaiting confirmation",
            Self::AwaitingPayment => "Awaiting payment",
            Self::InProgress => "In progress",
            Self::Completed => "Completed",
            Self::Calculated => "Calculated",
            Self::Settled => "Settled",
            Self::Canceled => "Canceled",
        }
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Draft, OrderStatus::New)
                | (OrderStatus::Draft, OrderStatus::InProgress)
                | (OrderStatus::Draft, OrderStatus::Canceled)
                | (OrderStatus::New, OrderStatus::AwaitingCost)
                | (OrderStatus::New, OrderStatus::AwaitingConfirmation)
                | (OrderStatus::New, OrderStatus::Canceled)
                | (OrderStatus::AwaitingCost, OrderStatus::AwaitingConfirmation)
                | (OrderStatus::AwaitingCost, OrderStatus::Canceled)
                | (
                    OrderStatus::AwaitingConfirmation,
                    OrderStatus::AwaitingConfirmation
                )
                | (OrderStatus::AwaitingConfirmation, OrderStatus::AwaitingPayment)
                | (OrderStatus::AwaitingConfirmation, OrderStatus::InProgress)
                | (OrderStatus::AwaitingConfirmation, OrderStatus::Canceled)
                | (OrderStatus::AwaitingPayment, OrderStatus::InProgress)
                | (OrderStatus::AwaitingPayment, OrderStatus::Canceled)
                | (OrderStatus::InProgress, OrderStatus::Completed)
                | (OrderStatus::InProgress, OrderStatus::Canceled)
                | (OrderStatus::Completed, OrderStatus::Calculated)
                | (OrderStatus::Calculated, OrderStatus::Settled)
                | (OrderStatus::Canceled, OrderStatus::New)
        )
    }

    /// Work is done; only bookkeeping transitions remain.
    pub fn is_final(self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Calculated | OrderStatus::Settled
        )
    }

    pub fn requires_cost(self) -> bool {
        matches!(
            self,
            OrderStatus::AwaitingConfirmation | OrderStatus::AwaitingPayment
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    WasteRemoval,
    Demolition,
    ConstructionMaterials,
    Other,
}

pub const ALL_CATEGORIES: [Category; 4] = [
    Category::WasteRemoval,
    Category::Demolition,
    Category::ConstructionMaterials,
    Category::Other,
];

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WasteRemoval => "waste_removal",
            Self::Demolition => "demolition",
            Self::ConstructionMaterials => "construction_materials",
            Self::Other => "other",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "waste_removal" | "waste" => Ok(Self::WasteRemoval),
            "demolition" => Ok(Self::Demolition),
            "construction_materials" | "materials" => Ok(Self::ConstructionMaterials),
            "other" => Ok(Self::Other),
            _ => Err(format!(
                "category must be one of: waste_removal, demolition, construction_materials, other (got `{}`)",
                raw.trim()
            )),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::WasteRemoval => "Waste removal",
            Self::Demolition => "Demolition",
            Self::ConstructionMaterials => "Construction materials",
            Self::Other => "Other services",
        }
    }

    pub fn subcategories(self) -> &'static [Subcategory] {
        match self {
            Self::WasteRemoval => &WASTE_SUBCATEGORIES,
            Self::Demolition => &DEMOLITION_SUBCATEGORIES,
            Self::ConstructionMaterials | Self::Other => &[],
        }
    }

    pub fn has_subcategories(self) -> bool {
        !self.subcategories().is_empty()
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Subcategory {
    Construction,
    Household,
    Metal,
    Junk,
    Greenery,
    Tires,
    OtherWaste,
    Walls,
    Partitions,
    Floors,
    Ceilings,
    Plumbing,
    Tiles,
    OtherDemolition,
}

const WASTE_SUBCATEGORIES: [Subcategory; 7] = [
    Subcategory::Construction,
    Subcategory::Household,
    Subcategory::Metal,
    Subcategory::Junk,
    Subcategory::Greenery,
    Subcategory::Tires,
    Subcategory::OtherWaste,
];

const DEMOLITION_SUBCATEGORIES: [Subcategory; 7] = [
    Subcategory::Walls,
    Subcategory::Partitions,
    Subcategory::Floors,
    Subcategory::Ceilings,
    Subcategory::Plumbing,
    Subcategory::Tiles,
    Subcategory::OtherDemolition,
];

impl Subcategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Construction => "construction",
            Self::Household => "household",
            Self::Metal => "metal",
            Self::Junk => "junk",
            Self::Greenery => "greenery",
            Self::Tires => "tires",
            Self::OtherWaste => "other_waste",
            Self::Walls => "walls",
            Self::Partitions => "partitions",
            Self::Floors => "floors",
            Self::Ceilings => "ceilings",
            Self::Plumbing => "plumbing",
            Self::Tiles => "tiles",
            Self::OtherDemolition => "other_demolition",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        let normalized = raw.trim().to_ascii_lowercase();
        WASTE_SUBCATEGORIES
            .iter()
            .chain(DEMOLITION_SUBCATEGORIES.iter())
            .copied()
            .find(|sub| sub.as_str() == normalized)
            .ok_or_else(|| format!("unknown subcategory `{}`", raw.trim()))
    }

    pub fn category(self) -> Category {
        if WASTE_SUBCATEGORIES.contains(&self) {
            Category::WasteRemoval
        } else {
            Category::Demolition
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Construction => "Construction debris",
            Self::Household => "Household waste",
            Self::Metal => "Scrap metal",
            Self::Junk => "Old furniture and junk",
            Self::Greenery => "Branches and greenery",
            Self::Tires => "Tires",
            Self::OtherWaste => "Other waste",
            Self::Walls => "Walls",
            Self::Partitions => "Partitions",
            Self::Floors => "Floors",
            Self::Ceilings => "Ceilings",
            Self::Plumbing => "Plumbing",
            Self::Tiles => "Tiles",
            Self::OtherDemolition => "Other demolition",
        }
    }
}

impl std::fmt::Display for Subcategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestedDate {
    Asap,
    On(NaiveDate),
}

impl RequestedDate {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed == ASAP_MARKER {
            return Ok(Self::Asap);
        }
        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .map(Self::On)
            .map_err(|_| format!("date must be YYYY-MM-DD or {ASAP_MARKER}, got `{trimmed}`"))
    }

    pub fn is_asap(self) -> bool {
        matches!(self, Self::Asap)
    }
}

impl std::fmt::Display for RequestedDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Asap => write!(f, "{ASAP_MARKER}"),
            Self::On(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

impl Serialize for RequestedDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RequestedDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        parse_via_string(deserializer, "requested date", Self::parse)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestedTime {
    Asap,
    At { hour: u32, minute: u32 },
}

impl RequestedTime {
    pub fn at(hour: u32, minute: u32) -> Result<Self, String> {
        if hour > 23 || minute > 59 {
            return Err(format!("time {hour:02}:{minute:02} is out of range"));
        }
        Ok(Self::At { hour, minute })
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed == ASAP_MARKER {
            return Ok(Self::Asap);
        }
        let (hour, minute) = trimmed
            .split_once(':')
            .ok_or_else(|| format!("time must be HH:MM, got `{trimmed}`"))?;
        let hour = hour
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("time must be HH:MM, got `{trimmed}`"))?;
        let minute = minute
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("time must be HH:MM, got `{trimmed}`"))?;
        Self::at(hour, minute)
    }
}

impl std::fmt::Display for RequestedTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Asap => write!(f, "{ASAP_MARKER}"),
            Self::At { hour, minute } => write!(f, "{hour:02}:{minute:02}"),
        }
    }
}

impl Serialize for RequestedTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RequestedTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        parse_via_string(deserializer, "requested time", Self::parse)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Address {
    pub text: String,
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

/// Text shown for addresses captured from a shared location.
pub const LOCATION_ADDRESS_TEXT: &str = "Shared location";

impl Address {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            location: None,
        }
    }

    pub fn location(point: GeoPoint) -> Self {
        Self {
            text: LOCATION_ADDRESS_TEXT.to_string(),
            location: Some(point),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MediaItem {
    pub kind: MediaKind,
    pub file_id: String,
    #[serde(default)]
    pub group_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentPreference {
    Now,
    Later,
}

impl PaymentPreference {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Now => "now",
            Self::Later => "later",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "now" => Ok(Self::Now),
            "later" => Ok(Self::Later),
            other => Err(format!("payment preference must be now or later, got `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Driver,
    Loader,
    Operator,
    MainOperator,
    Owner,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Driver => "driver",
            Self::Loader => "loader",
            Self::Operator => "operator",
            Self::MainOperator => "main_operator",
            Self::Owner => "owner",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "customer" | "user" => Ok(Self::Customer),
            "driver" => Ok(Self::Driver),
            "loader" => Ok(Self::Loader),
            "operator" => Ok(Self::Operator),
            "main_operator" => Ok(Self::MainOperator),
            "owner" => Ok(Self::Owner),
            other => Err(format!(
                "role must be one of: customer, driver, loader, operator, main_operator, owner (got `{other}`)"
            )),
        }
    }

    pub fn level(self) -> u8 {
        match self {
            Self::Customer => 0,
            Self::Driver | Self::Loader => 1,
            Self::Operator => 2,
            Self::MainOperator => 3,
            Self::Owner => 4,
        }
    }

    pub fn is_operator_or_higher(self) -> bool {
        self.level() >= Self::Operator.level()
    }

    /// Roles that may create orders on behalf of someone else.
    pub fn is_staff_creator(self) -> bool {
        self.is_operator_or_higher() || self == Self::Driver
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorRole {
    Driver,
    Loader,
}

impl ExecutorRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Driver => "driver",
            Self::Loader => "loader",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "driver" => Ok(Self::Driver),
            "loader" => Ok(Self::Loader),
            other => Err(format!("executor role must be driver or loader, got `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Executor {
    pub chat_id: ChatId,
    pub role: ExecutorRole,
    #[serde(default)]
    pub notified: bool,
}

/// Someone acting on the system in one unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub chat_id: ChatId,
    pub role: Role,
}

impl Actor {
    pub fn new(chat_id: ChatId, role: Role) -> Self {
        Self { chat_id, role }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserProfile {
    pub chat_id: ChatId,
    pub role: Role,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Order {
    #[serde(default)]
    pub id: Option<OrderId>,
    #[serde(default)]
    pub customer: Option<ChatId>,
    #[serde(default)]
    pub creator: Option<ChatId>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub subcategory: Option<Subcategory>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub date: Option<RequestedDate>,
    #[serde(default)]
    pub time: Option<RequestedTime>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub videos: Vec<String>,
    #[serde(default)]
    pub payment: Option<PaymentPreference>,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub reason: Option<String>,
    pub status: OrderStatus,
    #[serde(default)]
    pub executors: Vec<Executor>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl Default for Order {
    fn default() -> Self {
        Self::new_draft(None, None)
    }
}

impl Order {
    pub fn new_draft(customer: Option<ChatId>, creator: Option<ChatId>) -> Self {
        Self {
            id: None,
            customer,
            creator,
            category: None,
            subcategory: None,
            description: None,
            name: None,
            date: None,
            time: None,
            phone: None,
            address: None,
            photos: Vec::new(),
            videos: Vec::new(),
            payment: None,
            cost: None,
            reason: None,
            status: OrderStatus::Draft,
            executors: Vec::new(),
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn has_positive_cost(&self) -> bool {
        self.cost.is_some_and(|cost| cost > 0.0)
    }

    pub fn is_customer(&self, chat_id: ChatId) -> bool {
        self.customer == Some(chat_id)
    }

    pub fn assigned_driver(&self, chat_id: ChatId) -> bool {
        self.executors
            .iter()
            .any(|e| e.chat_id == chat_id && e.role == ExecutorRole::Driver)
    }

    /// Names of wizard-collected fields that are still empty.
    pub fn missing_required_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        match self.category {
            None => missing.push("category"),
            Some(category) if category.has_subcategories() && self.subcategory.is_none() => {
                missing.push("subcategory")
            }
            Some(_) => {}
        }
        if self.name.is_none() {
            missing.push("name");
        }
        if self.date.is_none() {
            missing.push("date");
        }
        if self.time.is_none() {
            missing.push("time");
        }
        if self.phone.is_none() {
            missing.push("phone");
        }
        if self.address.is_none() {
            missing.push("address");
        }
        if self.payment.is_none() {
            missing.push("payment");
        }
        missing
    }
}

/// Order fields that can be changed one at a time from the edit menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditableField {
    Category,
    Description,
    Name,
    Date,
    Time,
    Phone,
    Address,
    Media,
    Payment,
}

pub const ALL_EDITABLE_FIELDS: [EditableField; 9] = [
    EditableField::Category,
    EditableField::Description,
    EditableField::Name,
    EditableField::Date,
    EditableField::Time,
    EditableField::Phone,
    EditableField::Address,
    EditableField::Media,
    EditableField::Payment,
];

pub const PAYMENT_EDITABLE_STATUSES: [OrderStatus; 4] = [
    OrderStatus::Draft,
    OrderStatus::New,
    OrderStatus::AwaitingCost,
    OrderStatus::AwaitingConfirmation,
];

impl EditableField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Description => "description",
            Self::Name => "name",
            Self::Date => "date",
            Self::Time => "time",
            Self::Phone => "phone",
            Self::Address => "address",
            Self::Media => "media",
            Self::Payment => "payment",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        let normalized = raw.trim().to_ascii_lowercase();
        if normalized == "subcategory" {
            return Ok(Self::Category);
        }
        ALL_EDITABLE_FIELDS
            .into_iter()
            .find(|field| field.as_str() == normalized)
            .ok_or_else(|| format!("unknown editable field `{}`", raw.trim()))
    }

    /// Payment preference decides between `awaiting_payment` and
    /// `in_progress`, so it is frozen once the customer has accepted a cost.
    pub fn editable_in(self, status: OrderStatus) -> bool {
        match self {
            Self::Payment => PAYMENT_EDITABLE_STATUSES.contains(&status),
            _ => true,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Category => "Category",
            Self::Description => "Description",
            Self::Name => "Name",
            Self::Date => "Date",
            Self::Time => "Time",
            Self::Phone => "Phone",
            Self::Address => "Address",
            Self::Media => "Photos and videos",
            Self::Payment => "Payment",
        }
    }
}

/// A single persisted field change. Status, cost and reason are not
/// representable here; they only move through the lifecycle manager.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Category {
        category: Category,
        subcategory: Option<Subcategory>,
    },
    Description(Option<String>),
    Name(String),
    Schedule {
        date: RequestedDate,
        time: Option<RequestedTime>,
    },
    Phone(String),
    Address(Address),
    Media {
        photos: Vec<String>,
        videos: Vec<String>,
    },
    Payment(PaymentPreference),
}

impl FieldUpdate {
    /// Captures the current draft value of `field`; `None` while the draft
    /// has nothing to persist for it yet.
    pub fn capture(field: EditableField, order: &Order) -> Option<Self> {
        match field {
            EditableField::Category => order.category.map(|category| Self::Category {
                category,
                subcategory: order.subcategory,
            }),
            EditableField::Description => Some(Self::Description(order.description.clone())),
            EditableField::Name => order.name.clone().map(Self::Name),
            EditableField::Date | EditableField::Time => order.date.map(|date| Self::Schedule {
                date,
                time: order.time,
            }),
            EditableField::Phone => order.phone.clone().map(Self::Phone),
            EditableField::Address => order.address.clone().map(Self::Address),
            EditableField::Media => Some(Self::Media {
                photos: order.photos.clone(),
                videos: order.videos.clone(),
            }),
            EditableField::Payment => order.payment.map(Self::Payment),
        }
    }

    pub fn apply_to(&self, order: &mut Order) {
        match self {
            Self::Category {
                category,
                subcategory,
            } => {
                order.category = Some(*category);
                order.subcategory = *subcategory;
            }
            Self::Description(description) => order.description = description.clone(),
            Self::Name(name) => order.name = Some(name.clone()),
            Self::Schedule { date, time } => {
                order.date = Some(*date);
                order.time = *time;
            }
            Self::Phone(phone) => order.phone = Some(phone.clone()),
            Self::Address(address) => order.address = Some(address.clone()),
            Self::Media { photos, videos } => {
                order.photos = photos.clone();
                order.videos = videos.clone();
            }
            Self::Payment(payment) => order.payment = Some(*payment),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_as_str() {
        for status in ALL_ORDER_STATUSES {
            assert_eq!(OrderStatus::parse(status.as_str()), Ok(status));
        }
        assert!(OrderStatus::parse("archived").is_err());
    }

    #[test]
    fn status_graph_matches_lifecycle() {
        assert!(OrderStatus::Draft.can_transition_to(OrderStatus::New));
        assert!(OrderStatus::AwaitingConfirmation.can_transition_to(OrderStatus::AwaitingPayment));
        assert!(OrderStatus::AwaitingPayment.can_transition_to(OrderStatus::InProgress));
        assert!(OrderStatus::Canceled.can_transition_to(OrderStatus::New));
        assert!(!OrderStatus::InProgress.can_transition_to(OrderStatus::AwaitingConfirmation));
        assert!(!OrderStatus::Completed.can_transition_to(OrderStatus::Canceled));
        assert!(!OrderStatus::Settled.can_transition_to(OrderStatus::New));
    }

    #[test]
    fn subcategories_belong_to_their_category() {
        for category in ALL_CATEGORIES {
            for sub in category.subcategories() {
                assert_eq!(sub.category(), category);
                assert_eq!(Subcategory::parse(sub.as_str()), Ok(*sub));
            }
        }
        assert!(!Category::Other.has_subcategories());
        assert_eq!(Category::parse("waste"), Ok(Category::WasteRemoval));
    }

    #[test]
    fn requested_schedule_uses_asap_marker() {
        let encoded = serde_json::to_string(&RequestedDate::Asap).expect("encode");
        assert_eq!(encoded, "\"ASAP\"");
        let date: RequestedDate = serde_json::from_str("\"2026-03-04\"").expect("decode");
        assert_eq!(
            date,
            RequestedDate::On(NaiveDate::from_ymd_opt(2026, 3, 4).expect("date"))
        );
        assert_eq!(RequestedTime::parse("9:05"), Ok(RequestedTime::At { hour: 9, minute: 5 }));
        assert_eq!(
            RequestedTime::At { hour: 9, minute: 5 }.to_string(),
            "09:05".to_string()
        );
        assert!(RequestedTime::parse("25:00").is_err());
        assert!(serde_json::from_str::<RequestedTime>("\"noon\"").is_err());
    }

    #[test]
    fn role_hierarchy_gates() {
        assert!(Role::Owner.is_operator_or_higher());
        assert!(Role::MainOperator.is_operator_or_higher());
        assert!(!Role::Driver.is_operator_or_higher());
        assert!(Role::Driver.is_staff_creator());
        assert!(!Role::Loader.is_staff_creator());
        assert!(Role::Operator.level() > Role::Loader.level());
    }

    #[test]
    fn missing_fields_track_subcategory_requirement() {
        let mut order = Order::new_draft(Some(ChatId::new(1)), Some(ChatId::new(1)));
        order.category = Some(Category::Demolition);
        let missing = order.missing_required_fields();
        assert!(missing.contains(&"subcategory"));
        order.category = Some(Category::Other);
        assert!(!order.missing_required_fields().contains(&"subcategory"));
    }

    #[test]
    fn field_capture_applies_back_onto_order() {
        let mut draft = Order::default();
        draft.date = Some(RequestedDate::Asap);
        draft.time = Some(RequestedTime::Asap);
        let update = FieldUpdate::capture(EditableField::Time, &draft).expect("schedule");

        let mut stored = Order::default();
        update.apply_to(&mut stored);
        assert_eq!(stored.date, Some(RequestedDate::Asap));
        assert_eq!(stored.time, Some(RequestedTime::Asap));
        assert!(FieldUpdate::capture(EditableField::Name, &stored).is_none());
    }
}
