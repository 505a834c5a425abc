pub mod error;
pub mod format;
pub mod lifecycle;
pub mod model;
pub mod repository;
pub mod validate;

pub use error::RepositoryError;
pub use lifecycle::{LifecycleError, OrderLifecycle, PaymentOutcome};
pub use model::{
    Actor, Address, Category, EditableField, Executor, ExecutorRole, FieldUpdate, GeoPoint,
    MediaItem, MediaKind, Order, OrderStatus, PaymentPreference, RequestedDate, RequestedTime,
    Role, Subcategory, UserProfile, ALL_CATEGORIES, ALL_EDITABLE_FIELDS, ALL_ORDER_STATUSES,
    ASAP_MARKER, PAYMENT_EDITABLE_STATUSES,
};
pub use repository::{OrderPage, OrderRepository, SqliteOrderStore, StatusGuard, UserDirectory};
