use super::error::RepositoryError;
use super::model::{
    Address, Category, Executor, ExecutorRole, FieldUpdate, GeoPoint, Order, OrderStatus,
    PaymentPreference, RequestedDate, RequestedTime, Role, Subcategory, UserProfile,
    PAYMENT_EDITABLE_STATUSES,
};
use crate::shared::time::now_secs;
use crate::shared::{ChatId, OrderId};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, TransactionBehavior};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Preconditions checked inside the same transaction as a status write.
#[derive(Debug, Clone, Copy)]
pub struct StatusGuard<'a> {
    pub allowed: &'a [OrderStatus],
    pub require_cost_unset: bool,
}

impl<'a> StatusGuard<'a> {
    pub fn allowing(allowed: &'a [OrderStatus]) -> Self {
        Self {
            allowed,
            require_cost_unset: false,
        }
    }

    pub fn cost_unset(mut self) -> Self {
        self.require_cost_unset = true;
        self
    }

    fn check(&self, order_id: OrderId, current: &Order) -> Result<(), RepositoryError> {
        if !self.allowed.contains(&current.status) {
            return Err(RepositoryError::StatusConflict {
                order_id,
                expected: self
                    .allowed
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                actual: current.status,
            });
        }
        if self.require_cost_unset && current.cost.is_some() {
            return Err(RepositoryError::Precondition {
                order_id,
                message: "cost is already set".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub page: u32,
    pub has_more: bool,
}

pub trait OrderRepository: Send + Sync {
    fn create_draft(&self, order: &Order) -> Result<OrderId, RepositoryError>;
    fn load(&self, id: OrderId) -> Result<Order, RepositoryError>;
    fn update_field(&self, id: OrderId, update: &FieldUpdate) -> Result<(), RepositoryError>;
    fn update_status(
        &self,
        id: OrderId,
        guard: StatusGuard<'_>,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError>;
    /// Writes status and reason together; `None` clears the reason.
    fn update_status_and_reason(
        &self,
        id: OrderId,
        guard: StatusGuard<'_>,
        status: OrderStatus,
        reason: Option<&str>,
    ) -> Result<Order, RepositoryError>;
    fn update_cost_and_status(
        &self,
        id: OrderId,
        guard: StatusGuard<'_>,
        cost: f64,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError>;
    fn list_by_status(
        &self,
        statuses: &[OrderStatus],
        page: u32,
        per_page: u32,
    ) -> Result<OrderPage, RepositoryError>;
    fn list_by_customer(
        &self,
        customer: ChatId,
        page: u32,
        per_page: u32,
    ) -> Result<OrderPage, RepositoryError>;
    fn assign_executor(
        &self,
        id: OrderId,
        executor: ChatId,
        role: ExecutorRole,
    ) -> Result<(), RepositoryError>;
    fn remove_executor(&self, id: OrderId, executor: ChatId) -> Result<bool, RepositoryError>;
    fn mark_executor_notified(&self, id: OrderId, executor: ChatId)
        -> Result<(), RepositoryError>;
}

pub trait UserDirectory: Send + Sync {
    fn find_user(&self, chat_id: ChatId) -> Result<Option<UserProfile>, RepositoryError>;
    /// Returns the stored profile, creating it with `role` on first contact.
    fn ensure_user(
        &self,
        chat_id: ChatId,
        role: Role,
        first_name: Option<&str>,
    ) -> Result<UserProfile, RepositoryError>;
    fn save_profile_name(&self, chat_id: ChatId, name: &str) -> Result<(), RepositoryError>;
    fn save_profile_phone(&self, chat_id: ChatId, phone: &str) -> Result<(), RepositoryError>;
    fn set_role(&self, chat_id: ChatId, role: Role) -> Result<(), RepositoryError>;
    fn list_by_roles(&self, roles: &[Role]) -> Result<Vec<UserProfile>, RepositoryError>;
}

/// SQLite-backed store for orders, executors and user profiles. Every call
/// opens its own connection, so the store is shared freely across threads.
#[derive(Debug, Clone)]
pub struct SqliteOrderStore {
    db_path: PathBuf,
}

impl SqliteOrderStore {
    pub fn open(db_path: &Path) -> Result<Self, RepositoryError> {
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent).map_err(|source| RepositoryError::CreateParent {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let store = Self {
            db_path: db_path.to_path_buf(),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection, RepositoryError> {
        let connection =
            Connection::open(&self.db_path).map_err(|source| RepositoryError::Open {
                path: self.db_path.display().to_string(),
                source,
            })?;
        connection
            .busy_timeout(BUSY_TIMEOUT)
            .map_err(RepositoryError::sql)?;
        connection
            .execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(RepositoryError::sql)?;
        Ok(connection)
    }

    pub fn ensure_schema(&self) -> Result<(), RepositoryError> {
        let connection = self.connect()?;
        connection
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS users (
                    chat_id INTEGER PRIMARY KEY,
                    role TEXT NOT NULL,
                    first_name TEXT,
                    phone TEXT,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS orders (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    customer_chat_id INTEGER,
                    creator_chat_id INTEGER,
                    category TEXT,
                    subcategory TEXT,
                    description TEXT,
                    name TEXT,
                    date TEXT,
                    time TEXT,
                    phone TEXT,
                    address TEXT,
                    latitude REAL,
                    longitude REAL,
                    photos TEXT NOT NULL DEFAULT '[]',
                    videos TEXT NOT NULL DEFAULT '[]',
                    payment TEXT,
                    cost REAL,
                    reason TEXT,
                    status TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS order_executors (
                    order_id INTEGER NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
                    chat_id INTEGER NOT NULL,
                    role TEXT NOT NULL,
                    notified INTEGER NOT NULL DEFAULT 0,
                    assigned_at INTEGER NOT NULL,
                    PRIMARY KEY (order_id, chat_id)
                );

                CREATE INDEX IF NOT EXISTS idx_orders_status
                    ON orders(status, id DESC);
                CREATE INDEX IF NOT EXISTS idx_orders_customer
                    ON orders(customer_chat_id, id DESC);
                ",
            )
            .map_err(RepositoryError::sql)
    }

    fn guarded_write<F>(
        &self,
        id: OrderId,
        guard: StatusGuard<'_>,
        apply: F,
    ) -> Result<Order, RepositoryError>
    where
        F: FnOnce(&Connection, &Order) -> Result<(), RepositoryError>,
    {
        let mut connection = self.connect()?;
        let tx = connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(RepositoryError::sql)?;
        let current = load_order(&tx, id)?;
        guard.check(id, &current)?;
        apply(&tx, &current)?;
        let updated = load_order(&tx, id)?;
        tx.commit().map_err(RepositoryError::sql)?;
        Ok(updated)
    }

    /// Payment preference is tied to the status, so it shares the status
    /// write guard.
    fn update_payment(
        &self,
        id: OrderId,
        payment: PaymentPreference,
    ) -> Result<(), RepositoryError> {
        self.guarded_write(
            id,
            StatusGuard::allowing(&PAYMENT_EDITABLE_STATUSES),
            |tx, _| {
                tx.execute(
                    "UPDATE orders SET payment = ?2, updated_at = ?3 WHERE id = ?1",
                    params![id.get(), payment.as_str(), now_secs()],
                )
                .map_err(RepositoryError::sql)?;
                Ok(())
            },
        )?;
        Ok(())
    }

    fn page_of(
        &self,
        where_clause: &str,
        mut values: Vec<SqlValue>,
        page: u32,
        per_page: u32,
    ) -> Result<OrderPage, RepositoryError> {
        let connection = self.connect()?;
        let limit_index = values.len() + 1;
        let sql = format!(
            "SELECT id FROM orders WHERE {where_clause} ORDER BY id DESC LIMIT ?{} OFFSET ?{}",
            limit_index,
            limit_index + 1
        );
        values.push(SqlValue::Integer(i64::from(per_page) + 1));
        values.push(SqlValue::Integer(i64::from(page) * i64::from(per_page)));

        let mut statement = connection.prepare(&sql).map_err(RepositoryError::sql)?;
        let ids = statement
            .query_map(params_from_iter(values), |row| row.get::<_, i64>(0))
            .map_err(RepositoryError::sql)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(RepositoryError::sql)?;

        let has_more = ids.len() > per_page as usize;
        let mut orders = Vec::with_capacity(ids.len());
        for id in ids.into_iter().take(per_page as usize) {
            orders.push(load_order(&connection, OrderId::new(id))?);
        }
        Ok(OrderPage {
            orders,
            page,
            has_more,
        })
    }
}

impl OrderRepository for SqliteOrderStore {
    fn create_draft(&self, order: &Order) -> Result<OrderId, RepositoryError> {
        let connection = self.connect()?;
        let now = now_secs();
        let (latitude, longitude) = split_location(order.address.as_ref());
        connection
            .execute(
                "
                INSERT INTO orders (
                    customer_chat_id, creator_chat_id, category, subcategory, description,
                    name, date, time, phone, address, latitude, longitude, photos, videos,
                    payment, cost, reason, status, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?19)
                ",
                params![
                    order.customer.map(ChatId::get),
                    order.creator.map(ChatId::get),
                    order.category.map(Category::as_str),
                    order.subcategory.map(Subcategory::as_str),
                    order.description,
                    order.name,
                    order.date.map(|d| d.to_string()),
                    order.time.map(|t| t.to_string()),
                    order.phone,
                    order.address.as_ref().map(|a| a.text.clone()),
                    latitude,
                    longitude,
                    encode_list("photos", &order.photos)?,
                    encode_list("videos", &order.videos)?,
                    order.payment.map(PaymentPreference::as_str),
                    Option::<f64>::None,
                    Option::<String>::None,
                    OrderStatus::Draft.as_str(),
                    now,
                ],
            )
            .map_err(RepositoryError::sql)?;
        Ok(OrderId::new(connection.last_insert_rowid()))
    }

    fn load(&self, id: OrderId) -> Result<Order, RepositoryError> {
        let connection = self.connect()?;
        load_order(&connection, id)
    }

    fn update_field(&self, id: OrderId, update: &FieldUpdate) -> Result<(), RepositoryError> {
        let connection = self.connect()?;
        let now = now_secs();
        let changed = match update {
            FieldUpdate::Category {
                category,
                subcategory,
            } => connection.execute(
                "UPDATE orders SET category = ?2, subcategory = ?3, updated_at = ?4 WHERE id = ?1",
                params![
                    id.get(),
                    category.as_str(),
                    subcategory.map(Subcategory::as_str),
                    now
                ],
            ),
            FieldUpdate::Description(description) => connection.execute(
                "UPDATE orders SET description = ?2, updated_at = ?3 WHERE id = ?1",
                params![id.get(), description, now],
            ),
            FieldUpdate::Name(name) => connection.execute(
                "UPDATE orders SET name = ?2, updated_at = ?3 WHERE id = ?1",
                params![id.get(), name, now],
            ),
            FieldUpdate::Schedule { date, time } => connection.execute(
                "UPDATE orders SET date = ?2, time = ?3, updated_at = ?4 WHERE id = ?1",
                params![id.get(), date.to_string(), time.map(|t| t.to_string()), now],
            ),
            FieldUpdate::Phone(phone) => connection.execute(
                "UPDATE orders SET phone = ?2, updated_at = ?3 WHERE id = ?1",
                params![id.get(), phone, now],
            ),
            FieldUpdate::Address(address) => {
                let (latitude, longitude) = split_location(Some(address));
                connection.execute(
                    "UPDATE orders SET address = ?2, latitude = ?3, longitude = ?4, updated_at = ?5 WHERE id = ?1",
                    params![id.get(), address.text, latitude, longitude, now],
                )
            }
            FieldUpdate::Media { photos, videos } => connection.execute(
                "UPDATE orders SET photos = ?2, videos = ?3, updated_at = ?4 WHERE id = ?1",
                params![
                    id.get(),
                    encode_list("photos", photos)?,
                    encode_list("videos", videos)?,
                    now
                ],
            ),
            FieldUpdate::Payment(payment) => return self.update_payment(id, *payment),
        }
        .map_err(RepositoryError::sql)?;

        if changed == 0 {
            return Err(RepositoryError::OrderNotFound { order_id: id });
        }
        Ok(())
    }

    fn update_status(
        &self,
        id: OrderId,
        guard: StatusGuard<'_>,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        self.guarded_write(id, guard, |tx, _| {
            tx.execute(
                "UPDATE orders SET status = ?2, updated_at = ?3 WHERE id = ?1",
                params![id.get(), status.as_str(), now_secs()],
            )
            .map_err(RepositoryError::sql)?;
            Ok(())
        })
    }

    fn update_status_and_reason(
        &self,
        id: OrderId,
        guard: StatusGuard<'_>,
        status: OrderStatus,
        reason: Option<&str>,
    ) -> Result<Order, RepositoryError> {
        if status == OrderStatus::Canceled && reason.is_none() {
            return Err(RepositoryError::Precondition {
                order_id: id,
                message: "a cancellation reason is required".to_string(),
            });
        }
        self.guarded_write(id, guard, |tx, _| {
            tx.execute(
                "UPDATE orders SET status = ?2, reason = ?3, updated_at = ?4 WHERE id = ?1",
                params![id.get(), status.as_str(), reason, now_secs()],
            )
            .map_err(RepositoryError::sql)?;
            Ok(())
        })
    }

    fn update_cost_and_status(
        &self,
        id: OrderId,
        guard: StatusGuard<'_>,
        cost: f64,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        self.guarded_write(id, guard, |tx, _| {
            tx.execute(
                "UPDATE orders SET cost = ?2, status = ?3, updated_at = ?4 WHERE id = ?1",
                params![id.get(), cost, status.as_str(), now_secs()],
            )
            .map_err(RepositoryError::sql)?;
            Ok(())
        })
    }

    fn list_by_status(
        &self,
        statuses: &[OrderStatus],
        page: u32,
        per_page: u32,
    ) -> Result<OrderPage, RepositoryError> {
        if statuses.is_empty() {
            return Ok(OrderPage {
                orders: Vec::new(),
                page,
                has_more: false,
            });
        }
        let placeholders = (1..=statuses.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let values: Vec<SqlValue> = statuses
            .iter()
            .map(|s| SqlValue::Text(s.as_str().to_string()))
            .collect();
        self.page_of(
            &format!("status IN ({placeholders})"),
            values,
            page,
            per_page,
        )
    }

    fn list_by_customer(
        &self,
        customer: ChatId,
        page: u32,
        per_page: u32,
    ) -> Result<OrderPage, RepositoryError> {
        self.page_of(
            "customer_chat_id = ?1 AND status != 'draft'",
            vec![SqlValue::Integer(customer.get())],
            page,
            per_page,
        )
    }

    fn assign_executor(
        &self,
        id: OrderId,
        executor: ChatId,
        role: ExecutorRole,
    ) -> Result<(), RepositoryError> {
        let connection = self.connect()?;
        let order = load_order(&connection, id)?;
        let user = load_user(&connection, executor)?
            .ok_or(RepositoryError::UserNotFound { chat_id: executor })?;
        let expected_role = match role {
            ExecutorRole::Driver => Role::Driver,
            ExecutorRole::Loader => Role::Loader,
        };
        if user.role != expected_role {
            return Err(RepositoryError::Precondition {
                order_id: id,
                message: format!("user {executor} is a {}, not a {}", user.role, role.as_str()),
            });
        }
        if order.status.is_final() || order.status == OrderStatus::Canceled {
            return Err(RepositoryError::Precondition {
                order_id: id,
                message: format!("executors cannot be assigned to a {} order", order.status),
            });
        }
        connection
            .execute(
                "
                INSERT INTO order_executors (order_id, chat_id, role, notified, assigned_at)
                VALUES (?1, ?2, ?3, 0, ?4)
                ON CONFLICT(order_id, chat_id) DO UPDATE SET
                    role = excluded.role,
                    notified = 0,
                    assigned_at = excluded.assigned_at
                ",
                params![id.get(), executor.get(), role.as_str(), now_secs()],
            )
            .map_err(RepositoryError::sql)?;
        Ok(())
    }

    fn remove_executor(&self, id: OrderId, executor: ChatId) -> Result<bool, RepositoryError> {
        let connection = self.connect()?;
        let removed = connection
            .execute(
                "DELETE FROM order_executors WHERE order_id = ?1 AND chat_id = ?2",
                params![id.get(), executor.get()],
            )
            .map_err(RepositoryError::sql)?;
        Ok(removed > 0)
    }

    fn mark_executor_notified(
        &self,
        id: OrderId,
        executor: ChatId,
    ) -> Result<(), RepositoryError> {
        let connection = self.connect()?;
        connection
            .execute(
                "UPDATE order_executors SET notified = 1 WHERE order_id = ?1 AND chat_id = ?2",
                params![id.get(), executor.get()],
            )
            .map_err(RepositoryError::sql)?;
        Ok(())
    }
}

impl UserDirectory for SqliteOrderStore {
    fn find_user(&self, chat_id: ChatId) -> Result<Option<UserProfile>, RepositoryError> {
        let connection = self.connect()?;
        load_user(&connection, chat_id)
    }

    fn ensure_user(
        &self,
        chat_id: ChatId,
        role: Role,
        first_name: Option<&str>,
    ) -> Result<UserProfile, RepositoryError> {
        let connection = self.connect()?;
        let now = now_secs();
        connection
            .execute(
                "
                INSERT INTO users (chat_id, role, first_name, phone, created_at, updated_at)
                VALUES (?1, ?2, ?3, NULL, ?4, ?4)
                ON CONFLICT(chat_id) DO NOTHING
                ",
                params![chat_id.get(), role.as_str(), first_name, now],
            )
            .map_err(RepositoryError::sql)?;
        load_user(&connection, chat_id)?.ok_or(RepositoryError::UserNotFound { chat_id })
    }

    fn save_profile_name(&self, chat_id: ChatId, name: &str) -> Result<(), RepositoryError> {
        self.update_user(chat_id, "first_name", name)
    }

    fn save_profile_phone(&self, chat_id: ChatId, phone: &str) -> Result<(), RepositoryError> {
        self.update_user(chat_id, "phone", phone)
    }

    fn set_role(&self, chat_id: ChatId, role: Role) -> Result<(), RepositoryError> {
        self.update_user(chat_id, "role", role.as_str())
    }

    fn list_by_roles(&self, roles: &[Role]) -> Result<Vec<UserProfile>, RepositoryError> {
        if roles.is_empty() {
            return Ok(Vec::new());
        }
        let connection = self.connect()?;
        let placeholders = (1..=roles.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT chat_id, role, first_name, phone FROM users WHERE role IN ({placeholders}) ORDER BY chat_id"
        );
        let mut statement = connection.prepare(&sql).map_err(RepositoryError::sql)?;
        let rows = statement
            .query_map(params_from_iter(roles.iter().map(|r| r.as_str())), user_row)
            .map_err(RepositoryError::sql)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(RepositoryError::sql)?;
        rows.into_iter().map(UserRow::into_profile).collect()
    }
}

impl SqliteOrderStore {
    fn update_user(
        &self,
        chat_id: ChatId,
        column: &'static str,
        value: &str,
    ) -> Result<(), RepositoryError> {
        let connection = self.connect()?;
        let sql = format!("UPDATE users SET {column} = ?2, updated_at = ?3 WHERE chat_id = ?1");
        let changed = connection
            .execute(&sql, params![chat_id.get(), value, now_secs()])
            .map_err(RepositoryError::sql)?;
        if changed == 0 {
            return Err(RepositoryError::UserNotFound { chat_id });
        }
        Ok(())
    }
}

struct OrderRow {
    id: i64,
    customer: Option<i64>,
    creator: Option<i64>,
    category: Option<String>,
    subcategory: Option<String>,
    description: Option<String>,
    name: Option<String>,
    date: Option<String>,
    time: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    photos: String,
    videos: String,
    payment: Option<String>,
    cost: Option<f64>,
    reason: Option<String>,
    status: String,
    created_at: i64,
    updated_at: i64,
}

struct UserRow {
    chat_id: i64,
    role: String,
    first_name: Option<String>,
    phone: Option<String>,
}

impl UserRow {
    fn into_profile(self) -> Result<UserProfile, RepositoryError> {
        Ok(UserProfile {
            chat_id: ChatId::new(self.chat_id),
            role: parse_column("role", &self.role, Role::parse)?,
            first_name: self.first_name,
            phone: self.phone,
        })
    }
}

fn user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        chat_id: row.get(0)?,
        role: row.get(1)?,
        first_name: row.get(2)?,
        phone: row.get(3)?,
    })
}

fn load_user(
    connection: &Connection,
    chat_id: ChatId,
) -> Result<Option<UserProfile>, RepositoryError> {
    connection
        .query_row(
            "SELECT chat_id, role, first_name, phone FROM users WHERE chat_id = ?1",
            params![chat_id.get()],
            user_row,
        )
        .optional()
        .map_err(RepositoryError::sql)?
        .map(UserRow::into_profile)
        .transpose()
}

fn load_order(connection: &Connection, id: OrderId) -> Result<Order, RepositoryError> {
    let row = connection
        .query_row(
            "
            SELECT id, customer_chat_id, creator_chat_id, category, subcategory, description,
                   name, date, time, phone, address, latitude, longitude, photos, videos,
                   payment, cost, reason, status, created_at, updated_at
            FROM orders WHERE id = ?1
            ",
            params![id.get()],
            |row| {
                Ok(OrderRow {
                    id: row.get(0)?,
                    customer: row.get(1)?,
                    creator: row.get(2)?,
                    category: row.get(3)?,
                    subcategory: row.get(4)?,
                    description: row.get(5)?,
                    name: row.get(6)?,
                    date: row.get(7)?,
                    time: row.get(8)?,
                    phone: row.get(9)?,
                    address: row.get(10)?,
                    latitude: row.get(11)?,
                    longitude: row.get(12)?,
                    photos: row.get(13)?,
                    videos: row.get(14)?,
                    payment: row.get(15)?,
                    cost: row.get(16)?,
                    reason: row.get(17)?,
                    status: row.get(18)?,
                    created_at: row.get(19)?,
                    updated_at: row.get(20)?,
                })
            },
        )
        .optional()
        .map_err(RepositoryError::sql)?
        .ok_or(RepositoryError::OrderNotFound { order_id: id })?;

    let mut order = row_to_order(row)?;
    order.executors = load_executors(connection, id)?;
    Ok(order)
}

fn row_to_order(row: OrderRow) -> Result<Order, RepositoryError> {
    let location = match (row.latitude, row.longitude) {
        (Some(latitude), Some(longitude)) => Some(GeoPoint {
            latitude,
            longitude,
        }),
        _ => None,
    };
    Ok(Order {
        id: Some(OrderId::new(row.id)),
        customer: row.customer.map(ChatId::new),
        creator: row.creator.map(ChatId::new),
        category: parse_optional_column("category", row.category, Category::parse)?,
        subcategory: parse_optional_column("subcategory", row.subcategory, Subcategory::parse)?,
        description: row.description,
        name: row.name,
        date: parse_optional_column("date", row.date, RequestedDate::parse)?,
        time: parse_optional_column("time", row.time, RequestedTime::parse)?,
        phone: row.phone,
        address: row.address.map(|text| Address { text, location }),
        photos: decode_list("photos", &row.photos)?,
        videos: decode_list("videos", &row.videos)?,
        payment: parse_optional_column("payment", row.payment, PaymentPreference::parse)?,
        cost: row.cost,
        reason: row.reason,
        status: parse_column("status", &row.status, OrderStatus::parse)?,
        executors: Vec::new(),
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn load_executors(
    connection: &Connection,
    id: OrderId,
) -> Result<Vec<Executor>, RepositoryError> {
    let mut statement = connection
        .prepare(
            "SELECT chat_id, role, notified FROM order_executors WHERE order_id = ?1 ORDER BY assigned_at, chat_id",
        )
        .map_err(RepositoryError::sql)?;
    let rows = statement
        .query_map(params![id.get()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, bool>(2)?,
            ))
        })
        .map_err(RepositoryError::sql)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(RepositoryError::sql)?;

    rows.into_iter()
        .map(|(chat_id, role, notified)| {
            Ok(Executor {
                chat_id: ChatId::new(chat_id),
                role: parse_column("executor role", &role, ExecutorRole::parse)?,
                notified,
            })
        })
        .collect()
}

fn parse_column<T>(
    column: &'static str,
    value: &str,
    parser: impl FnOnce(&str) -> Result<T, String>,
) -> Result<T, RepositoryError> {
    parser(value).map_err(|message| RepositoryError::InvalidColumn {
        column,
        value: value.to_string(),
        message,
    })
}

fn parse_optional_column<T>(
    column: &'static str,
    value: Option<String>,
    parser: impl FnOnce(&str) -> Result<T, String>,
) -> Result<Option<T>, RepositoryError> {
    value
        .map(|raw| parse_column(column, &raw, parser))
        .transpose()
}

fn encode_list(column: &'static str, items: &[String]) -> Result<String, RepositoryError> {
    serde_json::to_string(items).map_err(|source| RepositoryError::Encode { column, source })
}

fn decode_list(column: &'static str, raw: &str) -> Result<Vec<String>, RepositoryError> {
    serde_json::from_str(raw).map_err(|err| RepositoryError::InvalidColumn {
        column,
        value: raw.to_string(),
        message: err.to_string(),
    })
}

fn split_location(address: Option<&Address>) -> (Option<f64>, Option<f64>) {
    match address.and_then(|a| a.location) {
        Some(point) => (Some(point.latitude), Some(point.longitude)),
        None => (None, None),
    }
}
