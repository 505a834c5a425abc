use haulbot::channels::local::LocalTransport;
use haulbot::notify::{ContactRequest, FanOut};
use haulbot::orders::{
    Actor, Address, Category, ExecutorRole, FieldUpdate, LifecycleError, Order, OrderLifecycle,
    OrderRepository, OrderStatus, PaymentPreference, RequestedDate, RequestedTime, Role,
    SqliteOrderStore, UserDirectory, UserProfile,
};
use haulbot::shared::{ChatId, ErrorClass, EventLog, OrderId};
use std::sync::Arc;
use std::thread;
use tempfile::{tempdir, TempDir};

const CUSTOMER: ChatId = ChatId::new(11);
const OPERATOR: ChatId = ChatId::new(21);
const SECOND_OPERATOR: ChatId = ChatId::new(22);
const DRIVER: ChatId = ChatId::new(31);

struct Fixture {
    _temp: TempDir,
    store: Arc<SqliteOrderStore>,
    transport: Arc<LocalTransport>,
    lifecycle: OrderLifecycle,
}

fn fixture() -> Fixture {
    let temp = tempdir().expect("tempdir");
    let store =
        Arc::new(SqliteOrderStore::open(&temp.path().join("orders.sqlite3")).expect("open"));
    store.ensure_user(CUSTOMER, Role::Customer, Some("Ann")).expect("customer");
    store.ensure_user(OPERATOR, Role::Operator, None).expect("operator");
    store
        .ensure_user(SECOND_OPERATOR, Role::Operator, None)
        .expect("second operator");
    store.ensure_user(DRIVER, Role::Driver, None).expect("driver");

    let transport = Arc::new(LocalTransport::new());
    let log = EventLog::for_state_root(temp.path());
    let fanout = FanOut::new(
        transport.clone(),
        store.clone(),
        store.clone(),
        None,
        None,
        log.clone(),
    );
    let lifecycle = OrderLifecycle::new(store.clone(), fanout, log);
    Fixture {
        _temp: temp,
        store,
        transport,
        lifecycle,
    }
}

fn customer() -> Actor {
    Actor::new(CUSTOMER, Role::Customer)
}

fn operator() -> Actor {
    Actor::new(OPERATOR, Role::Operator)
}

fn complete_draft(fx: &Fixture, payment: PaymentPreference) -> OrderId {
    let mut order = Order::new_draft(Some(CUSTOMER), Some(CUSTOMER));
    order.category = Some(Category::Other);
    order.name = Some("Ann".to_string());
    order.date = Some(RequestedDate::Asap);
    order.time = Some(RequestedTime::Asap);
    order.phone = Some("+79991234567".to_string());
    order.address = Some(Address::text("Lenina street 1"));
    order.payment = Some(payment);
    fx.store.create_draft(&order).expect("create draft")
}

fn submitted(fx: &Fixture, payment: PaymentPreference) -> OrderId {
    let id = complete_draft(fx, payment);
    fx.lifecycle.submit(customer(), id).expect("submit");
    id
}

fn status(fx: &Fixture, id: OrderId) -> OrderStatus {
    fx.store.load(id).expect("load").status
}

#[test]
fn submit_requires_every_wizard_field() {
    let fx = fixture();
    let id = fx
        .store
        .create_draft(&Order::new_draft(Some(CUSTOMER), Some(CUSTOMER)))
        .expect("create");
    let err = fx.lifecycle.submit(customer(), id).expect_err("incomplete draft");
    assert_eq!(err.class(), ErrorClass::Consistency);
    assert_eq!(status(&fx, id), OrderStatus::Draft);

    fx.store
        .update_field(
            id,
            &FieldUpdate::Category {
                category: Category::Other,
                subcategory: None,
            },
        )
        .expect("category");
    assert!(fx.lifecycle.submit(customer(), id).is_err());
}

#[test]
fn submit_moves_draft_to_new_and_tells_operators() {
    let fx = fixture();
    let id = submitted(&fx, PaymentPreference::Later);
    let order = fx.store.load(id).expect("load");
    assert_eq!(order.status, OrderStatus::New);
    assert_eq!(order.cost, None);
    assert_eq!(fx.transport.notifications_for(OPERATOR).len(), 1);
    assert_eq!(fx.transport.notifications_for(SECOND_OPERATOR).len(), 1);
    assert!(fx.transport.notifications_for(CUSTOMER).is_empty());
}

#[test]
fn accepting_cost_requires_awaiting_confirmation() {
    let fx = fixture();
    let id = submitted(&fx, PaymentPreference::Later);

    let err = fx
        .lifecycle
        .accept_cost(customer(), id)
        .expect_err("no price yet");
    assert_eq!(err.class(), ErrorClass::Consistency);
    assert_eq!(status(&fx, id), OrderStatus::New);

    fx.lifecycle.price(operator(), id, 2500.0).expect("price");
    let order = fx.lifecycle.accept_cost(customer(), id).expect("accept");
    assert_eq!(order.status, OrderStatus::InProgress);
    assert_eq!(order.cost, Some(2500.0));
}

#[test]
fn pay_now_orders_wait_for_payment_after_acceptance() {
    let fx = fixture();
    let id = submitted(&fx, PaymentPreference::Now);
    fx.lifecycle.price(operator(), id, 1500.0).expect("price");
    let order = fx.lifecycle.accept_cost(customer(), id).expect("accept");
    assert_eq!(order.status, OrderStatus::AwaitingPayment);
}

#[test]
fn only_the_customer_may_accept_and_only_operators_may_price() {
    let fx = fixture();
    let id = submitted(&fx, PaymentPreference::Later);

    let err = fx
        .lifecycle
        .price(customer(), id, 100.0)
        .expect_err("customer cannot price");
    assert_eq!(err.class(), ErrorClass::Authorization);

    fx.lifecycle.price(operator(), id, 100.0).expect("price");
    let err = fx
        .lifecycle
        .accept_cost(Actor::new(ChatId::new(99), Role::Customer), id)
        .expect_err("stranger cannot accept");
    assert_eq!(err.class(), ErrorClass::Authorization);
    assert_eq!(status(&fx, id), OrderStatus::AwaitingConfirmation);
}

#[test]
fn non_positive_costs_are_format_errors() {
    let fx = fixture();
    let id = submitted(&fx, PaymentPreference::Later);
    for cost in [0.0, -10.0] {
        let err = fx
            .lifecycle
            .price(operator(), id, cost)
            .expect_err("cost must be positive");
        assert!(matches!(err, LifecycleError::Invalid(_)));
        assert_eq!(err.class(), ErrorClass::Format);
    }
    assert_eq!(fx.store.load(id).expect("load").cost, None);
}

#[test]
fn rejection_and_cancellation_need_a_real_reason() {
    let fx = fixture();
    let id = submitted(&fx, PaymentPreference::Later);

    let err = fx
        .lifecycle
        .cancel_by_customer(customer(), id, "12345")
        .expect_err("five characters are not enough");
    assert_eq!(err.class(), ErrorClass::Format);
    assert_eq!(status(&fx, id), OrderStatus::New);

    fx.lifecycle.price(operator(), id, 900.0).expect("price");
    let err = fx
        .lifecycle
        .reject_cost(customer(), id, "  pricy ")
        .expect_err("trimmed reason is too short");
    assert_eq!(err.class(), ErrorClass::Format);

    let order = fx
        .lifecycle
        .reject_cost(customer(), id, "too expensive")
        .expect("reject");
    assert_eq!(order.status, OrderStatus::Canceled);
    assert_eq!(order.reason.as_deref(), Some("too expensive"));
}

#[test]
fn customers_cannot_cancel_once_priced() {
    let fx = fixture();
    let id = submitted(&fx, PaymentPreference::Later);
    fx.lifecycle.price(operator(), id, 900.0).expect("price");
    let err = fx
        .lifecycle
        .cancel_by_customer(customer(), id, "changed my mind")
        .expect_err("priced orders need an operator");
    assert_eq!(err.class(), ErrorClass::Consistency);
    assert_eq!(status(&fx, id), OrderStatus::AwaitingConfirmation);
}

#[test]
fn concurrent_pricing_leaves_a_consistent_cost_and_status() {
    let fx = fixture();
    let id = submitted(&fx, PaymentPreference::Later);
    fx.lifecycle.begin_pricing(operator(), id).expect("begin");

    thread::scope(|scope| {
        let first = scope.spawn(|| fx.lifecycle.price(operator(), id, 1000.0));
        let second = scope.spawn(|| {
            fx.lifecycle
                .price(Actor::new(SECOND_OPERATOR, Role::Operator), id, 2000.0)
        });
        first.join().expect("join").expect("first price");
        second.join().expect("join").expect("second price");
    });

    let order = fx.store.load(id).expect("load");
    assert_eq!(order.status, OrderStatus::AwaitingConfirmation);
    assert!(
        order.cost == Some(1000.0) || order.cost == Some(2000.0),
        "cost {:?} must be one of the written values",
        order.cost
    );
}

#[test]
fn payment_is_applied_once() {
    let fx = fixture();
    let id = submitted(&fx, PaymentPreference::Now);
    fx.lifecycle.price(operator(), id, 1500.0).expect("price");
    fx.lifecycle.accept_cost(customer(), id).expect("accept");

    let before = fx.transport.notifications_for(CUSTOMER).len();
    fx.lifecycle.record_payment(id).expect("payment");
    fx.lifecycle.record_payment(id).expect("repeated payment");
    assert_eq!(status(&fx, id), OrderStatus::InProgress);
    assert_eq!(fx.transport.notifications_for(CUSTOMER).len(), before + 1);
}

#[test]
fn failed_notifications_do_not_roll_back_transitions() {
    let fx = fixture();
    fx.transport.fail_deliveries_to(CUSTOMER);
    let id = submitted(&fx, PaymentPreference::Later);
    let order = fx.lifecycle.price(operator(), id, 700.0).expect("price");
    assert_eq!(order.status, OrderStatus::AwaitingConfirmation);
    assert_eq!(status(&fx, id), OrderStatus::AwaitingConfirmation);
}

#[test]
fn callback_requests_reach_every_operator_but_not_the_sender() {
    let fx = fixture();
    let fanout = FanOut::new(
        fx.transport.clone(),
        fx.store.clone(),
        fx.store.clone(),
        None,
        None,
        EventLog::for_state_root(fx._temp.path()),
    );
    fx.transport.fail_deliveries_to(SECOND_OPERATOR);
    let from = UserProfile {
        chat_id: CUSTOMER,
        role: Role::Customer,
        first_name: Some("Ann".to_string()),
        phone: None,
    };
    let report = fanout.relay_to_operators(
        &ContactRequest::Callback {
            phone: "+79991234567".to_string(),
        },
        &from,
    );
    assert_eq!(report.delivered, vec![OPERATOR]);
    assert_eq!(report.failed, vec![SECOND_OPERATOR]);
    let received = fx.transport.notifications_for(OPERATOR);
    assert_eq!(received.len(), 1);
    assert!(received[0].contains("Ann"));
    assert!(received[0].contains("+79991234567"));
    assert!(fx.transport.notifications_for(CUSTOMER).is_empty());
}

#[test]
fn completion_bookkeeping_and_resume() {
    let fx = fixture();
    let id = submitted(&fx, PaymentPreference::Later);
    fx.lifecycle.price(operator(), id, 1200.0).expect("price");
    fx.lifecycle.accept_cost(customer(), id).expect("accept");

    fx.lifecycle
        .assign_executor(operator(), id, DRIVER, ExecutorRole::Driver)
        .expect("assign driver");
    assert_eq!(fx.transport.notifications_for(DRIVER).len(), 1);
    let executors = fx.store.load(id).expect("load").executors;
    assert!(executors[0].notified);

    fx.lifecycle
        .complete(Actor::new(DRIVER, Role::Driver), id)
        .expect("driver completes");
    let corrected = fx
        .lifecycle
        .correct_final_cost(operator(), id, 1350.0)
        .expect("final cost");
    assert_eq!(corrected.status, OrderStatus::Completed);
    assert_eq!(corrected.cost, Some(1350.0));

    fx.lifecycle.mark_calculated(operator(), id).expect("calculated");
    let settled = fx.lifecycle.mark_settled(operator(), id).expect("settled");
    assert_eq!(settled.status, OrderStatus::Settled);
    assert!(fx.lifecycle.resume(operator(), id).is_err());

    let other = submitted(&fx, PaymentPreference::Later);
    fx.lifecycle
        .cancel_by_operator(operator(), other, "customer unreachable")
        .expect("cancel");
    let resumed = fx.lifecycle.resume(operator(), other).expect("resume");
    assert_eq!(resumed.status, OrderStatus::New);
    assert_eq!(resumed.reason, None);
}
