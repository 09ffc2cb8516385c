use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};
use tokio::sync::{Mutex, Notify};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{basic_auth, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use payment_cell::models::{GatewayOrder, OrderRequest, PaymentError, VerifyPaymentRequest};
use payment_cell::router::payment_routes;
use payment_cell::services::signature::expected_signature;
use payment_cell::services::{PaymentGateway, PaymentService};
use shared_database::{BookingOutcome, ClinicStore, InMemoryStore};
use shared_models::appointment::{
    Appointment, AppointmentStatus, PaymentRecord, PaymentStatus, ReminderWindow,
};
use shared_models::doctor::Doctor;
use shared_models::patient::Patient;
use shared_realtime::Role;
use shared_utils::test_utils::{doctor_fixture, TestConfig, TestState, TestUser};
use shared_utils::AppState;

async fn send(app: Router, method: &str, uri: &str, auth: Option<String>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

struct Fixture {
    test: TestState,
    patient: TestUser,
    doctor: Doctor,
    appointment: Appointment,
}

async fn fixture_with(test: TestState, status: AppointmentStatus) -> Fixture {
    let patient = TestUser::patient("meera@example.com");
    let doctor = test
        .store
        .insert_doctor(doctor_fixture(Uuid::new_v4(), "Dr. Asha Rao", 800.0))
        .await
        .unwrap();

    let start = Utc.with_ymd_and_hms(2030, 3, 4, 9, 0, 0).unwrap();
    let pending = Appointment::pending(
        doctor.id,
        patient.uuid(),
        "Meera Iyer".to_string(),
        "555-0199".to_string(),
        start,
        start + Duration::hours(1),
        None,
        0.0,
    );
    let BookingOutcome::Booked(mut appointment) = test.store.book_if_free(pending).await.unwrap() else {
        panic!("slot should be free");
    };
    if status != AppointmentStatus::Pending {
        appointment = test
            .store
            .update_status(appointment.id, AppointmentStatus::Pending, status, "")
            .await
            .unwrap()
            .unwrap();
    }

    Fixture { test, patient, doctor, appointment }
}

async fn confirmed_fixture() -> Fixture {
    fixture_with(TestState::default(), AppointmentStatus::Confirmed).await
}

#[tokio::test]
async fn test_create_order_requires_confirmed_appointment() {
    let f = fixture_with(TestState::default(), AppointmentStatus::Pending).await;

    let (status, body) = send(
        payment_routes(f.test.state.clone()),
        "POST",
        &format!("/create-order/{}", f.appointment.id),
        Some(f.test.bearer(&f.patient)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Appointment must be confirmed before payment");
}

#[tokio::test]
async fn test_create_order_for_someone_elses_appointment_is_forbidden() {
    let f = confirmed_fixture().await;
    let stranger = TestUser::patient("stranger@example.com");

    let (status, _) = send(
        payment_routes(f.test.state.clone()),
        "POST",
        &format!("/create-order/{}", f.appointment.id),
        Some(f.test.bearer(&stranger)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unreachable_gateway_falls_back_to_mock_order_and_mock_verify() {
    let f = confirmed_fixture().await;
    let (_, mut doctor_inbox) = f.test.listen(Role::Doctor, f.doctor.id).await;

    let (status, body) = send(
        payment_routes(f.test.state.clone()),
        "POST",
        &format!("/create-order/{}", f.appointment.id),
        Some(f.test.bearer(&f.patient)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let order_id = body["order"]["id"].as_str().unwrap().to_string();
    assert!(order_id.starts_with("order_mock_"));
    assert_eq!(body["order"]["amount"], 80000);
    assert_eq!(body["order"]["currency"], "INR");
    assert_eq!(body["order"]["doctorName"], "Dr. Asha Rao");
    assert_eq!(body["keyId"], "rzp_test_key");

    let verify_uri = format!("/verify/{}", f.appointment.id);
    let (status, body) = send(
        payment_routes(f.test.state.clone()),
        "POST",
        &verify_uri,
        Some(f.test.bearer(&f.patient)),
        Some(json!({ "razorpay_order_id": order_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Payment verified successfully (Mock)");
    let payment_id = body["paymentId"].as_str().unwrap().to_string();
    assert!(payment_id.starts_with("pay_mock_"));

    let event = doctor_inbox.try_recv().unwrap();
    assert_eq!(event.event, "paymentReceived");
    assert_eq!(event.data["amount"], 800.0);
    assert_eq!(event.data["patientName"], "Meera Iyer");

    // Replaying the same payment is a no-op.
    let (status, _) = send(
        payment_routes(f.test.state.clone()),
        "POST",
        &verify_uri,
        Some(f.test.bearer(&f.patient)),
        Some(json!({ "orderId": order_id, "paymentId": payment_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(doctor_inbox.try_recv().is_err());

    // A different payment for a paid appointment is a conflict.
    let (status, _) = send(
        payment_routes(f.test.state.clone()),
        "POST",
        &verify_uri,
        Some(f.test.bearer(&f.patient)),
        Some(json!({ "orderId": order_id, "paymentId": "pay_other" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        payment_routes(f.test.state.clone()),
        "POST",
        &format!("/create-order/{}", f.appointment.id),
        Some(f.test.bearer(&f.patient)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Payment already completed");
}

#[tokio::test]
async fn test_gateway_order_and_signature_verification() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(basic_auth("rzp_test_key", "rzp_test_secret"))
        .and(body_partial_json(json!({ "amount": 80000, "currency": "INR" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "order_live_1",
            "amount": 80000,
            "currency": "INR",
            "status": "created"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = TestConfig {
        payment_api_base: server.uri(),
        ..TestConfig::default()
    };
    let f = fixture_with(TestState::with_config(config), AppointmentStatus::Confirmed).await;
    let (_, mut doctor_inbox) = f.test.listen(Role::Doctor, f.doctor.id).await;

    let (status, body) = send(
        payment_routes(f.test.state.clone()),
        "POST",
        &format!("/create-order/{}", f.appointment.id),
        Some(f.test.bearer(&f.patient)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"]["id"], "order_live_1");

    let verify_uri = format!("/verify/{}", f.appointment.id);

    // A live order never takes the mock path.
    let (status, _) = send(
        payment_routes(f.test.state.clone()),
        "POST",
        &verify_uri,
        Some(f.test.bearer(&f.patient)),
        Some(json!({ "orderId": "order_mock_123", "paymentId": "pay_1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        payment_routes(f.test.state.clone()),
        "POST",
        &verify_uri,
        Some(f.test.bearer(&f.patient)),
        Some(json!({ "orderId": "order_live_1", "paymentId": "pay_1", "signature": "deadbeef" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Payment verification failed");
    let stored = f.test.store.find_appointment(f.appointment.id).await.unwrap().unwrap();
    assert_eq!(stored.payment.payment_status, PaymentStatus::Failed);

    let signature = expected_signature("rzp_test_secret", "order_live_1", "pay_1");
    let (status, body) = send(
        payment_routes(f.test.state.clone()),
        "POST",
        &verify_uri,
        Some(f.test.bearer(&f.patient)),
        Some(json!({
            "razorpay_order_id": "order_live_1",
            "razorpay_payment_id": "pay_1",
            "razorpay_signature": signature
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Payment successful");
    assert_eq!(doctor_inbox.try_recv().unwrap().data["paymentId"], "pay_1");

    let (status, body) = send(
        payment_routes(f.test.state.clone()),
        "GET",
        &format!("/status/{}", f.appointment.id),
        Some(f.test.bearer(&f.patient)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["paymentStatus"], "Paid");
    assert_eq!(body["paymentId"], "pay_1");
    assert_eq!(body["orderId"], "order_live_1");
    assert_eq!(body["amount"], 800.0);
}

#[tokio::test]
async fn test_status_falls_back_to_doctor_fee() {
    let f = confirmed_fixture().await;

    let (status, body) = send(
        payment_routes(f.test.state.clone()),
        "GET",
        &format!("/status/{}", f.appointment.id),
        Some(f.test.bearer(&f.patient)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["paymentStatus"], "Pending");
    assert_eq!(body["amount"], 800.0);
}

/// Records the orders it is asked to create.
#[derive(Default)]
struct RecordingGateway {
    orders: Mutex<Vec<OrderRequest>>,
}

#[async_trait]
impl PaymentGateway for RecordingGateway {
    async fn create_order(&self, order: &OrderRequest) -> anyhow::Result<GatewayOrder> {
        self.orders.lock().await.push(order.clone());
        Ok(GatewayOrder {
            id: "order_recorded".to_string(),
            amount: order.amount,
            currency: order.currency.clone(),
        })
    }
}

#[tokio::test]
async fn test_order_request_carries_receipt_and_notes() {
    let f = confirmed_fixture().await;
    let gateway = Arc::new(RecordingGateway::default());
    let service = PaymentService::with_gateway(&f.test.state, gateway.clone());

    service.create_order(f.patient.uuid(), f.appointment.id).await.unwrap();

    let orders = gateway.orders.lock().await;
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].receipt, format!("appointment_{}", f.appointment.id));
    assert_eq!(orders[0].notes["doctorName"], "Dr. Asha Rao");

    let missing = service
        .verify(f.patient.uuid(), f.appointment.id, VerifyPaymentRequest::default())
        .await;
    assert_matches!(missing, Err(PaymentError::MissingField("orderId")));
}

/// Delegates to the in-memory store; once armed, the next appointment read
/// parks until released.
struct PausingStore {
    inner: Arc<InMemoryStore>,
    armed: AtomicBool,
    reached: Notify,
    release: Notify,
}

impl PausingStore {
    fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            armed: AtomicBool::new(true),
            reached: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl ClinicStore for PausingStore {
    async fn insert_doctor(&self, doctor: Doctor) -> anyhow::Result<Doctor> {
        self.inner.insert_doctor(doctor).await
    }
    async fn save_doctor(&self, doctor: &Doctor) -> anyhow::Result<Doctor> {
        self.inner.save_doctor(doctor).await
    }
    async fn find_doctor(&self, id: Uuid) -> anyhow::Result<Option<Doctor>> {
        self.inner.find_doctor(id).await
    }
    async fn find_doctor_by_user(&self, user_id: Uuid) -> anyhow::Result<Option<Doctor>> {
        self.inner.find_doctor_by_user(user_id).await
    }
    async fn list_doctors(&self) -> anyhow::Result<Vec<Doctor>> {
        self.inner.list_doctors().await
    }
    async fn book_if_free(&self, appointment: Appointment) -> anyhow::Result<BookingOutcome> {
        self.inner.book_if_free(appointment).await
    }
    async fn find_appointment(&self, id: Uuid) -> anyhow::Result<Option<Appointment>> {
        let found = self.inner.find_appointment(id).await;
        if self.armed.swap(false, Ordering::SeqCst) {
            self.reached.notify_one();
            self.release.notified().await;
        }
        found
    }
    async fn appointments_for_doctor(&self, doctor_id: Uuid) -> anyhow::Result<Vec<Appointment>> {
        self.inner.appointments_for_doctor(doctor_id).await
    }
    async fn appointments_for_patient(&self, patient_id: Uuid) -> anyhow::Result<Vec<Appointment>> {
        self.inner.appointments_for_patient(patient_id).await
    }
    async fn appointments_starting_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Appointment>> {
        self.inner.appointments_starting_between(from, to).await
    }
    async fn update_status(
        &self,
        id: Uuid,
        expected: AppointmentStatus,
        status: AppointmentStatus,
        rejection_reason: &str,
    ) -> anyhow::Result<Option<Appointment>> {
        self.inner.update_status(id, expected, status, rejection_reason).await
    }
    async fn update_payment(
        &self,
        id: Uuid,
        expected: &PaymentRecord,
        payment: &PaymentRecord,
    ) -> anyhow::Result<Option<Appointment>> {
        self.inner.update_payment(id, expected, payment).await
    }
    async fn mark_reminder_sent(&self, id: Uuid, window: ReminderWindow) -> anyhow::Result<()> {
        self.inner.mark_reminder_sent(id, window).await
    }
    async fn find_patient(&self, id: Uuid) -> anyhow::Result<Option<Patient>> {
        self.inner.find_patient(id).await
    }
    async fn save_patient(&self, patient: &Patient) -> anyhow::Result<Patient> {
        self.inner.save_patient(patient).await
    }
}

/// State sharing the fixture's tables and registry, with reads going through
/// a [`PausingStore`].
fn paused_state(f: &Fixture) -> (AppState, Arc<PausingStore>) {
    let store = Arc::new(PausingStore::new(f.test.store.clone()));
    let state = AppState::new(f.test.state.config.clone(), store.clone(), f.test.state.registry.clone());
    (state, store)
}

#[tokio::test]
async fn test_order_created_during_verification_cannot_undo_the_payment() {
    let f = confirmed_fixture().await;
    let gateway = Arc::new(RecordingGateway::default());
    let order = PaymentService::with_gateway(&f.test.state, gateway.clone())
        .create_order(f.patient.uuid(), f.appointment.id)
        .await
        .unwrap();

    let (paused, store) = paused_state(&f);
    let racing = PaymentService::with_gateway(&paused, gateway);
    let (patient_id, appointment_id) = (f.patient.uuid(), f.appointment.id);
    let create = tokio::spawn(async move { racing.create_order(patient_id, appointment_id).await });

    // The second checkout has read the unpaid record; the payment lands now.
    store.reached.notified().await;
    let verified = PaymentService::new(&f.test.state)
        .verify(
            patient_id,
            appointment_id,
            VerifyPaymentRequest {
                order_id: Some(order.order.id.clone()),
                payment_id: Some("pay_1".to_string()),
                signature: Some(expected_signature("rzp_test_secret", "order_recorded", "pay_1")),
            },
        )
        .await
        .unwrap();
    assert_eq!(verified.payment_id, "pay_1");

    store.release.notify_one();
    assert_matches!(create.await.unwrap(), Err(PaymentError::PaymentChanged));

    let stored = f.test.store.find_appointment(appointment_id).await.unwrap().unwrap();
    assert_eq!(stored.payment.payment_status, PaymentStatus::Paid);
    assert_eq!(stored.payment.payment_id, "pay_1");
    assert_eq!(stored.payment.order_id, "order_recorded");
}

#[tokio::test]
async fn test_concurrent_verifications_notify_once() {
    let f = confirmed_fixture().await;
    let (_, mut doctor_inbox) = f.test.listen(Role::Doctor, f.doctor.id).await;
    let order = PaymentService::with_gateway(&f.test.state, Arc::new(RecordingGateway::default()))
        .create_order(f.patient.uuid(), f.appointment.id)
        .await
        .unwrap();
    let request = |payment_id: &str| VerifyPaymentRequest {
        order_id: Some(order.order.id.clone()),
        payment_id: Some(payment_id.to_string()),
        signature: Some(expected_signature("rzp_test_secret", "order_recorded", payment_id)),
    };

    let (paused, store) = paused_state(&f);
    let slow = PaymentService::new(&paused);
    let slow_request = request("pay_slow");
    let (patient_id, appointment_id) = (f.patient.uuid(), f.appointment.id);
    let first = tokio::spawn(async move { slow.verify(patient_id, appointment_id, slow_request).await });

    store.reached.notified().await;
    PaymentService::new(&f.test.state)
        .verify(patient_id, appointment_id, request("pay_fast"))
        .await
        .unwrap();

    store.release.notify_one();
    assert_matches!(first.await.unwrap(), Err(PaymentError::PaymentChanged));

    let frames: Vec<_> = std::iter::from_fn(|| doctor_inbox.try_recv().ok()).collect();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].data["paymentId"], "pay_fast");
}
