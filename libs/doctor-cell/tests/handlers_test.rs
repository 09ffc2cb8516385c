use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use doctor_cell::router::doctor_routes;
use shared_database::{BookingOutcome, ClinicStore};
use shared_models::appointment::{Appointment, AppointmentStatus, PaymentRecord, PaymentStatus};
use shared_models::doctor::Doctor;
use shared_models::patient::{HistoryEntry, Patient};
use shared_realtime::Role;
use shared_utils::test_utils::{doctor_fixture, TestState, TestUser};

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
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn listing_body() -> Value {
    json!({
        "name": "Dr. Kavya Nair",
        "specialty": "Dermatology",
        "description": "Skin and hair",
        "consultationFees": 650,
        "qualifications": "MBBS, DDVL",
        "yearsOfExperience": 8,
        "contactNumber": "555-0142",
        "clinicName": "Nair Skin Clinic",
        "clinicAddress": "12 Lake Road",
        "registrationNumber": "KMC-4411",
        "gender": "Female",
        "languages": "English, Malayalam"
    })
}

async fn seed_doctor(test: &TestState, user: &TestUser) -> Doctor {
    let doctor = doctor_fixture(user.uuid(), "Dr. Asha Rao", 800.0);
    test.store.insert_doctor(doctor).await.unwrap()
}

async fn seed_appointment(test: &TestState, doctor_id: Uuid, patient_id: Uuid) -> Appointment {
    let start = Utc.with_ymd_and_hms(2030, 3, 4, 9, 0, 0).unwrap();
    let appointment = Appointment::pending(
        doctor_id,
        patient_id,
        "Vikram".to_string(),
        "555-0150".to_string(),
        start,
        start + Duration::hours(1),
        Some("Chest pain".to_string()),
        0.0,
    );
    match test.store.book_if_free(appointment).await.unwrap() {
        BookingOutcome::Booked(a) => a,
        other => panic!("seed booking failed: {:?}", other),
    }
}

#[tokio::test]
async fn test_create_listing_requires_doctor_role() {
    let test = TestState::default();
    let patient = TestUser::patient("p@example.com");

    let (status, body) = send(
        doctor_routes(test.state.clone()),
        "POST",
        "/create-listing",
        Some(test.bearer(&patient)),
        Some(listing_body()),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("doctor"));
}

#[tokio::test]
async fn test_create_listing_creates_then_updates() {
    let test = TestState::default();
    let user = TestUser::doctor("kavya@example.com");

    let (status, body) = send(
        doctor_routes(test.state.clone()),
        "POST",
        "/create-listing",
        Some(test.bearer(&user)),
        Some(listing_body()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["consultation_fee"], 650.0);
    assert_eq!(body["languages"], json!(["English", "Malayalam"]));
    assert_eq!(body["image_url"], shared_models::doctor::DEFAULT_DOCTOR_IMAGE);

    let mut again = listing_body();
    again["consultationFees"] = json!(700);
    let (status, body) = send(
        doctor_routes(test.state.clone()),
        "POST",
        "/create-listing",
        Some(test.bearer(&user)),
        Some(again),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["doctor"]["consultation_fee"], 700.0);
    assert_eq!(test.store.list_doctors().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_profile_update_rejects_unknown_fields() {
    let test = TestState::default();
    let user = TestUser::doctor("doc@example.com");
    let doctor = seed_doctor(&test, &user).await;

    let (status, _) = send(
        doctor_routes(test.state.clone()),
        "PUT",
        "/profile",
        Some(test.bearer(&user)),
        Some(json!({ "user_id": Uuid::new_v4() })),
    )
    .await;
    assert!(status.is_client_error());

    let (status, body) = send(
        doctor_routes(test.state.clone()),
        "PUT",
        "/profile",
        Some(test.bearer(&user)),
        Some(json!({ "clinicName": "Rao Heart Centre" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["clinic_name"], "Rao Heart Centre");
    assert_eq!(body["user_id"], doctor.user_id.to_string());
}

#[tokio::test]
async fn test_profile_missing_is_not_found() {
    let test = TestState::default();
    let user = TestUser::doctor("new@example.com");

    let (status, _) = send(doctor_routes(test.state.clone()), "GET", "/profile", Some(test.bearer(&user)), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_save_slots_groups_and_delete_drops_empty_day() {
    let test = TestState::default();
    let user = TestUser::doctor("doc@example.com");
    seed_doctor(&test, &user).await;

    let (status, body) = send(
        doctor_routes(test.state.clone()),
        "POST",
        "/save-slots",
        Some(test.bearer(&user)),
        Some(json!({ "slots": [
            { "day": "Wednesday", "start": "10:00", "end": "11:00" },
            { "day": "Wednesday", "start": "15:00", "end": "17:00" },
            { "day": "Friday", "start": "09:00" },
            { "day": "Friday", "start": "09:00", "end": "10:00" }
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["availability"][0]["day"], "Wednesday");
    assert_eq!(body["availability"][0]["slots"].as_array().unwrap().len(), 2);
    assert_eq!(body["availability"][1]["day"], "Friday");

    let (status, body) = send(
        doctor_routes(test.state.clone()),
        "DELETE",
        "/slots",
        Some(test.bearer(&user)),
        Some(json!({ "day": "Friday", "start": "09:00", "end": "10:00" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["availability"].as_array().unwrap().len(), 1);

    let (_, body) = send(doctor_routes(test.state.clone()), "GET", "/slots", Some(test.bearer(&user)), None).await;
    assert_eq!(body[0]["day"], "Wednesday");
}

#[tokio::test]
async fn test_save_slots_without_list_is_bad_request() {
    let test = TestState::default();
    let user = TestUser::doctor("doc@example.com");
    seed_doctor(&test, &user).await;

    let (status, body) = send(
        doctor_routes(test.state.clone()),
        "POST",
        "/save-slots",
        Some(test.bearer(&user)),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid slots data");
}

#[tokio::test]
async fn test_slots_for_date_lists_booked_intervals() {
    let test = TestState::default();
    let user = TestUser::doctor("doc@example.com");
    let doctor = seed_doctor(&test, &user).await;
    let booked = seed_appointment(&test, doctor.id, Uuid::new_v4()).await;

    // A cancelled one on the same day is not reported.
    let start = Utc.with_ymd_and_hms(2030, 3, 4, 11, 0, 0).unwrap();
    let cancelled = Appointment::pending(
        doctor.id,
        Uuid::new_v4(),
        "Other".to_string(),
        "555".to_string(),
        start,
        start + Duration::hours(1),
        None,
        0.0,
    );
    test.store.book_if_free(cancelled.clone()).await.unwrap();
    test.store
        .update_status(cancelled.id, AppointmentStatus::Pending, AppointmentStatus::Cancelled, "")
        .await
        .unwrap();

    // 2030-03-04 is a Monday.
    let (status, body) = send(
        doctor_routes(test.state.clone()),
        "GET",
        &format!("/{}/slots?date=2030-03-04", doctor.id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slots"], json!([{ "start": "09:00", "end": "12:00" }]));
    assert_eq!(body["booked"], json!([{ "start": "09:00", "end": "10:00" }]));
    assert_eq!(booked.status, AppointmentStatus::Pending);

    let (status, _) = send(
        doctor_routes(test.state.clone()),
        "GET",
        &format!("/{}/slots", doctor.id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_available_doctors_filters() {
    let test = TestState::default();
    let user = TestUser::doctor("doc@example.com");
    seed_doctor(&test, &user).await;

    let (status, body) = send(
        doctor_routes(test.state.clone()),
        "GET",
        "/available?specialty=CARDIO&maxFee=1000&day=Monday&slotTime=10:30",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = send(
        doctor_routes(test.state.clone()),
        "GET",
        "/available?day=Monday&slotTime=12:00",
        None,
        None,
    )
    .await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_status_update_notifies_patient() {
    let test = TestState::default();
    let user = TestUser::doctor("doc@example.com");
    let doctor = seed_doctor(&test, &user).await;
    let patient_id = Uuid::new_v4();
    let appointment = seed_appointment(&test, doctor.id, patient_id).await;
    let (_, mut inbox) = test.listen(Role::Patient, patient_id).await;

    let uri = format!("/appointments/{}/status", appointment.id);
    let (status, body) = send(
        doctor_routes(test.state.clone()),
        "PATCH",
        &uri,
        Some(test.bearer(&user)),
        Some(json!({ "status": "Confirmed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Confirmed");

    let event = inbox.try_recv().unwrap();
    assert_eq!(event.event, "appointmentStatus");
    assert_eq!(event.data["status"], "Confirmed");
    assert_eq!(event.data["doctorName"], "Dr. Asha Rao");
    assert!(event.data.get("rejectionReason").is_none());
    assert!(inbox.try_recv().is_err());

    let (status, _) = send(
        doctor_routes(test.state.clone()),
        "PATCH",
        &uri,
        Some(test.bearer(&user)),
        Some(json!({ "status": "Cancelled", "rejectionReason": "Emergency" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let event = inbox.try_recv().unwrap();
    assert_eq!(event.data["status"], "Cancelled");
    assert_eq!(event.data["rejectionReason"], "Emergency");
}

#[tokio::test]
async fn test_status_update_rejects_terminal_transitions() {
    let test = TestState::default();
    let user = TestUser::doctor("doc@example.com");
    let doctor = seed_doctor(&test, &user).await;
    let appointment = seed_appointment(&test, doctor.id, Uuid::new_v4()).await;

    let uri = format!("/appointments/{}/status", appointment.id);
    let (status, _) = send(
        doctor_routes(test.state.clone()),
        "PATCH",
        &uri,
        Some(test.bearer(&user)),
        Some(json!({ "status": "Completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_status_update_of_another_doctors_appointment_is_forbidden() {
    let test = TestState::default();
    let owner = TestUser::doctor("owner@example.com");
    let intruder = TestUser::doctor("intruder@example.com");
    let doctor = seed_doctor(&test, &owner).await;
    seed_doctor(&test, &intruder).await;
    let appointment = seed_appointment(&test, doctor.id, Uuid::new_v4()).await;

    let (status, _) = send(
        doctor_routes(test.state.clone()),
        "PATCH",
        &format!("/appointments/{}/status", appointment.id),
        Some(test.bearer(&intruder)),
        Some(json!({ "status": "Confirmed" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let stored = test.store.find_appointment(appointment.id).await.unwrap().unwrap();
    assert_eq!(stored.status, AppointmentStatus::Pending);
}

#[tokio::test]
async fn test_cancelling_one_appointment_leaves_the_paid_one_untouched() {
    let test = TestState::default();
    let user = TestUser::doctor("doc@example.com");
    let doctor = seed_doctor(&test, &user).await;

    let paid = seed_appointment(&test, doctor.id, Uuid::new_v4()).await;
    test.store
        .update_status(paid.id, AppointmentStatus::Pending, AppointmentStatus::Confirmed, "")
        .await
        .unwrap()
        .unwrap();
    let receipt = PaymentRecord {
        payment_status: PaymentStatus::Paid,
        payment_id: "pay_1".to_string(),
        order_id: "order_1".to_string(),
        amount: 800.0,
    };
    let paid = test
        .store
        .update_payment(paid.id, &paid.payment, &receipt)
        .await
        .unwrap()
        .unwrap();

    let start = Utc.with_ymd_and_hms(2030, 3, 4, 11, 0, 0).unwrap();
    let BookingOutcome::Booked(other) = test
        .store
        .book_if_free(Appointment::pending(
            doctor.id,
            Uuid::new_v4(),
            "Anita".to_string(),
            "555-0151".to_string(),
            start,
            start + Duration::hours(1),
            None,
            0.0,
        ))
        .await
        .unwrap()
    else {
        panic!("second slot should be free");
    };

    let (status, _) = send(
        doctor_routes(test.state.clone()),
        "PATCH",
        &format!("/appointments/{}/status", other.id),
        Some(test.bearer(&user)),
        Some(json!({ "status": "Cancelled", "rejectionReason": "Clinic closed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let cancelled = test.store.find_appointment(other.id).await.unwrap().unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    assert_eq!(cancelled.rejection_reason, "Clinic closed");

    let untouched = test.store.find_appointment(paid.id).await.unwrap().unwrap();
    assert_eq!(untouched, paid);
    assert_eq!(untouched.status, AppointmentStatus::Confirmed);
    assert_eq!(untouched.payment, receipt);
}

#[tokio::test]
async fn test_scheduled_appointments_fill_in_amount() {
    let test = TestState::default();
    let user = TestUser::doctor("doc@example.com");
    let doctor = seed_doctor(&test, &user).await;
    seed_appointment(&test, doctor.id, Uuid::new_v4()).await;

    let (status, body) = send(
        doctor_routes(test.state.clone()),
        "GET",
        "/appointments",
        Some(test.bearer(&user)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appointments"][0]["amount"], 800.0);
    assert_eq!(body["appointments"][0]["patientName"], "Vikram");
}

#[tokio::test]
async fn test_patient_history_synthesizes_timestamps() {
    let test = TestState::default();
    let user = TestUser::doctor("doc@example.com");
    seed_doctor(&test, &user).await;

    let mut patient = Patient::new(Uuid::new_v4(), "Lakshmi".to_string(), None);
    patient.medical_history = vec![
        HistoryEntry { question: "Allergies?".into(), answer: "Penicillin".into() },
        HistoryEntry { question: "Smoker?".into(), answer: "No".into() },
    ];
    test.store.save_patient(&patient).await.unwrap();

    let (status, body) = send(
        doctor_routes(test.state.clone()),
        "GET",
        &format!("/patient-history/{}", patient.id),
        Some(test.bearer(&user)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["patientName"], "Lakshmi");
    assert_eq!(body["history"][0]["question"], "Allergies?");
    assert_eq!(body["history"][1]["answer"], "No");
    assert!(body["history"][0]["createdAt"].is_string());

    let (status, _) = send(
        doctor_routes(test.state.clone()),
        "GET",
        &format!("/patient-history/{}", Uuid::new_v4()),
        Some(test.bearer(&user)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
