use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use shared_models::appointment::PaymentStatus;
use shared_models::error::AppError;

/// Orders created while the gateway is unreachable carry this prefix.
pub const MOCK_ORDER_PREFIX: &str = "order_mock_";
pub const MOCK_PAYMENT_PREFIX: &str = "pay_mock_";
pub const CURRENCY: &str = "INR";

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Unauthorized access")]
    NotYourAppointment,

    #[error("Appointment must be confirmed before payment")]
    NotConfirmed,

    #[error("Payment already completed")]
    AlreadyPaid,

    #[error("Appointment was already paid with a different payment")]
    PaidWithDifferentPayment,

    #[error("Payment was updated concurrently, please retry")]
    PaymentChanged,

    #[error("Order does not match this appointment")]
    OrderMismatch,

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Payment verification failed")]
    VerificationFailed,

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::AppointmentNotFound | PaymentError::DoctorNotFound => AppError::NotFound(err.to_string()),
            PaymentError::NotYourAppointment => AppError::Forbidden(err.to_string()),
            PaymentError::PaidWithDifferentPayment | PaymentError::PaymentChanged => {
                AppError::Conflict(err.to_string())
            }
            PaymentError::NotConfirmed
            | PaymentError::AlreadyPaid
            | PaymentError::OrderMismatch
            | PaymentError::MissingField(_)
            | PaymentError::VerificationFailed => AppError::BadRequest(err.to_string()),
            PaymentError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}

/// Order creation body sent to the gateway. Amounts are in minor units.
#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    pub amount: u64,
    pub currency: String,
    pub receipt: String,
    pub notes: Value,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: u64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: String,
    pub amount: u64,
    pub currency: String,
    pub doctor_name: String,
    pub consultation_fees: f64,
    pub appointment_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedOrder {
    pub success: bool,
    pub order: OrderSummary,
    pub key_id: String,
}

/// Checkout callback. The gateway's own field names are accepted too.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    #[serde(alias = "razorpay_order_id")]
    pub order_id: Option<String>,
    #[serde(alias = "razorpay_payment_id")]
    pub payment_id: Option<String>,
    #[serde(alias = "razorpay_signature")]
    pub signature: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Verified {
    pub payment_id: String,
    pub mock: bool,
    /// The appointment was already paid with this payment id.
    pub replayed: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusResponse {
    pub payment_status: PaymentStatus,
    pub amount: f64,
    pub payment_id: String,
    pub order_id: String,
}
