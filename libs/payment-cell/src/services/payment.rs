use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use shared_database::ClinicStore;
use shared_models::appointment::{Appointment, AppointmentStatus, PaymentRecord, PaymentStatus};
use shared_models::doctor::Doctor;
use shared_realtime::{events, ConnectionRegistry, Role};
use shared_utils::AppState;

use crate::models::{
    CreatedOrder, GatewayOrder, OrderRequest, OrderSummary, PaymentError, PaymentStatusResponse,
    Verified, VerifyPaymentRequest, CURRENCY, MOCK_ORDER_PREFIX, MOCK_PAYMENT_PREFIX,
};
use crate::services::gateway::{PaymentGateway, RazorpayGateway};
use crate::services::signature::verify_signature;

pub struct PaymentService {
    store: Arc<dyn ClinicStore>,
    registry: Arc<dyn ConnectionRegistry>,
    gateway: Arc<dyn PaymentGateway>,
    key_id: String,
    key_secret: String,
}

impl PaymentService {
    pub fn new(state: &AppState) -> Self {
        Self::with_gateway(state, Arc::new(RazorpayGateway::new(&state.config)))
    }

    pub fn with_gateway(state: &AppState, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self {
            store: state.store.clone(),
            registry: state.registry.clone(),
            gateway,
            key_id: state.config.payment_key_id.clone(),
            key_secret: state.config.payment_key_secret.clone(),
        }
    }

    /// Opens a gateway order for the consultation fee of a confirmed
    /// appointment. Falls back to a mock order when the gateway is unusable.
    #[instrument(skip(self), fields(patient_id = %patient_id, appointment_id = %appointment_id))]
    pub async fn create_order(&self, patient_id: Uuid, appointment_id: Uuid) -> Result<CreatedOrder, PaymentError> {
        let appointment = self.owned_appointment(patient_id, appointment_id).await?;
        if appointment.status != AppointmentStatus::Confirmed {
            return Err(PaymentError::NotConfirmed);
        }
        if appointment.payment.payment_status == PaymentStatus::Paid {
            return Err(PaymentError::AlreadyPaid);
        }

        let doctor = self.doctor_of(&appointment).await?;
        let fee = doctor.consultation_fee;
        let request = OrderRequest {
            amount: (fee * 100.0).round() as u64,
            currency: CURRENCY.to_string(),
            receipt: format!("appointment_{}", appointment.id),
            notes: json!({
                "appointmentId": appointment.id,
                "doctorId": doctor.id,
                "patientId": patient_id,
                "doctorName": doctor.name,
                "patientName": appointment.patient_name,
            }),
        };

        let order = match self.gateway.create_order(&request).await {
            Ok(order) => order,
            Err(e) => {
                warn!("Gateway order creation failed, switching to mock order: {}", e);
                GatewayOrder {
                    id: format!("{}{}", MOCK_ORDER_PREFIX, Utc::now().timestamp_millis()),
                    amount: request.amount,
                    currency: request.currency.clone(),
                }
            }
        };

        let record = PaymentRecord {
            payment_status: PaymentStatus::Pending,
            payment_id: String::new(),
            order_id: order.id.clone(),
            amount: fee,
        };
        self.store
            .update_payment(appointment.id, &appointment.payment, &record)
            .await?
            .ok_or(PaymentError::PaymentChanged)?;

        info!("Order {} opened for appointment {}", order.id, appointment.id);

        Ok(CreatedOrder {
            success: true,
            order: OrderSummary {
                id: order.id,
                amount: order.amount,
                currency: order.currency,
                doctor_name: doctor.name,
                consultation_fees: fee,
                appointment_id: appointment.id,
            },
            key_id: self.key_id.clone(),
        })
    }

    /// Checks the checkout callback against the stored order and marks the
    /// appointment paid. Only orders this service created as mocks skip the
    /// signature check.
    #[instrument(skip(self, request), fields(patient_id = %patient_id, appointment_id = %appointment_id))]
    pub async fn verify(
        &self,
        patient_id: Uuid,
        appointment_id: Uuid,
        request: VerifyPaymentRequest,
    ) -> Result<Verified, PaymentError> {
        let appointment = self.owned_appointment(patient_id, appointment_id).await?;
        let stored = &appointment.payment;

        if stored.payment_status == PaymentStatus::Paid {
            return match request.payment_id.as_deref() {
                Some(id) if id == stored.payment_id => {
                    debug!("Payment {} already recorded for appointment {}", id, appointment.id);
                    Ok(Verified {
                        payment_id: stored.payment_id.clone(),
                        mock: stored.order_id.starts_with(MOCK_ORDER_PREFIX),
                        replayed: true,
                    })
                }
                _ => Err(PaymentError::PaidWithDifferentPayment),
            };
        }

        let order_id = non_empty(request.order_id).ok_or(PaymentError::MissingField("orderId"))?;
        if stored.order_id.is_empty() || stored.order_id != order_id {
            warn!("Order {} does not match stored order of appointment {}", order_id, appointment.id);
            return Err(PaymentError::OrderMismatch);
        }

        let mock = stored.order_id.starts_with(MOCK_ORDER_PREFIX);
        let payment_id = if mock {
            non_empty(request.payment_id)
                .unwrap_or_else(|| format!("{}{}", MOCK_PAYMENT_PREFIX, Utc::now().timestamp_millis()))
        } else {
            let payment_id = non_empty(request.payment_id).ok_or(PaymentError::MissingField("paymentId"))?;
            let signature = non_empty(request.signature).ok_or(PaymentError::MissingField("signature"))?;

            if !verify_signature(&self.key_secret, &order_id, &payment_id, &signature) {
                warn!("Signature mismatch for order {} of appointment {}", order_id, appointment.id);
                let failed = PaymentRecord {
                    payment_status: PaymentStatus::Failed,
                    ..stored.clone()
                };
                self.store
                    .update_payment(appointment.id, stored, &failed)
                    .await?
                    .ok_or(PaymentError::PaymentChanged)?;
                return Err(PaymentError::VerificationFailed);
            }
            payment_id
        };

        let paid = PaymentRecord {
            payment_status: PaymentStatus::Paid,
            payment_id: payment_id.clone(),
            ..stored.clone()
        };
        // Only the writer that still sees the unpaid record notifies.
        let updated = self
            .store
            .update_payment(appointment.id, stored, &paid)
            .await?
            .ok_or(PaymentError::PaymentChanged)?;

        info!("Appointment {} paid with {}", updated.id, payment_id);

        self.registry
            .notify(
                Role::Doctor,
                updated.doctor_id,
                events::PAYMENT_RECEIVED,
                json!({
                    "appointmentId": updated.id,
                    "patientName": updated.patient_name,
                    "amount": updated.payment.amount,
                    "paymentId": payment_id,
                }),
            )
            .await;

        Ok(Verified {
            payment_id,
            mock,
            replayed: false,
        })
    }

    pub async fn status(&self, patient_id: Uuid, appointment_id: Uuid) -> Result<PaymentStatusResponse, PaymentError> {
        let appointment = self.owned_appointment(patient_id, appointment_id).await?;

        let amount = if appointment.payment.amount > 0.0 {
            appointment.payment.amount
        } else {
            self.doctor_of(&appointment).await?.consultation_fee
        };

        Ok(PaymentStatusResponse {
            payment_status: appointment.payment.payment_status,
            amount,
            payment_id: appointment.payment.payment_id,
            order_id: appointment.payment.order_id,
        })
    }

    async fn owned_appointment(&self, patient_id: Uuid, appointment_id: Uuid) -> Result<Appointment, PaymentError> {
        let appointment = self
            .store
            .find_appointment(appointment_id)
            .await?
            .ok_or(PaymentError::AppointmentNotFound)?;

        if appointment.patient_id != patient_id {
            warn!("Patient {} tried to access payment of appointment {}", patient_id, appointment.id);
            return Err(PaymentError::NotYourAppointment);
        }
        Ok(appointment)
    }

    async fn doctor_of(&self, appointment: &Appointment) -> Result<Doctor, PaymentError> {
        self.store
            .find_doctor(appointment.doctor_id)
            .await?
            .ok_or(PaymentError::DoctorNotFound)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
