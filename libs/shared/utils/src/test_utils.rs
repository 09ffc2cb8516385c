use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use tokio::sync::mpsc;
use uuid::Uuid;

use shared_config::{AppConfig, StorageBackend};
use shared_database::InMemoryStore;
use shared_models::auth::User;
use shared_models::doctor::{DayAvailability, DayOfWeek, Doctor, Gender, TimeRange, DEFAULT_DOCTOR_IMAGE};
use shared_realtime::{ConnectionId, ConnectionRegistry, Envelope, InProcessRegistry, Role};

use crate::state::AppState;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub payment_key_id: String,
    pub payment_key_secret: String,
    pub payment_api_base: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            payment_key_id: "rzp_test_key".to_string(),
            payment_key_secret: "rzp_test_secret".to_string(),
            // Nothing listens here, so gateway calls fail fast into mock orders.
            payment_api_base: "http://127.0.0.1:9".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_service_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            storage_backend: StorageBackend::Memory,
            redis_url: None,
            payment_key_id: self.payment_key_id.clone(),
            payment_key_secret: self.payment_key_secret.clone(),
            payment_api_base: self.payment_api_base.clone(),
            port: 0,
            enforce_availability_window: false,
            default_consultation_fee: 500.0,
            reminder_interval_secs: 60,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
    pub name: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::new("test@example.com", "patient")
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
            name: "Test User".to_string(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn uuid(&self) -> Uuid {
        Uuid::parse_str(&self.id).expect("test user ids are UUIDs")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: Some(json!({ "role": self.role, "name": self.name })),
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        // Identity providers put "authenticated" in `role`; the app role
        // travels in user_metadata.
        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": "authenticated",
            "user_metadata": { "role": user.role, "name": user.name },
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// In-memory application state with typed handles on the concrete store and
/// registry, so tests can seed data and listen for notifications.
pub struct TestState {
    pub config: TestConfig,
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub registry: Arc<InProcessRegistry>,
}

impl Default for TestState {
    fn default() -> Self {
        Self::with_config(TestConfig::default())
    }
}

impl TestState {
    pub fn with_config(config: TestConfig) -> Self {
        Self::from_app_config(config.to_app_config(), config)
    }

    pub fn from_app_config(app_config: AppConfig, config: TestConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let registry = Arc::new(InProcessRegistry::new());
        let state = AppState::new(Arc::new(app_config), store.clone(), registry.clone());
        Self { config, state, store, registry }
    }

    pub fn token_for(&self, user: &TestUser) -> String {
        JwtTestUtils::create_test_token(user, &self.config.jwt_secret, Some(1))
    }

    pub fn bearer(&self, user: &TestUser) -> String {
        format!("Bearer {}", self.token_for(user))
    }

    /// A fake socket registered under `(role, user_id)`.
    pub async fn listen(&self, role: Role, user_id: Uuid) -> (ConnectionId, mpsc::UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection = Uuid::new_v4();
        self.registry.attach(connection, tx).await;
        self.registry.register(role, user_id, connection).await;
        (connection, rx)
    }
}

/// A doctor owned by `user_id` who works Monday 09:00-12:00.
pub fn doctor_fixture(user_id: Uuid, name: &str, fee: f64) -> Doctor {
    Doctor {
        id: Uuid::new_v4(),
        user_id,
        name: name.to_string(),
        specialty: "Cardiology".to_string(),
        description: "Heart specialist".to_string(),
        consultation_fee: fee,
        image_url: DEFAULT_DOCTOR_IMAGE.to_string(),
        qualifications: "MBBS, MD".to_string(),
        years_of_experience: 12,
        contact_number: "555-0100".to_string(),
        clinic_name: "City Clinic".to_string(),
        clinic_address: "1 Main Street".to_string(),
        registration_number: "REG-001".to_string(),
        gender: Gender::Female,
        languages: vec!["English".to_string(), "Hindi".to_string()],
        linked_in: None,
        awards: None,
        services: None,
        availability: vec![DayAvailability {
            day: DayOfWeek::Monday,
            slots: vec![TimeRange::new("09:00", "12:00")],
        }],
        created_at: Utc::now(),
    }
}
