use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::error::{PortalResult, ValidationError};
use crate::models::{InstitutionRegistration, InstitutionType, RegistrationStatus};

/// Institution details collected by the registration form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationForm {
    pub institution_type: InstitutionType,
    pub name: String,
    pub location: String,
    pub city: String,
    pub district: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub services_description: String,
}

/// Reference to the uploaded legal document. Only the name travels with the
/// registration; the bytes live in external file storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRef {
    pub file_name: String,
}

impl RegistrationForm {
    fn text_fields(&self) -> [&str; 7] {
        [
            &self.name,
            &self.location,
            &self.city,
            &self.district,
            &self.contact_email,
            &self.contact_phone,
            &self.services_description,
        ]
    }

    /// Uniform non-blank check across every text field, then the document.
    /// Runs fully before any write is attempted.
    pub fn validate(&self, document: Option<&DocumentRef>) -> Result<(), ValidationError> {
        if self.text_fields().iter().any(|f| f.trim().is_empty()) {
            return Err(ValidationError::RequiredFields);
        }
        match document {
            Some(doc) if !doc.file_name.trim().is_empty() => Ok(()),
            _ => Err(ValidationError::MissingDocument),
        }
    }
}

/// Write side of the externally-hosted registration table.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    async fn insert(&self, registration: &InstitutionRegistration) -> PortalResult<()>;
}

/// In-memory store used without a hosted database and in tests.
#[derive(Default)]
pub struct InMemoryRegistrationStore {
    rows: DashMap<Uuid, InstitutionRegistration>,
}

impl InMemoryRegistrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl RegistrationStore for InMemoryRegistrationStore {
    async fn insert(&self, registration: &InstitutionRegistration) -> PortalResult<()> {
        self.rows.insert(registration.id, registration.clone());
        Ok(())
    }
}

/// Registration writes against the hosted `institution_registrations`
/// table. Status defaults to pending server-side; the insert does not set it.
pub struct PostgresRegistrationStore {
    pool: PgPool,
}

impl PostgresRegistrationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RegistrationStore for PostgresRegistrationStore {
    async fn insert(&self, registration: &InstitutionRegistration) -> PortalResult<()> {
        sqlx::query(
            "INSERT INTO institution_registrations
                 (id, institution_type, name, location, city, district,
                  contact_email, contact_phone, services_description, legal_document_name)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(registration.id)
        .bind(registration.institution_type.to_string())
        .bind(&registration.name)
        .bind(&registration.location)
        .bind(&registration.city)
        .bind(&registration.district)
        .bind(&registration.contact_email)
        .bind(&registration.contact_phone)
        .bind(&registration.services_description)
        .bind(&registration.legal_document_name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Validate and persist a registration. Validation failures produce zero
/// external side effects; on success the record starts out pending review.
pub async fn submit(
    form: RegistrationForm,
    document: Option<DocumentRef>,
    store: &dyn RegistrationStore,
) -> PortalResult<InstitutionRegistration> {
    form.validate(document.as_ref())?;
    let document = document.ok_or(ValidationError::MissingDocument)?;

    let registration = InstitutionRegistration {
        id: Uuid::new_v4(),
        institution_type: form.institution_type,
        name: form.name,
        location: form.location,
        city: form.city,
        district: form.district,
        contact_email: form.contact_email,
        contact_phone: form.contact_phone,
        services_description: form.services_description,
        legal_document_name: document.file_name,
        status: RegistrationStatus::Pending,
        created_at: Utc::now(),
    };

    store.insert(&registration).await?;
    info!(
        registration_id = %registration.id,
        institution_type = %registration.institution_type,
        "institution registration submitted"
    );

    Ok(registration)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> RegistrationForm {
        RegistrationForm {
            institution_type: InstitutionType::Hospital,
            name: "Himal Community Hospital".to_string(),
            location: "Lakeside, Pokhara".to_string(),
            city: "Pokhara".to_string(),
            district: "Kaski".to_string(),
            contact_email: "info@himal.example".to_string(),
            contact_phone: "061555000".to_string(),
            services_description: "OPD, Emergency, Pharmacy".to_string(),
        }
    }

    fn document() -> DocumentRef {
        DocumentRef {
            file_name: "license.pdf".to_string(),
        }
    }

    #[tokio::test]
    async fn valid_submission_starts_pending() {
        let store = InMemoryRegistrationStore::new();
        let registration = submit(form(), Some(document()), &store).await.unwrap();

        assert_eq!(registration.status, RegistrationStatus::Pending);
        assert_eq!(registration.legal_document_name, "license.pdf");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn blank_services_description_blocks_the_insert() {
        let store = InMemoryRegistrationStore::new();
        let mut form = form();
        form.services_description = String::new();

        let err = submit(form, Some(document()), &store).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::PortalError::Validation(ValidationError::RequiredFields)
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn whitespace_only_fields_count_as_blank() {
        let store = InMemoryRegistrationStore::new();
        let mut form = form();
        form.city = "   ".to_string();

        assert!(submit(form, Some(document()), &store).await.is_err());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn missing_document_is_its_own_error() {
        let store = InMemoryRegistrationStore::new();

        let err = submit(form(), None, &store).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::PortalError::Validation(ValidationError::MissingDocument)
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn field_check_runs_before_document_check() {
        let mut incomplete = form();
        incomplete.name = String::new();

        // Both preconditions fail; the field error is reported first
        assert_eq!(
            incomplete.validate(None).unwrap_err(),
            ValidationError::RequiredFields
        );
    }
}
