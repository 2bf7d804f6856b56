use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::PortalResult;
use crate::models::{Doctor, Hospital, Institution, InstitutionType, LabTest};

/// Supplies hospital / doctor / lab-test listings plus the directory of
/// approved institutions hosted in the external data store.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Hospital listings matching a free-text query.
    async fn hospitals(&self, query: Option<&str>) -> PortalResult<Vec<Hospital>>;

    /// A single hospital listing by id.
    async fn hospital(&self, id: &str) -> PortalResult<Option<Hospital>>;

    /// Doctor listings, optionally narrowed to one specialty.
    async fn doctors(&self, specialty: Option<&str>) -> PortalResult<Vec<Doctor>>;

    /// Lab-test listings.
    async fn lab_tests(&self) -> PortalResult<Vec<LabTest>>;

    /// Active hospitals from the externally-hosted institution directory.
    async fn active_institutions(&self, query: Option<&str>) -> PortalResult<Vec<Institution>>;
}

fn hospital_matches(hospital: &Hospital, query: &str) -> bool {
    let query_lower = query.to_lowercase();
    hospital.name.to_lowercase().contains(&query_lower)
        || hospital.name_nepali.contains(query)
        || hospital
            .specialties
            .iter()
            .any(|s| s.to_lowercase().contains(&query_lower))
}

/// Static listing data, mirroring what the portal shows before any external
/// directory entries exist.
#[derive(Debug, Clone, Default)]
pub struct SampleCatalog;

impl SampleCatalog {
    pub fn new() -> Self {
        Self
    }

    pub fn sample_hospitals() -> Vec<Hospital> {
        vec![
            Hospital {
                id: "1".to_string(),
                name: "Tribhuvan University Teaching Hospital".to_string(),
                name_nepali: "त्रिभुवन विश्वविद्यालय शिक्षण अस्पताल".to_string(),
                address: "Maharajgunj, Kathmandu".to_string(),
                specialties: vec![
                    "Cardiology".to_string(),
                    "Neurology".to_string(),
                    "Pediatrics".to_string(),
                    "Emergency".to_string(),
                ],
                rating: 4.5,
                open_hours: "24/7".to_string(),
                doctors_available: 45,
                distance_km: 2.3,
                consultation_fee: 1500,
            },
            Hospital {
                id: "2".to_string(),
                name: "Norvic International Hospital".to_string(),
                name_nepali: "नर्भिक अन्तर्राष्ट्रिय अस्पताल".to_string(),
                address: "Thapathali, Kathmandu".to_string(),
                specialties: vec![
                    "Orthopedics".to_string(),
                    "Dermatology".to_string(),
                    "General Medicine".to_string(),
                ],
                rating: 4.3,
                open_hours: "6:00 AM - 10:00 PM".to_string(),
                doctors_available: 32,
                distance_km: 3.1,
                consultation_fee: 2000,
            },
            Hospital {
                id: "3".to_string(),
                name: "B&B Hospital".to_string(),
                name_nepali: "बी एण्ड बी अस्पताल".to_string(),
                address: "Gwarko, Lalitpur".to_string(),
                specialties: vec![
                    "Gastroenterology".to_string(),
                    "Pulmonology".to_string(),
                    "Oncology".to_string(),
                ],
                rating: 4.2,
                open_hours: "24/7".to_string(),
                doctors_available: 28,
                distance_km: 4.7,
                consultation_fee: 1800,
            },
            Hospital {
                id: "4".to_string(),
                name: "Grande International Hospital".to_string(),
                name_nepali: "ग्रान्डे अन्तर्राष्ट्रिय अस्पताल".to_string(),
                address: "Dhapasi, Kathmandu".to_string(),
                specialties: vec![
                    "Emergency".to_string(),
                    "ICU".to_string(),
                    "Surgery".to_string(),
                    "Radiology".to_string(),
                ],
                rating: 4.4,
                open_hours: "24/7".to_string(),
                doctors_available: 38,
                distance_km: 5.2,
                consultation_fee: 2200,
            },
        ]
    }

    pub fn sample_doctors() -> Vec<Doctor> {
        vec![
            Doctor {
                id: "1".to_string(),
                name: "Dr. Rajesh Sharma".to_string(),
                name_nepali: "डा. राजेश शर्मा".to_string(),
                specialty: "General Physician".to_string(),
                hospital: "Tribhuvan University Teaching Hospital".to_string(),
                experience_years: 15,
                rating: 4.8,
                consultation_fee: 800,
                availability: vec![
                    "10:00 AM".to_string(),
                    "2:00 PM".to_string(),
                    "4:30 PM".to_string(),
                ],
            },
            Doctor {
                id: "2".to_string(),
                name: "Dr. Sunita Thapa".to_string(),
                name_nepali: "डा. सुनिता थापा".to_string(),
                specialty: "Cardiology".to_string(),
                hospital: "Norvic International Hospital".to_string(),
                experience_years: 12,
                rating: 4.9,
                consultation_fee: 1200,
                availability: vec![
                    "9:00 AM".to_string(),
                    "11:30 AM".to_string(),
                    "3:00 PM".to_string(),
                ],
            },
            Doctor {
                id: "3".to_string(),
                name: "Dr. Amit Ghimire".to_string(),
                name_nepali: "डा. अमित घिमिरे".to_string(),
                specialty: "Dermatology".to_string(),
                hospital: "Hams Hospital".to_string(),
                experience_years: 10,
                rating: 4.7,
                consultation_fee: 1000,
                availability: vec![
                    "1:00 PM".to_string(),
                    "3:30 PM".to_string(),
                    "5:00 PM".to_string(),
                ],
            },
        ]
    }

    pub fn sample_lab_tests() -> Vec<LabTest> {
        vec![
            LabTest {
                id: "1".to_string(),
                name: "Complete Blood Count (CBC)".to_string(),
                description: Some("Screens overall health and common disorders".to_string()),
                price: 500,
                home_collection_available: true,
                report_delivery_days: 1,
            },
            LabTest {
                id: "2".to_string(),
                name: "Lipid Profile".to_string(),
                description: Some("Cholesterol and triglyceride levels".to_string()),
                price: 900,
                home_collection_available: true,
                report_delivery_days: 1,
            },
            LabTest {
                id: "3".to_string(),
                name: "Thyroid Function Test (TFT)".to_string(),
                description: Some("TSH, T3 and T4 levels".to_string()),
                price: 1200,
                home_collection_available: false,
                report_delivery_days: 2,
            },
        ]
    }
}

#[async_trait]
impl Catalog for SampleCatalog {
    async fn hospitals(&self, query: Option<&str>) -> PortalResult<Vec<Hospital>> {
        let mut hospitals = Self::sample_hospitals();
        if let Some(query) = query.filter(|q| !q.trim().is_empty()) {
            hospitals.retain(|h| hospital_matches(h, query.trim()));
        }
        Ok(hospitals)
    }

    async fn hospital(&self, id: &str) -> PortalResult<Option<Hospital>> {
        Ok(Self::sample_hospitals().into_iter().find(|h| h.id == id))
    }

    async fn doctors(&self, specialty: Option<&str>) -> PortalResult<Vec<Doctor>> {
        let mut doctors = Self::sample_doctors();
        if let Some(specialty) = specialty.filter(|s| !s.trim().is_empty()) {
            let needle = specialty.trim().to_lowercase();
            doctors.retain(|d| d.specialty.to_lowercase().contains(&needle));
        }
        Ok(doctors)
    }

    async fn lab_tests(&self) -> PortalResult<Vec<LabTest>> {
        Ok(Self::sample_lab_tests())
    }

    async fn active_institutions(&self, _query: Option<&str>) -> PortalResult<Vec<Institution>> {
        // No directory without a hosted database
        Ok(Vec::new())
    }
}

/// Catalog backed by the hosted database for the institution directory;
/// listing data still comes from the static samples.
pub struct PostgresCatalog {
    pool: PgPool,
    samples: SampleCatalog,
}

impl PostgresCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            samples: SampleCatalog::new(),
        }
    }
}

#[async_trait]
impl Catalog for PostgresCatalog {
    async fn hospitals(&self, query: Option<&str>) -> PortalResult<Vec<Hospital>> {
        self.samples.hospitals(query).await
    }

    async fn hospital(&self, id: &str) -> PortalResult<Option<Hospital>> {
        self.samples.hospital(id).await
    }

    async fn doctors(&self, specialty: Option<&str>) -> PortalResult<Vec<Doctor>> {
        self.samples.doctors(specialty).await
    }

    async fn lab_tests(&self) -> PortalResult<Vec<LabTest>> {
        self.samples.lab_tests().await
    }

    async fn active_institutions(&self, query: Option<&str>) -> PortalResult<Vec<Institution>> {
        let pattern = query
            .filter(|q| !q.trim().is_empty())
            .map(|q| format!("%{}%", q.trim()));

        let rows = sqlx::query(
            "SELECT id, institution_type, name, location, city, district,
                    contact_email, contact_phone, services_description, is_active
             FROM approved_institutions
             WHERE is_active = TRUE
               AND institution_type = 'hospital'
               AND ($1::text IS NULL
                    OR name ILIKE $1
                    OR city ILIKE $1
                    OR services_description ILIKE $1)
             ORDER BY name",
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let institution_type: String = row.try_get("institution_type")?;
                Ok(Institution {
                    id: row.try_get::<Uuid, _>("id")?,
                    institution_type: match institution_type.as_str() {
                        "pathology_lab" => InstitutionType::PathologyLab,
                        _ => InstitutionType::Hospital,
                    },
                    name: row.try_get("name")?,
                    location: row.try_get("location")?,
                    city: row.try_get("city")?,
                    district: row.try_get("district")?,
                    contact_email: row.try_get("contact_email")?,
                    contact_phone: row.try_get("contact_phone")?,
                    services_description: row.try_get("services_description")?,
                    is_active: row.try_get("is_active")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn free_text_filter_is_case_insensitive() {
        let catalog = SampleCatalog::new();

        let by_name = catalog.hospitals(Some("norvic")).await.unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].name, "Norvic International Hospital");

        let by_specialty = catalog.hospitals(Some("CARDIO")).await.unwrap();
        assert_eq!(by_specialty.len(), 1);

        let by_nepali = catalog.hospitals(Some("नर्भिक")).await.unwrap();
        assert_eq!(by_nepali.len(), 1);
    }

    #[tokio::test]
    async fn blank_query_returns_everything() {
        let catalog = SampleCatalog::new();
        assert_eq!(catalog.hospitals(Some("  ")).await.unwrap().len(), 4);
        assert_eq!(catalog.hospitals(None).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn unmatched_query_returns_empty() {
        let catalog = SampleCatalog::new();
        assert!(catalog.hospitals(Some("zzz")).await.unwrap().is_empty());
    }

    #[test]
    fn hospital_card_truncates_specialties() {
        let hospital = &SampleCatalog::sample_hospitals()[0];
        assert_eq!(hospital.specialties.len(), 4);
        assert_eq!(hospital.card().specialties.len(), 3);
    }

    #[test]
    fn institution_card_truncates_services() {
        let institution = Institution {
            id: Uuid::new_v4(),
            institution_type: InstitutionType::Hospital,
            name: "Test Hospital".to_string(),
            location: "Baneshwor".to_string(),
            city: "Kathmandu".to_string(),
            district: "Kathmandu".to_string(),
            contact_email: "info@test.example".to_string(),
            contact_phone: "015550000".to_string(),
            services_description: "OPD, Emergency, Pharmacy, Radiology".to_string(),
            is_active: true,
        };

        let card = institution.card();
        assert_eq!(card.services, vec!["OPD", "Emergency", "Pharmacy"]);
    }
}
