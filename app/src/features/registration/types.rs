// Core types for the registration flow

use std::collections::BTreeMap;

use crate::services::client::types::{
    DocumentSource, ProfileAttributes, ProfileChanges, UserRole,
};
use crate::services::config::BucketsConfig;

/// The identity/vehicle documents a registration can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum DocumentKind {
    ValidId,
    VehiclePhoto,
    RegistrationCertificate,
    DriversLicense,
}

impl DocumentKind {
    /// Documents a role must provide: passengers one identity photo, drivers
    /// the vehicle photo, registration certificate, and license photo.
    pub fn required_for(role: UserRole) -> &'static [DocumentKind] {
        match role {
            UserRole::Passenger => &[DocumentKind::ValidId],
            UserRole::Driver => &[
                DocumentKind::VehiclePhoto,
                DocumentKind::RegistrationCertificate,
                DocumentKind::DriversLicense,
            ],
        }
    }

    /// Form field key used in validation error maps.
    pub fn field_key(self) -> &'static str {
        match self {
            DocumentKind::ValidId => "validId",
            DocumentKind::VehiclePhoto => "vehicleImage",
            DocumentKind::RegistrationCertificate => "certificateOfRegistration",
            DocumentKind::DriversLicense => "driversLicense",
        }
    }

    /// Storage bucket this document kind is uploaded to.
    pub fn bucket(self, buckets: &BucketsConfig) -> &str {
        match self {
            DocumentKind::ValidId => &buckets.valid_id,
            DocumentKind::VehiclePhoto => &buckets.vehicles,
            DocumentKind::RegistrationCertificate => &buckets.certificates,
            DocumentKind::DriversLicense => &buckets.driver_licenses,
        }
    }

    pub(crate) fn missing_message(self) -> &'static str {
        match self {
            DocumentKind::ValidId => "Valid ID photo is required",
            DocumentKind::VehiclePhoto => "Vehicle image is required",
            DocumentKind::RegistrationCertificate => "Certificate of Registration is required",
            DocumentKind::DriversLicense => "Driver's license is required",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DocumentKind::ValidId => "valid ID",
            DocumentKind::VehiclePhoto => "vehicle photo",
            DocumentKind::RegistrationCertificate => "certificate of registration",
            DocumentKind::DriversLicense => "driver's license",
        };
        f.write_str(name)
    }
}

/// Everything a registration screen collects before submission. Driver-only
/// fields stay empty for passengers.
#[derive(Debug, Clone)]
pub struct RegistrationForm {
    pub role: UserRole,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub contact_no: String,
    pub license_number: String,
    pub plate_number: String,
    pub vehicle_model: String,
    pub documents: BTreeMap<DocumentKind, DocumentSource>,
}

impl RegistrationForm {
    pub fn new(role: UserRole) -> Self {
        Self {
            role,
            email: String::new(),
            password: String::new(),
            confirm_password: String::new(),
            first_name: String::new(),
            middle_name: String::new(),
            last_name: String::new(),
            contact_no: String::new(),
            license_number: String::new(),
            plate_number: String::new(),
            vehicle_model: String::new(),
            documents: BTreeMap::new(),
        }
    }

    pub fn attach_document(&mut self, kind: DocumentKind, source: DocumentSource) {
        self.documents.insert(kind, source);
    }

    /// Signup metadata for the backend's profile trigger. Values are trimmed
    /// and the plate number normalized to uppercase.
    pub(crate) fn profile_attributes(&self) -> ProfileAttributes {
        let optional = |value: &str| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        };

        ProfileAttributes {
            user_type: self.role,
            first_name: self.first_name.trim().to_string(),
            middle_name: optional(&self.middle_name),
            last_name: self.last_name.trim().to_string(),
            contact_no: self.contact_no.trim().to_string(),
            license_number: match self.role {
                UserRole::Driver => optional(&self.license_number),
                UserRole::Passenger => None,
            },
            plate_number: match self.role {
                UserRole::Driver => optional(&self.plate_number.to_uppercase()),
                UserRole::Passenger => None,
            },
            vehicle_model: match self.role {
                UserRole::Driver => optional(&self.vehicle_model),
                UserRole::Passenger => None,
            },
        }
    }
}

/// A document that could not be uploaded; the account itself stays valid.
#[derive(Debug, Clone)]
pub struct DocumentWarning {
    pub kind: DocumentKind,
    pub message: String,
}

/// Outcome of a completed registration attempt. Warnings record the
/// best-effort parts that did not land; nothing in here was rolled back.
#[derive(Debug, Clone)]
pub struct RegistrationReport {
    pub account_id: String,
    pub pending_verification: bool,
    pub profile_provisioned: bool,
    pub document_urls: BTreeMap<DocumentKind, String>,
    pub document_warnings: Vec<DocumentWarning>,
    pub profile_warning: Option<String>,
}

impl RegistrationReport {
    /// True when every best-effort step landed as well.
    pub fn is_clean(&self) -> bool {
        self.profile_provisioned
            && self.document_warnings.is_empty()
            && self.profile_warning.is_none()
    }
}

impl ProfileChanges {
    /// Build the partial profile update carrying the document URLs that
    /// uploaded successfully.
    pub fn from_document_urls(urls: &BTreeMap<DocumentKind, String>) -> Self {
        let mut changes = ProfileChanges::default();
        for (kind, url) in urls {
            match kind {
                DocumentKind::ValidId => changes.valid_id_url = Some(url.clone()),
                DocumentKind::VehiclePhoto => changes.vehicle_image_url = Some(url.clone()),
                DocumentKind::RegistrationCertificate => {
                    changes.certificate_of_registration_url = Some(url.clone())
                }
                DocumentKind::DriversLicense => changes.drivers_license_url = Some(url.clone()),
            }
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_documents_per_role() {
        assert_eq!(
            DocumentKind::required_for(UserRole::Passenger),
            &[DocumentKind::ValidId]
        );
        assert_eq!(
            DocumentKind::required_for(UserRole::Driver),
            &[
                DocumentKind::VehiclePhoto,
                DocumentKind::RegistrationCertificate,
                DocumentKind::DriversLicense,
            ]
        );
    }

    #[test]
    fn test_bucket_selection() {
        let buckets = BucketsConfig::default();
        assert_eq!(DocumentKind::ValidId.bucket(&buckets), "valid-id");
        assert_eq!(DocumentKind::VehiclePhoto.bucket(&buckets), "vehicles");
        assert_eq!(
            DocumentKind::RegistrationCertificate.bucket(&buckets),
            "certificate-of-registration"
        );
        assert_eq!(DocumentKind::DriversLicense.bucket(&buckets), "driver-id");
    }

    #[test]
    fn test_profile_attributes_normalization() {
        let mut form = RegistrationForm::new(UserRole::Driver);
        form.first_name = "  Ben ".to_string();
        form.middle_name = "   ".to_string();
        form.last_name = "Reyes".to_string();
        form.contact_no = "09171234567".to_string();
        form.license_number = "N01-23-456789".to_string();
        form.plate_number = "abc 1234".to_string();
        form.vehicle_model = "Mirage G4".to_string();

        let attributes = form.profile_attributes();
        assert_eq!(attributes.first_name, "Ben");
        assert!(attributes.middle_name.is_none());
        assert_eq!(attributes.plate_number.as_deref(), Some("ABC 1234"));
        assert_eq!(attributes.user_type, UserRole::Driver);
    }

    #[test]
    fn test_passenger_attributes_drop_driver_fields() {
        let mut form = RegistrationForm::new(UserRole::Passenger);
        form.first_name = "Ana".to_string();
        form.last_name = "Cruz".to_string();
        form.contact_no = "09171234567".to_string();
        // Stale screen state must not leak into passenger metadata.
        form.plate_number = "ABC 1234".to_string();

        let attributes = form.profile_attributes();
        assert!(attributes.license_number.is_none());
        assert!(attributes.plate_number.is_none());
        assert!(attributes.vehicle_model.is_none());
    }

    #[test]
    fn test_profile_changes_from_document_urls() {
        let mut urls = BTreeMap::new();
        urls.insert(DocumentKind::ValidId, "https://cdn.test/valid-id/u1.jpeg".to_string());
        urls.insert(
            DocumentKind::DriversLicense,
            "https://cdn.test/driver-id/u1.jpeg".to_string(),
        );

        let changes = ProfileChanges::from_document_urls(&urls);
        assert_eq!(
            changes.valid_id_url.as_deref(),
            Some("https://cdn.test/valid-id/u1.jpeg")
        );
        assert_eq!(
            changes.drivers_license_url.as_deref(),
            Some("https://cdn.test/driver-id/u1.jpeg")
        );
        assert!(changes.vehicle_image_url.is_none());
        assert!(changes.certificate_of_registration_url.is_none());
    }
}
