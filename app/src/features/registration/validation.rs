//! Pure form validation for registration submissions.
//!
//! Returns a field-key → message map; a key's absence means the field is
//! valid. No network or storage access happens here, so an invalid form is
//! rejected before the backend is touched at all.

use std::collections::BTreeMap;

use crate::services::client::types::UserRole;
use crate::utils::validation::{is_valid_email, meets_min_chars};

use super::types::{DocumentKind, RegistrationForm};

pub fn validate_registration(form: &RegistrationForm) -> BTreeMap<&'static str, String> {
    let mut errors = BTreeMap::new();

    if form.first_name.trim().is_empty() {
        errors.insert("firstName", "First name is required".to_string());
    }
    if form.last_name.trim().is_empty() {
        errors.insert("lastName", "Last name is required".to_string());
    }

    if form.email.trim().is_empty() {
        errors.insert("email", "Email is required".to_string());
    } else if !is_valid_email(&form.email) {
        errors.insert("email", "Invalid email format".to_string());
    }

    if form.contact_no.trim().is_empty() {
        errors.insert("contactNo", "Contact number is required".to_string());
    } else if !meets_min_chars(&form.contact_no, 10) {
        errors.insert("contactNo", "Invalid contact number".to_string());
    }

    if form.password.is_empty() {
        errors.insert("password", "Password is required".to_string());
    } else if !meets_min_chars(&form.password, 6) {
        errors.insert(
            "password",
            "Password must be at least 6 characters".to_string(),
        );
    }
    if form.password != form.confirm_password {
        errors.insert("confirmPassword", "Passwords do not match".to_string());
    }

    if form.role == UserRole::Driver {
        if form.license_number.trim().is_empty() {
            errors.insert("licenseNumber", "License number is required".to_string());
        }
        if form.plate_number.trim().is_empty() {
            errors.insert("plateNumber", "Plate number is required".to_string());
        }
        if form.vehicle_model.trim().is_empty() {
            errors.insert("vehicleModel", "Vehicle model is required".to_string());
        }
    }

    for kind in DocumentKind::required_for(form.role) {
        if !form.documents.contains_key(kind) {
            errors.insert(kind.field_key(), kind.missing_message().to_string());
        }
    }

    errors
}
