//! Login flow with role dispatch.
//!
//! Each login screen expects one role; after authentication the profile's
//! role decides where the user lands. The dispatch is an explicit equality
//! check, and a mismatch is its own outcome rather than a silent fallthrough
//! so the screen can point the user at the right login.

use tracing::{info, instrument};

use crate::services::client::{AuthError, CredentialService, Session, UserRole};

/// Where a successful login navigates to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoginDestination {
    PassengerHome,
    DriverHome,
}

/// Outcome of a role-scoped login attempt.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    /// Role matched; navigate to the role's home screen.
    SignedIn {
        destination: LoginDestination,
        session: Session,
    },
    /// Credentials were valid but the account belongs to the other role; the
    /// session stays signed in, the user is told which login to use.
    RoleMismatch { expected: UserRole, actual: UserRole },
}

pub fn home_for(role: UserRole) -> LoginDestination {
    match role {
        UserRole::Passenger => LoginDestination::PassengerHome,
        UserRole::Driver => LoginDestination::DriverHome,
    }
}

/// Route an authenticated session by comparing the profile's role against the
/// role this screen expects.
pub fn dispatch(expected: UserRole, session: Session) -> LoginOutcome {
    let actual = session.profile.user_type;
    if actual == expected {
        LoginOutcome::SignedIn {
            destination: home_for(actual),
            session,
        }
    } else {
        LoginOutcome::RoleMismatch { expected, actual }
    }
}

/// Authenticate and dispatch on the profile's role.
#[instrument(skip(credentials, password), err)]
pub async fn login_as(
    credentials: &CredentialService,
    expected: UserRole,
    email: &str,
    password: &str,
) -> Result<LoginOutcome, AuthError> {
    let session = credentials.authenticate(email, password).await?;
    let outcome = dispatch(expected, session);

    if let LoginOutcome::RoleMismatch { expected, actual } = &outcome {
        info!(
            "Login succeeded but the account is a {} one, not {}",
            actual, expected
        );
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::client::types::{Account, Profile, SessionTokens};

    fn session_with_role(role: UserRole) -> Session {
        Session {
            account: Account {
                id: "acct-1".to_string(),
                email: "a@b.com".to_string(),
                phone: None,
            },
            profile: Profile {
                id: "acct-1".to_string(),
                user_type: role,
                first_name: "Ana".to_string(),
                middle_name: None,
                last_name: "Cruz".to_string(),
                contact_no: None,
                license_number: None,
                plate_number: None,
                vehicle_model: None,
                valid_id_url: None,
                vehicle_image_url: None,
                certificate_of_registration_url: None,
                drivers_license_url: None,
            },
            tokens: SessionTokens {
                access_token: "access".to_string(),
                refresh_token: "refresh".to_string(),
                expires_at: None,
            },
        }
    }

    #[test]
    fn test_matching_role_lands_on_its_home_screen() {
        match dispatch(UserRole::Passenger, session_with_role(UserRole::Passenger)) {
            LoginOutcome::SignedIn { destination, .. } => {
                assert_eq!(destination, LoginDestination::PassengerHome)
            }
            other => panic!("expected SignedIn, got {:?}", other),
        }

        match dispatch(UserRole::Driver, session_with_role(UserRole::Driver)) {
            LoginOutcome::SignedIn { destination, .. } => {
                assert_eq!(destination, LoginDestination::DriverHome)
            }
            other => panic!("expected SignedIn, got {:?}", other),
        }
    }

    #[test]
    fn test_mismatched_role_is_its_own_outcome() {
        match dispatch(UserRole::Passenger, session_with_role(UserRole::Driver)) {
            LoginOutcome::RoleMismatch { expected, actual } => {
                assert_eq!(expected, UserRole::Passenger);
                assert_eq!(actual, UserRole::Driver);
            }
            other => panic!("expected RoleMismatch, got {:?}", other),
        }

        match dispatch(UserRole::Driver, session_with_role(UserRole::Passenger)) {
            LoginOutcome::RoleMismatch { expected, actual } => {
                assert_eq!(expected, UserRole::Driver);
                assert_eq!(actual, UserRole::Passenger);
            }
            other => panic!("expected RoleMismatch, got {:?}", other),
        }
    }
}
