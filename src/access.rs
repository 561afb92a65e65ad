use crate::error::ApiError;
use crate::models::{Role, User, UserStatus};

/// Groups of operations a role may reach.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    Roster,
    Scan,
    Alerts,
    Reports,
    Tracker,
    ManageStudents,
    Settings,
    ManageUsers,
    Import,
}

impl Role {
    pub fn can(self, capability: Capability) -> bool {
        use Capability::*;
        match self {
            Role::Admin => true,
            Role::Teacher | Role::Nurse => matches!(capability, Roster | Scan | Alerts | Reports),
            Role::Driver | Role::Monitor => matches!(capability, Roster | Scan | Alerts | Tracker),
        }
    }
}

/// Approved account whose role grants `capability`.
pub fn require(user: &User, capability: Capability) -> Result<(), ApiError> {
    match user.status {
        UserStatus::Approved => {}
        UserStatus::Pending => {
            return Err(ApiError::Forbidden(
                "Your account is pending admin approval".to_string(),
            ))
        }
        UserStatus::Suspended => {
            return Err(ApiError::Forbidden(
                "Your account has been suspended".to_string(),
            ))
        }
    }
    if !user.role.can(capability) {
        return Err(ApiError::Forbidden(format!(
            "The {} role cannot access this",
            user.role
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::demo_user;

    #[test]
    fn admin_reaches_everything() {
        let admin = demo_user("admin").unwrap();
        for cap in [
            Capability::Roster,
            Capability::Settings,
            Capability::ManageUsers,
            Capability::Import,
            Capability::Tracker,
        ] {
            assert!(require(&admin, cap).is_ok());
        }
    }

    #[test]
    fn staff_roles_are_limited() {
        let teacher = demo_user("teacher").unwrap();
        assert!(require(&teacher, Capability::Reports).is_ok());
        assert!(require(&teacher, Capability::Tracker).is_err());
        assert!(require(&teacher, Capability::Settings).is_err());

        let driver = demo_user("driver").unwrap();
        assert!(require(&driver, Capability::Tracker).is_ok());
        assert!(require(&driver, Capability::Reports).is_err());
        assert!(require(&driver, Capability::ManageUsers).is_err());
    }

    #[test]
    fn pending_and_suspended_accounts_are_blocked() {
        let mut nurse = demo_user("nurse").unwrap();
        nurse.status = UserStatus::Pending;
        assert_eq!(
            require(&nurse, Capability::Scan),
            Err(ApiError::Forbidden(
                "Your account is pending admin approval".to_string()
            ))
        );
        nurse.status = UserStatus::Suspended;
        assert!(require(&nurse, Capability::Scan)
            .unwrap_err()
            .message()
            .contains("suspended"));
    }
}
