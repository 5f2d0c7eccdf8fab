use thiserror::Error;

use crate::{Role, highest_role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("insufficient role: '{required}' required, highest held is {}", .held.map_or("none", |r| r.as_str()))]
    InsufficientRole { required: Role, held: Option<Role> },
}

/// Minimum-role check over an account's granted roles.
///
/// - No IO
/// - No panics
/// - Passes when any held role is at least `required`
pub fn authorize(roles: &[Role], required: Role) -> Result<(), AuthzError> {
    let held = highest_role(roles);
    match held {
        Some(role) if role.satisfies(required) => Ok(()),
        _ => Err(AuthzError::InsufficientRole { required, held }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highest_role_decides() {
        assert_eq!(authorize(&[Role::Member, Role::Admin], Role::Admin), Ok(()));
        assert_eq!(authorize(&[Role::Editor], Role::Member), Ok(()));
    }

    #[test]
    fn no_roles_never_passes() {
        assert_eq!(
            authorize(&[], Role::Member),
            Err(AuthzError::InsufficientRole { required: Role::Member, held: None })
        );
    }

    #[test]
    fn denial_reports_what_was_held() {
        let err = authorize(&[Role::Editor], Role::Admin).unwrap_err();
        assert_eq!(err.to_string(), "insufficient role: 'admin' required, highest held is editor");
    }
}
