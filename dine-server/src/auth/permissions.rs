//! Role checks
//!
//! - ADMIN may do anything
//! - OWNER manages the restaurants they own
//! - STAFF manages the restaurant they are affiliated with
//! - CUSTOMER only sees their own orders and profile

use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Restaurant, UserRole};

use super::CurrentUser;

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::new(ErrorCode::AdminRequired))
        }
    }

    /// Caller must have one of `roles` (ADMIN always passes)
    pub fn require_role(&self, roles: &[UserRole]) -> AppResult<()> {
        if self.is_admin() || roles.contains(&self.role) {
            return Ok(());
        }
        let names: Vec<&str> = roles.iter().map(UserRole::as_str).collect();
        Err(
            AppError::with_message(ErrorCode::RoleRequired, format!("Requires role {}", names.join(" or ")))
                .with_detail("role", self.role.as_str()),
        )
    }

    pub fn owns(&self, restaurant: &Restaurant) -> bool {
        self.role == UserRole::Owner && restaurant.owner_id == self.id
    }

    pub fn can_manage(&self, restaurant: &Restaurant) -> bool {
        match self.role {
            UserRole::Admin => true,
            UserRole::Owner => restaurant.owner_id == self.id,
            UserRole::Staff => self.restaurant_id == Some(restaurant.id),
            UserRole::Customer => false,
        }
    }

    /// ADMIN, the restaurant's owner or its staff
    pub fn ensure_manager(&self, restaurant: &Restaurant) -> AppResult<()> {
        if self.can_manage(restaurant) {
            Ok(())
        } else {
            Err(AppError::new(ErrorCode::NotRestaurantManager)
                .with_detail("restaurantId", restaurant.id))
        }
    }

    /// ADMIN or the restaurant's owner
    pub fn ensure_owner(&self, restaurant: &Restaurant) -> AppResult<()> {
        if self.is_admin() || self.owns(restaurant) {
            Ok(())
        } else {
            Err(AppError::permission_denied(
                "Only the owner can change this restaurant",
            ))
        }
    }

    /// Self or ADMIN
    pub fn ensure_self_or_admin(&self, user_id: i64) -> AppResult<()> {
        if self.is_admin() || self.id == user_id {
            Ok(())
        } else {
            Err(AppError::permission_denied("Not allowed to access this user"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, role: UserRole, restaurant_id: Option<i64>) -> CurrentUser {
        CurrentUser {
            id,
            email: format!("u{id}@example.com"),
            role,
            restaurant_id,
        }
    }

    fn restaurant(id: i64, owner_id: i64) -> Restaurant {
        Restaurant {
            id,
            owner_id,
            name: "Bistro".into(),
            slug: "bistro".into(),
            description: None,
            address: None,
            phone: None,
            email: None,
            is_active: true,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_manager_roles() {
        let r = restaurant(10, 1);
        assert!(user(1, UserRole::Owner, None).can_manage(&r));
        assert!(!user(2, UserRole::Owner, None).can_manage(&r));
        assert!(user(3, UserRole::Staff, Some(10)).can_manage(&r));
        assert!(!user(3, UserRole::Staff, Some(11)).can_manage(&r));
        assert!(user(4, UserRole::Admin, None).can_manage(&r));
        assert!(!user(1, UserRole::Customer, None).can_manage(&r));
    }

    #[test]
    fn test_staff_is_not_owner() {
        let r = restaurant(10, 1);
        let staff = user(3, UserRole::Staff, Some(10));
        assert!(staff.ensure_manager(&r).is_ok());
        assert_eq!(
            staff.ensure_owner(&r).unwrap_err().code,
            ErrorCode::PermissionDenied
        );
    }

    #[test]
    fn test_require_role() {
        let customer = user(1, UserRole::Customer, None);
        let err = customer
            .require_role(&[UserRole::Owner])
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::RoleRequired);
        assert_eq!(err.http_status().as_u16(), 403);
        assert!(user(2, UserRole::Admin, None).require_role(&[UserRole::Owner]).is_ok());
        assert_eq!(
            customer.require_admin().unwrap_err().code,
            ErrorCode::AdminRequired
        );
    }
}
