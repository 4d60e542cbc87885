//! Login and registration form schemas.
//!
//! Forms are validated by the view before submission; the session store
//! sends whatever it is given.

use serde::Serialize;
use validator::{Validate, ValidationError};

use crate::types::{Role, SellerPackage};

#[derive(Debug, Clone, Default, Serialize, Validate)]
pub struct LoginForm {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

impl LoginForm {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Registration payload, sent as-is to the register endpoint.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct RegistrationForm {
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub name: String,

    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,

    #[validate(length(min = 10, message = "Please enter a valid phone number"))]
    pub phone: String,

    #[validate(
        length(min = 8, message = "Password must be at least 8 characters"),
        must_match(other = "password_confirmation", message = "Passwords don't match")
    )]
    pub password: String,

    pub password_confirmation: String,

    #[validate(custom(function = "self_service_role"))]
    pub role: Role,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub seller_package: Option<SellerPackage>,
}

impl RegistrationForm {
    /// A customer sign-up with the password entered twice.
    #[must_use]
    pub fn customer(
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let password = password.into();
        Self {
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
            password_confirmation: password.clone(),
            password,
            role: Role::Customer,
            seller_package: None,
        }
    }

    /// Turn the sign-up into a seller sign-up on `package`.
    #[must_use]
    pub fn as_seller(mut self, package: SellerPackage) -> Self {
        self.role = Role::Seller;
        self.seller_package = Some(package);
        self
    }
}

/// Admin accounts are never self-registered.
fn self_service_role(role: &Role) -> Result<(), ValidationError> {
    match role {
        Role::Customer | Role::Seller => Ok(()),
        Role::Admin => {
            let mut error = ValidationError::new("role");
            error.message = Some("Choose customer or seller".into());
            Err(error)
        }
    }
}
