//! Backend paths, relative to the configured base address.

pub mod auth {
    pub const LOGIN: &str = "/auth/login";
    pub const REGISTER: &str = "/auth/register";
    pub const LOGOUT: &str = "/auth/logout";
    pub const ME: &str = "/auth/me";
    pub const FORGOT_PASSWORD: &str = "/auth/forgot-password";
    pub const RESET_PASSWORD: &str = "/auth/reset-password";
    pub const VERIFY_EMAIL: &str = "/auth/verify-email";
    pub const VERIFY_PHONE: &str = "/auth/verify-phone";
}

pub mod services {
    pub const LIST: &str = "/services";
    pub const CREATE: &str = "/seller/services";
    pub const MY_SERVICES: &str = "/seller/services/my";

    #[must_use]
    pub fn show(id: &str) -> String {
        format!("/services/{}", urlencoding::encode(id))
    }

    #[must_use]
    pub fn update(id: &str) -> String {
        format!("/seller/services/{}", urlencoding::encode(id))
    }

    #[must_use]
    pub fn delete(id: &str) -> String {
        update(id)
    }
}

pub mod bookings {
    pub const CREATE: &str = "/bookings";
    pub const LIST: &str = "/bookings";

    #[must_use]
    pub fn show(id: &str) -> String {
        format!("/bookings/{}", urlencoding::encode(id))
    }

    #[must_use]
    pub fn cancel(id: &str) -> String {
        format!("/bookings/{}/cancel", urlencoding::encode(id))
    }
}

pub mod payments {
    pub const INITIATE_MPESA: &str = "/payments/mpesa/initiate";
    pub const HISTORY: &str = "/payments/history";

    #[must_use]
    pub fn status(id: &str) -> String {
        format!("/payments/{}/status", urlencoding::encode(id))
    }
}

pub mod admin {
    pub const DASHBOARD: &str = "/admin/dashboard";
    pub const USERS: &str = "/admin/users";
    pub const SERVICES: &str = "/admin/services";
    pub const PAYMENTS: &str = "/admin/payments";
}
