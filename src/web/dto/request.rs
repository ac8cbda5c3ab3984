//! Request DTOs for Web API.

use serde::Deserialize;
use validator::Validate;

use super::validation::no_control_chars;

/// Login request.
///
/// `images` defaults to empty so a missing field is reported as
/// "no graphical password selected" rather than a JSON error.
#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    /// Username.
    pub username: String,
    /// Text password.
    pub password: String,
    /// Ordered image sequence.
    #[serde(default)]
    #[validate(length(max = 64, message = "Too many images selected"))]
    pub images: Vec<String>,
}

/// Logout request.
#[derive(Debug, Deserialize, Validate)]
pub struct LogoutRequest {
    /// Refresh token to invalidate.
    pub refresh_token: String,
}

/// Token refresh request.
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    /// Refresh token.
    pub refresh_token: String,
}

/// User registration request.
#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    /// Username.
    #[validate(
        length(min = 1, max = 150, message = "Username must be 1 to 150 characters"),
        custom(function = "no_control_chars")
    )]
    pub username: String,
    /// Email.
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    /// Text password.
    #[validate(length(min = 1, max = 128, message = "Password must be 1 to 128 characters"))]
    pub password: String,
    /// Ordered image sequence.
    #[serde(default)]
    #[validate(length(min = 1, message = "Please select your graphical password"))]
    pub images: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_json(images: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "P@ss1",
            "images": images,
        })
    }

    #[test]
    fn test_login_request_sequence_cap() {
        let images: Vec<String> = (0..65).map(|i| format!("img{i}")).collect();
        let req: LoginRequest = serde_json::from_value(serde_json::json!({
            "username": "alice",
            "password": "P@ss1",
            "images": images,
        }))
        .unwrap();
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("images"));

        let req: LoginRequest = serde_json::from_value(serde_json::json!({
            "username": "alice",
            "password": "P@ss1",
            "images": &images[..64],
        }))
        .unwrap();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_register_request_valid() {
        let req: RegisterRequest =
            serde_json::from_value(register_json(serde_json::json!(["btc", "eth"]))).unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.images, vec!["btc", "eth"]);
    }

    #[test]
    fn test_register_request_without_images() {
        let req: RegisterRequest = serde_json::from_value(serde_json::json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "P@ss1",
        }))
        .unwrap();

        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("images"));
    }

    #[test]
    fn test_register_request_bad_email() {
        let mut value = register_json(serde_json::json!(["btc"]));
        value["email"] = serde_json::json!("nope");
        let req: RegisterRequest = serde_json::from_value(value).unwrap();

        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
    }

    #[test]
    fn test_login_request_defaults_images() {
        let req: LoginRequest =
            serde_json::from_value(serde_json::json!({"username": "a", "password": "b"}))
                .unwrap();
        assert!(req.images.is_empty());
    }
}
