//! Request and response bodies of the user endpoints.

use serde::{Deserialize, Serialize};

const MAX_ACCOUNT_LEN: usize = 64;
const MAX_NAME_LEN: usize = 64;
const MAX_PASSWORD_LEN: usize = 128;

/// Field constraints checked after deserialization
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

fn check_field(field: &str, value: &str, required: bool, max_len: usize) -> Result<(), String> {
    if required && value.is_empty() {
        return Err(format!("{} is required", field));
    }
    if value.chars().count() > max_len {
        return Err(format!("{} must be at most {} characters", field, max_len));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct RegisterReq {
    pub account: String,
    pub name: String,
    pub password: String,
}

impl Validate for RegisterReq {
    fn validate(&self) -> Result<(), String> {
        check_field("account", &self.account, true, MAX_ACCOUNT_LEN)?;
        check_field("name", &self.name, true, MAX_NAME_LEN)?;
        check_field("password", &self.password, true, MAX_PASSWORD_LEN)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResp {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginReq {
    #[serde(default)]
    pub account: String,
    pub password: String,
}

impl Validate for LoginReq {
    fn validate(&self) -> Result<(), String> {
        check_field("account", &self.account, false, MAX_ACCOUNT_LEN)?;
        check_field("password", &self.password, true, MAX_PASSWORD_LEN)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResp {
    pub access_token: String,
    /// Unix seconds
    pub expires_at: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshTokenResp {
    pub access_token: String,
    pub expires_at: i64,
    pub refresh_token: String,
    pub refresh_expires_at: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetUserInfoResp {
    pub user_id: String,
    pub account: String,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateInfoReq {
    pub name: String,
}

impl Validate for UpdateInfoReq {
    fn validate(&self) -> Result<(), String> {
        check_field("name", &self.name, true, MAX_NAME_LEN)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordReq {
    pub old_password: String,
    pub new_password: String,
}

impl Validate for UpdatePasswordReq {
    fn validate(&self) -> Result<(), String> {
        check_field("old_password", &self.old_password, true, MAX_PASSWORD_LEN)?;
        check_field("new_password", &self.new_password, true, MAX_PASSWORD_LEN)
    }
}

/// Body of endpoints that return no data
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Empty {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_requires_all_fields() {
        let req = RegisterReq {
            account: "alice".to_string(),
            name: String::new(),
            password: "pw".to_string(),
        };
        assert_eq!(req.validate().unwrap_err(), "name is required");
    }

    #[test]
    fn test_login_account_may_be_empty() {
        let req: LoginReq = serde_json::from_str(r#"{"password":"pw"}"#).unwrap();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_length_counts_characters() {
        let name = "é".repeat(MAX_NAME_LEN);
        assert!(UpdateInfoReq { name: name.clone() }.validate().is_ok());
        assert!(
            UpdateInfoReq {
                name: format!("{}x", name)
            }
            .validate()
            .is_err()
        );
    }
}
