use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Customer,
    Parent,
    Child,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub role: UserRole,
    /// Parent account that controls this one, if any
    #[serde(rename = "parentId", default)]
    pub parent_id: Option<String>,
    /// Whether parental controls block age-restricted modules
    #[serde(rename = "restrictContent", default)]
    pub restrict_content: bool,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.email)
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "moduleId")]
    pub module_id: String,
    /// Amount paid in cents
    #[serde(default)]
    pub amount: i64,
    #[serde(rename = "purchasedAt", default)]
    pub purchased_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_name_falls_back_to_email() {
        let json = r#"{"id": "u1", "email": "kid@example.com", "role": "child", "parentId": "u0"}"#;
        let user: User = serde_json::from_str(json).expect("Failed to parse user JSON");
        assert_eq!(user.name(), "kid@example.com");
        assert_eq!(user.role, UserRole::Child);
        assert_eq!(user.parent_id.as_deref(), Some("u0"));
        assert!(!user.is_admin());
    }
}
