use serde::{Deserialize, Serialize};

/// Wire representation of a user record.
///
/// Every field falls back to its zero value when missing from the payload, so
/// validation is left to the repository rather than to deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: i32,
    #[serde(default)]
    pub fname: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub phone: i64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub married: bool,
}

// ============================================================================
// Get User By ID
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserIdRequest {
    #[serde(default)]
    pub id: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
    pub user: User,
}

// ============================================================================
// Get Users By IDs
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserIdsRequest {
    #[serde(default)]
    pub ids: Vec<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsersResponse {
    #[serde(default)]
    pub users: Vec<User>,
}

// ============================================================================
// Search Users
// ============================================================================

/// Search filters. Zero values mean "not supplied"; `married` is only
/// compared when `search_married_flag` is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub id: i32,
    #[serde(default)]
    pub fname: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub phone: i64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub married: bool,
    #[serde(default)]
    pub search_married_flag: bool,
}

// ============================================================================
// List Users
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListUsersRequest {
    #[serde(default)]
    pub page: i32,
    #[serde(default)]
    pub page_size: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_default_to_zero() {
        let req: SearchRequest = serde_json::from_str(r#"{"city": "Chicago"}"#).unwrap();
        assert_eq!(req.city, "Chicago");
        assert_eq!(req.id, 0);
        assert!(req.fname.is_empty());
        assert!(!req.search_married_flag);

        let list: ListUsersRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(list.page, 0);
        assert_eq!(list.page_size, 0);
    }

    #[test]
    fn test_user_field_names() {
        let user = User {
            id: 7,
            fname: "Ada".to_string(),
            city: "London".to_string(),
            phone: 4155550000,
            height: 165.0,
            married: true,
        };
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["fname"], "Ada");
        assert_eq!(value["phone"], 4155550000i64);
        assert_eq!(value["married"], true);
    }
}
