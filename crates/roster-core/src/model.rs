use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserId(pub i32);

impl UserId {
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Domain user record, independent of the wire format.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub fname: String,
    pub city: String,
    pub phone: i64,
    pub height: f64,
    pub married: bool,
}

/// Ad-hoc search filters.
///
/// Zero and empty values mean "not supplied". `married` only filters when
/// `search_married` is set; `height` counts towards emptiness but never
/// filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchCriteria {
    pub id: i32,
    pub fname: String,
    pub city: String,
    pub phone: i64,
    pub height: f64,
    pub married: bool,
    pub search_married: bool,
}

impl SearchCriteria {
    pub fn is_empty(&self) -> bool {
        self.id == 0
            && self.fname.is_empty()
            && self.city.is_empty()
            && self.phone == 0
            && self.height == 0.0
            && !self.married
            && !self.search_married
    }

    pub fn matches(&self, user: &User) -> bool {
        if self.id != 0 && user.id.0 != self.id {
            return false;
        }
        if !self.fname.is_empty() && user.fname != self.fname {
            return false;
        }
        if !self.city.is_empty() && user.city != self.city {
            return false;
        }
        if self.phone != 0 && user.phone != self.phone {
            return false;
        }
        if self.search_married && user.married != self.married {
            return false;
        }
        true
    }
}

impl From<roster_types::User> for User {
    fn from(user: roster_types::User) -> Self {
        Self {
            id: UserId(user.id),
            fname: user.fname,
            city: user.city,
            phone: user.phone,
            height: user.height,
            married: user.married,
        }
    }
}

impl From<User> for roster_types::User {
    fn from(user: User) -> Self {
        Self {
            id: user.id.0,
            fname: user.fname,
            city: user.city,
            phone: user.phone,
            height: user.height,
            married: user.married,
        }
    }
}

impl From<roster_types::SearchRequest> for SearchCriteria {
    fn from(req: roster_types::SearchRequest) -> Self {
        Self {
            id: req.id,
            fname: req.fname,
            city: req.city,
            phone: req.phone,
            height: req.height,
            married: req.married,
            search_married: req.search_married_flag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jane() -> User {
        User {
            id: UserId(2),
            fname: "Jane".to_string(),
            city: "Los Angeles".to_string(),
            phone: 9876543210,
            height: 165.2,
            married: false,
        }
    }

    #[test]
    fn test_height_and_married_count_towards_emptiness() {
        assert!(SearchCriteria::default().is_empty());
        assert!(!SearchCriteria {
            height: 170.0,
            ..Default::default()
        }
        .is_empty());
        assert!(!SearchCriteria {
            married: true,
            ..Default::default()
        }
        .is_empty());
        assert!(!SearchCriteria {
            search_married: true,
            ..Default::default()
        }
        .is_empty());
    }

    #[test]
    fn test_married_ignored_without_toggle() {
        let criteria = SearchCriteria {
            city: "Los Angeles".to_string(),
            married: true,
            ..Default::default()
        };
        assert!(criteria.matches(&jane()));

        let criteria = SearchCriteria {
            married: true,
            search_married: true,
            ..Default::default()
        };
        assert!(!criteria.matches(&jane()));
    }

    #[test]
    fn test_height_never_filters() {
        let criteria = SearchCriteria {
            height: 999.0,
            ..Default::default()
        };
        assert!(criteria.matches(&jane()));
    }

    #[test]
    fn test_every_supplied_filter_must_hold() {
        let criteria = SearchCriteria {
            id: 2,
            fname: "Jane".to_string(),
            phone: 1111111111,
            ..Default::default()
        };
        assert!(!criteria.matches(&jane()));
    }
}
