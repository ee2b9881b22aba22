//! Todo entity and its validated inputs

use serde::Serialize;
use sqlx::FromRow;

use super::ValidationError;

/// Maximum title length, matching the `VARCHAR(255)` column
pub const MAX_TITLE_LEN: usize = 255;

/// Todo row as stored in the `todos` table
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub completed: bool,
    /// Bumped by every successful write to the row
    pub version: i64,
}

/// Validated todo title (non-blank, at most 255 characters)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoTitle(String);

impl TodoTitle {
    /// Create a title, rejecting blank or oversized input.
    ///
    /// # Example
    /// ```
    /// use todoctl_server::models::TodoTitle;
    ///
    /// assert!(TodoTitle::new("Buy milk").is_ok());
    /// assert!(TodoTitle::new("   ").is_err());
    /// ```
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        if s.trim().is_empty() {
            return Err(ValidationError::Empty { field: "title" });
        }

        if s.chars().count() > MAX_TITLE_LEN {
            return Err(ValidationError::TooLong {
                field: "title",
                max: MAX_TITLE_LEN,
            });
        }

        Ok(Self(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for TodoTitle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Todo identifier taken from a request path (always positive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TodoId(i64);

impl TodoId {
    pub fn new(id: i64) -> Result<Self, ValidationError> {
        if id <= 0 {
            return Err(ValidationError::InvalidFormat {
                field: "id",
                reason: "must be a positive integer",
            });
        }
        Ok(Self(id))
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for TodoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_titles() {
        assert!(TodoTitle::new("Buy milk").is_ok());
        assert!(TodoTitle::new("x").is_ok());
        assert_eq!(TodoTitle::new(" padded ").unwrap().as_str(), " padded ");
    }

    #[test]
    fn rejects_blank() {
        for input in ["", " ", "\t\n"] {
            let err = TodoTitle::new(input).unwrap_err();
            assert!(matches!(err, ValidationError::Empty { field: "title" }));
        }
    }

    #[test]
    fn max_length() {
        let title_255 = "a".repeat(255);
        assert!(TodoTitle::new(&title_255).is_ok());

        let title_256 = "a".repeat(256);
        let err = TodoTitle::new(&title_256).unwrap_err();
        assert!(matches!(err, ValidationError::TooLong { max: 255, .. }));
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let title = "é".repeat(255);
        assert!(title.len() > 255);
        assert!(TodoTitle::new(&title).is_ok());
    }

    #[test]
    fn todo_id_must_be_positive() {
        assert_eq!(TodoId::new(7).unwrap().get(), 7);
        assert!(matches!(
            TodoId::new(0).unwrap_err(),
            ValidationError::InvalidFormat { field: "id", .. }
        ));
        assert!(TodoId::new(-3).is_err());
    }
}
