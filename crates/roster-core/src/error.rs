use roster_types::Status;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserError {
    #[error("invalid user ID input")]
    InvalidId,
    #[error("invalid city input")]
    InvalidCity,
    #[error("invalid first name input")]
    InvalidFName,
    #[error("invalid height input")]
    InvalidHeight,
    #[error("invalid phone number input")]
    InvalidPhone,
    #[error("user with this Id already exists")]
    IdAlreadyExists,
    #[error("user not found in db")]
    NotFound,
    #[error("invalid search request")]
    InvalidSearchRequest,
}

pub type UserResult<T> = Result<T, UserError>;

impl From<UserError> for Status {
    fn from(err: UserError) -> Self {
        match err {
            UserError::IdAlreadyExists => Status::already_exists(err.to_string()),
            _ => Status::invalid_argument(err.to_string()),
        }
    }
}
