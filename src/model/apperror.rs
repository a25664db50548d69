use std::fmt;

/**
 * Represents the type of error that can occur within the application.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorType {
    /**
     * Startup failed, e.g. unreadable certificates.
     */
    Initialization,
    /**
     * Malformed or out-of-range input.
     */
    Validation,
    /**
     * The referenced ship does not exist.
     */
    NotFound,
    /**
     * The database could not complete the operation.
     */
    DatabaseError,
    /**
     * Unexpected application state.
     */
    Application,
}

/**
 * Represents an error that occurs within the application.
 */
#[derive(Debug, Clone)]
pub struct ApplicationError {
    /**
     * Error type.
     */
    pub error_type: ErrorType,
    /**
     * Error message describing problem.
     */
    pub message: String,
}

impl ApplicationError {
    /**
     * Creates a new ApplicationError.
     *
     * #Arguments
     * `error_type`: The type of error.
     * `message`: A description of the error.
     */
    pub fn new(error_type: ErrorType, message: String) -> Self {
        ApplicationError { error_type, message }
    }

    /**
     * Shorthand for a validation error.
     */
    pub fn validation(message: &str) -> Self {
        ApplicationError::new(ErrorType::Validation, message.to_string())
    }

    /**
     * Shorthand for a not found error.
     */
    pub fn not_found(message: &str) -> Self {
        ApplicationError::new(ErrorType::NotFound, message.to_string())
    }
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApplicationError {}
