//! Unified error codes for the ordering API
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Restaurant errors
//! - 4xxx: Order errors
//! - 6xxx: Menu errors
//! - 7xxx: Table errors
//! - 8xxx: User errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Codes travel as plain numbers in the error envelope so the web client
/// can branch on them without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Referenced record does not exist
    InvalidReference = 9,
    /// Too many requests from this client
    RateLimited = 10,
    /// HTTP method not allowed on this route
    MethodNotAllowed = 11,
    /// Request body too large
    PayloadTooLarge = 12,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Invalid credentials (email/password)
    InvalidCredentials = 1002,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,
    /// Email is already registered
    EmailAlreadyRegistered = 1005,
    /// Role cannot be chosen at registration
    RegistrationRoleNotAllowed = 1006,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Required role missing
    RoleRequired = 2002,
    /// Admin role required
    AdminRequired = 2003,
    /// Caller does not manage this restaurant
    NotRestaurantManager = 2004,
    /// Admins cannot delete their own account
    CannotDeleteSelf = 2005,

    // ==================== 3xxx: Restaurant ====================
    /// Restaurant not found
    RestaurantNotFound = 3001,
    /// Restaurant slug already taken
    RestaurantSlugExists = 3002,
    /// Restaurant is not accepting orders
    RestaurantInactive = 3003,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Status change not allowed from the current status
    InvalidStatusTransition = 4003,
    /// Order already reached a final status
    OrderAlreadyFinalized = 4004,
    /// Order number collision
    OrderNumberExists = 4005,
    /// Menu item is not available for ordering
    ItemUnavailable = 4006,
    /// Referenced table or item belongs to a different restaurant
    RestaurantMismatch = 4007,

    // ==================== 6xxx: Menu ====================
    /// Menu not found
    MenuNotFound = 6001,
    /// Menu category not found
    CategoryNotFound = 6101,
    /// Menu item not found
    MenuItemNotFound = 6201,
    /// Price is negative or malformed
    InvalidPrice = 6202,
    /// Menu item variant not found
    VariantNotFound = 6301,

    // ==================== 7xxx: Table ====================
    /// Table not found
    TableNotFound = 7001,
    /// Table number already used in this restaurant
    TableNumberExists = 7002,

    // ==================== 8xxx: User ====================
    /// User not found
    UserNotFound = 8001,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Request timed out
    TimeoutError = 9004,
    /// Real-time notifications are not running
    RealtimeUnavailable = 9101,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the default message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::InvalidReference => "Referenced record does not exist",
            ErrorCode::RateLimited => "Too many requests, please try again later",
            ErrorCode::MethodNotAllowed => "Method not allowed",
            ErrorCode::PayloadTooLarge => "Request body too large",

            // Auth
            ErrorCode::NotAuthenticated => "Authentication required",
            ErrorCode::InvalidCredentials => "Invalid email or password",
            ErrorCode::TokenExpired => "Token has expired",
            ErrorCode::TokenInvalid => "Invalid token",
            ErrorCode::EmailAlreadyRegistered => "Email is already registered",
            ErrorCode::RegistrationRoleNotAllowed => "This role cannot be chosen at registration",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::RoleRequired => "Required role is missing",
            ErrorCode::AdminRequired => "Admin role required",
            ErrorCode::NotRestaurantManager => "You do not manage this restaurant",
            ErrorCode::CannotDeleteSelf => "You cannot delete your own account",

            // Restaurant
            ErrorCode::RestaurantNotFound => "Restaurant not found",
            ErrorCode::RestaurantSlugExists => "Restaurant slug is already taken",
            ErrorCode::RestaurantInactive => "Restaurant is not accepting orders",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::InvalidStatusTransition => "Order status change is not allowed",
            ErrorCode::OrderAlreadyFinalized => "Order is already finalized",
            ErrorCode::OrderNumberExists => "Order number already exists",
            ErrorCode::ItemUnavailable => "Menu item is not available",
            ErrorCode::RestaurantMismatch => "Item does not belong to this restaurant",

            // Menu
            ErrorCode::MenuNotFound => "Menu not found",
            ErrorCode::CategoryNotFound => "Category not found",
            ErrorCode::MenuItemNotFound => "Menu item not found",
            ErrorCode::InvalidPrice => "Price must be zero or greater",
            ErrorCode::VariantNotFound => "Variant not found",

            // Table
            ErrorCode::TableNotFound => "Table not found",
            ErrorCode::TableNumberExists => "Table number already exists in this restaurant",

            // User
            ErrorCode::UserNotFound => "User not found",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::TimeoutError => "Request timed out",
            ErrorCode::RealtimeUnavailable => "Real-time notifications are unavailable",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when converting an unknown u16 into an [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),
            9 => Ok(ErrorCode::InvalidReference),
            10 => Ok(ErrorCode::RateLimited),
            11 => Ok(ErrorCode::MethodNotAllowed),
            12 => Ok(ErrorCode::PayloadTooLarge),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1002 => Ok(ErrorCode::InvalidCredentials),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),
            1005 => Ok(ErrorCode::EmailAlreadyRegistered),
            1006 => Ok(ErrorCode::RegistrationRoleNotAllowed),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2002 => Ok(ErrorCode::RoleRequired),
            2003 => Ok(ErrorCode::AdminRequired),
            2004 => Ok(ErrorCode::NotRestaurantManager),
            2005 => Ok(ErrorCode::CannotDeleteSelf),

            // Restaurant
            3001 => Ok(ErrorCode::RestaurantNotFound),
            3002 => Ok(ErrorCode::RestaurantSlugExists),
            3003 => Ok(ErrorCode::RestaurantInactive),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4003 => Ok(ErrorCode::InvalidStatusTransition),
            4004 => Ok(ErrorCode::OrderAlreadyFinalized),
            4005 => Ok(ErrorCode::OrderNumberExists),
            4006 => Ok(ErrorCode::ItemUnavailable),
            4007 => Ok(ErrorCode::RestaurantMismatch),

            // Menu
            6001 => Ok(ErrorCode::MenuNotFound),
            6101 => Ok(ErrorCode::CategoryNotFound),
            6201 => Ok(ErrorCode::MenuItemNotFound),
            6202 => Ok(ErrorCode::InvalidPrice),
            6301 => Ok(ErrorCode::VariantNotFound),

            // Table
            7001 => Ok(ErrorCode::TableNotFound),
            7002 => Ok(ErrorCode::TableNumberExists),

            // User
            8001 => Ok(ErrorCode::UserNotFound),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9004 => Ok(ErrorCode::TimeoutError),
            9101 => Ok(ErrorCode::RealtimeUnavailable),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
