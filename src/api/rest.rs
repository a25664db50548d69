use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::{PaginationInput, ShipDetailType, ShipInputType, ShipListInputType, ShipOrder, ShipType},
};

/**
 * Default number of ships per page.
 */
const DEFAULT_PAGE_SIZE: i64 = 3;

/***************** Ship models *********************/

/**
 * Request body for creating or updating a ship.
 *
 * Every field is optional. `id` and `rating` are not accepted from callers and are ignored if sent.
 */
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipRequest {
    pub name: Option<String>,
    pub planet: Option<String>,
    pub ship_type: Option<ShipType>,
    /**
     * Production date as epoch milliseconds.
     */
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub prod_date: Option<DateTime<Utc>>,
    pub is_used: Option<bool>,
    pub speed: Option<f64>,
    pub crew_size: Option<i32>,
}

impl From<ShipRequest> for ShipInputType {
    fn from(request: ShipRequest) -> Self {
        ShipInputType {
            name: request.name,
            planet: request.planet,
            ship_type: request.ship_type,
            prod_date: request.prod_date,
            is_used: request.is_used,
            speed: request.speed,
            crew_size: request.crew_size,
        }
    }
}

/**
 * A ship as returned by the API.
 */
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize, PartialEq))]
#[serde(rename_all = "camelCase")]
pub struct ShipResponse {
    pub id: i64,
    pub name: String,
    pub planet: String,
    /**
     * Serialized as `null` for a ship stored without a type.
     */
    pub ship_type: Option<ShipType>,
    /**
     * Production date as epoch milliseconds.
     */
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub prod_date: DateTime<Utc>,
    pub is_used: bool,
    pub speed: f64,
    pub crew_size: i32,
    pub rating: f64,
}

impl From<ShipDetailType> for ShipResponse {
    fn from(ship: ShipDetailType) -> Self {
        ShipResponse {
            id: ship.id,
            name: ship.name,
            planet: ship.planet,
            ship_type: ship.ship_type,
            prod_date: ship.prod_date,
            is_used: ship.is_used,
            speed: ship.speed,
            crew_size: ship.crew_size,
            rating: ship.rating,
        }
    }
}

/***************** Ships:list models *********************/

/**
 * Query parameters filtering the ship list and count.
 */
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipFilterQuery {
    pub name: Option<String>,
    pub planet: Option<String>,
    pub ship_type: Option<ShipType>,
    pub is_used: Option<bool>,
    /**
     * Earliest production date as epoch milliseconds, inclusive.
     */
    pub after: Option<i64>,
    /**
     * Latest production date as epoch milliseconds, inclusive.
     */
    pub before: Option<i64>,
    pub min_crew_size: Option<i32>,
    pub max_crew_size: Option<i32>,
    pub min_speed: Option<f64>,
    pub max_speed: Option<f64>,
    pub min_rating: Option<f64>,
    pub max_rating: Option<f64>,
}

impl TryFrom<ShipFilterQuery> for ShipListInputType {
    type Error = ApplicationError;

    fn try_from(query: ShipFilterQuery) -> Result<Self, Self::Error> {
        Ok(ShipListInputType {
            name: query.name,
            planet: query.planet,
            ship_type: query.ship_type,
            is_used: query.is_used,
            after: to_timestamp(query.after, "after")?,
            before: to_timestamp(query.before, "before")?,
            min_crew_size: query.min_crew_size,
            max_crew_size: query.max_crew_size,
            min_speed: query.min_speed,
            max_speed: query.max_speed,
            min_rating: query.min_rating,
            max_rating: query.max_rating,
        })
    }
}

fn to_timestamp(millis: Option<i64>, parameter: &str) -> Result<Option<DateTime<Utc>>, ApplicationError> {
    millis
        .map(|millis| DateTime::from_timestamp_millis(millis).ok_or_else(|| ApplicationError::validation(&format!("Parameter {parameter} is out of range"))))
        .transpose()
}

/**
 * Pagination query parameters for the ship list.
 */
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationQuery {
    /**
     * The zero based page to return.
     */
    pub page_number: Option<i64>,
    /**
     * The size of the page to return.
     */
    pub page_size: Option<i64>,
    /**
     * Field to sort on, ascending.
     */
    pub order: Option<ShipOrder>,
}

impl From<PaginationQuery> for PaginationInput {
    fn from(query: PaginationQuery) -> Self {
        PaginationInput { page_number: query.page_number.unwrap_or(0), page_size: query.page_size.unwrap_or(DEFAULT_PAGE_SIZE), order: query.order.unwrap_or_default() }
    }
}

/***************** Error models *********************/

/**
 * Custom error response for the application.
 */
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct ErrorResponse {
    /**
     * The error code associated with the error type.
     */
    pub code: u16,
    /**
     * A human-readable message describing the error.
     */
    pub message: String,
}

impl ResponseError for ApplicationError {
    fn status_code(&self) -> StatusCode {
        get_statuscode(&self.error_type)
    }

    /**
     * Generates an error response for the application error.
     */
    fn error_response(&self) -> HttpResponse {
        let error_response = ErrorResponse { code: get_error_code(&self.error_type), message: self.message.clone() };
        HttpResponse::build(self.status_code()).json(&error_response)
    }
}

/**
* Maps application errors to HTTP status codes.
*
* # Arguments
* `application_error`: The type of error that occurred.
*
* # Returns
* The corresponding HTTP status code.
*/
fn get_statuscode(application_error: &ErrorType) -> StatusCode {
    match application_error {
        ErrorType::Validation => StatusCode::BAD_REQUEST,
        ErrorType::NotFound => StatusCode::NOT_FOUND,
        ErrorType::Initialization => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorType::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorType::Application => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/**
 * Maps application errors to error codes.
 *
 * # Arguments
 * `application_error`: The type of error that occurred.
 *
 * # Returns
 * The corresponding error code.
 */
fn get_error_code(application_error: &ErrorType) -> u16 {
    match application_error {
        ErrorType::Initialization => 1001,
        ErrorType::Validation => 1002,
        ErrorType::DatabaseError => 1003,
        ErrorType::NotFound => 1004,
        ErrorType::Application => 1005,
    }
}
