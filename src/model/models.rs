use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::apperror::ApplicationError;

/**
 * The closed set of ship categories.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipType {
    Transport,
    Military,
    Merchant,
}

impl ShipType {
    /**
     * The value stored in the `ship_type` column.
     */
    pub fn as_str(&self) -> &'static str {
        match self {
            ShipType::Transport => "TRANSPORT",
            ShipType::Military => "MILITARY",
            ShipType::Merchant => "MERCHANT",
        }
    }
}

impl fmt::Display for ShipType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ShipType {
    type Err = ApplicationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "TRANSPORT" => Ok(ShipType::Transport),
            "MILITARY" => Ok(ShipType::Military),
            "MERCHANT" => Ok(ShipType::Merchant),
            other => Err(ApplicationError::validation(&format!("Unknown ship type {other}"))),
        }
    }
}

/**
 * Field the ship listing is sorted on. Sorting is always ascending.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum ShipOrder {
    #[default]
    #[serde(rename = "ID", alias = "id")]
    Id,
    #[serde(rename = "NAME", alias = "name")]
    Name,
    #[serde(rename = "PLANET", alias = "planet")]
    Planet,
    #[serde(rename = "DATE", alias = "prodDate")]
    Date,
    #[serde(rename = "SPEED", alias = "speed")]
    Speed,
    #[serde(rename = "CREW_SIZE", alias = "crewSize")]
    CrewSize,
    #[serde(rename = "RATING", alias = "rating")]
    Rating,
}

impl ShipOrder {
    /**
     * Column used in `ORDER BY`. Never taken from user input directly.
     */
    pub fn column_name(&self) -> &'static str {
        match self {
            ShipOrder::Id => "id",
            ShipOrder::Name => "name",
            ShipOrder::Planet => "planet",
            ShipOrder::Date => "prod_date",
            ShipOrder::Speed => "speed",
            ShipOrder::CrewSize => "crew_size",
            ShipOrder::Rating => "rating",
        }
    }
}

/**
 * A persisted ship.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct ShipDetailType {
    pub id: i64,
    pub name: String,
    pub planet: String,
    pub ship_type: Option<ShipType>,
    pub prod_date: DateTime<Utc>,
    pub is_used: bool,
    pub speed: f64,
    pub crew_size: i32,
    pub rating: f64,
}

/**
 * A ship as supplied by a caller. Every field is optional so the same type serves
 * creation (missing fields fail validation) and partial updates (missing fields keep the stored value).
 */
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShipInputType {
    pub name: Option<String>,
    pub planet: Option<String>,
    pub ship_type: Option<ShipType>,
    pub prod_date: Option<DateTime<Utc>>,
    pub is_used: Option<bool>,
    pub speed: Option<f64>,
    pub crew_size: Option<i32>,
}

impl ShipInputType {
    /**
     * Overlays this partial ship on a stored one. Fields given here win, the rest are taken from `stored`.
     *
     * # Arguments
     * `stored`: The ship currently persisted.
     *
     * # Returns
     * A fully populated `ShipInputType`.
     */
    pub fn merged_over(self, stored: &ShipDetailType) -> ShipInputType {
        ShipInputType {
            name: self.name.or_else(|| Some(stored.name.clone())),
            planet: self.planet.or_else(|| Some(stored.planet.clone())),
            ship_type: self.ship_type.or(stored.ship_type),
            prod_date: self.prod_date.or(Some(stored.prod_date)),
            is_used: self.is_used.or(Some(stored.is_used)),
            speed: self.speed.or(Some(stored.speed)),
            crew_size: self.crew_size.or(Some(stored.crew_size)),
        }
    }
}

/**
 * A validated ship with its rating, ready to be written.
 * `id` is `None` for a ship not yet persisted.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct ShipSaveType {
    pub id: Option<i64>,
    pub name: String,
    pub planet: String,
    pub ship_type: Option<ShipType>,
    pub prod_date: DateTime<Utc>,
    pub is_used: bool,
    pub speed: f64,
    pub crew_size: i32,
    pub rating: f64,
}

impl ShipSaveType {
    /**
     * Turns the saved ship into a persisted one using the assigned id.
     */
    pub fn into_detail(self, id: i64) -> ShipDetailType {
        ShipDetailType {
            id,
            name: self.name,
            planet: self.planet,
            ship_type: self.ship_type,
            prod_date: self.prod_date,
            is_used: self.is_used,
            speed: self.speed,
            crew_size: self.crew_size,
            rating: self.rating,
        }
    }
}

/**
 * Optional criteria narrowing a ship listing or count.
 */
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShipListInputType {
    pub name: Option<String>,
    pub planet: Option<String>,
    pub ship_type: Option<ShipType>,
    pub is_used: Option<bool>,
    pub after: Option<DateTime<Utc>>,
    pub before: Option<DateTime<Utc>>,
    pub min_crew_size: Option<i32>,
    pub max_crew_size: Option<i32>,
    pub min_speed: Option<f64>,
    pub max_speed: Option<f64>,
    pub min_rating: Option<f64>,
    pub max_rating: Option<f64>,
}

/**
 * Pagination for the ship listing. Pages are zero based.
 */
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaginationInput {
    pub page_number: i64,
    pub page_size: i64,
    pub order: ShipOrder,
}

impl PaginationInput {
    /**
     * Validates the pagination input.
     *
     * # Returns
     * The validated input or a validation error.
     */
    pub fn validate(self) -> Result<Self, ApplicationError> {
        if self.page_size < 1 {
            return Err(ApplicationError::validation("Page size must be at least 1"));
        }
        if self.page_number < 0 {
            return Err(ApplicationError::validation("Page number cannot be negative"));
        }
        self.offset()?;
        Ok(self)
    }

    /**
     * Number of rows to skip before the requested page.
     */
    pub fn offset(&self) -> Result<i64, ApplicationError> {
        self.page_number.checked_mul(self.page_size).ok_or_else(|| ApplicationError::validation("Page number too large"))
    }
}
