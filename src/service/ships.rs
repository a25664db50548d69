use std::str::FromStr;

use chrono::Datelike;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::instrument;

use crate::{
    dao::ShipRepository,
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{PaginationInput, ShipDetailType, ShipInputType, ShipListInputType, ShipSaveType},
    },
    service::filter::ShipFilter,
};

const MAX_TEXT_LENGTH: usize = 50;
const MIN_SPEED: f64 = 0.01;
const MAX_SPEED: f64 = 0.99;
const MIN_CREW_SIZE: i32 = 1;
const MAX_CREW_SIZE: i32 = 9999;
const MIN_PROD_YEAR: i32 = 2800;
/**
 * Last production year, also the reference year of the rating.
 */
const CURRENT_YEAR: i32 = 3019;

/**
 * Represents the service for managing ships.
 */
pub struct ShipService<R> {
    /**
     * The repository ships are read from and written to.
     */
    ship_repository: R,
}

impl<R: ShipRepository> ShipService<R> {
    /**
     * Creates a new instance of `ShipService`.
     *
     * # Arguments
     * `ship_repository`: The repository for ship operations.
     *
     * # Returns
     * A new instance of `ShipService`.
     */
    pub fn new(ship_repository: R) -> Self {
        ShipService { ship_repository }
    }

    /**
     * Finds a ship by id.
     *
     * # Arguments
     * `ship_id`: Positive ship id.
     *
     * # Returns
     * The ship, `None` when absent, or a validation error for a non-positive id.
     */
    #[instrument(skip(self))]
    pub async fn find_by_id(&self, ship_id: i64) -> Result<Option<ShipDetailType>, ApplicationError> {
        Self::validate_id(ship_id)?;
        self.ship_repository.find_by_id(ship_id).await
    }

    /**
     * Retrieves one page of ships matching the filter.
     *
     * # Arguments
     * `filter_params`: Optional filter criteria.
     * `pagination_input`: Page number, page size and sort order.
     *
     * # Returns
     * The ships on the requested page in sort order.
     */
    #[instrument(skip(self))]
    pub async fn find_all(&self, filter_params: ShipListInputType, pagination_input: PaginationInput) -> Result<Vec<ShipDetailType>, ApplicationError> {
        let filter = ShipFilter::compile(&filter_params);
        self.ship_repository.find_page(filter.as_ref(), pagination_input).await
    }

    /**
     * Counts all ships matching the filter, regardless of paging.
     */
    #[instrument(skip(self))]
    pub async fn count(&self, filter_params: ShipListInputType) -> Result<i64, ApplicationError> {
        let filter = ShipFilter::compile(&filter_params);
        self.ship_repository.count(filter.as_ref()).await
    }

    /**
     * Creates a new ship. `is_used` defaults to false, the rating is computed.
     *
     * # Arguments
     * `ship`: The ship to create.
     *
     * # Returns
     * The persisted ship including its id, or a validation error. Nothing is written when validation fails.
     */
    #[instrument(skip(self, ship))]
    pub async fn save_ship(&self, ship: ShipInputType) -> Result<ShipDetailType, ApplicationError> {
        let ship = ShipInputType { is_used: ship.is_used.or(Some(false)), ..ship };
        let valid_ship = Self::validate_ship(ship, None)?;
        self.ship_repository.save(valid_ship).await
    }

    /**
     * Updates an existing ship. Fields present in `ship` override the stored ones, the rating is recomputed.
     *
     * # Arguments
     * `ship_id`: Positive id of the ship to update.
     * `ship`: The partial ship.
     *
     * # Returns
     * The updated ship. `NotFound` when the id is unknown, checked before the merged ship is validated.
     */
    #[instrument(skip(self, ship))]
    pub async fn update_ship(&self, ship_id: i64, ship: ShipInputType) -> Result<ShipDetailType, ApplicationError> {
        Self::validate_id(ship_id)?;
        let Some(stored_ship) = self.ship_repository.find_by_id(ship_id).await? else {
            tracing::debug!("Ship with id {} not found for update", ship_id);
            return Err(ApplicationError::not_found("Ship not found"));
        };
        let valid_ship = Self::validate_ship(ship.merged_over(&stored_ship), Some(ship_id))?;
        self.ship_repository.save(valid_ship).await
    }

    /**
     * Deletes a ship by id.
     */
    #[instrument(skip(self))]
    pub async fn remove_by_id(&self, ship_id: i64) -> Result<(), ApplicationError> {
        self.ship_repository.delete_by_id(ship_id).await
    }

    fn validate_id(ship_id: i64) -> Result<(), ApplicationError> {
        if ship_id > 0 { Ok(()) } else { Err(ApplicationError::validation("Id must be a positive number")) }
    }

    /**
     * Checks every field of a ship and computes its rating.
     *
     * # Arguments
     * `ship`: The ship to validate.
     * `ship_id`: The id to save under, `None` for a new ship.
     *
     * # Returns
     * The ship ready to be saved, or a validation error naming the first invalid field.
     */
    fn validate_ship(ship: ShipInputType, ship_id: Option<i64>) -> Result<ShipSaveType, ApplicationError> {
        let name = Self::validate_text(ship.name, "Name")?;
        let planet = Self::validate_text(ship.planet, "Planet")?;
        let speed = ship.speed.filter(|speed| (MIN_SPEED..=MAX_SPEED).contains(speed)).ok_or_else(|| ApplicationError::validation("Speed must be between 0.01 and 0.99"))?;
        let crew_size = ship
            .crew_size
            .filter(|crew_size| (MIN_CREW_SIZE..=MAX_CREW_SIZE).contains(crew_size))
            .ok_or_else(|| ApplicationError::validation("Crew size must be between 1 and 9999"))?;
        let prod_date = ship
            .prod_date
            .filter(|prod_date| prod_date.timestamp_millis() >= 0 && (MIN_PROD_YEAR..=CURRENT_YEAR).contains(&prod_date.year()))
            .ok_or_else(|| ApplicationError::validation("Production year must be between 2800 and 3019"))?;
        let is_used = ship.is_used.unwrap_or(false);
        let rating = calculate_rating(speed, prod_date.year(), is_used)?;
        Ok(ShipSaveType { id: ship_id, name, planet, ship_type: ship.ship_type, prod_date, is_used, speed, crew_size, rating })
    }

    fn validate_text(text: Option<String>, field: &str) -> Result<String, ApplicationError> {
        match text {
            Some(text) if !text.is_empty() && text.chars().count() <= MAX_TEXT_LENGTH => Ok(text),
            _ => Err(ApplicationError::new(ErrorType::Validation, format!("{field} must be between 1 and 50 characters"))),
        }
    }
}

/**
 * Computes `80 * speed * k / (3019 - year + 1)` with `k` 0.5 for used ships and 1.0 otherwise,
 * rounded to two decimals with ties rounded down.
 *
 * # Arguments
 * `speed`: Ship speed.
 * `year`: Production year in UTC, at most 3019.
 * `is_used`: Whether the ship is used.
 *
 * # Returns
 * The rating.
 */
pub fn calculate_rating(speed: f64, year: i32, is_used: bool) -> Result<f64, ApplicationError> {
    let k = if is_used { 0.5 } else { 1.0 };
    let raw_rating = (80.0 * speed * k) / f64::from(CURRENT_YEAR - year + 1);
    // Exact binary value of the double, not its shortest decimal form.
    let rating = Decimal::from_f64_retain(raw_rating).ok_or_else(|| ApplicationError::new(ErrorType::Application, format!("Rating {raw_rating} is not representable")))?;
    let rounded = rating.round_dp_with_strategy(2, RoundingStrategy::MidpointTowardZero);
    f64::from_str(&rounded.to_string()).map_err(|err| ApplicationError::new(ErrorType::Application, format!("Rating {rounded} is not representable: {err}")))
}

#[cfg(test)]
mod test {
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;
    use crate::{
        dao::memory::InMemoryShipDao,
        model::models::{ShipOrder, ShipType},
    };

    fn service() -> ShipService<InMemoryShipDao> {
        ShipService::new(InMemoryShipDao::new())
    }

    fn prod_date(year: i32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, 7, 1, 0, 0, 0).unwrap()
    }

    fn valid_input() -> ShipInputType {
        ShipInputType {
            name: Some("Orion III".to_string()),
            planet: Some("Mars".to_string()),
            ship_type: Some(ShipType::Merchant),
            prod_date: Some(prod_date(2995)),
            is_used: None,
            speed: Some(0.82),
            crew_size: Some(617),
        }
    }

    fn page(order: ShipOrder) -> PaginationInput {
        PaginationInput { page_number: 0, page_size: 100, order }
    }

    #[test]
    fn test_rating_example() {
        assert_eq!(calculate_rating(0.5, 2019, false).unwrap(), 0.04);
    }

    #[test]
    fn test_rating_ties_round_down() {
        // 80 * 0.5 * 0.5 / 160 = 0.125 exactly
        assert_eq!(calculate_rating(0.5, 2860, true).unwrap(), 0.12);
        // 80 * 0.75 / 160 = 0.375 exactly
        assert_eq!(calculate_rating(0.75, 2860, false).unwrap(), 0.37);
    }

    #[test]
    fn test_rating_non_ties_round_to_nearest() {
        // 80 * 0.99 / 1 = 79.2
        assert_eq!(calculate_rating(0.99, 3019, false).unwrap(), 79.2);
        // 80 * 0.82 / 25 = 2.624
        assert_eq!(calculate_rating(0.82, 2995, false).unwrap(), 2.62);
        // 80 * 0.7 / 3 = 18.666..
        assert_eq!(calculate_rating(0.7, 3017, false).unwrap(), 18.67);
    }

    #[tokio::test]
    async fn test_save_defaults_is_used_and_computes_rating() {
        let service = service();
        let saved = service.save_ship(valid_input()).await.unwrap();
        assert!(saved.id > 0);
        assert!(!saved.is_used);
        assert_eq!(saved.rating, 2.62);
        let found = service.find_by_id(saved.id).await.unwrap().unwrap();
        assert_eq!(found, saved);
    }

    #[tokio::test]
    async fn test_saved_rating_matches_formula() {
        let service = service();
        for (speed, year, is_used) in [(0.01, 2800, false), (0.99, 3019, true), (0.5, 2860, true), (0.33, 2950, false), (0.77, 3010, true)] {
            let input = ShipInputType { speed: Some(speed), prod_date: Some(prod_date(year)), is_used: Some(is_used), ..valid_input() };
            let saved = service.save_ship(input).await.unwrap();
            let found = service.find_by_id(saved.id).await.unwrap().unwrap();
            let expected = calculate_rating(speed, year, is_used).unwrap();
            assert_eq!(found.rating, expected, "speed {speed} year {year} used {is_used}");
        }
    }

    #[tokio::test]
    async fn test_save_validation_boundaries() {
        let service = service();
        let accepted = [
            ShipInputType { speed: Some(0.01), ..valid_input() },
            ShipInputType { speed: Some(0.99), ..valid_input() },
            ShipInputType { crew_size: Some(1), ..valid_input() },
            ShipInputType { crew_size: Some(9999), ..valid_input() },
            ShipInputType { prod_date: Some(Utc.with_ymd_and_hms(2800, 1, 1, 0, 0, 0).unwrap()), ..valid_input() },
            ShipInputType { prod_date: Some(Utc.with_ymd_and_hms(3019, 12, 31, 23, 59, 59).unwrap()), ..valid_input() },
            ShipInputType { name: Some("x".repeat(50)), planet: Some("ü".repeat(50)), ..valid_input() },
        ];
        for input in accepted {
            assert!(service.save_ship(input.clone()).await.is_ok(), "{input:?}");
        }
        let rejected = [
            ShipInputType { speed: Some(0.009), ..valid_input() },
            ShipInputType { speed: Some(1.0), ..valid_input() },
            ShipInputType { speed: None, ..valid_input() },
            ShipInputType { crew_size: Some(0), ..valid_input() },
            ShipInputType { crew_size: Some(10000), ..valid_input() },
            ShipInputType { crew_size: None, ..valid_input() },
            ShipInputType { prod_date: Some(Utc.with_ymd_and_hms(2799, 12, 31, 23, 59, 59).unwrap()), ..valid_input() },
            ShipInputType { prod_date: Some(Utc.with_ymd_and_hms(3020, 1, 1, 0, 0, 0).unwrap()), ..valid_input() },
            ShipInputType { prod_date: None, ..valid_input() },
            ShipInputType { name: Some(String::new()), ..valid_input() },
            ShipInputType { name: Some("x".repeat(51)), ..valid_input() },
            ShipInputType { name: None, ..valid_input() },
            ShipInputType { planet: Some(String::new()), ..valid_input() },
            ShipInputType { planet: Some("x".repeat(51)), ..valid_input() },
        ];
        for input in rejected {
            let error = service.save_ship(input.clone()).await.unwrap_err();
            assert_eq!(error.error_type, ErrorType::Validation, "{input:?}");
        }
        assert_eq!(service.count(ShipListInputType::default()).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_save_without_ship_type() {
        let service = service();
        let saved = service.save_ship(ShipInputType { ship_type: None, ..valid_input() }).await.unwrap();
        assert_eq!(saved.ship_type, None);
        assert_eq!(service.find_by_id(saved.id).await.unwrap(), Some(saved.clone()));

        let merchants = ShipListInputType { ship_type: Some(ShipType::Merchant), ..Default::default() };
        assert_eq!(service.count(merchants).await.unwrap(), 0);

        let updated = service.update_ship(saved.id, ShipInputType { crew_size: Some(12), ..Default::default() }).await.unwrap();
        assert_eq!(updated.ship_type, None);
        let typed = service.update_ship(saved.id, ShipInputType { ship_type: Some(ShipType::Military), ..Default::default() }).await.unwrap();
        assert_eq!(typed.ship_type, Some(ShipType::Military));
    }

    #[tokio::test]
    async fn test_negative_timestamp_rejected() {
        let service = service();
        let input = ShipInputType { prod_date: Some(Utc.with_ymd_and_hms(1969, 12, 31, 0, 0, 0).unwrap()), ..valid_input() };
        assert_eq!(service.save_ship(input).await.unwrap_err().error_type, ErrorType::Validation);
    }

    #[tokio::test]
    async fn test_update_partial_keeps_unspecified_fields() {
        let service = service();
        let saved = service.save_ship(valid_input()).await.unwrap();
        let update = ShipInputType { name: Some("Renamed".to_string()), is_used: Some(true), ..Default::default() };
        let updated = service.update_ship(saved.id, update).await.unwrap();
        assert_eq!(updated.id, saved.id);
        assert_eq!(updated.name, "Renamed");
        assert!(updated.is_used);
        assert_eq!(updated.planet, saved.planet);
        assert_eq!(updated.ship_type, saved.ship_type);
        assert_eq!(updated.prod_date, saved.prod_date);
        assert_eq!(updated.speed, saved.speed);
        assert_eq!(updated.crew_size, saved.crew_size);
        assert_eq!(updated.rating, calculate_rating(saved.speed, 2995, true).unwrap());
        assert_eq!(service.find_by_id(saved.id).await.unwrap().unwrap(), updated);
    }

    #[tokio::test]
    async fn test_update_empty_recomputes_rating_only() {
        let service = service();
        let saved = service.save_ship(valid_input()).await.unwrap();
        let updated = service.update_ship(saved.id, ShipInputType::default()).await.unwrap();
        assert_eq!(updated, saved);
    }

    #[tokio::test]
    async fn test_update_invalid_leaves_stored_ship() {
        let service = service();
        let saved = service.save_ship(valid_input()).await.unwrap();
        let update = ShipInputType { name: Some("Renamed".to_string()), crew_size: Some(0), ..Default::default() };
        let error = service.update_ship(saved.id, update).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::Validation);
        assert_eq!(service.find_by_id(saved.id).await.unwrap().unwrap(), saved);
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_not_found_before_validation() {
        let service = service();
        let update = ShipInputType { crew_size: Some(0), ..Default::default() };
        let error = service.update_ship(99, update).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::NotFound);
    }

    #[tokio::test]
    async fn test_non_positive_id_is_validation_error() {
        let service = service();
        assert_eq!(service.update_ship(0, valid_input()).await.unwrap_err().error_type, ErrorType::Validation);
        assert_eq!(service.update_ship(-3, valid_input()).await.unwrap_err().error_type, ErrorType::Validation);
        assert_eq!(service.find_by_id(0).await.unwrap_err().error_type, ErrorType::Validation);
    }

    #[tokio::test]
    async fn test_remove_by_id() {
        let service = service();
        let saved = service.save_ship(valid_input()).await.unwrap();
        service.remove_by_id(saved.id).await.unwrap();
        assert!(service.find_by_id(saved.id).await.unwrap().is_none());
        assert_eq!(service.remove_by_id(saved.id).await.unwrap_err().error_type, ErrorType::NotFound);
    }

    #[tokio::test]
    async fn test_find_all_and_count_use_filter() {
        let service = service();
        service.save_ship(ShipInputType { name: Some("Alpha".to_string()), speed: Some(0.2), ..valid_input() }).await.unwrap();
        service.save_ship(ShipInputType { name: Some("Beta".to_string()), speed: Some(0.9), ..valid_input() }).await.unwrap();
        service.save_ship(ShipInputType { name: Some("Alphabet".to_string()), speed: Some(0.5), is_used: Some(true), ..valid_input() }).await.unwrap();

        let unfiltered = service.find_all(ShipListInputType::default(), page(ShipOrder::Id)).await.unwrap();
        assert_eq!(unfiltered.len(), 3);
        assert_eq!(service.count(ShipListInputType::default()).await.unwrap(), 3);

        let filter = ShipListInputType { name: Some("Alpha".to_string()), ..Default::default() };
        let by_speed: Vec<String> = service.find_all(filter.clone(), page(ShipOrder::Speed)).await.unwrap().into_iter().map(|ship| ship.name).collect();
        assert_eq!(by_speed, vec!["Alpha".to_string(), "Alphabet".to_string()]);
        assert_eq!(service.count(filter).await.unwrap(), 2);

        let used = ShipListInputType { is_used: Some(true), ..Default::default() };
        assert_eq!(service.count(used).await.unwrap(), 1);

        let paged = service.find_all(ShipListInputType::default(), PaginationInput { page_number: 1, page_size: 2, order: ShipOrder::Name }).await.unwrap();
        assert_eq!(paged.len(), 1);
        assert_eq!(paged[0].name, "Beta");
    }
}
