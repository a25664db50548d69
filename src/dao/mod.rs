pub mod memory;
pub mod ships;

use crate::{
    model::{
        apperror::ApplicationError,
        models::{PaginationInput, ShipDetailType, ShipSaveType},
    },
    service::filter::ShipFilter,
};

/**
 * Persistence operations the ship service relies on.
 * Each call is atomic on its own; no transaction spans two calls.
 */
#[allow(async_fn_in_trait)]
pub trait ShipRepository {
    /**
     * Finds a ship by id.
     */
    async fn find_by_id(&self, id: i64) -> Result<Option<ShipDetailType>, ApplicationError>;

    /**
     * Inserts the ship when it has no id, otherwise replaces the stored ship.
     *
     * # Returns
     * The persisted ship with its id.
     */
    async fn save(&self, ship: ShipSaveType) -> Result<ShipDetailType, ApplicationError>;

    /**
     * Deletes a ship by id. Deleting a missing id is a `NotFound` error.
     */
    async fn delete_by_id(&self, id: i64) -> Result<(), ApplicationError>;

    /**
     * Counts ships matching the filter, or all ships when there is no filter.
     */
    async fn count(&self, filter: Option<&ShipFilter>) -> Result<i64, ApplicationError>;

    /**
     * Fetches one page of matching ships sorted ascending on the requested order.
     */
    async fn find_page(&self, filter: Option<&ShipFilter>, pagination: PaginationInput) -> Result<Vec<ShipDetailType>, ApplicationError>;
}
