use crate::service::ships::ShipService;

/**
* Represents the application state shared across the Actix web application.
*/
pub struct AppState<R> {
    /**
     * The ship service for handling ship-related operations.
     */
    pub ship_service: ShipService<R>,
}

/**
 * Creates a new instance of `AppState`.
 *
 * # Arguments
 * `ship_service`: The ship service for handling ship-related operations.
 */
impl<R> AppState<R> {
    pub fn new(ship_service: ShipService<R>) -> Self {
        AppState { ship_service }
    }
}
