use std::{cmp::Ordering, collections::BTreeMap, sync::RwLock};

use tracing::instrument;

use crate::{
    dao::ShipRepository,
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{PaginationInput, ShipDetailType, ShipOrder, ShipSaveType},
    },
    service::filter::ShipFilter,
};

#[derive(Default)]
struct ShipStore {
    last_id: i64,
    ships: BTreeMap<i64, ShipDetailType>,
}

/**
 * Ship repository backed by process memory.
 */
#[derive(Default)]
pub struct InMemoryShipDao {
    store: RwLock<ShipStore>,
}

impl InMemoryShipDao {
    pub fn new() -> Self {
        InMemoryShipDao::default()
    }

    fn poisoned() -> ApplicationError {
        ApplicationError::new(ErrorType::Application, "Ship store lock poisoned".to_string())
    }

    fn compare(order: ShipOrder, left: &ShipDetailType, right: &ShipDetailType) -> Ordering {
        let ordering = match order {
            ShipOrder::Id => Ordering::Equal,
            ShipOrder::Name => left.name.cmp(&right.name),
            ShipOrder::Planet => left.planet.cmp(&right.planet),
            ShipOrder::Date => left.prod_date.cmp(&right.prod_date),
            ShipOrder::Speed => left.speed.total_cmp(&right.speed),
            ShipOrder::CrewSize => left.crew_size.cmp(&right.crew_size),
            ShipOrder::Rating => left.rating.total_cmp(&right.rating),
        };
        ordering.then(left.id.cmp(&right.id))
    }
}

impl ShipRepository for InMemoryShipDao {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> Result<Option<ShipDetailType>, ApplicationError> {
        let store = self.store.read().map_err(|_| Self::poisoned())?;
        Ok(store.ships.get(&id).cloned())
    }

    #[instrument(skip(self, ship), fields(id = ?ship.id))]
    async fn save(&self, ship: ShipSaveType) -> Result<ShipDetailType, ApplicationError> {
        let mut store = self.store.write().map_err(|_| Self::poisoned())?;
        let id = match ship.id {
            Some(id) if store.ships.contains_key(&id) => id,
            Some(id) => return Err(ApplicationError::not_found(&format!("Ship {id} not found"))),
            None => {
                store.last_id += 1;
                store.last_id
            }
        };
        let detail = ship.into_detail(id);
        store.ships.insert(id, detail.clone());
        Ok(detail)
    }

    #[instrument(skip(self))]
    async fn delete_by_id(&self, id: i64) -> Result<(), ApplicationError> {
        let mut store = self.store.write().map_err(|_| Self::poisoned())?;
        match store.ships.remove(&id) {
            Some(_) => Ok(()),
            None => {
                tracing::debug!("Ship with ID {} not found for deletion", id);
                Err(ApplicationError::not_found("Ship not found"))
            }
        }
    }

    #[instrument(skip(self, filter))]
    async fn count(&self, filter: Option<&ShipFilter>) -> Result<i64, ApplicationError> {
        let store = self.store.read().map_err(|_| Self::poisoned())?;
        let count = store.ships.values().filter(|ship| filter.is_none_or(|filter| filter.matches(ship))).count();
        i64::try_from(count).map_err(|err| ApplicationError::new(ErrorType::Application, format!("Failed to count ships: {err}")))
    }

    #[instrument(skip(self, filter))]
    async fn find_page(&self, filter: Option<&ShipFilter>, pagination: PaginationInput) -> Result<Vec<ShipDetailType>, ApplicationError> {
        let store = self.store.read().map_err(|_| Self::poisoned())?;
        let mut ships: Vec<&ShipDetailType> = store.ships.values().filter(|ship| filter.is_none_or(|filter| filter.matches(ship))).collect();
        ships.sort_by(|left, right| Self::compare(pagination.order, left, right));
        let offset = usize::try_from(pagination.offset()?).map_err(|err| ApplicationError::new(ErrorType::Validation, format!("Invalid offset: {err}")))?;
        let page_size = usize::try_from(pagination.page_size).map_err(|err| ApplicationError::new(ErrorType::Validation, format!("Invalid page size: {err}")))?;
        Ok(ships.into_iter().skip(offset).take(page_size).cloned().collect())
    }
}
