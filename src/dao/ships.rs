use std::{borrow::Cow, str::FromStr, sync::Arc};

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};
use tracing::{Instrument, instrument};

use crate::{
    dao::ShipRepository,
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{PaginationInput, ShipDetailType, ShipOrder, ShipSaveType, ShipType},
    },
    service::filter::{FilterValue, Operator, ShipFilter},
};

/**
 * Database response type for querying ships.
 */
pub type QueryShipDbResp = (i64, String, String, Option<String>, DateTime<Utc>, bool, f64, i32, f64);

/**
 * SQL query to find a ship by id.
 */
const QUERY_SHIP_BY_ID: &str = "SELECT id, name, planet, ship_type, prod_date, is_used, speed, crew_size, rating FROM ship WHERE id = $1";

/**
 * Start of the SQL query listing ships. Filter, order and paging are appended.
 */
const QUERY_SHIP_LIST: &str = "SELECT id, name, planet, ship_type, prod_date, is_used, speed, crew_size, rating FROM ship";

/**
 * Start of the SQL query counting ships. Filter is appended.
 */
const QUERY_SHIP_COUNT: &str = "SELECT count(*) FROM ship";

/**
 * SQL query to add a new ship.
 */
const ADD_SHIP: &str = "INSERT INTO ship (name, planet, ship_type, prod_date, is_used, speed, crew_size, rating) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                        RETURNING id, name, planet, ship_type, prod_date, is_used, speed, crew_size, rating";

/**
 * SQL query to update an existing ship.
 */
const UPDATE_SHIP: &str = "UPDATE ship SET name = $1, planet = $2, ship_type = $3, prod_date = $4, is_used = $5, speed = $6, crew_size = $7, rating = $8 WHERE id = $9
                           RETURNING id, name, planet, ship_type, prod_date, is_used, speed, crew_size, rating";

/**
 * SQL query to delete a ship.
 */
const DELETE_SHIP: &str = "DELETE FROM ship WHERE id = $1";

impl TryFrom<QueryShipDbResp> for ShipDetailType {
    type Error = ApplicationError;

    fn try_from(row: QueryShipDbResp) -> Result<Self, Self::Error> {
        let (id, name, planet, ship_type, prod_date, is_used, speed, crew_size, rating) = row;
        let ship_type = ship_type.as_deref().map(ShipType::from_str).transpose().map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Invalid ship type stored for ship {id}: {err}")))?;
        Ok(ShipDetailType { id, name, planet, ship_type, prod_date, is_used, speed, crew_size, rating })
    }
}

/**
 * DAO for ship-related database operations.
 */
pub struct ShipDao {
    /**
     * Connection pool for database operations.
     */
    connection_pool: Arc<Pool<Postgres>>,
}

impl ShipDao {
    /**
     * Creates a new instance of `ShipDao`.
     *
     * # Arguments
     * `connection_pool`: Connection pool for database operations.
     *
     * # Returns
     * A new instance of `ShipDao`.
     */
    pub fn new(connection_pool: Arc<Pool<Postgres>>) -> Self {
        ShipDao { connection_pool }
    }

    /**
     * Inserts a new ship.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     * `ship`: The validated ship.
     *
     * # Returns
     * The inserted ship with its generated id.
     */
    #[instrument(skip(self, transaction, ship), fields(result))]
    async fn add_ship(&self, transaction: &mut PgConnection, ship: ShipSaveType) -> Result<ShipDetailType, ApplicationError> {
        let span = tracing::Span::current();
        let result: QueryShipDbResp = sqlx::query_as(ADD_SHIP)
            .bind(ship.name)
            .bind(ship.planet)
            .bind(ship.ship_type.map(|ship_type| ship_type.as_str()))
            .bind(ship.prod_date)
            .bind(ship.is_used)
            .bind(ship.speed)
            .bind(ship.crew_size)
            .bind(ship.rating)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| Self::handle_database_error(err.as_database_error()))?;
        ShipDetailType::try_from(result)
    }

    /**
     * Replaces all mutable fields of an existing ship.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     * `ship_id`: The id of the ship to update.
     * `ship`: The validated ship.
     *
     * # Returns
     * The updated ship, or a `NotFound` error when no row has the id.
     */
    #[instrument(skip(self, transaction, ship), fields(result))]
    async fn update_ship(&self, transaction: &mut PgConnection, ship_id: i64, ship: ShipSaveType) -> Result<ShipDetailType, ApplicationError> {
        let span = tracing::Span::current();
        let result: Option<QueryShipDbResp> = sqlx::query_as(UPDATE_SHIP)
            .bind(ship.name)
            .bind(ship.planet)
            .bind(ship.ship_type.map(|ship_type| ship_type.as_str()))
            .bind(ship.prod_date)
            .bind(ship.is_used)
            .bind(ship.speed)
            .bind(ship.crew_size)
            .bind(ship.rating)
            .bind(ship_id)
            .fetch_optional(transaction)
            .instrument(span)
            .await
            .map_err(|err| Self::handle_database_error(err.as_database_error()))?;
        match result {
            Some(row) => ShipDetailType::try_from(row),
            None => {
                tracing::debug!("Ship with id {} not found for update", ship_id);
                Err(ApplicationError::not_found("Ship not found"))
            }
        }
    }

    /**
     * Deletes a ship by its id.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     * `ship_id`: The id of the ship to delete.
     *
     * # Returns
     * A result indicating success or failure of the operation.
     */
    #[instrument(skip(self, transaction), fields(result))]
    async fn delete_ship(&self, transaction: &mut PgConnection, ship_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(DELETE_SHIP)
            .bind(ship_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to delete ship: {err}")))?;
        if result.rows_affected() == 0 {
            tracing::debug!("Ship with ID {} not found for deletion", ship_id);
            return Err(ApplicationError::not_found("Ship not found"));
        }
        if result.rows_affected() > 1 {
            tracing::warn!("Multiple ships attempted deleted. Rolled back");
            return Err(ApplicationError::new(ErrorType::Application, "Multiple ships attempted deleted. Rolled back".to_string()));
        }
        Ok(())
    }

    /**
     * Appends the filter as a `WHERE` clause. Every value is a bound parameter.
     *
     * # Arguments
     * `query_builder`: The query to append to.
     * `filter`: The filter, or `None` for no clause.
     */
    fn push_filter(query_builder: &mut QueryBuilder<'_, Postgres>, filter: Option<&ShipFilter>) {
        let Some(filter) = filter else {
            return;
        };
        for (index, criterion) in filter.criteria().iter().enumerate() {
            query_builder.push(if index == 0 { " WHERE " } else { " AND " });
            let column = criterion.column.column_name();
            match criterion.operator {
                Operator::Contains => {
                    query_builder.push("strpos(").push(column).push(", ");
                    Self::push_value(query_builder, &criterion.value);
                    query_builder.push(") > 0");
                }
                Operator::Equals => {
                    query_builder.push(column).push(" = ");
                    Self::push_value(query_builder, &criterion.value);
                }
                Operator::GreaterOrEqual => {
                    query_builder.push(column).push(" >= ");
                    Self::push_value(query_builder, &criterion.value);
                }
                Operator::LessOrEqual => {
                    query_builder.push(column).push(" <= ");
                    Self::push_value(query_builder, &criterion.value);
                }
            }
        }
    }

    fn push_value(query_builder: &mut QueryBuilder<'_, Postgres>, value: &FilterValue) {
        match value {
            FilterValue::Text(text) => query_builder.push_bind(text.clone()),
            FilterValue::ShipType(ship_type) => query_builder.push_bind(ship_type.as_str()),
            FilterValue::Bool(flag) => query_builder.push_bind(*flag),
            FilterValue::Timestamp(timestamp) => query_builder.push_bind(*timestamp),
            FilterValue::Integer(number) => query_builder.push_bind(*number),
            FilterValue::Float(number) => query_builder.push_bind(*number),
        };
    }

    /**
     * Builds the paged list query.
     *
     * # Arguments
     * `filter`: Optional filter.
     * `pagination`: Page, size and order.
     *
     * # Returns
     * The query builder ready to execute.
     */
    fn list_query(filter: Option<&ShipFilter>, pagination: PaginationInput) -> Result<QueryBuilder<'static, Postgres>, ApplicationError> {
        let mut query_builder = QueryBuilder::new(QUERY_SHIP_LIST);
        Self::push_filter(&mut query_builder, filter);
        query_builder.push(" ORDER BY ").push(pagination.order.column_name());
        if pagination.order != ShipOrder::Id {
            query_builder.push(", id");
        }
        query_builder.push(" LIMIT ").push_bind(pagination.page_size);
        query_builder.push(" OFFSET ").push_bind(pagination.offset()?);
        Ok(query_builder)
    }

    /**
     * Handles database errors and maps them to application errors.
     *
     * # Arguments
     * `error`: The database error to handle.
     *
     * # Returns
     * An `ApplicationError` corresponding to the database error.
     */
    fn handle_database_error(error: Option<&dyn sqlx::error::DatabaseError>) -> ApplicationError {
        if let Some(db_error) = error {
            tracing::debug!("Database error: {}", db_error);
            tracing::info!("Add/Update error: {:?}", db_error.code());
            if db_error.code() == Some(Cow::Borrowed("22001")) {
                // Value too long
                return ApplicationError::new(ErrorType::Validation, "Value too long".to_string());
            } else if db_error.code() == Some(Cow::Borrowed("23514")) {
                // Check violation
                return ApplicationError::new(ErrorType::Validation, "Value out of range".to_string());
            }
            tracing::error!("Unhandled database error: {}", db_error);
            return ApplicationError::new(ErrorType::DatabaseError, "Unhandled database error".to_string());
        }
        ApplicationError::new(ErrorType::DatabaseError, "Failed to execute database operation".to_string())
    }
}

impl ShipRepository for ShipDao {
    #[instrument(skip(self), fields(result))]
    async fn find_by_id(&self, id: i64) -> Result<Option<ShipDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let result: Option<QueryShipDbResp> = sqlx::query_as(QUERY_SHIP_BY_ID)
            .bind(id)
            .fetch_optional(&*self.connection_pool)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to find ship: {err}")))?;
        result.map(ShipDetailType::try_from).transpose()
    }

    #[instrument(skip(self, ship), fields(id = ?ship.id, result))]
    async fn save(&self, ship: ShipSaveType) -> Result<ShipDetailType, ApplicationError> {
        let mut transaction = self.connection_pool.begin().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to begin transaction: {err}")))?;
        let result = match ship.id {
            Some(ship_id) => self.update_ship(&mut transaction, ship_id, ship).await,
            None => self.add_ship(&mut transaction, ship).await,
        };
        match result {
            Ok(saved) => {
                transaction.commit().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to commit transaction: {err}")))?;
                Ok(saved)
            }
            Err(err) => {
                transaction.rollback().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to rollback transaction: {err}")))?;
                Err(err)
            }
        }
    }

    #[instrument(skip(self), fields(result))]
    async fn delete_by_id(&self, id: i64) -> Result<(), ApplicationError> {
        let mut transaction = self.connection_pool.begin().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to begin transaction: {err}")))?;
        match self.delete_ship(&mut transaction, id).await {
            Ok(()) => transaction.commit().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to commit transaction: {err}")))?,
            Err(err) => {
                transaction.rollback().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to rollback transaction: {err}")))?;
                return Err(err);
            }
        }
        Ok(())
    }

    #[instrument(skip(self, filter), fields(result))]
    async fn count(&self, filter: Option<&ShipFilter>) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let mut query_builder = QueryBuilder::new(QUERY_SHIP_COUNT);
        Self::push_filter(&mut query_builder, filter);
        query_builder
            .build_query_scalar::<i64>()
            .fetch_one(&*self.connection_pool)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to count ships: {err}")))
    }

    #[instrument(skip(self, filter), fields(result))]
    async fn find_page(&self, filter: Option<&ShipFilter>, pagination: PaginationInput) -> Result<Vec<ShipDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let mut query_builder = Self::list_query(filter, pagination)?;
        let results: Vec<QueryShipDbResp> = query_builder
            .build_query_as()
            .fetch_all(&*self.connection_pool)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query for ship list: {err}")))?;
        results.into_iter().map(ShipDetailType::try_from).collect()
    }
}
