use chrono::{DateTime, Utc};

use crate::model::models::{ShipDetailType, ShipListInputType, ShipType};

/**
 * Filterable ship columns.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShipColumn {
    Name,
    Planet,
    ShipType,
    IsUsed,
    ProdDate,
    CrewSize,
    Speed,
    Rating,
}

impl ShipColumn {
    /**
     * Name of the column in the `ship` table.
     */
    pub fn column_name(&self) -> &'static str {
        match self {
            ShipColumn::Name => "name",
            ShipColumn::Planet => "planet",
            ShipColumn::ShipType => "ship_type",
            ShipColumn::IsUsed => "is_used",
            ShipColumn::ProdDate => "prod_date",
            ShipColumn::CrewSize => "crew_size",
            ShipColumn::Speed => "speed",
            ShipColumn::Rating => "rating",
        }
    }
}

/**
 * Comparison applied between a column and a value.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /**
     * Case sensitive, unanchored substring match.
     */
    Contains,
    Equals,
    GreaterOrEqual,
    LessOrEqual,
}

/**
 * Value a column is compared against.
 */
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    ShipType(ShipType),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Integer(i32),
    Float(f64),
}

/**
 * A single `column operator value` constraint.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    pub column: ShipColumn,
    pub operator: Operator,
    pub value: FilterValue,
}

impl Criterion {
    pub fn new(column: ShipColumn, operator: Operator, value: FilterValue) -> Self {
        Criterion { column, operator, value }
    }

    /**
     * Evaluates the criterion against a ship.
     * A value of the wrong kind for the column never matches.
     */
    pub fn matches(&self, ship: &ShipDetailType) -> bool {
        match (self.column, &self.value) {
            (ShipColumn::Name, FilterValue::Text(text)) => self.compare_text(&ship.name, text),
            (ShipColumn::Planet, FilterValue::Text(text)) => self.compare_text(&ship.planet, text),
            (ShipColumn::ShipType, FilterValue::ShipType(ship_type)) => ship.ship_type.is_some_and(|actual| self.compare(&actual, ship_type)),
            (ShipColumn::IsUsed, FilterValue::Bool(is_used)) => self.compare(&ship.is_used, is_used),
            (ShipColumn::ProdDate, FilterValue::Timestamp(timestamp)) => self.compare(&ship.prod_date, timestamp),
            (ShipColumn::CrewSize, FilterValue::Integer(crew_size)) => self.compare(&ship.crew_size, crew_size),
            (ShipColumn::Speed, FilterValue::Float(speed)) => self.compare(&ship.speed, speed),
            (ShipColumn::Rating, FilterValue::Float(rating)) => self.compare(&ship.rating, rating),
            _ => false,
        }
    }

    fn compare_text(&self, actual: &str, expected: &str) -> bool {
        match self.operator {
            Operator::Contains => actual.contains(expected),
            _ => self.compare(actual, expected),
        }
    }

    fn compare<T: PartialOrd + ?Sized>(&self, actual: &T, expected: &T) -> bool {
        match self.operator {
            Operator::Contains => false,
            Operator::Equals => actual == expected,
            Operator::GreaterOrEqual => actual >= expected,
            Operator::LessOrEqual => actual <= expected,
        }
    }
}

/**
 * Conjunction of criteria. A ship matches when every criterion matches.
 */
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShipFilter {
    criteria: Vec<Criterion>,
}

impl ShipFilter {
    /**
     * Compiles optional list criteria into a filter.
     *
     * # Arguments
     * `input`: The optional criteria.
     *
     * # Returns
     * `None` when no criterion is present, meaning the query is unconstrained.
     */
    pub fn compile(input: &ShipListInputType) -> Option<ShipFilter> {
        let filter = ShipFilter::default()
            .and_some(ShipColumn::Name, Operator::Contains, input.name.clone().map(FilterValue::Text))
            .and_some(ShipColumn::Planet, Operator::Contains, input.planet.clone().map(FilterValue::Text))
            .and_some(ShipColumn::ShipType, Operator::Equals, input.ship_type.map(FilterValue::ShipType))
            .and_some(ShipColumn::IsUsed, Operator::Equals, input.is_used.map(FilterValue::Bool))
            .and_range(ShipColumn::ProdDate, input.after.map(FilterValue::Timestamp), input.before.map(FilterValue::Timestamp))
            .and_range(ShipColumn::CrewSize, input.min_crew_size.map(FilterValue::Integer), input.max_crew_size.map(FilterValue::Integer))
            .and_range(ShipColumn::Speed, input.min_speed.map(FilterValue::Float), input.max_speed.map(FilterValue::Float))
            .and_range(ShipColumn::Rating, input.min_rating.map(FilterValue::Float), input.max_rating.map(FilterValue::Float));
        if filter.criteria.is_empty() { None } else { Some(filter) }
    }

    /**
     * Adds a criterion to the conjunction.
     */
    pub fn and(mut self, criterion: Criterion) -> Self {
        self.criteria.push(criterion);
        self
    }

    fn and_some(self, column: ShipColumn, operator: Operator, value: Option<FilterValue>) -> Self {
        match value {
            Some(value) => self.and(Criterion::new(column, operator, value)),
            None => self,
        }
    }

    // Inclusive on both ends, either end may be open.
    fn and_range(self, column: ShipColumn, lower: Option<FilterValue>, upper: Option<FilterValue>) -> Self {
        self.and_some(column, Operator::GreaterOrEqual, lower).and_some(column, Operator::LessOrEqual, upper)
    }

    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    /**
     * Evaluates the conjunction against a ship.
     */
    pub fn matches(&self, ship: &ShipDetailType) -> bool {
        self.criteria.iter().all(|criterion| criterion.matches(ship))
    }
}
