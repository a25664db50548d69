use actix_web::{
    HttpRequest, HttpResponse,
    web::{self, Path},
};
use tracing::{Instrument, instrument};

use crate::{
    api::{
        rest::{PaginationQuery, ShipFilterQuery, ShipRequest, ShipResponse},
        state::AppState,
    },
    dao::ShipRepository,
    model::{
        apperror::ApplicationError,
        models::{PaginationInput, ShipListInputType},
    },
};

/**
 * Registers the ship endpoints and the extractor error handlers.
 * `/rest/ships/count` is registered before `/rest/ships/{id}` so it is not taken for an id.
 */
pub fn configure<R: ShipRepository + 'static>(config: &mut web::ServiceConfig) {
    config
        .app_data(web::QueryConfig::default().error_handler(|err, _request| ApplicationError::validation(&format!("Invalid query: {err}")).into()))
        .app_data(web::JsonConfig::default().error_handler(|err, _request| ApplicationError::validation(&format!("Invalid body: {err}")).into()))
        .service(web::resource("/rest/ships/count").route(web::get().to(ships_count::<R>)))
        .service(
            web::resource("/rest/ships/{shipId}")
                .route(web::get().to(ship_get::<R>))
                .route(web::post().to(ship_update::<R>))
                .route(web::delete().to(ship_delete::<R>)),
        )
        .service(web::resource("/rest/ships").route(web::get().to(ships_list::<R>)).route(web::post().to(ship_add::<R>)));
}

/**
 * Endpoint to retrieve a single ship.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "getShip", trace_id = get_trace_id(&http_request), result))]
pub async fn ship_get<R: ShipRepository + 'static>(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState<R>>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let ship_id = parse_ship_id(&path.into_inner())?;
    match app_state.ship_service.find_by_id(ship_id).instrument(span).await? {
        Some(ship) => Ok(HttpResponse::Ok().json(ShipResponse::from(ship))),
        None => Err(ApplicationError::not_found("Ship not found")),
    }
}

/**
 * Endpoint to create a ship.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "addShip", trace_id = get_trace_id(&http_request), result))]
pub async fn ship_add<R: ShipRepository + 'static>(http_request: HttpRequest, request_body: web::Json<ShipRequest>, app_state: web::Data<AppState<R>>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let ship = app_state.ship_service.save_ship(request_body.into_inner().into()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(ShipResponse::from(ship)))
}

/**
 * Endpoint to update a ship. Only the fields present in the body are changed.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "updateShip", trace_id = get_trace_id(&http_request), result))]
pub async fn ship_update<R: ShipRepository + 'static>(
    path: Path<String>,
    http_request: HttpRequest,
    request_body: web::Json<ShipRequest>,
    app_state: web::Data<AppState<R>>,
) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let ship_id = parse_ship_id(&path.into_inner())?;
    let ship = app_state.ship_service.update_ship(ship_id, request_body.into_inner().into()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(ShipResponse::from(ship)))
}

/**
 * Endpoint to delete a ship.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "deleteShip", trace_id = get_trace_id(&http_request), result))]
pub async fn ship_delete<R: ShipRepository + 'static>(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState<R>>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let ship_id = parse_ship_id(&path.into_inner())?;
    if app_state.ship_service.find_by_id(ship_id).instrument(span.clone()).await?.is_none() {
        return Err(ApplicationError::not_found("Ship not found"));
    }
    app_state.ship_service.remove_by_id(ship_id).instrument(span).await?;
    Ok(HttpResponse::Ok().finish())
}

/**
 * Endpoint to retrieve a page of ships.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "listShips", trace_id = get_trace_id(&http_request), result))]
pub async fn ships_list<R: ShipRepository + 'static>(
    http_request: HttpRequest,
    filter: web::Query<ShipFilterQuery>,
    pagination: web::Query<PaginationQuery>,
    app_state: web::Data<AppState<R>>,
) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let pagination_input = PaginationInput::from(pagination.into_inner()).validate()?;
    let filter_params = ShipListInputType::try_from(filter.into_inner())?;
    let ships = app_state.ship_service.find_all(filter_params, pagination_input).instrument(span).await?;
    Ok(HttpResponse::Ok().json(ships.into_iter().map(ShipResponse::from).collect::<Vec<ShipResponse>>()))
}

/**
 * Endpoint to count the ships matching a filter.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "countShips", trace_id = get_trace_id(&http_request), result))]
pub async fn ships_count<R: ShipRepository + 'static>(http_request: HttpRequest, filter: web::Query<ShipFilterQuery>, app_state: web::Data<AppState<R>>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let filter_params = ShipListInputType::try_from(filter.into_inner())?;
    let count = app_state.ship_service.count(filter_params).instrument(span).await?;
    Ok(HttpResponse::Ok().json(count))
}

/**
 * Parses a ship id path segment. Only positive integers are ids.
 */
fn parse_ship_id(path_segment: &str) -> Result<i64, ApplicationError> {
    match path_segment.parse::<i64>() {
        Ok(ship_id) if ship_id > 0 => Ok(ship_id),
        _ => Err(ApplicationError::validation(&format!("Invalid ship id {path_segment}"))),
    }
}

/**
 * Retrieves the trace ID from the HTTP request headers.
 * If the trace ID is not present, a new UUID is generated.
 */
fn get_trace_id(http_request: &HttpRequest) -> String {
    http_request.headers().get("X-Trace-ID")
        .and_then(|v| v.to_str().ok().map(std::string::ToString::to_string))
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

#[cfg(test)]
mod test {
    use actix_web::{
        App,
        http::StatusCode,
        test::{self, TestRequest},
    };
    use serde_json::{Value, json};

    use super::*;
    use crate::{
        api::rest::ErrorResponse,
        dao::memory::InMemoryShipDao,
        model::models::ShipType,
        service::ships::ShipService,
    };

    // 2995-07-01T00:00:00Z
    const PROD_DATE_2995: i64 = 32361552000000;

    macro_rules! init_app {
        () => {
            test::init_service(App::new().app_data(web::Data::new(AppState::new(ShipService::new(InMemoryShipDao::new())))).configure(configure::<InMemoryShipDao>)).await
        };
    }

    macro_rules! create_ship {
        ($app:expr, $body:expr) => {{
            let response = test::call_service(&$app, TestRequest::post().uri("/rest/ships").set_json($body).to_request()).await;
            assert_eq!(response.status(), StatusCode::OK);
            let created: ShipResponse = test::read_body_json(response).await;
            created
        }};
    }

    fn ship_body(name: &str) -> Value {
        json!({"name": name, "planet": "Mars", "shipType": "MERCHANT", "prodDate": PROD_DATE_2995, "speed": 0.82, "crewSize": 617})
    }

    #[actix_web::test]
    async fn test_get_trace_id_exists() {
        let request = TestRequest::default()
            .insert_header(("X-Trace-ID", "test"))
            .to_http_request();
        let trace_id = get_trace_id(&request);
        assert_eq!(trace_id, "test");
    }

    #[actix_web::test]
    async fn test_get_trace_id_not_exists() {
        let request = TestRequest::default()
            .to_http_request();
        let trace_id = get_trace_id(&request);
        assert!(!trace_id.is_empty());
    }

    #[test]
    fn test_parse_ship_id() {
        assert_eq!(parse_ship_id("12").unwrap(), 12);
        assert!(parse_ship_id("0").is_err());
        assert!(parse_ship_id("-4").is_err());
        assert!(parse_ship_id("abc").is_err());
        assert!(parse_ship_id("1.5").is_err());
    }

    #[actix_web::test]
    async fn test_create_then_get() {
        let app = init_app!();
        let created = create_ship!(app, ship_body("Orion"));
        assert_eq!(created.name, "Orion");
        assert_eq!(created.ship_type, Some(ShipType::Merchant));
        assert!(!created.is_used);
        assert_eq!(created.rating, 2.62);
        assert_eq!(created.prod_date.timestamp_millis(), PROD_DATE_2995);

        let response = test::call_service(&app, TestRequest::get().uri(&format!("/rest/ships/{}", created.id)).to_request()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let found: ShipResponse = test::read_body_json(response).await;
        assert_eq!(found, created);
    }

    #[actix_web::test]
    async fn test_create_without_ship_type() {
        let app = init_app!();
        let mut body = ship_body("Nomad");
        body.as_object_mut().unwrap().remove("shipType");
        let created = create_ship!(app, body);
        assert_eq!(created.ship_type, None);
        assert_eq!(created.rating, 2.62);

        let response = test::call_service(&app, TestRequest::get().uri(&format!("/rest/ships/{}", created.id)).to_request()).await;
        let found: Value = test::read_body_json(response).await;
        assert_eq!(found["shipType"], Value::Null);

        for ship_type in ["TRANSPORT", "MILITARY", "MERCHANT"] {
            let response = test::call_service(&app, TestRequest::get().uri(&format!("/rest/ships/count?shipType={ship_type}")).to_request()).await;
            let count: i64 = test::read_body_json(response).await;
            assert_eq!(count, 0, "{ship_type}");
        }
        let response = test::call_service(&app, TestRequest::get().uri("/rest/ships/count?name=Nomad").to_request()).await;
        let count: i64 = test::read_body_json(response).await;
        assert_eq!(count, 1);
    }

    #[actix_web::test]
    async fn test_get_bad_and_missing_ids() {
        let app = init_app!();
        let response = test::call_service(&app, TestRequest::get().uri("/rest/ships/abc").to_request()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let response = test::call_service(&app, TestRequest::get().uri("/rest/ships/0").to_request()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let response = test::call_service(&app, TestRequest::get().uri("/rest/ships/77").to_request()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let error: ErrorResponse = test::read_body_json(response).await;
        assert_eq!(error.code, 1004);
    }

    #[actix_web::test]
    async fn test_create_invalid_is_bad_request() {
        let app = init_app!();
        let mut body = ship_body("Orion");
        body["crewSize"] = json!(10000);
        let response = test::call_service(&app, TestRequest::post().uri("/rest/ships").set_json(body).to_request()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = test::read_body_json(response).await;
        assert_eq!(error.code, 1002);

        let response = test::call_service(&app, TestRequest::post().uri("/rest/ships").insert_header(("content-type", "application/json")).set_payload("{not json").to_request()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = test::call_service(&app, TestRequest::get().uri("/rest/ships/count").to_request()).await;
        let count: i64 = test::read_body_json(response).await;
        assert_eq!(count, 0);
    }

    #[actix_web::test]
    async fn test_update_partial() {
        let app = init_app!();
        let created = create_ship!(app, ship_body("Orion"));
        let response = test::call_service(
            &app,
            TestRequest::post().uri(&format!("/rest/ships/{}", created.id)).set_json(json!({"name": "Vega", "isUsed": true, "rating": 99.0})).to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let updated: ShipResponse = test::read_body_json(response).await;
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "Vega");
        assert!(updated.is_used);
        assert_eq!(updated.planet, created.planet);
        assert_eq!(updated.crew_size, created.crew_size);
        assert_eq!(updated.rating, 1.31);
    }

    #[actix_web::test]
    async fn test_update_errors() {
        let app = init_app!();
        let created = create_ship!(app, ship_body("Orion"));
        let response = test::call_service(&app, TestRequest::post().uri("/rest/ships/999").set_json(json!({"speed": 5.0})).to_request()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = test::call_service(&app, TestRequest::post().uri(&format!("/rest/ships/{}", created.id)).set_json(json!({"speed": 5.0})).to_request()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let response = test::call_service(&app, TestRequest::post().uri("/rest/ships/0").set_json(json!({})).to_request()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = test::call_service(&app, TestRequest::get().uri(&format!("/rest/ships/{}", created.id)).to_request()).await;
        let found: ShipResponse = test::read_body_json(response).await;
        assert_eq!(found, created);
    }

    #[actix_web::test]
    async fn test_delete() {
        let app = init_app!();
        let created = create_ship!(app, ship_body("Orion"));
        let uri = format!("/rest/ships/{}", created.id);
        let response = test::call_service(&app, TestRequest::delete().uri(&uri).to_request()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let response = test::call_service(&app, TestRequest::get().uri(&uri).to_request()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = test::call_service(&app, TestRequest::delete().uri(&uri).to_request()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = test::call_service(&app, TestRequest::delete().uri("/rest/ships/-1").to_request()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_list_filter_order_and_paging() {
        let app = init_app!();
        for (name, speed, is_used) in [("Orion", 0.82, false), ("Orion II", 0.2, true), ("Vega", 0.5, false), ("Orionid", 0.6, false)] {
            let mut body = ship_body(name);
            body["speed"] = json!(speed);
            body["isUsed"] = json!(is_used);
            create_ship!(app, body);
        }

        let response = test::call_service(&app, TestRequest::get().uri("/rest/ships").to_request()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let default_page: Vec<ShipResponse> = test::read_body_json(response).await;
        assert_eq!(default_page.iter().map(|ship| ship.id).collect::<Vec<i64>>(), vec![1, 2, 3]);

        let response = test::call_service(&app, TestRequest::get().uri("/rest/ships?name=Orion&order=SPEED&pageSize=10").to_request()).await;
        let by_speed: Vec<ShipResponse> = test::read_body_json(response).await;
        assert_eq!(by_speed.iter().map(|ship| ship.name.as_str()).collect::<Vec<&str>>(), vec!["Orion II", "Orionid", "Orion"]);

        let response = test::call_service(&app, TestRequest::get().uri("/rest/ships?name=Orion&isUsed=false&order=speed&pageSize=1&pageNumber=1").to_request()).await;
        let second: Vec<ShipResponse> = test::read_body_json(response).await;
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].name, "Orion");

        let response = test::call_service(&app, TestRequest::get().uri("/rest/ships/count?name=Orion&minSpeed=0.5&shipType=MERCHANT").to_request()).await;
        let count: i64 = test::read_body_json(response).await;
        assert_eq!(count, 2);

        let response = test::call_service(&app, TestRequest::get().uri(&format!("/rest/ships/count?after={PROD_DATE_2995}&before={PROD_DATE_2995}")).to_request()).await;
        let count: i64 = test::read_body_json(response).await;
        assert_eq!(count, 4);
    }

    #[actix_web::test]
    async fn test_list_bad_parameters() {
        let app = init_app!();
        for uri in ["/rest/ships?order=COLOR", "/rest/ships?pageSize=0", "/rest/ships?pageNumber=-1", "/rest/ships?minCrewSize=abc", "/rest/ships/count?shipType=YACHT"] {
            let response = test::call_service(&app, TestRequest::get().uri(uri).to_request()).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        }
    }
}
