//! # API REST
//!
//! REST API for the clinic registry.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - API key checking on every route except `/health` and the docs
//! - Mapping registry errors onto HTTP status codes
//!
//! Core calls are synchronous SQLite transactions, so every handler runs them on the
//! blocking pool. Uses `api-shared` for request/response bodies.

#![warn(rust_2018_idioms)]

use api_shared::{
    outcome_label, validate_api_key, AdvanceDirectiveReq, AdvanceDirectiveRes, AuthError,
    CatalogEntryRes, CatalogUpsertReq, CatalogUpsertRes, CodesReq, ContactReq, ContactRes,
    DonationOppositionReq, DonationOppositionRes, ErrorRes, FieldErrorRes, HealthRes,
    HealthService, ListCatalogRes, ListContactsRes, ListPatientsRes, MembershipRes, PatientReq,
    PatientRes, API_KEY_HEADER,
};
use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use registry_core::validation::parse_record_id;
use registry_core::{
    CatalogKind, CatalogService, ContactService, CoreConfig, Database, DeclarationService,
    PatientService, RecordId, RegistryError, RegistryResult,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::{IntoParams, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    patients: PatientService,
    catalogs: CatalogService,
    contacts: ContactService,
    declarations: DeclarationService,
    api_key: Arc<str>,
}

impl AppState {
    pub fn new(db: Arc<Database>, cfg: Arc<CoreConfig>, api_key: impl Into<String>) -> Self {
        Self {
            patients: PatientService::new(db.clone(), cfg),
            catalogs: CatalogService::new(db.clone()),
            contacts: ContactService::new(db.clone()),
            declarations: DeclarationService::new(db),
            api_key: Arc::from(api_key.into()),
        }
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Registry(RegistryError),
    Auth(AuthError),
    Internal(String),
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        ApiError::Registry(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

fn status_for(err: &RegistryError) -> StatusCode {
    match err {
        RegistryError::Format { .. }
        | RegistryError::Name { .. }
        | RegistryError::Validation(_)
        | RegistryError::Reference { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        RegistryError::Uniqueness { .. } => StatusCode::CONFLICT,
        RegistryError::NotFound { .. } => StatusCode::NOT_FOUND,
        RegistryError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        RegistryError::LockPoisoned | RegistryError::Database(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Registry(err) => {
                let status = status_for(err);
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!("storage error: {:?}", err);
                    (status, ErrorRes::message("Internal error"))
                } else {
                    (status, ErrorRes::from(err))
                }
            }
            ApiError::Auth(AuthError::NotConfigured) => {
                tracing::error!("API_KEY not configured; rejecting request");
                (StatusCode::UNAUTHORIZED, ErrorRes::message("Unauthorized"))
            }
            ApiError::Auth(err) => (StatusCode::UNAUTHORIZED, ErrorRes::message(err.to_string())),
            ApiError::Internal(msg) => {
                tracing::error!("handler failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorRes::message("Internal error"))
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Runs a core call on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> RegistryResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

fn record_id(field: &str, raw: &str) -> Result<RecordId, ApiError> {
    Ok(parse_record_id(field, raw)?)
}

fn catalog_kind(raw: &str) -> Result<CatalogKind, ApiError> {
    raw.parse::<CatalogKind>().map_err(|_| {
        ApiError::Registry(RegistryError::NotFound {
            entity: "catalog",
            key: raw.to_string(),
        })
    })
}

async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let provided = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());
    validate_api_key(provided, &state.api_key)?;
    Ok(next.run(req).await)
}

// ============================================================================
// ROUTER
// ============================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_patients,
        create_patient,
        get_patient,
        update_patient,
        delete_patient,
        replace_nationalities,
        replace_disabilities,
        get_advance_directive,
        save_advance_directive,
        get_donation_opposition,
        save_donation_opposition,
        list_contacts,
        create_contact,
        get_contact,
        update_contact,
        delete_contact,
        search_catalog,
        get_catalog_entry,
        upsert_catalog_entry,
    ),
    components(schemas(
        HealthRes,
        ErrorRes,
        FieldErrorRes,
        PatientReq,
        PatientRes,
        ListPatientsRes,
        CodesReq,
        MembershipRes,
        AdvanceDirectiveReq,
        AdvanceDirectiveRes,
        DonationOppositionReq,
        DonationOppositionRes,
        ContactReq,
        ContactRes,
        ListContactsRes,
        CatalogEntryRes,
        ListCatalogRes,
        CatalogUpsertReq,
        CatalogUpsertRes,
    ))
)]
pub struct ApiDoc;

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/patients", get(list_patients).post(create_patient))
        .route(
            "/patients/:id",
            get(get_patient).put(update_patient).delete(delete_patient),
        )
        .route(
            "/patients/:id/nationalities",
            axum::routing::put(replace_nationalities),
        )
        .route(
            "/patients/:id/disabilities",
            axum::routing::put(replace_disabilities),
        )
        .route(
            "/patients/:id/advance-directive",
            get(get_advance_directive).put(save_advance_directive),
        )
        .route(
            "/patients/:id/donation-opposition",
            get(get_donation_opposition).put(save_donation_opposition),
        )
        .route(
            "/patients/:id/contacts",
            get(list_contacts).post(create_contact),
        )
        .route(
            "/patients/:id/contacts/:contact_id",
            get(get_contact).put(update_contact).delete(delete_contact),
        )
        .route("/catalogs/:kind", get(search_catalog))
        .route(
            "/catalogs/:kind/:code",
            get(get_catalog_entry).put(upsert_catalog_entry),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .merge(
            SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Case-insensitive substring.
    q: Option<String>,
    /// 1-based page number.
    page: Option<usize>,
}

// ============================================================================
// HANDLERS
// ============================================================================

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint, open to monitoring without an API key.
#[axum::debug_handler]
async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/patients",
    params(SearchQuery),
    responses(
        (status = 200, description = "One page of patients", body = ListPatientsRes),
        (status = 401, description = "Missing or invalid API key", body = ErrorRes)
    )
)]
/// Lists patients ordered by surname and first name, optionally filtered by `q`
/// (document number or any name part).
#[axum::debug_handler]
async fn list_patients(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ListPatientsRes>, ApiError> {
    let q = query.q.unwrap_or_default();
    let page = query.page.unwrap_or(1);
    let result = blocking(move || state.patients.list(&q, page)).await?;
    Ok(Json(result.into()))
}

#[utoipa::path(
    post,
    path = "/patients",
    request_body = PatientReq,
    responses(
        (status = 201, description = "Patient created", body = PatientRes),
        (status = 409, description = "Document number already registered", body = ErrorRes),
        (status = 422, description = "Invalid fields or unknown catalog codes", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn create_patient(
    State(state): State<AppState>,
    Json(req): Json<PatientReq>,
) -> Result<(StatusCode, Json<PatientRes>), ApiError> {
    let draft = req.into();
    let patient = blocking(move || state.patients.create(&draft)).await?;
    Ok((StatusCode::CREATED, Json(patient.into())))
}

#[utoipa::path(
    get,
    path = "/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient", body = PatientRes),
        (status = 404, description = "No such patient", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn get_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PatientRes>, ApiError> {
    let id = record_id("id", &id)?;
    let patient = blocking(move || state.patients.get(id)).await?;
    Ok(Json(patient.into()))
}

#[utoipa::path(
    put,
    path = "/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    request_body = PatientReq,
    responses(
        (status = 200, description = "Patient updated", body = PatientRes),
        (status = 404, description = "No such patient", body = ErrorRes),
        (status = 409, description = "Document number already registered", body = ErrorRes),
        (status = 422, description = "Invalid fields or unknown catalog codes", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn update_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<PatientReq>,
) -> Result<Json<PatientRes>, ApiError> {
    let id = record_id("id", &id)?;
    let draft = req.into();
    let patient = blocking(move || state.patients.update(id, &draft)).await?;
    Ok(Json(patient.into()))
}

#[utoipa::path(
    delete,
    path = "/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 204, description = "Patient and everything recorded for them deleted"),
        (status = 404, description = "No such patient", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn delete_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = record_id("id", &id)?;
    blocking(move || state.patients.delete(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/patients/{id}/nationalities",
    params(("id" = String, Path, description = "Patient id")),
    request_body = CodesReq,
    responses(
        (status = 200, description = "Nationalities replaced", body = MembershipRes),
        (status = 404, description = "No such patient", body = ErrorRes),
        (status = 422, description = "Unknown country code", body = ErrorRes)
    )
)]
/// Replaces the patient's nationalities with exactly the given country codes.
#[axum::debug_handler]
async fn replace_nationalities(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CodesReq>,
) -> Result<Json<MembershipRes>, ApiError> {
    let id = record_id("id", &id)?;
    let res = blocking(move || {
        let change = state.patients.replace_nationalities(id, &req.codes)?;
        Ok(MembershipRes::new(state.patients.nationalities(id)?, change))
    })
    .await?;
    Ok(Json(res))
}

#[utoipa::path(
    put,
    path = "/patients/{id}/disabilities",
    params(("id" = String, Path, description = "Patient id")),
    request_body = CodesReq,
    responses(
        (status = 200, description = "Disabilities replaced", body = MembershipRes),
        (status = 404, description = "No such patient", body = ErrorRes),
        (status = 422, description = "Unknown disability code", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn replace_disabilities(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CodesReq>,
) -> Result<Json<MembershipRes>, ApiError> {
    let id = record_id("id", &id)?;
    let res = blocking(move || {
        let change = state.patients.replace_disabilities(id, &req.codes)?;
        Ok(MembershipRes::new(state.patients.disabilities(id)?, change))
    })
    .await?;
    Ok(Json(res))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/advance-directive",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Advance directive", body = AdvanceDirectiveRes),
        (status = 404, description = "No such patient or nothing recorded", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn get_advance_directive(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AdvanceDirectiveRes>, ApiError> {
    let patient = record_id("id", &id)?;
    let directive = blocking(move || {
        state
            .declarations
            .advance_directive(patient)?
            .ok_or(RegistryError::NotFound {
                entity: "advance directive",
                key: patient.to_string(),
            })
    })
    .await?;
    Ok(Json(directive.into()))
}

#[utoipa::path(
    put,
    path = "/patients/{id}/advance-directive",
    params(("id" = String, Path, description = "Patient id")),
    request_body = AdvanceDirectiveReq,
    responses(
        (status = 200, description = "Advance directive saved", body = AdvanceDirectiveRes),
        (status = 404, description = "No such patient", body = ErrorRes),
        (status = 422, description = "Invalid fields or unknown provider", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn save_advance_directive(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AdvanceDirectiveReq>,
) -> Result<Json<AdvanceDirectiveRes>, ApiError> {
    let patient = record_id("id", &id)?;
    let draft = req.into();
    let directive =
        blocking(move || state.declarations.save_advance_directive(patient, &draft)).await?;
    Ok(Json(directive.into()))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/donation-opposition",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Donation opposition", body = DonationOppositionRes),
        (status = 404, description = "No such patient or nothing recorded", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn get_donation_opposition(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DonationOppositionRes>, ApiError> {
    let patient = record_id("id", &id)?;
    let opposition = blocking(move || {
        state
            .declarations
            .donation_opposition(patient)?
            .ok_or(RegistryError::NotFound {
                entity: "donation opposition",
                key: patient.to_string(),
            })
    })
    .await?;
    Ok(Json(opposition.into()))
}

#[utoipa::path(
    put,
    path = "/patients/{id}/donation-opposition",
    params(("id" = String, Path, description = "Patient id")),
    request_body = DonationOppositionReq,
    responses(
        (status = 200, description = "Donation opposition saved", body = DonationOppositionRes),
        (status = 404, description = "No such patient", body = ErrorRes),
        (status = 422, description = "Invalid fields", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn save_donation_opposition(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<DonationOppositionReq>,
) -> Result<Json<DonationOppositionRes>, ApiError> {
    let patient = record_id("id", &id)?;
    let draft = req.into();
    let opposition =
        blocking(move || state.declarations.save_donation_opposition(patient, &draft)).await?;
    Ok(Json(opposition.into()))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/contacts",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Contacts, most recent first", body = ListContactsRes),
        (status = 404, description = "No such patient", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn list_contacts(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ListContactsRes>, ApiError> {
    let patient = record_id("id", &id)?;
    let contacts = blocking(move || state.contacts.list(patient)).await?;
    Ok(Json(ListContactsRes {
        contacts: contacts.into_iter().map(ContactRes::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/patients/{id}/contacts",
    params(("id" = String, Path, description = "Patient id")),
    request_body = ContactReq,
    responses(
        (status = 201, description = "Contact recorded", body = ContactRes),
        (status = 422, description = "Invalid fields or unknown patient/catalog codes", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn create_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ContactReq>,
) -> Result<(StatusCode, Json<ContactRes>), ApiError> {
    let patient = record_id("id", &id)?;
    let draft = req.into();
    let contact = blocking(move || state.contacts.create(patient, &draft)).await?;
    Ok((StatusCode::CREATED, Json(contact.into())))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/contacts/{contact_id}",
    params(
        ("id" = String, Path, description = "Patient id"),
        ("contact_id" = String, Path, description = "Contact id")
    ),
    responses(
        (status = 200, description = "Contact", body = ContactRes),
        (status = 404, description = "No such contact for this patient", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn get_contact(
    State(state): State<AppState>,
    Path((id, contact_id)): Path<(String, String)>,
) -> Result<Json<ContactRes>, ApiError> {
    let patient = record_id("id", &id)?;
    let contact_id = record_id("contact_id", &contact_id)?;
    let contact = blocking(move || state.contacts.get(patient, contact_id)).await?;
    Ok(Json(contact.into()))
}

#[utoipa::path(
    put,
    path = "/patients/{id}/contacts/{contact_id}",
    params(
        ("id" = String, Path, description = "Patient id"),
        ("contact_id" = String, Path, description = "Contact id")
    ),
    request_body = ContactReq,
    responses(
        (status = 200, description = "Contact updated", body = ContactRes),
        (status = 404, description = "No such contact for this patient", body = ErrorRes),
        (status = 422, description = "Invalid fields or unknown catalog codes", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn update_contact(
    State(state): State<AppState>,
    Path((id, contact_id)): Path<(String, String)>,
    Json(req): Json<ContactReq>,
) -> Result<Json<ContactRes>, ApiError> {
    let patient = record_id("id", &id)?;
    let contact_id = record_id("contact_id", &contact_id)?;
    let draft = req.into();
    let contact =
        blocking(move || state.contacts.update(patient, contact_id, &draft)).await?;
    Ok(Json(contact.into()))
}

#[utoipa::path(
    delete,
    path = "/patients/{id}/contacts/{contact_id}",
    params(
        ("id" = String, Path, description = "Patient id"),
        ("contact_id" = String, Path, description = "Contact id")
    ),
    responses(
        (status = 204, description = "Contact deleted"),
        (status = 404, description = "No such contact for this patient", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn delete_contact(
    State(state): State<AppState>,
    Path((id, contact_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let patient = record_id("id", &id)?;
    let contact_id = record_id("contact_id", &contact_id)?;
    blocking(move || state.contacts.delete(patient, contact_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/catalogs/{kind}",
    params(
        ("kind" = String, Path, description = "Catalog slug, e.g. `country` or `ethnic-community`"),
        SearchQuery
    ),
    responses(
        (status = 200, description = "Matching entries ordered by name", body = ListCatalogRes),
        (status = 404, description = "Unknown catalog", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn search_catalog(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ListCatalogRes>, ApiError> {
    let kind = catalog_kind(&kind)?;
    let q = query.q.unwrap_or_default();
    let entries = blocking(move || state.catalogs.search(kind, &q)).await?;
    Ok(Json(ListCatalogRes {
        entries: entries.into_iter().map(CatalogEntryRes::from).collect(),
    }))
}

fn lookup(catalogs: &CatalogService, kind: CatalogKind, code: &str) -> RegistryResult<CatalogEntryRes> {
    Ok(match kind {
        CatalogKind::HealthProvider => catalogs.get_provider(code)?.into(),
        CatalogKind::Diagnosis => catalogs.get_diagnosis(code)?.into(),
        _ => catalogs.get(kind, code)?.into(),
    })
}

#[utoipa::path(
    get,
    path = "/catalogs/{kind}/{code}",
    params(
        ("kind" = String, Path, description = "Catalog slug"),
        ("code" = String, Path, description = "Business code")
    ),
    responses(
        (status = 200, description = "Catalog entry", body = CatalogEntryRes),
        (status = 404, description = "Unknown catalog or code", body = ErrorRes),
        (status = 422, description = "Code does not match the catalog pattern", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn get_catalog_entry(
    State(state): State<AppState>,
    Path((kind, code)): Path<(String, String)>,
) -> Result<Json<CatalogEntryRes>, ApiError> {
    let kind = catalog_kind(&kind)?;
    let entry = blocking(move || lookup(&state.catalogs, kind, &code)).await?;
    Ok(Json(entry))
}

#[utoipa::path(
    put,
    path = "/catalogs/{kind}/{code}",
    params(
        ("kind" = String, Path, description = "Catalog slug"),
        ("code" = String, Path, description = "Business code")
    ),
    request_body = CatalogUpsertReq,
    responses(
        (status = 200, description = "Entry created, updated or unchanged", body = CatalogUpsertRes),
        (status = 404, description = "Unknown catalog", body = ErrorRes),
        (status = 409, description = "Name already used in this catalog", body = ErrorRes),
        (status = 422, description = "Invalid code or name", body = ErrorRes)
    )
)]
/// Administrative upsert of one catalog entry.
#[axum::debug_handler]
async fn upsert_catalog_entry(
    State(state): State<AppState>,
    Path((kind, code)): Path<(String, String)>,
    Json(req): Json<CatalogUpsertReq>,
) -> Result<Json<CatalogUpsertRes>, ApiError> {
    let kind = catalog_kind(&kind)?;
    let res = blocking(move || {
        let outcome = match kind {
            CatalogKind::HealthProvider => {
                state.catalogs.upsert_provider(&req.into_provider(&code)?)?
            }
            CatalogKind::Diagnosis => state.catalogs.upsert_diagnosis(&req.into_diagnosis(&code))?,
            _ => state.catalogs.upsert(&req.into_entry(kind, &code))?,
        };
        Ok(CatalogUpsertRes {
            outcome: outcome_label(outcome).to_string(),
            entry: lookup(&state.catalogs, kind, code.trim())?,
        })
    })
    .await?;
    Ok(Json(res))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request as HttpRequest};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::path::PathBuf;
    use tower::ServiceExt;

    const KEY: &str = "test-key";

    fn app() -> Router {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let cfg = Arc::new(CoreConfig::new(PathBuf::from("unused.db"), 20).unwrap());
        router(AppState::new(db, cfg, KEY))
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = HttpRequest::builder()
            .method(method)
            .uri(uri)
            .header(API_KEY_HEADER, KEY);
        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn seed_catalogs(app: &Router) {
        for (kind, code, name) in [
            ("country", "COL", "Colombia"),
            ("country", "USA", "Estados Unidos"),
            ("municipality", "11001", "Bogotá, D.C."),
            ("occupation", "2211", "Médicos generales"),
            ("document-type", "CC", "Cédula de ciudadanía"),
        ] {
            let (status, body) = call(
                app,
                Method::PUT,
                &format!("/catalogs/{kind}/{code}"),
                Some(json!({ "name": name })),
            )
            .await;
            assert_eq!(status, StatusCode::OK, "{body}");
            assert_eq!(body["outcome"], "created");
        }
    }

    fn ana() -> Value {
        json!({
            "document_number": "123456789",
            "first_name": "Ana",
            "second_name": "María",
            "first_surname": "Gómez",
            "second_surname": "Rojas",
            "birth_date": "1990-05-17",
            "biological_sex": "02",
            "gender_identity": "02",
            "residential_zone": "01",
            "document_type": "CC",
            "residence": "11001",
            "occupation": "2211"
        })
    }

    #[tokio::test]
    async fn health_needs_no_key_but_patients_do() {
        let app = app();
        let response = app
            .clone()
            .oneshot(HttpRequest::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(HttpRequest::builder().uri("/patients").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/patients")
                    .header(API_KEY_HEADER, "wrong")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn patient_lifecycle_maps_errors_to_statuses() {
        let app = app();
        seed_catalogs(&app).await;

        let (status, created) = call(&app, Method::POST, "/patients", Some(ana())).await;
        assert_eq!(status, StatusCode::CREATED, "{created}");
        assert_eq!(created["full_name"], "Ana María Gómez Rojas");
        let id = created["id"].as_str().unwrap().to_string();

        let (status, body) = call(&app, Method::POST, "/patients", Some(ana())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("123456789"));

        let mut elsewhere = ana();
        elsewhere["document_number"] = json!("987654321");
        elsewhere["residence"] = json!("05001");
        let (status, _) = call(&app, Method::POST, "/patients", Some(elsewhere)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, body) = call(
            &app,
            Method::POST,
            "/patients",
            Some(json!({ "document_number": "1", "birth_date": "2999-01-01" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let fields: Vec<&str> = body["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["field"].as_str().unwrap())
            .collect();
        assert!(fields.contains(&"first_name"));
        assert!(fields.contains(&"birth_date"));

        let (status, page) = call(&app, Method::GET, "/patients?q=g%C3%B3mez", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["total"], 1);

        let (status, body) = call(
            &app,
            Method::PUT,
            &format!("/patients/{id}/nationalities"),
            Some(json!({ "codes": ["COL", "USA"] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["codes"], json!(["COL", "USA"]));

        let (status, _) = call(
            &app,
            Method::PUT,
            &format!("/patients/{id}/nationalities"),
            Some(json!({ "codes": ["USA", "ZZZ"] })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = call(&app, Method::DELETE, &format!("/patients/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, Method::GET, &format!("/patients/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn declarations_and_contacts_are_scoped_to_the_patient() {
        let app = app();
        seed_catalogs(&app).await;
        let (_, created) = call(&app, Method::POST, "/patients", Some(ana())).await;
        let id = created["id"].as_str().unwrap().to_string();

        let (status, _) = call(
            &app,
            Method::GET,
            &format!("/patients/{id}/donation-opposition"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call(
            &app,
            Method::PUT,
            &format!("/patients/{id}/donation-opposition"),
            Some(json!({ "opposes": "SI", "subscribed_on": "2023-01-10" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["opposes"], "SI");

        let other = RecordId::new();
        let (status, _) = call(
            &app,
            Method::GET,
            &format!("/patients/{id}/contacts/{other}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call(&app, Method::GET, &format!("/patients/{id}/contacts"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["contacts"], json!([]));
    }

    #[tokio::test]
    async fn catalogs_dispatch_by_kind() {
        let app = app();
        seed_catalogs(&app).await;

        let (status, body) = call(
            &app,
            Method::PUT,
            "/catalogs/health-provider/EPS001",
            Some(json!({ "name": "Salud Total", "is_eps": "SI" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["entry"]["is_eps"], "SI");
        assert_eq!(body["entry"]["is_ips"], "NO");

        let (status, body) = call(
            &app,
            Method::PUT,
            "/catalogs/country/ECU",
            Some(json!({ "name": "Colombia" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT, "{body}");

        let (status, body) = call(&app, Method::GET, "/catalogs/country?q=UNI", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["entries"][0]["code"], "USA");

        let (status, _) = call(&app, Method::GET, "/catalogs/country/col", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = call(&app, Method::GET, "/catalogs/planet", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
