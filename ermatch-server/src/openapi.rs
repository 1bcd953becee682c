use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::{chat, hospitals, location, search};
use crate::server::ErMatchServer;

#[derive(OpenApi)]
#[openapi(
    paths(
        chat::chat_turn,
        chat::chat_finish,
        location::update_location,
        search::symptom_search,
        hospitals::list_hospitals,
    ),
    components(schemas(
        chat::ChatTurnRequest,
        chat::ChatFinishRequest,
        chat::ChatFinishResponse,
        crate::services::ChatTurnResponse,
        location::LocationRequest,
        location::LocationResponse,
        search::SymptomSearchRequest,
        search::SymptomSearchResponse,
        hospitals::HospitalListEntry,
        hospitals::HospitalListResponse,
    )),
    tags(
        (name = "chat", description = "Conversational intake"),
        (name = "location", description = "User location state"),
        (name = "search", description = "Symptom-based ER ranking"),
        (name = "hospitals", description = "Hospital directory"),
    ),
    info(
        title = "ER-Match Engine API",
        description = "Emergency-room matching backend: conversational intake and capacity-aware hospital ranking",
    )
)]
pub struct ApiDoc;

pub fn create_docs_routes() -> Router<ErMatchServer> {
    Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
