use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

use super::api::error::ErrorResponse;
use super::api::session::SetActivityRequest;

#[derive(OpenApi)]
#[openapi(
    paths(
        super::api::session::start,
        super::api::session::stop,
        super::api::session::set_activity,
        super::api::session::status,
        super::api::session::samples,
        super::api::session::activities,
        super::api::dataset::read_all,
        super::api::dataset::reset,
        super::api::dataset::export,
        super::api::samples::push_location,
        super::api::samples::push_motion,
    ),
    components(
        schemas(
            ErrorResponse,
            SetActivityRequest,
            crate::session::SessionStatus,
            crate::session::SessionMode,
            crate::session::StopSummary,
            crate::session::ActivityType,
            crate::session::ActivityOption,
            crate::cache::CacheSnapshot,
            crate::cache::LocationSample,
            crate::cache::MotionSample,
            crate::storage::ExportReceipt,
        )
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Fieldlog Recording API",
        description = "Control surface for the location and motion recording session",
        version = "0.1.0"
    ),
    tags(
        (name = "session", description = "Recording lifecycle"),
        (name = "dataset", description = "Stored records"),
        (name = "samples", description = "Sample ingest for the push source")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}
