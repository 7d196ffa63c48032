use utoipa::OpenApi;

use crate::modules::jobs::dto::{HealthResponse, JobDescriptor, JobStatusResponse};
use crate::modules::jobs::model::JobStatus;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::jobs::handler::process_video,
        crate::modules::jobs::handler::job_status,
        crate::modules::jobs::handler::health,
        crate::modules::download::handler::download,
    ),
    components(
        schemas(JobDescriptor, JobStatusResponse, HealthResponse, JobStatus)
    ),
    tags(
        (name = "Jobs", description = "Video compression jobs"),
        (name = "Download", description = "Encoded output delivery")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .build(),
                ),
            );
        }
    }
}
