use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Crypto Whisperer API",
        version = "0.1.0",
        description = "Crypto news summaries, read aloud."
    ),
    paths(
        crate::routes::whisper,
        crate::routes::speech,
        crate::routes::health,
    ),
    components(schemas(
        crate::dto::WhisperRequest,
        crate::dto::WhisperResponse,
        crate::dto::WhisperItem,
        crate::dto::HealthResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "whisper", description = "Summaries and speech"),
        (name = "system", description = "Health and system status"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Adds Bearer token security scheme to the OpenAPI document.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("token")
                        .description(Some(
                            "Server API key. Set via WHISPERER_SERVER_API_KEY environment variable.",
                        ))
                        .build(),
                ),
            );
        }
    }
}
