use std::borrow::BorrowMut;

use axum::{response::IntoResponse, Json};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::{auth, rooms};

#[derive(OpenApi)]
#[openapi(info(
    description = "auxparty-server exposes endpoints to run collaborative listening rooms"
))]
struct ApiDoc;

struct Security;

impl Modify for Security {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.borrow_mut() {
            let scheme = HttpBuilder::new()
                .scheme(HttpAuthScheme::Bearer)
                .bearer_format("Bearer <token>")
                .build();

            components.add_security_scheme("BearerAuth", SecurityScheme::Http(scheme))
        }
    }
}

/// Collects each module's piece into one document. The security scheme goes
/// in after the merge, the bare document has no components for a modifier
/// to write to before that.
pub fn api_doc() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();

    doc.merge(auth::api_doc());
    doc.merge(rooms::api_doc());

    Security.modify(&mut doc);

    doc
}

pub async fn docs() -> impl IntoResponse {
    Json(api_doc())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_document_carries_every_module_and_the_scheme() {
        let doc = api_doc();

        assert!(doc.paths.paths.contains_key("/v1/sessions"));
        assert!(doc.paths.paths.contains_key("/v1/sessions/user"));
        assert!(doc.paths.paths.contains_key("/v1/rooms"));
        assert!(doc.paths.paths.contains_key("/v1/rooms/{code}/playback"));
        assert!(doc.paths.paths.contains_key("/v1/rooms/{code}/sync-tokens"));

        let components = doc.components.expect("merge brings components in");
        assert!(components.security_schemes.contains_key("BearerAuth"));
    }
}
