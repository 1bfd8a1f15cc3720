use aide::generate::GenContext;
use aide::openapi::{MediaType, RequestBody, SchemaObject};
use aide::operation::{OperationInput, set_body};
use axum::extract::multipart::MultipartRejection;
use axum::extract::{FromRequest, Multipart, Request};
use indexmap::IndexMap;
use schemars::Schema;
use schemars::json_schema;

/// Multipart upload body: the image file plus optional `name` and `credit`
/// text fields. Wrapping [`Multipart`] so the operation documents itself.
pub struct MultipartUpload(pub Multipart);

impl<S> FromRequest<S> for MultipartUpload
where
    S: Send + Sync,
{
    type Rejection = MultipartRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Multipart::from_request(req, state)
            .await
            .map(MultipartUpload)
    }
}

impl OperationInput for MultipartUpload {
    fn operation_input(ctx: &mut GenContext, operation: &mut aide::openapi::Operation) {
        let schema: Schema = json_schema!({
            "type": "object",
            "properties": {
                "image": {
                    "type": "string",
                    "format": "binary"
                },
                "name": {
                    "type": "string"
                },
                "credit": {
                    "type": "string"
                }
            },
            "required": ["image"]
        });
        set_body(
            ctx,
            operation,
            RequestBody {
                description: Some("Image upload with optional name and credit.".to_string()),
                content: IndexMap::from_iter([(
                    "multipart/form-data".to_string(),
                    MediaType {
                        schema: Some(SchemaObject {
                            json_schema: schema,
                            example: None,
                            external_docs: None,
                        }),
                        ..Default::default()
                    },
                )]),
                required: true,
                extensions: Default::default(),
            },
        );
    }
}
