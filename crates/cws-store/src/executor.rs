use tracing::instrument;

use crate::error::StoreError;
use crate::item::ItemResource;
use crate::transport::{HttpRequest, HttpResponse, Transport};

/// Longest response body excerpt carried in an HTTP error.
const ERROR_BODY_LIMIT: usize = 512;

/// Sends an authenticated store request and decodes the item resource it returns.
#[instrument(skip(transport, request), fields(method = request.method.as_str(), url = %request.url))]
pub fn execute<T: Transport + ?Sized>(
    transport: &T,
    request: &HttpRequest,
    operation: &'static str,
) -> Result<ItemResource, StoreError> {
    let response = transport
        .send(request)
        .map_err(|source| StoreError::Transport { operation, source })?;
    ensure_ok(operation, &response)?;

    let item: ItemResource = serde_json::from_slice(&response.body)
        .map_err(|source| StoreError::Decode { operation, source })?;
    item.log(operation);
    Ok(item)
}

/// Only `200 OK` counts as success.
pub(crate) fn ensure_ok(operation: &'static str, response: &HttpResponse) -> Result<(), StoreError> {
    if response.status == 200 {
        return Ok(());
    }

    let text = String::from_utf8_lossy(&response.body);
    let body: String = text.trim().chars().take(ERROR_BODY_LIMIT).collect();
    Err(StoreError::Http {
        operation,
        status: response.status,
        body,
    })
}
