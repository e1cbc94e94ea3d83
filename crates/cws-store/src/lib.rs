//! Chrome Web Store publishing client.
//!
//! Exchanges an OAuth2 refresh token for an access token, uploads a zip
//! archive to an existing store item and optionally publishes it. All
//! network traffic goes through the [`Transport`] seam so the workflow can
//! be exercised without a live store.

pub mod error;
pub mod executor;
pub mod item;
pub mod publisher;
pub mod sniff;
pub mod token;
pub mod transport;

#[cfg(test)]
mod testing;

pub use cws_core::PublishTarget;
pub use error::StoreError;
pub use item::{ItemError, ItemResource};
pub use publisher::{validate_archive, PublishOutcome, Publisher, StoreEndpoints};
pub use token::AccessToken;
pub use transport::{
    FilePart, HttpRequest, HttpResponse, Method, RequestBody, ReqwestTransport, Transport,
    TransportError,
};
