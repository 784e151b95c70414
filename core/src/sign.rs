use std::fmt::Debug;

use crate::{Context, Result};

/// SignRequest authorizes one attempt right before it is sent.
///
/// The engine calls it on every attempt, after the client request id and
/// the descriptor's own headers are in place, so the signature always covers
/// the final header set and the final target uri.
#[async_trait::async_trait]
pub trait SignRequest: Debug + Send + Sync + 'static {
    /// Sign the request in place.
    ///
    /// `content_length` is the length of the body that will be sent.
    async fn sign_request(
        &self,
        ctx: &Context,
        req: &mut http::request::Parts,
        content_length: u64,
    ) -> Result<()>;
}
