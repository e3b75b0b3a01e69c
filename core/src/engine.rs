//! The seam between the HTTP bridge and a protocol engine.

use async_trait::async_trait;

use crate::error::EngineError;
use crate::exchange::Exchange;
use crate::http::RequestScope;

/// A protocol engine invoked once per inbound HTTP call.
///
/// One instance is shared by every in-flight call, so implementations must
/// keep per-call state in `exchange` rather than in `self`. The call is
/// complete once the returned future resolves; no further messages may be
/// sent after that.
#[async_trait]
pub trait Engine: Send + Sync {
    async fn call(&self, scope: &RequestScope, exchange: &mut Exchange) -> Result<(), EngineError>;
}
