//! Challenge negotiation
//!
//! Players and rules queries must first obtain a challenge token. The client
//! sends the request type with a challenge of `-1`; the server answers with
//! `'A'` and a fresh token. Tokens are never cached between queries.

use bytes::BytesMut;
use srcquery_core::Result;
use srcquery_protocol::{build_challenge_request, parse_challenge_response, RequestType};
use tracing::debug;

use crate::query::exchange;
use crate::transport::Transport;

/// Obtain a challenge token for `request` over an open connection
///
/// One request, one response; retries and timeouts belong to the caller.
pub async fn negotiate_challenge<T: Transport + ?Sized>(
    conn: &mut T,
    request: RequestType,
) -> Result<i32> {
    let mut buf = BytesMut::new();
    build_challenge_request(&mut buf, request);

    let payload = exchange(conn, &buf).await?;
    let challenge = parse_challenge_response(payload)?;
    debug!("Received challenge {:#010x} for {:?} query", challenge, request);

    Ok(challenge)
}
