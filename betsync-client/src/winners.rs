//! Winners query.

use crate::connection::FrameConnection;
use crate::error::ClientError;
use betsync_protocol::{WinnersRequest, WinnersResponse};
use tokio::io::{AsyncRead, AsyncWrite};

/// Asks the server for `agency`'s winners and waits for the single answer.
///
/// Must only be called once the batch upload has completed; the request
/// goes out as a terminal frame on the same connection.
pub async fn query_winners<T>(
    conn: &mut FrameConnection<T>,
    agency: &str,
) -> Result<WinnersResponse, ClientError>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let request = WinnersRequest::new(agency);
    conn.send_frame(request.encode(), true).await?;
    tracing::debug!("winners request sent, waiting for response");

    let frame = conn.receive_frame().await?;
    if !frame.end {
        tracing::warn!("winners response not flagged as terminal");
    }
    Ok(WinnersResponse::parse(&frame.payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use betsync_protocol::Frame;
    use tokio_test::io::Builder;

    fn wire(payload: &[u8], end: bool) -> Vec<u8> {
        Frame::new(payload.to_vec(), end).encode().unwrap().to_vec()
    }

    #[tokio::test]
    async fn test_two_winners() {
        let mock = Builder::new()
            .write(&wire(b"WINNERS,3", true))
            .read(&wire(b"30904465,17867145", true))
            .build();
        let mut conn = FrameConnection::new(mock);

        let response = query_winners(&mut conn, "3").await.unwrap();
        assert_eq!(response.count(), 2);
    }

    #[tokio::test]
    async fn test_no_winners() {
        let mock = Builder::new()
            .write(&wire(b"WINNERS,5", true))
            .read(&wire(b"", true))
            .build();
        let mut conn = FrameConnection::new(mock);

        let response = query_winners(&mut conn, "5").await.unwrap();
        assert_eq!(response.count(), 0);
    }

    #[tokio::test]
    async fn test_server_closes_before_answer() {
        let mock = Builder::new().write(&wire(b"WINNERS,1", true)).build();
        let mut conn = FrameConnection::new(mock);

        assert!(matches!(
            query_winners(&mut conn, "1").await,
            Err(ClientError::ConnectionClosed)
        ));
    }
}
