//! Batch upload of bets.
//!
//! Bets are read from the source, serialized, and packed up to
//! `max_amount` per frame. A frame is also closed early when the next bet
//! would push its payload past [`MAX_PAYLOAD_SIZE`]. The transmitter keeps
//! one bet of lookahead so the frame carrying the last bet is the one flagged
//! as terminal; a source that ends exactly on a batch boundary does not
//! produce an extra empty frame. An empty source produces a single empty
//! terminal frame.

use crate::connection::FrameConnection;
use crate::error::ClientError;
use crate::source::RecordSource;
use betsync_protocol::{Bet, MAX_PAYLOAD_SIZE};
use bytes::BytesMut;
use tokio::io::AsyncWrite;

/// Initial payload capacity reserved per bet.
const BET_SIZE_HINT: usize = 64;

/// Upper bound on the capacity reserved up front; larger batches grow.
const MAX_INITIAL_CAPACITY: usize = 64 * 1024;

/// Counters for one completed upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Frames sent, the terminal one included.
    pub frames: usize,
    /// Bets sent.
    pub records: usize,
}

/// Drains a source into size-bounded frames.
#[derive(Debug, Clone)]
pub struct BatchTransmitter {
    agency: String,
    max_amount: usize,
}

impl BatchTransmitter {
    /// Creates a transmitter for `agency` sending at most `max_amount` bets
    /// per frame (values below 1 are treated as 1).
    pub fn new(agency: impl Into<String>, max_amount: usize) -> Self {
        Self {
            agency: agency.into(),
            max_amount: max_amount.max(1),
        }
    }

    /// Sends every bet of `source` over `conn`, in source order.
    ///
    /// Read errors and malformed rows abort the upload; nothing is retried.
    /// A single bet larger than [`MAX_PAYLOAD_SIZE`] fails with
    /// [`betsync_protocol::ProtocolError::FrameTooLarge`].
    pub async fn run<S, T>(
        &self,
        source: &mut S,
        conn: &mut FrameConnection<T>,
    ) -> Result<BatchStats, ClientError>
    where
        S: RecordSource,
        T: AsyncWrite + Unpin,
    {
        let capacity = self
            .max_amount
            .saturating_mul(BET_SIZE_HINT)
            .min(MAX_INITIAL_CAPACITY);
        let mut stats = BatchStats::default();
        let mut next = self.next_bet(source).await?;

        loop {
            let mut payload = BytesMut::with_capacity(capacity);
            let mut count = 0;

            while count < self.max_amount {
                let Some(bet) = next.as_ref() else { break };
                if count > 0 && !fits(&payload, bet) {
                    break;
                }
                bet.encode_into(&mut payload);
                count += 1;
                next = self.next_bet(source).await?;
            }

            let last = next.is_none();
            conn.send_frame(payload.freeze(), last).await?;
            stats.frames += 1;
            stats.records += count;
            tracing::debug!(records = count, last, "batch sent");

            if last {
                return Ok(stats);
            }
        }
    }

    async fn next_bet<S: RecordSource>(&self, source: &mut S) -> Result<Option<Bet>, ClientError> {
        let Some(row) = source.next_row().await? else {
            return Ok(None);
        };
        Bet::from_fields(self.agency.as_str(), &row)
            .map(Some)
            .map_err(|source_err| ClientError::MalformedRecord {
                line: source.position(),
                source: source_err,
            })
    }
}

/// Returns whether `bet` can be appended to a non-empty `payload` without
/// exceeding the frame limit.
fn fits(payload: &BytesMut, bet: &Bet) -> bool {
    payload.len() + 1 + bet.encoded_len() <= MAX_PAYLOAD_SIZE as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::VecSource;
    use betsync_protocol::{parse_batch, Frame};
    use tokio::io::AsyncReadExt;

    /// Uploads `rows` bets with cap `max` and returns every frame the peer saw.
    async fn upload(rows: usize, max: usize) -> (BatchStats, Vec<Frame>) {
        let (client, mut server) = tokio::io::duplex(64 * 1024);
        let mut conn = FrameConnection::new(client);
        let mut source = VecSource::bets(rows);

        let reader = tokio::spawn(async move {
            let mut wire = Vec::new();
            server.read_to_end(&mut wire).await.unwrap();
            wire
        });

        let stats = BatchTransmitter::new("7", max)
            .run(&mut source, &mut conn)
            .await
            .unwrap();
        drop(conn);

        let mut buf = BytesMut::from(&reader.await.unwrap()[..]);
        let mut frames = Vec::new();
        while let Some(frame) = Frame::decode(&mut buf).unwrap() {
            frames.push(frame);
        }
        assert!(buf.is_empty());
        (stats, frames)
    }

    fn assert_complete(frames: &[Frame], rows: usize) {
        let (last, rest) = frames.split_last().unwrap();
        assert!(last.end);
        assert!(rest.iter().all(|f| !f.end));

        let documents: Vec<String> = frames
            .iter()
            .flat_map(|f| parse_batch(&f.payload).unwrap())
            .map(|bet| {
                assert_eq!(bet.agency, "7");
                bet.document
            })
            .collect();
        let expected: Vec<String> = (0..rows).map(|i| i.to_string()).collect();
        assert_eq!(documents, expected);
    }

    #[tokio::test]
    async fn test_partial_last_batch() {
        let (stats, frames) = upload(10, 3).await;
        assert_eq!(frames.len(), 4);
        assert_eq!(stats, BatchStats { frames: 4, records: 10 });
        assert_complete(&frames, 10);
    }

    #[tokio::test]
    async fn test_exact_boundary_has_no_empty_frame() {
        let (stats, frames) = upload(9, 3).await;
        assert_eq!(frames.len(), 3);
        assert_eq!(stats.frames, 3);
        assert!(!frames[2].payload.is_empty());
        assert_complete(&frames, 9);
    }

    #[tokio::test]
    async fn test_single_batch() {
        let (_, frames) = upload(2, 100).await;
        assert_eq!(frames.len(), 1);
        assert_complete(&frames, 2);
    }

    #[tokio::test]
    async fn test_empty_source_sends_one_empty_terminal_frame() {
        let (stats, frames) = upload(0, 5).await;
        assert_eq!(stats, BatchStats { frames: 1, records: 0 });
        assert_eq!(frames.len(), 1);
        assert!(frames[0].end);
        assert!(frames[0].payload.is_empty());
    }

    #[tokio::test]
    async fn test_frame_count_matches_ceiling() {
        for (rows, max) in [(1, 1), (5, 1), (7, 2), (100, 10), (101, 10)] {
            let (_, frames) = upload(rows, max).await;
            assert_eq!(frames.len(), rows.div_ceil(max), "rows={rows} max={max}");
            assert_complete(&frames, rows);
        }
    }

    #[tokio::test]
    async fn test_malformed_row_aborts() {
        let (client, _server) = tokio::io::duplex(64 * 1024);
        let mut conn = FrameConnection::new(client);
        let mut source = VecSource::new(vec![
            vec!["Ana".into(), "Diaz".into(), "1".into(), "1990-01-01".into(), "1".into()],
            vec!["Luis".into(), "Paz".into()],
        ]);

        let err = BatchTransmitter::new("1", 10)
            .run(&mut source, &mut conn)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::MalformedRecord { line: 2, .. }));
    }

    #[tokio::test]
    async fn test_huge_cap_on_small_source() {
        let (stats, frames) = upload(3, 1usize << 58).await;
        assert_eq!(stats, BatchStats { frames: 1, records: 3 });
        assert_complete(&frames, 3);
    }

    #[tokio::test]
    async fn test_batches_split_at_payload_limit() {
        // 40 bets of ~512 KiB each: roughly 20 MiB under a cap that would
        // otherwise put them all in one frame.
        let filler = "x".repeat(512 * 1024);
        let rows: Vec<Vec<String>> = (0..40)
            .map(|i| {
                vec![
                    filler.clone(),
                    "Diaz".to_string(),
                    i.to_string(),
                    "1990-01-01".to_string(),
                    "1".to_string(),
                ]
            })
            .collect();

        let (client, mut server) = tokio::io::duplex(64 * 1024);
        let mut conn = FrameConnection::new(client);
        let mut source = VecSource::new(rows);

        let reader = tokio::spawn(async move {
            let mut wire = Vec::new();
            server.read_to_end(&mut wire).await.unwrap();
            wire
        });

        let stats = BatchTransmitter::new("7", 100_000)
            .run(&mut source, &mut conn)
            .await
            .unwrap();
        drop(conn);

        let mut buf = BytesMut::from(&reader.await.unwrap()[..]);
        let mut frames = Vec::new();
        while let Some(frame) = Frame::decode(&mut buf).unwrap() {
            frames.push(frame);
        }

        assert_eq!(stats.records, 40);
        assert_eq!(stats.frames, frames.len());
        assert!(frames.len() >= 2);
        assert!(frames
            .iter()
            .all(|f| f.payload.len() <= MAX_PAYLOAD_SIZE as usize));
        assert_complete(&frames, 40);
    }

    #[test]
    fn test_zero_cap_is_clamped() {
        let transmitter = BatchTransmitter::new("1", 0);
        assert_eq!(transmitter.max_amount, 1);
    }
}
