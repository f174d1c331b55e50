//! Bet sources.
//!
//! A source yields rows of string fields in file order and reports
//! exhaustion as `Ok(None)`, never as an error.

use crate::closable::Closable;
use crate::error::ClientError;
use std::future::Future;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio_util::sync::CancellationToken;

/// A sequential provider of bet rows.
pub trait RecordSource {
    /// Returns the next row, or `None` once the source is exhausted.
    fn next_row(&mut self) -> impl Future<Output = Result<Option<Vec<String>>, ClientError>> + Send;

    /// 1-based position of the last row returned, for error reports.
    fn position(&self) -> usize;

    /// Releases the source. Returns `true` if this call released it.
    fn close(&mut self) -> impl Future<Output = bool> + Send;
}

/// Reads bets from a comma-separated file, one bet per line.
///
/// Quoting is not supported: every comma splits a field. Blank lines are
/// skipped.
pub struct CsvSource {
    lines: Lines<BufReader<Closable<File>>>,
    line: usize,
}

impl CsvSource {
    /// Opens `path`; cancelling `token` closes the file.
    pub async fn open(path: impl AsRef<Path>, token: CancellationToken) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let file = File::open(path)
            .await
            .map_err(|source| ClientError::OpenSource {
                path: path.display().to_string(),
                source,
            })?;
        tracing::debug!(path = %path.display(), "bet file opened");
        Ok(Self::new(Closable::new(file, token, "file")))
    }

    fn new(file: Closable<File>) -> Self {
        Self {
            lines: BufReader::new(file).lines(),
            line: 0,
        }
    }
}

impl RecordSource for CsvSource {
    async fn next_row(&mut self) -> Result<Option<Vec<String>>, ClientError> {
        while let Some(line) = self.lines.next_line().await? {
            self.line += 1;
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            return Ok(Some(line.split(',').map(str::to_string).collect()));
        }
        Ok(None)
    }

    fn position(&self) -> usize {
        self.line
    }

    async fn close(&mut self) -> bool {
        self.lines.get_mut().get_mut().close().await
    }
}

/// In-memory source, for tests.
#[cfg(test)]
pub(crate) struct VecSource {
    rows: std::collections::VecDeque<Vec<String>>,
    position: usize,
    pub(crate) closed: bool,
}

#[cfg(test)]
impl VecSource {
    pub(crate) fn new(rows: Vec<Vec<String>>) -> Self {
        Self {
            rows: rows.into(),
            position: 0,
            closed: false,
        }
    }

    /// `count` well-formed rows with documents `0..count`.
    pub(crate) fn bets(count: usize) -> Self {
        Self::new(
            (0..count)
                .map(|i| {
                    vec![
                        "Ana".to_string(),
                        "Diaz".to_string(),
                        i.to_string(),
                        "1990-01-01".to_string(),
                        "42".to_string(),
                    ]
                })
                .collect(),
        )
    }
}

#[cfg(test)]
impl RecordSource for VecSource {
    async fn next_row(&mut self) -> Result<Option<Vec<String>>, ClientError> {
        let row = self.rows.pop_front();
        if row.is_some() {
            self.position += 1;
        }
        Ok(row)
    }

    fn position(&self) -> usize {
        self.position
    }

    async fn close(&mut self) -> bool {
        !std::mem::replace(&mut self.closed, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    fn csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_reads_rows_in_order() {
        let file = csv("Ana,Diaz,1,1990-01-01,42\nLuis,Paz,2,1985-05-05,7\n");
        let mut source = CsvSource::open(file.path(), CancellationToken::new())
            .await
            .unwrap();

        let first = source.next_row().await.unwrap().unwrap();
        assert_eq!(first, vec!["Ana", "Diaz", "1", "1990-01-01", "42"]);
        let second = source.next_row().await.unwrap().unwrap();
        assert_eq!(second[2], "2");
        assert_eq!(source.position(), 2);

        assert!(source.next_row().await.unwrap().is_none());
        assert!(source.next_row().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_skips_blank_lines_and_crlf() {
        let file = csv("Ana,Diaz,1,1990-01-01,42\r\n\r\n\nLuis,Paz,2,1985-05-05,7");
        let mut source = CsvSource::open(file.path(), CancellationToken::new())
            .await
            .unwrap();

        let first = source.next_row().await.unwrap().unwrap();
        assert_eq!(first[4], "42");
        let second = source.next_row().await.unwrap().unwrap();
        assert_eq!(second[0], "Luis");
        assert_eq!(source.position(), 4);
        assert!(source.next_row().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_file_is_exhausted() {
        let file = csv("");
        let mut source = CsvSource::open(file.path(), CancellationToken::new())
            .await
            .unwrap();
        assert!(source.next_row().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let result = CsvSource::open("/nonexistent/agency-9.csv", CancellationToken::new()).await;
        assert!(matches!(result, Err(ClientError::OpenSource { .. })));
    }

    #[tokio::test]
    async fn test_close_once() {
        let file = csv("Ana,Diaz,1,1990-01-01,42\n");
        let mut source = CsvSource::open(file.path(), CancellationToken::new())
            .await
            .unwrap();
        assert!(source.close().await);
        assert!(!source.close().await);
        assert!(source.next_row().await.is_err());
    }

    #[tokio::test]
    async fn test_cancel_closes_file() {
        let file = csv("Ana,Diaz,1,1990-01-01,42\n");
        let token = CancellationToken::new();
        let mut source = CsvSource::open(file.path(), token.clone()).await.unwrap();

        token.cancel();
        let result = tokio::time::timeout(Duration::from_secs(2), source.next_row())
            .await
            .unwrap();
        assert!(matches!(result, Err(ClientError::Io(_))));
        assert!(!source.close().await);
    }
}
