use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use mb_core::{InstrumentKey, MinuteSnapshot};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::debug;

use super::{COLUMNS, StorageSink, cell};

/// Writes one CSV file per instrument.
///
/// Rows arrive in bucket order, so upsert only has to look at the last line:
/// a row for the bucket already at the tail replaces that line, anything else
/// is appended.
pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &InstrumentKey) -> PathBuf {
        self.dir.join(format!("{}_{}.csv", key.exchange, key.symbol))
    }

    async fn upsert_row(&self, row: &MinuteSnapshot) -> Result<()> {
        let path = self.path_for(&row.key);
        let line = format_row(row);
        let tail = read_tail(&path).await.with_context(|| format!("reading {}", path.display()))?;

        match tail {
            None => {
                let mut contents = header_line();
                contents.push_str(&line);
                fs::write(&path, contents).await.with_context(|| format!("creating {}", path.display()))?;
            }
            Some(tail) if tail.bucket() == Some(row.bucket_start) => {
                debug!("replacing bucket {} in {}", row.bucket_start, path.display());
                // Rewrite a sibling copy then rename, so a crash leaves the old row intact.
                let tmp = path.with_extension("csv.tmp");
                fs::copy(&path, &tmp).await.with_context(|| format!("copying {}", path.display()))?;
                let mut file = fs::OpenOptions::new()
                    .write(true)
                    .open(&tmp)
                    .await
                    .with_context(|| format!("opening {}", tmp.display()))?;
                file.set_len(tail.line_start).await?;
                file.seek(SeekFrom::End(0)).await?;
                file.write_all(line.as_bytes()).await.with_context(|| format!("writing {}", tmp.display()))?;
                file.sync_all().await?;
                drop(file);
                fs::rename(&tmp, &path).await.with_context(|| format!("replacing {}", path.display()))?;
            }
            Some(tail) => {
                let mut chunk = String::new();
                if tail.len == 0 {
                    chunk.push_str(&header_line());
                } else if !tail.ends_with_newline {
                    chunk.push('\n');
                }
                chunk.push_str(&line);
                let mut file = fs::OpenOptions::new()
                    .append(true)
                    .open(&path)
                    .await
                    .with_context(|| format!("opening {}", path.display()))?;
                file.write_all(chunk.as_bytes()).await.with_context(|| format!("appending {}", path.display()))?;
                file.flush().await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl StorageSink for CsvSink {
    fn name(&self) -> &str {
        "csv"
    }

    async fn ensure_schema(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).await.with_context(|| format!("creating csv dir {}", self.dir.display()))
    }

    async fn write_batch(&self, rows: &[MinuteSnapshot]) -> Result<()> {
        for row in rows {
            self.upsert_row(row).await?;
        }
        Ok(())
    }
}

fn header_line() -> String {
    let mut s = COLUMNS.join(",");
    s.push('\n');
    s
}

fn format_row(row: &MinuteSnapshot) -> String {
    format!(
        "{},{},{},{},{},{},{},{}\n",
        row.bucket_start,
        row.key.exchange,
        row.key.symbol,
        cell(row.last_price),
        cell(row.best_bid_price()),
        cell(row.best_bid_amount()),
        cell(row.best_ask_price()),
        cell(row.best_ask_amount()),
    )
}

/// Bytes read from the end of a file to find its last line. Rows are well
/// under 200 bytes.
const TAIL_WINDOW: u64 = 4096;

/// The last line of an existing file.
#[derive(Debug)]
struct Tail {
    len: u64,
    /// Byte offset where the last line starts.
    line_start: u64,
    last_line: String,
    ends_with_newline: bool,
}

impl Tail {
    /// `bucket_start` of the last line, `None` for the header or an empty file.
    fn bucket(&self) -> Option<i64> {
        self.last_line.split(',').next()?.parse().ok()
    }
}

/// Read at most [`TAIL_WINDOW`] bytes from the end of `path`. `None` if the
/// file does not exist.
async fn read_tail(path: &Path) -> std::io::Result<Option<Tail>> {
    let mut file = match fs::File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    let len = file.metadata().await?.len();
    let window_start = len.saturating_sub(TAIL_WINDOW);
    file.seek(SeekFrom::Start(window_start)).await?;
    let mut buf = Vec::with_capacity((len - window_start) as usize);
    file.read_to_end(&mut buf).await?;

    let ends_with_newline = buf.last() == Some(&b'\n');
    let body = if ends_with_newline { &buf[..buf.len() - 1] } else { &buf[..] };
    let (offset, last_line) = match body.iter().rposition(|&b| b == b'\n') {
        Some(i) => (i + 1, String::from_utf8_lossy(&body[i + 1..]).into_owned()),
        None if window_start == 0 => (0, String::from_utf8_lossy(body).into_owned()),
        // a line longer than the window is not one of ours; never replace it
        None => (body.len(), String::new()),
    };
    Ok(Some(Tail { len, line_start: window_start + offset as u64, last_line, ends_with_newline }))
}

#[cfg(test)]
mod tests {
    use mb_core::{Exchange, Level};

    use super::*;

    fn row(bucket: i64, price: Option<f64>) -> MinuteSnapshot {
        MinuteSnapshot {
            bucket_start: bucket,
            key: InstrumentKey::new(Exchange::Okx, "BTC-USDT"),
            last_price: price,
            best_bid: Some(Level::new(99.5, 2.0)),
            best_ask: None,
        }
    }

    async fn read(sink: &CsvSink) -> Vec<String> {
        let path = sink.path_for(&InstrumentKey::new(Exchange::Okx, "BTC-USDT"));
        fs::read_to_string(path).await.unwrap().lines().map(str::to_string).collect()
    }

    #[tokio::test]
    async fn ensure_schema_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(tmp.path().join("nested/out"));
        sink.ensure_schema().await.unwrap();
        sink.ensure_schema().await.unwrap();
        assert!(sink.dir().is_dir());
    }

    #[tokio::test]
    async fn writes_header_and_empty_cells() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(tmp.path());
        sink.ensure_schema().await.unwrap();
        sink.write_batch(&[row(60, None)]).await.unwrap();

        let lines = read(&sink).await;
        assert_eq!(lines[0], COLUMNS.join(","));
        assert_eq!(lines[1], "60,okx,BTC-USDT,,99.5,2,,");
        assert_eq!(lines.len(), 2);
    }

    #[tokio::test]
    async fn same_bucket_replaces_new_bucket_appends() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(tmp.path());
        sink.ensure_schema().await.unwrap();

        sink.write_batch(&[row(60, Some(1.0))]).await.unwrap();
        sink.write_batch(&[row(60, Some(2.0))]).await.unwrap();
        sink.write_batch(&[row(120, Some(3.0))]).await.unwrap();

        let lines = read(&sink).await;
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("60,okx,BTC-USDT,2,"));
        assert!(lines[2].starts_with("120,okx,BTC-USDT,3,"));
    }

    #[tokio::test]
    async fn empty_batch_touches_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(tmp.path());
        sink.ensure_schema().await.unwrap();
        sink.write_batch(&[]).await.unwrap();
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn tail_of_missing_header_only_and_data_files() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("t.csv");
        assert!(read_tail(&path).await.unwrap().is_none());

        std::fs::write(&path, "bucket_start,exchange\n").unwrap();
        let tail = read_tail(&path).await.unwrap().unwrap();
        assert_eq!(tail.bucket(), None);
        assert_eq!(tail.line_start, 0);

        std::fs::write(&path, "h\n60,a\n120,b").unwrap();
        let tail = read_tail(&path).await.unwrap().unwrap();
        assert_eq!(tail.bucket(), Some(120));
        assert_eq!(tail.line_start, 7);
        assert!(!tail.ends_with_newline);
    }

    #[tokio::test]
    async fn long_file_only_has_its_tail_touched() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(tmp.path());
        sink.ensure_schema().await.unwrap();

        let rows: Vec<MinuteSnapshot> = (1..=500).map(|i| row(i * 60, Some(i as f64))).collect();
        for r in &rows {
            sink.write_batch(std::slice::from_ref(r)).await.unwrap();
        }
        let path = sink.path_for(&rows[0].key);
        assert!(std::fs::metadata(&path).unwrap().len() > 2 * TAIL_WINDOW);

        sink.write_batch(&[row(500 * 60, Some(9_999.0))]).await.unwrap();
        sink.write_batch(&[row(501 * 60, Some(1.0))]).await.unwrap();

        let lines = read(&sink).await;
        assert_eq!(lines.len(), 1 + 501);
        assert_eq!(lines[0], COLUMNS.join(","));
        assert!(lines[1].starts_with("60,okx,BTC-USDT,1,"));
        assert!(lines[500].starts_with("30000,okx,BTC-USDT,9999,"));
        assert!(lines[501].starts_with("30060,okx,BTC-USDT,1,"));
        assert!(!path.with_extension("csv.tmp").exists());
    }

    #[tokio::test]
    async fn empty_file_gets_a_header() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(tmp.path());
        sink.ensure_schema().await.unwrap();
        std::fs::write(sink.path_for(&row(60, None).key), "").unwrap();

        sink.write_batch(&[row(60, None)]).await.unwrap();
        let lines = read(&sink).await;
        assert_eq!(lines, vec![COLUMNS.join(","), "60,okx,BTC-USDT,,99.5,2,,".to_string()]);
    }
}
