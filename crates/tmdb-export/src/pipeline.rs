//! Chunked worker pool: identifiers in, lookup bodies out.
//!
//! Input is processed in chunks of `chunk_size` identifiers. Each chunk gets
//! a fresh pair of bounded queues and a fresh generation of `workers` worker
//! threads:
//!
//! 1. the driver enqueues up to `chunk_size` identifiers in file order,
//! 2. closes the job queue,
//! 3. receives exactly as many bodies as it enqueued and writes one line each.
//!
//! Within a chunk, lines are written in **completion order**, not in
//! submission order. Across chunks the order is strict: every line of chunk
//! `k` precedes every line of chunk `k + 1`. At most one chunk of results is
//! ever buffered, and at most `workers` lookups are in flight.

use std::io::{BufRead, Write};
use std::thread;

use anyhow::{Context, Result, ensure};
use crossbeam_channel::{Receiver, Sender, bounded};

use crate::record::ExtractFn;

/// Default number of worker units per chunk
pub const DEFAULT_WORKERS: usize = 50;

/// Default identifiers per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Worker pool sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Worker units per chunk; bounds in-flight lookups
    pub workers: usize,
    /// Identifiers per chunk; bounds buffered jobs and results
    pub chunk_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.workers > 0, "worker count must be at least 1");
        ensure!(self.chunk_size > 0, "chunk size must be at least 1");
        Ok(())
    }
}

/// Totals for one pipeline run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStats {
    /// Lines written (one per identifier)
    pub rows: u64,
    /// Worker-pool cycles
    pub chunks: u64,
    /// Lines written empty because the lookup failed
    pub empty_rows: u64,
}

/// Emitted after each chunk has been drained and written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkReport {
    /// 1-based chunk number
    pub chunk: u64,
    /// Identifiers processed in this chunk
    pub chunk_rows: usize,
    /// Cumulative rows written
    pub total_rows: u64,
}

/// Streams identifiers out of a snapshot file, one per line.
///
/// Yields an error (and should not be polled further) for a line the
/// extractor rejects.
pub struct IdReader<R> {
    reader: R,
    extract: ExtractFn,
    buf: String,
    line_no: u64,
}

/// Initial capacity for the per-line read buffer
const LINE_BUF_CAPACITY: usize = 256;

impl<R: BufRead> IdReader<R> {
    pub fn new(reader: R, extract: ExtractFn) -> Self {
        Self {
            reader,
            extract,
            buf: String::with_capacity(LINE_BUF_CAPACITY),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for IdReader<R> {
    type Item = Result<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        let line_no = self.line_no + 1;
        match self.reader.read_line(&mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                self.line_no = line_no;
                let line = self.buf.trim_end_matches(['\n', '\r']);
                Some(
                    (self.extract)(line)
                        .with_context(|| format!("line {line_no}: malformed identifier record")),
                )
            }
            Err(e) => Some(Err(e).with_context(|| format!("line {line_no}: read failed"))),
        }
    }
}

/// Run the chunked pool over `ids`, writing one line per identifier.
///
/// `lookup` must not fail: a failed lookup returns an empty string, which is
/// written as an empty line. An `Err` from `ids` aborts the run; jobs of the
/// current chunk that have not started are discarded.
pub fn run_pipeline<I, W, L>(
    ids: I,
    output: &mut W,
    pool: &PoolConfig,
    lookup: &L,
    mut on_chunk: impl FnMut(&ChunkReport),
) -> Result<PipelineStats>
where
    I: IntoIterator<Item = Result<u64>>,
    W: Write,
    L: Fn(u64) -> String + Sync,
{
    pool.validate()?;
    let mut ids = ids.into_iter();
    let mut stats = PipelineStats::default();

    // A chunk opens only when there is at least one identifier for it
    while let Some(first) = ids.next() {
        let first = first?;
        let tally = run_chunk(first, &mut ids, output, pool, lookup)?;

        stats.chunks += 1;
        stats.rows += tally.rows as u64;
        stats.empty_rows += tally.empty_rows;
        on_chunk(&ChunkReport {
            chunk: stats.chunks,
            chunk_rows: tally.rows,
            total_rows: stats.rows,
        });
    }

    output.flush().context("Failed to flush output")?;
    Ok(stats)
}

#[derive(Debug, Default)]
struct ChunkTally {
    rows: usize,
    empty_rows: u64,
}

/// One pool generation: start workers, submit, close, drain.
fn run_chunk<I, W, L>(
    first: u64,
    ids: &mut I,
    output: &mut W,
    pool: &PoolConfig,
    lookup: &L,
) -> Result<ChunkTally>
where
    I: Iterator<Item = Result<u64>>,
    W: Write,
    L: Fn(u64) -> String + Sync,
{
    let (job_tx, job_rx) = bounded::<u64>(pool.chunk_size);
    let (result_tx, result_rx) = bounded::<String>(pool.chunk_size);

    thread::scope(|s| {
        for _ in 0..pool.workers {
            let jobs = job_rx.clone();
            let results = result_tx.clone();
            s.spawn(move || worker_loop(&jobs, &results, lookup));
        }
        // Workers hold the only result senders from here on
        drop(result_tx);

        let submitted = submit_chunk(first, ids, &job_tx, pool.chunk_size);
        // Closed queue: workers exit once it is drained
        drop(job_tx);

        let outcome = submitted.and_then(|n| drain_chunk(n, &result_rx, output));
        if outcome.is_err() {
            // Discard jobs not yet started; workers stop after in-flight calls
            while job_rx.try_recv().is_ok() {}
        }
        outcome
    })
}

fn worker_loop<L>(jobs: &Receiver<u64>, results: &Sender<String>, lookup: &L)
where
    L: Fn(u64) -> String,
{
    for id in jobs.iter() {
        if results.send(lookup(id)).is_err() {
            break;
        }
    }
}

/// Enqueue `first` plus up to `chunk_size - 1` more identifiers
fn submit_chunk<I>(first: u64, ids: &mut I, jobs: &Sender<u64>, chunk_size: usize) -> Result<usize>
where
    I: Iterator<Item = Result<u64>>,
{
    jobs.send(first).context("job queue closed")?;
    let mut submitted = 1;
    while submitted < chunk_size {
        let Some(id) = ids.next() else { break };
        jobs.send(id?).context("job queue closed")?;
        submitted += 1;
    }
    Ok(submitted)
}

/// Collect exactly `expected` bodies, in completion order
fn drain_chunk<W: Write>(
    expected: usize,
    results: &Receiver<String>,
    output: &mut W,
) -> Result<ChunkTally> {
    let mut tally = ChunkTally::default();
    for _ in 0..expected {
        let body = results
            .recv()
            .context("worker pool exited before the chunk was drained")?;
        if body.is_empty() {
            tally.empty_rows += 1;
        }
        output
            .write_all(body.as_bytes())
            .and_then(|()| output.write_all(b"\n"))
            .context("Failed writing to the output file")?;
        tally.rows += 1;
    }
    Ok(tally)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::record::extract_id;

    fn ids(n: u64) -> Vec<Result<u64>> {
        (1..=n).map(Ok).collect()
    }

    fn ok_body(id: u64) -> String {
        format!("{{\"ok\":{id}}}")
    }

    fn lines(out: &[u8]) -> Vec<String> {
        String::from_utf8(out.to_vec())
            .unwrap()
            .lines()
            .map(String::from)
            .collect()
    }

    fn pool(workers: usize, chunk_size: usize) -> PoolConfig {
        PoolConfig {
            workers,
            chunk_size,
        }
    }

    #[test]
    fn default_pool() {
        let p = PoolConfig::default();
        assert_eq!(p.workers, 50);
        assert_eq!(p.chunk_size, 1000);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn zero_sized_pool_rejected() {
        let mut out = Vec::new();
        assert!(run_pipeline(ids(1), &mut out, &pool(0, 10), &ok_body, |_| {}).is_err());
        assert!(run_pipeline(ids(1), &mut out, &pool(2, 0), &ok_body, |_| {}).is_err());
    }

    #[test]
    fn three_ids_chunk_two_worker_one() {
        let mut out = Vec::new();
        let stats = run_pipeline(ids(3), &mut out, &pool(1, 2), &ok_body, |_| {}).unwrap();

        assert_eq!(stats.rows, 3);
        assert_eq!(stats.chunks, 2);
        let got: HashSet<String> = lines(&out).into_iter().collect();
        let want: HashSet<String> = (1..=3).map(ok_body).collect();
        assert_eq!(got, want);
        // chunk 2 holds only id 3
        assert_eq!(lines(&out)[2], ok_body(3));
    }

    #[test]
    fn exact_chunk_is_one_cycle() {
        let mut reports = Vec::new();
        let mut out = Vec::new();
        let stats =
            run_pipeline(ids(4), &mut out, &pool(3, 4), &ok_body, |r| reports.push(*r)).unwrap();

        assert_eq!(stats.chunks, 1);
        assert_eq!(
            reports,
            vec![ChunkReport {
                chunk: 1,
                chunk_rows: 4,
                total_rows: 4
            }]
        );
    }

    #[test]
    fn one_past_chunk_is_two_cycles() {
        let mut reports = Vec::new();
        let mut out = Vec::new();
        let stats =
            run_pipeline(ids(5), &mut out, &pool(3, 4), &ok_body, |r| reports.push(*r)).unwrap();

        assert_eq!(stats.chunks, 2);
        assert_eq!(reports[1].chunk_rows, 1);
        assert_eq!(reports[1].total_rows, 5);
    }

    #[test]
    fn empty_input_writes_nothing() {
        let mut out = Vec::new();
        let stats = run_pipeline(ids(0), &mut out, &pool(2, 2), &ok_body, |_| {}).unwrap();
        assert_eq!(stats, PipelineStats::default());
        assert!(out.is_empty());
    }

    #[test]
    fn failed_lookups_become_empty_lines() {
        let lookup = |id: u64| if id % 2 == 0 { String::new() } else { ok_body(id) };
        let mut out = Vec::new();
        let stats = run_pipeline(ids(10), &mut out, &pool(4, 3), &lookup, |_| {}).unwrap();

        assert_eq!(stats.rows, 10);
        assert_eq!(stats.empty_rows, 5);
        let written = lines(&out);
        assert_eq!(written.len(), 10);
        assert_eq!(written.iter().filter(|l| l.is_empty()).count(), 5);
    }

    #[test]
    fn chunks_never_interleave() {
        // Later ids finish first inside each chunk
        let lookup = |id: u64| {
            std::thread::sleep(Duration::from_millis(30 - id * 4));
            ok_body(id)
        };
        let mut out = Vec::new();
        run_pipeline(ids(6), &mut out, &pool(3, 3), &lookup, |_| {}).unwrap();

        let written = lines(&out);
        let first: HashSet<_> = written[..3].iter().cloned().collect();
        let second: HashSet<_> = written[3..].iter().cloned().collect();
        assert_eq!(first, (1..=3).map(ok_body).collect());
        assert_eq!(second, (4..=6).map(ok_body).collect());
    }

    #[test]
    fn in_flight_bounded_by_workers() {
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let lookup = |id: u64| {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(5));
            active.fetch_sub(1, Ordering::SeqCst);
            ok_body(id)
        };
        let mut out = Vec::new();
        let stats = run_pipeline(ids(40), &mut out, &pool(3, 10), &lookup, |_| {}).unwrap();

        assert_eq!(stats.rows, 40);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[test]
    fn malformed_id_aborts() {
        let input = Cursor::new("{\"id\":1}\nnot-json\n{\"id\":3}\n");
        let reader = IdReader::new(input, extract_id);
        let mut out = Vec::new();
        let err = run_pipeline(reader, &mut out, &pool(2, 10), &ok_body, |_| {}).unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }

    #[test]
    fn malformed_id_in_later_chunk_keeps_earlier_rows() {
        let input = Cursor::new("{\"id\":1}\n{\"id\":2}\n{}\n");
        let reader = IdReader::new(input, extract_id);
        let mut out = Vec::new();
        let mut reports = Vec::new();
        let res = run_pipeline(reader, &mut out, &pool(1, 2), &ok_body, |r| reports.push(*r));

        assert!(res.is_err());
        assert_eq!(reports.len(), 1);
        assert_eq!(lines(&out).len(), 2);
    }

    #[test]
    fn id_reader_streams_lines() {
        let input = Cursor::new("{\"id\":10}\r\n{\"id\":20,\"name\":\"x\"}\n{\"id\":30}");
        let got: Vec<u64> = IdReader::new(input, extract_id)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(got, vec![10, 20, 30]);
    }

    #[test]
    fn id_reader_rejects_blank_line() {
        let input = Cursor::new("{\"id\":10}\n\n{\"id\":30}\n");
        let mut reader = IdReader::new(input, extract_id);
        assert_eq!(reader.next().unwrap().unwrap(), 10);
        let err = reader.next().unwrap().unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }
}
