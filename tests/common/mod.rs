//! Shared test fixtures for the order dashboard integration tests.
//!
//! Provides CSV writers for DuckDB-backed tests and record constructors for
//! the pure aggregation tests.

#![allow(dead_code)]

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use chrono::NaiveDateTime;
use order_dashboard::{CacheManager, Connection, DatasetSource, OrderRecord};
use rust_decimal::Decimal;

pub const HEADER: &str = "order_id,order_purchase_timestamp,price,payment_type,payment_value";

/// The three-row example: one order split over two January rows and one
/// February boleto order.
pub fn scenario_rows() -> Vec<&'static str> {
    vec![
        "1,2023-01-05 09:15:00,10,credit_card,10",
        "1,2023-01-20 18:40:12,5,credit_card,5",
        "2,2023-02-01 00:00:00,20,boleto,20",
    ]
}

/// A larger dataset spanning a year boundary, with repeated orders,
/// several payment types and fractional amounts.
pub fn sample_rows() -> Vec<&'static str> {
    vec![
        "a1,2017-11-03 10:00:00,29.90,credit_card,45.80",
        "a1,2017-11-03 10:00:00,15.90,credit_card,45.80",
        "a2,2017-11-28 22:12:09,120.00,boleto,132.50",
        "a3,2017-12-01 08:00:00,49.99,voucher,20.00",
        "a3,2017-12-01 08:00:00,49.99,credit_card,39.99",
        "a4,2017-12-31 23:59:59,10.10,debit_card,10.10",
        "a5,2018-01-01 00:00:00,75.00,credit_card,80.00",
        "a6,2018-01-15 13:30:00,0.10,boleto,0.10",
        "a6,2018-01-15 13:30:00,0.20,boleto,0.20",
    ]
}

/// Write a dataset CSV (header plus `rows`) to `dir/data_merged.csv`.
pub fn write_csv(dir: &std::path::Path, rows: &[&str]) -> PathBuf {
    write_csv_with_header(dir, HEADER, rows)
}

pub fn write_csv_with_header(dir: &std::path::Path, header: &str, rows: &[&str]) -> PathBuf {
    let path = dir.join("data_merged.csv");
    fs::write(&path, csv_text(header, rows)).unwrap();
    path
}

pub fn csv_text(header: &str, rows: &[&str]) -> String {
    let mut contents = String::from(header);
    contents.push('\n');
    for row in rows {
        contents.push_str(row);
        contents.push('\n');
    }
    contents
}

/// Create an offline `Connection` reading a CSV with the given rows.
///
/// Returns `(Connection, tempfile::TempDir)`. The caller must keep the
/// `TempDir` alive: the CSV is only read on the first query.
pub fn setup_db(rows: &[&str]) -> (Connection, tempfile::TempDir) {
    let tmp_dir = tempfile::tempdir().unwrap();
    let csv = write_csv(tmp_dir.path(), rows);
    let cache = CacheManager::new(
        Some(tmp_dir.path().join("cache")),
        true,
        Duration::from_secs(30),
    )
    .unwrap();
    let conn = Connection::new(cache, DatasetSource::Path(csv)).unwrap();
    (conn, tmp_dir)
}

pub fn setup_sample_db() -> (Connection, tempfile::TempDir) {
    setup_db(&sample_rows())
}

pub fn ts(text: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").unwrap()
}

pub fn record(
    order_id: &str,
    timestamp: &str,
    price: &str,
    payment_type: &str,
    payment_value: &str,
) -> OrderRecord {
    OrderRecord {
        order_id: order_id.to_string(),
        order_purchase_timestamp: ts(timestamp),
        price: Decimal::from_str(price).unwrap(),
        payment_type: payment_type.to_string(),
        payment_value: Decimal::from_str(payment_value).unwrap(),
    }
}

/// Records equal to `scenario_rows()`.
pub fn scenario_records() -> Vec<OrderRecord> {
    vec![
        record("1", "2023-01-05 09:15:00", "10", "credit_card", "10"),
        record("1", "2023-01-20 18:40:12", "5", "credit_card", "5"),
        record("2", "2023-02-01 00:00:00", "20", "boleto", "20"),
    ]
}

// ---------------------------------------------------------------------------
// Local HTTP server
// ---------------------------------------------------------------------------

/// Minimal HTTP/1.1 server on `127.0.0.1` answering `GET` and `HEAD` for any
/// path with the current body and `ETag`. Runs until the test process exits.
pub struct TestServer {
    addr: SocketAddr,
    served: Arc<Mutex<(String, Vec<u8>)>>,
    heads: Arc<AtomicUsize>,
    gets: Arc<AtomicUsize>,
}

impl TestServer {
    pub fn start(etag: &str, body: impl Into<Vec<u8>>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let served = Arc::new(Mutex::new((etag.to_string(), body.into())));
        let heads = Arc::new(AtomicUsize::new(0));
        let gets = Arc::new(AtomicUsize::new(0));

        let (s, h, g) = (served.clone(), heads.clone(), gets.clone());
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                respond(stream, &s, &h, &g);
            }
        });

        Self {
            addr,
            served,
            heads,
            gets,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}/{}", self.addr, path)
    }

    /// Replace what the server returns from now on.
    pub fn publish(&self, etag: &str, body: impl Into<Vec<u8>>) {
        *self.served.lock().unwrap() = (etag.to_string(), body.into());
    }

    pub fn head_requests(&self) -> usize {
        self.heads.load(Ordering::SeqCst)
    }

    pub fn get_requests(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

fn respond(
    mut stream: TcpStream,
    served: &Mutex<(String, Vec<u8>)>,
    heads: &AtomicUsize,
    gets: &AtomicUsize,
) {
    let Ok(read_half) = stream.try_clone() else { return };
    let mut reader = BufReader::new(read_half);
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) if line.trim().is_empty() => break,
            Ok(_) => continue,
            Err(_) => return,
        }
    }

    let is_head = request_line.starts_with("HEAD ");
    if is_head {
        heads.fetch_add(1, Ordering::SeqCst);
    } else {
        gets.fetch_add(1, Ordering::SeqCst);
    }

    let (etag, body) = served.lock().unwrap().clone();
    let header = format!(
        "HTTP/1.1 200 OK\r\n\
         Content-Type: application/octet-stream\r\n\
         Content-Length: {}\r\n\
         ETag: {}\r\n\
         Connection: close\r\n\r\n",
        body.len(),
        etag
    );
    let _ = stream.write_all(header.as_bytes());
    if !is_head {
        let _ = stream.write_all(&body);
    }
    let _ = stream.flush();
}
