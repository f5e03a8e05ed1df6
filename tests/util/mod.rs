use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Condvar, Mutex, OnceLock};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};
use photo_search::model::types::{Account, FileItem, SearchRequest, SearchResult};
use photo_search::remote::SearchOperation;
use photo_search::storage::FileStore;
use photo_search::task::TaskSettings;
use photo_search::ui::Screen;

pub const WAIT: Duration = Duration::from_secs(10);

/// Captures tracing output for tests.
///
/// Installed process-wide, since task events fire on runtime threads; tests
/// tell their lines apart by account name.
#[allow(dead_code)]
pub struct TestTracing {
    buffer: Arc<Mutex<Vec<u8>>>,
}

#[allow(dead_code)]
impl TestTracing {
    pub fn global() -> &'static TestTracing {
        static TRACING: OnceLock<TestTracing> = OnceLock::new();
        TRACING.get_or_init(|| {
            let tracing = TestTracing {
                buffer: Arc::new(Mutex::new(Vec::new())),
            };
            let writer = tracing.buffer.clone();
            let make_writer = move || TestWriter(writer.clone());
            let subscriber = tracing_subscriber::fmt()
                .with_ansi(false)
                .without_time()
                .with_writer(make_writer)
                .finish();
            tracing::subscriber::set_global_default(subscriber).expect("no other global subscriber");
            tracing
        })
    }

    pub fn output(&self) -> String {
        let buf = self.buffer.lock().unwrap();
        String::from_utf8_lossy(&buf).to_string()
    }

    /// Lines logged inside spans of the given account.
    pub fn lines_for(&self, account: &str) -> Vec<String> {
        let needle = format!("account={account}");
        self.output()
            .lines()
            .filter(|l| l.contains(&needle))
            .map(str::to_owned)
            .collect()
    }
}

struct TestWriter(Arc<Mutex<Vec<u8>>>);

impl Write for TestWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut guard = self.0.lock().unwrap();
        guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Scripted search backend that records every request.
///
/// A gated fake parks inside `execute` until the test releases it, which is
/// how tests act while a request is in flight. Requests are released in the
/// order they were issued.
#[allow(dead_code)]
pub struct FakeSearch {
    responses: Mutex<VecDeque<SearchResult>>,
    requests: Mutex<Vec<SearchRequest>>,
    gate: Option<(Sender<()>, Arc<Released>)>,
}

/// How many gated requests the test has let through.
#[derive(Default)]
struct Released {
    count: Mutex<usize>,
    changed: Condvar,
}

/// Test side of a gated [`FakeSearch`].
#[allow(dead_code)]
pub struct Gate {
    entered: Receiver<()>,
    released: Arc<Released>,
}

#[allow(dead_code)]
impl FakeSearch {
    pub fn new(responses: impl IntoIterator<Item = SearchResult>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
            gate: None,
        })
    }

    pub fn gated(responses: impl IntoIterator<Item = SearchResult>) -> (Arc<Self>, Gate) {
        let (entered_tx, entered_rx) = unbounded();
        let released = Arc::new(Released::default());
        let fake = Arc::new(Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
            gate: Some((entered_tx, Arc::clone(&released))),
        });
        (
            fake,
            Gate {
                entered: entered_rx,
                released,
            },
        )
    }

    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl SearchOperation for FakeSearch {
    fn execute(&self, _account: &Account, request: &SearchRequest) -> SearchResult {
        let index = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(*request);
            requests.len() - 1
        };
        if let Some((entered, released)) = &self.gate {
            let _ = entered.send(());
            let count = released.count.lock().unwrap();
            let _ = released
                .changed
                .wait_timeout_while(count, WAIT, |count| *count <= index)
                .unwrap();
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| SearchResult::ok(Vec::new()))
    }
}

#[allow(dead_code)]
impl Gate {
    /// Blocks until the fake is inside `execute`.
    pub fn wait_entered(&self) {
        self.entered.recv_timeout(WAIT).expect("request issued");
    }

    /// Lets the oldest request still parked return.
    pub fn release(&self) {
        *self.released.count.lock().unwrap() += 1;
        self.released.changed.notify_all();
    }
}

/// Screen that remembers every loading-indicator change.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingScreen {
    calls: Mutex<Vec<bool>>,
}

#[allow(dead_code)]
impl RecordingScreen {
    pub fn calls(&self) -> Vec<bool> {
        self.calls.lock().unwrap().clone()
    }
}

impl Screen for RecordingScreen {
    fn set_loading_indicator(&self, loading: bool) {
        self.calls.lock().unwrap().push(loading);
    }
}

#[allow(dead_code)]
pub fn photos(count: usize, newest_ms: i64) -> Vec<FileItem> {
    (0..count as i64)
        .map(|i| newest_ms - i * 1000)
        .map(|ms| FileItem::new(format!("/Photos/img-{ms}.jpg"), "image/jpeg", ms))
        .collect()
}

#[allow(dead_code)]
pub fn store() -> Arc<FileStore> {
    Arc::new(FileStore::open_in_memory("tester@cloud").expect("in-memory store"))
}

#[allow(dead_code)]
pub fn account(user: &str) -> Account {
    Account::new("https://cloud.example.com", user)
}

#[allow(dead_code)]
pub fn no_debounce() -> TaskSettings {
    TaskSettings {
        debounce: Duration::ZERO,
        page_multiplier: 15,
    }
}

/// Answers one HTTP request per body, in order, then stops listening.
#[allow(dead_code)]
pub fn serve_pages(bodies: Vec<&'static str>) -> (String, thread::JoinHandle<usize>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    let handle = thread::spawn(move || {
        let mut served = 0;
        for body in bodies {
            let Ok((stream, _)) = listener.accept() else { break };
            let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap_or(0) == 0 || line == "\r\n" {
                    break;
                }
                if let Some(v) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = v.trim().parse().unwrap_or(0);
                }
            }
            let mut req_body = vec![0u8; content_length];
            let _ = reader.read_exact(&mut req_body);
            let mut stream = stream;
            let _ = write!(
                stream,
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            served += 1;
        }
        served
    });
    (format!("http://{addr}"), handle)
}
