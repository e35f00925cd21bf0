//! Scripted serial line for testing without a controller.
//!
//! [`MockTransport`] is a cheap cloneable handle: move one clone into a
//! [`Station`](crate::Station) and keep another in the test to script the
//! controller's replies and inspect what was written.
//!
//! | Behaviour | Builder |
//! |-----------|---------|
//! | Greeting sent after open | [`with_greeting`](MockTransport::with_greeting) |
//! | Greeting arrives late | [`with_greeting_delay`](MockTransport::with_greeting_delay) |
//! | Port missing | [`failing_open`](MockTransport::failing_open) |
//! | Reply to each command | [`with_responder`](MockTransport::with_responder), [`respond_with`](MockTransport::respond_with) |
//!
//! # Example
//!
//! ```rust
//! use rs_dcc::hal::MockTransport;
//! use rs_dcc::traits::{SerialSettings, Transport};
//!
//! let mock = MockTransport::new().respond_with("@S88,0,FF,0A\r\n200 Ok\r\n");
//! let mut line = mock.clone();
//! line.open(&SerialSettings::new("COM3")).unwrap();
//! line.write_all(b"getS88(2)\r\n").unwrap();
//!
//! assert_eq!(line.read_line().unwrap(), "@S88,0,FF,0A\r\n");
//! assert_eq!(line.read_available().unwrap(), "200 Ok\r\n");
//! assert_eq!(mock.writes(), vec!["getS88(2)".to_string()]);
//! ```

use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::traits::{SerialSettings, Transport};

/// Reply generator: receives the command without its line terminator.
pub type Responder = Box<dyn FnMut(&str) -> String + Send>;

/// Transport call recorded by the mock, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MockEvent {
    /// A command was written (terminator stripped).
    Write(String),
    /// One line was read.
    ReadLine,
    /// The buffered input was drained.
    Drain,
}

struct MockLine {
    open: bool,
    fail_open: bool,
    open_count: usize,
    settings: Option<SerialSettings>,
    greeting: Option<String>,
    greeting_delay: Duration,
    greeting_due: Option<Instant>,
    rx: String,
    responder: Responder,
    writes: Vec<String>,
    events: Vec<MockEvent>,
    bytes_written: usize,
}

impl MockLine {
    fn deliver_greeting(&mut self) {
        let due = match self.greeting_due {
            Some(due) => due,
            None => return,
        };
        if Instant::now() >= due {
            self.greeting_due = None;
            if let Some(greeting) = &self.greeting {
                self.rx.push_str(greeting);
            }
        }
    }

    fn ensure_open(&self) -> io::Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(io::Error::new(io::ErrorKind::NotConnected, "mock line closed"))
        }
    }
}

/// Scripted fake serial line.
#[derive(Clone)]
pub struct MockTransport {
    line: Arc<Mutex<MockLine>>,
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let line = self.line();
        f.debug_struct("MockTransport")
            .field("open", &line.open)
            .field("writes", &line.writes.len())
            .field("pending", &line.rx.len())
            .finish_non_exhaustive()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// A line that acknowledges every command with `200 Ok` and sends no greeting.
    pub fn new() -> Self {
        Self {
            line: Arc::new(Mutex::new(MockLine {
                open: false,
                fail_open: false,
                open_count: 0,
                settings: None,
                greeting: None,
                greeting_delay: Duration::ZERO,
                greeting_due: None,
                rx: String::new(),
                responder: Box::new(|_| "200 Ok\r\n".to_string()),
                writes: Vec::new(),
                events: Vec::new(),
                bytes_written: 0,
            })),
        }
    }

    /// A line whose controller greets with `100 Ready` immediately.
    pub fn ready() -> Self {
        Self::new().with_greeting("DesktopStation\r\n100 Ready\r\n")
    }

    fn line(&self) -> MutexGuard<'_, MockLine> {
        self.line.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Text the controller sends after each open.
    pub fn with_greeting(self, greeting: &str) -> Self {
        self.line().greeting = Some(greeting.to_string());
        self
    }

    /// Delay between open and the greeting becoming readable.
    pub fn with_greeting_delay(self, delay: Duration) -> Self {
        self.line().greeting_delay = delay;
        self
    }

    /// Make `open` fail as if the port did not exist.
    pub fn failing_open(self) -> Self {
        self.line().fail_open = true;
        self
    }

    /// Generate the reply to each written command.
    pub fn with_responder<F>(self, responder: F) -> Self
    where
        F: FnMut(&str) -> String + Send + 'static,
    {
        self.line().responder = Box::new(responder);
        self
    }

    /// Reply to every command with the same text.
    pub fn respond_with(self, reply: &str) -> Self {
        let reply = reply.to_string();
        self.with_responder(move |_| reply.clone())
    }

    /// Inject bytes as if the controller sent them unsolicited.
    pub fn push_input(&self, text: &str) {
        self.line().rx.push_str(text);
    }

    /// Commands written so far, terminators stripped.
    pub fn writes(&self) -> Vec<String> {
        self.line().writes.clone()
    }

    /// Total bytes written so far.
    pub fn bytes_written(&self) -> usize {
        self.line().bytes_written
    }

    /// Every transport call recorded so far.
    pub fn events(&self) -> Vec<MockEvent> {
        self.line().events.clone()
    }

    /// Forget recorded writes and events.
    pub fn clear_log(&self) {
        let mut line = self.line();
        line.writes.clear();
        line.events.clear();
        line.bytes_written = 0;
    }

    /// How many times the line was opened.
    pub fn open_count(&self) -> usize {
        self.line().open_count
    }

    /// Settings passed to the last successful open.
    pub fn last_settings(&self) -> Option<SerialSettings> {
        self.line().settings.clone()
    }
}

impl Transport for MockTransport {
    fn open(&mut self, settings: &SerialSettings) -> io::Result<()> {
        let mut line = self.line();
        if line.fail_open {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such port: {}", settings.port),
            ));
        }
        line.open = true;
        line.open_count += 1;
        line.settings = Some(settings.clone());
        line.rx.clear();
        let due = Instant::now() + line.greeting_delay;
        line.greeting_due = line.greeting.is_some().then_some(due);
        Ok(())
    }

    fn close(&mut self) {
        let mut line = self.line();
        line.open = false;
        line.greeting_due = None;
    }

    fn is_open(&self) -> bool {
        self.line().open
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut line = self.line();
        line.ensure_open()?;
        line.bytes_written += bytes.len();

        let text = String::from_utf8_lossy(bytes);
        let command = text.trim_end_matches(['\r', '\n']).to_string();
        let responder = &mut line.responder;
        let reply = responder(&command);
        line.rx.push_str(&reply);
        line.events.push(MockEvent::Write(command.clone()));
        line.writes.push(command);
        Ok(())
    }

    fn read_line(&mut self) -> io::Result<String> {
        let mut line = self.line();
        line.ensure_open()?;
        line.deliver_greeting();
        line.events.push(MockEvent::ReadLine);
        let taken: String = match line.rx.find('\n') {
            Some(end) => line.rx.drain(..=end).collect(),
            None => std::mem::take(&mut line.rx),
        };
        Ok(taken)
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        let mut line = self.line();
        line.ensure_open()?;
        line.deliver_greeting();
        Ok(line.rx.len())
    }

    fn read_available(&mut self) -> io::Result<String> {
        let mut line = self.line();
        line.ensure_open()?;
        line.deliver_greeting();
        line.events.push(MockEvent::Drain);
        Ok(std::mem::take(&mut line.rx))
    }

    fn clear_input(&mut self) -> io::Result<()> {
        let mut line = self.line();
        line.ensure_open()?;
        line.deliver_greeting();
        line.rx.clear();
        Ok(())
    }
}
