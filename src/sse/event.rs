use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SseError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("http error {status}: {message}")]
    Http { status: u16, message: String },
    #[error("stream error: {0}")]
    Stream(String),
    #[error("stream closed by server")]
    Closed,
    #[error("SSE parse error: {0}")]
    Parse(String),
}

/// SSE event structure with full field support.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Event type; `message` unless the server sent an `event:` field.
    pub event_type: String,
    /// Event data payload.
    pub data: String,
    /// Event ID for replay/ordering.
    pub id: Option<String>,
    /// Retry timing hint from server.
    pub retry: Option<u64>,
}

impl SseEvent {
    pub fn message(data: impl Into<String>) -> Self {
        Self {
            event_type: "message".to_string(),
            data: data.into(),
            id: None,
            retry: None,
        }
    }

    pub fn is_message(&self) -> bool {
        self.event_type == "message"
    }

    /// Parse one event block (the lines between two blank lines).
    pub fn parse(input: &str) -> Result<Self, SseError> {
        let mut event_type = "message".to_string();
        let mut data: Option<String> = None;
        let mut id = None;
        let mut retry = None;

        for line in input.lines() {
            if line.is_empty() || line.starts_with(':') {
                continue;
            }

            let (key, value) = line.split_once(':').unwrap_or((line, ""));
            let value = value.strip_prefix(' ').unwrap_or(value);
            match key {
                // An empty type is the default type.
                "event" if value.is_empty() => event_type = "message".to_string(),
                "event" => event_type = value.to_string(),
                "data" => match data.as_mut() {
                    Some(existing) => {
                        existing.push('\n');
                        existing.push_str(value);
                    }
                    None => data = Some(value.to_string()),
                },
                "id" => id = Some(value.to_string()),
                "retry" => {
                    if let Ok(ms) = value.parse::<u64>() {
                        retry = Some(ms);
                    }
                }
                _ => {
                    trace!("Unknown SSE field: {}", key);
                }
            }
        }

        let data = data
            .filter(|d| !d.is_empty())
            .ok_or_else(|| SseError::Parse("Empty event data".to_string()))?;

        Ok(Self {
            event_type,
            data,
            id,
            retry,
        })
    }
}

/// Incremental decoder turning raw body chunks into events.
///
/// Bytes are buffered until a full line is available, so multi-byte UTF-8
/// sequences split across chunks decode correctly.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    lines: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(newline_idx) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=newline_idx).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }

            if line.is_empty() {
                if let Some(event) = self.dispatch() {
                    events.push(event);
                }
            } else {
                self.lines.push(String::from_utf8_lossy(&line).into_owned());
            }
        }
        events
    }

    /// Flush whatever is left once the body ends without a final blank line.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&rest);
            let line = line.trim_end_matches('\r');
            if !line.is_empty() {
                self.lines.push(line.to_string());
            }
        }
        self.dispatch()
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        if self.lines.is_empty() {
            return None;
        }
        let block = self.lines.join("\n");
        self.lines.clear();
        match SseEvent::parse(&block) {
            Ok(event) => Some(event),
            Err(e) => {
                trace!("skipping SSE block: {e}");
                None
            }
        }
    }
}
