use super::ChatStreamEvent;

const DATA_PREFIX: &str = "data: ";

/// Splits an SSE byte stream into complete lines.
///
/// Transport fragments carry no line alignment, so any trailing partial line
/// (including a split UTF-8 sequence) is held until the next fragment.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a fragment, returning every line it completed.
    pub fn push(&mut self, fragment: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(fragment);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let rest = self.buffer.split_off(pos + 1);
            let mut line = std::mem::replace(&mut self.buffer, rest);
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Flush an unterminated final line at end of stream.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.buffer);
        let line = String::from_utf8_lossy(&line);
        Some(line.trim_end_matches('\r').to_string())
    }

    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }
}

/// Parse one SSE line. `None` for lines that carry no event (comments,
/// other fields, blank payloads).
pub fn parse_line(line: &str) -> Option<serde_json::Result<ChatStreamEvent>> {
    let payload = line.strip_prefix(DATA_PREFIX)?.trim();
    if payload.is_empty() {
        return None;
    }
    Some(serde_json::from_str(payload))
}
