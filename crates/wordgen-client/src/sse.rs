//! Incremental SSE line-protocol parser.
//!
//! The channel delivers `event:`/`data:`/`id:` lines terminated by a blank
//! line per message; comment lines start with `:`. Bytes arrive in
//! arbitrary chunk boundaries, so the parser buffers until complete lines
//! are available and emits finished messages.

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseMessage {
    pub event: String,
    pub data: String,
    pub id: Option<String>,
}

#[derive(Default)]
pub struct SseParser {
    buf: String,
    event_name: String,
    data_buf: String,
    id_line: Option<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes; returns every message completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseMessage> {
        self.buf.push_str(&String::from_utf8_lossy(chunk));
        let mut out = Vec::new();
        while let Some(pos) = self.buf.find('\n') {
            let mut line: String = self.buf.drain(..=pos).collect();
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
            if let Some(msg) = self.take_line(&line) {
                out.push(msg);
            }
        }
        out
    }

    fn take_line(&mut self, line: &str) -> Option<SseMessage> {
        if line.is_empty() {
            if self.data_buf.is_empty() {
                self.event_name.clear();
                self.id_line = None;
                return None;
            }
            let msg = SseMessage {
                event: std::mem::take(&mut self.event_name),
                data: std::mem::take(&mut self.data_buf),
                id: self.id_line.take(),
            };
            return Some(msg);
        }
        if line.starts_with(':') {
            return None;
        }
        if let Some(rest) = line.strip_prefix("event:") {
            self.event_name = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("data:") {
            if !self.data_buf.is_empty() {
                self.data_buf.push('\n');
            }
            self.data_buf.push_str(rest.trim_start());
        } else if let Some(rest) = line.strip_prefix("id:") {
            self.id_line = Some(rest.trim().to_string());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_complete_message() {
        let mut parser = SseParser::new();
        let msgs = parser.push(b"event: update\ndata: {\"type\":\"chunk_update\"}\nid: 7\n\n");
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].event, "update");
        assert_eq!(msgs[0].data, r#"{"type":"chunk_update"}"#);
        assert_eq!(msgs[0].id.as_deref(), Some("7"));
    }

    #[test]
    fn handles_arbitrary_chunk_boundaries() {
        let mut parser = SseParser::new();
        assert!(parser.push(b"data: {\"ty").is_empty());
        assert!(parser.push(b"pe\":\"processing_started\"}\n").is_empty());
        let msgs = parser.push(b"\n");
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].data, r#"{"type":"processing_started"}"#);
    }

    #[test]
    fn joins_multi_line_data_with_newlines() {
        let mut parser = SseParser::new();
        let msgs = parser.push(b"data: first\ndata: second\n\n");
        assert_eq!(msgs[0].data, "first\nsecond");
    }

    #[test]
    fn skips_comments_and_blank_keepalives() {
        let mut parser = SseParser::new();
        let msgs = parser.push(b": keepalive\n\n\ndata: x\n\n");
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].data, "x");
    }

    #[test]
    fn crlf_lines_are_tolerated() {
        let mut parser = SseParser::new();
        let msgs = parser.push(b"data: x\r\n\r\n");
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].data, "x");
    }
}
