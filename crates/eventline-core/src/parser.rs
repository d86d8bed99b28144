//! Server-Sent Events (SSE) parser.
//!
//! Reads events one at a time from a [`ByteSource`] according to the
//! WHATWG event-stream interpretation rules. The parser keeps the last
//! event id and the advised reconnection time across calls; everything
//! else belongs to the block currently being read.

use crate::source::ByteSource;
use eventline_types::{Event, SourceError};

/// Bytes that end a line. `\r\n` is treated as a single terminator.
const LINE_TERMINATORS: &[u8] = b"\r\n";

/// Incremental SSE parser bound to a single byte source.
pub struct EventParser<S> {
    source: S,
    last_id: Option<String>,
    reconnection_time_ms: i64,
}

impl<S: ByteSource> EventParser<S> {
    /// `source` must already be positioned past any byte-order mark. The
    /// parser never closes it; use [`EventParser::into_inner`] to take it back.
    pub fn new(source: S) -> Self {
        Self {
            source,
            last_id: None,
            reconnection_time_ms: -1,
        }
    }

    /// The last parsed reconnection time in milliseconds, or -1 if the stream
    /// has not sent a valid `retry` field yet.
    pub fn reconnection_time(&self) -> i64 {
        self.reconnection_time_ms
    }

    /// The server-advised reconnection delay, if a non-negative one was sent.
    pub fn advised_delay_ms(&self) -> Option<u64> {
        u64::try_from(self.reconnection_time_ms).ok()
    }

    /// Id of the most recently dispatched event.
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_id.as_deref()
    }

    /// The source being parsed.
    pub fn get_ref(&self) -> &S {
        &self.source
    }

    /// Mutable access to the source, e.g. to append more in-memory input.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Release the source, keeping whatever it has not yet handed out.
    pub fn into_inner(self) -> S {
        self.source
    }

    /// Read the next event, or `None` once the source is exhausted.
    ///
    /// Blocks without a `data` field are discarded and reading continues.
    /// A block that is still open when the input runs out is dropped.
    pub fn next_event(&mut self) -> Result<Option<Event>, SourceError> {
        let mut id = self.last_id.clone();
        let mut name: Option<String> = None;
        let mut data: Option<String> = None;

        loop {
            let Some(mut line_len) = self.source.index_of_element(LINE_TERMINATORS)? else {
                if data.is_some() {
                    tracing::trace!("Input exhausted inside an event, dropping it");
                }
                return Ok(None);
            };

            if line_len == 0 {
                self.skip_line_terminator()?;

                if let Some(data) = data.take() {
                    self.last_id.clone_from(&id);
                    return Ok(Some(Event {
                        id,
                        event_type: name,
                        data,
                    }));
                }

                // Event with no data. Reject and try again.
                tracing::trace!("Discarding event without data");
                id.clone_from(&self.last_id);
                name = None;
                continue;
            }

            let colon = self.source.index_of(b':', 0, line_len)?;
            if colon == Some(0) {
                self.source.skip(line_len)?;
                self.skip_line_terminator()?;
                tracing::trace!("Skipped comment line");
                continue;
            }

            let (field, value) = match colon {
                None => (self.source.read_utf8(line_len)?, String::new()),
                Some(colon) => {
                    let field = self.source.read_utf8(colon)?;
                    self.source.skip(1)?;
                    line_len -= colon + 1;

                    if line_len > 0 && self.source.peek()? == Some(b' ') {
                        self.source.skip(1)?;
                        line_len -= 1;
                    }

                    (field, self.source.read_utf8(line_len)?)
                }
            };
            self.skip_line_terminator()?;

            match field.as_str() {
                "data" => match data.as_mut() {
                    Some(buf) => {
                        buf.push('\n');
                        buf.push_str(&value);
                    }
                    None => data = Some(value),
                },
                "id" => id = non_empty(value),
                "event" => name = non_empty(value),
                "retry" => match value.parse::<i64>() {
                    Ok(ms) => self.reconnection_time_ms = ms,
                    Err(e) => tracing::debug!("Ignoring malformed retry value {value:?}: {e}"),
                },
                other => tracing::trace!("Ignoring unknown SSE field: {other}"),
            }
        }
    }

    /// Consume `\r`, `\n` or `\r\n`.
    fn skip_line_terminator(&mut self) -> Result<(), SourceError> {
        if self.source.read_byte()? == b'\r' && self.source.peek()? == Some(b'\n') {
            self.source.skip(1)?;
        }
        Ok(())
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::BufferedSource;
    use std::io;

    fn parser(text: &str) -> EventParser<BufferedSource<io::Empty>> {
        EventParser::new(BufferedSource::from_text(text))
    }

    fn event(id: Option<&str>, event_type: Option<&str>, data: &str) -> Event {
        Event::new(id, event_type, data)
    }

    #[test]
    fn test_multiline_data() {
        let mut parser = parser("data: YHOO\ndata: +2\ndata: 10\n\n");
        assert_eq!(
            parser.next_event().unwrap(),
            Some(Event::data_only("YHOO\n+2\n10"))
        );
        assert_eq!(parser.next_event().unwrap(), None);
    }

    #[test]
    fn test_multiline_cr() {
        let mut parser = parser("data: YHOO\rdata: +2\rdata: 10\r\r");
        assert_eq!(
            parser.next_event().unwrap(),
            Some(Event::data_only("YHOO\n+2\n10"))
        );
        assert_eq!(parser.next_event().unwrap(), None);
    }

    #[test]
    fn test_multiline_crlf() {
        let mut parser = parser("data: YHOO\r\ndata: +2\r\ndata: 10\r\n\r\n");
        assert_eq!(
            parser.next_event().unwrap(),
            Some(Event::data_only("YHOO\n+2\n10"))
        );
        assert_eq!(parser.next_event().unwrap(), None);
    }

    #[test]
    fn test_event_type() {
        let mut parser = parser(
            "event: add\ndata: 73857293\n\nevent: remove\ndata: 2153\n\nevent: add\ndata: 113411\n\n",
        );
        assert_eq!(
            parser.next_event().unwrap(),
            Some(event(None, Some("add"), "73857293"))
        );
        assert_eq!(
            parser.next_event().unwrap(),
            Some(event(None, Some("remove"), "2153"))
        );
        assert_eq!(
            parser.next_event().unwrap(),
            Some(event(None, Some("add"), "113411"))
        );
        assert_eq!(parser.next_event().unwrap(), None);
    }

    #[test]
    fn test_comments_ignored() {
        let mut parser = parser(": test stream\n\ndata: first event\nid: 1\n\n");
        assert_eq!(
            parser.next_event().unwrap(),
            Some(event(Some("1"), None, "first event"))
        );
        assert_eq!(parser.next_event().unwrap(), None);
    }

    #[test]
    fn test_comment_does_not_touch_fields() {
        let mut parser = parser("data: a\n:data: b\n:id: 9\n:event: x\n\n");
        assert_eq!(parser.next_event().unwrap(), Some(Event::data_only("a")));
    }

    #[test]
    fn test_id_cleared() {
        let mut parser = parser(
            "data: first event\nid: 1\n\ndata: second event\nid\n\ndata: third event\n\n",
        );
        assert_eq!(
            parser.next_event().unwrap(),
            Some(event(Some("1"), None, "first event"))
        );
        assert_eq!(
            parser.next_event().unwrap(),
            Some(Event::data_only("second event"))
        );
        assert_eq!(
            parser.next_event().unwrap(),
            Some(Event::data_only("third event"))
        );
        assert_eq!(parser.next_event().unwrap(), None);
    }

    #[test]
    fn test_naked_field_names() {
        let mut parser = parser("data\n\ndata\ndata\n\ndata:\n");
        assert_eq!(parser.next_event().unwrap(), Some(Event::data_only("")));
        assert_eq!(parser.next_event().unwrap(), Some(Event::data_only("\n")));
        assert_eq!(parser.next_event().unwrap(), None);
    }

    #[test]
    fn test_colon_space_optional() {
        let mut parser = parser("data:test\n\ndata: test\n\n");
        assert_eq!(parser.next_event().unwrap(), Some(Event::data_only("test")));
        assert_eq!(parser.next_event().unwrap(), Some(Event::data_only("test")));
        assert_eq!(parser.next_event().unwrap(), None);
    }

    #[test]
    fn test_leading_whitespace_beyond_one_space_kept() {
        let mut parser = parser("data:  test\n\n");
        assert_eq!(parser.next_event().unwrap(), Some(Event::data_only(" test")));
        assert_eq!(parser.next_event().unwrap(), None);
    }

    #[test]
    fn test_value_may_contain_colons() {
        let mut parser = parser("data: a: b:c\n\n");
        assert_eq!(parser.next_event().unwrap(), Some(Event::data_only("a: b:c")));
    }

    #[test]
    fn test_id_reused_across_events() {
        let mut parser = parser(
            "data: first event\nid: 1\n\ndata: second event\n\nid: 2\ndata: third event\n\n",
        );
        assert_eq!(
            parser.next_event().unwrap(),
            Some(event(Some("1"), None, "first event"))
        );
        assert_eq!(
            parser.next_event().unwrap(),
            Some(event(Some("1"), None, "second event"))
        );
        assert_eq!(
            parser.next_event().unwrap(),
            Some(event(Some("2"), None, "third event"))
        );
        assert_eq!(parser.next_event().unwrap(), None);
    }

    #[test]
    fn test_id_ignored_from_empty_event() {
        let mut parser = parser("data: first event\nid: 1\n\nid: 2\n\ndata: second event\n\n");
        assert_eq!(
            parser.next_event().unwrap(),
            Some(event(Some("1"), None, "first event"))
        );
        assert_eq!(
            parser.next_event().unwrap(),
            Some(event(Some("1"), None, "second event"))
        );
        assert_eq!(parser.last_event_id(), Some("1"));
        assert_eq!(parser.next_event().unwrap(), None);
    }

    #[test]
    fn test_name_does_not_leak_from_empty_event() {
        let mut parser = parser("event: ghost\n\ndata: x\n\n");
        assert_eq!(parser.next_event().unwrap(), Some(Event::data_only("x")));
    }

    #[test]
    fn test_empty_event_name_clears() {
        let mut parser = parser("event: add\nevent\ndata: x\n\n");
        assert_eq!(parser.next_event().unwrap(), Some(Event::data_only("x")));
    }

    #[test]
    fn test_retry_default() {
        let mut parser = parser("data: first event\nid: 1\n\n");
        assert_eq!(
            parser.next_event().unwrap(),
            Some(event(Some("1"), None, "first event"))
        );
        assert_eq!(parser.next_event().unwrap(), None);
        assert_eq!(parser.reconnection_time(), -1);
        assert_eq!(parser.advised_delay_ms(), None);
    }

    #[test]
    fn test_retry_parsed() {
        let mut parser = parser("retry: 22\n\ndata: first event\nid: 1\n\n");
        assert_eq!(
            parser.next_event().unwrap(),
            Some(event(Some("1"), None, "first event"))
        );
        assert_eq!(parser.next_event().unwrap(), None);
        assert_eq!(parser.reconnection_time(), 22);
        assert_eq!(parser.advised_delay_ms(), Some(22));
    }

    #[test]
    fn test_retry_invalid_format_ignored() {
        let mut parser = parser("retry: 22\n\nretry: hey\n\n");
        assert_eq!(parser.next_event().unwrap(), None);
        assert_eq!(parser.reconnection_time(), 22);
    }

    #[test]
    fn test_retry_in_unterminated_block_still_counts() {
        let mut parser = parser("retry: 22\n\nretry: hey\n");
        assert_eq!(parser.next_event().unwrap(), None);
        assert_eq!(parser.reconnection_time(), 22);
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let mut parser = parser("foo: bar\ndata: kept\nbaz\n\n");
        assert_eq!(parser.next_event().unwrap(), Some(Event::data_only("kept")));
        assert_eq!(parser.next_event().unwrap(), None);
    }

    #[test]
    fn test_partial_block_dropped_at_end() {
        let mut parser = parser("data: complete\n\ndata: partial\nid: 5\n");
        assert_eq!(
            parser.next_event().unwrap(),
            Some(Event::data_only("complete"))
        );
        assert_eq!(parser.next_event().unwrap(), None);
        assert_eq!(parser.last_event_id(), None);
    }

    #[test]
    fn test_exhausted_stays_exhausted() {
        let mut parser = parser("data: x");
        assert_eq!(parser.next_event().unwrap(), None);
        assert_eq!(parser.next_event().unwrap(), None);
    }

    #[test]
    fn test_empty_input() {
        let mut parser = parser("");
        assert_eq!(parser.next_event().unwrap(), None);
        assert_eq!(parser.reconnection_time(), -1);
    }
}
