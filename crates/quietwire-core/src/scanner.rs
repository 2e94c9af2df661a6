//! In-band control-marker extraction from decrypted text.
//!
//! Decrypted application text arrives in arbitrary fragment boundaries, with
//! control markers embedded mid-stream. The scanner walks each fragment,
//! folds plain text into the message under assembly, and classifies every
//! bracketed span through the session descriptor:
//!
//! - our `End` marker completes the pending message,
//! - other recognized markers surface as control events,
//! - bracketed text with a foreign secret or unknown literal is *not ours*
//!   and is folded back into the message text.
//!
//! A marker split across two fragments stays buffered until its closing
//! marker arrives. The scanner is pure state; the shell or transport wrapper
//! that reacts to its events lives outside the core.

use quietwire_proto::{ControlCode, ControlCodeDescriptor, TokenValidation};

/// One event recovered from the decrypted text stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// A complete application message, terminated by the end marker.
    Message(String),
    /// A recognized non-terminating control event.
    Control(ControlCode),
}

/// Incremental splitter of decrypted text into messages and control events.
#[derive(Debug, Clone)]
pub struct MarkerScanner {
    descriptor: ControlCodeDescriptor,
    /// Message text accumulated since the last end marker.
    pending: String,
    /// Unscanned tail, possibly holding an incomplete marker.
    buf: String,
}

impl MarkerScanner {
    /// Create a scanner over the session descriptor.
    #[must_use]
    pub fn new(descriptor: ControlCodeDescriptor) -> Self {
        Self {
            descriptor,
            pending: String::new(),
            buf: String::new(),
        }
    }

    /// Message text accumulated but not yet terminated.
    #[must_use]
    pub fn pending(&self) -> &str {
        &self.pending
    }

    /// Drain the unterminated message text (e.g. on stream end).
    pub fn take_pending(&mut self) -> String {
        std::mem::take(&mut self.pending)
    }

    /// Feed one decrypted fragment, returning the events it completes.
    pub fn feed(&mut self, text: &str) -> Vec<ScanEvent> {
        self.buf.push_str(text);
        let mut events = Vec::new();

        loop {
            let Some(start) = self.buf.find(self.descriptor.marker_start()) else {
                // No marker ahead; everything is message text.
                self.pending.push_str(&self.buf);
                self.buf.clear();
                break;
            };

            let body_at = start + self.descriptor.marker_start().len();
            let Some(end_rel) = self.buf[body_at..].find(self.descriptor.marker_end()) else {
                // Opened but unclosed marker; hold it for the next fragment.
                self.pending.push_str(&self.buf[..start]);
                self.buf = self.buf.split_off(start);
                break;
            };
            let token_end = body_at + end_rel + self.descriptor.marker_end().len();

            self.pending.push_str(&self.buf[..start]);
            let token = &self.buf[start..token_end];
            match self.descriptor.validate_control_code(token) {
                Ok(TokenValidation::Recognized(ControlCode::End)) => {
                    events.push(ScanEvent::Message(std::mem::take(&mut self.pending)));
                }
                Ok(TokenValidation::Recognized(code)) => {
                    events.push(ScanEvent::Control(code));
                }
                Ok(TokenValidation::WrongKey | TokenValidation::UnknownCode) | Err(_) => {
                    // Not ours; keep the bracketed text verbatim.
                    self.pending.push_str(token);
                }
            }
            self.buf = self.buf.split_off(token_end);
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner() -> MarkerScanner {
        MarkerScanner::new(ControlCodeDescriptor::new())
    }

    fn end_marker(scanner: &MarkerScanner) -> String {
        scanner.descriptor.get_control_code(ControlCode::End).unwrap()
    }

    #[test]
    fn message_terminated_by_end_marker() {
        let mut scanner = scanner();
        let end = end_marker(&scanner);

        let events = scanner.feed(&format!("hello world{end}"));
        assert_eq!(events, vec![ScanEvent::Message("hello world".to_string())]);
        assert_eq!(scanner.pending(), "");
    }

    #[test]
    fn control_events_interleave_with_text() {
        let mut scanner = scanner();
        let end = end_marker(&scanner);
        let shutdown = scanner
            .descriptor
            .get_control_code(ControlCode::Shutdown)
            .unwrap();

        let events = scanner.feed(&format!("bye{end}{shutdown}"));
        assert_eq!(
            events,
            vec![
                ScanEvent::Message("bye".to_string()),
                ScanEvent::Control(ControlCode::Shutdown),
            ]
        );
    }

    #[test]
    fn foreign_tokens_stay_in_the_text() {
        let mut scanner = scanner();
        let end = end_marker(&scanner);
        let foreign = ControlCodeDescriptor::new()
            .get_control_code(ControlCode::Shutdown)
            .unwrap();

        let events = scanner.feed(&format!("see {foreign} here{end}"));
        assert_eq!(
            events,
            vec![ScanEvent::Message(format!("see {foreign} here"))]
        );
    }

    #[test]
    fn plain_brackets_stay_in_the_text() {
        let mut scanner = scanner();
        let end = end_marker(&scanner);

        let events = scanner.feed(&format!("a [note] b{end}"));
        assert_eq!(events, vec![ScanEvent::Message("a [note] b".to_string())]);
    }

    #[test]
    fn marker_split_across_fragments() {
        let mut scanner = scanner();
        let end = end_marker(&scanner);
        let (head, tail) = end.split_at(10);

        assert!(scanner.feed("part one ").is_empty());
        assert!(scanner.feed(head).is_empty());
        let events = scanner.feed(tail);
        assert_eq!(events, vec![ScanEvent::Message("part one ".to_string())]);
    }

    #[test]
    fn unterminated_text_is_drained_on_demand() {
        let mut scanner = scanner();
        assert!(scanner.feed("no marker yet").is_empty());
        assert_eq!(scanner.take_pending(), "no marker yet");
        assert_eq!(scanner.pending(), "");
    }

    #[test]
    fn multiple_messages_in_one_fragment() {
        let mut scanner = scanner();
        let end = end_marker(&scanner);

        let events = scanner.feed(&format!("one{end}two{end}"));
        assert_eq!(
            events,
            vec![
                ScanEvent::Message("one".to_string()),
                ScanEvent::Message("two".to_string()),
            ]
        );
    }
}

#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn arbitrary_fragmentation_preserves_messages(
            messages in proptest::collection::vec("[a-z ]{0,40}", 1..5),
            split_at in 1usize..200,
        ) {
            let descriptor = ControlCodeDescriptor::new();
            let end = descriptor.get_control_code(ControlCode::End).unwrap();

            let stream: String = messages
                .iter()
                .map(|m| format!("{m}{end}"))
                .collect();

            // Feed the stream in two arbitrary pieces.
            let cut = split_at.min(stream.len());
            let mut scanner = MarkerScanner::new(descriptor);
            let mut events = scanner.feed(&stream[..cut]);
            events.extend(scanner.feed(&stream[cut..]));

            let expected: Vec<ScanEvent> = messages
                .iter()
                .map(|m| ScanEvent::Message(m.clone()))
                .collect();
            prop_assert_eq!(events, expected);
            prop_assert_eq!(scanner.pending(), "");
        }
    }
}
