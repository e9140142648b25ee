//! Publish events.

use bytes::Bytes;

/// One publish event: the namespace it targets, an optional event label and
/// the payload body.
///
/// Fields are private; a `Message` cannot change once it has been built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    namespace: String,
    event: Option<String>,
    data: Bytes,
}

impl Message {
    /// Create a message without an event label.
    pub fn new(namespace: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            namespace: namespace.into(),
            event: None,
            data: data.into(),
        }
    }

    /// Attach an event label. An empty label is treated as no label.
    ///
    /// The label must fit on one `event:` line, so anything from the first
    /// `\r` or `\n` onwards is dropped.
    #[must_use]
    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        let mut event = event.into();
        if let Some(end) = event.find(['\r', '\n']) {
            event.truncate(end);
        }
        self.event = (!event.is_empty()).then_some(event);
        self
    }

    /// Namespace this message is published to.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Event label, if any.
    pub fn event(&self) -> Option<&str> {
        self.event.as_deref()
    }

    /// Payload body.
    pub fn data(&self) -> &Bytes {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_has_no_event() {
        let msg = Message::new("/foo", "yo");
        assert_eq!(msg.namespace(), "/foo");
        assert_eq!(msg.event(), None);
        assert_eq!(msg.data().as_ref(), b"yo");
    }

    #[test]
    fn with_event_sets_label() {
        let msg = Message::new("/foo", "yo").with_event("greeting");
        assert_eq!(msg.event(), Some("greeting"));
    }

    #[test]
    fn empty_event_is_none() {
        let msg = Message::new("/foo", "yo").with_event("");
        assert_eq!(msg.event(), None);
    }

    #[test]
    fn event_label_stops_at_line_break() {
        let msg = Message::new("/foo", "ok").with_event("x\ndata: injected");
        assert_eq!(msg.event(), Some("x"));

        let msg = Message::new("/foo", "ok").with_event("a\r\nb");
        assert_eq!(msg.event(), Some("a"));
    }

    #[test]
    fn event_label_starting_with_break_is_none() {
        let msg = Message::new("/foo", "ok").with_event("\rretry: 1");
        assert_eq!(msg.event(), None);
    }

    #[test]
    fn accepts_owned_bytes() {
        let msg = Message::new(String::from("/bar"), vec![1u8, 2, 3]);
        assert_eq!(msg.data().len(), 3);
    }
}
