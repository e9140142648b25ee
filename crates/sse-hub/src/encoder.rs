//! Wire rendering for Server-Sent Events.
//!
//! A message becomes:
//!
//! ```text
//! event: <label>        (only when a label is present)
//! data: <line 1>
//! data: <line 2>
//!                       (blank terminator)
//! ```
//!
//! The payload is split on `\r\n`, `\n` and `\r`, so a multi-line body never
//! breaks the event framing. The result is a frozen [`Bytes`]; cloning it for
//! each recipient only bumps a reference count.

use bytes::{BufMut, Bytes, BytesMut};

use crate::message::Message;

const EVENT_FIELD: &[u8] = b"event: ";
const DATA_FIELD: &[u8] = b"data: ";

/// Render a message into its wire representation.
pub fn encode(msg: &Message) -> Bytes {
    let data = msg.data();
    let mut buf = BytesMut::with_capacity(estimate_len(msg));

    if let Some(event) = msg.event() {
        buf.put_slice(EVENT_FIELD);
        buf.put_slice(event.as_bytes());
        buf.put_u8(b'\n');
    }
    for line in Lines::new(data) {
        buf.put_slice(DATA_FIELD);
        buf.put_slice(line);
        buf.put_u8(b'\n');
    }
    buf.put_u8(b'\n');

    buf.freeze()
}

fn estimate_len(msg: &Message) -> usize {
    let event = msg.event().map_or(0, |e| EVENT_FIELD.len() + e.len() + 1);
    // One `data: ` header per line; assume a handful of lines.
    event + msg.data().len() + 4 * (DATA_FIELD.len() + 1) + 1
}

/// Iterator over payload lines, accepting any SSE line terminator.
struct Lines<'a> {
    rest: Option<&'a [u8]>,
}

impl<'a> Lines<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { rest: Some(data) }
    }
}

impl<'a> Iterator for Lines<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.rest?;
        match rest.iter().position(|&b| b == b'\n' || b == b'\r') {
            Some(i) => {
                let skip = if rest[i] == b'\r' && rest.get(i + 1) == Some(&b'\n') {
                    2
                } else {
                    1
                };
                self.rest = Some(&rest[i + skip..]);
                Some(&rest[..i])
            }
            None => {
                self.rest = None;
                Some(rest)
            }
        }
    }
}
