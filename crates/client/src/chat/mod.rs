//! Streaming chat consumption.
//!
//! The `/api/chat/stream` endpoint answers with a chunked body of
//! newline-separated records. Lines starting with `data: ` carry one JSON
//! [`ChatEvent`]; everything else is ignored.
//!
//! # Example
//!
//! ```rust,ignore
//! use jalapeno_client::{ChatSession, JalapenoClient};
//!
//! let mut session = ChatSession::new();
//! let request = session.begin_turn("5 lb of chicken breast and a dozen eggs");
//! let end = client.chat_stream_into(&request, &mut session).await?;
//! session.end_turn(&end);
//!
//! println!("{}", session.reply());
//! println!("{} lines in cart", session.cart().len());
//! ```

mod events;
mod handler;
mod parser;
mod session;
mod stream;

pub use events::{ChatEvent, StreamEnd};
pub use handler::ChatHandler;
pub use parser::ChatStreamParser;
pub use session::{ChatSession, Outcome};
pub use stream::{consume_stream, parse_event_stream};

pub(crate) use stream::dispatch_events;
