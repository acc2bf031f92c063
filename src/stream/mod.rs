//! Pull-style consumption of a streaming response.
//!
//! The push-style API is [`StreamHandler`](crate::StreamHandler). This
//! module wraps the same session in a [`futures::Stream`]:
//!
//! - [`StreamEvent`] - content, provider errors, the done sentinel, and the final summary
//! - [`ResponseStream`] - an async stream of events from one response
//! - [`CollectedResponse`] - a convenience type for collecting all response data
//!
//! # Example
//!
//! ```ignore
//! use futures::StreamExt;
//! use chatstream::stream::StreamEvent;
//!
//! let mut stream = client.send(&request).await?;
//!
//! while let Some(event) = stream.next().await {
//!     match event? {
//!         StreamEvent::Content(delta) => print!("{}", delta.text),
//!         StreamEvent::ProviderError(err) => eprintln!("provider: {}", err.message()),
//!         StreamEvent::Finished(summary) => println!("\n[{}]", summary.state),
//!         StreamEvent::Done => {}
//!     }
//! }
//! ```
//!
//! # Cancellation
//!
//! Dropping a [`ResponseStream`] cancels the session and aborts its task,
//! which drops the in-flight body read.

pub mod events;
pub mod response;

pub use events::StreamEvent;
pub use response::{CollectedResponse, ResponseStream};
