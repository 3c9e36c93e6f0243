//! # Events Module
//!
//! Progress events emitted by the pipeline stages.
//!
//! Stages take an [`EventSender`]; the CLI turns the stream into
//! progress bars. Library callers that do not care pass [`null_sender`].
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Copy(CopyEvent::Progress(p)) = event {
//!             println!("Copied {}/{}", p.completed, p.total);
//!         }
//!     }
//! });
//!
//! reorganizer.run(&index, &output, &sender)?;
//! ```

mod channel;
mod types;

pub use channel::{EventChannel, EventReceiver, EventSender, null_sender};
pub use types::*;
