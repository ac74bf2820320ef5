//! Voice-assistant transcript intake.
//!
//! Payloads posted to the webhook land in [`buffer::SessionBuffer`], which
//! slices each session into fixed-size [`buffer::Batch`]es. Each batch goes
//! through [`pipeline::Pipeline`]: classify into tags, merge the tags into the
//! user record, and archive the raw segments. [`recent::RecentWebhooks`] keeps
//! the last raw payloads around for the live-transcript view.

pub mod buffer;
pub mod pipeline;
pub mod recent;
pub mod types;
