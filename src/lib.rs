//! FriendCircle: interest circles from everyday conversation.
//!
//! A voice assistant posts live transcripts to a webhook. Transcript segments
//! are buffered per session and flushed in fixed-size batches; each batch is
//! classified into interest tags by an LLM, the tags are merged into the
//! user's record, and the raw batch is archived to content-addressed storage.
//! Users then meet in tag chat rooms carried over a pub/sub relay and can
//! export their archived conversations.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`db`]: SQLite initialization, schema, migrations, and health checks
//! - [`users`]: User records, the tag vocabulary, and store operations
//! - [`transcript`]: Webhook payloads, session batching, and the batch pipeline
//! - [`classifier`]: LLM-backed transcript tagging
//! - [`archive`]: Conversation upload and retrieval by CID
//! - [`chat`]: Tag rooms over a pub/sub relay
//! - [`api`]: HTTP router and handlers

pub mod api;
pub mod archive;
pub mod chat;
pub mod classifier;
pub mod config;
pub mod db;
pub mod transcript;
pub mod users;

#[cfg(test)]
mod test_stub;
