//! Unified chat-completion adapter over independently designed LLM vendor APIs.
//!
//! One request shape in, one response shape out, whether the vendor streams
//! or not. The crate is organized around three seams:
//!
//! - [`registry`] maps a model identifier to its vendor family (a tagged
//!   variant, not a list scan per call) and carries the static per-model
//!   output-token ceilings.
//! - [`Client`] is the dispatch core: it resolves the family, clamps the
//!   temperature to the family's accepted range, fills in vendor-mandatory
//!   fields, and routes the call through the family's provider. Providers
//!   translate between the unified schema and the vendor wire format at the
//!   transport boundary; nothing downstream ever probes a vendor object for
//!   optional attributes.
//! - [`StreamAccumulator`] reassembles complete assistant turns, including
//!   tool calls whose arguments arrive as string fragments spread across
//!   many chunks.
//!
//! Every call is stateless given the full conversation as input; the adapter
//! never retains state across calls. All vendor failures are mapped to
//! [`LlmError`] at the dispatch boundary, so callers never branch on vendor
//! identity.

mod accumulator;
mod client;
mod error;
pub mod messages;
pub mod provider;
pub mod registry;

pub use accumulator::StreamAccumulator;
pub use client::Client;
pub use error::{LlmError, LlmResult as Result};
