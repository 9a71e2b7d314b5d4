//! Network I/O module
//!
//! This module implements the per-exchange UDP transport and the
//! broadcast discovery sweep.

pub mod discovery;
pub mod exchange;

pub use self::discovery::{search_printers, DiscoveryConfig};
pub use self::exchange::{send_request, Expectations, RequestOptions};
