//! # Call Test Utilities
//!
//! Shared test utilities for the call-session crate.
//!
//! This crate provides mock implementations for driving a call session
//! end to end in tests without a real backend or media engine.
//!
//! ## Modules
//!
//! - `mock_token` - Scriptable [`call_session::backend::TokenFetcher`]
//! - `mock_transport` - Recording [`call_session::TransportEngine`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use call_test_utils::{MockTokenFetcher, MockTransportEngine};
//!
//! #[tokio::test(start_paused = true)]
//! async fn test_example() {
//!     let tokens = MockTokenFetcher::fixed("tok-abc");
//!     let transport = MockTransportEngine::accepting();
//!     let (event_tx, event_rx) = tokio::sync::mpsc::channel(16);
//!
//!     // Spawn the session with the mocks, then script room events
//!     // through event_tx and assert on transport.calls()...
//! }
//! ```

pub mod mock_token;
pub mod mock_transport;

pub use mock_token::{MockTokenFetcher, TokenScript};
pub use mock_transport::{MockTransportEngine, TransportCall};
