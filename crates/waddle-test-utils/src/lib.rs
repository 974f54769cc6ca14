// SPDX-FileCopyrightText: 2026 Waddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Waddle integration tests.
//!
//! Provides scripted doubles for the two seams of the channel so pipeline
//! tests run fast, deterministic, and without external services.
//!
//! # Components
//!
//! - [`MockGateway`] - Scripted gateway with queryable rosters and captured
//!   outbound calls
//! - [`CaptureSink`] - Forward sink capturing delivered messages and removals

pub mod capture_sink;
pub mod mock_gateway;

pub use capture_sink::CaptureSink;
pub use mock_gateway::{MockGateway, ScriptedStatus};
