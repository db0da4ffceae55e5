// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test harness for contact endpoint abuse simulation.
//!
//! Drives a [`contact_relay::ContactGate`] with generated traffic under a
//! paused tokio clock, so request pacing is simulated rather than slept.

pub mod attacks;
pub mod generators;
pub mod metrics;
