// Copyright (c) 2023 Oasis Protocol Foundation

//! Tests for Oasis ledger app integration.
//!
//! Generic over [ledger_transport::Exchange] for reuse, with a
//! [mock::MockDevice] standing in for hardware.
//!

pub mod mock;


pub mod version;


pub mod sign;
