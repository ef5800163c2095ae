// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token decoding and persistence.

pub mod codec;
pub mod storage;
pub mod store;

pub use codec::TokenClaims;
pub use storage::{FileStorage, KeyValueStore, MemoryStorage};
pub use store::TokenStore;
