// Copyright 2025 the Banter Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Integration-style tests driven through deterministic metric services.

mod utils;

mod test_entities;
mod test_state;
