// Copyright 2025 the Banter Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Test helpers shared by the test modules.

mod env;

pub(crate) use env::TestEnv;
