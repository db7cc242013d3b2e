// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

pub mod check;
pub mod clean;
pub mod inspect;
pub mod name;
