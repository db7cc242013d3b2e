// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Conversion between port tokens and the flat per-channel arrays a compiled
//! unit consumes and produces.

mod array;
mod buffers;
mod inputs;
mod outputs;
mod queues;
mod token;

pub use array::{ArrayElement, ArrayPayload};
pub use buffers::{ChannelRows, OutputRows, OutputShape, PortBuffer, PortOutput};
pub use inputs::read_inputs;
pub use outputs::{output_shapes, write_outputs};
pub use queues::TokenQueues;
pub use token::Token;
