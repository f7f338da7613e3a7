//
// Copyright (c) 2024 Hemi Labs, Inc.
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

pub mod builtin;
pub mod cli;
pub mod error;
pub mod parse;
pub mod shell;
mod utils;
pub mod wordexp;

pub use cli::{run, Args};
