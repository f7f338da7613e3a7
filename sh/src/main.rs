//
// Copyright (c) 2024 Hemi Labs, Inc.
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use clap::Parser;

fn main() {
    env_logger::init();
    let args = minish::Args::parse();
    let status = minish::run(args);
    std::process::exit(status);
}
