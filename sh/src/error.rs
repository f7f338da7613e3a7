//
// Copyright (c) 2024 Hemi Labs, Inc.
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use crate::parse::ParserError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Syntax(#[from] ParserError),
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

pub trait GetExitCode {
    fn get_exit_code(&self) -> i32;
}

impl GetExitCode for Result<i32> {
    fn get_exit_code(&self) -> i32 {
        match self {
            Ok(status) => *status,
            Err(Error::Syntax(_)) => 2,
            Err(Error::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => 127,
            Err(Error::Io { .. }) => 126,
        }
    }
}
