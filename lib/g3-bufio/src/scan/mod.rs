/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod delim;
pub use delim::{ReadDelim, ReadStringDelim, read_delim, read_string_delim};

mod lines;
pub use lines::{Lines, read_lines};
