/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 t3 contributors
 */

mod copy;
pub use copy::{StreamCopy, StreamCopyConfig, StreamCopyError};

mod listen;
pub use listen::StreamListener;

mod stream;
pub use stream::{PeerStream, StreamReader, StreamWriter};
