// Copyright 2021 Karl Sundequist Blomdahl <karl.sundequist.blomdahl@gmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use thiserror::Error;

/// Every way a protocol or board operation can end a match. The referee
/// converts `GameOver` into a win for the reporting side; every other
/// variant is a forfeit by the side that caused it, except `Server` which
/// terminates the referee itself.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum HexError {
    #[error("a move completed a winning chain")]
    GameOver,

    #[error("wall-clock budget exhausted during send or receive")]
    Timeout,

    #[error("move targets an occupied or out-of-bounds cell")]
    BadMove,

    #[error("frame could not be decoded, or carried an unexpected type")]
    BadMsg,

    #[error("connection closed by peer")]
    Disconnect,

    #[error("local system error")]
    Server
}

impl HexError {
    /// The stable identifier of this error as it appears in the result
    /// record.
    pub fn code(self) -> &'static str {
        match self {
            HexError::GameOver => "GAME_OVER",
            HexError::Timeout => "TIMEOUT",
            HexError::BadMove => "BAD_MOVE",
            HexError::BadMsg => "BAD_MSG",
            HexError::Disconnect => "DISCONNECT",
            HexError::Server => "SERVER"
        }
    }

    /// The result record identifier for an optional error, where the
    /// absence of an error reads `OK`.
    pub fn code_of(err: Option<HexError>) -> &'static str {
        err.map(|e| e.code()).unwrap_or("OK")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes() {
        assert_eq!(HexError::code_of(None), "OK");
        assert_eq!(HexError::code_of(Some(HexError::GameOver)), "GAME_OVER");
        assert_eq!(HexError::code_of(Some(HexError::Timeout)), "TIMEOUT");
        assert_eq!(HexError::code_of(Some(HexError::BadMove)), "BAD_MOVE");
        assert_eq!(HexError::code_of(Some(HexError::BadMsg)), "BAD_MSG");
        assert_eq!(HexError::code_of(Some(HexError::Disconnect)), "DISCONNECT");
        assert_eq!(HexError::code_of(Some(HexError::Server)), "SERVER");
    }
}
