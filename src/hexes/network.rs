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

use hex_game::{HexError, Kind, Msg, MSG_SIZE};

use std::io::{Read, Write};
use std::net::TcpStream;

/// The agent's connection to the referee. All transfers are blocking and
/// frame-sized; the referee owns every deadline.
pub struct Network {
    stream: TcpStream
}

impl Network {
    pub fn connect(host: &str, port: &str) -> std::io::Result<Network> {
        let stream = TcpStream::connect((host, port.parse::<u16>().map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "bad port")
        })?))?;

        Ok(Network { stream })
    }

    pub fn send(&mut self, msg: &Msg) -> Result<(), HexError> {
        let buf = msg.serialise();

        self.stream.write_all(&buf).map_err(|_| HexError::Disconnect)
    }

    /// Receive one frame and decode it, checking its type against
    /// `expected`.
    pub fn recv(&mut self, expected: &[Kind]) -> Result<Msg, HexError> {
        let mut buf = [0; MSG_SIZE];

        self.stream.read_exact(&mut buf).map_err(|_| HexError::Disconnect)?;
        Msg::deserialise_expected(&buf, expected)
    }
}
