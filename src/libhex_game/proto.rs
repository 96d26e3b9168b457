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

use crate::error::HexError;
use crate::player::Player;

use byteorder::{ReadBytesExt, WriteBytesExt, BE};

use std::io::Cursor;

/// The size of every frame on the wire, in bytes.
pub const MSG_SIZE: usize = 32;

/// The type tag of a frame.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Start = 0,
    Move = 1,
    Swap = 2,
    End = 3
}

/// A single message of the referee protocol. Frames are exactly
/// `MSG_SIZE` bytes: a big-endian `u32` type tag, the payload fields in
/// declaration order, and zero padding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Msg {
    Start {
        player: Player,
        board_size: u32,
        game_secs: u32,
        thread_limit: u32,
        mem_limit_mib: u32
    },
    Move {
        x: u32,
        y: u32
    },
    Swap,
    End {
        winner: Player
    }
}

impl Msg {
    pub fn kind(&self) -> Kind {
        match *self {
            Msg::Start { .. } => Kind::Start,
            Msg::Move { .. } => Kind::Move,
            Msg::Swap => Kind::Swap,
            Msg::End { .. } => Kind::End
        }
    }

    /// Returns the wire frame for this message. The buffer starts zeroed,
    /// so the padding never leaks anything.
    pub fn serialise(&self) -> [u8; MSG_SIZE] {
        let mut buf = [0; MSG_SIZE];

        {
            let mut cursor = Cursor::new(&mut buf[..]);

            cursor.write_u32::<BE>(self.kind() as u32).unwrap();

            match *self {
                Msg::Start { player, board_size, game_secs, thread_limit, mem_limit_mib } => {
                    cursor.write_u32::<BE>(player as u32).unwrap();
                    cursor.write_u32::<BE>(board_size).unwrap();
                    cursor.write_u32::<BE>(game_secs).unwrap();
                    cursor.write_u32::<BE>(thread_limit).unwrap();
                    cursor.write_u32::<BE>(mem_limit_mib).unwrap();
                },
                Msg::Move { x, y } => {
                    cursor.write_u32::<BE>(x).unwrap();
                    cursor.write_u32::<BE>(y).unwrap();
                },
                Msg::Swap => {},
                Msg::End { winner } => {
                    cursor.write_u32::<BE>(winner as u32).unwrap();
                }
            }
        }

        buf
    }

    /// Decode a wire frame.
    pub fn deserialise(buf: &[u8; MSG_SIZE]) -> Result<Msg, HexError> {
        let mut cursor = Cursor::new(&buf[..]);
        let kind = cursor.read_u32::<BE>().map_err(|_| HexError::BadMsg)?;

        match kind {
            0 => {
                let player = cursor.read_u32::<BE>().map_err(|_| HexError::BadMsg)?;
                let player = Player::from_wire(player).ok_or(HexError::BadMsg)?;
                let board_size = cursor.read_u32::<BE>().map_err(|_| HexError::BadMsg)?;
                let game_secs = cursor.read_u32::<BE>().map_err(|_| HexError::BadMsg)?;
                let thread_limit = cursor.read_u32::<BE>().map_err(|_| HexError::BadMsg)?;
                let mem_limit_mib = cursor.read_u32::<BE>().map_err(|_| HexError::BadMsg)?;

                Ok(Msg::Start { player, board_size, game_secs, thread_limit, mem_limit_mib })
            },
            1 => {
                let x = cursor.read_u32::<BE>().map_err(|_| HexError::BadMsg)?;
                let y = cursor.read_u32::<BE>().map_err(|_| HexError::BadMsg)?;

                Ok(Msg::Move { x, y })
            },
            2 => Ok(Msg::Swap),
            3 => {
                let winner = cursor.read_u32::<BE>().map_err(|_| HexError::BadMsg)?;
                let winner = Player::from_wire(winner).ok_or(HexError::BadMsg)?;

                Ok(Msg::End { winner })
            },
            _ => Err(HexError::BadMsg)
        }
    }

    /// Decode a wire frame and check its type against the caller's
    /// expected set. A frame that decodes but is not expected on this turn
    /// is a protocol violation.
    pub fn deserialise_expected(buf: &[u8; MSG_SIZE], expected: &[Kind]) -> Result<Msg, HexError> {
        let msg = Msg::deserialise(buf)?;

        if expected.contains(&msg.kind()) {
            Ok(msg)
        } else {
            Err(HexError::BadMsg)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_round_trip() {
        let msg = Msg::Start {
            player: Player::White,
            board_size: 11,
            game_secs: 300,
            thread_limit: 4,
            mem_limit_mib: 1024
        };
        let buf = msg.serialise();

        assert_eq!(&buf[..8], &[0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(Msg::deserialise(&buf), Ok(msg));
    }

    #[test]
    fn move_round_trip() {
        let msg = Msg::Move { x: 5, y: 7 };
        let buf = msg.serialise();

        assert_eq!(Msg::deserialise(&buf), Ok(msg));

        // the unused tail is zero
        assert!(buf[12..].iter().all(|&b| b == 0));
    }

    #[test]
    fn swap_round_trip() {
        let buf = Msg::Swap.serialise();

        assert_eq!(&buf[..4], &[0, 0, 0, 2]);
        assert!(buf[4..].iter().all(|&b| b == 0));
        assert_eq!(Msg::deserialise(&buf), Ok(Msg::Swap));
    }

    #[test]
    fn end_round_trip() {
        let msg = Msg::End { winner: Player::Black };
        let buf = msg.serialise();

        assert_eq!(Msg::deserialise(&buf), Ok(msg));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let mut buf = [0; MSG_SIZE];
        buf[3] = 4;

        assert_eq!(Msg::deserialise(&buf), Err(HexError::BadMsg));
    }

    #[test]
    fn bad_player_is_rejected() {
        let mut buf = Msg::End { winner: Player::White }.serialise();
        buf[7] = 9;

        assert_eq!(Msg::deserialise(&buf), Err(HexError::BadMsg));
    }

    #[test]
    fn unexpected_type_is_rejected() {
        let buf = Msg::Swap.serialise();

        assert_eq!(
            Msg::deserialise_expected(&buf, &[Kind::Move]),
            Err(HexError::BadMsg)
        );
        assert_eq!(
            Msg::deserialise_expected(&buf, &[Kind::Move, Kind::Swap]),
            Ok(Msg::Swap)
        );
    }
}
