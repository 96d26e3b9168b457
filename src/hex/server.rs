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

use crate::args::Args;

use hex_game::{Board, HexError, Kind, Msg, Player, MSG_SIZE};
use hex_utils::config;

use std::ffi::CString;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::os::unix::io::AsRawFd;
use std::ptr;
use std::time::{Duration, Instant};

/// The referee's view of one agent process.
pub struct AgentState {
    pub player: Player,
    pub agent: String,
    pub uid: u32,
    pub logfile: String,

    /// How much wall-clock budget this agent has left before it forfeits.
    pub timer: Duration,

    pub stream: Option<TcpStream>
}

impl AgentState {
    pub fn new(player: Player, agent: String, uid: u32, game_secs: u32) -> AgentState {
        AgentState {
            player,
            agent,
            uid,
            logfile: "/dev/null".to_string(),
            timer: Duration::from_secs(game_secs as u64),
            stream: None
        }
    }
}

/// The final result of a match, one column group per agent.
pub struct Statistics {
    pub agent_1_won: bool,
    pub agent_1_rounds: u32,
    pub agent_1_secs: f32,
    pub agent_1_err: Option<HexError>,
    pub agent_2_won: bool,
    pub agent_2_rounds: u32,
    pub agent_2_secs: f32,
    pub agent_2_err: Option<HexError>
}

/// Returns the message kinds a player may legally send on `turn`. White
/// may answer black's opening with a swap, every other turn is a move.
fn expected_kinds(turn: usize) -> &'static [Kind] {
    if turn == 1 {
        &[Kind::Move, Kind::Swap]
    } else {
        &[Kind::Move]
    }
}

/// Returns the rounds played by each agent after `turns` turns.
fn rounds_played(turns: usize) -> (u32, u32) {
    (((turns + 1) / 2) as u32, (turns / 2) as u32)
}

/// Returns how much of its budget an agent consumed, in seconds.
fn consumed_secs(game_secs: u32, remaining: Duration) -> f32 {
    game_secs as f32 - remaining.as_secs_f32()
}

enum Readiness {
    Ready,
    Expired
}

/// Wait until `fd` is ready for `events`, or until `timeout` expires. A
/// timeout of `None` waits forever.
fn poll_fd(fd: i32, events: i16, timeout: Option<Duration>) -> Result<Readiness, HexError> {
    let mut pollfd = libc::pollfd { fd, events, revents: 0 };
    let timespec = timeout.map(|timeout| libc::timespec {
        tv_sec: timeout.as_secs() as libc::time_t,
        tv_nsec: timeout.subsec_nanos() as libc::c_long
    });
    let timespec_ptr = timespec
        .as_ref()
        .map(|t| t as *const libc::timespec)
        .unwrap_or(ptr::null());

    let res = unsafe { libc::ppoll(&mut pollfd, 1, timespec_ptr, ptr::null()) };

    match res {
        -1 => Err(HexError::Server),
        0 => Ok(Readiness::Expired),
        _ => Ok(Readiness::Ready)
    }
}

/// Send `msg` to `agent`, charging the transfer (including the wait for
/// socket readiness) against its remaining budget. With `force` the
/// transfer is unbounded and cannot forfeit the game.
pub fn send_msg(agent: &mut AgentState, msg: &Msg, force: bool) -> Result<(), HexError> {
    let buf = msg.serialise();
    let stream = agent.stream.as_mut().ok_or(HexError::Server)?;
    let fd = stream.as_raw_fd();

    let mut start = Instant::now();
    let mut sent = 0;

    while sent < MSG_SIZE {
        let timeout = if force { None } else { Some(agent.timer) };

        match poll_fd(fd, libc::POLLOUT, timeout)? {
            Readiness::Expired => {
                log::debug!("timeout when sending message to {}", agent.player);
                return Err(HexError::Timeout);
            },
            Readiness::Ready => {}
        }

        let curr = match stream.write(&buf[sent..]) {
            Ok(0) | Err(_) => return Err(HexError::Disconnect),
            Ok(curr) => curr
        };

        let now = Instant::now();
        agent.timer = agent.timer.saturating_sub(now - start);
        start = now;

        sent += curr;
    }

    Ok(())
}

/// Receive one frame from `agent`, charging the transfer against its
/// remaining budget, and decode it against the `expected` message kinds.
pub fn recv_msg(agent: &mut AgentState, expected: &[Kind]) -> Result<Msg, HexError> {
    let stream = agent.stream.as_mut().ok_or(HexError::Server)?;
    let fd = stream.as_raw_fd();

    let mut buf = [0; MSG_SIZE];
    let mut start = Instant::now();
    let mut received = 0;

    while received < MSG_SIZE {
        match poll_fd(fd, libc::POLLIN, Some(agent.timer))? {
            Readiness::Expired => {
                log::debug!("timeout while receiving message from {}", agent.player);
                return Err(HexError::Timeout);
            },
            Readiness::Ready => {}
        }

        let curr = match stream.read(&mut buf[received..]) {
            Ok(0) | Err(_) => return Err(HexError::Disconnect),
            Ok(curr) => curr
        };

        let now = Instant::now();
        agent.timer = agent.timer.saturating_sub(now - start);
        start = now;

        received += curr;
    }

    Msg::deserialise_expected(&buf, expected)
}

/// The referee: a listening socket both agents connect back to, plus the
/// bound address to hand them on their command line.
pub struct Server {
    listener: TcpListener,
    host: String,
    port: String
}

impl Server {
    /// Bind a listening socket on localhost at an OS-assigned port.
    pub fn new() -> Result<Server, HexError> {
        let listener = TcpListener::bind("localhost:0").map_err(|err| {
            log::error!("failed to bind server socket: {}", err);
            HexError::Server
        })?;
        let addr = listener.local_addr().map_err(|_| HexError::Server)?;

        let host = addr.ip().to_string();
        let port = addr.port().to_string();

        log::debug!("server socket is listening on {}:{}", host, port);

        Ok(Server { listener, host, port })
    }

    /// Fork and exec `agent` under its unprivileged uid and resource
    /// limits, then wait for it to connect back. On a timeout or error
    /// the child is killed and reaped, and the spawn fails.
    pub fn spawn_agent(&self, agent: &mut AgentState, args: &Args) -> Result<(), HexError> {
        let mut template = b"/tmp/hex-agent.XXXXXX\0".to_vec();
        let fd = unsafe { libc::mkstemp(template.as_mut_ptr() as *mut libc::c_char) };

        if fd != -1 {
            unsafe {
                libc::fchmod(fd, 0o666);
                libc::close(fd);
            }

            agent.logfile = String::from_utf8_lossy(&template[..template.len() - 1]).into_owned();
            log::debug!("created logfile '{}' for agent '{}'", agent.logfile, agent.agent);
        } else {
            log::debug!("failed to create logfile for agent '{}'", agent.agent);
            agent.logfile = "/dev/null".to_string();
        }

        // everything the child needs must be materialised before the
        // fork, since the child must not allocate
        let exe = CString::new(agent.agent.as_str()).map_err(|_| HexError::Server)?;
        let host = CString::new(self.host.as_str()).map_err(|_| HexError::Server)?;
        let port = CString::new(self.port.as_str()).map_err(|_| HexError::Server)?;
        let logfile = CString::new(agent.logfile.as_str()).map_err(|_| HexError::Server)?;
        let devnull = CString::new("/dev/null").map_err(|_| HexError::Server)?;
        let argv = [exe.as_ptr(), host.as_ptr(), port.as_ptr(), ptr::null()];
        let envp = [ptr::null()];

        let pid = unsafe { libc::fork() };

        if pid == 0 {
            unsafe {
                if libc::setuid(agent.uid as libc::uid_t) == -1 {
                    libc::_exit(1);
                }

                let mut limit = libc::rlimit {
                    rlim_cur: args.thread_limit as libc::rlim_t,
                    rlim_max: args.thread_limit as libc::rlim_t
                };
                libc::setrlimit(libc::RLIMIT_NPROC, &limit);

                limit.rlim_cur = (args.mem_limit_mib as libc::rlim_t) << 20;
                limit.rlim_max = limit.rlim_cur;
                libc::setrlimit(libc::RLIMIT_DATA, &limit);

                let null_fd = libc::open(devnull.as_ptr(), libc::O_RDONLY);
                if null_fd != -1 {
                    libc::dup2(null_fd, 0);
                }

                let log_fd = libc::open(
                    logfile.as_ptr(),
                    libc::O_WRONLY | libc::O_CREAT | libc::O_TRUNC,
                    0o666
                );
                if log_fd != -1 {
                    libc::dup2(log_fd, 1);
                    libc::dup2(log_fd, 2);
                }

                libc::execve(exe.as_ptr(), argv.as_ptr(), envp.as_ptr());
                libc::_exit(1);
            }
        } else if pid == -1 {
            log::error!("failed to fork agent process '{}'", agent.agent);
            return Err(HexError::Server);
        }

        log::debug!("spawned agent '{}' as process {}", agent.agent, pid);

        let accept_timeout = Duration::from_millis(*config::AGENT_ACCEPT_TIMEOUT_MS);

        match poll_fd(self.listener.as_raw_fd(), libc::POLLIN, Some(accept_timeout)) {
            Ok(Readiness::Ready) => {},
            Ok(Readiness::Expired) => {
                log::error!(
                    "{} ({}) timed out during accept period, assuming forfeit",
                    agent.player, agent.agent
                );
                return Err(self.kill_agent(pid));
            },
            Err(_) => return Err(self.kill_agent(pid))
        }

        match self.listener.accept() {
            Ok((stream, _)) => {
                agent.stream = Some(stream);
                Ok(())
            },
            Err(err) => {
                log::error!("failed to accept agent connection: {}", err);
                Err(self.kill_agent(pid))
            }
        }
    }

    fn kill_agent(&self, pid: libc::pid_t) -> HexError {
        unsafe {
            libc::kill(pid, libc::SIGKILL);

            let mut status = 0;
            libc::waitpid(pid, &mut status, 0);
        }

        HexError::Server
    }

    /// Reap every child, logging their exit codes.
    pub fn wait_all_agents(&self) {
        loop {
            let mut status = 0;
            let pid = unsafe { libc::wait(&mut status) };

            if pid <= 0 {
                break;
            }

            log::debug!(
                "child process '{}' returned code {}",
                pid,
                libc::WEXITSTATUS(status)
            );
        }
    }

    /// Mediate a full match on `board` between the two spawned agents,
    /// and return its statistics.
    pub fn run(
        &self,
        board: &mut Board,
        black: &mut AgentState,
        white: &mut AgentState,
        args: &Args
    ) -> Statistics
    {
        let start = |player| Msg::Start {
            player,
            board_size: args.board_dimensions,
            game_secs: args.game_secs,
            thread_limit: args.thread_limit,
            mem_limit_mib: args.mem_limit_mib
        };

        if let Err(err) = send_msg(black, &start(Player::Black), true) {
            return forfeit_statistics(args, black, white, Player::White, err);
        }
        if let Err(err) = send_msg(white, &start(Player::White), true) {
            return forfeit_statistics(args, black, white, Player::Black, err);
        }

        let mut turns = 0;
        let (err, winner) = loop {
            let result = play_round(board, turns, black, white);
            turns += 1;

            if let Err(out) = result {
                break out;
            }
        };

        let end = Msg::End { winner };
        let _ = send_msg(black, &end, true);
        let _ = send_msg(white, &end, true);

        let (agent_1_rounds, agent_2_rounds) = rounds_played(turns);

        Statistics {
            agent_1_won: winner == Player::Black,
            agent_1_rounds,
            agent_1_secs: consumed_secs(args.game_secs, black.timer),
            agent_1_err: if winner == Player::Black { None } else { Some(err) },
            agent_2_won: winner == Player::White,
            agent_2_rounds,
            agent_2_secs: consumed_secs(args.game_secs, white.timer),
            agent_2_err: if winner == Player::White { None } else { Some(err) }
        }
    }
}

/// Statistics for a match that never got past the `START` handshake.
fn forfeit_statistics(
    args: &Args,
    black: &AgentState,
    white: &AgentState,
    winner: Player,
    err: HexError
) -> Statistics
{
    Statistics {
        agent_1_won: winner == Player::Black,
        agent_1_rounds: 0,
        agent_1_secs: consumed_secs(args.game_secs, black.timer),
        agent_1_err: if winner == Player::Black { None } else { Some(err) },
        agent_2_won: winner == Player::White,
        agent_2_rounds: 0,
        agent_2_secs: consumed_secs(args.game_secs, white.timer),
        agent_2_err: if winner == Player::White { None } else { Some(err) }
    }
}

/// Play a single turn: receive from the side to move, apply it to the
/// authoritative board, and forward it to the other side. An `Err` carries
/// the error to report and the winner of the match.
fn play_round(
    board: &mut Board,
    turn: usize,
    black: &mut AgentState,
    white: &mut AgentState
) -> Result<(), (HexError, Player)>
{
    let (player, opponent) = if turn % 2 == 0 {
        (black, white)
    } else {
        (white, black)
    };

    log::debug!("turn {}, to play: {}, opponent: {}", turn, player.player, opponent.player);

    let msg = recv_msg(player, expected_kinds(turn))
        .map_err(|err| (err, opponent.player))?;

    match msg {
        Msg::Move { x, y } => {
            log::debug!("{} made move ({}, {})", player.player, x, y);

            if board.play(player.player, x, y).is_err() {
                return Err((HexError::BadMove, opponent.player));
            }

            if let Some(winner) = board.winner() {
                log::debug!("\n{}", board);
                return Err((HexError::GameOver, winner));
            }
        },
        Msg::Swap => {
            log::debug!("{} swapped the board", player.player);

            board.swap();
        },
        _ => return Err((HexError::BadMsg, opponent.player))
    }

    send_msg(opponent, &msg, false).map_err(|err| (err, player.player))?;

    log::debug!("\n{}", board);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::TcpListener;
    use std::thread;

    fn connected_agent(player: Player, game_secs: u32) -> (AgentState, TcpStream) {
        let listener = TcpListener::bind("localhost:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let peer = thread::spawn(move || TcpStream::connect(addr).unwrap());
        let (stream, _) = listener.accept().unwrap();

        let mut agent = AgentState::new(player, "./agent".to_string(), 1000, game_secs);
        agent.stream = Some(stream);

        (agent, peer.join().unwrap())
    }

    #[test]
    fn swap_is_expected_on_turn_one_only() {
        assert_eq!(expected_kinds(0), &[Kind::Move]);
        assert_eq!(expected_kinds(1), &[Kind::Move, Kind::Swap]);
        assert_eq!(expected_kinds(2), &[Kind::Move]);
        assert_eq!(expected_kinds(3), &[Kind::Move]);
    }

    #[test]
    fn rounds_split_by_parity() {
        assert_eq!(rounds_played(0), (0, 0));
        assert_eq!(rounds_played(1), (1, 0));
        assert_eq!(rounds_played(2), (1, 1));
        assert_eq!(rounds_played(5), (3, 2));
    }

    #[test]
    fn consumed_seconds() {
        assert_eq!(consumed_secs(300, Duration::from_secs(300)), 0.0);
        assert_eq!(consumed_secs(300, Duration::from_secs(120)), 180.0);
    }

    #[test]
    fn recv_reads_a_full_frame() {
        let (mut agent, mut peer) = connected_agent(Player::Black, 10);

        let writer = thread::spawn(move || {
            peer.write_all(&Msg::Move { x: 3, y: 4 }.serialise()).unwrap();
            peer
        });

        let msg = recv_msg(&mut agent, &[Kind::Move]).unwrap();
        assert_eq!(msg, Msg::Move { x: 3, y: 4 });
        assert!(agent.timer <= Duration::from_secs(10));

        writer.join().unwrap();
    }

    #[test]
    fn recv_rejects_unexpected_kind() {
        let (mut agent, mut peer) = connected_agent(Player::White, 10);

        let writer = thread::spawn(move || {
            peer.write_all(&Msg::Swap.serialise()).unwrap();
            peer
        });

        // swap is only legal on turn 1
        assert_eq!(recv_msg(&mut agent, expected_kinds(3)), Err(HexError::BadMsg));

        writer.join().unwrap();
    }

    #[test]
    fn recv_times_out_on_a_silent_peer() {
        let (mut agent, peer) = connected_agent(Player::Black, 0);
        agent.timer = Duration::from_millis(20);

        assert_eq!(recv_msg(&mut agent, &[Kind::Move]), Err(HexError::Timeout));

        drop(peer);
    }

    #[test]
    fn recv_reports_a_closed_connection() {
        let (mut agent, peer) = connected_agent(Player::Black, 10);

        drop(peer);

        assert_eq!(recv_msg(&mut agent, &[Kind::Move]), Err(HexError::Disconnect));
    }

    #[test]
    fn send_is_charged_against_the_timer() {
        let (mut agent, mut peer) = connected_agent(Player::White, 10);

        send_msg(&mut agent, &Msg::Swap, false).unwrap();
        assert!(agent.timer <= Duration::from_secs(10));

        let mut buf = [0; MSG_SIZE];
        peer.read_exact(&mut buf).unwrap();
        assert_eq!(Msg::deserialise(&buf), Ok(Msg::Swap));
    }
}
