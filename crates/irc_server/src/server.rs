//! Single-threaded readiness-driven event loop (spec §4.G, §5).
//!
//! This is the only module that owns real sockets. `Session` and `Registry`
//! are transport-agnostic; this loop bridges them to `mio` by keying a
//! parallel `connections` map and `framers` map on the same `SessionId` the
//! registry uses.
//!
//! mio's epoll backend is edge-triggered, so every readable event is
//! drained in a loop until `WouldBlock` — missing this would stall a
//! connection until it produces more traffic.

use std::collections::HashMap;
use std::io::{self, ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::time::Duration;

use log::{debug, error, info, trace, warn};
use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token};
use socket2::{Domain, Socket, Type};

use crate::config::Config;
use crate::constants::{
    IDLE_PING_THRESHOLD_SECS, LISTEN_BACKLOG, PING_TIMEOUT_SECS, PING_TOKEN, POLL_TIMEOUT_SECS,
    READ_CHUNK_SIZE,
};
use crate::dispatcher::{dispatch, PostDispatch};
use crate::errors::ServerError;
use crate::framer::LineFramer;
use crate::registry::Registry;
use crate::replies::{server_line, Replies};
use crate::session::{Session, SessionId};

const LISTENER_TOKEN: Token = Token(0);

/// Binds an IPv6 socket with `IPV6_V6ONLY` cleared so v4 and v6 clients
/// share one listener (spec §6), and an explicit `listen` backlog — neither
/// knob is reachable through `std::net::TcpListener::bind` alone.
fn bind_dual_stack(port: u16, backlog: u32) -> io::Result<StdTcpListener> {
    let socket = Socket::new(Domain::IPV6, Type::STREAM, None)?;
    socket.set_only_v6(false)?;
    let addr: SocketAddr = format!("[::]:{port}").parse().expect("valid socket addr");
    socket.bind(&addr.into())?;
    socket.listen(backlog as i32)?;
    socket.set_nonblocking(true)?;
    Ok(socket.into())
}

pub struct Server {
    poll: Poll,
    listener: TcpListener,
    config: Config,
    registry: Registry,
    connections: HashMap<SessionId, TcpStream>,
    framers: HashMap<SessionId, LineFramer>,
    next_id: SessionId,
}

impl Server {
    pub fn new(config: Config) -> Result<Self, ServerError> {
        let addr_desc = format!("[::]:{}", config.network.port);
        let std_listener =
            bind_dual_stack(config.network.port, LISTEN_BACKLOG).map_err(|source| {
                ServerError::Bind {
                    addr: addr_desc.clone(),
                    source,
                }
            })?;
        let mut listener = TcpListener::from_std(std_listener);

        let poll = Poll::new()?;
        poll.registry()
            .register(&mut listener, LISTENER_TOKEN, Interest::READABLE)?;

        info!("listening on {addr_desc}");

        Ok(Server {
            poll,
            listener,
            config,
            registry: Registry::new(),
            connections: HashMap::new(),
            framers: HashMap::new(),
            next_id: 1,
        })
    }

    /// Runs forever. Returns only on an unrecoverable poll error; per-session
    /// faults never unwind past this loop (spec §7).
    pub fn run(&mut self) -> Result<(), ServerError> {
        let mut events = Events::with_capacity(1024);
        let timeout = Duration::from_secs(POLL_TIMEOUT_SECS);

        loop {
            match self.poll.poll(&mut events, Some(timeout)) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }

            for event in events.iter() {
                if event.token() == LISTENER_TOKEN {
                    self.accept_all();
                    continue;
                }
                let id = event.token().0;
                if event.is_readable() {
                    self.handle_readable(id);
                }
                if event.is_writable() {
                    self.flush_session(id);
                }
            }

            self.sweep_liveness();
        }
    }

    fn accept_all(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((mut stream, addr)) => {
                    let id = self.next_id;
                    self.next_id += 1;
                    let token = Token(id);
                    if let Err(e) = self.poll.registry().register(
                        &mut stream,
                        token,
                        Interest::READABLE | Interest::WRITABLE,
                    ) {
                        warn!("failed to register connection {id}: {e}");
                        continue;
                    }
                    let now = self.registry.now();
                    let session = Session::new(id, addr.ip().to_string(), addr.port(), now);
                    self.registry.attach(session);
                    self.connections.insert(id, stream);
                    self.framers.insert(id, LineFramer::new());
                    info!("accepted connection {id} from {addr}");
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    error!("accept failed: {e}");
                    break;
                }
            }
        }
    }

    fn handle_readable(&mut self, id: SessionId) {
        let mut buf = [0u8; READ_CHUNK_SIZE];
        loop {
            let read_result = match self.connections.get_mut(&id) {
                Some(stream) => stream.read(&mut buf),
                None => return,
            };
            match read_result {
                Ok(0) => {
                    self.close_session(id, "Client connection closed.");
                    return;
                }
                Ok(n) => {
                    let feed_result = self
                        .framers
                        .get_mut(&id)
                        .expect("framer present for a live connection")
                        .feed(&buf[..n]);

                    let lines = match feed_result {
                        Ok(lines) => lines,
                        Err(_) => {
                            self.reject_encoding_error(id);
                            return;
                        }
                    };

                    for line in lines {
                        debug!("session {id} << {line}");
                        let outcome = dispatch(&mut self.registry, &self.config, id, &line);
                        if let PostDispatch::Close(reason) = outcome {
                            self.flush_session(id);
                            info!("session {id} closing: {reason}");
                            self.close_transport_only(id);
                            return;
                        }
                        // mio's writable readiness is edge-triggered and was
                        // already consumed on accept; a handler's replies
                        // must be flushed here rather than waiting on a
                        // writable event that will never re-fire.
                        self.flush_session(id);
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(_) => {
                    self.close_session(id, "transport error");
                    return;
                }
            }
        }
    }

    /// Spec §4.A/§7.2: non-UTF-8 input gets a 451 reply, then the connection
    /// is closed. The registry has not necessarily seen a nickname yet.
    fn reject_encoding_error(&mut self, id: SessionId) {
        let nick = self
            .registry
            .session(id)
            .and_then(|s| s.nick.clone())
            .unwrap_or_default();
        let r = Replies::new(&self.config.server.name);
        if let Some(session) = self.registry.session_mut(id) {
            session.enqueue(r.err_not_registered(&nick));
        }
        self.flush_session(id);
        self.close_session(id, "invalid UTF-8");
    }

    fn flush_session(&mut self, id: SessionId) {
        let data = match self.registry.session_mut(id) {
            Some(session) if session.has_pending_writes() => session.drain_outbox(),
            _ => return,
        };
        let stream = match self.connections.get_mut(&id) {
            Some(s) => s,
            None => return,
        };
        match stream.write_all(data.as_bytes()) {
            Ok(()) => {
                for line in data.split_terminator("\r\n") {
                    trace!("session {id} >> {line}");
                }
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                if let Some(session) = self.registry.session_mut(id) {
                    session.enqueue(data);
                }
            }
            Err(_) => self.close_session(id, "transport error"),
        }
    }

    fn sweep_liveness(&mut self) {
        let now = self.registry.now();
        let mut to_ping = Vec::new();
        let mut to_timeout = Vec::new();

        for session in self.registry.sessions() {
            if !session.ping_pending
                && now.duration_since(session.last_activity).as_secs() > IDLE_PING_THRESHOLD_SECS
            {
                to_ping.push(session.id);
            } else if session.ping_pending
                && now.duration_since(session.last_ping_sent).as_secs() > PING_TIMEOUT_SECS
            {
                to_timeout.push(session.id);
            }
        }

        for id in to_ping {
            let line = server_line(&self.config.server.name, &format!("PING :{PING_TOKEN}"));
            if let Some(session) = self.registry.session_mut(id) {
                session.enqueue(line);
                session.ping_pending = true;
                session.last_ping_sent = now;
            }
            self.flush_session(id);
        }

        for id in to_timeout {
            self.close_session(id, "ping timeout");
        }
    }

    /// Full teardown: deregisters and drops the transport, then cascades
    /// through the registry (spec §4.E detach).
    fn close_session(&mut self, id: SessionId, reason: &str) {
        info!("session {id} detached: {reason}");
        self.close_transport_only(id);
        self.registry.detach(id);
    }

    /// Transport-only teardown, for paths where the registry side has
    /// already been handled by the dispatcher (QUIT).
    fn close_transport_only(&mut self, id: SessionId) {
        if let Some(mut stream) = self.connections.remove(&id) {
            let _ = self.poll.registry().deregister(&mut stream);
        }
        self.framers.remove(&id);
    }
}
