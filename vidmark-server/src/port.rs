//! Loopback port allocation for the media server.
//!
//! Ports are picked at random from a range rather than asking the OS for an
//! ephemeral one, so the URL handed to the player stays in a predictable,
//! firewall-friendly window.

use log::debug;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{Ipv4Addr, SocketAddrV4, TcpListener};

use crate::error::SessionError;

pub const DEFAULT_PORT_LOW: u16 = 8000;
pub const DEFAULT_PORT_HIGH: u16 = 8999;
pub const DEFAULT_PORT_ATTEMPTS: u32 = 50;

const LISTEN_BACKLOG: i32 = 128;

/// Picks a free loopback port and hands back the bound listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortAllocator {
    low: u16,
    high: u16,
    max_attempts: u32,
}

impl Default for PortAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_PORT_LOW, DEFAULT_PORT_HIGH, DEFAULT_PORT_ATTEMPTS)
    }
}

impl PortAllocator {
    pub fn new(low: u16, high: u16, max_attempts: u32) -> Self {
        Self {
            low,
            high,
            max_attempts,
        }
    }

    pub fn range(&self) -> (u16, u16) {
        (self.low, self.high)
    }

    /// Bind a listener on `127.0.0.1` at a random port within the range.
    ///
    /// The returned listener is non-blocking and already listening, ready to
    /// be handed to tokio; nothing is served yet.
    pub fn allocate(&self) -> Result<(u16, TcpListener), SessionError> {
        let mut rng = fastrand::Rng::new();
        let (low, high) = (self.low, self.high);
        self.allocate_with(|| rng.u16(low..=high))
    }

    /// Same as [`allocate`](Self::allocate) with a caller-supplied candidate
    /// source. Candidates outside the range count as failed attempts.
    pub fn allocate_with<F>(&self, mut next_candidate: F) -> Result<(u16, TcpListener), SessionError>
    where
        F: FnMut() -> u16,
    {
        if self.low <= self.high {
            for attempt in 1..=self.max_attempts {
                let port = next_candidate();
                if !(self.low..=self.high).contains(&port) {
                    debug!("Candidate port {} outside {}-{}", port, self.low, self.high);
                    continue;
                }
                match bind_loopback(port) {
                    Ok(listener) => {
                        debug!("Bound 127.0.0.1:{} on attempt {}", port, attempt);
                        return Ok((port, listener));
                    }
                    Err(e) => {
                        debug!(
                            "Port {} unavailable (attempt {}/{}): {}",
                            port, attempt, self.max_attempts, e
                        );
                    }
                }
            }
        }

        Err(SessionError::NoPortAvailable {
            low: self.low,
            high: self.high,
            attempts: self.max_attempts,
        })
    }
}

fn bind_loopback(port: u16) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;

    // Lets a replaced server rebind a port whose old connections linger in
    // TIME_WAIT. A port with a live listener still fails to bind.
    #[cfg(unix)]
    socket.set_reuse_address(true)?;

    let addr = SocketAddrV4::new(Ipv4Addr::LOCALHOST, port);
    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;
    socket.set_nonblocking(true)?;

    Ok(socket.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occupied_ports(count: usize) -> Vec<TcpListener> {
        (0..count)
            .map(|_| TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap())
            .collect()
    }

    fn free_port() -> u16 {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        listener.local_addr().unwrap().port()
    }

    #[test]
    fn test_allocate_in_range() {
        let allocator = PortAllocator::default();
        let (port, listener) = allocator.allocate().unwrap();
        assert!((DEFAULT_PORT_LOW..=DEFAULT_PORT_HIGH).contains(&port));
        assert_eq!(listener.local_addr().unwrap().port(), port);
        assert!(listener.local_addr().unwrap().ip().is_loopback());
    }

    #[test]
    fn test_retries_past_occupied_ports() {
        let held = occupied_ports(3);
        let busy: Vec<u16> = held
            .iter()
            .map(|l| l.local_addr().unwrap().port())
            .collect();
        let free = free_port();

        let mut candidates = busy.clone();
        candidates.push(free);
        let mut candidates = candidates.into_iter();
        let mut tried = 0;

        let allocator = PortAllocator::new(1024, u16::MAX, 10);
        let (port, _listener) = allocator
            .allocate_with(|| {
                tried += 1;
                candidates.next().unwrap_or(free)
            })
            .unwrap();

        assert_eq!(port, free);
        assert_eq!(tried, busy.len() + 1);
        assert!(!busy.contains(&port));
    }

    #[test]
    fn test_exhausted_attempts() {
        let held = occupied_ports(1);
        let busy = held[0].local_addr().unwrap().port();

        let allocator = PortAllocator::new(1024, u16::MAX, 5);
        let result = allocator.allocate_with(|| busy);
        assert!(matches!(
            result,
            Err(SessionError::NoPortAvailable { attempts: 5, .. })
        ));
    }

    #[test]
    fn test_inverted_range() {
        let allocator = PortAllocator::new(9000, 8000, 50);
        let mut calls = 0;
        let result = allocator.allocate_with(|| {
            calls += 1;
            8500
        });
        assert!(matches!(result, Err(SessionError::NoPortAvailable { .. })));
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_out_of_range_candidates_are_rejected() {
        let allocator = PortAllocator::new(8000, 8010, 3);
        let result = allocator.allocate_with(|| 80);
        assert!(matches!(result, Err(SessionError::NoPortAvailable { .. })));
    }
}
