//! A minimal TCP accept loop: bind, upgrade each accepted socket, hand the
//! WebSocket connection to a handler on its own thread.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::mpsc::{self, Receiver, SendError, SyncSender};
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;

use crate::connection::Connection;
use crate::error::WsError;
use crate::handshake::{handshake, rejection_response};
use crate::http::request::Request;
use crate::{error_log, info_log, trace_log, warn_log};

/// A function able to handle upgraded WebSocket connections.
pub trait ConnectionHandler: Fn(Connection) + Send + Sync + 'static {}
impl<T> ConnectionHandler for T where T: Fn(Connection) + Send + Sync + 'static {}

/// Handle to the accept loop.
pub struct App {
  main_thread: JoinHandle<()>,
  addr: SocketAddr,
  shutdown: SyncSender<()>,
  error_rx: Option<Receiver<AppError>>,
  done_rx: Option<Receiver<()>>,
}

impl App {
  /// Binds the listener and starts accepting. Each accepted socket gets its
  /// own thread which performs the upgrade handshake and, on success, calls
  /// the handler with a server role [`Connection`]. Rejected upgrades are
  /// answered with the matching HTTP error response before the socket is
  /// dropped.
  pub fn new<H: ConnectionHandler>(
    addr: impl ToSocketAddrs,
    handler: H,
  ) -> Result<Self, io::Error> {
    let (shutdown_tx, shutdown_rx) = mpsc::sync_channel(1);
    let (done_tx, done_rx) = mpsc::sync_channel(1);
    let (error_tx, error_rx) = mpsc::sync_channel(1024);

    let tcp_listener = TcpListener::bind(addr)?;
    let addr = unspecified_socket_to_loopback(tcp_listener.local_addr()?);
    info_log!("tcp_app: listening on {}", addr);

    let handler = Arc::new(handler);
    let main_thread = thread::spawn(move || {
      let mut threads: Vec<JoinHandle<()>> = Vec::new();
      for stream in tcp_listener.incoming() {
        if shutdown_rx.try_recv().is_ok() {
          info_log!("tcp_app: shutdown received, leaving the accept loop");
          break;
        }
        let handler = Arc::clone(&handler);
        let error_tx = error_tx.clone();
        threads.push(thread::spawn(move || {
          let run = || {
            serve(stream?, handler.as_ref())?;
            Ok::<(), AppError>(())
          };

          if let Err(e) = run() {
            error_log!("tcp_app: {:?} occurred", &e);
            if let Err(e) = error_tx.try_send(e) {
              warn_log!("tcp_app: unable to report error to the receiver, due to {}", e);
            }
          }
        }));

        threads.retain(|handle| !handle.is_finished());
      }

      for t in threads {
        if let Err(e) = t.join() {
          warn_log!("tcp_app: {:?} while joining a connection thread", e);
        }
      }

      if let Err(e) = done_tx.try_send(()) {
        warn_log!("tcp_app: unable to report done, due to {}", e);
      }
    });

    Ok(Self {
      addr,
      shutdown: shutdown_tx,
      error_rx: Some(error_rx),
      main_thread,
      done_rx: Some(done_rx),
    })
  }

  /// The bound local address.
  pub fn addr(&self) -> SocketAddr {
    self.addr
  }

  /// Requests a shutdown and waits for all connection threads to finish.
  pub fn shutdown(self) -> Result<(), AppError> {
    info_log!("tcp_app: initiating shutdown");
    self.shutdown.send(())?;
    // The accept loop only notices the flag on its next connection.
    TcpStream::connect(self.addr)?;
    if self.main_thread.join().is_err() {
      error_log!("tcp_app: main thread panicked");
      return Err(AppError::MainThreadFailure);
    }
    Ok(())
  }

  /// Receiver for connection errors, capped at 1024.
  pub fn error_receiver(&mut self) -> Option<Receiver<AppError>> {
    self.error_rx.take()
  }

  /// Receiver that fires once a `shutdown` call has completed.
  pub fn done_receiver(&mut self) -> Option<Receiver<()>> {
    self.done_rx.take()
  }

  /// Blocks forever, as nothing else can call `shutdown`. Returns
  /// immediately if the done receiver was already taken.
  pub fn run(self) {
    if let Some(done) = self.done_rx {
      let _ = done.recv();
    }
  }
}

/// Upgrades one accepted socket and runs the handler over it.
fn serve(stream: TcpStream, handler: &dyn Fn(Connection)) -> Result<(), AppError> {
  let mut connection = Connection::server(stream);

  let request = match connection.receive::<Request>()? {
    Some(request) => request,
    None => return Ok(()), // connected and went away without a request
  };

  match handshake(&request) {
    Ok(response) => {
      trace_log!("tcp_app: upgrading {}", request.path);
      connection.send(&response)?;
      handler(connection);
      Ok(())
    }
    Err(e) => {
      warn_log!("tcp_app: rejecting upgrade of {}: {}", request.path, e);
      connection.send(&rejection_response(&e))?;
      Err(AppError::Ws(WsError::Handshake(e)))
    }
  }
}

/// A socket bound to an unspecified address is reachable via loopback; the
/// shutdown wake-up connect needs a routable form of it.
fn unspecified_socket_to_loopback(mut addr: SocketAddr) -> SocketAddr {
  if addr.ip().is_unspecified() {
    match addr.ip() {
      IpAddr::V4(_) => addr.set_ip(IpAddr::V4(Ipv4Addr::LOCALHOST)),
      IpAddr::V6(_) => addr.set_ip(IpAddr::V6(Ipv6Addr::LOCALHOST)),
    }
  }
  addr
}

/// Errors of this app. Programs that need more control than this should
/// write their own accept loop against the engine directly.
#[derive(Debug)]
#[non_exhaustive]
pub enum AppError {
  /// The accept loop thread crashed or panicked.
  MainThreadFailure,
  /// TCP level problem.
  IO(io::Error),
  /// Error from the engine while serving a connection.
  Ws(WsError),
}

impl From<SendError<()>> for AppError {
  fn from(_: SendError<()>) -> Self {
    AppError::MainThreadFailure
  }
}

impl From<io::Error> for AppError {
  fn from(err: io::Error) -> Self {
    AppError::IO(err)
  }
}

impl From<WsError> for AppError {
  fn from(err: WsError) -> Self {
    AppError::Ws(err)
  }
}
