//! The duplex byte stream the engine runs on top of.
//!
//! Each instance represents one client connection. The implementations are
//! reference counted so that the receive loop and any number of [`Sender`]
//! clones can hold the same underlying stream. Reads and writes are guarded
//! by separate mutexes: concurrent reads and writes do not block each other,
//! while two concurrent writes are serialized so that no frame's bytes are
//! ever interleaved with another's on the wire.
//!
//! [`Sender`]: crate::connection::Sender

use std::fmt::Debug;
use std::io;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::LockResult;

pub(crate) fn unwrap_poison<T>(result: LockResult<T>) -> io::Result<T> {
  result.map_err(|_| io::Error::new(io::ErrorKind::Other, "Poisoned Mutex"))
}

/// A reference counted duplex stream for one connection.
///
/// The engine assumes exactly one logical reader at a time; writes may come
/// from any number of threads and are serialized internally.
pub trait ConnectionStream: ConnectionStreamRead + ConnectionStreamWrite {
  /// Creates another handle to the same underlying stream.
  fn new_ref(&self) -> Box<dyn ConnectionStream>;

  /// Address of the remote peer, if the transport has one.
  fn peer_addr(&self) -> io::Result<String>;
  /// Local address, if the transport has one.
  fn local_addr(&self) -> io::Result<String>;
}

/// Read half of a [`ConnectionStream`]. All methods take `&self`; the
/// implementation locks an internal read buffer.
pub trait ConnectionStreamRead: Sync + Send + Debug + Read {
  /// De-mut of `io::Read::read`.
  fn read(&self, buf: &mut [u8]) -> io::Result<usize>;

  /// De-mut of `io::Read::read_exact`.
  fn read_exact(&self, buf: &mut [u8]) -> io::Result<()>;

  /// Reads until `end` is seen (inclusive) or `limit` bytes were read.
  /// Returns the number of bytes appended to `buf`, 0 on EOF.
  fn read_until(&self, end: u8, limit: usize, buf: &mut Vec<u8>) -> io::Result<usize>;

  /// Upcast helper.
  fn as_stream_read(&self) -> &dyn ConnectionStreamRead;
}

/// Write half of a [`ConnectionStream`].
///
/// `write_all` is the single serialization point of the engine: a full
/// `write_all` call is atomic with respect to other writers of the same
/// stream.
pub trait ConnectionStreamWrite: Sync + Send + Debug + Write {
  /// De-mut of `io::Write::write_all`.
  fn write_all(&self, buf: &[u8]) -> io::Result<()>;

  /// De-mut of `io::Write::flush`.
  fn flush(&self) -> io::Result<()>;

  /// Creates another handle to the write half only.
  fn new_ref_stream_write(&self) -> Box<dyn ConnectionStreamWrite>;

  /// Upcast helper.
  fn as_stream_write(&self) -> &dyn ConnectionStreamWrite;
}

/// Conversion of transport sockets into a [`ConnectionStream`].
pub trait IntoConnectionStream {
  /// Consumes the transport and boxes it.
  fn into_connection_stream(self) -> Box<dyn ConnectionStream>;
}

impl IntoConnectionStream for TcpStream {
  fn into_connection_stream(self) -> Box<dyn ConnectionStream> {
    tcp::new(self)
  }
}

impl IntoConnectionStream for Box<dyn ConnectionStream> {
  fn into_connection_stream(self) -> Box<dyn ConnectionStream> {
    self
  }
}

impl IntoConnectionStream for (Box<dyn Read + Send>, Box<dyn Write + Send>) {
  fn into_connection_stream(self) -> Box<dyn ConnectionStream> {
    boxed::new(self.0, self.1)
  }
}

mod tcp {
  use crate::stream::{
    unwrap_poison, ConnectionStream, ConnectionStreamRead, ConnectionStreamWrite,
  };
  use std::fmt::Debug;
  use std::io;
  use std::io::{Read, Write};
  use std::net::TcpStream;
  use std::sync::{Arc, Mutex};
  use unowned_buf::{UnownedReadBuffer, UnownedWriteBuffer};

  pub fn new(stream: TcpStream) -> Box<dyn ConnectionStream> {
    Box::new(TcpStreamOuter(Arc::new(TcpStreamInner::new(stream))))
  }

  #[derive(Debug, Clone)]
  struct TcpStreamOuter(Arc<TcpStreamInner>);

  #[derive(Debug)]
  struct TcpStreamInner {
    read_mutex: Mutex<UnownedReadBuffer<0x4000>>,
    write_mutex: Mutex<UnownedWriteBuffer<0x4000>>,
    stream: TcpStream,
  }

  impl TcpStreamInner {
    fn new(stream: TcpStream) -> TcpStreamInner {
      TcpStreamInner {
        read_mutex: Mutex::new(UnownedReadBuffer::new()),
        write_mutex: Mutex::new(UnownedWriteBuffer::new()),
        stream,
      }
    }
  }

  impl Read for TcpStreamOuter {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
      ConnectionStreamRead::read(self, buf)
    }
  }

  impl ConnectionStreamRead for TcpStreamOuter {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
      unwrap_poison(self.0.read_mutex.lock())?.read(&mut &self.0.stream, buf)
    }

    fn read_exact(&self, buf: &mut [u8]) -> io::Result<()> {
      unwrap_poison(self.0.read_mutex.lock())?.read_exact(&mut &self.0.stream, buf)
    }

    fn read_until(&self, end: u8, limit: usize, buf: &mut Vec<u8>) -> io::Result<usize> {
      unwrap_poison(self.0.read_mutex.lock())?.read_until_limit(
        &mut &self.0.stream,
        end,
        limit,
        buf,
      )
    }

    fn as_stream_read(&self) -> &dyn ConnectionStreamRead {
      self
    }
  }

  impl ConnectionStreamWrite for TcpStreamOuter {
    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
      unwrap_poison(self.0.write_mutex.lock())?.write_all(&mut &self.0.stream, buf)
    }

    fn flush(&self) -> io::Result<()> {
      unwrap_poison(self.0.write_mutex.lock())?.flush(&mut &self.0.stream)
    }

    fn new_ref_stream_write(&self) -> Box<dyn ConnectionStreamWrite> {
      Box::new(self.clone()) as Box<dyn ConnectionStreamWrite>
    }

    fn as_stream_write(&self) -> &dyn ConnectionStreamWrite {
      self
    }
  }

  impl Write for TcpStreamOuter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
      ConnectionStreamWrite::write_all(self, buf)?;
      Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
      ConnectionStreamWrite::flush(self)
    }
  }

  impl ConnectionStream for TcpStreamOuter {
    fn new_ref(&self) -> Box<dyn ConnectionStream> {
      Box::new(self.clone()) as Box<dyn ConnectionStream>
    }

    fn peer_addr(&self) -> io::Result<String> {
      Ok(format!("{}", self.0.stream.peer_addr()?))
    }

    fn local_addr(&self) -> io::Result<String> {
      Ok(format!("{}", self.0.stream.local_addr()?))
    }
  }
}

mod boxed {
  use crate::stream::{
    unwrap_poison, ConnectionStream, ConnectionStreamRead, ConnectionStreamWrite,
  };
  use std::fmt::{Debug, Formatter};
  use std::io;
  use std::io::{BufWriter, Read, Write};
  use std::ops::DerefMut;
  use std::sync::{Arc, Mutex};
  use unowned_buf::UnownedReadBuffer;

  pub fn new(
    read: Box<dyn Read + Send>,
    write: Box<dyn Write + Send>,
  ) -> Box<dyn ConnectionStream> {
    Box::new(BoxStreamOuter(Arc::new(BoxStreamInner {
      read_mutex: Mutex::new((UnownedReadBuffer::default(), read)),
      write_mutex: Mutex::new(BufWriter::new(write)),
    }))) as Box<dyn ConnectionStream>
  }

  #[derive(Debug, Clone)]
  struct BoxStreamOuter(Arc<BoxStreamInner>);

  struct BoxStreamInner {
    read_mutex: Mutex<(UnownedReadBuffer<0x4000>, Box<dyn Read + Send>)>,
    write_mutex: Mutex<BufWriter<Box<dyn Write + Send>>>,
  }

  impl Debug for BoxStreamInner {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
      f.write_str("BoxStreamInner")
    }
  }

  impl ConnectionStreamRead for BoxStreamOuter {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
      let mut guard = unwrap_poison(self.0.read_mutex.lock())?;
      let (buffer, stream) = guard.deref_mut();
      buffer.read(stream, buf)
    }

    fn read_exact(&self, buf: &mut [u8]) -> io::Result<()> {
      let mut guard = unwrap_poison(self.0.read_mutex.lock())?;
      let (buffer, stream) = guard.deref_mut();
      buffer.read_exact(stream, buf)
    }

    fn read_until(&self, end: u8, limit: usize, buf: &mut Vec<u8>) -> io::Result<usize> {
      let mut guard = unwrap_poison(self.0.read_mutex.lock())?;
      let (buffer, stream) = guard.deref_mut();
      buffer.read_until_limit(stream, end, limit, buf)
    }

    fn as_stream_read(&self) -> &dyn ConnectionStreamRead {
      self
    }
  }

  impl Read for BoxStreamOuter {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
      ConnectionStreamRead::read(self, buf)
    }
  }

  impl ConnectionStreamWrite for BoxStreamOuter {
    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
      let mut guard = unwrap_poison(self.0.write_mutex.lock())?;
      guard.write_all(buf)?;
      // BufWriter would hold small frames back indefinitely.
      guard.flush()
    }

    fn flush(&self) -> io::Result<()> {
      unwrap_poison(self.0.write_mutex.lock())?.flush()
    }

    fn new_ref_stream_write(&self) -> Box<dyn ConnectionStreamWrite> {
      Box::new(self.clone()) as Box<dyn ConnectionStreamWrite>
    }

    fn as_stream_write(&self) -> &dyn ConnectionStreamWrite {
      self
    }
  }

  impl Write for BoxStreamOuter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
      ConnectionStreamWrite::write_all(self, buf)?;
      Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
      ConnectionStreamWrite::flush(self)
    }
  }

  impl ConnectionStream for BoxStreamOuter {
    fn new_ref(&self) -> Box<dyn ConnectionStream> {
      Box::new(self.clone()) as Box<dyn ConnectionStream>
    }

    fn peer_addr(&self) -> io::Result<String> {
      Ok("Box".to_string())
    }

    fn local_addr(&self) -> io::Result<String> {
      Ok("Box".to_string())
    }
  }
}
