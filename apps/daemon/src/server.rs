//! TCP 行协议服务
//!
//! 每个连接：读取一行（≤ 256 字节，`\n` 或 EOF 结束）→ 分发 → 写回一行 → 关闭。
//! 连接按顺序逐个处理；PWM 保持命令会阻塞整个接受循环。

use rover_command::Dispatcher;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// 单次请求的最大字节数（含换行）
pub const MAX_REQUEST_LEN: usize = 256;

/// 服务统计
#[derive(Debug, Default)]
pub struct ServerStats {
    pub connections: AtomicU64,
    pub failed_replies: AtomicU64,
    pub io_errors: AtomicU64,
}

pub struct Server {
    listener: TcpListener,
    read_timeout: Duration,
    idle_sleep: Duration,
    stats: ServerStats,
}

impl Server {
    /// 绑定监听地址（非阻塞接受，以便轮询退出标志）
    pub fn bind(
        addr: impl ToSocketAddrs,
        read_timeout: Duration,
        idle_sleep: Duration,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        Ok(Self {
            listener,
            read_timeout,
            idle_sleep,
            stats: ServerStats::default(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }

    /// 接受循环，`running` 变为 false 后返回
    pub fn run(&self, dispatcher: &Dispatcher, running: &AtomicBool) -> io::Result<()> {
        if let Ok(addr) = self.local_addr() {
            info!("Listening on {}", addr);
        }

        while running.load(Ordering::Acquire) {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    self.stats.connections.fetch_add(1, Ordering::Relaxed);
                    trace!("Connection from {}", peer);
                    if let Err(e) = self.handle_connection(stream, dispatcher) {
                        self.stats.io_errors.fetch_add(1, Ordering::Relaxed);
                        warn!("Connection from {} failed: {}", peer, e);
                    }
                },
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(self.idle_sleep);
                },
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {},
                Err(e) => {
                    self.stats.io_errors.fetch_add(1, Ordering::Relaxed);
                    warn!("Accept failed: {}", e);
                    thread::sleep(self.idle_sleep);
                },
            }
        }

        info!("Accept loop stopped");
        Ok(())
    }

    fn handle_connection(&self, stream: TcpStream, dispatcher: &Dispatcher) -> io::Result<()> {
        // 部分平台上接受的套接字会继承监听端的非阻塞标志
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(self.read_timeout))?;
        stream.set_write_timeout(Some(self.read_timeout))?;

        let line = read_request(&stream)?;
        let reply = dispatcher.dispatch(&line);
        if !reply.is_ok() {
            self.stats.failed_replies.fetch_add(1, Ordering::Relaxed);
        }
        debug!("Reply: {:?}", reply.text());

        let mut stream = stream;
        stream.write_all(reply.to_line().as_bytes())?;
        stream.flush()
    }
}

/// 读取一行请求（不含换行），超长部分被截断
fn read_request(stream: impl Read) -> io::Result<String> {
    let mut reader = BufReader::new(stream.take(MAX_REQUEST_LEN as u64));
    let mut buf = Vec::with_capacity(MAX_REQUEST_LEN);
    reader.read_until(b'\n', &mut buf)?;
    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
