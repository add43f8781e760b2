// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 服务器生命周期
//!
//! `Server` 持有配置、路由表、中间件链与日志目标，对外提供
//! `create → add_route / add_middleware → start → stop → destroy` 的生命周期。
//!
//! 启动时路由表与中间件链被冻结为只读的流水线，在所有连接任务之间共享；
//! 运行期间的注册请求会被拒绝。每个接受的连接都在独立的 Tokio 任务中处理。

use crate::{
    config::ServerConfig,
    connection::{handle_connection, Pipeline},
    exception::Exception,
    logger::LogSinks,
    request::Request,
    response::Response,
    router::{MiddlewareChain, RouteTable},
};

use log::{debug, error, info, warn};
use tokio::{
    net::{TcpListener, TcpSocket},
    sync::watch,
    task::JoinHandle,
};

use std::{
    net::{IpAddr, SocketAddr},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard,
    },
    time::Duration,
};

/// accept 出错后的退避时间，避免文件描述符耗尽时空转
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// 单次运行的停机信号。每次启动都创建新的通道，旧的主循环不会被新一轮启动唤醒。
type RunSignal = Arc<watch::Sender<bool>>;

/// 运行状态：当前运行的停机信号与活跃连接计数
struct Lifecycle {
    current: Mutex<Option<RunSignal>>,
    active_connections: AtomicUsize,
}

impl Lifecycle {
    fn new() -> Self {
        Self {
            current: Mutex::new(None),
            active_connections: AtomicUsize::new(0),
        }
    }

    fn current(&self) -> MutexGuard<'_, Option<RunSignal>> {
        match self.current.lock() {
            Ok(lock) => lock,
            Err(poisoned) => {
                warn!("运行状态的锁被污染，恢复并继续");
                poisoned.into_inner()
            }
        }
    }

    fn is_running(&self) -> bool {
        self.current().is_some()
    }

    /// 登记一轮新的运行；已有运行时返回 `None`
    fn begin(&self) -> Option<RunSignal> {
        let mut current = self.current();
        if current.is_some() {
            return None;
        }
        let (stop_tx, _) = watch::channel(false);
        let run = Arc::new(stop_tx);
        *current = Some(Arc::clone(&run));
        Some(run)
    }

    /// 取走当前运行并向它的主循环发送停机信号
    fn stop(&self) {
        if let Some(run) = self.current().take() {
            run.send_replace(true);
        }
    }

    /// 主循环退出时调用，只清除属于自己的那一轮运行
    fn finish(&self, run: &RunSignal) {
        let mut current = self.current();
        if current.as_ref().map_or(false, |c| Arc::ptr_eq(c, run)) {
            *current = None;
        }
    }
}

/// 可在任意任务中使用的停机句柄
#[derive(Clone)]
pub struct ShutdownHandle {
    lifecycle: Arc<Lifecycle>,
}

impl ShutdownHandle {
    /// 清除运行标志并唤醒正在等待 accept 的主循环
    pub fn stop(&self) {
        self.lifecycle.stop();
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle.is_running()
    }

    pub fn active_connections(&self) -> usize {
        self.lifecycle.active_connections.load(Ordering::SeqCst)
    }
}

pub struct Server {
    config: Arc<ServerConfig>,
    routes: RouteTable,
    middleware: MiddlewareChain,
    logs: Arc<LogSinks>,
    lifecycle: Arc<Lifecycle>,
    local_addr: Option<SocketAddr>,
    accept_task: Option<JoinHandle<()>>,
}

impl Server {
    /// 创建服务器，未提供配置时使用默认配置。日志文件打开失败不影响创建。
    pub fn create(config: Option<ServerConfig>) -> Self {
        let config = config.unwrap_or_default();
        let logs = LogSinks::open(&config);
        Self::with_log_sinks(config, logs)
    }

    /// 使用调用方提供的日志目标创建服务器
    pub fn with_log_sinks(config: ServerConfig, logs: LogSinks) -> Self {
        if config.enable_tls() {
            warn!("TLS已在配置中启用，但需由外部组件终结，服务器将以明文方式监听");
        }
        Self {
            config: Arc::new(config),
            routes: RouteTable::new(),
            middleware: MiddlewareChain::new(),
            logs: Arc::new(logs),
            lifecycle: Arc::new(Lifecycle::new()),
            local_addr: None,
            accept_task: None,
        }
    }

    /// 注册路由。容量已满或服务器正在运行时返回错误，且不修改路由表。
    pub fn add_route<F>(&mut self, method: &str, path: &str, handler: F) -> Result<(), Exception>
    where
        F: Fn(&Request, &mut Response) + Send + Sync + 'static,
    {
        if self.is_running() {
            return Err(Exception::ServerRunning);
        }
        self.routes.add(method, path, handler)?;
        debug!("注册路由：{} {}", method, path);
        Ok(())
    }

    /// 注册中间件。容量已满或服务器正在运行时返回错误，且不修改中间件链。
    pub fn add_middleware<F>(&mut self, middleware: F) -> Result<(), Exception>
    where
        F: Fn(&Request, &mut Response) + Send + Sync + 'static,
    {
        if self.is_running() {
            return Err(Exception::ServerRunning);
        }
        self.middleware.add(middleware)
    }

    /// 在当前任务中运行 accept 主循环，直到收到停机信号
    pub async fn start(&mut self) -> Result<(), Exception> {
        self.join_previous_run().await?;
        let (listener, run) = self.listen()?;
        let pipeline = self.pipeline();
        accept_loop(listener, pipeline, Arc::clone(&self.lifecycle), run).await;
        Ok(())
    }

    /// 绑定端口后在后台任务中运行 accept 主循环，返回实际监听的地址
    pub async fn start_background(&mut self) -> Result<SocketAddr, Exception> {
        self.join_previous_run().await?;
        let (listener, run) = self.listen()?;
        let addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(e) => {
                error!("无法获取监听地址: {}", e);
                self.lifecycle.stop();
                return Err(Exception::ListenFailed);
            }
        };
        let pipeline = self.pipeline();
        let lifecycle = Arc::clone(&self.lifecycle);
        self.accept_task = Some(tokio::spawn(accept_loop(listener, pipeline, lifecycle, run)));
        Ok(addr)
    }

    /// 等待上一轮已停止的后台主循环退出，确保旧的监听套接字已关闭
    async fn join_previous_run(&mut self) -> Result<(), Exception> {
        if self.is_running() {
            return Err(Exception::AlreadyRunning);
        }
        if let Some(task) = self.accept_task.take() {
            if let Err(e) = task.await {
                error!("上一轮 accept 主循环异常退出: {}", e);
            }
        }
        Ok(())
    }

    /// 结束当前运行：主循环优先响应停机信号，退出时关闭监听套接字。
    /// 再次启动前会等待旧的后台主循环退出。
    pub fn stop(&self) {
        if self.is_running() {
            info!("收到停机指令，正在关闭监听套接字...");
        }
        self.lifecycle.stop();
    }

    /// 停止服务器，等待后台主循环退出，并释放路由表、中间件链与日志文件
    pub async fn destroy(mut self) {
        self.stop();
        if let Some(task) = self.accept_task.take() {
            if let Err(e) = task.await {
                error!("accept 主循环异常退出: {}", e);
            }
        }
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            lifecycle: Arc::clone(&self.lifecycle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle.is_running()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn middleware(&self) -> &MiddlewareChain {
        &self.middleware
    }

    /// 创建套接字、设置地址复用、绑定并以 `max_connections` 作为 backlog 开始监听
    fn listen(&mut self) -> Result<(TcpListener, RunSignal), Exception> {
        if self.is_running() {
            return Err(Exception::AlreadyRunning);
        }

        let bind_addr = self.config.bind_addr();
        let port = self.config.port();
        let ip: IpAddr = match bind_addr.parse() {
            Ok(ip) => ip,
            Err(_) => {
                error!("非法的监听地址：{}", bind_addr);
                self.logs.error(&format!("Invalid bind address {}", bind_addr));
                return Err(Exception::InvalidBindAddress);
            }
        };
        let addr = SocketAddr::new(ip, port);

        let socket = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4(),
            SocketAddr::V6(_) => TcpSocket::new_v6(),
        };
        let socket = match socket {
            Ok(s) => s,
            Err(e) => {
                error!("无法创建套接字: {}", e);
                self.logs.error(&format!("Failed to create socket: {}", e));
                return Err(Exception::SocketCreateFailed);
            }
        };
        if let Err(e) = socket.set_reuseaddr(true) {
            warn!("无法设置SO_REUSEADDR: {}", e);
        }
        if let Err(e) = socket.bind(addr) {
            error!("无法绑定端口：{}，错误：{}", addr, e);
            self.logs
                .error(&format!("Failed to bind to {}:{}: {}", bind_addr, port, e));
            return Err(Exception::BindFailed);
        }
        let listener = match socket.listen(self.config.max_connections()) {
            Ok(l) => l,
            Err(e) => {
                error!("监听失败：{}", e);
                self.logs.error(&format!("Failed to listen on socket: {}", e));
                return Err(Exception::ListenFailed);
            }
        };

        let run = self.lifecycle.begin().ok_or(Exception::AlreadyRunning)?;
        self.local_addr = listener.local_addr().ok();
        info!(
            "服务端已在 http://{} 上监听Socket连接",
            self.local_addr.unwrap_or(addr)
        );
        Ok((listener, run))
    }

    /// 冻结当前的路由表与中间件链
    fn pipeline(&self) -> Arc<Pipeline> {
        let timeout = match self.config.request_timeout() {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Arc::new(Pipeline::new(
            self.routes.clone(),
            self.middleware.clone(),
            Arc::clone(&self.logs),
            timeout,
        ))
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.lifecycle.stop();
    }
}

/// accept 主循环：持续接收新连接并为每个连接派生独立任务，直到收到停机信号
async fn accept_loop(
    listener: TcpListener,
    pipeline: Arc<Pipeline>,
    lifecycle: Arc<Lifecycle>,
    run: RunSignal,
) {
    let mut stop_rx = run.subscribe();
    let mut id: u128 = 0;

    loop {
        tokio::select! {
            biased;
            _ = stopped(&mut stop_rx) => {
                info!("主循环接收到停机指令，正在退出...");
                break;
            }
            accepted = listener.accept() => {
                let (mut stream, remote) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        back_off_after_accept_error(&e, pipeline.logs()).await;
                        continue;
                    }
                };
                debug!("[ID{}]新的连接：{}", id, remote);

                let pipeline = Arc::clone(&pipeline);
                let lifecycle = Arc::clone(&lifecycle);
                tokio::spawn(async move {
                    lifecycle.active_connections.fetch_add(1, Ordering::SeqCst);
                    handle_connection(&mut stream, remote, id, &pipeline).await;
                    lifecycle.active_connections.fetch_sub(1, Ordering::SeqCst);
                    debug!("[ID{}]连接已关闭", id);
                });
                id += 1;
            }
        }
    }

    drop(listener);
    lifecycle.finish(&run);
}

/// 记录 accept 错误并短暂退避后再继续接收连接
async fn back_off_after_accept_error(e: &std::io::Error, logs: &LogSinks) {
    error!("接受连接失败: {}", e);
    logs.error(&format!("Failed to accept connection: {}", e));
    tokio::time::sleep(ACCEPT_BACKOFF).await;
}

/// 等待停机信号；发送端被释放同样视为停机
async fn stopped(stop_rx: &mut watch::Receiver<bool>) {
    let _ = stop_rx.wait_for(|stop| *stop).await;
}
