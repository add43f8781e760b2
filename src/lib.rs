// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # minihttpd
//!
//! 一个可嵌入的极简 HTTP/1.1 请求处理引擎：
//! 注册路由与中间件，启动服务器，每个连接处理一个请求后关闭。

pub mod config;
mod connection;
pub mod exception;
pub mod header;
pub mod logger;
pub mod param;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod util;

pub use config::ServerConfig;
pub use exception::Exception;
pub use header::Headers;
pub use logger::{FileSink, LogSink, LogSinks, NullSink};
pub use request::Request;
pub use response::Response;
pub use router::{Handler, MiddlewareChain, RouteTable};
pub use server::{Server, ShutdownHandle};
