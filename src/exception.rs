// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了请求处理引擎在注册、监听、解析与文件服务各阶段可能出现的异常情况。
//!
//! ## 设计意图
//! - **错误分类**：涵盖传输层错误、报文解析错误、资源容量错误以及文件服务错误。
//! - **轻量可复制**：枚举本身不携带底层 `io::Error`，具体原因在出错位置写入日志。
//! - **用户友好**：通过实现 `std::fmt::Display`，确保错误信息可以被安全地记录到日志中。

use std::fmt;

/// 引擎运行过程中发生的异常类型。
///
/// 该枚举通常作为 `Result` 的 `Err` 部分返回，用于指示失败的具体原因。
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Exception {
    /// 路由表已达到容量上限，新的路由未被登记。
    RouteTableFull,
    /// 中间件链已达到容量上限，新的中间件未被登记。
    MiddlewareChainFull,
    /// 服务器运行期间路由表与中间件链是只读的。
    ServerRunning,
    /// 服务器已经处于运行状态，不能重复启动。
    AlreadyRunning,
    /// 配置中的监听地址无法解析为 IP 地址。
    InvalidBindAddress,
    /// 无法创建监听用的 TCP 套接字。
    SocketCreateFailed,
    /// 无法将套接字绑定到指定的地址与端口。
    BindFailed,
    /// 套接字进入监听状态失败。
    ListenFailed,
    /// 请求头部分无法解析为合法的 UTF-8 字符串。
    RequestIsNotUtf8,
    /// 请求行不符合 `METHOD SP PATH[?QUERY] SP PROTOCOL` 的格式。
    MalformedRequestLine,
    /// 请求头行缺少冒号分隔符。
    MalformedHeader,
    /// 请求行或请求头中的某个字段超过了长度上限。
    FieldTooLong,
    /// 请求的文件不存在或无法打开。对应 `404 Not Found`。
    FileNotFound,
    /// 文件已打开但读取失败。对应 `500 Internal Server Error`。
    FileReadFailed,
    /// 请求体不是合法的 JSON 文档。
    BodyIsNotJson,
}

use Exception::*;

impl fmt::Display for Exception {
    /// 根据错误类型写入人类可读的描述文本。
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteTableFull => write!(f, "Route table is full"),
            MiddlewareChainFull => write!(f, "Middleware chain is full"),
            ServerRunning => write!(f, "Registries are read-only while the server is running"),
            AlreadyRunning => write!(f, "Server is already running"),
            InvalidBindAddress => write!(f, "Invalid bind address"),
            SocketCreateFailed => write!(f, "Failed to create socket"),
            BindFailed => write!(f, "Failed to bind socket"),
            ListenFailed => write!(f, "Failed to listen on socket"),
            RequestIsNotUtf8 => write!(f, "Request head can't be parsed in UTF-8"),
            MalformedRequestLine => write!(f, "Malformed request line"),
            MalformedHeader => write!(f, "Malformed header line"),
            FieldTooLong => write!(f, "Request field exceeds its length limit"),
            FileNotFound => write!(f, "File not found (404)"),
            FileReadFailed => write!(f, "File read failed (500)"),
            BodyIsNotJson => write!(f, "Request body is not valid JSON"),
        }
    }
}

impl std::error::Error for Exception {}
