// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 访问日志与错误日志
//!
//! 服务器持久化的两类日志：
//! - 访问日志：每个已发送的响应一行，采用 Common Log Format；
//! - 错误日志：绑定、监听、accept 等运行期错误，每行带时间戳。
//!
//! 日志目标通过 [`LogSink`] 抽象，可以由调用方替换。文件目标内部用互斥锁保证一行一次写入，
//! 多个连接任务并发写入时不会交错。诊断信息仍然走 `log` 门面，由 log4rs 负责输出。

use crate::{config::ServerConfig, request::Request, response::Response};

use chrono::{DateTime, Local};
use log::warn;

use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::Mutex,
};

/// 一个按行写入的日志目标
#[cfg_attr(test, mockall::automock)]
pub trait LogSink: Send + Sync {
    fn write_line(&self, line: &str);
}

/// 以追加方式写入文件的日志目标
pub struct FileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileSink {
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileSink {
    fn write_line(&self, line: &str) {
        let mut file = match self.file.lock() {
            Ok(lock) => lock,
            Err(poisoned) => {
                warn!("日志文件{}的锁被污染，恢复并继续", self.path.display());
                poisoned.into_inner()
            }
        };
        let result = writeln!(file, "{}", line).and_then(|_| file.flush());
        if let Err(e) = result {
            warn!("写入日志文件{}失败：{}", self.path.display(), e);
        }
    }
}

/// 丢弃所有内容的日志目标
pub struct NullSink;

impl LogSink for NullSink {
    fn write_line(&self, _line: &str) {}
}

/// 服务器持有的一对日志目标
pub struct LogSinks {
    access: Box<dyn LogSink>,
    error: Box<dyn LogSink>,
}

impl LogSinks {
    pub fn new(access: Box<dyn LogSink>, error: Box<dyn LogSink>) -> Self {
        Self { access, error }
    }

    pub fn disabled() -> Self {
        Self::new(Box::new(NullSink), Box::new(NullSink))
    }

    /// 按配置打开日志文件。打开失败不影响服务器运行，对应的日志变为空操作。
    pub fn open(config: &ServerConfig) -> Self {
        Self::new(
            open_or_null(config.access_log()),
            open_or_null(config.error_log()),
        )
    }

    /// 写入一条访问日志
    pub fn access(&self, request: &Request, response: &Response) {
        self.access
            .write_line(&format_access_line(request, response, Local::now()));
    }

    /// 写入一条带时间戳的错误日志
    pub fn error(&self, message: &str) {
        self.error.write_line(&format_error_line(message, Local::now()));
    }
}

fn open_or_null(path: &str) -> Box<dyn LogSink> {
    if path.is_empty() {
        return Box::new(NullSink);
    }
    match FileSink::open(path) {
        Ok(sink) => Box::new(sink),
        Err(e) => {
            warn!("无法打开日志文件{}：{}，该日志将被禁用", path, e);
            Box::new(NullSink)
        }
    }
}

/// Common Log Format：`host - - [time] "METHOD PATH PROTOCOL" status bytes`
pub fn format_access_line(request: &Request, response: &Response, now: DateTime<Local>) -> String {
    format!(
        "{} - - [{}] \"{} {} {}\" {} {}",
        request.remote_addr().ip(),
        now.format("%d/%b/%Y:%H:%M:%S %z"),
        request.method().unwrap_or("-"),
        request.path().unwrap_or("-"),
        request.protocol().unwrap_or("-"),
        response.status_code(),
        response.body_length(),
    )
}

pub fn format_error_line(message: &str, now: DateTime<Local>) -> String {
    format!("[{}] {}", now.format("%Y-%m-%d %H:%M:%S"), message)
}
