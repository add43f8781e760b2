use num_cpus;
use serde_derive::Deserialize;
use serde_derive::Serialize;

use log::{error, warn};
use std::fs::File;
use std::io::prelude::*;

/// 服务器配置。`create` 之后不再修改。
///
/// 所有字段都有默认值，TOML 文件中可以只给出其中一部分。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    bind_addr: String,
    port: u16,
    worker_threads: usize,
    max_connections: u32,
    keepalive_timeout: u64,
    request_timeout: u64,
    max_header_size: usize,
    max_body_size: usize,
    document_root: String,
    access_log: String,
    error_log: String,
    enable_tls: bool,
    tls_cert_file: Option<String>,
    tls_key_file: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 8080,
            worker_threads: 4,
            max_connections: 1024,
            keepalive_timeout: 5,
            request_timeout: 30,
            max_header_size: 8192,
            max_body_size: 10 * 1024 * 1024, // 10MB
            document_root: ".".to_string(),
            access_log: "access.log".to_string(),
            error_log: "error.log".to_string(),
            enable_tls: false,
            tls_cert_file: None,
            tls_key_file: None,
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 TOML 文件加载配置。文件缺失或格式错误时记录日志并使用默认配置。
    pub fn from_toml(filename: &str) -> Self {
        let mut file = match File::open(filename) {
            Ok(f) => f,
            Err(e) => {
                error!("无法打开配置文件{}：{}，使用默认配置", filename, e);
                return Self::default();
            }
        };
        let mut str_val = String::new();
        if let Err(e) = file.read_to_string(&mut str_val) {
            error!("读取配置文件{}失败：{}，使用默认配置", filename, e);
            return Self::default();
        }
        Self::from_toml_str(&str_val)
    }

    pub fn from_toml_str(content: &str) -> Self {
        let mut raw_config: ServerConfig = match toml::from_str(content) {
            Ok(t) => t,
            Err(e) => {
                error!("无法成功从配置文件构建配置对象：{}，使用默认配置", e);
                Self::default()
            }
        };
        if raw_config.worker_threads == 0 {
            raw_config.worker_threads = num_cpus::get();
        }
        if raw_config.enable_tls {
            warn!("配置启用了TLS，但TLS终结需由外部组件提供，本服务器仍以明文方式监听。");
        }
        raw_config
    }

    pub fn with_bind_addr(mut self, bind_addr: &str) -> Self {
        self.bind_addr = bind_addr.to_string();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_document_root(mut self, document_root: &str) -> Self {
        self.document_root = document_root.to_string();
        self
    }

    pub fn with_log_files(mut self, access_log: &str, error_log: &str) -> Self {
        self.access_log = access_log.to_string();
        self.error_log = error_log.to_string();
        self
    }

    pub fn with_request_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout = seconds;
        self
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> &str {
        &self.bind_addr
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// 仅用于确定运行时的工作线程数
    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    /// 作为 listen 的 backlog 使用
    pub fn max_connections(&self) -> u32 {
        self.max_connections
    }

    pub fn keepalive_timeout(&self) -> u64 {
        self.keepalive_timeout
    }

    pub fn request_timeout(&self) -> u64 {
        self.request_timeout
    }

    pub fn max_header_size(&self) -> usize {
        self.max_header_size
    }

    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    pub fn document_root(&self) -> &str {
        &self.document_root
    }

    pub fn access_log(&self) -> &str {
        &self.access_log
    }

    pub fn error_log(&self) -> &str {
        &self.error_log
    }

    pub fn enable_tls(&self) -> bool {
        self.enable_tls
    }

    pub fn tls_cert_file(&self) -> Option<&str> {
        self.tls_cert_file.as_deref()
    }

    pub fn tls_key_file(&self) -> Option<&str> {
        self.tls_key_file.as_deref()
    }
}
