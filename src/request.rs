// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求处理模块
//!
//! 该模块负责将连接上单次读取得到的原始字节解析为 `Request` 结构体。它涵盖了：
//! 1. 请求行（Request-Line）的解析（方法、路径、查询字符串、协议）。
//! 2. 请求头（Headers）的解析，以及 `Host`、`Content-Type`、`Content-Length` 的镜像字段。
//! 3. 单次读取中已经到达的请求体字节。
//! 4. 查询参数、表单与 JSON 请求体的便捷访问。
//!
//! 解析失败不会中断处理流程：无法解析的字段保持为空（`None`），由后续阶段自行处理。

use crate::{
    exception::Exception,
    header::Headers,
    param::*,
    util::{parse_urlencoded, url_decode},
};

use bytes::Bytes;
use log::{debug, warn};
use std::net::SocketAddr;

/// 请求行的解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
struct RequestLine {
    method: String,
    path: String,
    query: Option<String>,
    protocol: String,
}

/// 表示一个 HTTP 请求。
///
/// 由连接处理器独占，连接关闭时随之释放。
#[derive(Debug, Clone)]
pub struct Request {
    /// 请求方法，请求行无法解析时为 `None`
    method: Option<String>,
    /// 请求路径（不含查询字符串）
    path: Option<String>,
    /// `?` 之后的查询字符串
    query: Option<String>,
    /// 协议标识，例如 `HTTP/1.1`
    protocol: Option<String>,
    headers: Headers,
    host: Option<String>,
    content_type: Option<String>,
    /// 非数字的 `Content-Length` 视为缺失
    content_length: Option<usize>,
    /// 单次读取中已到达的请求体字节
    body: Bytes,
    remote: SocketAddr,
}

impl Request {
    /// 创建一个所有字段都为空的请求，用于解析失败的情形
    fn empty(remote: SocketAddr) -> Self {
        Self {
            method: None,
            path: None,
            query: None,
            protocol: None,
            headers: Headers::new(),
            host: None,
            content_type: None,
            content_length: None,
            body: Bytes::new(),
            remote,
        }
    }

    /// 从单次读取得到的字节缓冲区构建 `Request`。
    ///
    /// # 逻辑步骤
    /// 1. 定位空行，将缓冲区划分为头部与请求体。
    /// 2. 解析请求行；失败时方法、路径、协议全部保持为空，但仍继续解析请求头。
    /// 3. 逐行解析请求头，格式错误或超长的行被跳过，容器已满时其余请求头被丢弃。
    /// 4. 从请求头中复制 `Host`、`Content-Type`、`Content-Length`。
    /// 5. 截取空行之后已经到达的字节作为请求体，不会为此再次读取连接。
    pub fn parse(buffer: &[u8], remote: SocketAddr, id: u128) -> Self {
        let mut request = Self::empty(remote);

        let (head, body) = match find_subsequence(buffer, b"\r\n\r\n") {
            Some(pos) => (&buffer[..pos + 4], &buffer[pos + 4..]),
            None => (buffer, &buffer[buffer.len()..]),
        };

        // 1. 请求行
        let line_end = match find_subsequence(head, CRLF.as_bytes()) {
            Some(pos) => pos,
            None => {
                warn!("[ID{}]请求中没有完整的请求行", id);
                return request;
            }
        };
        match std::str::from_utf8(&head[..line_end]) {
            Ok(line) => match parse_request_line(line) {
                Ok(line) => {
                    request.method = Some(line.method);
                    request.path = Some(line.path);
                    request.query = line.query;
                    request.protocol = Some(line.protocol);
                }
                Err(e) => {
                    warn!("[ID{}]请求行解析失败：{}，行内容：{:?}", id, e, line);
                }
            },
            Err(_) => {
                warn!("[ID{}]请求行：{}", id, Exception::RequestIsNotUtf8);
            }
        }

        // 2. 请求头，逐行解码直到空行为止；缺少 CRLF 结尾的残行被忽略
        let mut rest = &head[line_end + CRLF.len()..];
        while let Some(pos) = find_subsequence(rest, CRLF.as_bytes()) {
            let raw = &rest[..pos];
            rest = &rest[pos + CRLF.len()..];
            if raw.is_empty() {
                break;
            }
            let line = match std::str::from_utf8(raw) {
                Ok(line) => line,
                Err(_) => {
                    debug!("[ID{}]跳过请求头：{}", id, Exception::RequestIsNotUtf8);
                    continue;
                }
            };
            match parse_header(line) {
                Ok((name, value)) => {
                    if !request.headers.set(name, value) {
                        debug!("[ID{}]请求头数量已达上限，丢弃：{}", id, name);
                    }
                }
                Err(e) => {
                    debug!("[ID{}]跳过请求头：{}，行内容：{:?}", id, e, line);
                }
            }
        }

        // 3. 镜像常用字段
        request.host = request.headers.get("Host").map(str::to_string);
        request.content_type = request.headers.get("Content-Type").map(str::to_string);
        request.content_length = match request.headers.get("Content-Length") {
            Some(value) => match value.trim().parse::<usize>() {
                Ok(n) => Some(n),
                Err(_) => {
                    warn!("[ID{}]非法的Content-Length：{}", id, value);
                    None
                }
            },
            None => None,
        };

        // 4. 请求体：只包含本次读取中已经到达的部分
        let body = match request.content_length {
            Some(n) if n < body.len() => &body[..n],
            _ => body,
        };
        request.body = Bytes::copy_from_slice(body);

        request
    }
}

/// 解析形如 `GET /path?query HTTP/1.1` 的请求行。
///
/// 任一字段超长即整体失败，不做截断。
fn parse_request_line(line: &str) -> Result<RequestLine, Exception> {
    let (method, rest) = line.split_once(' ').ok_or(Exception::MalformedRequestLine)?;
    if method.is_empty() {
        return Err(Exception::MalformedRequestLine);
    }
    if method.len() > MAX_METHOD_LEN {
        return Err(Exception::FieldTooLong);
    }

    let (target, protocol) = rest.split_once(' ').ok_or(Exception::MalformedRequestLine)?;
    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    };
    if path.len() > MAX_PATH_LEN {
        return Err(Exception::FieldTooLong);
    }
    if let Some(q) = query {
        if q.len() > MAX_QUERY_LEN {
            return Err(Exception::FieldTooLong);
        }
    }
    if protocol.len() > MAX_PROTOCOL_LEN {
        return Err(Exception::FieldTooLong);
    }

    Ok(RequestLine {
        method: method.to_string(),
        path: path.to_string(),
        query: query.map(str::to_string),
        protocol: protocol.to_string(),
    })
}

/// 解析 `Name: Value` 形式的请求头行，冒号后的前导空白会被去除
fn parse_header(line: &str) -> Result<(&str, &str), Exception> {
    let (name, value) = line.split_once(':').ok_or(Exception::MalformedHeader)?;
    if name.len() > MAX_HEADER_NAME_LEN {
        return Err(Exception::FieldTooLong);
    }
    let value = value.trim_start_matches([' ', '\t']);
    if value.len() > MAX_HEADER_VALUE_LEN {
        return Err(Exception::FieldTooLong);
    }
    Ok((name, value))
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

// --- Getter 访问器实现 ---

impl Request {
    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn protocol(&self) -> Option<&str> {
        self.protocol.as_deref()
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// 按名称查找请求头（大小写不敏感）
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn content_length(&self) -> Option<usize> {
        self.content_length
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    pub fn remote_port(&self) -> u16 {
        self.remote.port()
    }
}

// --- 请求辅助方法 ---

impl Request {
    /// 获取查询参数的第一个取值（已做 URL 解码）
    pub fn param(&self, name: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        parse_urlencoded(query)
            .into_iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// 获取全部查询参数，保持出现顺序
    pub fn params(&self) -> Vec<(String, String)> {
        match self.query.as_deref() {
            Some(query) => parse_urlencoded(query),
            None => Vec::new(),
        }
    }

    /// 将 `application/x-www-form-urlencoded` 请求体解析为键值对
    pub fn form(&self) -> Vec<(String, String)> {
        let body = String::from_utf8_lossy(&self.body);
        parse_urlencoded(&body)
    }

    /// 将请求体解析为 JSON 文档
    pub fn json(&self) -> Result<serde_json::Value, Exception> {
        serde_json::from_slice(&self.body).map_err(|_| Exception::BodyIsNotJson)
    }

    /// 解码后的请求路径，供静态文件映射等场景使用
    pub fn decoded_path(&self) -> Option<String> {
        self.path.as_deref().map(url_decode)
    }
}
