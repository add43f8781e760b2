// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 响应构建模块
//!
//! `Response` 在一次连接中累积状态码、响应头与响应体，最后由连接处理器序列化后发送。
//! 提供 JSON / HTML / 纯文本 / 静态文件 / 错误页等便捷构造方法，
//! 每个方法都会同时设置状态码、响应体以及 `Content-Type` 头。

use crate::{exception::Exception, header::Headers, param::*};

use bytes::Bytes;
use log::{debug, error, warn};

use std::{fs::File, io::Read, path::Path};

#[derive(Debug, Clone)]
pub struct Response {
    status_code: u16,
    information: String,
    headers: Headers,
    body: Bytes,
    close_connection: bool,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub fn new() -> Self {
        Self {
            status_code: 200,
            information: "OK".to_string(),
            headers: Headers::new(),
            body: Bytes::new(),
            close_connection: false,
        }
    }

    /// 设置状态码，原因短语随之从状态码表中查得
    pub fn set_status(&mut self, code: u16) -> &mut Self {
        self.status_code = code;
        self.information = status_text(code).to_string();
        self
    }

    /// 追加一个响应头。响应头数量已满或名称、取值超长时丢弃并返回 `false`。
    pub fn set_header(&mut self, name: &str, value: &str) -> bool {
        self.headers.set(name, value)
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) -> &mut Self {
        self.body = body.into();
        self
    }

    pub fn set_close_connection(&mut self, close: bool) -> &mut Self {
        self.close_connection = close;
        self
    }

    fn with_content(&mut self, status: u16, body: Bytes, content_type: &str) {
        self.set_status(status);
        self.body = body;
        self.set_header("Content-Type", content_type);
    }

    pub fn json(&mut self, status: u16, json: impl Into<Bytes>) {
        self.with_content(status, json.into(), "application/json");
    }

    pub fn html(&mut self, status: u16, html: impl Into<Bytes>) {
        self.with_content(status, html.into(), "text/html; charset=utf-8");
    }

    pub fn text(&mut self, status: u16, text: impl Into<Bytes>) {
        self.with_content(status, text.into(), "text/plain; charset=utf-8");
    }

    /// 读取整个文件作为响应体。
    ///
    /// 文件无法打开时生成 404 错误页，读取失败时生成 500 错误页，并返回对应的 `Exception`。
    /// `Content-Type` 由文件后缀名推断，未知后缀不设置该响应头。
    pub fn file(&mut self, path: impl AsRef<Path>) -> Result<(), Exception> {
        let path = path.as_ref();
        let mut file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                debug!("无法打开文件{}：{}", path.display(), e);
                self.error(404, "File not found");
                return Err(Exception::FileNotFound);
            }
        };

        let mut contents = Vec::new();
        if let Err(e) = file.read_to_end(&mut contents) {
            error!("无法读取文件{}：{}", path.display(), e);
            self.error(500, "Failed to read file");
            return Err(Exception::FileReadFailed);
        }

        self.set_status(200);
        self.body = Bytes::from(contents);
        if let Some(mime) = get_mime(path) {
            self.set_header("Content-Type", mime);
        }
        Ok(())
    }

    /// 渲染一个简单的 HTML 错误页。
    ///
    /// 页面总长度不超过 [`ERROR_PAGE_SIZE`] - 1 字节，过长的消息会被截断。
    pub fn error(&mut self, status: u16, message: &str) {
        let page = render_error_page(status, message);
        self.with_content(status, Bytes::from(page), "text/html");
    }

    /// 渲染状态行与响应头，末尾附带计算得到的 `Content-Length` 与空行。
    ///
    /// 结果不超过 [`BUFFER_SIZE`] 字节：放不下的响应头被丢弃，
    /// 用户设置的 `Content-Length` 头由计算值取代。
    pub fn head_bytes(&self) -> Vec<u8> {
        let status_line = format!(
            "{} {} {}{}",
            HTTP_VERSION, self.status_code, self.information, CRLF
        );
        let content_length = format!("Content-Length: {}{}", self.body.len(), CRLF);
        let reserved = content_length.len() + CRLF.len();

        let mut head = String::with_capacity(BUFFER_SIZE);
        head.push_str(&status_line);
        for entry in self.headers.iter() {
            if entry.name().eq_ignore_ascii_case("Content-Length") {
                continue;
            }
            let line = [entry.name(), ": ", entry.value(), CRLF].concat();
            if head.len() + line.len() + reserved > BUFFER_SIZE {
                warn!("响应头{}超出缓冲区上限，已丢弃", entry.name());
                continue;
            }
            head.push_str(&line);
        }
        head.push_str(&content_length);
        head.push_str(CRLF);
        head.into_bytes()
    }

    /// 完整的响应报文（响应头 + 响应体）
    pub fn as_bytes(&self) -> Vec<u8> {
        [self.head_bytes().as_slice(), &self.body[..]].concat()
    }
}

impl Response {
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn information(&self) -> &str {
        &self.information
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn body_length(&self) -> usize {
        self.body.len()
    }

    pub fn close_connection(&self) -> bool {
        self.close_connection
    }
}

fn render_error_page(status: u16, message: &str) -> String {
    let prefix = format!(
        "<html><head><title>{0} Error</title></head><body><h1>{0} Error</h1><p>",
        status
    );
    let suffix = "</p></body></html>";
    let budget = (ERROR_PAGE_SIZE - 1).saturating_sub(prefix.len() + suffix.len());

    let mut page = prefix;
    let limit = page.len() + budget;
    for c in message.chars() {
        let escaped = match c {
            '&' => "&amp;".to_string(),
            '<' => "&lt;".to_string(),
            '>' => "&gt;".to_string(),
            '"' => "&quot;".to_string(),
            _ => c.to_string(),
        };
        if page.len() + escaped.len() > limit {
            break;
        }
        page.push_str(&escaped);
    }
    page.push_str(suffix);
    page
}

fn get_mime(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?;
    MIME_TYPES.get(extension).copied()
}
