// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 协议参数与常量模块
//!
//! 该模块集中定义了请求处理引擎使用的各类常量：
//! - 报文格式相关的固定字符串（CRLF、协议版本）。
//! - 各类定长容器的容量上限（请求头、路由表、中间件链）。
//! - 请求行与请求头各字段的长度上限。
//! - HTTP 状态码原因短语表，以及静态文件使用的后缀名到 MIME 类型映射表。

use std::collections::HashMap;
use lazy_static::lazy_static;

/// HTTP 协议规定的换行符（Carriage Return Line Feed）
pub const CRLF: &str = "\r\n";

/// 响应状态行使用的协议版本
pub const HTTP_VERSION: &str = "HTTP/1.1";

/// 单次读取连接数据时使用的缓冲区大小，同时也是序列化响应头的上限
pub const BUFFER_SIZE: usize = 8192;

/// 请求头容器的最大条目数
pub const MAX_HEADERS: usize = 64;

/// 路由表的最大条目数
pub const MAX_ROUTES: usize = 256;

/// 中间件链的最大条目数
pub const MAX_MIDDLEWARE: usize = 32;

/// 请求头名称的最大字节数
pub const MAX_HEADER_NAME_LEN: usize = 127;

/// 请求头取值的最大字节数
pub const MAX_HEADER_VALUE_LEN: usize = 511;

/// 请求方法的最大字节数
pub const MAX_METHOD_LEN: usize = 15;

/// 请求路径（不含查询字符串）的最大字节数
pub const MAX_PATH_LEN: usize = 255;

/// 查询字符串的最大字节数
pub const MAX_QUERY_LEN: usize = 511;

/// 协议标识（如 `HTTP/1.1`）的最大字节数
pub const MAX_PROTOCOL_LEN: usize = 15;

/// 错误页面渲染缓冲区的大小，超出的部分会被截断
pub const ERROR_PAGE_SIZE: usize = 1024;

lazy_static! {
    /// HTTP 状态码与其对应的标准原因短语映射表。
    ///
    /// 参考标准：[RFC 9110: HTTP Semantics](https://www.rfc-editor.org/rfc/rfc9110.html)。
    pub static ref STATUS_CODES: HashMap<u16, &'static str> = {
        let mut map = HashMap::new();
        // 1xx: 信息响应 (Informational)
        map.insert(100, "Continue");
        map.insert(101, "Switching Protocols");

        // 2xx: 成功响应 (Successful)
        map.insert(200, "OK");
        map.insert(201, "Created");
        map.insert(202, "Accepted");
        map.insert(203, "Non-Authoritative Information");
        map.insert(204, "No Content");
        map.insert(205, "Reset Content");
        map.insert(206, "Partial Content");

        // 3xx: 重定向 (Redirection)
        map.insert(300, "Multiple Choices");
        map.insert(301, "Moved Permanently");
        map.insert(302, "Found");
        map.insert(303, "See Other");
        map.insert(304, "Not Modified");
        map.insert(307, "Temporary Redirect");
        map.insert(308, "Permanent Redirect");

        // 4xx: 客户端错误 (Client Error)
        map.insert(400, "Bad Request");
        map.insert(401, "Unauthorized");
        map.insert(402, "Payment Required");
        map.insert(403, "Forbidden");
        map.insert(404, "Not Found");
        map.insert(405, "Method Not Allowed");
        map.insert(406, "Not Acceptable");
        map.insert(408, "Request Timeout");
        map.insert(409, "Conflict");
        map.insert(410, "Gone");
        map.insert(411, "Length Required");
        map.insert(413, "Content Too Large");
        map.insert(414, "URI Too Long");
        map.insert(415, "Unsupported Media Type");
        map.insert(418, "I'm a teapot");
        map.insert(422, "Unprocessable Content");
        map.insert(429, "Too Many Requests");
        map.insert(431, "Request Header Fields Too Large");

        // 5xx: 服务端错误 (Server Error)
        map.insert(500, "Internal Server Error");
        map.insert(501, "Not Implemented");
        map.insert(502, "Bad Gateway");
        map.insert(503, "Service Unavailable");
        map.insert(504, "Gateway Timeout");
        map.insert(505, "HTTP Version Not Supported");
        map
    };
}

lazy_static! {
    /// 文件后缀名到 MIME 类型的映射表。
    ///
    /// 只覆盖少量常见的静态资源类型；表中没有的后缀不会设置 `Content-Type`。
    pub static ref MIME_TYPES: HashMap<&'static str, &'static str> = {
        let mut map = HashMap::new();
        map.insert("html", "text/html");
        map.insert("htm", "text/html");
        map.insert("css", "text/css");
        map.insert("js", "application/javascript");
        map.insert("json", "application/json");
        map.insert("png", "image/png");
        map.insert("jpg", "image/jpeg");
        map.insert("jpeg", "image/jpeg");
        map
    };
}

/// 查询状态码对应的原因短语，未登记的状态码返回 `"Unknown"`。
pub fn status_text(code: u16) -> &'static str {
    STATUS_CODES.get(&code).copied().unwrap_or("Unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text_known() {
        assert_eq!(status_text(200), "OK");
        assert_eq!(status_text(404), "Not Found");
        assert_eq!(status_text(500), "Internal Server Error");
    }

    #[test]
    fn test_status_text_unknown() {
        assert_eq!(status_text(299), "Unknown");
        assert_eq!(status_text(999), "Unknown");
    }

    #[test]
    fn test_mime_table_is_case_sensitive() {
        assert_eq!(MIME_TYPES.get("css"), Some(&"text/css"));
        assert_eq!(MIME_TYPES.get("CSS"), None);
        assert_eq!(MIME_TYPES.get("txt"), None);
    }
}
