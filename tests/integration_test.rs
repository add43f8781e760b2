// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 端到端集成测试
//!
//! 每个测试在 127.0.0.1 的随机端口上启动一个真实的服务器，
//! 通过 TCP 发送原始 HTTP 报文并检查返回的字节。

use minihttpd::{Exception, Server, ServerConfig};

use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};

fn local_config() -> ServerConfig {
    ServerConfig::new()
        .with_bind_addr("127.0.0.1")
        .with_port(0)
        .with_log_files("", "")
        .with_request_timeout(5)
}

/// 发送原始报文并读取直到服务器关闭连接
async fn send_raw(addr: SocketAddr, raw: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw).await.unwrap();

    let mut out = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut out))
        .await
        .expect("服务器未在期限内关闭连接")
        .unwrap();
    String::from_utf8_lossy(&out).to_string()
}

fn split_response(response: &str) -> (&str, &str) {
    response.split_once("\r\n\r\n").unwrap_or((response, ""))
}

#[tokio::test]
async fn test_hello_route() {
    let mut server = Server::create(Some(local_config()));
    server.add_route("GET", "/", |_, resp| resp.html(200, "hello")).unwrap();
    let addr = server.start_background().await.unwrap();
    assert_eq!(server.local_addr(), Some(addr));

    let response = send_raw(addr, b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
    let (head, body) = split_response(&response);

    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("Content-Type: text/html; charset=utf-8"));
    assert!(head.contains("Content-Length: 5"));
    assert_eq!(body, "hello");

    server.destroy().await;
}

#[tokio::test]
async fn test_unregistered_path_is_404() {
    let mut server = Server::create(Some(local_config()));
    server.add_route("GET", "/", |_, resp| resp.html(200, "hello")).unwrap();
    let addr = server.start_background().await.unwrap();

    let response = send_raw(addr, b"GET /missing HTTP/1.1\r\n\r\n").await;
    let (head, body) = split_response(&response);

    assert!(head.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert!(head.contains("Content-Type: text/html"));
    assert!(body.contains("Not Found"));
    assert!(body.contains("<h1>404 Error</h1>"));

    server.destroy().await;
}

#[tokio::test]
async fn test_method_must_match() {
    let mut server = Server::create(Some(local_config()));
    server.add_route("POST", "/submit", |req, resp| {
        let name = req
            .form()
            .into_iter()
            .find(|(k, _)| k == "name")
            .map(|(_, v)| v)
            .unwrap_or_default();
        resp.text(201, format!("created {}", name));
    })
    .unwrap();
    let addr = server.start_background().await.unwrap();

    let response = send_raw(addr, b"GET /submit HTTP/1.1\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 404"));

    let response = send_raw(
        addr,
        b"POST /submit HTTP/1.1\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: 13\r\n\r\nname=Jane+Doe",
    )
    .await;
    let (head, body) = split_response(&response);
    assert!(head.starts_with("HTTP/1.1 201 Created\r\n"));
    assert_eq!(body, "created Jane Doe");

    server.destroy().await;
}

#[tokio::test]
async fn test_middleware_runs_even_without_route() {
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));

    let mut server = Server::create(Some(local_config()));
    let counter = Arc::clone(&first);
    server
        .add_middleware(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    let counter = Arc::clone(&second);
    server
        .add_middleware(move |_, resp| {
            counter.fetch_add(1, Ordering::SeqCst);
            resp.set_header("X-Served-By", "minihttpd");
        })
        .unwrap();
    let addr = server.start_background().await.unwrap();

    let response = send_raw(addr, b"GET /nothing-here HTTP/1.1\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 404"));
    assert!(response.contains("X-Served-By: minihttpd\r\n"));
    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 1);

    server.destroy().await;
}

#[tokio::test]
async fn test_query_parameters_reach_handler() {
    let mut server = Server::create(Some(local_config()));
    server
        .add_route("GET", "/search", |req, resp| {
            let q = req.param("q").unwrap_or_default();
            resp.json(200, format!("{{\"q\":\"{}\"}}", q));
        })
        .unwrap();
    let addr = server.start_background().await.unwrap();

    let response = send_raw(addr, b"GET /search?q=rust%20lang&page=2 HTTP/1.1\r\n\r\n").await;
    let (head, body) = split_response(&response);
    assert!(head.contains("Content-Type: application/json"));
    assert_eq!(body, "{\"q\":\"rust lang\"}");

    server.destroy().await;
}

#[tokio::test]
async fn test_concurrent_connections() {
    let mut server = Server::create(Some(local_config()));
    server
        .add_route("GET", "/slow", |_, resp| {
            std::thread::sleep(Duration::from_millis(50));
            resp.text(200, "done");
        })
        .unwrap();
    let addr = server.start_background().await.unwrap();

    let tasks: Vec<_> = (0..16)
        .map(|_| tokio::spawn(send_raw(addr, b"GET /slow HTTP/1.1\r\n\r\n")))
        .collect();
    for task in tasks {
        let response = task.await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.ends_with("done"));
    }

    server.destroy().await;
}

#[tokio::test]
async fn test_registration_rejected_while_running() {
    let mut server = Server::create(Some(local_config()));
    let addr = server.start_background().await.unwrap();

    assert_eq!(
        server.add_route("GET", "/late", |_, resp| resp.text(200, "late")),
        Err(Exception::ServerRunning)
    );

    let response = send_raw(addr, b"GET /late HTTP/1.1\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 404"));

    server.destroy().await;
}

#[tokio::test]
async fn test_stop_closes_listener() {
    let mut server = Server::create(Some(local_config()));
    server.add_route("GET", "/", |_, resp| resp.text(200, "ok")).unwrap();
    let addr = server.start_background().await.unwrap();
    let handle = server.shutdown_handle();
    assert!(handle.is_running());

    handle.stop();
    assert!(!server.is_running());
    server.destroy().await;

    assert!(!handle.is_running());
    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn test_access_log_written() {
    let dir = tempfile::tempdir().unwrap();
    let access = dir.path().join("access.log");
    let error = dir.path().join("error.log");
    let config = local_config().with_log_files(access.to_str().unwrap(), error.to_str().unwrap());

    let mut server = Server::create(Some(config));
    server.add_route("GET", "/", |_, resp| resp.html(200, "hello")).unwrap();
    let addr = server.start_background().await.unwrap();

    send_raw(addr, b"GET / HTTP/1.1\r\n\r\n").await;
    send_raw(addr, b"GET /missing HTTP/1.1\r\n\r\n").await;
    server.destroy().await;

    let content = std::fs::read_to_string(&access).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("127.0.0.1 - - ["));
    assert!(lines[0].ends_with("\"GET / HTTP/1.1\" 200 5"));
    assert!(lines[1].contains("\"GET /missing HTTP/1.1\" 404 "));
}

#[tokio::test]
async fn test_bind_failure_is_logged() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = occupied.local_addr().unwrap().port();

    let dir = tempfile::tempdir().unwrap();
    let error = dir.path().join("error.log");
    let config = local_config()
        .with_port(port)
        .with_log_files("", error.to_str().unwrap());

    let mut server = Server::create(Some(config));
    assert_eq!(server.start_background().await, Err(Exception::BindFailed));

    let content = std::fs::read_to_string(&error).unwrap();
    assert!(content.contains(&format!("Failed to bind to 127.0.0.1:{}", port)));
    assert!(content.starts_with('['));
}

#[tokio::test]
async fn test_static_file_route() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("static")).unwrap();
    std::fs::write(dir.path().join("static").join("style.css"), "body { margin: 0; }").unwrap();

    let config = local_config().with_document_root(dir.path().to_str().unwrap());
    let mut server = Server::create(Some(config));
    let root = std::path::PathBuf::from(server.config().document_root());
    let stylesheet = root.join("static").join("style.css");
    server
        .add_route("GET", "/static/style.css", move |_, resp| {
            let _ = resp.file(&stylesheet);
        })
        .unwrap();
    let missing = root.join("static").join("missing.css");
    server
        .add_route("GET", "/static/missing.css", move |_, resp| {
            let _ = resp.file(&missing);
        })
        .unwrap();
    let addr = server.start_background().await.unwrap();

    let response = send_raw(addr, b"GET /static/style.css HTTP/1.1\r\n\r\n").await;
    let (head, body) = split_response(&response);
    assert!(head.starts_with("HTTP/1.1 200 OK"));
    assert!(head.contains("Content-Type: text/css"));
    assert_eq!(body, "body { margin: 0; }");

    let response = send_raw(addr, b"GET /static/missing.css HTTP/1.1\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 404 Not Found"));
    assert!(response.contains("File not found"));

    server.destroy().await;
}
