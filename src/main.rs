// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 示例服务器
//!
//! 加载配置、注册几个演示路由与一个日志中间件，然后启动服务器。
//! 标准输入上提供一个简单的管理控制台（stop / status / help）。

use minihttpd::{Request, Response, Server, ServerConfig, ShutdownHandle};

use log::{error, info, warn};
use serde_json::json;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    runtime::Builder,
};

use std::path::PathBuf;

const INDEX_PAGE: &str = "<!DOCTYPE html>\
<html><head><title>minihttpd</title><link rel=\"stylesheet\" href=\"/static/style.css\"></head>\
<body><h1>minihttpd</h1><p>It works.</p>\
<ul><li><a href=\"/api/status\">/api/status</a></li><li><a href=\"/test\">/test</a></li></ul>\
</body></html>";

fn main() {
    if let Err(e) = log4rs::init_file("config/log4rs.yaml", Default::default()) {
        eprintln!("无法初始化日志系统：{}", e);
    }

    let config = ServerConfig::from_toml("config/development.toml");
    info!("配置文件已载入");
    info!("document root: {}", config.document_root());

    let runtime = match Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!("无法创建异步运行时：{}", e);
            return;
        }
    };

    let document_root = PathBuf::from(config.document_root());
    let mut server = Server::create(Some(config));
    let handle = server.shutdown_handle();

    if let Err(e) = register(&mut server, &handle, document_root) {
        error!("注册路由失败：{}", e);
        return;
    }

    for route in server.routes().iter() {
        info!("已注册路由：{} {}", route.method(), route.path());
    }

    runtime.spawn(console(handle));

    let result = runtime.block_on(async move {
        let result = server.start().await;
        server.destroy().await;
        result
    });
    if let Err(e) = result {
        error!("服务器启动失败：{}", e);
    }
    info!("服务器已退出");

    // 控制台任务阻塞在标准输入上，不等待它结束
    runtime.shutdown_background();
}

fn register(
    server: &mut Server,
    handle: &ShutdownHandle,
    document_root: PathBuf,
) -> Result<(), minihttpd::Exception> {
    server.add_middleware(log_request)?;

    server.add_route("GET", "/", |_, resp| resp.html(200, INDEX_PAGE))?;

    let status = handle.clone();
    server.add_route("GET", "/api/status", move |_, resp| {
        let body = json!({
            "status": if status.is_running() { "running" } else { "stopping" },
            "active_connections": status.active_connections(),
        });
        resp.json(200, body.to_string());
    })?;

    server.add_route("GET", "/test", |req, resp| {
        let body = format!(
            "method: {}\npath: {}\npeer: {}\nhost: {}\n",
            req.method().unwrap_or("-"),
            req.path().unwrap_or("-"),
            req.remote_addr(),
            req.host().unwrap_or("-"),
        );
        resp.text(200, body);
    })?;

    let stylesheet = document_root.join("static").join("style.css");
    server.add_route("GET", "/static/style.css", move |_, resp| {
        if let Err(e) = resp.file(&stylesheet) {
            warn!("无法提供{}：{}", stylesheet.display(), e);
        }
    })?;

    Ok(())
}

/// 记录每一个请求，包括无法解析的请求
fn log_request(req: &Request, _resp: &mut Response) {
    info!(
        "{} {} {} from {}",
        req.method().unwrap_or("-"),
        req.path().unwrap_or("-"),
        req.protocol().unwrap_or("-"),
        req.remote_addr(),
    );
}

/// 交互式管理控制台
async fn console(handle: ShutdownHandle) {
    let mut reader = BufReader::new(tokio::io::stdin());
    let mut input = String::new();
    loop {
        input.clear();
        match reader.read_line(&mut input).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        match input.trim() {
            "stop" => {
                handle.stop();
                println!("停机指令已激活，服务器正在关闭...");
                break;
            }
            "help" => {
                println!("== minihttpd Help ==");
                println!("stop   - 发出停机信号");
                println!("status - 查看当前服务器运行状态");
                println!("help   - 显示此帮助信息");
                println!("====================");
            }
            "status" => {
                println!("== minihttpd 状态 ===");
                println!("运行中: {}", handle.is_running());
                println!("当前活跃连接数: {}", handle.active_connections());
                println!("====================");
            }
            "" => {}
            cmd => {
                println!("无效的命令：{}", cmd);
            }
        }
    }
}
