// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 连接处理器
//!
//! 每个已接受的连接都按以下顺序处理，且只处理一个请求：
//!
//! `READ → PARSE → MIDDLEWARE → ROUTE_MATCH → {HANDLE | 404} → SERIALIZE → SEND → LOG → CLOSED`
//!
//! - READ：单次读取，最多 [`BUFFER_SIZE`] 字节；读到 0 字节、读取出错或超时都直接关闭连接，不发送响应。
//! - PARSE：解析失败不会中断流程，缺失的字段保持为空。
//! - MIDDLEWARE：无条件执行整条中间件链。
//! - ROUTE_MATCH：精确匹配第一个路由；没有匹配时生成 404 错误页。
//! - SEND：先发送响应头，再发送响应体；写入出错或超时同样直接关闭连接。
//! - LOG：响应发送成功后写入一条访问日志。

use crate::{
    logger::LogSinks,
    param::BUFFER_SIZE,
    request::Request,
    response::Response,
    router::{MiddlewareChain, RouteTable},
};

use log::{debug, error, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use std::{future::Future, net::SocketAddr, sync::Arc, time::Duration};

/// 服务器启动时冻结的处理流水线，在所有连接任务之间只读共享
pub(crate) struct Pipeline {
    routes: RouteTable,
    middleware: MiddlewareChain,
    logs: Arc<LogSinks>,
    request_timeout: Option<Duration>,
}

impl Pipeline {
    pub(crate) fn new(
        routes: RouteTable,
        middleware: MiddlewareChain,
        logs: Arc<LogSinks>,
        request_timeout: Option<Duration>,
    ) -> Self {
        Self {
            routes,
            middleware,
            logs,
            request_timeout,
        }
    }

    pub(crate) fn logs(&self) -> &LogSinks {
        &self.logs
    }

    /// MIDDLEWARE → ROUTE_MATCH → {HANDLE | 404}
    pub(crate) fn dispatch(&self, request: &Request, id: u128) -> Response {
        let mut response = Response::new();

        self.middleware.run(request, &mut response);

        match self.routes.find(request.method(), request.path()) {
            Some(route) => {
                debug!("[ID{}]匹配路由：{} {}", id, route.method(), route.path());
                (route.handler())(request, &mut response);
            }
            None => {
                debug!(
                    "[ID{}]没有匹配的路由：{} {}，返回404",
                    id,
                    request.method().unwrap_or("-"),
                    request.path().unwrap_or("-")
                );
                response.error(404, "Not Found");
            }
        }
        response
    }
}

/// 在可选的期限内等待一个 future；超时返回 `None`
async fn with_deadline<F: Future>(deadline: Option<Duration>, future: F) -> Option<F::Output> {
    match deadline {
        Some(d) => tokio::time::timeout(d, future).await.ok(),
        None => Some(future.await),
    }
}

/// 处理单个连接，直到连接关闭
pub(crate) async fn handle_connection<S>(
    stream: &mut S,
    remote: SocketAddr,
    id: u128,
    pipeline: &Pipeline,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buffer = vec![0u8; BUFFER_SIZE];

    let n = match with_deadline(pipeline.request_timeout, stream.read(&mut buffer)).await {
        Some(Ok(0)) => {
            debug!("[ID{}]客户端未发送数据即关闭连接", id);
            return;
        }
        Some(Ok(n)) => n,
        Some(Err(e)) => {
            error!("[ID{}]读取连接时遇到错误: {}", id, e);
            return;
        }
        None => {
            warn!("[ID{}]读取请求超时，关闭连接", id);
            return;
        }
    };
    debug!("[ID{}]收到{}字节", id, n);

    let request = Request::parse(&buffer[..n], remote, id);
    let response = pipeline.dispatch(&request, id);

    let head = response.head_bytes();
    let body = response.body();
    let sent = with_deadline(pipeline.request_timeout, async {
        stream.write_all(&head).await?;
        if !body.is_empty() {
            stream.write_all(body).await?;
        }
        stream.flush().await
    })
    .await;
    match sent {
        Some(Ok(())) => {}
        Some(Err(e)) => {
            error!("[ID{}]发送响应失败: {}", id, e);
            return;
        }
        None => {
            warn!("[ID{}]发送响应超时，关闭连接", id);
            return;
        }
    }
    debug!(
        "[ID{}]响应已发送：{} {}，{}字节",
        id,
        response.status_code(),
        response.information(),
        response.body_length()
    );

    pipeline.logs.access(&request, &response);

    if let Err(e) = stream.shutdown().await {
        debug!("[ID{}]关闭连接时出错: {}", id, e);
    }
}
