// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路由表与中间件链
//!
//! - 路由表：按注册顺序保存 (方法, 路径) → 处理函数 的绑定，精确匹配，先注册者优先。
//! - 中间件链：按注册顺序无条件执行，不能中断后续流程。
//!
//! 两者都是只追加的定长容器，超出容量的注册会被拒绝且不修改已有内容。
//! 处理函数需要的上下文通过闭包捕获，而不是额外的 user data 指针。

use crate::{
    exception::Exception,
    param::{MAX_MIDDLEWARE, MAX_ROUTES},
    request::Request,
    response::Response,
};

use std::{fmt, sync::Arc};

/// 处理函数：读取请求，填充响应。返回值不携带任何信号。
pub type Handler = Arc<dyn Fn(&Request, &mut Response) + Send + Sync>;

#[derive(Clone)]
pub struct Route {
    method: String,
    path: String,
    handler: Handler,
}

impl Route {
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// 方法与路径都逐字节相等才算匹配；缺失的方法或路径永远不匹配
    fn matches(&self, method: Option<&str>, path: Option<&str>) -> bool {
        match (method, path) {
            (Some(method), Some(path)) => self.method == method && self.path == path,
            _ => false,
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Default, Debug)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    pub fn add<F>(&mut self, method: &str, path: &str, handler: F) -> Result<(), Exception>
    where
        F: Fn(&Request, &mut Response) + Send + Sync + 'static,
    {
        if self.routes.len() >= MAX_ROUTES {
            return Err(Exception::RouteTableFull);
        }
        self.routes.push(Route {
            method: method.to_string(),
            path: path.to_string(),
            handler: Arc::new(handler),
        });
        Ok(())
    }

    /// 线性查找第一个匹配的路由
    pub fn find(&self, method: Option<&str>, path: Option<&str>) -> Option<&Route> {
        self.routes.iter().find(|route| route.matches(method, path))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[derive(Clone, Default)]
pub struct MiddlewareChain {
    entries: Vec<Handler>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn add<F>(&mut self, middleware: F) -> Result<(), Exception>
    where
        F: Fn(&Request, &mut Response) + Send + Sync + 'static,
    {
        if self.entries.len() >= MAX_MIDDLEWARE {
            return Err(Exception::MiddlewareChainFull);
        }
        self.entries.push(Arc::new(middleware));
        Ok(())
    }

    /// 按注册顺序执行全部中间件
    pub fn run(&self, request: &Request, response: &mut Response) {
        for middleware in &self.entries {
            middleware(request, &mut *response);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("len", &self.entries.len())
            .finish()
    }
}
