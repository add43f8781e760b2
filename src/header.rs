// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 报文头容器
//!
//! 请求与响应共用的定长头部容器：
//! - 按插入顺序保存，最多 [`MAX_HEADERS`] 条；
//! - 查找时名称大小写不敏感，返回最早插入的匹配项；
//! - 不做原地更新，同名头部重复设置会产生多个条目；
//! - 名称不超过 [`MAX_HEADER_NAME_LEN`] 字节，取值不超过 [`MAX_HEADER_VALUE_LEN`] 字节。

use crate::param::{MAX_HEADERS, MAX_HEADER_NAME_LEN, MAX_HEADER_VALUE_LEN};

/// 单个头部条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderEntry {
    name: String,
    value: String,
}

impl HeaderEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<HeaderEntry>,
}

impl Headers {
    pub fn new() -> Self {
        Self {
            entries: Vec::with_capacity(MAX_HEADERS),
        }
    }

    /// 追加一个头部条目。容器已满或名称、取值超长时丢弃并返回 `false`。
    pub fn set(&mut self, name: &str, value: &str) -> bool {
        if self.entries.len() >= MAX_HEADERS {
            return false;
        }
        if name.len() > MAX_HEADER_NAME_LEN || value.len() > MAX_HEADER_VALUE_LEN {
            return false;
        }
        self.entries.push(HeaderEntry {
            name: name.to_string(),
            value: value.to_string(),
        });
        true
    }

    /// 线性查找，名称比较忽略 ASCII 大小写
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
            .map(|entry| entry.value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HeaderEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= MAX_HEADERS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_get_is_case_insensitive() {
        let mut headers = Headers::new();
        headers.set("Content-Type", "text/html");

        assert_eq!(headers.get("content-type"), Some("text/html"));
        assert_eq!(headers.get("Content-Type"), Some("text/html"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("text/html"));
    }

    #[test]
    fn test_get_missing() {
        let headers = Headers::new();
        assert_eq!(headers.get("Host"), None);
        assert!(!headers.contains("Host"));
    }

    #[test]
    fn test_duplicate_names_first_wins() {
        let mut headers = Headers::new();
        headers.set("X-Trace", "first");
        headers.set("x-trace", "second");

        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("X-TRACE"), Some("first"));
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut headers = Headers::new();
        headers.set("B", "2");
        headers.set("A", "1");
        headers.set("C", "3");

        let names: Vec<&str> = headers.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
    }

    #[test]
    fn test_capacity_is_enforced() {
        let mut headers = Headers::new();
        for i in 0..MAX_HEADERS {
            assert!(headers.set(&format!("X-{}", i), "v"));
        }
        assert!(headers.is_full());
        assert!(!headers.set("X-Overflow", "v"));
        assert_eq!(headers.len(), MAX_HEADERS);
        assert_eq!(headers.get("X-Overflow"), None);
    }

    #[test]
    fn test_length_limits_are_enforced() {
        let mut headers = Headers::new();
        assert!(!headers.set(&"N".repeat(MAX_HEADER_NAME_LEN + 1), "v"));
        assert!(!headers.set("X-Long", &"v".repeat(MAX_HEADER_VALUE_LEN + 1)));
        assert!(headers.is_empty());

        assert!(headers.set(&"N".repeat(MAX_HEADER_NAME_LEN), &"v".repeat(MAX_HEADER_VALUE_LEN)));
        assert_eq!(headers.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_lookup_ignores_ascii_case(name in "[A-Za-z][A-Za-z0-9-]{0,30}", value in "[ -~]{0,40}") {
            let mut headers = Headers::new();
            headers.set(&name, &value);
            prop_assert_eq!(headers.get(&name.to_ascii_lowercase()), Some(value.as_str()));
            prop_assert_eq!(headers.get(&name.to_ascii_uppercase()), Some(value.as_str()));
        }

        #[test]
        fn prop_never_exceeds_capacity(count in 0usize..200) {
            let mut headers = Headers::new();
            for i in 0..count {
                headers.set(&format!("H{}", i), "v");
            }
            prop_assert_eq!(headers.len(), count.min(MAX_HEADERS));
        }
    }
}
