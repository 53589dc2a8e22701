// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stream key to gateway host lookup.

use std::collections::BTreeMap;

/// Maps each target stream key to the gateway that serves it.
#[derive(Debug, Clone, Default)]
pub struct GatewayRegistry {
    hosts: BTreeMap<String, String>,
}

impl GatewayRegistry {
    pub fn new(hosts: BTreeMap<String, String>) -> Self {
        Self { hosts }
    }

    /// The update URL for `target`, or `None` if no gateway is registered.
    ///
    /// Bare hosts are reached over HTTPS. A host that already names its
    /// scheme is used as the base URL unchanged.
    pub fn update_url(&self, target: &str) -> Option<String> {
        let host = self.hosts.get(target)?.trim();
        if host.is_empty() {
            return None;
        }
        let base = if host.starts_with("http://") || host.starts_with("https://") {
            host.trim_end_matches('/').to_string()
        } else {
            format!("https://{host}")
        };
        Some(format!("{base}/live/video-to-video/{target}/update"))
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}
