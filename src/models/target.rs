use anyhow::{anyhow, bail, Context};
use url::{Host, Url};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

/// Where every round is sent, resolved once from the target url.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
    // path plus `?query`, exactly as written on the request line
    pub path: String,
}

impl Target {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let url = Url::parse(raw).with_context(|| format!("无效的目标地址: {raw}"))?;
        let scheme = match url.scheme() {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            other => bail!("不支持的协议: {other}, 只支持http和https"),
        };
        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => return Err(anyhow!("目标地址缺少host: {raw}")),
        };
        // url 对 http/https 会补全默认端口 80/443
        let port = url
            .port_or_known_default()
            .ok_or_else(|| anyhow!("无法确定端口: {raw}"))?;
        let mut path = url.path().to_string();
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }
        Ok(Target {
            scheme,
            host,
            port,
            path,
        })
    }

    pub fn is_tls(&self) -> bool {
        self.scheme == Scheme::Https
    }

    /// `host:port` as sent in the `Host` header; IPv6 literals are bracketed.
    pub fn authority(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports() {
        let plain = Target::parse("http://example.com/v1/chat").unwrap();
        assert_eq!(plain.port, 80);
        assert_eq!(plain.scheme, Scheme::Http);
        let tls = Target::parse("https://example.com/v1/chat").unwrap();
        assert_eq!(tls.port, 443);
        assert!(tls.is_tls());
    }

    #[test]
    fn test_path_keeps_query() {
        let target =
            Target::parse("http://127.0.0.1:8080/v1/chat/completions?stream=true").unwrap();
        assert_eq!(target.host, "127.0.0.1");
        assert_eq!(target.port, 8080);
        assert_eq!(target.path, "/v1/chat/completions?stream=true");
        assert_eq!(target.authority(), "127.0.0.1:8080");
    }

    #[test]
    fn test_empty_path_becomes_root() {
        let target = Target::parse("http://localhost:9000").unwrap();
        assert_eq!(target.path, "/");
    }

    #[test]
    fn test_ipv6_authority() {
        let target = Target::parse("http://[::1]:8080/x").unwrap();
        assert_eq!(target.host, "::1");
        assert_eq!(target.authority(), "[::1]:8080");
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(Target::parse("ftp://example.com/").is_err());
        assert!(Target::parse("not a url").is_err());
    }
}
