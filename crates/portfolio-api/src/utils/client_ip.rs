//! 클라이언트 IP 추출.
//!
//! 기본은 TCP 피어 주소입니다. `X-Forwarded-For`, `X-Real-IP` 헤더는
//! [`ProxyPolicy`]가 요청 extension으로 주입되어 있고 피어가 신뢰하는 프록시일 때만 읽습니다.

use std::convert::Infallible;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, Extensions, HeaderMap},
};
use portfolio_core::ServerConfig;

/// 프록시 헤더 신뢰 정책.
///
/// 신뢰 목록이 비어 있으면 헤더를 전혀 읽지 않습니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyPolicy {
    trusted: Vec<IpAddr>,
}

impl ProxyPolicy {
    /// 서버 설정에서 생성. `trust_proxy`가 꺼져 있으면 아무것도 신뢰하지 않습니다.
    pub fn from_config(server: &ServerConfig) -> Self {
        if server.trust_proxy {
            Self::trusting(server.trusted_proxies.iter().copied())
        } else {
            Self::default()
        }
    }

    /// 주어진 프록시 주소를 신뢰하는 정책.
    pub fn trusting(proxies: impl IntoIterator<Item = IpAddr>) -> Self {
        Self {
            trusted: proxies.into_iter().map(|ip| ip.to_canonical()).collect(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.trusted.is_empty()
    }

    fn trusts(&self, ip: &IpAddr) -> bool {
        self.trusted.contains(&ip.to_canonical())
    }

    /// 프록시 헤더에서 원 클라이언트 주소를 찾습니다.
    ///
    /// `X-Forwarded-For`는 오른쪽부터 읽어 신뢰하지 않는 첫 주소를 씁니다.
    /// 모든 홉이 신뢰 프록시이면 가장 왼쪽 주소입니다.
    fn forwarded_client(&self, headers: &HeaderMap) -> Option<IpAddr> {
        let hops: Vec<IpAddr> = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .map(|list| list.split(',').filter_map(|ip| ip.trim().parse().ok()).collect())
            .unwrap_or_default();

        let from_forwarded = hops
            .iter()
            .rev()
            .find(|ip| !self.trusts(ip))
            .or_else(|| hops.first())
            .copied();
        if from_forwarded.is_some() {
            return from_forwarded;
        }

        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|ip| ip.trim().parse().ok())
    }
}

/// 헤더와 연결 정보에서 클라이언트 IP 추출.
///
/// 연결 정보가 없으면(`into_make_service_with_connect_info` 없이 서빙) 127.0.0.1입니다.
pub fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> IpAddr {
    let Some(peer) = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_canonical())
    else {
        return IpAddr::V4(Ipv4Addr::LOCALHOST);
    };

    match extensions.get::<ProxyPolicy>() {
        Some(policy) if policy.trusts(&peer) => policy.forwarded_client(headers).unwrap_or(peer),
        _ => peer,
    }
}

/// 클라이언트 IP extractor. 실패하지 않습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientAddr(pub IpAddr);

impl<S> FromRequestParts<S> for ClientAddr
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(client_ip(&parts.headers, &parts.extensions)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn from_peer(peer: &str, policy: Option<ProxyPolicy>) -> Extensions {
        let mut extensions = Extensions::new();
        extensions.insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
        if let Some(policy) = policy {
            extensions.insert(policy);
        }
        extensions
    }

    fn spoofed_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        headers
    }

    #[test]
    fn test_headers_ignored_without_policy() {
        let extensions = from_peer("192.0.2.10:5555", None);
        assert_eq!(client_ip(&spoofed_headers(), &extensions), ip("192.0.2.10"));
    }

    #[test]
    fn test_headers_ignored_when_trust_proxy_is_off() {
        let policy = ProxyPolicy::from_config(&ServerConfig::default());
        assert!(!policy.is_enabled());

        let extensions = from_peer("127.0.0.1:5555", Some(policy));
        assert_eq!(client_ip(&spoofed_headers(), &extensions), ip("127.0.0.1"));
    }

    #[test]
    fn test_headers_ignored_from_untrusted_peer() {
        let policy = ProxyPolicy::trusting([ip("10.0.0.1")]);
        let extensions = from_peer("192.0.2.10:5555", Some(policy));

        assert_eq!(client_ip(&spoofed_headers(), &extensions), ip("192.0.2.10"));
    }

    #[test]
    fn test_trusted_proxy_uses_rightmost_untrusted_hop() {
        let policy = ProxyPolicy::trusting([ip("10.0.0.1"), ip("10.0.0.2")]);
        let extensions = from_peer("10.0.0.2:443", Some(policy));

        // 가장 왼쪽 항목은 클라이언트가 임의로 넣을 수 있음
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("1.1.1.1, 203.0.113.7, 10.0.0.1"),
        );

        assert_eq!(client_ip(&headers, &extensions), ip("203.0.113.7"));
    }

    #[test]
    fn test_trusted_proxy_real_ip_fallback() {
        let mut config = ServerConfig::default();
        config.trust_proxy = true;
        let extensions = from_peer("127.0.0.1:8080", Some(ProxyPolicy::from_config(&config)));

        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("garbage"));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));

        assert_eq!(client_ip(&headers, &extensions), ip("198.51.100.2"));
    }

    #[test]
    fn test_trusted_proxy_without_headers_is_peer() {
        let policy = ProxyPolicy::trusting([ip("127.0.0.1")]);
        let extensions = from_peer("127.0.0.1:8080", Some(policy));

        assert_eq!(client_ip(&HeaderMap::new(), &extensions), ip("127.0.0.1"));
    }

    #[test]
    fn test_default_is_localhost() {
        let ip = client_ip(&spoofed_headers(), &Extensions::new());
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::LOCALHOST));
    }
}
