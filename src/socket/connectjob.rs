use crate::base::context::IoResultExt;
use crate::base::neterror::NetError;
use crate::config::SslConfig;
use crate::socket::client::SocketType;
use crate::socket::proxy::{ProxySettings, ProxyType};
use crate::socket::tls::TlsConnectorCache;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use url::Url;

/// Upper bound on a proxy's reply to `CONNECT`.
const MAX_TUNNEL_RESPONSE: usize = 8 * 1024;

/// Manages the connection process: DNS -> TCP -> proxy tunnel -> TLS.
///
/// The caller bounds the whole job with the connect timeout.
pub struct ConnectJob<'a> {
    pub url: &'a Url,
    pub proxy: Option<&'a ProxySettings>,
    pub ssl: &'a SslConfig,
    pub tls: &'a TlsConnectorCache,
}

impl ConnectJob<'_> {
    pub async fn connect(&self) -> Result<SocketType, NetError> {
        let host = self
            .url
            .host_str()
            .ok_or_else(|| NetError::invalid_url(self.url.as_str()))?;
        let port = self
            .url
            .port_or_known_default()
            .ok_or_else(|| NetError::invalid_url(self.url.as_str()))?;

        let stream = match self.proxy {
            Some(proxy) => {
                let (proxy_host, proxy_port) = proxy
                    .host_port()
                    .ok_or_else(|| NetError::invalid_url(proxy.url.as_str()))?;
                if proxy.proxy_type() == ProxyType::Socks {
                    return Err(NetError::connect(
                        format!("{}:{}", proxy_host, proxy_port),
                        "SOCKS proxies are not supported",
                    ));
                }
                let mut stream = dial(proxy_host, proxy_port).await?;
                if self.url.scheme() == "https" {
                    establish_tunnel(&mut stream, proxy, host, port).await?;
                }
                stream
            }
            None => dial(host, port).await?,
        };

        if self.url.scheme() == "https" {
            let tls = self.tls.handshake(self.ssl, host, port, stream).await?;
            tracing::debug!(host = %host, port, "tls established");
            Ok(SocketType::Ssl(tls))
        } else {
            Ok(SocketType::Tcp(stream))
        }
    }
}

/// Resolve `host` and connect to the first address that accepts.
async fn dial(host: &str, port: u16) -> Result<TcpStream, NetError> {
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    let addrs: Vec<_> = tokio::net::lookup_host((bare, port))
        .await
        .dns_context(host, port)?
        .collect();

    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                let _ = stream.set_nodelay(true);
                tracing::debug!(host = %host, addr = %addr, "tcp connected");
                return Ok(stream);
            }
            Err(e) => {
                tracing::debug!(addr = %addr, error = %e, "tcp connect failed");
                last_err = Some(e);
            }
        }
    }
    let err = last_err.unwrap_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses resolved")
    });
    Err(err).connection_context(host, port)
}

/// Send `CONNECT host:port` and wait for a 2xx reply.
async fn establish_tunnel(
    stream: &mut TcpStream,
    proxy: &ProxySettings,
    host: &str,
    port: u16,
) -> Result<(), NetError> {
    let target = format!("{}:{}", host, port);
    let proxy_origin = proxy.url.as_str().trim_end_matches('/').to_string();

    let mut request = format!("CONNECT {} HTTP/1.1\r\nHost: {}\r\n", target, target);
    if let Some(auth) = proxy.authorization() {
        request.push_str(&format!("Proxy-Authorization: {}\r\n", auth));
    }
    request.push_str("\r\n");
    stream
        .write_all(request.as_bytes())
        .await
        .map_err(|e| NetError::connect(&proxy_origin, e))?;

    let mut reply = Vec::with_capacity(512);
    let mut chunk = [0u8; 512];
    while !reply.windows(4).any(|w| w == b"\r\n\r\n") {
        if reply.len() > MAX_TUNNEL_RESPONSE {
            return Err(NetError::connect(&proxy_origin, "CONNECT reply too large"));
        }
        let n = stream
            .read(&mut chunk)
            .await
            .map_err(|e| NetError::connect(&proxy_origin, e))?;
        if n == 0 {
            return Err(NetError::connect(
                &proxy_origin,
                "proxy closed the connection during CONNECT",
            ));
        }
        reply.extend_from_slice(&chunk[..n]);
    }

    let status = parse_status(&reply)
        .ok_or_else(|| NetError::connect(&proxy_origin, "malformed CONNECT reply"))?;
    if !(200..300).contains(&status) {
        return Err(NetError::connect(
            &proxy_origin,
            format!("CONNECT {} rejected with status {}", target, status),
        ));
    }
    tracing::debug!(proxy = %proxy_origin, target = %target, "tunnel established");
    Ok(())
}

/// Status code of an `HTTP/1.x NNN reason` line.
fn parse_status(reply: &[u8]) -> Option<u16> {
    let line_end = reply.windows(2).position(|w| w == b"\r\n")?;
    let line = std::str::from_utf8(&reply[..line_end]).ok()?;
    let mut parts = line.split_whitespace();
    if !parts.next()?.starts_with("HTTP/1.") {
        return None;
    }
    parts.next()?.parse().ok()
}
