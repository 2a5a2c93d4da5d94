use crate::{Probe, ProbeError, Result};
use hostlog_common::types::ConnectionDescriptor;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::PathBuf;

const TABLES: [&str; 4] = ["tcp", "tcp6", "udp", "udp6"];

/// Open sockets from the kernel tables under `/proc/net`.
///
/// Only Linux exposes these tables; other platforms report
/// [`ProbeError::UnsupportedPlatform`].
pub struct ConnectionProbe {
    root: PathBuf,
    os: &'static str,
}

impl ConnectionProbe {
    pub fn new() -> Self {
        Self::with_root("/proc/net", std::env::consts::OS)
    }

    pub fn with_root(root: impl Into<PathBuf>, os: &'static str) -> Self {
        Self {
            root: root.into(),
            os,
        }
    }
}

impl Default for ConnectionProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl Probe for ConnectionProbe {
    type Output = Vec<ConnectionDescriptor>;

    fn name(&self) -> &'static str {
        "network_connections"
    }

    fn probe(&mut self) -> Result<Vec<ConnectionDescriptor>> {
        if self.os != "linux" {
            return Err(ProbeError::UnsupportedPlatform(self.os));
        }

        let mut connections = Vec::new();
        let mut tables_read = 0;
        for table in TABLES {
            let path = self.root.join(table);
            match std::fs::read_to_string(&path) {
                Ok(content) => {
                    tables_read += 1;
                    connections.extend(parse_proc_net(&content, table));
                }
                // tcp6/udp6 are absent when IPv6 is disabled
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(path = %path.display(), "Socket table not present");
                }
                Err(source) => return Err(ProbeError::Io { path, source }),
            }
        }

        if tables_read == 0 {
            return Err(ProbeError::Unavailable(format!(
                "no socket tables under {}",
                self.root.display()
            )));
        }
        Ok(connections)
    }
}

/// Parses one `/proc/net/{tcp,tcp6,udp,udp6}` table. The header line and
/// malformed rows are skipped.
pub fn parse_proc_net(content: &str, protocol: &str) -> Vec<ConnectionDescriptor> {
    let is_udp = protocol.starts_with("udp");
    content
        .lines()
        .skip(1)
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let _slot = fields.next()?;
            let (local_addr, local_port) = parse_endpoint(fields.next()?)?;
            let (remote_addr, remote_port) = parse_endpoint(fields.next()?)?;
            let state = fields.next()?;
            Some(ConnectionDescriptor {
                protocol: protocol.to_string(),
                local_addr,
                local_port,
                remote_addr,
                remote_port,
                state: if is_udp {
                    "NONE".to_string()
                } else {
                    tcp_state(state).to_string()
                },
            })
        })
        .collect()
}

/// Decodes `0100007F:1F90` style endpoints. Address words are printed by the
/// kernel in host byte order.
fn parse_endpoint(raw: &str) -> Option<(String, u16)> {
    let (addr_hex, port_hex) = raw.split_once(':')?;
    let port = u16::from_str_radix(port_hex, 16).ok()?;
    let addr = match addr_hex.len() {
        8 => {
            let word = u32::from_str_radix(addr_hex, 16).ok()?;
            Ipv4Addr::from(word.to_ne_bytes()).to_string()
        }
        32 => {
            let mut octets = [0u8; 16];
            for (i, chunk) in octets.chunks_exact_mut(4).enumerate() {
                let word = u32::from_str_radix(addr_hex.get(i * 8..i * 8 + 8)?, 16).ok()?;
                chunk.copy_from_slice(&word.to_ne_bytes());
            }
            Ipv6Addr::from(octets).to_string()
        }
        _ => return None,
    };
    Some((addr, port))
}

fn tcp_state(code: &str) -> &'static str {
    match code {
        "01" => "ESTABLISHED",
        "02" => "SYN_SENT",
        "03" => "SYN_RECV",
        "04" => "FIN_WAIT1",
        "05" => "FIN_WAIT2",
        "06" => "TIME_WAIT",
        "07" => "CLOSE",
        "08" => "CLOSE_WAIT",
        "09" => "LAST_ACK",
        "0A" => "LISTEN",
        "0B" => "CLOSING",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TCP: &str = "\
  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
   0: 0100007F:1538 00000000:0000 0A 00000000:00000000 00:00000000 00000000   107        0 23145 1
   1: 0500000A:C84E 22D8B85D:01BB 01 00000000:00000000 02:000A7A3A 00000000  1000        0 99812 2
   garbage line
";

    #[test]
    fn parses_ipv4_tcp_rows() {
        let conns = parse_proc_net(TCP, "tcp");
        assert_eq!(conns.len(), 2);
        if cfg!(target_endian = "little") {
            assert_eq!(conns[0].local_addr, "127.0.0.1");
            assert_eq!(conns[1].local_addr, "10.0.0.5");
            assert_eq!(conns[1].remote_addr, "93.184.216.34");
        }
        assert_eq!(conns[0].local_port, 5432);
        assert_eq!(conns[0].state, "LISTEN");
        assert_eq!(conns[1].remote_port, 443);
        assert_eq!(conns[1].state, "ESTABLISHED");
    }

    #[test]
    fn parses_ipv6_and_udp_rows() {
        let udp6 = "\
  sl  local_address                         remote_address                        st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode ref pointer drops
  12: 00000000000000000000000001000000:0016 00000000000000000000000000000000:0000 07 00000000:00000000 00:00000000 00000000     0        0 1234 2 0 0
";
        let conns = parse_proc_net(udp6, "udp6");
        assert_eq!(conns.len(), 1);
        if cfg!(target_endian = "little") {
            assert_eq!(conns[0].local_addr, "::1");
        }
        assert_eq!(conns[0].local_port, 22);
        assert_eq!(conns[0].state, "NONE");
        assert_eq!(conns[0].protocol, "udp6");
    }

    #[test]
    fn reads_tables_from_root_and_skips_missing_ones() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("tcp"), TCP).unwrap();
        let mut probe = ConnectionProbe::with_root(dir.path(), "linux");
        assert_eq!(probe.probe().unwrap().len(), 2);
    }

    #[test]
    fn empty_root_is_unavailable() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut probe = ConnectionProbe::with_root(dir.path(), "linux");
        assert!(matches!(probe.probe(), Err(ProbeError::Unavailable(_))));
    }

    #[test]
    fn non_linux_is_unsupported() {
        let mut probe = ConnectionProbe::with_root("/proc/net", "macos");
        assert!(matches!(
            probe.probe(),
            Err(ProbeError::UnsupportedPlatform("macos"))
        ));
    }
}
