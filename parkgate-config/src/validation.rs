//! Custom validation functions for configuration.

use std::net::SocketAddr;

use validator::ValidationError;

/// Gate identifiers travel in URLs and log lines; keep them simple.
pub fn validate_gate_id(id: &str) -> Result<(), ValidationError> {
    let re = regex::Regex::new("^[A-Za-z0-9][A-Za-z0-9._:-]{0,63}$")
        .map_err(|_| ValidationError::new("invalid_regex"))?;
    if re.is_match(id) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_gate_id"))
    }
}

/// Listener and authority addresses must be `host:port` socket addresses.
pub fn validate_socket_addr(addr: &str) -> Result<(), ValidationError> {
    addr.parse::<SocketAddr>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_socket_addr"))
}

/// `host:port`, where the host may be a DNS name.
pub fn validate_host_port(addr: &str) -> Result<(), ValidationError> {
    if addr.parse::<SocketAddr>().is_ok() {
        return Ok(());
    }
    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| ValidationError::new("invalid_host_port"))?;
    let host_ok = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');
    if host_ok && port.parse::<u16>().is_ok() {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_host_port"))
    }
}

/// Plain `http://` only; the HTTP client is built without TLS.
pub fn validate_http_url(url: &str) -> Result<(), ValidationError> {
    let re = regex::Regex::new("^http://[^/\\s]+(/\\S*)?$")
        .map_err(|_| ValidationError::new("invalid_regex"))?;
    if re.is_match(url) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_http_url"))
    }
}

pub fn validate_overflow_policy(policy: &str) -> Result<(), ValidationError> {
    if ["reject_new", "drop_oldest"].contains(&policy) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_overflow_policy"))
    }
}

pub fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid = ["trace", "debug", "info", "warn", "error"]
        .contains(&level.to_lowercase().as_str());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_level"))
    }
}
