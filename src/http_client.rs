//! Shared HTTP client configuration and the remote predict call.

use std::io::{self, Read};
use std::sync::OnceLock;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::record::CustomerRecord;
use crate::serving::PROBABILITY_FIELD;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(30);
const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest reply body the client will buffer.
const MAX_REPLY_BYTES: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum RemotePredictError {
    #[error("server answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("failed to read reply: {0}")]
    Io(#[from] io::Error),
    #[error("reply is not JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("reply has no numeric '{PROBABILITY_FIELD}' field")]
    MissingProbability,
}

/// Return a shared HTTP agent with consistent timeouts.
pub fn agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout_read(READ_TIMEOUT)
            .timeout_write(WRITE_TIMEOUT)
            .build()
    })
}

/// POST `record` to a running predict endpoint and return the churn probability.
pub fn predict_remote(url: &str, record: &CustomerRecord) -> Result<f64, RemotePredictError> {
    let response = match agent().post(url).send_json(record) {
        Ok(response) => response,
        Err(ureq::Error::Status(status, response)) => {
            let body = read_response_bytes(response, MAX_REPLY_BYTES)
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                .unwrap_or_default();
            return Err(RemotePredictError::Status { status, body });
        }
        Err(err) => return Err(RemotePredictError::Transport(err.to_string())),
    };
    let bytes = read_response_bytes(response, MAX_REPLY_BYTES)?;
    let reply: Value = serde_json::from_slice(&bytes)?;
    reply
        .get(PROBABILITY_FIELD)
        .and_then(Value::as_f64)
        .ok_or(RemotePredictError::MissingProbability)
}

/// Read a response into memory, enforcing a maximum byte size.
pub(crate) fn read_response_bytes(
    response: ureq::Response,
    max_bytes: usize,
) -> Result<Vec<u8>, io::Error> {
    check_content_length(&response, max_bytes)?;
    let reader = response.into_reader();
    let mut limited = reader.take(max_bytes as u64 + 1);
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes)?;
    if bytes.len() > max_bytes {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Response exceeded {max_bytes} bytes"),
        ));
    }
    Ok(bytes)
}

fn check_content_length(response: &ureq::Response, max_bytes: usize) -> Result<(), io::Error> {
    let Some(length) = response.header("Content-Length") else {
        return Ok(());
    };
    let Ok(length) = length.parse::<u64>() else {
        return Ok(());
    };
    if length > max_bytes as u64 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Response too large: {length} bytes"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::TcpListener;
    use std::thread;

    fn serve_once(response: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                read_request(&mut stream);
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{addr}/predict")
    }

    /// Drain headers and any Content-Length body so closing does not reset the client.
    fn read_request(stream: &mut impl Read) {
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let Ok(read) = stream.read(&mut buf) else {
                return;
            };
            if read == 0 {
                return;
            }
            request.extend_from_slice(&buf[..read]);
            let text = String::from_utf8_lossy(&request);
            let Some(header_end) = text.find("\r\n\r\n") else {
                continue;
            };
            let body_len = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if request.len() >= header_end + 4 + body_len {
                return;
            }
        }
    }

    fn json_reply(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    #[test]
    fn reads_probability_from_reply() {
        let url = serve_once(json_reply("200 OK", r#"{"probability":0.25}"#));
        let record = CustomerRecord::new().with("tenure", 1.0);
        let probability = predict_remote(&url, &record).unwrap();
        assert!((probability - 0.25).abs() < 1e-12);
    }

    #[test]
    fn error_status_carries_body() {
        let url = serve_once(json_reply(
            "422 Unprocessable Entity",
            r#"{"error":"missing attribute 'contract'","kind":"schema_error"}"#,
        ));
        let err = predict_remote(&url, &CustomerRecord::new()).unwrap_err();
        match err {
            RemotePredictError::Status { status, body } => {
                assert_eq!(status, 422);
                assert!(body.contains("schema_error"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn reply_without_probability_is_rejected() {
        let url = serve_once(json_reply("200 OK", r#"{"score":1}"#));
        let err = predict_remote(&url, &CustomerRecord::new()).unwrap_err();
        assert!(matches!(err, RemotePredictError::MissingProbability));
    }

    #[test]
    fn read_response_bytes_rejects_content_length_over_max() {
        let response = concat!(
            "HTTP/1.1 200 OK\r\n",
            "Content-Length: 100\r\n",
            "\r\n",
            "ok"
        )
        .to_string();
        let url = serve_once(response);
        let response = agent().get(&url).call().unwrap();
        let err = read_response_bytes(response, 10).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
