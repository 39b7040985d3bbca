//! Minimal line-protocol client, used by the `payment-client` binary and
//! handy for poking a running gateway.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpStream, ToSocketAddrs};

/// Send each line in order on one connection, waiting for its response
/// before sending the next.
///
/// Stops early if the gateway closes the connection; the returned vector
/// then holds fewer responses than requests.
pub async fn send_requests<A, I, S>(addr: A, lines: I) -> std::io::Result<Vec<String>>
where
    A: ToSocketAddrs,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let stream = TcpStream::connect(addr).await?;
    let mut stream = BufReader::new(stream);
    let mut responses = Vec::new();

    for line in lines {
        let request = format!("{}\n", line.as_ref());
        stream.get_mut().write_all(request.as_bytes()).await?;

        let mut response = String::new();
        if stream.read_line(&mut response).await? == 0 {
            break;
        }
        responses.push(response.trim_end().to_string());
    }

    Ok(responses)
}
