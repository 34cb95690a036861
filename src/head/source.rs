//! Orientation feed: newline-delimited JSON samples on stdin, pushed into a
//! channel for the worker. The feed ending is not fatal to the client; the
//! rest of the session simply runs without head tracking input.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use super::tracker::OrientationSample;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

pub async fn stdin_feed(tx: mpsc::Sender<OrientationSample>) {
    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<OrientationSample>(line) {
                    Ok(sample) => {
                        if tx.send(sample).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => log_warn!("ignoring malformed orientation sample: {err}"),
                }
            }
            Ok(None) => {
                log_info!("orientation feed closed");
                break;
            }
            Err(err) => {
                log_warn!("orientation feed read error: {err}");
                break;
            }
        }
    }
}
