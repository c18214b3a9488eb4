//! Single-range HTTP GET.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::str;

use super::response::{check_range_response, parse_http_status};
use super::CurlOptions;
use crate::control::Cancel;
use crate::retry::FetchError;
use crate::segmenter::ByteRange;

/// Fetches one planned range and returns exactly `range.length` bytes.
///
/// Implementations must poll `cancel` and return `FetchError::Cancelled` once
/// it fires; the orchestrator relies on that to stop siblings of a failed range.
pub trait RangeFetcher: Send + Sync {
    fn fetch(&self, range: &ByteRange, cancel: &dyn Cancel) -> Result<Vec<u8>, FetchError>;
}

/// Range fetcher backed by a libcurl easy handle per request.
#[derive(Debug, Clone)]
pub struct CurlRangeFetcher {
    url: String,
    headers: HashMap<String, String>,
    opts: CurlOptions,
}

impl CurlRangeFetcher {
    pub fn new(url: impl Into<String>, headers: HashMap<String, String>, opts: CurlOptions) -> Self {
        Self {
            url: url.into(),
            headers,
            opts,
        }
    }

    fn configure(&self, easy: &mut curl::easy::Easy, range: &ByteRange) -> Result<(), curl::Error> {
        easy.url(&self.url)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(self.opts.connect_timeout)?;
        // Abort if throughput stays below the floor; the hard deadline bounds the whole range.
        easy.low_speed_limit(self.opts.low_speed_limit)?;
        easy.low_speed_time(self.opts.low_speed_time)?;
        easy.timeout(self.opts.range_timeout)?;
        // curl wants "start-end" (inclusive), not "bytes=start-end".
        easy.range(&range.curl_range())?;
        easy.progress(true)?;
        if !self.headers.is_empty() {
            let mut list = curl::easy::List::new();
            for (k, v) in &self.headers {
                list.append(&format!("{}: {}", k.trim(), v.trim()))?;
            }
            easy.http_headers(list)?;
        }
        Ok(())
    }
}

impl RangeFetcher for CurlRangeFetcher {
    fn fetch(&self, range: &ByteRange, cancel: &dyn Cancel) -> Result<Vec<u8>, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        let expected = range.length;
        let headers: RefCell<Vec<String>> = RefCell::new(Vec::new());
        let rejected: RefCell<Option<FetchError>> = RefCell::new(None);
        let overflow = Cell::new(false);
        let mut body: Vec<u8> = Vec::with_capacity(expected as usize);

        let mut easy = curl::easy::Easy::new();
        self.configure(&mut easy, range)?;

        let performed = {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    let line = s.trim_end();
                    let mut h = headers.borrow_mut();
                    if line.starts_with("HTTP/") {
                        h.clear();
                    }
                    h.push(line.to_string());
                }
                true
            })?;
            transfer.write_function(|data| {
                // Validate once, before the first byte is accepted, so a 200
                // full-body response is never buffered as if it were the range.
                if body.is_empty() && rejected.borrow().is_none() {
                    let h = headers.borrow();
                    let code = parse_http_status(&h).unwrap_or(0);
                    if let Err(e) = check_range_response(code, &h, range) {
                        *rejected.borrow_mut() = Some(e);
                    }
                }
                if rejected.borrow().is_some() {
                    return Ok(0);
                }
                if body.len() as u64 + data.len() as u64 > expected {
                    overflow.set(true);
                    return Ok(0);
                }
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.progress_function(|_, _, _, _| !cancel.is_cancelled())?;
            transfer.perform()
        };

        if let Err(e) = performed {
            if let Some(early) = rejected.into_inner() {
                return Err(early);
            }
            if overflow.get() {
                return Err(FetchError::Overflow { expected });
            }
            if e.is_aborted_by_callback() || cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }
            return Err(FetchError::Transport(e));
        }

        let code = easy.response_code()?;
        check_range_response(code, &headers.borrow(), range)?;

        let received = body.len() as u64;
        if received != expected {
            return Err(FetchError::ShortRead { expected, received });
        }
        Ok(body)
    }
}
