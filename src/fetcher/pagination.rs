//! Pagination helper for the activity log list
//!
//! The list endpoint is cursor based: each page carries the absolute URL of
//! the next one. Pages are requested in ascending start-time order and
//! filtered client-side against the requested end date.
//!
//! Includes safety mechanisms:
//! - Maximum iteration limit to prevent infinite loops
//! - Repeated cursor detection

use crate::fetcher::fitbit_parser::ActivityPage;
use crate::fetcher::{FetcherError, FetcherResult};
use crate::ActivityLogEntry;
use chrono::NaiveDate;
use std::future::Future;
use tracing::debug;

/// Maximum number of pages followed in one listing
const MAX_ITERATIONS: usize = 10_000;

/// Pagination helper for Fitbit list endpoints
pub struct PaginationHelper;

impl PaginationHelper {
    /// Follow `next` cursors starting at `first_url`, keeping activities that
    /// started on or before `end_date`
    ///
    /// Stops when a page is empty, when a page contains an activity starting
    /// after `end_date` (later pages can only be later still), or when no
    /// `next` cursor is present.
    ///
    /// # Arguments
    /// * `first_url` - URL of the first page
    /// * `end_date` - Last local calendar date to keep
    /// * `fetch_page` - Async function fetching and parsing a single page
    pub async fn paginate_activity_log<F, Fut>(
        first_url: String,
        end_date: NaiveDate,
        mut fetch_page: F,
    ) -> FetcherResult<Vec<ActivityLogEntry>>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = FetcherResult<ActivityPage>>,
    {
        let mut activities = Vec::new();
        let mut url = first_url;
        let mut iteration = 0;

        loop {
            if iteration >= MAX_ITERATIONS {
                return Err(FetcherError::ParseError(format!(
                    "Max iterations ({MAX_ITERATIONS}) exceeded while listing activities - possible cursor loop. Last URL: {url}"
                )));
            }

            debug!("Fetching activity log page {}", iteration + 1);
            let page = fetch_page(url.clone()).await?;

            if page.activities.is_empty() {
                debug!(
                    "Empty page received at iteration {}. Total activities collected: {}",
                    iteration + 1,
                    activities.len()
                );
                break;
            }

            let page_len = page.activities.len();
            let in_range: Vec<ActivityLogEntry> = page
                .activities
                .into_iter()
                .filter(|activity| activity.start_date() <= end_date)
                .collect();
            let reached_end = in_range.len() < page_len;

            debug!(
                "Received {} activities in page {} ({} in range)",
                page_len,
                iteration + 1,
                in_range.len()
            );
            activities.extend(in_range);

            if reached_end {
                debug!("Activity after {} found, stopping pagination", end_date);
                break;
            }

            match page.next {
                Some(next) if next != url => url = next,
                Some(_) => {
                    return Err(FetcherError::ParseError(format!(
                        "Pagination cursor did not advance: {url}"
                    )))
                }
                None => break,
            }

            iteration += 1;
        }

        Ok(activities)
    }
}
