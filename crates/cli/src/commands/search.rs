//! Live search over the dataset, one query per stdin line
//!
//! Lines are captured as soon as they arrive; the pipeline only reruns once
//! the input has been quiet for a moment, and the last settled query wins.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracker_lib::debounce::{Debouncer, DEFAULT_QUIET_PERIOD};
use tracker_lib::models::GpuOffer;
use tracker_lib::pipeline::{FilterSpec, OfferView};
use tracker_lib::Snapshot;

use super::offers::{build_view, FilterArgs, OrderArgs};
use crate::output::{format_price, format_vram, OutputFormat};

/// Publish each input line to a debouncer and call `on_settled` for every
/// settled query. When input ends, the last pending line is settled as well.
pub async fn settle_queries<R, F>(
    input: R,
    initial: String,
    quiet: Duration,
    mut on_settled: F,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    F: FnMut(&str) -> Result<()>,
{
    let debouncer = Debouncer::new(initial, quiet);
    let mut settled = debouncer.subscribe();
    let mut lines = input.lines();
    let mut last_rendered: Option<String> = None;

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(text) => debouncer.publish(text.trim().to_string()),
                None => break,
            },
            changed = settled.changed() => {
                if changed.is_err() {
                    break;
                }
                let query = settled.borrow_and_update().clone();
                on_settled(&query)?;
                last_rendered = Some(query);
            }
        }
    }

    let pending = debouncer.raw();
    if last_rendered.as_deref() == Some(pending.as_str()) {
        return Ok(());
    }
    if debouncer.settled() != pending {
        let _ = tokio::time::timeout(quiet * 2, settled.changed()).await;
    }
    on_settled(&debouncer.settled())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchResult<'a> {
    query: &'a str,
    total: usize,
    offers: Vec<&'a GpuOffer>,
}

fn render(view: &mut OfferView, query: &str, limit: usize, format: OutputFormat) -> Result<()> {
    let offers = view.processed();
    let total = offers.len();
    let top: Vec<&GpuOffer> = offers.into_iter().take(limit).collect();

    match format {
        // One JSON document per line so consumers can stream results
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(&SearchResult { query, total, offers: top })?
        ),
        OutputFormat::Table => {
            let shown = if query.is_empty() { "(all)" } else { query };
            println!("{} {} ({} matches)", "›".cyan(), shown.bold(), total);
            for offer in top {
                println!(
                    "  {:<18} {:<16} {:>8}  {}",
                    offer.model,
                    offer.provider,
                    format_vram(offer.vram, offer.gpu_count),
                    format_price(offer.price_per_hour)
                );
            }
        }
    }
    Ok(())
}

/// Read queries from stdin and print the top matches for each settled one
pub async fn search_offers(
    snapshot: Arc<Snapshot>,
    filters: &FilterArgs,
    order: &OrderArgs,
    limit: usize,
    format: OutputFormat,
) -> Result<()> {
    let mut view = build_view(snapshot, filters, order)?;
    let base = view.filters().clone();
    let input = BufReader::new(tokio::io::stdin());

    settle_queries(input, base.search.clone(), DEFAULT_QUIET_PERIOD, |query| {
        view.set_filters(FilterSpec {
            search: query.to_string(),
            ..base.clone()
        });
        render(&mut view, query, limit, format)
    })
    .await
}
