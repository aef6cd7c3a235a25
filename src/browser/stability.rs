//! Lazy-load scrolling and the DOM stability wait.
//!
//! Both are explicit polls with deadlines. Neither ever fails the job: a
//! script error or an exhausted bound ends the wait and the pipeline carries
//! on with whatever DOM exists.

use serde::Deserialize;
use tokio::time::{sleep, Instant};
use tracing::{debug, instrument, warn};

use crate::browser::scripts::{
    stability_probe, INSTALL_MUTATION_COUNTER, SCROLL_STEP, SCROLL_TO_TOP, SNAPSHOT_PREP,
};
use crate::browser::PageDriver;
use crate::error::Result;
use crate::options::WaitOptions;
use crate::result::StabilityReport;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Probe {
    mutations: u64,
    quiet_ms: u64,
    pending_widgets: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ScrollPosition {
    at_bottom: bool,
}

/// Counts reported by the snapshot preparation script.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SnapshotPrep {
    pub shadow_roots: usize,
    pub videos: usize,
}

/// Scroll the page in viewport steps so lazy content mounts.
///
/// Stops at the bottom of the document, after `scroll_steps`, or on the
/// first script error. Returns the number of steps taken.
#[instrument(skip_all)]
pub async fn lazy_scroll<D: PageDriver + ?Sized>(driver: &mut D, options: &WaitOptions) -> usize {
    let mut steps = 0;
    while steps < options.scroll_steps {
        let position = match driver.evaluate(SCROLL_STEP).await {
            Ok(value) => serde_json::from_value::<ScrollPosition>(value).unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "lazy scroll stopped");
                break;
            }
        };
        steps += 1;
        sleep(std::time::Duration::from_millis(options.scroll_delay_ms)).await;
        if position.at_bottom {
            break;
        }
    }
    if let Err(e) = driver.evaluate(SCROLL_TO_TOP).await {
        debug!(error = %e, "scroll reset failed");
    }
    debug!(steps, "lazy scroll done");
    steps
}

/// Poll until the DOM has been quiet for `quiet_period_ms` and every known
/// widget present on the page has mounted content, or `max_wait_ms` passes.
#[instrument(skip_all)]
pub async fn wait_for_stability<D: PageDriver + ?Sized>(driver: &mut D, options: &WaitOptions) -> StabilityReport {
    let started = Instant::now();
    let deadline = started + options.max_wait();
    let mut report = StabilityReport::default();

    if let Err(e) = driver.evaluate(INSTALL_MUTATION_COUNTER).await {
        warn!(error = %e, "mutation counter unavailable");
        report.waited_ms = elapsed_ms(started);
        return report;
    }

    let probe_script = stability_probe(&options.widget_selectors);
    loop {
        report.polls += 1;
        match driver.evaluate(&probe_script).await {
            Ok(value) => {
                let probe: Probe = serde_json::from_value(value).unwrap_or_default();
                if probe.quiet_ms >= options.quiet_period_ms && probe.pending_widgets.is_empty() {
                    report.stable = true;
                    debug!(mutations = probe.mutations, polls = report.polls, "DOM stable");
                    break;
                }
            }
            Err(e) => {
                warn!(error = %e, "stability probe failed");
                break;
            }
        }
        if Instant::now() + options.poll_interval() > deadline {
            debug!(polls = report.polls, "stability wait hit its bound");
            break;
        }
        sleep(options.poll_interval()).await;
    }

    report.waited_ms = elapsed_ms(started);
    report
}

/// Materialize shadow roots and stamp live video state before the snapshot.
pub async fn prepare_snapshot<D: PageDriver + ?Sized>(driver: &mut D) -> Result<SnapshotPrep> {
    let value = driver.evaluate(SNAPSHOT_PREP).await?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
