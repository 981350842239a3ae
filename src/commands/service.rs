use anyhow::Result;
use std::io::Write;
use std::sync::Arc;

use super::output::{Table, ignore_broken_pipe};
use super::styled_headers;
use crate::metastore::{ApiState, MetastoreApi, ProbeOutcome, check_health};
use crate::ui::create_spinner;

/// Calls per endpoint when `--check-number` is not given
pub const DEFAULT_CHECK_NUMBER: u32 = 5;

/// `service state`: probe both metastore endpoints and report latency
///
/// A failing endpoint is reported as `FAIL` rather than aborting the command.
pub async fn state(
    api: Arc<dyn MetastoreApi>,
    number: u32,
    out: &mut dyn Write,
) -> Result<Vec<ApiState>> {
    let spinner = create_spinner(&format!("Probing router metastore ({number} calls per API)..."));
    let states = check_health(api, number).await;
    spinner.finish_and_clear();

    let mut table =
        Table::new(["API Name", "State", "Avg Time(ms)/Number"]).styled(styled_headers());
    for state in &states {
        if let ProbeOutcome::Failed { error } = &state.outcome {
            tracing::warn!(api = state.api_name, %error, "Health probe failed");
        }
        table.push_row([
            state.api_name.to_string(),
            state.state_label().to_string(),
            state.avg_time_cell(),
        ]);
    }

    ignore_broken_pipe(table.render(out))?;
    Ok(states)
}
