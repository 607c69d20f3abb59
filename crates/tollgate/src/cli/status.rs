//! Availability display and live countdowns.

use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tollgate::{AvailabilitySnapshot, ModelTier, Tollgate};

const REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Print availability of both tiers and the token counters.
pub async fn show_status(tollgate: &Tollgate, json: bool) -> anyhow::Result<()> {
    let invoker = tollgate.invoker();
    let snapshots = invoker.ledger().availability_all().await;
    let consumed = invoker.total_tokens_consumed().await;
    let saved = invoker.total_tokens_saved().await;

    if json {
        let report = serde_json::json!({
            "tiers": snapshots,
            "tokens_consumed": consumed,
            "tokens_saved": saved,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for snapshot in &snapshots {
        println!("{}", render_line(tollgate, snapshot));
    }
    println!("{:-<80}", "");
    println!("Tokens consumed: {}   saved: {}", consumed, saved);
    Ok(())
}

/// Redraw availability every second and whenever the ledger changes.
pub async fn watch(tollgate: &Tollgate) -> anyhow::Result<()> {
    let invoker = tollgate.invoker();
    let mut events = invoker.subscribe();
    let mut ticker = tokio::time::interval(REFRESH_INTERVAL);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            event = events.recv() => match event {
                Ok(event) => tracing::debug!(tier = %event.tier, kind = %event.kind, "Ledger changed"),
                Err(RecvError::Lagged(skipped)) => tracing::debug!(skipped, "Missed ledger events"),
                Err(RecvError::Closed) => return Ok(()),
            },
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }

        // Clear screen, cursor home
        print!("\x1b[2J\x1b[H");
        for tier in ModelTier::ALL {
            let snapshot = invoker.availability(tier).await;
            println!("{}", render_line(tollgate, &snapshot));
        }
        println!(
            "Tokens consumed: {}   saved: {}",
            invoker.total_tokens_consumed().await,
            invoker.total_tokens_saved().await
        );
    }
}

fn render_line(tollgate: &Tollgate, snapshot: &AvailabilitySnapshot) -> String {
    let state = if snapshot.is_hard_blocked {
        format!("HARD BLOCKED, reopens in {}", countdown(snapshot.next_available_in_secs))
    } else if snapshot.is_blocked {
        format!("blocked, reopens in {}", countdown(snapshot.next_available_in_secs))
    } else {
        "open".to_string()
    };

    format!(
        "{:<10} {:<24} rpm {:>3}/{:<3} rpd {:>5}/{:<5} {}",
        snapshot.tier,
        tollgate.config().model_for(snapshot.tier),
        snapshot.rpm_left,
        snapshot.limits.requests_per_minute,
        snapshot.rpd_left,
        snapshot.limits.requests_per_day,
        state
    )
}

fn countdown(secs: u64) -> String {
    let (hours, rest) = (secs / 3600, secs % 3600);
    let (minutes, seconds) = (rest / 60, rest % 60);
    if hours > 0 {
        format!("{}h{:02}m{:02}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
