use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use wordgen_client::{ClientConfig, ConnectionManager, ReconnectContext};
use wordgen_notify::preferences::{load_preferences, save_preferences, Preferences};
use wordgen_notify::{FileStorage, NotificationStore, Storage};
use wordgen_protocol::{InboundEvent, WordRequest};
use wordgen_tracker::{Outcome, RequestTracker, StageStatus};

#[derive(Debug, Parser)]
#[command(
    name = "wordgen-watch",
    version,
    about = "Submit a word request and tail its generation pipeline"
)]
struct Args {
    #[arg(long, env = "WORDGEN_BASE", default_value = "http://127.0.0.1:8091")]
    base: String,
    #[arg(long, env = "WORDGEN_USER_ID")]
    user_id: Option<String>,
    /// Word to request; omit with --resume to pick up a stored request
    #[arg(long)]
    word: Option<String>,
    /// Source language name or code (omit for auto-detection)
    #[arg(long)]
    source: Option<String>,
    #[arg(long, default_value = "en")]
    target: String,
    /// Re-open the channel of the stored pending request instead of
    /// submitting a new one
    #[arg(long, default_value_t = false)]
    resume: bool,
    /// Directory for the notification ledger and preferences
    #[arg(long, env = "WORDGEN_STATE_DIR", default_value = ".wordgen")]
    state_dir: String,
    /// Print raw event payloads as JSON lines instead of summaries
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
    let args = Args::parse();

    let storage: Arc<dyn Storage> =
        Arc::new(FileStorage::new(&args.state_dir).context("opening state dir")?);
    let store = NotificationStore::with_storage(storage.clone());
    let mut prefs = load_preferences(storage.as_ref());

    let ctx = resolve_context(&args, &prefs)?;
    let request = WordRequest {
        source_word: ctx.source_word.clone(),
        source_language: ctx.source_language.clone(),
        target_language: ctx.target_language.clone(),
        request_id: ctx.request_id.clone(),
    };

    let mut config = ClientConfig::new(args.base.clone());
    if let Some(user_id) = args.user_id.clone() {
        config = config.with_user_id(user_id);
    }
    let manager = ConnectionManager::new(config)?;
    let mut rx = manager.subscribe();

    let mut tracker = if args.resume {
        manager.reconnect(&ctx);
        println!("resuming \"{}\" -> {}", ctx.source_word, ctx.target_language);
        RequestTracker::new(request.clone())
    } else {
        let ack = manager.submit(&request).await?;
        println!(
            "submitted \"{}\" -> {} (request {})",
            request.source_word, request.target_language, ack.request_id
        );
        let mut submitted = request.clone();
        submitted.request_id = Some(ack.request_id);
        let ctx = ReconnectContext::from_request(&submitted);
        prefs.pending_request = serde_json::to_value(&ctx).ok();
        save_preferences(storage.as_ref(), &prefs);
        RequestTracker::new(submitted)
    };

    let mut backoff = 1u64;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("interrupted; request context kept for --resume");
                manager.close();
                return Ok(());
            }
            received = tokio::time::timeout(Duration::from_secs(2), rx.recv()) => {
                match received {
                    Ok(Ok(event)) => {
                        backoff = 1;
                        handle_event(&args, &store, &mut tracker, &event);
                        if let Some(outcome) = tracker.outcome() {
                            report_outcome(outcome);
                            prefs.pending_request = None;
                            save_preferences(storage.as_ref(), &prefs);
                            manager.close();
                            return Ok(());
                        }
                    }
                    Ok(Err(tokio::sync::broadcast::error::RecvError::Lagged(n))) => {
                        tracing::warn!(missed = n, "event consumer lagged");
                    }
                    Ok(Err(tokio::sync::broadcast::error::RecvError::Closed)) => {
                        bail!("event bus closed unexpectedly");
                    }
                    Err(_elapsed) => {
                        if !manager.is_connected() && !tracker.is_terminal() {
                            tracing::warn!(retry_in = backoff, "channel down; reconnecting");
                            tokio::time::sleep(Duration::from_secs(backoff)).await;
                            backoff = (backoff * 2).min(30);
                            manager.reconnect(&ReconnectContext::from_request(tracker.request()));
                        }
                    }
                }
            }
        }
    }
}

fn resolve_context(args: &Args, prefs: &Preferences) -> Result<ReconnectContext> {
    if args.resume {
        let stored = prefs
            .pending_request
            .clone()
            .context("no stored pending request; submit one first")?;
        return serde_json::from_value(stored).context("stored request context is unreadable");
    }
    let word = args
        .word
        .clone()
        .context("--word is required unless --resume is set")?;
    Ok(ReconnectContext {
        source_word: word,
        source_language: args.source.clone(),
        target_language: args.target.clone(),
        request_id: None,
    })
}

fn handle_event(
    args: &Args,
    store: &NotificationStore,
    tracker: &mut RequestTracker,
    event: &InboundEvent,
) {
    let update = tracker.apply_event(event);
    wordgen_notify::apply_event(store, tracker.request(), event);

    if args.json {
        println!(
            "{}",
            serde_json::json!({"tag": event.tag(), "revealed": update.revealed.len()})
        );
        return;
    }

    let now = Local::now().format("%H:%M:%S");
    let completed = tracker
        .stages
        .iter()
        .filter(|s| s.status == StageStatus::Completed)
        .count();
    let active: Vec<&str> = tracker
        .stages
        .iter()
        .filter(|s| s.status == StageStatus::Active)
        .map(|s| s.id.as_str())
        .collect();
    println!(
        "[{}] {} stages {}/{} active=[{}] unseen={}",
        now,
        event.tag(),
        completed,
        tracker.stages.len(),
        active.join(", "),
        store.unseen_count()
    );
    for field in &update.revealed {
        println!("         revealed {}", field.as_str());
    }
}

fn report_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Completed { route, .. } => println!("completed; view at {}", route),
        Outcome::Redirected { address, route } => {
            println!("already exists ({} / {}); view at {}", address.pk, address.sk, route)
        }
        Outcome::Invalid {
            issue, suggestions, ..
        } => {
            println!(
                "rejected: {}",
                issue.clone().unwrap_or_else(|| "invalid word".to_string())
            );
            if !suggestions.is_empty() {
                println!("try instead: {}", suggestions.join(", "));
            }
        }
        Outcome::Failed { reason } => println!(
            "failed: {}",
            reason.clone().unwrap_or_else(|| "unknown error".to_string())
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        Args::parse_from([&["wordgen-watch"], extra].concat())
    }

    #[test]
    fn context_comes_from_flags_on_a_fresh_submit() {
        let args = args(&["--word", "Haus", "--source", "de", "--target", "en"]);
        let ctx = resolve_context(&args, &Preferences::default()).expect("context");
        assert_eq!(ctx.source_word, "Haus");
        assert_eq!(ctx.source_language.as_deref(), Some("de"));
        assert_eq!(ctx.target_language, "en");
        assert_eq!(ctx.request_id, None);
    }

    #[test]
    fn fresh_submit_requires_a_word() {
        let args = args(&["--target", "en"]);
        assert!(resolve_context(&args, &Preferences::default()).is_err());
    }

    #[test]
    fn resume_requires_a_stored_request() {
        let args = args(&["--resume"]);
        assert!(resolve_context(&args, &Preferences::default()).is_err());
    }

    #[test]
    fn resume_reads_the_stored_context() {
        let args = args(&["--resume"]);
        let stored = ReconnectContext {
            source_word: "Haus".to_string(),
            source_language: None,
            target_language: "en".to_string(),
            request_id: Some("r-1".to_string()),
        };
        let prefs = Preferences {
            pending_request: serde_json::to_value(&stored).ok(),
            ..Preferences::default()
        };
        let ctx = resolve_context(&args, &prefs).expect("context");
        assert_eq!(ctx, stored);
    }
}

