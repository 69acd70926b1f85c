//! Line-based chat loop.

use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};
use crate::runner::Runner;

pub const BANNER: &str = "Personal Fitness Agent (type 'exit' to stop)";
pub const PROMPT: &str = "You: ";
pub const FAREWELL: &str = "Goodbye!";

fn is_exit(line: &str) -> bool {
    let line = line.trim();
    line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit")
}

/// Read lines from `input` and answer each through `runner` until the user
/// types `exit`/`quit` or input ends. Returns the number of turns run.
///
/// A failed turn is reported on `output` and the loop keeps going.
pub async fn chat_loop<R, W>(
    runner: &Runner,
    user_id: &str,
    session_id: &str,
    input: R,
    output: &mut W,
) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut turns = 0;

    writeln!(output, "{BANNER}")?;

    loop {
        write!(output, "{PROMPT}")?;
        output.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(output)?;
            break;
        };

        if is_exit(&line) {
            break;
        }
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        turns += 1;
        debug!(turn = turns, session = session_id, "Chat turn");
        match runner.run_turn(user_id, session_id, text).await {
            Ok(outcome) => {
                writeln!(output, "{} > {}", runner.coordinator_name(), outcome.reply)?;
            }
            Err(e) => {
                warn!(error = %e, "Turn failed, continuing");
                writeln!(output, "Error: {e}")?;
            }
        }
    }

    writeln!(output, "{FAREWELL}")?;
    Ok(turns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_agent::LlmAgent;
    use crate::test_helpers::*;
    use fitcoach_core::error::ProviderError;
    use fitcoach_core::event::EventBus;
    use fitcoach_session::InMemorySessionStore;
    use std::sync::Arc;

    fn runner(provider: Arc<SequentialMockProvider>) -> Runner {
        let coordinator = LlmAgent::new("fitness_coordinator", "mock-model", provider);
        Runner::new(
            "agents",
            Arc::new(coordinator),
            Arc::new(InMemorySessionStore::new()),
            Arc::new(EventBus::default()),
        )
    }

    async fn chat(runner: &Runner, input: &str) -> (usize, String) {
        let mut out = Vec::new();
        let turns = chat_loop(runner, "user", "s1", input.as_bytes(), &mut out).await.unwrap();
        (turns, String::from_utf8(out).unwrap())
    }

    #[test]
    fn exit_words() {
        assert!(is_exit("exit"));
        assert!(is_exit("  QUIT \n"));
        assert!(is_exit("Exit"));
        assert!(!is_exit("exit now"));
        assert!(!is_exit(""));
    }

    #[tokio::test]
    async fn exit_makes_no_model_call() {
        let provider = Arc::new(SequentialMockProvider::new(vec![]));
        let runner = runner(provider.clone());

        let (turns, out) = chat(&runner, "exit\nhello\n").await;
        assert_eq!(turns, 0);
        assert_eq!(provider.call_count(), 0);
        assert!(out.starts_with(BANNER));
        assert!(out.trim_end().ends_with(FAREWELL));
    }

    #[tokio::test]
    async fn replies_are_prefixed_and_blank_lines_skipped() {
        let provider = Arc::new(SequentialMockProvider::single_text("Do 20 squats"));
        let runner = runner(provider.clone());

        let (turns, out) = chat(&runner, "\n   \nworkout please\nquit\n").await;
        assert_eq!(turns, 1);
        assert_eq!(provider.call_count(), 1);
        assert!(out.contains("fitness_coordinator > Do 20 squats"));
        assert_eq!(out.matches(PROMPT).count(), 4);
    }

    #[tokio::test]
    async fn errors_are_reported_and_loop_continues() {
        let provider = Arc::new(SequentialMockProvider::scripted(vec![
            Err(ProviderError::Network("connection reset".into())),
            Ok(make_text_response("back online")),
        ]));
        let runner = runner(provider.clone());

        let (turns, out) = chat(&runner, "first\nsecond\n").await;
        assert_eq!(turns, 2);
        assert!(out.contains("Error: "));
        assert!(out.contains("connection reset"));
        assert!(out.contains("fitness_coordinator > back online"));
        // EOF ends the loop like exit does
        assert!(out.trim_end().ends_with(FAREWELL));
    }
}
