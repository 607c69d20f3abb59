//! Prompt and probe command handlers.

use tollgate::{GenerateRequest, Invocation, Task, TierPreference, Tollgate};

/// Send a prompt and print the generated text.
pub async fn ask(
    tollgate: &Tollgate,
    task: Task,
    tier: TierPreference,
    retries: Option<u32>,
    use_cache: bool,
    prompt: String,
) -> anyhow::Result<()> {
    let mut invocation = Invocation::new(task, GenerateRequest::text(prompt))
        .with_tier(tier)
        .with_use_cache(use_cache);
    if let Some(retries) = retries {
        invocation = invocation.with_retries(retries);
    }

    let text = tollgate.invoker().invoke(&invocation).await?;
    println!("{}", text);
    Ok(())
}

/// Run a connection probe; fails when the probe does.
pub async fn probe(tollgate: &Tollgate) -> anyhow::Result<()> {
    let status = tollgate.invoker().probe().await;
    if status.success {
        println!("{}", status.message);
        Ok(())
    } else {
        anyhow::bail!("{}", status.message)
    }
}
