//! Chat command - send a prompt and stream the reply.

use std::io::Write;

use anyhow::Result;
use chatwire_client::{ApiError, ChatRequest, Error};
use clap::Args;
use console::Style;
use futures::StreamExt;

use super::Context;
use crate::client;

/// Arguments for the chat command.
#[derive(Args, Debug)]
pub struct ChatArgs {
    /// The prompt to send
    #[arg(required = true)]
    pub prompt: String,

    /// Model to use (service default when omitted)
    #[arg(short, long)]
    pub model: Option<String>,

    /// System prompt
    #[arg(long)]
    pub system: Option<String>,

    /// Continue an existing conversation
    #[arg(short, long)]
    pub conversation: Option<String>,

    /// Wait for the full reply instead of streaming
    #[arg(long)]
    pub no_stream: bool,
}

impl ChatArgs {
    fn request(&self) -> ChatRequest {
        let mut request = ChatRequest::new(&self.prompt);
        if let Some(system) = &self.system {
            request = request.with_system(system);
        }
        if let Some(model) = &self.model {
            request = request.with_model(model);
        }
        if let Some(conversation) = &self.conversation {
            request = request.with_conversation(conversation);
        }
        request
    }
}

/// Run the chat command.
pub async fn run(args: ChatArgs, ctx: &Context) -> Result<()> {
    let conn = client::connect(ctx).await?;
    let dim = Style::new().dim();

    if ctx.verbose {
        eprintln!(
            "{}",
            dim.apply_to(format!(
                "Context: {} ({})",
                conn.context.name, conn.context.server
            ))
        );
    }

    let request = args.request();
    let result = if args.no_stream || ctx.json_output {
        send(&conn, request, ctx).await
    } else {
        stream(&conn, request).await
    };
    result.map_err(explain)
}

async fn send(conn: &client::Connection, request: ChatRequest, ctx: &Context) -> Result<(), Error> {
    let response = conn.client.chat().send(request).await?;
    if ctx.json_output {
        let json = serde_json::json!({
            "id": response.id,
            "content": response.content,
            "model": response.model,
            "conversationId": response.conversation_id,
        });
        println!("{}", json);
    } else {
        println!("{}", response.content);
    }
    Ok(())
}

async fn stream(conn: &client::Connection, request: ChatRequest) -> Result<(), Error> {
    let mut stream = conn.client.chat().stream_content(request).await?;
    let mut stdout = std::io::stdout();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                stream.cancel();
                println!();
                eprintln!("{}", Style::new().dim().apply_to("[cancelled]"));
                return Ok(());
            }
            token = stream.next() => match token {
                Some(token) => {
                    print!("{}", token?);
                    // Best effort; a closed stdout ends the loop on the next print.
                    let _ = stdout.flush();
                }
                None => break,
            },
        }
    }

    println!();
    tracing::debug!(state = ?stream.state(), "Chat stream finished");
    Ok(())
}

/// Turn client errors into actionable messages.
fn explain(error: Error) -> anyhow::Error {
    let hint = match &error {
        Error::Api(ApiError::PaymentRequired { balance, cost }) => format!(
            "insufficient balance: {:.2} available, request needs about {:.2}",
            balance, cost
        ),
        Error::Api(ApiError::RateLimited {
            retry_after: Some(after),
            ..
        }) => format!("rate limited; retry in {}s", after.as_secs()),
        _ if error.is_auth_error() => format!("{} (run `chatwire auth login`)", error),
        _ => return error.into(),
    };
    anyhow::anyhow!(hint)
}
