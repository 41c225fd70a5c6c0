//! Models command - list and inspect available models.

use anyhow::Result;
use chatwire_client::Model;
use clap::{Args, Subcommand};
use console::Style;

use super::Context;
use crate::client;

/// Arguments for the models command.
#[derive(Args, Debug)]
pub struct ModelsArgs {
    #[command(subcommand)]
    pub command: Option<ModelsCommand>,
}

#[derive(Subcommand, Debug)]
pub enum ModelsCommand {
    /// List available models (default)
    List,

    /// Show details for one model
    Get {
        /// Model ID
        id: String,
    },
}

/// Run the models command.
pub async fn run(args: ModelsArgs, ctx: &Context) -> Result<()> {
    let conn = client::connect(ctx).await?;
    if !conn.client.tokens().has_credential() {
        anyhow::bail!(
            "no credential for context '{}' (run `chatwire auth login`)",
            conn.context.name
        );
    }

    match args.command.unwrap_or(ModelsCommand::List) {
        ModelsCommand::List => {
            let list = conn.client.models().list().await?;
            if ctx.json_output {
                println!("{}", serde_json::to_string_pretty(&list)?);
                return Ok(());
            }
            if list.models.is_empty() {
                println!("No models available.");
                return Ok(());
            }
            let bold = Style::new().bold();
            println!("{}", bold.apply_to(format!("{:<32} {:>10}  {}", "ID", "CONTEXT", "PRICE (in/out per 1M)")));
            for model in &list.models {
                println!("{}", model_row(model));
            }
        }
        ModelsCommand::Get { id } => {
            let model = conn.client.models().get(&id).await?;
            if ctx.json_output {
                println!("{}", serde_json::to_string_pretty(&model)?);
                return Ok(());
            }
            println!("ID:       {}", model.id);
            if let Some(name) = &model.display_name {
                println!("Name:     {}", name);
            }
            if let Some(window) = model.context_window {
                println!("Context:  {} tokens", window);
            }
            println!("Pricing:  {}", price(&model));
        }
    }
    Ok(())
}

fn model_row(model: &Model) -> String {
    let window = model
        .context_window
        .map(|w| w.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!("{:<32} {:>10}  {}", model.id, window, price(model))
}

fn price(model: &Model) -> String {
    match (model.input_price, model.output_price) {
        (Some(input), Some(output)) => format!("${:.2} / ${:.2}", input, output),
        (Some(input), None) => format!("${:.2} / -", input),
        (None, Some(output)) => format!("- / ${:.2}", output),
        (None, None) => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(input: Option<f64>, output: Option<f64>) -> Model {
        Model {
            id: "fast".to_string(),
            display_name: None,
            context_window: Some(128_000),
            input_price: input,
            output_price: output,
        }
    }

    #[test]
    fn test_price_formatting() {
        assert_eq!(price(&model(Some(0.5), Some(1.5))), "$0.50 / $1.50");
        assert_eq!(price(&model(None, Some(2.0))), "- / $2.00");
        assert_eq!(price(&model(None, None)), "-");
    }

    #[test]
    fn test_row_includes_context_window() {
        let row = model_row(&model(None, None));
        assert!(row.starts_with("fast"));
        assert!(row.contains("128000"));
    }
}
