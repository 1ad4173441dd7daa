//! Chat, voice and prompt commands.
//!
//! # Usage
//!
//! ```bash
//! # One question, reply streamed as it is generated
//! jalapeno chat I need 20 lb of yellow onions
//!
//! # Conversation with history and a cart; /checkout places the order
//! jalapeno chat --interactive
//!
//! # Voice order from a recording
//! jalapeno voice order.webm
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use jalapeno_client::{
    ChatHandler, ChatSession, ClientConfig, FileTimelineStore, JalapenoClient, OrderProgression,
    Outcome, StatusBus,
};
use jalapeno_core::{Cart, CartAddition, ProductSuggestion};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use super::CommandError;
use super::order::print_order;

const HELP: &str = "\
Commands:
  /cart      show the cart
  /checkout  place an order for the cart
  /clear     empty the cart
  /help      show this help
  /quit      leave";

/// Prints the reply as it streams while the session accumulates it.
#[derive(Default)]
struct TerminalChat {
    session: ChatSession,
}

impl ChatHandler for TerminalChat {
    fn on_text(&mut self, content: &str) {
        print!("{content}");
        std::io::stdout().flush().ok();
        self.session.on_text(content);
    }

    fn on_suggestions(&mut self, suggestions: &[ProductSuggestion]) {
        self.session.on_suggestions(suggestions);
    }

    fn on_cart_add(&mut self, items: &[CartAddition]) {
        self.session.on_cart_add(items);
    }

    fn on_done(&mut self) {
        println!();
        self.session.on_done();
    }

    fn on_error(&mut self, message: &str) {
        println!();
        self.session.on_error(message);
    }
}

impl TerminalChat {
    /// Run one turn against the streaming endpoint.
    async fn turn(&mut self, client: &JalapenoClient, message: &str) -> Result<(), CommandError> {
        let request = self.session.begin_turn(message);
        let end = match client.chat_stream_into(&request, self).await {
            Ok(end) => end,
            Err(e) => {
                self.session.abort_turn(&e);
                return Err(e.into());
            }
        };
        self.session.end_turn(&end);
        debug!(outcome = ?self.session.outcome(), "Chat turn finished");

        print_suggestions(self.session.suggestions());
        match (self.session.outcome(), self.session.error()) {
            (Outcome::Failed, Some(error)) => Err(CommandError::Assistant(error.to_string())),
            _ => Ok(()),
        }
    }
}

/// Send a single message and stream the reply.
pub async fn once(client: &JalapenoClient, message: &str) -> Result<(), CommandError> {
    let mut chat = TerminalChat::default();
    chat.turn(client, message).await?;
    print_cart(chat.session.cart());
    Ok(())
}

/// Interactive conversation. History and cart persist across turns.
pub async fn interactive(
    client: &JalapenoClient,
    config: &ClientConfig,
) -> Result<(), CommandError> {
    let progression = client.progression(
        Arc::new(FileTimelineStore::new(config.timeline_dir.clone())),
        StatusBus::default(),
        config,
    );
    announce_status_changes(&progression);

    println!("Jalapeño ordering assistant. Type /help for commands.");
    let mut chat = TerminalChat::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match line.trim() {
            "" => {}
            "/quit" | "/exit" => break,
            "/help" => println!("{HELP}"),
            "/cart" => print_cart(chat.session.cart()),
            "/clear" => {
                chat.session.cart_mut().clear();
                println!("Cart cleared.");
            }
            "/checkout" => checkout(client, &progression, chat.session.cart_mut()).await,
            message => {
                // A failed turn does not end the conversation
                if let Err(e) = chat.turn(client, message).await {
                    eprintln!("Error: {e}");
                }
            }
        }
    }

    Ok(())
}

/// Place an order for the cart and start its progression in the background.
async fn checkout(client: &JalapenoClient, progression: &OrderProgression, cart: &mut Cart) {
    if cart.is_empty() {
        println!("Cart is empty.");
        return;
    }

    match client.create_order(&cart.to_order()).await {
        Ok(order) => {
            print_order(&order);
            // Detached; status changes are announced as they happen
            progression.start(order.id);
            cart.clear();
        }
        Err(e) => {
            warn!(error = %e, "Checkout failed");
            eprintln!("Checkout failed: {e}");
        }
    }
}

/// Print every status change published on the progression's bus.
fn announce_status_changes(progression: &OrderProgression) {
    let mut events = progression.bus().subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => println!("\n[order #{}] now {}", event.order_id, event.status),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Status announcements fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

/// Send a recorded voice order.
pub async fn voice(client: &JalapenoClient, file: &Path) -> Result<(), CommandError> {
    let audio = tokio::fs::read(file)
        .await
        .map_err(|source| CommandError::ReadFile {
            path: file.to_path_buf(),
            source,
        })?;

    let reply = client.voice(&audio, &[]).await?;
    println!("You said: {}", reply.transcribed_text);
    println!();
    println!("{}", reply.reply.message);

    if let Some(error) = reply.reply.error {
        return Err(CommandError::Assistant(error));
    }
    if reply.reply.needs_clarification
        && let Some(question) = &reply.reply.clarification_question
    {
        println!("{question}");
    }
    print_suggestions(&reply.reply.suggestions);
    Ok(())
}

/// List example prompts.
pub async fn prompts(client: &JalapenoClient) -> Result<(), CommandError> {
    let prompts = client.prompt_suggestions().await?;
    for (n, prompt) in prompts.iter().enumerate() {
        println!("{:>2}. {prompt}", n + 1);
    }
    Ok(())
}

fn print_suggestions(suggestions: &[ProductSuggestion]) {
    if suggestions.is_empty() {
        return;
    }

    println!();
    println!("Suggestions:");
    for suggestion in suggestions {
        let product = &suggestion.product;
        println!(
            "  #{:<5} {} - {} {} @ {}/{} ({:.0}% match)",
            product.id,
            product.name,
            suggestion.suggested_quantity,
            product.unit,
            product.price,
            product.unit,
            suggestion.confidence * 100.0,
        );
    }
}

fn print_cart(cart: &Cart) {
    if cart.is_empty() {
        println!("Cart is empty.");
        return;
    }

    println!();
    println!("Cart:");
    for item in cart.items() {
        println!(
            "  {} x {} {} = {}",
            item.product.name,
            item.quantity,
            item.product.unit,
            item.line_total()
        );
    }
    println!("  Total: {}", cart.total());
}
