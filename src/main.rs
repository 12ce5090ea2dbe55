//! Shop Chat - interactive client for the shop assistant
//!
//! Reads queries from stdin and streams the assistant's replies to stdout.

use shop_chat::cart::{CartClient, CartError, CartLine};
use shop_chat::conversation::Sender;
use shop_chat::{ChatSession, ClientConfig, HttpTransport, SessionUpdate};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HELP: &str = "Commands: /cart, /cancel, /history, /quit. Anything else is sent to the assistant.";

enum Command<'a> {
    Cart,
    Cancel,
    History,
    Quit,
    Help,
    Query(&'a str),
}

impl<'a> Command<'a> {
    fn parse(line: &'a str) -> Option<Self> {
        let line = line.trim();
        match line {
            "" => None,
            "/cart" => Some(Command::Cart),
            "/cancel" => Some(Command::Cancel),
            "/history" => Some(Command::History),
            "/quit" | "/exit" => Some(Command::Quit),
            "/help" => Some(Command::Help),
            query => Some(Command::Query(query)),
        }
    }
}

/// Writes the streamed reply, tracking whether a reply line is open
struct ReplyPrinter<W: Write> {
    out: W,
    started: bool,
}

impl<W: Write> ReplyPrinter<W> {
    fn new(out: W) -> Self {
        Self {
            out,
            started: false,
        }
    }

    fn begin(&mut self) {
        self.started = false;
    }

    fn render(&mut self, update: &SessionUpdate) {
        let written = match update {
            SessionUpdate::Opened => writeln!(self.out, "Assistant is thinking..."),
            SessionUpdate::Chunk { text, .. } => {
                let prefix = if self.started { "" } else { "assistant> " };
                self.started = true;
                write!(self.out, "{prefix}{text}").and_then(|()| self.out.flush())
            }
            SessionUpdate::Notice(message) => {
                self.end_line();
                eprintln!("notice: {message}");
                Ok(())
            }
            SessionUpdate::Finished => {
                self.end_line();
                Ok(())
            }
            SessionUpdate::Failed(error) => {
                self.end_line();
                eprintln!("error: {error}");
                Ok(())
            }
        };
        if let Err(e) = written {
            tracing::warn!(error = %e, "Failed to write reply to stdout");
        }
    }

    fn end_line(&mut self) {
        if self.started {
            self.started = false;
            if let Err(e) = writeln!(self.out) {
                tracing::warn!(error = %e, "Failed to write reply to stdout");
            }
        }
    }
}

fn print_history(session: &ChatSession<HttpTransport>) {
    for turn in session.snapshot() {
        let who = match turn.sender() {
            Sender::User => "you",
            Sender::Assistant => "assistant",
        };
        println!("{who}> {}", turn.text());
    }
}

fn print_cart(lines: &[CartLine]) {
    if lines.is_empty() {
        println!("Your cart is empty.");
        return;
    }
    println!("{:>3}  {:<32} {:>8} {:>16}", "#", "Product", "Qty", "Unit price");
    for line in lines {
        let quantity = line
            .quantity
            .map_or_else(|| "-".to_string(), |q| q.to_string());
        println!(
            "{:>3}  {:<32} {:>8} {:>16}",
            line.position,
            line.name,
            quantity,
            line.display_price()
        );
    }
}

async fn show_cart(cart: &CartClient, user_id: u64) {
    match cart.fetch(user_id).await {
        Ok(lines) => print_cart(&lines),
        Err(CartError::OrdersUnavailable) => eprintln!("error: Server could not load the orders."),
        Err(e) => {
            tracing::warn!(error = %e, user_id, "Cart fetch failed");
            eprintln!("error: {e}");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so they never interleave with the streamed reply
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shop_chat=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = ClientConfig::from_env();
    tracing::info!(base_url = %config.base_url, user_id = config.user_id, "Configuration loaded");

    let transport = HttpTransport::new(&config.base_url)?;
    let cart = CartClient::new(&config.base_url)?;
    let mut session = ChatSession::new(transport, config.timeouts());
    tracing::info!(thread_id = %session.thread_id(), "Session started");

    println!("{HELP}");

    let mut printer = ReplyPrinter::new(std::io::stdout());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            update = session.next_update(), if session.is_busy() => {
                if let Some(update) = update {
                    printer.render(&update);
                }
            }

            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match Command::parse(&line) {
                    None => {}
                    Some(Command::Quit) => break,
                    Some(Command::Help) => println!("{HELP}"),
                    Some(Command::History) => print_history(&session),
                    Some(Command::Cart) => show_cart(&cart, config.user_id).await,
                    Some(Command::Cancel) => {
                        session.cancel();
                        printer.end_line();
                    }
                    Some(Command::Query(query)) => {
                        printer.end_line();
                        match session.send(query) {
                            Ok(_) => printer.begin(),
                            Err(e) => eprintln!("error: {e}"),
                        }
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                if !session.is_busy() {
                    break;
                }
                session.cancel();
                printer.end_line();
                eprintln!("(cancelled)");
            }
        }
    }

    session.cancel();
    Ok(())
}
