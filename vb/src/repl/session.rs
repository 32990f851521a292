//! REPL session management

use std::sync::Arc;

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use serde_json::Value as Json;
use tracing::{debug, info, warn};

use crate::binding::{InboundEventBinding, InboundPropertyBinding, OutboundEventBinding, OutboundPropertyBinding};
use crate::bridge::Bridge;
use crate::broker::{Broker, Kind, MemoryBroker};
use crate::config::{BindingConfig, Config, Flow};
use crate::events::EventBus;
use crate::value::Value;

/// A parsed REPL command
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    /// Write a local value; outbound bindings forward it to the broker
    Local { path: String, value: Json },
    /// Act as another broker client writing to `path`
    Remote { path: String, value: Json },
    Show,
    Help,
    Quit,
}

impl ReplCommand {
    /// Parse one input line such as `/local lounge/light true`
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let (cmd, rest) = match input.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (input, ""),
        };

        match cmd {
            "/local" | "/l" => {
                let (path, value) = parse_path_value(cmd, rest)?;
                Ok(Self::Local { path, value })
            }
            "/remote" | "/r" => {
                let (path, value) = parse_path_value(cmd, rest)?;
                Ok(Self::Remote { path, value })
            }
            "/show" | "/s" => Ok(Self::Show),
            "/help" | "/h" => Ok(Self::Help),
            "/quit" | "/q" | "/exit" => Ok(Self::Quit),
            _ => Err(eyre::eyre!("Unknown command: {}", cmd)),
        }
    }
}

fn parse_path_value(cmd: &str, rest: &str) -> Result<(String, Json)> {
    let (path, raw) = rest
        .split_once(char::is_whitespace)
        .ok_or_else(|| eyre::eyre!("Usage: {} <path> <json>", cmd))?;
    let value = serde_json::from_str(raw.trim()).map_err(|e| eyre::eyre!("Invalid JSON '{}': {}", raw.trim(), e))?;
    Ok((path.to_string(), value))
}

enum Handle {
    InboundProperty(InboundPropertyBinding<Json>),
    InboundEvent(InboundEventBinding<Json>),
    OutboundProperty(OutboundPropertyBinding<Json>),
    OutboundEvent(OutboundEventBinding<Json>),
}

struct ActiveBinding {
    config: BindingConfig,
    value: Value<Json>,
    handle: Handle,
}

impl ActiveBinding {
    fn close(self) -> Result<()> {
        match self.handle {
            Handle::InboundProperty(b) => b.close()?,
            Handle::InboundEvent(b) => b.close()?,
            Handle::OutboundProperty(b) => b.close()?,
            Handle::OutboundEvent(b) => b.close()?,
        }
        Ok(())
    }
}

/// Interactive session bridging configured bindings to an in-memory broker
pub struct ReplSession {
    broker: Arc<MemoryBroker>,
    bridge: Bridge,
    bindings: Vec<ActiveBinding>,
}

impl ReplSession {
    /// Create every configured binding; must be called within a tokio runtime
    pub fn new(config: &Config) -> Result<Self> {
        debug!(bindings = config.bindings.len(), "ReplSession::new: called");
        config.validate()?;

        let broker = Arc::new(MemoryBroker::new());
        let events = Arc::new(EventBus::new(config.events.channel_capacity));
        let bridge = Bridge::with_event_bus(broker.clone(), events);

        let mut session = Self {
            broker,
            bridge,
            bindings: Vec::new(),
        };
        for binding in &config.bindings {
            session.bind(binding)?;
        }
        info!(bindings = session.bindings.len(), "REPL session ready");
        Ok(session)
    }

    fn bind(&mut self, config: &BindingConfig) -> Result<()> {
        debug!(path = %config.path, flow = %config.flow, kind = %config.kind, "ReplSession::bind: called");
        let options = config.options();
        let (value, handle) = match (config.flow, config.kind) {
            (Flow::Inbound, Kind::Property) => {
                let default = config.default.clone().unwrap_or(Json::Null);
                let binding = self.bridge.get_property(&config.path, default, &options)?;
                (binding.value().clone(), Handle::InboundProperty(binding))
            }
            (Flow::Inbound, Kind::Event) => {
                let binding = self.bridge.watch_event(&config.path, &options)?;
                (binding.value().clone(), Handle::InboundEvent(binding))
            }
            (Flow::Outbound, Kind::Property) => {
                let value = match &config.default {
                    Some(default) => Value::new(default.clone()),
                    None => Value::no_value(),
                };
                let binding = self.bridge.set_property(&config.path, &value, &options)?;
                (value, Handle::OutboundProperty(binding))
            }
            (Flow::Outbound, Kind::Event) => {
                let value = Value::no_value();
                let binding = self.bridge.send_event(&config.path, &value, &options)?;
                (value, Handle::OutboundEvent(binding))
            }
        };

        if config.flow == Flow::Inbound {
            let path = config.path.clone();
            value.on_change(move |v: &Json| {
                println!("{} {} {}", path.bright_blue(), "<-".dimmed(), v);
            });
        }

        self.bindings.push(ActiveBinding {
            config: config.clone(),
            value,
            handle,
        });
        Ok(())
    }

    pub fn broker(&self) -> &Arc<MemoryBroker> {
        &self.broker
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    /// Current local value of the binding on `path` flowing `flow`
    pub fn local_value(&self, path: &str, flow: Flow) -> Option<Json> {
        self.find(path, flow).and_then(|b| b.value.read())
    }

    fn find(&self, path: &str, flow: Flow) -> Option<&ActiveBinding> {
        self.bindings
            .iter()
            .find(|b| b.config.path == path && b.config.flow == flow)
    }

    /// Run one command, waiting for the broker calls it caused
    pub async fn execute(&mut self, command: ReplCommand) -> Result<SlashResult> {
        debug!(?command, "ReplSession::execute: called");
        match command {
            ReplCommand::Local { path, value } => {
                let binding = self
                    .find(&path, Flow::Outbound)
                    .ok_or_else(|| eyre::eyre!("No outbound binding for {}", path))?;
                let result = match binding.config.kind {
                    Kind::Property => binding.value.set(value),
                    Kind::Event => binding.value.set_instantaneous(value),
                };
                // The write itself went through; only report the listeners
                if let Err(e) = result {
                    warn!(%path, error = %e, "Local listeners failed");
                    println!("{} {}", "Warning:".yellow(), e);
                }
                self.bridge.flush().await?;
            }
            ReplCommand::Remote { path, value } => {
                // Without an inbound binding the write is treated as a property
                let kind = self
                    .find(&path, Flow::Inbound)
                    .map(|b| b.config.kind)
                    .unwrap_or(Kind::Property);
                match kind {
                    Kind::Property => self.broker.set_property(&path, value).await?,
                    Kind::Event => self.broker.send_event(&path, value).await?,
                }
                self.bridge.flush().await?;
            }
            ReplCommand::Show => self.print_state(),
            ReplCommand::Help => self.print_help(),
            ReplCommand::Quit => return Ok(SlashResult::Quit),
        }
        Ok(SlashResult::Continue)
    }

    /// Run the REPL main loop
    pub async fn run(&mut self) -> Result<()> {
        self.print_welcome();

        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            let readline = rl.readline(&format!("{} ", ">".bright_green()));

            match readline {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }

                    let _ = rl.add_history_entry(input);

                    let command = match ReplCommand::parse(input) {
                        Ok(command) => command,
                        Err(e) => {
                            println!("{} {}", "?".yellow(), e);
                            println!("Type {} for available commands", "/help".yellow());
                            continue;
                        }
                    };

                    match self.execute(command).await {
                        Ok(SlashResult::Continue) => continue,
                        Ok(SlashResult::Quit) => break,
                        Err(e) => println!("{} {}", "Error:".red(), e),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C - just show new prompt
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    // Ctrl+D - exit
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    /// Close every binding and stop the bridge
    pub async fn close(self) -> Result<()> {
        debug!("ReplSession::close: called");
        for binding in self.bindings {
            binding.close()?;
        }
        self.bridge.flush().await?;
        self.bridge.shutdown()?;
        Ok(())
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", "valuebridge interactive session".bright_cyan().bold());
        println!("{} bindings on an in-memory broker", self.bindings.len());
        println!("Type {} for help, {} to quit", "/help".yellow(), "/quit".yellow());
        println!();
    }

    fn print_help(&self) {
        println!();
        println!("{}", "Available Commands:".bright_cyan());
        println!("  {:24} Set the local value of an outbound binding", "/local <path> <json>".yellow());
        println!("  {:24} Write to the broker as another client", "/remote <path> <json>".yellow());
        println!("  {:24} Show bindings and broker properties", "/show".yellow());
        println!("  {:24} Show this help", "/help".yellow());
        println!("  {:24} Exit the session", "/quit".yellow());
        println!();
    }

    fn print_state(&self) {
        println!();
        println!("{}", "Bindings:".bright_cyan());
        if self.bindings.is_empty() {
            println!("  {}", "No bindings configured.".dimmed());
        }
        for binding in &self.bindings {
            let local = match binding.value.read() {
                Some(v) => v.to_string(),
                None => "<no value>".dimmed().to_string(),
            };
            println!(
                "  {:8} {:8} {:30} {}",
                binding.config.flow.to_string().yellow(),
                binding.config.kind.to_string(),
                binding.config.path,
                local
            );
        }

        println!("{}", "Broker properties:".bright_cyan());
        let properties = self.broker.properties();
        if properties.is_empty() {
            println!("  {}", "No retained properties.".dimmed());
        }
        for (path, value) in properties {
            println!("  {:30} {}", path, value);
        }

        let stats = self.bridge.scheduler().stats();
        println!(
            "{} {} scheduled, {} completed, {} panicked",
            "Broker calls:".bright_cyan(),
            stats.scheduled,
            stats.completed,
            stats.panicked
        );
        println!();
    }
}

/// Result of handling a slash command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlashResult {
    Continue,
    Quit,
}
