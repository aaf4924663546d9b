//! Finds the renovasjon property id for an address, either from the command
//! line or through a terminal UI that also previews upcoming collections.

mod app;
mod input;
mod lookup;
mod ui;

use std::{env, io, path::Path, time::Duration as StdDuration};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event as CEvent},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use reqwest::Client;
use renovasjon_core::Property;
use renovasjon_provider_time::{self as time, UpstreamSettings};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::input::Action;
use crate::lookup::PropertyLookup;

/// The finder reads only the `[upstream]` table of the daemon config.
#[derive(Debug, Default, Deserialize)]
struct FinderConfig {
    #[serde(default)]
    upstream: UpstreamSettings,
}

struct Args {
    config: Option<String>,
    address: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args(env::args().skip(1));
    let upstream_settings = match &args.config {
        Some(path) => load_upstream(Path::new(path))?,
        None => UpstreamSettings::default(),
    };

    // HTTP + lookup setup
    let client = Client::builder()
        .user_agent(concat!("renovasjon-finder/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let upstream = time::plugin(client, upstream_settings);
    let upstream_name = upstream.name.clone();
    let mut lookup = PropertyLookup::new(upstream);

    if !args.address.is_empty() {
        // Logging only outside the TUI; it would corrupt the alternate screen
        tracing_subscriber::fmt()
            .with_writer(io::stderr)
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .init();

        let properties = lookup.search(&args.address).await?;
        print_properties(&args.address, &properties);
        return Ok(());
    }

    // App state
    let app = App::new(lookup, upstream_name);

    // Terminal init
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run event loop
    let res = run(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Some(property) = res? {
        print_selected(&property);
    }
    Ok(())
}

async fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App,
) -> Result<Option<Property>> {
    loop {
        // Draw current UI
        terminal.draw(|frame| ui::draw(frame, &app))?;

        // Poll for input (non-blocking, small timeout to keep CPU low)
        if event::poll(StdDuration::from_millis(100))?
            && let CEvent::Key(key) = event::read()?
        {
            let action = input::handle_key_event(key, &mut app);

            match action {
                Action::Quit => break,
                Action::None => {}
                Action::SearchProperties => {
                    let query_text = app.address_input.trim().to_owned();
                    if query_text.is_empty() {
                        app.error_message =
                            Some("Type a street and house number, then press Enter".into());
                        continue;
                    }

                    app.is_loading = true;
                    app.error_message = None;
                    terminal.draw(|frame| ui::draw(frame, &app))?;

                    let res = app.lookup.search(&query_text).await;

                    app.is_loading = false;
                    match res {
                        Ok(properties) => {
                            if properties.is_empty() {
                                app.error_message =
                                    Some("No properties found matching that address".into());
                            }
                            app.properties = properties;
                            app.property_list_index = 0;
                        }
                        Err(err) => {
                            app.error_message = Some(format!("Search failed: {err}"));
                        }
                    }
                }
                Action::OpenCurrentProperty => {
                    let Some(property) = app.select_current_property() else {
                        app.error_message =
                            Some("No property selected (search and pick one first)".into());
                        continue;
                    };

                    app.is_loading = true;
                    app.error_message = None;
                    terminal.draw(|frame| ui::draw(frame, &app))?;

                    let range = App::current_range();
                    let res = app.lookup.collections(&property, range).await;

                    app.is_loading = false;
                    match res {
                        Ok(collections) => {
                            app.collections = collections;
                        }
                        Err(err) => {
                            app.collections.clear();
                            app.error_message =
                                Some(format!("Failed to load collections: {err}"));
                        }
                    }
                }
            }
        }
    }

    Ok(app.selected_property)
}

fn parse_args<I: Iterator<Item = String>>(mut args: I) -> Args {
    let mut config = None;
    let mut words = Vec::new();

    while let Some(arg) = args.next() {
        if arg == "--config" || arg == "-c" {
            config = args.next();
        } else if let Some(path) = arg.strip_prefix("--config=") {
            config = Some(path.to_owned());
        } else {
            words.push(arg);
        }
    }

    Args {
        config,
        address: words.join(" ").trim().to_owned(),
    }
}

fn load_upstream(path: &Path) -> Result<UpstreamSettings> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading configuration from {}", path.display()))?;
    let config: FinderConfig = toml::from_str(&contents)
        .with_context(|| format!("parsing configuration from {}", path.display()))?;
    Ok(config.upstream)
}

#[expect(clippy::print_stdout, reason = "command line output")]
fn print_properties(address: &str, properties: &[Property]) {
    if properties.is_empty() {
        println!("No properties found matching \"{address}\".");
        return;
    }

    let noun = if properties.len() == 1 { "property" } else { "properties" };
    println!("Found {} {noun}:\n", properties.len());

    for (index, property) in properties.iter().enumerate() {
        println!("{}. {}", index + 1, property.address);
        println!("   Owner:   {}", property.owner);
        println!("   Gnr/Bnr: {}", property.cadastral);
        println!("   ID:      {}", property.id);
        println!();
    }

    if let [property] = properties {
        print_selected(property);
    } else {
        println!("Multiple properties found. Run without an address to pick one interactively.");
    }
}

#[expect(clippy::print_stdout, reason = "command line output")]
fn print_selected(property: &Property) {
    println!("Add this to config.toml:");
    println!("property_id = \"{}\"", property.id);
}
