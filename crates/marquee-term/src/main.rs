use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands::*, KindArg, TraceLevel};
use crossterm::cursor::{Hide, Show};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use dotenv::dotenv;
use marquee::{ChartWidget, PollingTable, TableConfig};
use tracing::{info, subscriber, trace, Level};
use tracing_subscriber::FmtSubscriber;

mod chart_view;
mod cli;
mod scene;

fn preprocess(trace_level: Level) {
    dotenv().ok();
    // logs go to stderr; the alternate screen owns stdout
    let my_subscriber = FmtSubscriber::builder()
        .with_max_level(trace_level)
        .with_writer(std::io::stderr)
        .finish();
    subscriber::set_global_default(my_subscriber).expect("Set subscriber");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.trace {
        TraceLevel::DEBUG => Level::DEBUG,
        TraceLevel::INFO => Level::INFO,
        TraceLevel::WARN => Level::WARN,
        TraceLevel::ERROR => Level::ERROR,
    };

    preprocess(log_level);
    trace!("Command line input recorded: {cli:#?}");

    let client = reqwest::Client::new();
    let mut out = std::io::stdout();
    execute!(out, EnterAlternateScreen, Hide)?;

    // cli framework:
    // "> marquee-term <COMMAND>"
    let outcome = match cli.command {
        // "> marquee-term chart <URL> [--kind price-volume] [--refresh]"
        Chart {
            url,
            title,
            kind,
            refresh,
        } => run_chart(client, &url, &title, kind, refresh).await,

        // "> marquee-term table <URL> [--rows N] [--headers a,b,c]"
        Table {
            url,
            update_url,
            rows,
            headers,
            no_poll,
        } => run_table(client, url, update_url, rows, headers, no_poll).await,
    };

    execute!(out, Show, LeaveAlternateScreen)?;
    outcome
}

async fn run_chart(
    client: reqwest::Client,
    url: &str,
    title: &str,
    kind: KindArg,
    refresh: bool,
) -> Result<()> {
    let mut engine = chart_view::TermEngine::new()?;
    let widget =
        ChartWidget::fetch_and_create(&mut engine, client, "terminal", url, title, refresh, kind.into())
            .await?;

    let poll = widget.spawn();
    tokio::signal::ctrl_c().await?;
    poll.close();
    Ok(())
}

async fn run_table(
    client: reqwest::Client,
    url: String,
    update_url: Option<String>,
    rows: Option<usize>,
    headers: Vec<String>,
    no_poll: bool,
) -> Result<()> {
    let update_data_url = if no_poll {
        None
    } else {
        Some(update_url.unwrap_or_else(|| url.clone()))
    };
    let config = TableConfig {
        container: "terminal".to_string(),
        visible_rows: rows,
        column_widths: None,
        headers,
        column_styles: None,
        initial_data_url: url,
        update_data_url,
    };

    let scene = scene::TermScene::new()?;
    match PollingTable::create(scene, client, config).await? {
        Some(table) => {
            let poll = table.spawn();
            tokio::signal::ctrl_c().await?;
            poll.close();
        }
        None => info!("empty initial snapshot; nothing to render"),
    }
    Ok(())
}
