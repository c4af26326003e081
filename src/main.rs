pub mod app;
pub mod chat;
pub mod definitions;
pub mod event;
pub mod panels;
pub mod tui;
pub mod ui;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use app::App;
use crossterm::event::{Event as CrosstermEvent, EventStream};
use event::Event;
use futures_util::StreamExt;
use tui::{init, restore};
use ui::render;

/// Tick 週期：串流中的增量會在下一個 tick 反映到畫面上。
const TICK_RATE: Duration = Duration::from_millis(100);

/// Logging goes to a file under the state directory; stderr would fight the
/// alternate screen.
fn init_logging(state_dir: &Path) -> Result<()> {
    use log4rs::append::file::FileAppender;
    use log4rs::config::{Appender, Config, Root};
    use log4rs::encode::pattern::PatternEncoder;

    let logfile = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} {l} {t} - {m}{n}",
        )))
        .build(state_dir.join("murmur.log"))
        .context("opening the log file")?;
    let config = Config::builder()
        .appender(Appender::builder().build("file", Box::new(logfile)))
        .build(Root::builder().appender("file").build(log::LevelFilter::Debug))
        .context("assembling the logging config")?;
    log4rs::init_config(config).context("installing the logger")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let workspace_root = std::env::current_dir().context("resolving the working directory")?;
    init_logging(&workspace_root.join(app::STATE_DIR))?;

    let mut tui = init()?;
    let mut app = App::new(workspace_root)?;

    let mut stream = EventStream::new();
    let mut interval = tokio::time::interval(TICK_RATE);

    while !app.should_quit {
        tui.draw(|frame| render(frame, &mut app))?;

        let event = tokio::select! {
            _ = interval.tick() => Event::Tick,
            maybe_event = stream.next() => {
                match maybe_event {
                    Some(Ok(CrosstermEvent::Key(key))) => Event::Key(key),
                    Some(Ok(CrosstermEvent::Mouse(mouse))) => Event::Mouse(mouse),
                    // Ignore other crossterm events for now.
                    Some(Ok(_)) => continue,
                    // If the event stream ends or errors, leave the loop.
                    Some(Err(_)) | None => break,
                }
            }
        };

        match event {
            Event::Tick => app.on_tick(),
            Event::Key(key) => app.handle_key(key),
            Event::Mouse(mouse) => app.handle_mouse(mouse),
        }
    }

    restore()?;
    Ok(())
}
