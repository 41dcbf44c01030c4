//! Line commands read from stdin while the daemon runs.

use crate::actions::ItemActions;
use crate::engine::StrategySelector;
use crate::error::MoveError;
use crate::mover::MoveController;
use crate::scheduler::SchedulerHandle;
use crate::view::{Notice, ViewSink};
use std::str::FromStr;
use std::sync::Arc;
use tabdeck_core::{GroupKey, ItemKey, StrategyKind};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Strategy(StrategyKind),
    Move {
        item: ItemKey,
        source: GroupKey,
        target: GroupKey,
    },
    Open(ItemKey),
    Close(ItemKey),
    Note { url: String, text: String },
    Unnote(String),
    Refresh,
    Help,
    Quit,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

pub const HELP: &str = "\
commands:
  window | domain | notes            switch grouping
  move <item> <from-group> <to-group>
  open <item>                        activate a tab or open a remote entry
  close <item>
  note <url> <text...>
  unnote <url>
  refresh
  quit";

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };
        let args: Vec<&str> = rest.split_whitespace().collect();

        match verb.to_ascii_lowercase().as_str() {
            "" => Err(CommandError::Empty),
            "window" | "windows" | "domain" | "domains" | "notes" => verb
                .parse()
                .map(Command::Strategy)
                .map_err(|_| CommandError::Unknown(verb.to_string())),
            "group" => match args.as_slice() {
                [kind] => kind
                    .parse()
                    .map(Command::Strategy)
                    .map_err(|_| CommandError::Usage("group window|domain|notes")),
                _ => Err(CommandError::Usage("group window|domain|notes")),
            },
            "move" | "mv" => match args.as_slice() {
                [item, source, target] => Ok(Command::Move {
                    item: ItemKey::from(*item),
                    source: GroupKey::from(*source),
                    target: GroupKey::from(*target),
                }),
                _ => Err(CommandError::Usage("move <item> <from-group> <to-group>")),
            },
            "open" | "activate" => match args.as_slice() {
                [item] => Ok(Command::Open(ItemKey::from(*item))),
                _ => Err(CommandError::Usage("open <item>")),
            },
            "close" => match args.as_slice() {
                [item] => Ok(Command::Close(ItemKey::from(*item))),
                _ => Err(CommandError::Usage("close <item>")),
            },
            "note" => match rest.split_once(char::is_whitespace) {
                Some((url, text)) if !text.trim().is_empty() => Ok(Command::Note {
                    url: url.to_string(),
                    text: text.trim().to_string(),
                }),
                _ => Err(CommandError::Usage("note <url> <text...>")),
            },
            "unnote" => match args.as_slice() {
                [url] => Ok(Command::Unnote(url.to_string())),
                _ => Err(CommandError::Usage("unnote <url>")),
            },
            "refresh" | "r" => Ok(Command::Refresh),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            _ => Err(CommandError::Unknown(verb.to_string())),
        }
    }
}

/// Everything a console command can act on.
pub struct Console {
    pub selector: StrategySelector,
    pub mover: MoveController,
    pub actions: ItemActions,
    pub scheduler: SchedulerHandle,
    pub view: Arc<dyn ViewSink>,
}

impl Console {
    /// Run one command. Returns `false` once the console should stop.
    /// Failures have already been reported as notices by the controllers.
    pub async fn execute(&self, command: Command) -> bool {
        debug!("Console command: {command:?}");
        match command {
            Command::Strategy(kind) => {
                if !self.selector.select(kind) {
                    self.view.notice(Notice::info(format!("Already grouped by {kind}")));
                }
            }
            Command::Move {
                item,
                source,
                target,
            } => {
                if let Err(e) = self.mover.request_move(&item, &source, &target).await {
                    debug!("Move not carried out: {e}");
                    if !matches!(e, MoveError::Failed(_)) {
                        self.view.notice(Notice::error(format!("Cannot move {item}: {e}")));
                    }
                }
            }
            Command::Open(item) => {
                if let Err(e) = self.actions.activate(&item).await {
                    debug!("Open of {item} not carried out: {e}");
                }
            }
            Command::Close(item) => {
                if let Err(e) = self.actions.close(&item).await {
                    debug!("Close of {item} not carried out: {e}");
                }
            }
            Command::Note { url, text } => {
                if let Err(e) = self.actions.annotate(&url, &text, None, None).await {
                    debug!("Note for {url} not saved: {e}");
                }
            }
            Command::Unnote(url) => {
                if let Err(e) = self.actions.clear_annotation(&url).await {
                    debug!("Note for {url} not removed: {e}");
                }
            }
            Command::Refresh => self.scheduler.notify(),
            Command::Help => self.view.notice(Notice::info(HELP)),
            Command::Quit => return false,
        }
        true
    }

    /// Read commands line by line. Returns `true` when `quit` was entered,
    /// `false` at end of input.
    pub async fn run<R: AsyncBufRead + Unpin>(&self, input: R) -> std::io::Result<bool> {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            match line.parse::<Command>() {
                Ok(command) => {
                    if !self.execute(command).await {
                        info!("Console closed");
                        return Ok(true);
                    }
                }
                Err(CommandError::Empty) => {}
                Err(e) => self.view.notice(Notice::error(e.to_string())),
            }
        }
        Ok(false)
    }
}
