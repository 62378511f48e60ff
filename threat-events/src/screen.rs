use crate::hook::HookState;
use crate::render::{render_event, Card};
use std::fmt;

pub const SCREEN_TITLE: &str = "Threat Events";
pub const EMPTY_MESSAGE: &str = "No threat events detected.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
  pub key: String,
  pub card: Card,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListView {
  /// First load, nothing to show yet.
  Loading,
  Error(String),
  Empty,
  Items { items: Vec<ListItem>, refreshing: bool },
}

impl ListView {
  pub fn from_state(state: &HookState) -> Self {
    if state.is_loading() && state.events.is_empty() {
      return Self::Loading;
    }
    if let Some(message) = &state.error {
      return Self::Error(message.clone());
    }
    if state.events.is_empty() {
      return Self::Empty;
    }

    let items = state
      .events
      .iter()
      .map(|event| ListItem {
        key: event.id.clone(),
        card: render_event(event),
      })
      .collect();
    Self::Items {
      items,
      refreshing: state.is_loading(),
    }
  }
}

impl fmt::Display for ListView {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Loading => writeln!(f, "Loading..."),
      Self::Error(message) => writeln!(f, "Error: {message}"),
      Self::Empty => writeln!(f, "{EMPTY_MESSAGE}"),
      Self::Items { items, refreshing } => {
        if *refreshing {
          writeln!(f, "(refreshing)")?;
        }
        for (i, item) in items.iter().enumerate() {
          if i > 0 {
            writeln!(f)?;
          }
          write!(f, "{}", item.card)?;
        }
        Ok(())
      }
    }
  }
}

pub type DismissCallback = Box<dyn FnMut() + Send>;

/// Screen container. With a dismiss callback it shows a close affordance,
/// without one the list takes the whole screen.
pub struct ThreatEventsScreen {
  on_close: Option<DismissCallback>,
}

impl ThreatEventsScreen {
  pub fn new(on_close: Option<DismissCallback>) -> Self {
    Self { on_close }
  }

  pub fn is_dismissible(&self) -> bool {
    self.on_close.is_some()
  }

  pub fn view(&self, state: &HookState) -> ScreenView {
    ScreenView {
      title: SCREEN_TITLE.to_string(),
      dismissible: self.is_dismissible(),
      list: ListView::from_state(state),
    }
  }

  /// Returns whether a callback was invoked.
  pub fn dismiss(&mut self) -> bool {
    match self.on_close.as_mut() {
      Some(cb) => {
        tracing::debug!("threat events screen dismissed");
        cb();
        true
      }
      None => false,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenView {
  pub title: String,
  pub dismissible: bool,
  pub list: ListView,
}

impl fmt::Display for ScreenView {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.dismissible {
      writeln!(f, "{}  [Close]", self.title)?;
    } else {
      writeln!(f, "{}", self.title)?;
    }
    writeln!(f)?;
    write!(f, "{}", self.list)
  }
}
