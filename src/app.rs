//! Application module: the state the terminal front end works on.
//!
//! `App` ties the views and the player together: which view is shown, the
//! pending prompt, the message line, and the execution of `:` commands.

mod dispatch;
mod model;
mod notice;

pub use model::*;
pub use notice::{ChannelReporter, Notice};

#[cfg(test)]
mod tests;
