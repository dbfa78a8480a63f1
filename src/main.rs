mod app;
mod command;
mod config;
mod error;
mod menu;
mod mpris;
mod player;
mod plugin;
mod runtime;
mod track;
mod ui;
mod view;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    runtime::run()
}
